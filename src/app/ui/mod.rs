mod chat;
mod panels;
mod ticker;
