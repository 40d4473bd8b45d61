use eframe::egui::{self, Color32, Key, RichText, Ui};

use super::super::{ChatEntry, ChatRole, TruthGraphApp};

fn verdict_badge(ui: &mut Ui, verdict: bool) {
    let (text, color) = if verdict {
        ("Likely rumor", Color32::from_rgb(239, 68, 68))
    } else {
        ("No rumor detected", Color32::from_rgb(34, 197, 94))
    };
    ui.label(RichText::new(text).small().strong().color(color));
}

fn draw_entry(ui: &mut Ui, entry: &ChatEntry) {
    let (title, fill) = match entry.role {
        ChatRole::User => ("You", Color32::from_rgb(37, 45, 58)),
        ChatRole::Analyst if entry.failed => ("Analyst", Color32::from_rgb(69, 26, 26)),
        ChatRole::Analyst => ("Analyst", Color32::from_rgb(28, 36, 30)),
    };

    egui::Frame::new()
        .fill(fill)
        .corner_radius(6.0)
        .inner_margin(8.0)
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.horizontal(|ui| {
                ui.label(RichText::new(title).strong());
                if let Some(verdict) = entry.verdict {
                    verdict_badge(ui, verdict);
                }
            });
            ui.label(entry.text.as_str());
        });
    ui.add_space(6.0);
}

impl TruthGraphApp {
    pub(in crate::app) fn draw_chat(&mut self, ui: &mut Ui) {
        ui.heading("Claim check");
        ui.label("Paste a claim or headline to trace how it spread.");
        ui.separator();

        let pending = self.lifecycle.is_pending();

        egui::TopBottomPanel::bottom("chat_input")
            .resizable(false)
            .show_inside(ui, |ui| {
                ui.add_space(4.0);
                let input = ui.add(
                    egui::TextEdit::multiline(&mut self.chat.input)
                        .hint_text("Enter a claim…")
                        .desired_rows(3)
                        .desired_width(f32::INFINITY),
                );
                let submit_with_key = input.has_focus()
                    && ui.input(|input| input.key_pressed(Key::Enter) && input.modifiers.command);

                ui.horizontal(|ui| {
                    let controls = self.chat.controls(pending);
                    let send = ui.add_enabled(controls.send, egui::Button::new("Send"));
                    if send.clicked() || (submit_with_key && controls.send) {
                        self.send_query(false);
                    }

                    if pending {
                        ui.spinner();
                        if ui
                            .add_enabled(controls.replace, egui::Button::new("Replace pending"))
                            .on_hover_text("Drop the running analysis and start this one")
                            .clicked()
                        {
                            self.send_query(true);
                        }
                    }

                    if ui
                        .add_enabled(!self.chat.transcript.is_empty(), egui::Button::new("Clear"))
                        .clicked()
                    {
                        self.chat.transcript.clear();
                        self.lifecycle.reset();
                        self.view.interaction.cancel();
                    }
                });
                ui.add_space(4.0);
            });

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                if self.chat.transcript.is_empty() {
                    ui.label(RichText::new("No analyses yet.").weak());
                }
                for entry in &self.chat.transcript {
                    draw_entry(ui, entry);
                }
            });
    }
}
