//! Claim analysis with a force-directed propagation graph.
//!
//! The core turns an untrusted analysis payload into a [`graph::GraphModel`],
//! lays it out with [`physics::ForceSimulator`], lets the user drag nodes via
//! [`interaction::InteractionController`], and sequences requests through
//! [`analysis::AnalysisLifecycle`].

pub mod analysis;
pub mod config;
pub mod feed;
pub mod graph;
pub mod interaction;
pub mod physics;
