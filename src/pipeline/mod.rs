// src/pipeline/mod.rs

pub mod metrics;
pub mod session;
pub mod tracking;

pub use session::TrackingSession;
pub use tracking::TrackingPipeline;
