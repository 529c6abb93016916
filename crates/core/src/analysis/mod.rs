pub mod metrics;
pub mod scoring;
