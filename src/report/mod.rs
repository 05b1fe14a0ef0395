pub mod analyze;
pub mod export;
pub mod extract;
pub mod normalize;
pub mod orchestrator;
pub mod snapshot;
pub mod source;
pub mod store;
pub mod synthesize;
pub mod tables;
pub mod template;
#[cfg(test)]
mod tests;
pub mod trends;

pub use orchestrator::{RunRequest, run_pipeline};
pub use store::{delete_run, list_manifests, load_manifest};
pub use trends::metric_trend;
