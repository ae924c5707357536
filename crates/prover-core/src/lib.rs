pub mod blob;
pub mod cascade;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod progress;
pub mod prover;
pub mod service;
pub mod storage;

pub use config::AppConfig;
pub use error::Error;
pub use hierarchy::FileUpload;
pub use progress::{ProgressReporter, SilentReporter};
pub use prover::{RunOutcome, ToolOutput, ToolRunner};
pub use service::ProverService;
