pub mod coordinator;
pub mod report;
pub mod runner;

pub use coordinator::{RunOutcome, VerificationCoordinator};
pub use report::{parse_report, FindingDraft};
pub use runner::{ProverCommand, ToolOutput, ToolRunner};
