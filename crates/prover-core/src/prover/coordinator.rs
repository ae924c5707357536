use super::report;
use super::runner::ToolRunner;
use crate::blob::BlobStore;
use crate::error::Error;
use crate::hierarchy;
use crate::progress::ProgressReporter;
use crate::storage::models::{Finding, RunSummary};
use crate::storage::Database;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Result of one successful verification pass.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub file_id: i64,
    pub generation: i64,
    pub findings: usize,
    pub summary_id: i64,
    pub tool_duration: Duration,
}

/// Runs the prover for one file and replaces its current results.
pub struct VerificationCoordinator<'a, R: ToolRunner> {
    db: &'a Database,
    blobs: &'a BlobStore,
    runner: &'a R,
}

impl<'a, R: ToolRunner> VerificationCoordinator<'a, R> {
    pub fn new(db: &'a Database, blobs: &'a BlobStore, runner: &'a R) -> Self {
        Self { db, blobs, runner }
    }

    /// One full pass:
    /// 1. Look the file up for `owner` (NotFound otherwise)
    /// 2. Invalidate its current findings and summary, committed before anything else
    /// 3. Run the prover on the stored bytes
    /// 4. Parse standard output into findings
    /// 5. Write findings and the raw report as the new current generation
    ///
    /// A failed tool run leaves the file with no current results.
    pub fn run_verification(
        &self,
        file_id: i64,
        owner: &str,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunOutcome, Error> {
        let file = hierarchy::get_file(self.db, file_id, owner)?;

        let (findings, summaries) = self.db.invalidate_current_results(file.id)?;
        reporter.on_invalidated(file.id, findings, summaries);

        let input = self.blobs.path(&file.storage_name);
        if !input.is_file() {
            warn!("Content of file {} missing at {}", file.id, input.display());
            return Err(Error::VerificationFailed(format!(
                "content of '{}' is missing",
                file.display_name()
            )));
        }

        info!("Verifying file {} ('{}')", file.id, file.display_name());
        reporter.on_tool_start(file.display_name());
        let start = Instant::now();
        let result = self.runner.run(&input);
        let tool_duration = start.elapsed();

        let output = match result {
            Ok(output) if output.success() => {
                reporter.on_tool_complete(true, tool_duration.as_secs_f64());
                output
            }
            Ok(output) => {
                reporter.on_tool_complete(false, tool_duration.as_secs_f64());
                let code = output
                    .exit_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string());
                warn!("Prover exited with {} for file {}", code, file.id);
                return Err(Error::VerificationFailed(format!(
                    "prover exited with {}: {}",
                    code,
                    output.stderr.trim()
                )));
            }
            Err(e) => {
                reporter.on_tool_complete(false, tool_duration.as_secs_f64());
                warn!("Prover run failed for file {}: {}", file.id, e);
                return Err(match e {
                    Error::VerificationFailed(msg) => Error::VerificationFailed(msg),
                    other => Error::VerificationFailed(other.to_string()),
                });
            }
        };

        let drafts = report::parse_report(&output.stdout);
        let generation = self.db.next_generation(file.id)?;
        let summary_id =
            self.db
                .insert_generation(file.id, generation, &drafts, output.raw_report())?;
        reporter.on_persisted(drafts.len(), generation);

        info!(
            "File {} generation {}: {} findings in {:.2}s",
            file.id,
            generation,
            drafts.len(),
            tool_duration.as_secs_f64()
        );

        Ok(RunOutcome {
            file_id: file.id,
            generation,
            findings: drafts.len(),
            summary_id,
            tool_duration,
        })
    }
}

pub fn current_findings(db: &Database, file_id: i64, owner: &str) -> Result<Vec<Finding>, Error> {
    let file = hierarchy::get_file(db, file_id, owner)?;
    Ok(db.get_current_findings(file.id)?)
}

pub fn current_summary(
    db: &Database,
    file_id: i64,
    owner: &str,
) -> Result<Option<RunSummary>, Error> {
    let file = hierarchy::get_file(db, file_id, owner)?;
    Ok(db.get_current_summary(file.id)?)
}

/// Every run summary of the file, newest first, superseded ones included.
pub fn verification_history(
    db: &Database,
    file_id: i64,
    owner: &str,
) -> Result<Vec<RunSummary>, Error> {
    let file = hierarchy::get_file(db, file_id, owner)?;
    Ok(db.get_run_summaries(file.id)?)
}

/// Every finding the file ever had, oldest first.
pub fn finding_history(db: &Database, file_id: i64, owner: &str) -> Result<Vec<Finding>, Error> {
    let file = hierarchy::get_file(db, file_id, owner)?;
    Ok(db.get_all_findings(file.id)?)
}
