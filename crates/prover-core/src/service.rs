use crate::blob::BlobStore;
use crate::cascade::{self, CascadeStats};
use crate::config::AppConfig;
use crate::error::Error;
use crate::hierarchy::{self, FileUpload};
use crate::progress::ProgressReporter;
use crate::prover::coordinator;
use crate::prover::{ProverCommand, RunOutcome, ToolRunner, VerificationCoordinator};
use crate::storage::models::{Directory, File, Finding, Listing, RunSummary};
use crate::storage::Database;
use tracing::debug;

/// The record store, the blob store and the prover bound together.
///
/// Every operation takes the requesting owner explicitly, except
/// `delete_subtree`, which acts on a directory id already authorized by
/// the caller.
pub struct ProverService<R: ToolRunner = ProverCommand> {
    db: Database,
    blobs: BlobStore,
    runner: R,
}

impl ProverService<ProverCommand> {
    pub fn open(config: &AppConfig) -> Result<Self, Error> {
        let db = Database::open(&config.db_path)?;
        let blobs = BlobStore::open(&config.blob_root)?;
        debug!(
            "Opened database '{}' with blobs under '{}'",
            config.db_path, config.blob_root
        );
        Ok(Self::with_parts(
            db,
            blobs,
            ProverCommand::new(config.prover.clone()),
        ))
    }
}

impl<R: ToolRunner> ProverService<R> {
    pub fn with_parts(db: Database, blobs: BlobStore, runner: R) -> Self {
        Self { db, blobs, runner }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    // ── Hierarchy ────────────────────────────────────────────────

    pub fn create_directory(
        &self,
        owner: &str,
        name: &str,
        description: Option<&str>,
        parent_id: Option<i64>,
    ) -> Result<i64, Error> {
        hierarchy::create_directory(&self.db, owner, name, description, parent_id)
    }

    pub fn create_file(&self, upload: &FileUpload<'_>) -> Result<i64, Error> {
        hierarchy::create_file(&self.db, &self.blobs, upload)
    }

    pub fn get_directory(&self, dir_id: i64, owner: &str) -> Result<Directory, Error> {
        hierarchy::get_directory(&self.db, dir_id, owner)
    }

    pub fn get_file(&self, file_id: i64, owner: &str) -> Result<File, Error> {
        hierarchy::get_file(&self.db, file_id, owner)
    }

    pub fn list_children(&self, parent_id: Option<i64>, owner: &str) -> Result<Listing, Error> {
        hierarchy::list_children(&self.db, parent_id, owner)
    }

    pub fn file_content(&self, file_id: i64, owner: &str) -> Result<String, Error> {
        hierarchy::file_content(&self.db, &self.blobs, file_id, owner)
    }

    // ── Deletion ─────────────────────────────────────────────────

    pub fn delete_subtree(&self, dir_id: i64) -> Result<CascadeStats, Error> {
        cascade::delete_subtree(&self.db, dir_id)
    }

    pub fn delete_directory(&self, dir_id: i64, owner: &str) -> Result<CascadeStats, Error> {
        cascade::delete_directory(&self.db, dir_id, owner)
    }

    pub fn delete_file(&self, file_id: i64, owner: &str) -> Result<(), Error> {
        cascade::delete_file(&self.db, file_id, owner)
    }

    pub fn purge_file(&self, file_id: i64, owner: &str) -> Result<(), Error> {
        cascade::purge_file(&self.db, &self.blobs, file_id, owner)
    }

    // ── Verification ─────────────────────────────────────────────

    pub fn run_verification(
        &self,
        file_id: i64,
        owner: &str,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunOutcome, Error> {
        VerificationCoordinator::new(&self.db, &self.blobs, &self.runner)
            .run_verification(file_id, owner, reporter)
    }

    pub fn current_findings(&self, file_id: i64, owner: &str) -> Result<Vec<Finding>, Error> {
        coordinator::current_findings(&self.db, file_id, owner)
    }

    pub fn current_summary(&self, file_id: i64, owner: &str) -> Result<Option<RunSummary>, Error> {
        coordinator::current_summary(&self.db, file_id, owner)
    }

    pub fn verification_history(
        &self,
        file_id: i64,
        owner: &str,
    ) -> Result<Vec<RunSummary>, Error> {
        coordinator::verification_history(&self.db, file_id, owner)
    }

    pub fn finding_history(&self, file_id: i64, owner: &str) -> Result<Vec<Finding>, Error> {
        coordinator::finding_history(&self.db, file_id, owner)
    }
}
