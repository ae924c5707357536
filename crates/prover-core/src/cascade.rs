use crate::blob::BlobStore;
use crate::error::Error;
use crate::hierarchy;
use crate::storage::Database;
use tracing::{debug, info};

/// How many records a cascade flipped from available to unavailable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeStats {
    pub directories: usize,
    pub files: usize,
}

/// Soft-delete a directory and everything beneath it.
///
/// Children are processed before their parent, depth first, so an interrupted
/// cascade never leaves an unavailable directory above an available
/// descendant. Records already unavailable are left as they are, which makes
/// a second run a no-op. Rows are never removed.
pub fn delete_subtree(db: &Database, dir_id: i64) -> Result<CascadeStats, Error> {
    if db.get_directory(dir_id)?.is_none() {
        return Err(Error::NotFound("directory"));
    }

    let tx = db.connection().unchecked_transaction()?;
    let mut stats = CascadeStats::default();
    cascade(db, dir_id, &mut stats)?;
    tx.commit()?;

    info!(
        "Cascade from directory {}: {} directories, {} files marked unavailable",
        dir_id, stats.directories, stats.files
    );
    Ok(stats)
}

fn cascade(db: &Database, dir_id: i64, stats: &mut CascadeStats) -> Result<(), Error> {
    for child_id in db.get_child_directory_ids(dir_id)? {
        cascade(db, child_id, stats)?;
    }

    let files = db.mark_child_files_unavailable(dir_id)?;
    let dirs = db.mark_directory_unavailable(dir_id)?;
    debug!("Directory {}: {} files, {} directory flipped", dir_id, files, dirs);

    stats.files += files;
    stats.directories += dirs;
    Ok(())
}

/// Owner-facing directory removal: the directory must be visible to `owner`.
pub fn delete_directory(db: &Database, dir_id: i64, owner: &str) -> Result<CascadeStats, Error> {
    hierarchy::get_directory(db, dir_id, owner)?;
    delete_subtree(db, dir_id)
}

/// Soft-delete a single file. Its findings and summaries are kept.
pub fn delete_file(db: &Database, file_id: i64, owner: &str) -> Result<(), Error> {
    hierarchy::get_file(db, file_id, owner)?;
    db.mark_file_unavailable(file_id)?;
    info!("File {} marked unavailable by {}", file_id, owner);
    Ok(())
}

/// Physically remove a file, its verification history and its blob.
/// Works on soft-deleted files as long as `owner` owns them.
pub fn purge_file(
    db: &Database,
    blobs: &BlobStore,
    file_id: i64,
    owner: &str,
) -> Result<(), Error> {
    let file = db
        .get_owned_file(file_id, owner)?
        .ok_or(Error::NotFound("file"))?;

    db.delete_file_cascade(file.id)?;
    blobs.remove(&file.storage_name)?;
    info!("File {} ('{}') purged by {}", file.id, file.storage_name, owner);
    Ok(())
}
