//! Owner-scoped directory/file tree over the record store.
//!
//! Every lookup is filtered by owner and availability; a record that fails
//! either check is reported exactly like one that does not exist.

use crate::blob::{self, BlobStore};
use crate::error::Error;
use crate::storage::models::{Directory, File, Listing, ListingEntry, NewDirectory, NewFile};
use crate::storage::Database;
use tracing::{error, info};

pub const MAX_NAME_LEN: usize = 256;

/// Input for `create_file`: the uploaded bytes plus where they go.
#[derive(Debug, Clone)]
pub struct FileUpload<'a> {
    pub owner: &'a str,
    pub name: &'a str,
    pub bytes: &'a [u8],
    pub description: Option<&'a str>,
    pub parent_id: Option<i64>,
}

pub fn get_directory(db: &Database, id: i64, owner: &str) -> Result<Directory, Error> {
    db.get_available_directory(id, owner)?
        .ok_or(Error::NotFound("directory"))
}

pub fn get_file(db: &Database, id: i64, owner: &str) -> Result<File, Error> {
    db.get_available_file(id, owner)?
        .ok_or(Error::NotFound("file"))
}

/// Create a directory under `parent_id` (or at the root).
///
/// Rejects empty or over-long names and a second live directory with the
/// same name in the same place. Soft-deleted namesakes do not count.
pub fn create_directory(
    db: &Database,
    owner: &str,
    name: &str,
    description: Option<&str>,
    parent_id: Option<i64>,
) -> Result<i64, Error> {
    let name = name.trim();
    validate_name(name)?;

    if let Some(parent_id) = parent_id {
        get_directory(db, parent_id, owner)?;
    }

    if db.find_live_directory(owner, parent_id, name)?.is_some() {
        return Err(Error::ValidationFailed(
            "Such directory already exists.".to_string(),
        ));
    }

    let id = db.insert_directory(&NewDirectory {
        name,
        description,
        owner,
        parent_id,
    })?;
    info!("Created directory {} '{}' for {}", id, name, owner);
    Ok(id)
}

/// Store uploaded bytes in the blob store and record the file.
pub fn create_file(db: &Database, blobs: &BlobStore, upload: &FileUpload<'_>) -> Result<i64, Error> {
    let name = upload.name.trim();
    validate_name(name)?;
    if name.contains(|c| c == '/' || c == '\\') || name == "." || name == ".." {
        return Err(Error::ValidationFailed(format!(
            "'{}' is not a plain file name",
            name
        )));
    }

    if let Some(parent_id) = upload.parent_id {
        get_directory(db, parent_id, upload.owner)?;
    }

    let storage_name = blobs.unique_storage_name(name, |candidate| {
        db.storage_name_exists(candidate)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    })?;
    blobs.write(&storage_name, upload.bytes)?;

    let digest = blob::content_digest(upload.bytes);
    let inserted = db.insert_file(&NewFile {
        name,
        description: upload.description,
        owner: upload.owner,
        parent_id: upload.parent_id,
        storage_name: &storage_name,
        size_bytes: upload.bytes.len() as i64,
        content_digest: &digest,
    });

    match inserted {
        Ok(id) => {
            info!(
                "Uploaded file {} '{}' ({} bytes) for {}",
                id,
                storage_name,
                upload.bytes.len(),
                upload.owner
            );
            Ok(id)
        }
        Err(e) => {
            if let Err(remove_err) = blobs.remove(&storage_name) {
                error!("Failed to remove orphaned blob '{}': {}", storage_name, remove_err);
            }
            Err(e.into())
        }
    }
}

/// Available directories (by name) and files (by storage name) directly under
/// `parent_id` for `owner`. `None` lists the root.
pub fn list_children(db: &Database, parent_id: Option<i64>, owner: &str) -> Result<Listing, Error> {
    if let Some(parent_id) = parent_id {
        get_directory(db, parent_id, owner)?;
    }

    let directories = db
        .get_child_directories(parent_id, owner)?
        .into_iter()
        .map(|d| ListingEntry { id: d.id, name: d.name })
        .collect();
    let files = db
        .get_child_files(parent_id, owner)?
        .into_iter()
        .map(|f| ListingEntry {
            id: f.id,
            name: f.display_name().to_string(),
        })
        .collect();

    Ok(Listing { directories, files })
}

/// The stored content of an owned, available file as text.
pub fn file_content(db: &Database, blobs: &BlobStore, id: i64, owner: &str) -> Result<String, Error> {
    let file = get_file(db, id, owner)?;
    let bytes = blobs.read(&file.storage_name)?;
    String::from_utf8(bytes)
        .map_err(|_| Error::ValidationFailed(format!("'{}' is not UTF-8 text", file.name)))
}

fn validate_name(name: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::ValidationFailed("name must not be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::ValidationFailed(format!(
            "name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(())
}
