use serde::Serialize;

/// A user-owned folder. `parent_id = None` places it at the owner's root.
#[derive(Debug, Clone, Serialize)]
pub struct Directory {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub owner: String,
    pub parent_id: Option<i64>,
    pub availability_flag: bool,
    pub validity_flag: bool,
    pub created_at: String,
}

/// An uploaded source file. Its bytes live in the blob store under `storage_name`.
#[derive(Debug, Clone, Serialize)]
pub struct File {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub owner: String,
    pub parent_id: Option<i64>,
    pub storage_name: String,
    pub size_bytes: i64,
    pub content_digest: String,
    pub availability_flag: bool,
    pub validity_flag: bool,
    pub created_at: String,
}

impl File {
    pub fn display_name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone)]
pub struct NewDirectory<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub owner: &'a str,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewFile<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub owner: &'a str,
    pub parent_id: Option<i64>,
    pub storage_name: &'a str,
    pub size_bytes: i64,
    pub content_digest: &'a str,
}

/// One structured item of a verification report, joined with its labels.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub id: i64,
    pub file_id: i64,
    pub category: String,
    pub status: String,
    pub body: String,
    pub generation: i64,
    pub validity_flag: bool,
    pub created_at: String,
}

/// The raw text the prover produced for one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub id: i64,
    pub file_id: i64,
    pub data: String,
    pub generation: i64,
    pub validity_flag: bool,
    pub created_at: String,
}

/// Entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingEntry {
    pub id: i64,
    pub name: String,
}

/// Available directories and files directly under one parent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Listing {
    pub directories: Vec<ListingEntry>,
    pub files: Vec<ListingEntry>,
}
