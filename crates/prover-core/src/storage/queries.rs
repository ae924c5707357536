use super::models::*;
use super::sqlite::Database;
use crate::prover::report::FindingDraft;
use rusqlite::{params, OptionalExtension, Result, Row};
use tracing::debug;

const DIRECTORY_COLUMNS: &str = "id, name, description, owner, parent_id, \
     availability_flag, validity_flag, created_at";

const FILE_COLUMNS: &str = "id, name, description, owner, parent_id, storage_name, \
     size_bytes, content_digest, availability_flag, validity_flag, created_at";

const FINDING_SELECT: &str = "SELECT fs.id, fs.file_id, sc.name, ss.name, \
            COALESCE((SELECT d.data FROM section_status_data d \
                      WHERE d.status_id = ss.id ORDER BY d.id LIMIT 1), ''), \
            fs.generation, fs.validity_flag, fs.created_at \
     FROM file_section fs \
     JOIN section_category sc ON sc.id = fs.category_id \
     JOIN section_status ss ON ss.id = fs.status_id";

const SUMMARY_COLUMNS: &str = "id, file_id, data, generation, validity_flag, created_at";

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn directory_from_row(row: &Row<'_>) -> Result<Directory> {
    Ok(Directory {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        owner: row.get(3)?,
        parent_id: row.get(4)?,
        availability_flag: row.get(5)?,
        validity_flag: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn file_from_row(row: &Row<'_>) -> Result<File> {
    Ok(File {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        owner: row.get(3)?,
        parent_id: row.get(4)?,
        storage_name: row.get(5)?,
        size_bytes: row.get(6)?,
        content_digest: row.get(7)?,
        availability_flag: row.get(8)?,
        validity_flag: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn finding_from_row(row: &Row<'_>) -> Result<Finding> {
    Ok(Finding {
        id: row.get(0)?,
        file_id: row.get(1)?,
        category: row.get(2)?,
        status: row.get(3)?,
        body: row.get(4)?,
        generation: row.get(5)?,
        validity_flag: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn summary_from_row(row: &Row<'_>) -> Result<RunSummary> {
    Ok(RunSummary {
        id: row.get(0)?,
        file_id: row.get(1)?,
        data: row.get(2)?,
        generation: row.get(3)?,
        validity_flag: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl Database {
    // ── Directories ──────────────────────────────────────────────

    pub fn insert_directory(&self, dir: &NewDirectory<'_>) -> Result<i64> {
        self.connection().execute(
            "INSERT INTO directory (name, description, owner, parent_id, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![dir.name, dir.description, dir.owner, dir.parent_id, now()],
        )?;
        let id = self.connection().last_insert_rowid();
        debug!("Inserted directory {} ('{}') for {}", id, dir.name, dir.owner);
        Ok(id)
    }

    /// Fetch a directory by id regardless of owner or availability.
    pub fn get_directory(&self, id: i64) -> Result<Option<Directory>> {
        self.connection()
            .query_row(
                &format!("SELECT {} FROM directory WHERE id = ?1", DIRECTORY_COLUMNS),
                params![id],
                directory_from_row,
            )
            .optional()
    }

    /// Fetch a directory only if it is owned by `owner` and still available.
    pub fn get_available_directory(&self, id: i64, owner: &str) -> Result<Option<Directory>> {
        self.connection()
            .query_row(
                &format!(
                    "SELECT {} FROM directory \
                     WHERE id = ?1 AND owner = ?2 AND availability_flag = 1",
                    DIRECTORY_COLUMNS
                ),
                params![id, owner],
                directory_from_row,
            )
            .optional()
    }

    /// Id of an available directory named `name` under `parent_id` for `owner`.
    pub fn find_live_directory(
        &self,
        owner: &str,
        parent_id: Option<i64>,
        name: &str,
    ) -> Result<Option<i64>> {
        self.connection()
            .query_row(
                "SELECT id FROM directory \
                 WHERE owner = ?1 AND parent_id IS ?2 AND name = ?3 AND availability_flag = 1 \
                 LIMIT 1",
                params![owner, parent_id, name],
                |row| row.get(0),
            )
            .optional()
    }

    /// Available, owner-matching directories directly under `parent_id`, ordered by name.
    pub fn get_child_directories(
        &self,
        parent_id: Option<i64>,
        owner: &str,
    ) -> Result<Vec<Directory>> {
        let mut stmt = self.connection().prepare(&format!(
            "SELECT {} FROM directory \
             WHERE parent_id IS ?1 AND owner = ?2 AND availability_flag = 1 \
             ORDER BY name, id",
            DIRECTORY_COLUMNS
        ))?;
        let dirs = stmt
            .query_map(params![parent_id, owner], directory_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(dirs)
    }

    /// Ids of every directory directly under `dir_id`, available or not.
    pub fn get_child_directory_ids(&self, dir_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self
            .connection()
            .prepare("SELECT id FROM directory WHERE parent_id = ?1 ORDER BY id")?;
        let ids = stmt
            .query_map(params![dir_id], |row| row.get(0))?
            .collect::<Result<Vec<_>>>()?;
        Ok(ids)
    }

    pub fn mark_directory_unavailable(&self, dir_id: i64) -> Result<usize> {
        self.connection().execute(
            "UPDATE directory SET availability_flag = 0 WHERE id = ?1 AND availability_flag = 1",
            params![dir_id],
        )
    }

    // ── Files ────────────────────────────────────────────────────

    pub fn insert_file(&self, file: &NewFile<'_>) -> Result<i64> {
        self.connection().execute(
            "INSERT INTO file \
             (name, description, owner, parent_id, storage_name, size_bytes, \
              content_digest, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                file.name,
                file.description,
                file.owner,
                file.parent_id,
                file.storage_name,
                file.size_bytes,
                file.content_digest,
                now(),
            ],
        )?;
        let id = self.connection().last_insert_rowid();
        debug!("Inserted file {} ('{}') for {}", id, file.storage_name, file.owner);
        Ok(id)
    }

    /// Fetch a file by id regardless of owner or availability.
    pub fn get_file(&self, id: i64) -> Result<Option<File>> {
        self.connection()
            .query_row(
                &format!("SELECT {} FROM file WHERE id = ?1", FILE_COLUMNS),
                params![id],
                file_from_row,
            )
            .optional()
    }

    /// Fetch a file owned by `owner`, including soft-deleted ones.
    pub fn get_owned_file(&self, id: i64, owner: &str) -> Result<Option<File>> {
        self.connection()
            .query_row(
                &format!("SELECT {} FROM file WHERE id = ?1 AND owner = ?2", FILE_COLUMNS),
                params![id, owner],
                file_from_row,
            )
            .optional()
    }

    /// Fetch a file only if it is owned by `owner` and still available.
    pub fn get_available_file(&self, id: i64, owner: &str) -> Result<Option<File>> {
        self.connection()
            .query_row(
                &format!(
                    "SELECT {} FROM file \
                     WHERE id = ?1 AND owner = ?2 AND availability_flag = 1",
                    FILE_COLUMNS
                ),
                params![id, owner],
                file_from_row,
            )
            .optional()
    }

    /// Available, owner-matching files directly under `parent_id`, ordered by storage name.
    pub fn get_child_files(&self, parent_id: Option<i64>, owner: &str) -> Result<Vec<File>> {
        let mut stmt = self.connection().prepare(&format!(
            "SELECT {} FROM file \
             WHERE parent_id IS ?1 AND owner = ?2 AND availability_flag = 1 \
             ORDER BY storage_name, id",
            FILE_COLUMNS
        ))?;
        let files = stmt
            .query_map(params![parent_id, owner], file_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(files)
    }

    pub fn storage_name_exists(&self, storage_name: &str) -> Result<bool> {
        let count: i64 = self.connection().query_row(
            "SELECT COUNT(*) FROM file WHERE storage_name = ?1",
            params![storage_name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn mark_file_unavailable(&self, file_id: i64) -> Result<usize> {
        self.connection().execute(
            "UPDATE file SET availability_flag = 0 WHERE id = ?1 AND availability_flag = 1",
            params![file_id],
        )
    }

    /// Soft-delete every file directly under `dir_id`. Returns how many flipped.
    pub fn mark_child_files_unavailable(&self, dir_id: i64) -> Result<usize> {
        self.connection().execute(
            "UPDATE file SET availability_flag = 0 WHERE parent_id = ?1 AND availability_flag = 1",
            params![dir_id],
        )
    }

    /// Physically remove a file row together with everything produced by its runs:
    /// sections and summaries (via foreign-key cascade) and the per-run label rows.
    pub fn delete_file_cascade(&self, file_id: i64) -> Result<usize> {
        let tx = self.connection().unchecked_transaction()?;
        let (category_ids, status_ids): (Vec<i64>, Vec<i64>) = {
            let mut stmt =
                tx.prepare("SELECT category_id, status_id FROM file_section WHERE file_id = ?1")?;
            let pairs = stmt
                .query_map(params![file_id], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<(i64, i64)>>>()?;
            pairs.into_iter().unzip()
        };

        let removed = tx.execute("DELETE FROM file WHERE id = ?1", params![file_id])?;
        {
            let mut category_stmt =
                tx.prepare_cached("DELETE FROM section_category WHERE id = ?1")?;
            for id in &category_ids {
                category_stmt.execute(params![id])?;
            }
            let mut status_stmt = tx.prepare_cached("DELETE FROM section_status WHERE id = ?1")?;
            for id in &status_ids {
                status_stmt.execute(params![id])?;
            }
        }
        tx.commit()?;
        debug!(
            "Deleted file {} with {} sections",
            file_id,
            category_ids.len()
        );
        Ok(removed)
    }

    // ── Verification results ─────────────────────────────────────

    /// Mark the current generation of findings and summaries for a file as superseded.
    /// Returns (sections, summaries) invalidated.
    pub fn invalidate_current_results(&self, file_id: i64) -> Result<(usize, usize)> {
        let tx = self.connection().unchecked_transaction()?;
        tx.execute(
            "UPDATE section_status_data SET validity_flag = 0 \
             WHERE validity_flag = 1 AND status_id IN \
                 (SELECT status_id FROM file_section WHERE file_id = ?1 AND validity_flag = 1)",
            params![file_id],
        )?;
        tx.execute(
            "UPDATE section_status SET validity_flag = 0 \
             WHERE validity_flag = 1 AND id IN \
                 (SELECT status_id FROM file_section WHERE file_id = ?1 AND validity_flag = 1)",
            params![file_id],
        )?;
        tx.execute(
            "UPDATE section_category SET validity_flag = 0 \
             WHERE validity_flag = 1 AND id IN \
                 (SELECT category_id FROM file_section WHERE file_id = ?1 AND validity_flag = 1)",
            params![file_id],
        )?;
        let sections = tx.execute(
            "UPDATE file_section SET validity_flag = 0 WHERE file_id = ?1 AND validity_flag = 1",
            params![file_id],
        )?;
        let summaries = tx.execute(
            "UPDATE file_proving_result SET validity_flag = 0 \
             WHERE file_id = ?1 AND validity_flag = 1",
            params![file_id],
        )?;
        tx.commit()?;
        debug!(
            "Invalidated {} sections and {} summaries for file {}",
            sections, summaries, file_id
        );
        Ok((sections, summaries))
    }

    /// Next run number for a file: one past the highest generation seen so far.
    pub fn next_generation(&self, file_id: i64) -> Result<i64> {
        self.connection().query_row(
            "SELECT COALESCE(MAX(g), 0) + 1 FROM ( \
                 SELECT generation AS g FROM file_section WHERE file_id = ?1 \
                 UNION ALL \
                 SELECT generation AS g FROM file_proving_result WHERE file_id = ?1)",
            params![file_id],
            |row| row.get(0),
        )
    }

    /// Write one complete generation in a single transaction: fresh label rows and a
    /// section per draft, then the run summary. Returns the summary id.
    pub fn insert_generation(
        &self,
        file_id: i64,
        generation: i64,
        drafts: &[FindingDraft],
        raw_report: &str,
    ) -> Result<i64> {
        let tx = self.connection().unchecked_transaction()?;
        let created_at = now();
        {
            let mut category_stmt = tx.prepare_cached(
                "INSERT INTO section_category (name, created_at) VALUES (?1, ?2)",
            )?;
            let mut status_stmt = tx.prepare_cached(
                "INSERT INTO section_status (name, created_at) VALUES (?1, ?2)",
            )?;
            let mut data_stmt = tx.prepare_cached(
                "INSERT INTO section_status_data (status_id, data, created_at) \
                 VALUES (?1, ?2, ?3)",
            )?;
            let mut section_stmt = tx.prepare_cached(
                "INSERT INTO file_section \
                 (file_id, category_id, status_id, generation, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;

            for draft in drafts {
                category_stmt.execute(params![draft.category, created_at])?;
                let category_id = tx.last_insert_rowid();
                status_stmt.execute(params![draft.status, created_at])?;
                let status_id = tx.last_insert_rowid();
                data_stmt.execute(params![status_id, draft.body, created_at])?;
                section_stmt.execute(params![
                    file_id,
                    category_id,
                    status_id,
                    generation,
                    created_at
                ])?;
            }
        }
        tx.execute(
            "INSERT INTO file_proving_result (file_id, data, generation, created_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![file_id, raw_report, generation, created_at],
        )?;
        let summary_id = tx.last_insert_rowid();
        tx.commit()?;
        debug!(
            "Inserted generation {} for file {}: {} sections",
            generation,
            file_id,
            drafts.len()
        );
        Ok(summary_id)
    }

    /// Valid findings of a file in report order.
    pub fn get_current_findings(&self, file_id: i64) -> Result<Vec<Finding>> {
        let mut stmt = self.connection().prepare(&format!(
            "{} WHERE fs.file_id = ?1 AND fs.validity_flag = 1 ORDER BY fs.id",
            FINDING_SELECT
        ))?;
        let findings = stmt
            .query_map(params![file_id], finding_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(findings)
    }

    /// Every finding of a file, superseded ones included, oldest first.
    pub fn get_all_findings(&self, file_id: i64) -> Result<Vec<Finding>> {
        let mut stmt = self.connection().prepare(&format!(
            "{} WHERE fs.file_id = ?1 ORDER BY fs.id",
            FINDING_SELECT
        ))?;
        let findings = stmt
            .query_map(params![file_id], finding_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(findings)
    }

    pub fn get_current_summary(&self, file_id: i64) -> Result<Option<RunSummary>> {
        self.connection()
            .query_row(
                &format!(
                    "SELECT {} FROM file_proving_result \
                     WHERE file_id = ?1 AND validity_flag = 1 \
                     ORDER BY id DESC LIMIT 1",
                    SUMMARY_COLUMNS
                ),
                params![file_id],
                summary_from_row,
            )
            .optional()
    }

    /// All summaries of a file, newest first.
    pub fn get_run_summaries(&self, file_id: i64) -> Result<Vec<RunSummary>> {
        let mut stmt = self.connection().prepare(&format!(
            "SELECT {} FROM file_proving_result WHERE file_id = ?1 ORDER BY id DESC",
            SUMMARY_COLUMNS
        ))?;
        let summaries = stmt
            .query_map(params![file_id], summary_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(summaries)
    }
}
