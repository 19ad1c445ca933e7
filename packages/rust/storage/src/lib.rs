//! Turso Embedded / libSQL storage layer (offline mode).
//!
//! The [`Storage`] struct wraps a libSQL database holding ingested files,
//! their ordered fragments, and the append-only summary log.
//!
//! Orchestrators never see [`Storage`] directly: they take any
//! [`SummaryStore`], which [`Storage`] and the in-memory [`MemoryStore`]
//! both implement.

mod memory;
mod migrations;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docdigest_shared::{DigestError, FileId, FileMeta, Fragment, Result, SummaryRecord};
use libsql::{Connection, Database, params};
use uuid::Uuid;

pub use memory::MemoryStore;

/// The persistence operations the summarization pipeline depends on.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Look up file metadata. `Ok(None)` when the id is unknown.
    async fn get_file_by_id(&self, file_id: &FileId) -> Result<Option<FileMeta>>;

    /// All fragments of a file in ascending `sequence_index` order.
    async fn query_chunks_by_file(&self, file_id: &FileId) -> Result<Vec<Fragment>>;

    /// Append a summary record and return its id. `file_id` is `None` for
    /// combined multi-file summaries.
    async fn save_summary(&self, file_id: Option<&FileId>, text: &str) -> Result<String>;
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DigestError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DigestError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| DigestError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode (for inspection commands).
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DigestError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| DigestError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        DigestError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(DigestError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // File operations
    // -----------------------------------------------------------------------

    /// Insert a new source file record.
    pub async fn insert_file(&self, file: &FileMeta) -> Result<()> {
        self.check_writable()?;
        insert_file_on(&self.conn, file).await
    }

    /// Insert a file together with its fragments in one transaction.
    ///
    /// Either the file and every fragment are stored, or nothing is.
    pub async fn ingest_file(&self, file: &FileMeta, fragments: &[Fragment]) -> Result<()> {
        self.check_writable()?;
        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| DigestError::Storage(e.to_string()))?;

        let written = match insert_file_on(&tx, file).await {
            Ok(()) => insert_fragments_on(&tx, fragments).await,
            Err(e) => Err(e),
        };

        match written {
            Ok(()) => tx
                .commit()
                .await
                .map_err(|e| DigestError::Storage(e.to_string())),
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }

    /// List all ingested files, oldest first.
    pub async fn list_files(&self) -> Result<Vec<FileMeta>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, original_name, content_type, size, content_hash, uploaded_at
                 FROM files ORDER BY uploaded_at, id",
                params![],
            )
            .await
            .map_err(|e| DigestError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DigestError::Storage(e.to_string()))?
        {
            results.push(row_to_file_meta(&row)?);
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Fragment operations
    // -----------------------------------------------------------------------

    /// Store the extracted fragments of a file.
    pub async fn save_fragments(&self, fragments: &[Fragment]) -> Result<()> {
        self.check_writable()?;
        insert_fragments_on(&self.conn, fragments).await
    }

    // -----------------------------------------------------------------------
    // Summary operations
    // -----------------------------------------------------------------------

    /// Get a summary by ID.
    pub async fn get_summary_by_id(&self, summary_id: &str) -> Result<Option<SummaryRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, file_id, summary_text, created_at FROM summaries WHERE id = ?1",
                params![summary_id],
            )
            .await
            .map_err(|e| DigestError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_summary(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DigestError::Storage(e.to_string())),
        }
    }

    /// List the summaries written for a file, newest first.
    pub async fn list_summaries_for_file(&self, file_id: &FileId) -> Result<Vec<SummaryRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, file_id, summary_text, created_at FROM summaries
                 WHERE file_id = ?1 ORDER BY created_at DESC, id DESC",
                params![file_id.to_string()],
            )
            .await
            .map_err(|e| DigestError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DigestError::Storage(e.to_string()))?
        {
            results.push(row_to_summary(&row)?);
        }
        Ok(results)
    }
}

#[async_trait]
impl SummaryStore for Storage {
    async fn get_file_by_id(&self, file_id: &FileId) -> Result<Option<FileMeta>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, original_name, content_type, size, content_hash, uploaded_at
                 FROM files WHERE id = ?1",
                params![file_id.to_string()],
            )
            .await
            .map_err(|e| DigestError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_file_meta(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DigestError::Storage(e.to_string())),
        }
    }

    async fn query_chunks_by_file(&self, file_id: &FileId) -> Result<Vec<Fragment>> {
        let mut rows = self
            .conn
            .query(
                "SELECT seq, text, page, source FROM chunks WHERE file_id = ?1 ORDER BY seq",
                params![file_id.to_string()],
            )
            .await
            .map_err(|e| DigestError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DigestError::Storage(e.to_string()))?
        {
            let seq: i64 = row
                .get(0)
                .map_err(|e| DigestError::Storage(e.to_string()))?;
            results.push(Fragment {
                file_id: file_id.clone(),
                sequence_index: u32::try_from(seq)
                    .map_err(|_| DigestError::Storage(format!("invalid chunk seq {seq}")))?,
                text: row
                    .get::<String>(1)
                    .map_err(|e| DigestError::Storage(e.to_string()))?,
                page: row.get::<i64>(2).ok().and_then(|p| u32::try_from(p).ok()),
                source_name: row.get::<String>(3).ok(),
            });
        }
        Ok(results)
    }

    async fn save_summary(&self, file_id: Option<&FileId>, text: &str) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO summaries (id, file_id, summary_text, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    id.as_str(),
                    file_id.map(|f| f.to_string()),
                    text,
                    now.as_str()
                ],
            )
            .await
            .map_err(|e| DigestError::Storage(e.to_string()))?;
        Ok(id)
    }
}

async fn insert_file_on(conn: &Connection, file: &FileMeta) -> Result<()> {
    conn.execute(
        "INSERT INTO files (id, original_name, content_type, size, content_hash, uploaded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            file.id.to_string(),
            file.original_name.as_str(),
            file.content_type.as_deref(),
            file.size as i64,
            file.content_hash.as_str(),
            file.uploaded_at.to_rfc3339(),
        ],
    )
    .await
    .map_err(|e| DigestError::Storage(e.to_string()))?;
    Ok(())
}

async fn insert_fragments_on(conn: &Connection, fragments: &[Fragment]) -> Result<()> {
    for fragment in fragments {
        conn.execute(
            "INSERT INTO chunks (file_id, seq, text, page, source)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                fragment.file_id.to_string(),
                i64::from(fragment.sequence_index),
                fragment.text.as_str(),
                fragment.page.map(i64::from),
                fragment.source_name.as_deref(),
            ],
        )
        .await
        .map_err(|e| DigestError::Storage(e.to_string()))?;
    }
    Ok(())
}

/// Parse an RFC3339 timestamp column.
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DigestError::Storage(format!("invalid date: {e}")))
}

/// Parse a TEXT column holding a [`FileId`].
fn parse_file_id(s: &str) -> Result<FileId> {
    s.parse()
        .map_err(|e| DigestError::Storage(format!("invalid file id '{s}': {e}")))
}

/// Convert a database row to a [`FileMeta`].
fn row_to_file_meta(row: &libsql::Row) -> Result<FileMeta> {
    Ok(FileMeta {
        id: {
            let s: String = row
                .get(0)
                .map_err(|e| DigestError::Storage(e.to_string()))?;
            parse_file_id(&s)?
        },
        original_name: row
            .get::<String>(1)
            .map_err(|e| DigestError::Storage(e.to_string()))?,
        content_type: row.get::<String>(2).ok(),
        size: row
            .get::<i64>(3)
            .map_err(|e| DigestError::Storage(e.to_string()))? as u64,
        content_hash: row
            .get::<String>(4)
            .map_err(|e| DigestError::Storage(e.to_string()))?,
        uploaded_at: {
            let s: String = row
                .get(5)
                .map_err(|e| DigestError::Storage(e.to_string()))?;
            parse_timestamp(&s)?
        },
    })
}

/// Convert a database row to a [`SummaryRecord`].
fn row_to_summary(row: &libsql::Row) -> Result<SummaryRecord> {
    Ok(SummaryRecord {
        id: row
            .get::<String>(0)
            .map_err(|e| DigestError::Storage(e.to_string()))?,
        file_id: match row.get::<String>(1).ok() {
            Some(s) => Some(parse_file_id(&s)?),
            None => None,
        },
        text: row
            .get::<String>(2)
            .map_err(|e| DigestError::Storage(e.to_string()))?,
        created_at: {
            let s: String = row
                .get(3)
                .map_err(|e| DigestError::Storage(e.to_string()))?;
            parse_timestamp(&s)?
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("dd_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn sample_file(name: &str) -> FileMeta {
        FileMeta {
            id: FileId::new(),
            original_name: name.into(),
            content_type: Some("text/plain".into()),
            size: 2048,
            content_hash: "abc123".into(),
            uploaded_at: Utc::now(),
        }
    }

    fn fragment(file_id: &FileId, seq: u32, page: Option<u32>) -> Fragment {
        Fragment {
            file_id: file_id.clone(),
            sequence_index: seq,
            text: format!("fragment number {seq}"),
            page,
            source_name: Some("notes.txt".into()),
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        let version = storage.get_schema_version().await;
        assert_eq!(version, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("dd_test_{}.db", Uuid::now_v7()));
        let _s1 = Storage::open(&tmp).await.expect("first open");
        drop(_s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn file_insert_and_lookup() {
        let storage = test_storage().await;
        let file = sample_file("lecture-01.txt");
        storage.insert_file(&file).await.expect("insert file");

        let found = storage
            .get_file_by_id(&file.id)
            .await
            .expect("get file")
            .expect("file exists");
        assert_eq!(found.id, file.id);
        assert_eq!(found.original_name, "lecture-01.txt");
        assert_eq!(found.content_type.as_deref(), Some("text/plain"));
        assert_eq!(found.size, 2048);

        let missing = storage.get_file_by_id(&FileId::new()).await.expect("query");
        assert!(missing.is_none());

        let files = storage.list_files().await.expect("list files");
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn fragments_come_back_in_sequence_order() {
        let storage = test_storage().await;
        let file = sample_file("paper.txt");
        storage.insert_file(&file).await.unwrap();

        // Inserted out of order on purpose.
        let fragments = vec![
            fragment(&file.id, 2, Some(2)),
            fragment(&file.id, 0, Some(1)),
            fragment(&file.id, 1, None),
        ];
        storage.save_fragments(&fragments).await.expect("save fragments");

        let loaded = storage
            .query_chunks_by_file(&file.id)
            .await
            .expect("query chunks");
        let order: Vec<u32> = loaded.iter().map(|f| f.sequence_index).collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert_eq!(loaded[0].page, Some(1));
        assert_eq!(loaded[1].page, None);
        assert_eq!(loaded[2].source_name.as_deref(), Some("notes.txt"));
        assert_eq!(loaded[0].text, "fragment number 0");
    }

    #[tokio::test]
    async fn chunks_for_unknown_file_are_empty() {
        let storage = test_storage().await;
        let loaded = storage.query_chunks_by_file(&FileId::new()).await.unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn summaries_are_appended() {
        let storage = test_storage().await;
        let file = sample_file("book.txt");
        storage.insert_file(&file).await.unwrap();

        let first = storage
            .save_summary(Some(&file.id), "first summary of the book")
            .await
            .expect("save summary");
        let second = storage
            .save_summary(Some(&file.id), "second summary of the book")
            .await
            .expect("save summary again");
        assert_ne!(first, second);

        let record = storage
            .get_summary_by_id(&first)
            .await
            .expect("get summary")
            .expect("summary exists");
        assert_eq!(record.file_id.as_ref(), Some(&file.id));
        assert_eq!(record.text, "first summary of the book");

        let all = storage
            .list_summaries_for_file(&file.id)
            .await
            .expect("list summaries");
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn combined_summary_has_no_owner() {
        let storage = test_storage().await;
        let id = storage
            .save_summary(None, "combined summary text")
            .await
            .expect("save combined");
        let record = storage.get_summary_by_id(&id).await.unwrap().unwrap();
        assert!(record.file_id.is_none());
    }

    #[tokio::test]
    async fn ingest_file_stores_file_and_fragments() {
        let storage = test_storage().await;
        let file = sample_file("lecture-02.txt");
        let fragments = vec![fragment(&file.id, 0, None), fragment(&file.id, 1, None)];
        storage
            .ingest_file(&file, &fragments)
            .await
            .expect("ingest file");

        assert!(storage.get_file_by_id(&file.id).await.unwrap().is_some());
        let loaded = storage.query_chunks_by_file(&file.id).await.unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[tokio::test]
    async fn failed_ingest_leaves_nothing_behind() {
        let storage = test_storage().await;
        let file = sample_file("broken.txt");
        // Duplicate sequence index violates UNIQUE(file_id, seq) on the third insert.
        let fragments = vec![
            fragment(&file.id, 0, None),
            fragment(&file.id, 1, None),
            fragment(&file.id, 1, None),
        ];

        let result = storage.ingest_file(&file, &fragments).await;
        assert!(result.is_err());

        assert!(storage.get_file_by_id(&file.id).await.unwrap().is_none());
        assert!(storage.query_chunks_by_file(&file.id).await.unwrap().is_empty());
        assert!(storage.list_files().await.unwrap().is_empty());

        // The connection is usable again after the rollback.
        let retry = sample_file("broken.txt");
        storage
            .ingest_file(&retry, &[fragment(&retry.id, 0, None)])
            .await
            .expect("ingest after rollback");
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("dd_test_{}.db", Uuid::now_v7()));
        let rw = Storage::open(&tmp).await.unwrap();
        rw.insert_file(&sample_file("a.txt")).await.unwrap();
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.unwrap();
        let result = ro.save_summary(None, "should not be written").await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read-only"));
    }
}
