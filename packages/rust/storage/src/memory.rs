//! In-memory [`SummaryStore`] for tests and dry runs.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use docdigest_shared::{FileId, FileMeta, Fragment, Result, SummaryRecord};
use uuid::Uuid;

use crate::SummaryStore;

#[derive(Default)]
struct MemoryState {
    files: HashMap<FileId, FileMeta>,
    fragments: HashMap<FileId, Vec<Fragment>>,
    summaries: Vec<SummaryRecord>,
}

/// A process-local store with the same observable behavior as [`crate::Storage`].
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a file together with its fragments.
    pub fn insert_file(&self, file: FileMeta, fragments: Vec<Fragment>) {
        let mut state = self.state();
        state.fragments.insert(file.id.clone(), fragments);
        state.files.insert(file.id.clone(), file);
    }

    /// Snapshot of every summary written so far, in write order.
    pub fn summaries(&self) -> Vec<SummaryRecord> {
        self.state().summaries.clone()
    }
}

#[async_trait]
impl SummaryStore for MemoryStore {
    async fn get_file_by_id(&self, file_id: &FileId) -> Result<Option<FileMeta>> {
        Ok(self.state().files.get(file_id).cloned())
    }

    async fn query_chunks_by_file(&self, file_id: &FileId) -> Result<Vec<Fragment>> {
        let mut fragments = self
            .state()
            .fragments
            .get(file_id)
            .cloned()
            .unwrap_or_default();
        fragments.sort_by_key(|f| f.sequence_index);
        Ok(fragments)
    }

    async fn save_summary(&self, file_id: Option<&FileId>, text: &str) -> Result<String> {
        let id = Uuid::now_v7().to_string();
        self.state().summaries.push(SummaryRecord {
            id: id.clone(),
            file_id: file_id.cloned(),
            text: text.to_string(),
            created_at: Utc::now(),
        });
        Ok(id)
    }
}
