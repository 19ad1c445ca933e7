//! File and multi-file summary orchestrators.
//!
//! Both drive the same sequence: format, batch, summarize each batch,
//! size the target, reduce, persist. Everything runs one call at a time in
//! input order. Only a missing file surfaces as an error; generation
//! problems degrade the result and are reported in [`RunReport`].

use std::time::Instant;

use docdigest_generation::TextGenerator;
use docdigest_shared::{DigestError, FileId, PipelineConfig, Result};
use docdigest_storage::SummaryStore;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::batcher::batch_blocks;
use crate::estimator::{SizeTarget, estimate};
use crate::progress::{SilentProgress, SummaryProgress};
use crate::provenance::{format_fragments, word_count};
use crate::reducer::{Reduction, ReductionPath, reduce};
use crate::summarizer::{GenerationParams, RunReport, summarize_batches};
use crate::validator::{SummaryGate, SummaryValidator};

/// Note attached when a file has no fragments.
pub const NOTE_NO_CHUNKS: &str = "no chunks";
/// Note attached when every batch failed or was rejected.
pub const NOTE_NO_VALID_BATCHES: &str = "no valid batch summaries";
/// Note attached when no per-file summary qualifies for combination.
pub const NOTE_NO_VALID_FILES: &str = "no valid per-file summaries";

/// Result of summarizing one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub file_id: FileId,
    pub file_name: String,
    /// Set whenever a summary record was written.
    pub summary_id: Option<String>,
    /// Final summary; empty when nothing usable was produced.
    pub summary: String,
    /// Number of valid batch summaries.
    pub batches: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub report: RunReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduction: Option<ReductionPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<SizeTarget>,
}

/// Second-level summary over several per-file summaries.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CombinedSummary {
    pub summary_id: Option<String>,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub batches: usize,
    pub report: RunReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduction: Option<ReductionPath>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MultiFileSummary {
    pub per_file: Vec<FileSummary>,
    pub combined: CombinedSummary,
}

/// Wrap a per-file summary as one atomic block for the combined pass.
pub fn wrap_document(name: &str, summary: &str) -> String {
    format!("=== DOCUMENT: {name} ===\n\n{summary}")
}

/// Output of the shared batch/reduce sequence.
struct Digest {
    batches: usize,
    report: RunReport,
    reduction: Reduction,
    target: SizeTarget,
}

/// Summarization pipeline over an explicitly supplied store and generator.
pub struct SummaryPipeline<'a> {
    store: &'a dyn SummaryStore,
    generator: &'a dyn TextGenerator,
    config: PipelineConfig,
    gate: Box<dyn SummaryGate + 'a>,
    progress: &'a dyn SummaryProgress,
}

impl<'a> SummaryPipeline<'a> {
    /// Pipeline with the default validator and no progress output.
    pub fn new(
        store: &'a dyn SummaryStore,
        generator: &'a dyn TextGenerator,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            generator,
            config,
            gate: Box::new(SummaryValidator::default()),
            progress: &SilentProgress,
        }
    }

    /// Replace the summary validator.
    pub fn with_gate(mut self, gate: impl SummaryGate + 'a) -> Self {
        self.gate = Box::new(gate);
        self
    }

    pub fn with_progress(mut self, progress: &'a dyn SummaryProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn batch_params(&self) -> GenerationParams {
        GenerationParams {
            output_format: self.config.output_format,
            max_output_tokens: self.config.batch_max_tokens,
            temperature: self.config.temperature,
        }
    }

    /// Summarize one file and persist the result.
    ///
    /// Fails with `NotFound` when the file has no metadata. A file without
    /// fragments yields an empty summary with a note and nothing is persisted.
    /// When every batch fails the empty summary is still recorded, with a note.
    #[instrument(skip_all, fields(file_id = %file_id))]
    pub async fn summarize_file(&self, file_id: &FileId) -> Result<FileSummary> {
        let start = Instant::now();

        let meta = self
            .store
            .get_file_by_id(file_id)
            .await?
            .ok_or_else(|| DigestError::file_not_found(file_id))?;

        self.progress.phase(&format!("Summarizing {}", meta.original_name));
        let fragments = self.store.query_chunks_by_file(file_id).await?;

        let mut result = FileSummary {
            file_id: file_id.clone(),
            file_name: meta.original_name,
            summary_id: None,
            summary: String::new(),
            batches: 0,
            note: None,
            report: RunReport::default(),
            reduction: None,
            target: None,
        };

        if fragments.is_empty() {
            info!(file = %result.file_name, "file has no chunks, skipping generation");
            result.note = Some(NOTE_NO_CHUNKS.to_string());
            return Ok(result);
        }

        let blocks = format_fragments(&fragments);
        let digest = self.digest(&blocks).await;

        result.batches = digest.batches;
        result.report = digest.report;
        result.target = Some(digest.target);
        result.reduction = Some(digest.reduction.path.clone());

        if digest.reduction.is_empty() {
            result.note = Some(NOTE_NO_VALID_BATCHES.to_string());
        }
        let id = self
            .store
            .save_summary(Some(file_id), &digest.reduction.summary)
            .await?;
        result.summary_id = Some(id);
        result.summary = digest.reduction.summary;

        info!(
            file = %result.file_name,
            fragments = fragments.len(),
            batches = result.batches,
            summary_words = word_count(&result.summary),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "file summary complete"
        );

        Ok(result)
    }

    /// Summarize several files in order, then combine their summaries.
    ///
    /// An error on any file aborts the remaining queue. Per-file summaries
    /// that fail validation are left out of the combined pass. The combined
    /// summary is persisted without an owning file.
    #[instrument(skip_all, fields(files = file_ids.len()))]
    pub async fn summarize_files(&self, file_ids: &[FileId]) -> Result<MultiFileSummary> {
        let start = Instant::now();
        let mut per_file = Vec::with_capacity(file_ids.len());

        for file_id in file_ids {
            per_file.push(self.summarize_file(file_id).await?);
        }

        let blocks: Vec<String> = per_file
            .iter()
            .filter(|file| match self.gate.check(&file.summary) {
                Ok(()) => true,
                Err(reason) => {
                    warn!(file = %file.file_name, %reason, "excluding file from combined summary");
                    false
                }
            })
            .map(|file| wrap_document(&file.file_name, &file.summary))
            .collect();

        let mut combined = CombinedSummary::default();

        if blocks.is_empty() {
            info!("no per-file summaries to combine");
            combined.note = Some(NOTE_NO_VALID_FILES.to_string());
            return Ok(MultiFileSummary { per_file, combined });
        }

        self.progress.phase("Combining documents");
        let digest = self.digest(&blocks).await;

        combined.batches = digest.batches;
        combined.report = digest.report;
        combined.reduction = Some(digest.reduction.path.clone());

        if digest.reduction.is_empty() {
            combined.note = Some(NOTE_NO_VALID_BATCHES.to_string());
        }
        let id = self.store.save_summary(None, &digest.reduction.summary).await?;
        combined.summary_id = Some(id);
        combined.summary = digest.reduction.summary;

        info!(
            files = per_file.len(),
            combined_blocks = blocks.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "multi-file summary complete"
        );

        Ok(MultiFileSummary { per_file, combined })
    }

    /// Batch, summarize, size and reduce a list of blocks.
    async fn digest(&self, blocks: &[String]) -> Digest {
        let batches = batch_blocks(blocks, self.config.batch_words);
        let params = self.batch_params();

        let run = summarize_batches(
            &batches,
            self.generator,
            self.gate.as_ref(),
            &params,
            self.progress,
        )
        .await;

        let total_words = blocks.iter().map(|b| word_count(b)).sum();
        let target = estimate(total_words, self.config.target_ratio, self.config.max_tokens_cap);

        if run.summaries.len() > 1 && self.config.hierarchical {
            self.progress.phase("Reducing batch summaries");
        }
        let reduction = reduce(
            &run.summaries,
            target,
            self.config.hierarchical,
            self.generator,
            self.gate.as_ref(),
            &params,
        )
        .await;

        Digest {
            batches: run.summaries.len(),
            report: run.report,
            reduction,
            target,
        }
    }
}
