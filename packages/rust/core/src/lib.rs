//! Summarization pipeline for docdigest.
//!
//! Fragments are rendered with provenance headers, packed into word-budgeted
//! batches, summarized one batch at a time, and reduced into a final summary
//! sized against the input. [`SummaryPipeline`] drives the whole sequence for
//! one file or for several files plus a combined summary.

pub mod batcher;
pub mod estimator;
pub mod export;
pub mod ingest;
pub mod orchestrator;
pub mod progress;
pub mod provenance;
pub mod reducer;
pub mod summarizer;
pub mod validator;

#[cfg(test)]
mod testing;

pub use batcher::{Batch, batch_blocks};
pub use estimator::{SizeTarget, estimate};
pub use export::{clean_latex, write_summary};
pub use ingest::{IngestOptions, PreparedFile, chunk_words, prepare_file};
pub use orchestrator::{CombinedSummary, FileSummary, MultiFileSummary, SummaryPipeline};
pub use progress::{SilentProgress, SummaryProgress};
pub use provenance::{format_fragment, word_count};
pub use reducer::{Reduction, ReductionPath, reduce};
pub use summarizer::{BatchOutcome, FailureReason, GenerationParams, RunReport, summarize_batches};
pub use validator::{Rejection, SummaryGate, SummaryValidator};
