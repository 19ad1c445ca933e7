//! Core domain types for docdigest: source files, fragments, and summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// FileId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for source file identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub Uuid);

impl FileId {
    /// Generate a new time-sortable file identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for FileId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// OutputFormat
// ---------------------------------------------------------------------------

/// Markup the generation service is asked to produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Markdown,
    #[default]
    Latex,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Latex => "latex",
        }
    }

    /// File extension used when exporting a summary in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Latex => "tex",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "latex" | "tex" => Ok(Self::Latex),
            other => Err(format!(
                "unknown output format '{other}': expected 'markdown' or 'latex'"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// FileMeta
// ---------------------------------------------------------------------------

/// Metadata for an ingested source file, stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMeta {
    /// Unique file identifier (UUID v7).
    pub id: FileId,
    /// File name as supplied at ingest time.
    pub original_name: String,
    /// MIME type hint, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Size of the raw file in bytes.
    pub size: u64,
    /// SHA-256 hash of the raw file bytes.
    pub content_hash: String,
    /// When the file was ingested.
    pub uploaded_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Fragment
// ---------------------------------------------------------------------------

/// One unit of extracted text with its provenance.
///
/// Fragments of a file are consumed in ascending `sequence_index` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// Owning file.
    pub file_id: FileId,
    /// Position of this fragment within its file.
    pub sequence_index: u32,
    /// Extracted text.
    pub text: String,
    /// 1-based page number, when the source format has pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Human-readable name of the source document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
}

// ---------------------------------------------------------------------------
// SummaryRecord
// ---------------------------------------------------------------------------

/// A persisted summary. Append-only: created once per orchestrator run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Summary identifier (UUID v7).
    pub id: String,
    /// File the summary belongs to; `None` for combined multi-file summaries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<FileId>,
    /// Summary text.
    pub text: String,
    /// When the record was written.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_id_roundtrip() {
        let id = FileId::new();
        let s = id.to_string();
        let parsed: FileId = s.parse().expect("parse FileId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn output_format_parsing() {
        assert_eq!("latex".parse::<OutputFormat>(), Ok(OutputFormat::Latex));
        assert_eq!("Markdown".parse::<OutputFormat>(), Ok(OutputFormat::Markdown));
        assert_eq!("md".parse::<OutputFormat>(), Ok(OutputFormat::Markdown));
        assert!("pdf".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::default(), OutputFormat::Latex);
        assert_eq!(OutputFormat::Latex.extension(), "tex");
    }

    #[test]
    fn output_format_serializes_lowercase() {
        let json = serde_json::to_string(&OutputFormat::Markdown).expect("serialize");
        assert_eq!(json, r#""markdown""#);
    }

    #[test]
    fn fragment_serialization_skips_missing_provenance() {
        let fragment = Fragment {
            file_id: FileId::new(),
            sequence_index: 3,
            text: "Gradient descent minimises loss.".into(),
            page: None,
            source_name: None,
        };

        let json = serde_json::to_string(&fragment).expect("serialize");
        assert!(!json.contains("page"));
        assert!(!json.contains("source_name"));
        let parsed: Fragment = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, fragment);
    }

    #[test]
    fn combined_summary_record_has_no_owner() {
        let record = SummaryRecord {
            id: Uuid::now_v7().to_string(),
            file_id: None,
            text: "=== DOCUMENT: a.txt ===".into(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&record).expect("serialize");
        assert!(!json.contains("file_id"));
    }
}
