//! Plain-text ingest: split a UTF-8 document into overlapping word windows
//! and tag each with its provenance.
//!
//! Pages are separated by form feeds (`\x0c`), the convention of
//! `pdftotext` and similar extractors. Page numbers are recorded only when the
//! text actually has more than one page.

use chrono::Utc;
use docdigest_shared::{DigestError, FileId, FileMeta, Fragment, IngestConfig, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

const PAGE_BREAK: char = '\x0c';

/// Chunking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    pub chunk_words: usize,
    pub overlap: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self::from(&IngestConfig::default())
    }
}

impl From<&IngestConfig> for IngestOptions {
    fn from(config: &IngestConfig) -> Self {
        Self {
            chunk_words: config.chunk_words,
            overlap: config.overlap,
        }
    }
}

/// A file ready to hand to storage.
#[derive(Debug, Clone)]
pub struct PreparedFile {
    pub meta: FileMeta,
    pub fragments: Vec<Fragment>,
}

/// Split `text` into windows of `max_words` words, consecutive windows
/// sharing `overlap` words. Text of at most `max_words` words is returned as
/// a single chunk; text with no words yields no chunks.
pub fn chunk_words(text: &str, max_words: usize, overlap: usize) -> Result<Vec<String>> {
    if max_words == 0 {
        return Err(DigestError::validation("chunk size must be at least one word"));
    }
    if overlap >= max_words {
        return Err(DigestError::validation(format!(
            "overlap ({overlap}) must be smaller than chunk size ({max_words})"
        )));
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Ok(Vec::new());
    }
    if words.len() <= max_words {
        return Ok(vec![text.trim().to_string()]);
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + max_words).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start = end - overlap;
    }
    Ok(chunks)
}

/// Decode, chunk and fingerprint one plain-text file.
#[instrument(skip_all, fields(name = %name, bytes = bytes.len()))]
pub fn prepare_file(
    name: &str,
    bytes: &[u8],
    content_type: Option<&str>,
    options: &IngestOptions,
) -> Result<PreparedFile> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| DigestError::validation(format!("{name} is not valid UTF-8 text: {e}")))?;

    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let content_hash = format!("{:x}", hasher.finalize());

    let id = FileId::new();
    let pages: Vec<&str> = text.split(PAGE_BREAK).collect();
    let paged = pages.len() > 1;

    let mut fragments = Vec::new();
    for (page_idx, page) in pages.iter().enumerate() {
        for chunk in chunk_words(page, options.chunk_words, options.overlap)? {
            fragments.push(Fragment {
                file_id: id.clone(),
                sequence_index: fragments.len() as u32,
                text: chunk,
                page: paged.then_some(page_idx as u32 + 1),
                source_name: Some(name.to_string()),
            });
        }
    }

    debug!(pages = pages.len(), fragments = fragments.len(), "prepared file");

    Ok(PreparedFile {
        meta: FileMeta {
            id,
            original_name: name.to_string(),
            content_type: content_type.map(String::from),
            size: bytes.len() as u64,
            content_hash,
            uploaded_at: Utc::now(),
        },
        fragments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = chunk_words("  a short\nparagraph  ", 200, 40).unwrap();
        assert_eq!(chunks, vec!["a short\nparagraph"]);
    }

    #[test]
    fn blank_text_has_no_chunks() {
        assert!(chunk_words(" \n\t ", 200, 40).unwrap().is_empty());
    }

    #[test]
    fn windows_overlap() {
        let chunks = chunk_words(&numbered(10), 4, 1).unwrap();
        assert_eq!(
            chunks,
            vec!["w0 w1 w2 w3", "w3 w4 w5 w6", "w6 w7 w8 w9"]
        );
    }

    #[test]
    fn last_window_may_be_short() {
        let chunks = chunk_words(&numbered(450), 200, 40).unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(chunks[1].starts_with("w160 "));
        assert!(chunks[2].starts_with("w320 "));
        assert!(chunks[2].ends_with(" w449"));
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(chunk_words("a b c", 0, 0).is_err());
        let err = chunk_words("a b c", 4, 4).unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn single_page_has_no_page_numbers() {
        let prepared =
            prepare_file("notes.txt", numbered(5).as_bytes(), None, &IngestOptions::default())
                .unwrap();

        assert_eq!(prepared.fragments.len(), 1);
        let fragment = &prepared.fragments[0];
        assert_eq!(fragment.page, None);
        assert_eq!(fragment.source_name.as_deref(), Some("notes.txt"));
        assert_eq!(fragment.file_id, prepared.meta.id);
        assert_eq!(prepared.meta.size, numbered(5).len() as u64);
        assert_eq!(prepared.meta.content_hash.len(), 64);
    }

    #[test]
    fn form_feeds_split_pages_with_global_sequence() {
        let text = format!("{}\x0c\x0c{}", numbered(6), numbered(3));
        let options = IngestOptions {
            chunk_words: 4,
            overlap: 1,
        };
        let prepared = prepare_file("book.txt", text.as_bytes(), Some("text/plain"), &options).unwrap();

        let pages: Vec<_> = prepared.fragments.iter().map(|f| f.page).collect();
        let seqs: Vec<_> = prepared.fragments.iter().map(|f| f.sequence_index).collect();
        // Page 1 makes two windows, page 2 is blank, page 3 fits in one.
        assert_eq!(pages, vec![Some(1), Some(1), Some(3)]);
        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(prepared.meta.content_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let err = prepare_file("blob.bin", &[0xff, 0xfe, 0x00], None, &IngestOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn identical_bytes_hash_identically() {
        let opts = IngestOptions::default();
        let a = prepare_file("a.txt", b"same content", None, &opts).unwrap();
        let b = prepare_file("b.txt", b"same content", None, &opts).unwrap();
        assert_eq!(a.meta.content_hash, b.meta.content_hash);
        assert_ne!(a.meta.id, b.meta.id);
    }
}
