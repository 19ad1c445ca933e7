//! Write summaries to disk as `.tex` or `.md` files.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use docdigest_shared::{DigestError, OutputFormat, Result};
use regex::Regex;
use tracing::{debug, instrument};

/// Greek-letter commands the model tends to emit outside math mode.
static GREEK_COMMAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(?:alpha|beta|gamma|delta|epsilon|theta|lambda|mu|sigma|pi)\b")
        .expect("valid regex")
});

/// Wrap bare Greek-letter commands in `$...$` unless a `$` already touches them.
///
/// Best effort only: a command inside `\(...\)` or a longer math span is not
/// detected and will be wrapped again.
pub fn clean_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for m in GREEK_COMMAND.find_iter(text) {
        let before = text[..m.start()].ends_with('$');
        let after = text[m.end()..].starts_with('$');
        out.push_str(&text[last..m.start()]);
        if before || after {
            out.push_str(m.as_str());
        } else {
            out.push('$');
            out.push_str(m.as_str());
            out.push('$');
        }
        last = m.end();
    }

    out.push_str(&text[last..]);
    out
}

/// Write `text` to `<out_dir>/<prefix>.<ext>` and return the path.
///
/// LaTeX output goes through [`clean_latex`]. The file is written to a
/// temporary name and renamed into place.
#[instrument(skip_all, fields(out_dir = %out_dir.display(), prefix = %prefix, format = %format))]
pub fn write_summary(
    text: &str,
    out_dir: &Path,
    prefix: &str,
    format: OutputFormat,
) -> Result<PathBuf> {
    if prefix.is_empty() || prefix.contains(['/', '\\']) {
        return Err(DigestError::validation(format!(
            "invalid export file prefix '{prefix}'"
        )));
    }

    std::fs::create_dir_all(out_dir).map_err(|e| DigestError::io(out_dir, e))?;

    let content = match format {
        OutputFormat::Latex => clean_latex(text),
        OutputFormat::Markdown => text.to_string(),
    };

    let filename = format!("{prefix}.{}", format.extension());
    let target = out_dir.join(&filename);
    let temp = out_dir.join(format!(".{filename}.tmp"));

    std::fs::write(&temp, &content).map_err(|e| DigestError::io(&temp, e))?;
    std::fs::rename(&temp, &target).map_err(|e| DigestError::io(&target, e))?;

    debug!(path = %target.display(), bytes = content.len(), "wrote summary");
    Ok(target)
}
