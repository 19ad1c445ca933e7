//! Prompt text sent with every generation call.

use docdigest_shared::OutputFormat;

use crate::GenerationRequest;

const LATEX_SYSTEM_PROMPT: &str = "\
You are an expert academic note-taking assistant.
Convert course material into clean, structured LaTeX notes.

Rules:
- Use \\section{}, \\subsection{} and \\subsubsection{} for structure
- Use itemize environments for bullet points and keep bullets concise
- Write equations in LaTeX math mode
- Do not invent information
- Do not repeat ideas
- Do not include exercises or commentary
- Output only the LaTeX body, without a preamble";

const MARKDOWN_SYSTEM_PROMPT: &str = "\
You are an expert academic note-taking assistant.
Convert course material into clean, structured Markdown notes.

Rules:
- Use #, ## and ### headings for structure
- Use bullet lists and keep bullets concise
- Write equations in $...$ or $$...$$
- Do not invent information
- Do not repeat ideas
- Do not include exercises or commentary
- Output only the notes";

/// Tolerance around the advisory word target, as a fraction.
pub const TARGET_TOLERANCE: f64 = 0.2;

/// System prompt for the requested output format.
pub fn system_prompt(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Latex => LATEX_SYSTEM_PROMPT,
        OutputFormat::Markdown => MARKDOWN_SYSTEM_PROMPT,
    }
}

/// User prompt wrapping the source text, with the length goal when one is set.
pub fn user_prompt(request: &GenerationRequest) -> String {
    let mut prompt = format!(
        "Convert the following text into structured {} notes.\n",
        match request.output_format {
            OutputFormat::Latex => "LaTeX",
            OutputFormat::Markdown => "Markdown",
        }
    );

    if let Some(target) = request.target_words {
        let (low, high) = word_range(target);
        prompt.push_str(&format!(
            "Aim for about {target} words (between {low} and {high}).\n"
        ));
    }

    prompt.push('\n');
    prompt.push_str(&request.text);
    prompt
}

/// Acceptable word range around `target`.
fn word_range(target: usize) -> (usize, usize) {
    let spread = (target as f64 * TARGET_TOLERANCE).round() as usize;
    (target.saturating_sub(spread), target + spread)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(target_words: Option<usize>) -> GenerationRequest {
        GenerationRequest {
            text: "SOURCE: a.txt | page: 1 | chunk: 0\nEntropy measures disorder.".into(),
            output_format: OutputFormat::Markdown,
            max_output_tokens: 500,
            temperature: 0.2,
            target_words,
        }
    }

    #[test]
    fn system_prompt_matches_format() {
        assert!(system_prompt(OutputFormat::Latex).contains("\\section{}"));
        assert!(system_prompt(OutputFormat::Markdown).contains("headings"));
    }

    #[test]
    fn user_prompt_embeds_text() {
        let prompt = user_prompt(&request(None));
        assert!(prompt.contains("Markdown notes"));
        assert!(prompt.ends_with("Entropy measures disorder."));
        assert!(!prompt.contains("Aim for"));
    }

    #[test]
    fn user_prompt_includes_target_range() {
        let prompt = user_prompt(&request(Some(500)));
        assert!(prompt.contains("about 500 words (between 400 and 600)"));
    }

    #[test]
    fn word_range_is_twenty_percent() {
        assert_eq!(word_range(150), (120, 180));
        assert_eq!(word_range(1200), (960, 1440));
        assert_eq!(word_range(0), (0, 0));
    }
}
