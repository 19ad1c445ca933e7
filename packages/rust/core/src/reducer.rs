//! Hierarchical reduction of batch summaries into one final summary.

use docdigest_generation::TextGenerator;
use serde::Serialize;
use tracing::{info, warn};

use crate::batcher::BLOCK_SEPARATOR;
use crate::estimator::SizeTarget;
use crate::summarizer::{BatchOutcome, FailureReason, GenerationParams, generate_validated};
use crate::validator::SummaryGate;

/// How the final summary was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "path", content = "reason", rename_all = "snake_case")]
pub enum ReductionPath {
    /// No batch summary survived; the final summary is empty.
    Empty,
    /// Exactly one batch summary, used verbatim.
    Single,
    /// Reduction disabled; batch summaries joined.
    Joined,
    /// One reduction call produced a valid summary.
    Reduced,
    /// The reduction call failed or was rejected; batch summaries joined.
    FellBack(FailureReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduction {
    pub summary: String,
    pub path: ReductionPath,
}

impl Reduction {
    pub fn is_empty(&self) -> bool {
        self.path == ReductionPath::Empty
    }
}

/// Combine `summaries` into a final summary.
///
/// At most one generation call is made, and only when there are two or more
/// summaries and `hierarchical` is set. That call gets `target.token_budget`
/// as its output cap and `target.target_words` as an advisory length. Any
/// failure falls back to the blank-line join, so batch work is never lost.
pub async fn reduce(
    summaries: &[String],
    target: SizeTarget,
    hierarchical: bool,
    generator: &dyn TextGenerator,
    gate: &dyn SummaryGate,
    params: &GenerationParams,
) -> Reduction {
    match summaries {
        [] => Reduction {
            summary: String::new(),
            path: ReductionPath::Empty,
        },
        [only] => Reduction {
            summary: only.clone(),
            path: ReductionPath::Single,
        },
        _ if !hierarchical => Reduction {
            summary: summaries.join(BLOCK_SEPARATOR),
            path: ReductionPath::Joined,
        },
        _ => {
            let joined = summaries.join(BLOCK_SEPARATOR);
            info!(
                summaries = summaries.len(),
                target_words = target.target_words,
                token_budget = target.token_budget,
                "reducing batch summaries"
            );

            let params = GenerationParams {
                max_output_tokens: target.token_budget,
                ..*params
            };
            let request = params.request(joined.clone(), Some(target.target_words));

            match generate_validated(generator, gate, &request).await {
                BatchOutcome::Succeeded(summary) => Reduction {
                    summary,
                    path: ReductionPath::Reduced,
                },
                BatchOutcome::Failed(reason) => {
                    warn!(%reason, "reduction unusable, falling back to joined batch summaries");
                    Reduction {
                        summary: joined,
                        path: ReductionPath::FellBack(reason),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedGenerator;
    use crate::validator::{Rejection, SummaryValidator};
    use docdigest_shared::OutputFormat;

    const TARGET: SizeTarget = SizeTarget {
        target_words: 1200,
        token_budget: 1596,
    };

    fn params() -> GenerationParams {
        GenerationParams {
            output_format: OutputFormat::Latex,
            max_output_tokens: 2000,
            temperature: 0.2,
        }
    }

    fn summaries() -> Vec<String> {
        vec![
            "\\section{Part one} Heat flows from hot to cold.".to_string(),
            "\\section{Part two} Entropy of the universe grows.".to_string(),
        ]
    }

    async fn run(summaries: &[String], hierarchical: bool, generator: &ScriptedGenerator) -> Reduction {
        reduce(
            summaries,
            TARGET,
            hierarchical,
            generator,
            &SummaryValidator::default(),
            &params(),
        )
        .await
    }

    #[tokio::test]
    async fn empty_input_is_empty_without_calls() {
        let generator = ScriptedGenerator::echo();
        let reduction = run(&[], true, &generator).await;
        assert!(reduction.is_empty());
        assert_eq!(reduction.summary, "");
        assert!(generator.calls().is_empty());
    }

    #[tokio::test]
    async fn single_summary_is_returned_verbatim() {
        let generator = ScriptedGenerator::echo();
        let only = vec!["A lone summary that is long enough.".to_string()];
        let reduction = run(&only, true, &generator).await;
        assert_eq!(reduction.summary, only[0]);
        assert_eq!(reduction.path, ReductionPath::Single);
        assert!(generator.calls().is_empty());
    }

    #[tokio::test]
    async fn disabled_reduction_joins() {
        let generator = ScriptedGenerator::echo();
        let reduction = run(&summaries(), false, &generator).await;
        assert_eq!(reduction.summary, summaries().join("\n\n"));
        assert_eq!(reduction.path, ReductionPath::Joined);
        assert!(generator.calls().is_empty());
    }

    #[tokio::test]
    async fn reduction_call_uses_budget_and_target() {
        let generator =
            ScriptedGenerator::from_replies(vec![Ok("\\section{Thermodynamics} Condensed.".into())]);
        let reduction = run(&summaries(), true, &generator).await;

        assert_eq!(reduction.summary, "\\section{Thermodynamics} Condensed.");
        assert_eq!(reduction.path, ReductionPath::Reduced);

        let calls = generator.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].text, summaries().join("\n\n"));
        assert_eq!(calls[0].max_output_tokens, 1596);
        assert_eq!(calls[0].target_words, Some(1200));
        assert_eq!(calls[0].output_format, OutputFormat::Latex);
    }

    #[tokio::test]
    async fn rejected_reduction_falls_back_to_join() {
        let generator = ScriptedGenerator::from_replies(vec![Ok("NULL".into())]);
        let reduction = run(&summaries(), true, &generator).await;

        assert_eq!(reduction.summary, summaries().join("\n\n"));
        assert_eq!(
            reduction.path,
            ReductionPath::FellBack(FailureReason::Rejected(Rejection::Sentinel("null".into())))
        );
    }

    #[tokio::test]
    async fn failed_reduction_falls_back_to_join() {
        let generator = ScriptedGenerator::failing();
        let reduction = run(&summaries(), true, &generator).await;

        assert_eq!(reduction.summary, summaries().join("\n\n"));
        assert!(matches!(
            reduction.path,
            ReductionPath::FellBack(FailureReason::Generation(_))
        ));
        assert_eq!(generator.calls().len(), 1);
    }
}
