//! Final-summary sizing: a word target and the token budget of the
//! reduction call.

use serde::Serialize;

/// The final summary never aims below this many words.
pub const MIN_TARGET_WORDS: usize = 150;

/// Approximate tokens per word of generated prose.
pub const TOKENS_PER_WORD: f64 = 1.33;

/// Size goal for one final summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeTarget {
    /// Advisory word count for the final summary.
    pub target_words: usize,
    /// Output token cap for the reduction call.
    pub token_budget: u32,
}

/// `max(150, floor(total_words * ratio))`.
pub fn target_words(total_words: usize, ratio: f64) -> usize {
    // `as` saturates: negative or NaN products become 0.
    let scaled = (total_words as f64 * ratio).floor() as usize;
    scaled.max(MIN_TARGET_WORDS)
}

/// `min(max_tokens_cap, floor(target_words * 1.33))`.
pub fn token_budget(target_words: usize, max_tokens_cap: u32) -> u32 {
    let tokens = (target_words as f64 * TOKENS_PER_WORD).floor() as u64;
    tokens.min(u64::from(max_tokens_cap)) as u32
}

/// Derive the size goal from the total input word count.
pub fn estimate(total_words: usize, ratio: f64, max_tokens_cap: u32) -> SizeTarget {
    let target_words = target_words(total_words, ratio);
    SizeTarget {
        target_words,
        token_budget: token_budget(target_words, max_tokens_cap),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_inputs_hit_the_floor() {
        assert_eq!(target_words(1000, 0.12), 150);
        assert_eq!(target_words(0, 0.12), 150);
        assert_eq!(target_words(500, -1.0), 150);
    }

    #[test]
    fn large_inputs_scale_with_ratio() {
        assert_eq!(target_words(10_000, 0.12), 1200);
        assert_eq!(target_words(10_001, 0.5), 5000);
    }

    #[test]
    fn budget_uses_expansion_factor() {
        assert_eq!(token_budget(150, 16_000), 199);
        assert_eq!(token_budget(1200, 16_000), 1596);
    }

    #[test]
    fn budget_is_capped() {
        assert_eq!(token_budget(100_000, 16_000), 16_000);
        assert_eq!(token_budget(1200, 500), 500);
    }

    #[test]
    fn estimate_combines_both() {
        let target = estimate(10_000, 0.12, 16_000);
        assert_eq!(
            target,
            SizeTarget {
                target_words: 1200,
                token_budget: 1596
            }
        );
    }
}
