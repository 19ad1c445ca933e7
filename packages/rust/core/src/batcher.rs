//! Word-budgeted batching of formatted blocks.
//!
//! A single greedy pass: a block joins the current batch if the batch stays
//! within `max_words`, or if the batch is still empty. An oversized block
//! therefore becomes a batch of its own and is never split.

use crate::provenance::word_count;

/// Default word budget per batch.
pub const DEFAULT_BATCH_WORDS: usize = 1200;

/// Separator placed between blocks (and between summaries) when joined.
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// A contiguous run of blocks sent to the generation service in one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<'a> {
    blocks: &'a [String],
    words: usize,
}

impl<'a> Batch<'a> {
    /// The source blocks, in input order.
    pub fn blocks(&self) -> &'a [String] {
        self.blocks
    }

    /// Total word count of the blocks.
    pub fn word_count(&self) -> usize {
        self.words
    }

    /// Blocks joined with a blank line.
    pub fn text(&self) -> String {
        self.blocks.join(BLOCK_SEPARATOR)
    }
}

/// Partition `blocks` into ordered batches of at most `max_words` words.
///
/// Every returned batch is non-empty, and the batches' blocks concatenated in
/// order are exactly `blocks`.
pub fn batch_blocks(blocks: &[String], max_words: usize) -> Vec<Batch<'_>> {
    let mut batches = Vec::new();
    let mut start = 0;
    let mut current_words = 0;

    for (i, block) in blocks.iter().enumerate() {
        let words = word_count(block);
        if i > start && current_words + words > max_words {
            batches.push(Batch {
                blocks: &blocks[start..i],
                words: current_words,
            });
            start = i;
            current_words = 0;
        }
        current_words += words;
    }

    if start < blocks.len() {
        batches.push(Batch {
            blocks: &blocks[start..],
            words: current_words,
        });
    }

    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A block of exactly `n` words.
    fn block(n: usize, tag: &str) -> String {
        (0..n).map(|i| format!("{tag}{i}")).collect::<Vec<_>>().join(" ")
    }

    fn flatten<'a>(batches: &[Batch<'a>]) -> Vec<&'a String> {
        batches.iter().flat_map(|b| b.blocks().iter()).collect()
    }

    #[test]
    fn empty_input_yields_no_batches() {
        assert!(batch_blocks(&[], 100).is_empty());
    }

    #[test]
    fn three_hundred_word_file_splits_in_two() {
        let blocks = vec![block(100, "a"), block(100, "b"), block(100, "c")];
        let batches = batch_blocks(&blocks, 250);

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].blocks().len(), 2);
        assert_eq!(batches[0].word_count(), 200);
        assert_eq!(batches[1].blocks().len(), 1);
        assert_eq!(batches[1].word_count(), 100);
    }

    #[test]
    fn exact_fit_stays_in_one_batch() {
        let blocks = vec![block(60, "a"), block(40, "b")];
        let batches = batch_blocks(&blocks, 100);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].text(), format!("{}\n\n{}", blocks[0], blocks[1]));
    }

    #[test]
    fn oversized_block_is_isolated_not_split() {
        let blocks = vec![block(10, "a"), block(500, "big"), block(10, "c")];
        let batches = batch_blocks(&blocks, 100);

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[1].blocks(), &blocks[1..2]);
        assert_eq!(batches[1].word_count(), 500);
        assert_eq!(batches[1].text(), blocks[1]);
    }

    #[test]
    fn oversized_first_block_still_makes_progress() {
        let blocks = vec![block(300, "big"), block(5, "b")];
        let batches = batch_blocks(&blocks, 100);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].blocks().len(), 1);
    }

    #[test]
    fn order_and_budget_hold_across_mixed_sizes() {
        let sizes = [5, 80, 120, 3, 3, 3, 99, 1, 250, 40, 60, 0, 17];
        let blocks: Vec<String> = sizes
            .iter()
            .enumerate()
            .map(|(i, n)| block(*n, &format!("b{i}x")))
            .collect();

        for max_words in [1, 50, 100, 200, 1000] {
            let batches = batch_blocks(&blocks, max_words);

            let recovered = flatten(&batches);
            assert_eq!(recovered, blocks.iter().collect::<Vec<_>>());

            for batch in &batches {
                assert!(!batch.blocks().is_empty());
                assert!(batch.word_count() <= max_words || batch.blocks().len() == 1);
                assert_eq!(batch.word_count(), word_count(&batch.text()));
            }
        }
    }
}
