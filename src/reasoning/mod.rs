pub mod segmenter;
pub mod strip;

pub use segmenter::{Segment, Segmenter};
pub use strip::{extract_reasoning, strip_markers};

use serde::{Deserialize, Serialize};

/// An open/close token pair delimiting an inline reasoning region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerPair {
    pub open: String,
    pub close: String,
}

impl MarkerPair {
    #[must_use]
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }
}

/// Reasoning marker variants recognised simultaneously, in registration order.
///
/// Registration order only matters for tie-breaking when two open tokens
/// start at the same offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSet {
    pairs: Vec<MarkerPair>,
}

const DEFAULT_PAIRS: [(&str, &str); 3] = [
    ("◁think▶", "◁/think▶"),
    ("◁think▷", "◁/think▷"),
    ("<think>", "</think>"),
];

impl MarkerSet {
    /// Build a set from configured pairs, skipping pairs with an empty token.
    /// Falls back to the default variants when nothing usable remains.
    #[must_use]
    pub fn new(pairs: Vec<MarkerPair>) -> Self {
        let pairs: Vec<MarkerPair> = pairs
            .into_iter()
            .filter(|pair| !pair.open.is_empty() && !pair.close.is_empty())
            .collect();
        if pairs.is_empty() {
            return Self::default();
        }
        Self { pairs }
    }

    #[must_use]
    pub fn pairs(&self) -> &[MarkerPair] {
        &self.pairs
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&MarkerPair> {
        self.pairs.get(index)
    }

    /// Find the earliest open token of any variant in `text`.
    ///
    /// Returns `(variant index, byte offset)`. Ties go to the first registered
    /// variant.
    #[must_use]
    pub fn find_first_open(&self, text: &str) -> Option<(usize, usize)> {
        let mut best: Option<(usize, usize)> = None;
        for (index, pair) in self.pairs.iter().enumerate() {
            if let Some(pos) = text.find(pair.open.as_str()) {
                match best {
                    Some((_, best_pos)) if best_pos <= pos => {}
                    _ => best = Some((index, pos)),
                }
            }
        }
        best
    }
}

impl Default for MarkerSet {
    fn default() -> Self {
        Self {
            pairs: DEFAULT_PAIRS
                .iter()
                .map(|(open, close)| MarkerPair::new(*open, *close))
                .collect(),
        }
    }
}
