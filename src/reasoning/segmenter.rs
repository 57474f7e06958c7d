//! Incremental splitting of streamed content into visible and reasoning text.

use super::MarkerSet;

/// Output of a single [`Segmenter::segment_chunk`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segment {
    pub visible: String,
    pub reasoning: String,
}

/// Per-turn state machine separating inline reasoning regions from the
/// visible answer as content deltas arrive.
///
/// Each call only scans the text it is given. A close token whose bytes are
/// split across two calls is not recognised; the text stays classified as
/// reasoning until a complete close token shows up inside a single call.
#[derive(Debug, Clone)]
pub struct Segmenter {
    markers: MarkerSet,
    active: Option<usize>,
}

impl Segmenter {
    #[must_use]
    pub fn new(markers: MarkerSet) -> Self {
        Self {
            markers,
            active: None,
        }
    }

    /// Whether the segmenter is currently inside a reasoning region.
    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        self.active.is_some()
    }

    /// Close token the segmenter is waiting for, if suppressed.
    #[must_use]
    pub fn active_close_token(&self) -> Option<&str> {
        self.active
            .and_then(|index| self.markers.get(index))
            .map(|pair| pair.close.as_str())
    }

    /// Consume one content delta, returning its visible part.
    ///
    /// Reasoning text discovered in the delta is passed to `on_reasoning` in
    /// order; empty slices are never forwarded.
    pub fn segment<F>(&mut self, chunk: &str, mut on_reasoning: F) -> String
    where
        F: FnMut(&str),
    {
        let mut visible = String::new();
        let mut rest = chunk;

        while !rest.is_empty() {
            let Some(index) = self.active else {
                let Some((index, pos)) = self.markers.find_first_open(rest) else {
                    visible.push_str(rest);
                    break;
                };
                let Some(pair) = self.markers.get(index) else {
                    break;
                };
                visible.push_str(&rest[..pos]);
                rest = &rest[pos + pair.open.len()..];
                self.active = Some(index);
                tracing::trace!(open = %pair.open, "entered reasoning region");
                continue;
            };

            let Some(pair) = self.markers.get(index) else {
                self.active = None;
                continue;
            };
            match rest.find(pair.close.as_str()) {
                Some(end) => {
                    if end > 0 {
                        on_reasoning(&rest[..end]);
                    }
                    rest = &rest[end + pair.close.len()..];
                    self.active = None;
                    tracing::trace!(close = %pair.close, "left reasoning region");
                }
                None => {
                    on_reasoning(rest);
                    break;
                }
            }
        }

        visible
    }

    /// Convenience wrapper collecting both halves of a delta.
    pub fn segment_chunk(&mut self, chunk: &str) -> Segment {
        let mut reasoning = String::new();
        let visible = self.segment(chunk, |text| reasoning.push_str(text));
        Segment { visible, reasoning }
    }

    /// End of stream. Any open reasoning region is dropped, never surfaced as
    /// visible text.
    pub fn finish(self) {
        if let Some(close) = self.active_close_token() {
            tracing::debug!(close, "stream ended inside an unterminated reasoning region");
        }
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(MarkerSet::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(segmenter: &mut Segmenter, chunks: &[&str]) -> Segment {
        let mut total = Segment::default();
        for chunk in chunks {
            let part = segmenter.segment_chunk(chunk);
            total.visible.push_str(&part.visible);
            total.reasoning.push_str(&part.reasoning);
        }
        total
    }

    #[test]
    fn test_plain_text_passes_through() {
        let mut segmenter = Segmenter::default();
        let out = feed(&mut segmenter, &["Hi", " there"]);
        assert_eq!(out.visible, "Hi there");
        assert_eq!(out.reasoning, "");
        assert!(!segmenter.is_suppressed());
    }

    #[test]
    fn test_open_in_first_chunk_close_in_second() {
        let mut segmenter = Segmenter::default();
        let first = segmenter.segment_chunk("<think>");
        assert_eq!(first, Segment::default());
        assert!(segmenter.is_suppressed());
        assert_eq!(segmenter.active_close_token(), Some("</think>"));

        let second = segmenter.segment_chunk("hidden</think>visible");
        assert_eq!(second.reasoning, "hidden");
        assert_eq!(second.visible, "visible");
        assert!(!segmenter.is_suppressed());
    }

    #[test]
    fn test_region_spanning_many_chunks() {
        let mut segmenter = Segmenter::default();
        let out = feed(
            &mut segmenter,
            &["pre◁think▷a", "b", "c", "d◁/think▷post"],
        );
        assert_eq!(out.visible, "prepost");
        assert_eq!(out.reasoning, "abcd");
    }

    #[test]
    fn test_close_then_new_open_in_one_chunk() {
        let mut segmenter = Segmenter::default();
        let out = feed(
            &mut segmenter,
            &["<think>r1", "</think>mid◁think▶r2◁/think▶end<think>r3"],
        );
        assert_eq!(out.visible, "midend");
        assert_eq!(out.reasoning, "r1r2r3");
        assert_eq!(segmenter.active_close_token(), Some("</think>"));
    }

    #[test]
    fn test_only_opening_variant_close_ends_region() {
        let mut segmenter = Segmenter::default();
        let out = feed(&mut segmenter, &["◁think▶a</think>b◁/think▶c"]);
        assert_eq!(out.reasoning, "a</think>b");
        assert_eq!(out.visible, "c");
    }

    #[test]
    fn test_close_token_split_across_chunks_is_not_joined() {
        let mut segmenter = Segmenter::default();
        let out = feed(&mut segmenter, &["<think>thought</thi", "nk>rest"]);
        assert_eq!(out.visible, "");
        assert_eq!(out.reasoning, "thought</think>rest");
        assert!(segmenter.is_suppressed());

        // a later chunk carrying a whole close token resolves the region
        let later = segmenter.segment_chunk("</think>shown");
        assert_eq!(later.visible, "shown");
        assert_eq!(later.reasoning, "");
    }

    #[test]
    fn test_empty_chunk_is_noop() {
        let mut segmenter = Segmenter::default();
        let mut calls = 0;
        let visible = segmenter.segment("", |_| calls += 1);
        assert_eq!(visible, "");
        assert_eq!(calls, 0);

        segmenter.segment_chunk("<think>");
        let visible = segmenter.segment("", |_| calls += 1);
        assert_eq!(visible, "");
        assert_eq!(calls, 0);
        assert!(segmenter.is_suppressed());
    }

    #[test]
    fn test_reasoning_callback_receives_pieces_in_order() {
        let mut segmenter = Segmenter::default();
        let mut pieces = Vec::new();
        let visible = segmenter.segment("a<think>b</think>c<think>d", |text| {
            pieces.push(text.to_string());
        });
        assert_eq!(visible, "ac");
        assert_eq!(pieces, vec!["b".to_string(), "d".to_string()]);
    }

    #[test]
    fn test_finish_discards_open_region() {
        let mut segmenter = Segmenter::default();
        let out = segmenter.segment_chunk("answer<think>cut off");
        assert_eq!(out.visible, "answer");
        segmenter.finish();
    }
}
