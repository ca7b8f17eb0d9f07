//! Mapping between raw text positions and normalized offsets.
//!
//! A document's text is presented as an ordered list of [`TextFragment`]s,
//! one per text node, in document order. Positions inside that list are
//! `(node, char offset)` pairs; positions in the stored annotation ranges
//! are normalized offsets (see [`crate::normalize`]). The fragment list must
//! be produced fresh for every operation: wrapping a highlight splits text
//! nodes, so node identities do not survive a render.

use crate::normalize::Normalizer;
use crate::types::{Affinity, NormalizedRange};

/// A text node handle and its raw contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFragment<N> {
    pub node: N,
    pub text: String,
}

impl<N> TextFragment<N> {
    pub fn new(node: N, text: impl Into<String>) -> Self {
        Self {
            node,
            text: text.into(),
        }
    }

    /// Length in chars.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A raw position: a text node plus a char offset inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPosition<N> {
    pub node: N,
    pub offset: usize,
}

impl<N> RawPosition<N> {
    pub fn new(node: N, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A raw range between two positions in document order.
///
/// Used both for user selections (start/end of the live selection range)
/// and for the resolved target of a highlight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRange<N> {
    pub start: RawPosition<N>,
    pub end: RawPosition<N>,
}

impl<N> RawRange<N> {
    pub fn new(start: RawPosition<N>, end: RawPosition<N>) -> Self {
        Self { start, end }
    }
}

/// The user's live selection, as read from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawSelection<N> {
    /// Nothing is selected.
    Empty,
    /// A caret with no extent.
    Collapsed,
    /// At least one boundary lies outside the document container.
    OutOfBounds,
    Range(RawRange<N>),
}

impl<N> RawSelection<N> {
    /// The range, if the selection is usable for a new annotation.
    pub fn range(&self) -> Option<&RawRange<N>> {
        match self {
            RawSelection::Range(range) => Some(range),
            _ => None,
        }
    }
}

/// A selection converted to normalized space, with its anchor text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSelection {
    pub range: NormalizedRange,
    pub anchor: String,
}

/// Where one fragment sits in normalized space.
#[derive(Debug, Clone, Copy)]
struct FragmentSpan {
    /// Normalized offset of the fragment's first char.
    start: usize,
    /// Normalized chars the fragment contributes (untrimmed).
    len: usize,
    /// Normalizer state on entry to the fragment.
    state: Normalizer,
}

/// Normalized-space layout of a fragment list.
///
/// Computed once per operation and discarded afterwards.
#[derive(Debug)]
pub struct NormalizedLayout<'a, N> {
    fragments: &'a [TextFragment<N>],
    spans: Vec<FragmentSpan>,
    len: usize,
}

impl<'a, N> NormalizedLayout<'a, N> {
    pub fn new(fragments: &'a [TextFragment<N>]) -> Self {
        let mut state = Normalizer::document_start();
        let mut spans = Vec::with_capacity(fragments.len());
        let mut cursor = 0;

        for fragment in fragments {
            let entry = state;
            let len = state.normalized_len(&fragment.text);
            spans.push(FragmentSpan {
                start: cursor,
                len,
                state: entry,
            });
            cursor += len;
        }

        // Trailing whitespace is trimmed from the document.
        let len = if state.in_whitespace() && cursor > 0 {
            cursor - 1
        } else {
            cursor
        };

        tracing::trace!(
            target: "marginalia::offset_map",
            fragments = fragments.len(),
            normalized_len = len,
            "computed normalized layout"
        );

        Self {
            fragments,
            spans,
            len,
        }
    }

    /// Normalized length of the whole document.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The normalized document text.
    pub fn text(&self) -> String {
        crate::normalize::normalize_fragments(self.fragments.iter().map(|f| f.text.as_str()))
    }

    /// Normalized substring for `range`, clamped to the document.
    pub fn slice(&self, range: NormalizedRange) -> String {
        self.text()
            .chars()
            .skip(range.start)
            .take(range.len())
            .collect()
    }

    /// Resolve a normalized offset to a raw position.
    ///
    /// Offsets past the end clamp to the end of the last fragment. Returns
    /// `None` only when there are no fragments.
    pub fn raw_position(&self, target: usize, affinity: Affinity) -> Option<RawPosition<N>>
    where
        N: Clone,
    {
        let last = self.fragments.last()?;

        let hit = match affinity {
            Affinity::Before => self
                .spans
                .iter()
                .position(|span| target <= span.start + span.len),
            Affinity::After => self
                .spans
                .iter()
                .position(|span| target < span.start + span.len)
                .or_else(|| {
                    self.spans
                        .iter()
                        .position(|span| target <= span.start + span.len)
                }),
        };

        let Some(index) = hit else {
            return Some(RawPosition::new(last.node.clone(), last.char_len()));
        };

        let span = self.spans[index];
        let fragment = &self.fragments[index];
        let within = target - span.start;
        let offset = match affinity {
            Affinity::After => span.state.raw_start_for_normalized(&fragment.text, within),
            Affinity::Before => span.state.raw_offset_for_normalized(&fragment.text, within),
        };

        tracing::trace!(
            target: "marginalia::offset_map",
            target_offset = target,
            fragment = index,
            raw_offset = offset,
            ?affinity,
            "resolved normalized offset"
        );

        Some(RawPosition::new(fragment.node.clone(), offset))
    }
}

impl<N: PartialEq> NormalizedLayout<'_, N> {
    /// Normalized offset of a raw position, clamped to the document length.
    ///
    /// Returns `None` when the position's node is not one of the fragments.
    pub fn normalized_offset(&self, position: &RawPosition<N>) -> Option<usize> {
        let index = self
            .fragments
            .iter()
            .position(|fragment| fragment.node == position.node)?;
        let span = self.spans[index];
        let within = span
            .state
            .normalized_offset_for_raw(&self.fragments[index].text, position.offset);
        Some((span.start + within).min(self.len))
    }
}

/// Convert a raw selection to a normalized range plus anchor text.
///
/// `None` is the no-op result: no text at all, a boundary outside the
/// fragments, or an empty/inverted range.
pub fn selection_to_normalized_range<N: PartialEq>(
    fragments: &[TextFragment<N>],
    selection: &RawRange<N>,
) -> Option<NormalizedSelection> {
    if fragments.is_empty() {
        return None;
    }

    let layout = NormalizedLayout::new(fragments);
    let start = layout.normalized_offset(&selection.start)?;
    let end = layout.normalized_offset(&selection.end)?;
    let range = NormalizedRange::new(start, end)?;
    let anchor = layout.slice(range);

    Some(NormalizedSelection { range, anchor })
}

/// Convert a stored normalized range back to a raw range for highlighting.
///
/// The start prefers the beginning of the following fragment at a boundary
/// and the end prefers the end of the preceding one, so a highlight never
/// starts or ends on text it does not cover. An end past the document clamps
/// to the last fragment; a start at or past the document end has nothing to
/// cover and yields `None`.
pub fn normalized_range_to_raw<N: Clone>(
    fragments: &[TextFragment<N>],
    range: NormalizedRange,
) -> Option<RawRange<N>> {
    let layout = NormalizedLayout::new(fragments);
    if range.start >= layout.len() {
        return None;
    }

    let start = layout.raw_position(range.start, Affinity::After)?;
    let end = layout.raw_position(range.end, Affinity::Before)?;
    Some(RawRange { start, end })
}
