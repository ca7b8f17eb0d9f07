//! Whitespace normalization for annotation offsets.
//!
//! Annotation ranges are stored against the *normalized* text of a document:
//! every maximal run of whitespace collapses to one space, and the whole
//! document is trimmed at both ends. Raw DOM text is split across many text
//! nodes, so normalization is a running process: a [`Normalizer`] carries the
//! "previous char was whitespace" state from one fragment into the next, which
//! is what lets a run that straddles a node boundary still collapse to a
//! single char.
//!
//! All lengths and offsets here are in Unicode scalar values (chars).

/// Whether `ch` belongs to the collapsible whitespace class.
///
/// This is the ECMAScript `\s` class (ASCII whitespace, NBSP, the Unicode
/// space separators, line/paragraph separators and BOM), which is what the
/// page used when the stored offsets were produced.
pub fn is_collapsible_whitespace(ch: char) -> bool {
    matches!(
        ch,
        '\t' | '\n'
            | '\u{000B}'
            | '\u{000C}'
            | '\r'
            | ' '
            | '\u{00A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
            | '\u{FEFF}'
    )
}

/// Running normalization state across a sequence of raw fragments.
///
/// `Copy` on purpose: the offset queries take `&self` and work on a copy, so
/// a caller can snapshot the state at the start of a fragment and ask
/// several questions about that fragment without replaying the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Normalizer {
    in_whitespace: bool,
}

impl Normalizer {
    /// State for normalizing a free-standing fragment.
    pub fn new() -> Self {
        Self::default()
    }

    /// State at the start of a whole document.
    ///
    /// Starts as if a whitespace run were already open, so leading
    /// whitespace contributes nothing (the document-level leading trim).
    pub fn document_start() -> Self {
        Self {
            in_whitespace: true,
        }
    }

    /// Whether the last char consumed was whitespace.
    pub fn in_whitespace(&self) -> bool {
        self.in_whitespace
    }

    /// Consume one raw char, returning how many normalized chars it adds (0 or 1).
    pub fn advance(&mut self, ch: char) -> usize {
        if is_collapsible_whitespace(ch) {
            let delta = usize::from(!self.in_whitespace);
            self.in_whitespace = true;
            delta
        } else {
            self.in_whitespace = false;
            1
        }
    }

    /// Normalized length of a whole fragment, carrying the state forward.
    pub fn normalized_len(&mut self, fragment: &str) -> usize {
        fragment.chars().map(|ch| self.advance(ch)).sum()
    }

    /// Normalized length contributed by the first `raw_offset` chars of `fragment`.
    ///
    /// `raw_offset` past the end of the fragment counts the whole fragment.
    pub fn normalized_offset_for_raw(&self, fragment: &str, raw_offset: usize) -> usize {
        let mut state = *self;
        fragment
            .chars()
            .take(raw_offset)
            .map(|ch| state.advance(ch))
            .sum()
    }

    /// First raw offset in `fragment` at which `target` normalized chars have been seen.
    ///
    /// When `target` lands on a collapsed whitespace run this resolves to the
    /// first raw char of the run. A target beyond the fragment clamps to its
    /// char length.
    pub fn raw_offset_for_normalized(&self, fragment: &str, target: usize) -> usize {
        let mut state = *self;
        let mut seen = 0;
        let mut raw_len = 0;
        for (raw, ch) in fragment.chars().enumerate() {
            if seen >= target {
                return raw;
            }
            seen += state.advance(ch);
            raw_len = raw + 1;
        }
        raw_len
    }

    /// Raw offset of the first char that contributes normalized char `target`.
    ///
    /// Unlike [`Self::raw_offset_for_normalized`] this skips the collapsed
    /// tail of a whitespace run, so a highlight starting at `target` does not
    /// swallow the whitespace in front of it. A target at or beyond the
    /// fragment's end clamps to its char length.
    pub fn raw_start_for_normalized(&self, fragment: &str, target: usize) -> usize {
        let mut state = *self;
        let mut seen = 0;
        let mut raw_len = 0;
        for (raw, ch) in fragment.chars().enumerate() {
            let delta = state.advance(ch);
            if seen >= target && delta > 0 {
                return raw;
            }
            seen += delta;
            raw_len = raw + 1;
        }
        raw_len
    }

    /// Append the normalized form of `fragment` to `out`, carrying the state forward.
    pub fn push_normalized(&mut self, fragment: &str, out: &mut String) {
        for ch in fragment.chars() {
            if self.advance(ch) == 1 {
                out.push(if is_collapsible_whitespace(ch) { ' ' } else { ch });
            }
        }
    }
}

/// Normalize a document given as ordered raw fragments.
pub fn normalize_fragments<'a>(fragments: impl IntoIterator<Item = &'a str>) -> String {
    let mut state = Normalizer::document_start();
    let mut out = String::new();
    for fragment in fragments {
        state.push_normalized(fragment, &mut out);
    }
    if state.in_whitespace() && out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Normalize a single string as a whole document.
pub fn normalize(text: &str) -> String {
    normalize_fragments([text])
}

/// Normalized (trimmed) length of a document given as ordered raw fragments.
pub fn document_len<'a>(fragments: impl IntoIterator<Item = &'a str>) -> usize {
    let mut state = Normalizer::document_start();
    let len: usize = fragments
        .into_iter()
        .map(|fragment| state.normalized_len(fragment))
        .sum();
    if state.in_whitespace() && len > 0 {
        len - 1
    } else {
        len
    }
}
