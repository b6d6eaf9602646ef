//! Delimiter scanning.
//!
//! Templates are split into segments by three independent scanners:
//!
//! ```text
//! "Hi {name}, case [workItem.ref] due $[formatDate(data['d'], 'DD/MM')]"
//!  ───┬──────────────┬────────────────┬──────────────────────────────────
//!     Variable       Data             Expression (balanced on [ ], quotes skipped)
//! ```
//!
//! Rules:
//!
//! - `$[` opens an expression that ends at the matching `]`. Brackets inside
//!   quoted strings do not count.
//! - `[` opens a data path that ends at the next `]`; `{` opens a variable that
//!   ends at the next `}`. Both must be non-empty and must not reopen before
//!   closing.
//! - Anything unterminated or empty is literal text. There is no escape syntax.
//!
//! Callers choose which families to recognise. The variable stage scans for
//! `{..}` only, so it also rewrites variables inside brackets and expressions;
//! the data stage scans `[..]` together with `$[..]` so that brackets belonging
//! to an expression are never mistaken for a data path.
//!
//! All delimiters are ASCII, so every split point is a valid UTF-8 boundary.

bitflags::bitflags! {
    /// Placeholder families present in a template.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DelimiterMask: u8 {
        const VARIABLE    = 1 << 0;
        const DATA        = 1 << 1;
        const EXPRESSION  = 1 << 2;
        const LEGACY_CALL = 1 << 3;
    }
}

impl DelimiterMask {
    /// Classify `text`. An empty mask means no stage would change it.
    pub fn scan(text: &str) -> Self {
        let mut mask = DelimiterMask::empty();
        for seg in segments(text, DelimiterMask::all()) {
            mask |= match seg.kind {
                SegmentKind::Variable => DelimiterMask::VARIABLE,
                SegmentKind::Data => DelimiterMask::DATA,
                SegmentKind::Expression => DelimiterMask::EXPRESSION,
                SegmentKind::Literal if seg.text.contains("$ui.pageContext.") => DelimiterMask::LEGACY_CALL,
                SegmentKind::Literal => DelimiterMask::empty(),
            };
        }
        mask
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SegmentKind {
    Literal,
    Variable,
    Data,
    Expression,
}

/// A slice of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Segment<'a> {
    pub kind: SegmentKind,
    /// Full text, delimiters included.
    pub text: &'a str,
    /// Text between the delimiters (equal to `text` for literals).
    pub inner: &'a str,
}

/// Split `text` into literal and placeholder segments.
///
/// Only the families in `families` are recognised (`LEGACY_CALL` is ignored
/// here; legacy calls live inside literal segments).
pub(crate) fn segments(text: &str, families: DelimiterMask) -> Vec<Segment<'_>> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let matched = match bytes[i] {
            b'$' if families.contains(DelimiterMask::EXPRESSION) && bytes.get(i + 1) == Some(&b'[') => {
                scan_expression(bytes, i).map(|end| (SegmentKind::Expression, end, 2))
            }
            b'[' if families.contains(DelimiterMask::DATA) => {
                scan_closing(bytes, i, b'[', b']').map(|end| (SegmentKind::Data, end, 1))
            }
            b'{' if families.contains(DelimiterMask::VARIABLE) => {
                scan_closing(bytes, i, b'{', b'}').map(|end| (SegmentKind::Variable, end, 1))
            }
            _ => None,
        };

        match matched {
            Some((kind, end, open_len)) => {
                if literal_start < i {
                    out.push(literal(text, literal_start, i));
                }
                out.push(Segment { kind, text: &text[i..end], inner: &text[i + open_len..end - 1] });
                i = end;
                literal_start = end;
            }
            None => i += 1,
        }
    }

    if literal_start < bytes.len() {
        out.push(literal(text, literal_start, bytes.len()));
    }
    out
}

fn literal(text: &str, start: usize, end: usize) -> Segment<'_> {
    let slice = &text[start..end];
    Segment { kind: SegmentKind::Literal, text: slice, inner: slice }
}

/// End (exclusive) of a `{..}` or `[..]` run starting at `start`.
fn scan_closing(bytes: &[u8], start: usize, open: u8, close: u8) -> Option<usize> {
    for (i, &b) in bytes.iter().enumerate().skip(start + 1) {
        if b == close {
            return (i > start + 1).then_some(i + 1);
        }
        if b == open {
            return None;
        }
    }
    None
}

/// End (exclusive) of a `$[..]` run starting at `start` (the `$`).
fn scan_expression(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = start + 1;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(_) if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b'[' => depth += 1,
                b']' => {
                    depth -= 1;
                    if depth == 0 {
                        return (i > start + 2).then_some(i + 1);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}
