//! Expression tokenizer.

use crate::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Tok {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(&'static str),
}

/// A token and the byte offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Lexeme {
    pub tok: Tok,
    pub offset: usize,
}

/// Longest first, so `===` wins over `==` and `=`.
const PUNCTUATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "??", "<", ">", "+", "-", "*", "/", "%", "!", "?", ":", ".", ",",
    "(", ")", "[", "]",
];

pub(crate) fn tokenize(src: &str) -> Result<Vec<Lexeme>, ExprError> {
    let bytes = src.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let start = i;
        let tok = if b.is_ascii_digit() || (b == b'.' && bytes.get(i + 1).is_some_and(|d| d.is_ascii_digit())) {
            i = scan_number(bytes, i);
            let text = &src[start..i];
            Tok::Number(text.parse().map_err(|_| ExprError::syntax(start, format!("invalid number '{text}'")))?)
        } else if b == b'\'' || b == b'"' {
            let (value, end) = scan_string(src, i)?;
            i = end;
            Tok::Str(value)
        } else if is_ident_start(b) {
            while i < bytes.len() && is_ident_continue(bytes[i]) {
                i += 1;
            }
            Tok::Ident(src[start..i].to_string())
        } else if let Some(punct) = PUNCTUATORS.iter().find(|p| src[i..].starts_with(**p)) {
            i += punct.len();
            Tok::Punct(*punct)
        } else {
            let ch = src[i..].chars().next().unwrap_or('?');
            return Err(ExprError::syntax(start, format!("unexpected character '{ch}'")));
        };

        out.push(Lexeme { tok, offset: start });
    }

    Ok(out)
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_continue(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

fn scan_number(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' && bytes.get(i + 1).is_some_and(|d| d.is_ascii_digit()) {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    i
}

/// Scan a quoted string starting at `start`; returns the unescaped value and
/// the byte index just past the closing quote.
fn scan_string(src: &str, start: usize) -> Result<(String, usize), ExprError> {
    let quote = src.as_bytes()[start] as char;
    let mut value = String::new();
    let mut chars = src[start + 1..].char_indices();

    while let Some((offset, c)) = chars.next() {
        match c {
            '\\' => {
                let Some((_, escaped)) = chars.next() else {
                    break;
                };
                value.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                });
            }
            c if c == quote => return Ok((value, start + 1 + offset + c.len_utf8())),
            c => value.push(c),
        }
    }

    Err(ExprError::syntax(start, "unterminated string literal"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(src: &str) -> Vec<Tok> {
        tokenize(src).unwrap().into_iter().map(|l| l.tok).collect()
    }

    #[test]
    fn tokenizes_mixed_input() {
        assert_eq!(
            toks("$ui.user() !== 'a\\'b' && .5>=x1"),
            vec![
                Tok::Ident("$ui".into()),
                Tok::Punct("."),
                Tok::Ident("user".into()),
                Tok::Punct("("),
                Tok::Punct(")"),
                Tok::Punct("!=="),
                Tok::Str("a'b".into()),
                Tok::Punct("&&"),
                Tok::Number(0.5),
                Tok::Punct(">="),
                Tok::Ident("x1".into()),
            ]
        );
    }

    #[test]
    fn strings_keep_unicode() {
        assert_eq!(toks("\"café\" + 'ü'"), vec![Tok::Str("café".into()), Tok::Punct("+"), Tok::Str("ü".into())]);
    }

    #[test]
    fn rejects_unknown_characters() {
        assert!(matches!(tokenize("a = 1"), Err(ExprError::Syntax { offset: 2, .. })));
        assert!(matches!(tokenize("`tpl`"), Err(ExprError::Syntax { offset: 0, .. })));
        assert!(matches!(tokenize("a; b"), Err(ExprError::Syntax { offset: 1, .. })));
    }
}
