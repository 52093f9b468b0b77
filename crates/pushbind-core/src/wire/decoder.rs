//! Recursive-descent decoder for the array message grammar.
//!
//! ```text
//! message := '[' (entry (',' entry)*)? ']'
//! entry   := message | string | number | /* empty */
//! string  := '"' chars '"' | '\'' chars '\''
//! number  := digits
//! ```
//!
//! The protocol is reverse-engineered, so the decoder is deliberately
//! lenient: an entry that is not a list, string, or number degrades to
//! [`WireValue::Empty`] and the decoder resynchronizes at the next `,` or
//! `]`. Structural violations (a missing separator between entries, a
//! truncated message) still fail with `ChannelError::Decode`.

use crate::error::{ChannelError, Result};
use crate::wire::value::WireValue;

/// Decode one complete message.
///
/// # Errors
/// `Decode` if the input does not open with `[` or violates the grammar in
/// a way lenient recovery cannot absorb.
pub fn decode_message(input: &str) -> Result<WireValue> {
    let mut cur = Cursor::new(input);
    match cur.skip_whitespace() {
        Some('[') => {}
        Some(other) => {
            return Err(ChannelError::Decode(format!(
                "expected initial '[', found {other:?}"
            )))
        }
        None => return Err(ChannelError::Decode("empty message".into())),
    }
    Ok(WireValue::List(parse_entries(&mut cur)?))
}

/// Parse entries up to and including the closing `]`.
fn parse_entries(cur: &mut Cursor<'_>) -> Result<Vec<WireValue>> {
    let mut entries = Vec::new();

    let mut ch = cur.skip_whitespace();
    while ch != Some(']') {
        let c = ch.ok_or_else(unexpected_end)?;

        match c {
            '[' => {
                entries.push(WireValue::List(parse_entries(cur)?));
                ch = cur.skip_whitespace();
            }
            '"' | '\'' => {
                entries.push(WireValue::String(parse_string(cur, c)));
                ch = cur.skip_whitespace();
            }
            // Blank entry: the separator doubles as the current token.
            ',' => entries.push(WireValue::Empty),
            // JS-style null token, consumed through the entry end.
            'n' => {
                entries.push(WireValue::Empty);
                ch = cur.skip_to_entry_end();
            }
            d if d.is_ascii_digit() => match parse_number(cur, d) {
                Some(n) => {
                    entries.push(WireValue::Number(n));
                    ch = cur.skip_whitespace();
                }
                None => {
                    tracing::trace!("non-numeric entry degraded to empty");
                    entries.push(WireValue::Empty);
                    ch = cur.skip_to_entry_end();
                }
            },
            _ => {
                tracing::trace!(token = %c, "unknown entry token degraded to empty");
                entries.push(WireValue::Empty);
                ch = cur.skip_to_entry_end();
            }
        }

        // After each entry: ',' continues the list, ']' terminates it.
        match ch {
            Some(',') => ch = cur.skip_whitespace(),
            Some(']') => {}
            Some(other) => {
                return Err(ChannelError::Decode(format!(
                    "expected ',' or ']', found {other:?}"
                )))
            }
            None => return Err(unexpected_end()),
        }
    }

    Ok(entries)
}

/// Consume until the matching unescaped quote. A backslash escapes the
/// following character verbatim; a stream that ends mid-string yields what
/// was read so far.
fn parse_string(cur: &mut Cursor<'_>, quote: char) -> String {
    let mut s = String::new();
    while let Some(c) = cur.next() {
        if c == quote {
            break;
        }
        if c == '\\' {
            match cur.next() {
                Some(escaped) => s.push(escaped),
                None => break,
            }
        } else {
            s.push(c);
        }
    }
    s
}

/// Consume a run of ASCII digits. `None` on overflow (degrades to Empty).
fn parse_number(cur: &mut Cursor<'_>, first: char) -> Option<i64> {
    let mut digits = String::new();
    digits.push(first);
    while let Some(c) = cur.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        digits.push(c);
        cur.next();
    }
    digits.parse().ok()
}

fn unexpected_end() -> ChannelError {
    ChannelError::Decode("unexpected end of message".into())
}

struct Cursor<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn next(&mut self) -> Option<char> {
        self.chars.next()
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Next character that is not insignificant whitespace.
    fn skip_whitespace(&mut self) -> Option<char> {
        self.chars.by_ref().find(|c| !c.is_whitespace())
    }

    /// Resynchronize after a malformed entry: consume up to the next `,`
    /// or `]` and return it.
    fn skip_to_entry_end(&mut self) -> Option<char> {
        self.chars.by_ref().find(|&c| c == ',' || c == ']')
    }
}
