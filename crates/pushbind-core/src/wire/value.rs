//! Decoded message values: a tagged union of strings, numbers, blanks, and
//! nested lists.

use std::fmt;

use crate::error::{ChannelError, Result};

/// One decoded wire value. Order-preserving, immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireValue {
    String(String),
    Number(i64),
    Empty,
    List(Vec<WireValue>),
}

/// Kind tag for diagnostics and mismatch reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    String,
    Number,
    Empty,
    List,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryKind::String => "string",
            EntryKind::Number => "number",
            EntryKind::Empty => "empty",
            EntryKind::List => "list",
        };
        f.write_str(s)
    }
}

impl WireValue {
    pub fn kind(&self) -> EntryKind {
        match self {
            WireValue::String(_) => EntryKind::String,
            WireValue::Number(_) => EntryKind::Number,
            WireValue::Empty => EntryKind::Empty,
            WireValue::List(_) => EntryKind::List,
        }
    }

    /// String payload of this entry.
    ///
    /// # Errors
    /// `TypeMismatch` if the entry holds a different kind.
    pub fn as_str(&self) -> Result<&str> {
        match self {
            WireValue::String(s) => Ok(s),
            other => Err(mismatch(EntryKind::String, other)),
        }
    }

    /// Integer payload of this entry.
    ///
    /// # Errors
    /// `TypeMismatch` if the entry holds a different kind.
    pub fn as_number(&self) -> Result<i64> {
        match self {
            WireValue::Number(n) => Ok(*n),
            other => Err(mismatch(EntryKind::Number, other)),
        }
    }

    /// Entries of a nested list.
    ///
    /// # Errors
    /// `TypeMismatch` if the entry holds a different kind.
    pub fn as_list(&self) -> Result<&[WireValue]> {
        match self {
            WireValue::List(entries) => Ok(entries),
            other => Err(mismatch(EntryKind::List, other)),
        }
    }

    /// Entry `index` of a nested list.
    ///
    /// # Errors
    /// `TypeMismatch` if this value is not a list, `Decode` if the list is
    /// shorter than `index + 1`.
    pub fn entry(&self, index: usize) -> Result<&WireValue> {
        self.as_list()?
            .get(index)
            .ok_or_else(|| ChannelError::Decode(format!("list entry {index} missing")))
    }
}

/// Render back to wire text (debug/tracing only; escapes are not re-applied).
impl fmt::Display for WireValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireValue::String(s) => write!(f, "\"{s}\""),
            WireValue::Number(n) => write!(f, "{n}"),
            WireValue::Empty => Ok(()),
            WireValue::List(entries) => {
                f.write_str("[")?;
                for (i, e) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{e}")?;
                }
                f.write_str("]")
            }
        }
    }
}

fn mismatch(expected: EntryKind, found: &WireValue) -> ChannelError {
    ChannelError::TypeMismatch {
        expected,
        found: found.kind(),
    }
}
