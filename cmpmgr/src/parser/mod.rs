//! Legacy EESchema component record parsing and rendering.
//!
//! A legacy schematic (`EESchema Schematic File Version N`) stores every placed
//! component as a `$Comp` / `$EndComp` block:
//!
//! ```text
//! $Comp
//! L Device:R R1                     <- reference line
//! U 1 1 5C8A5B2B                    <- unit / timestamp line
//! P 3000 2000                       <- anchor position
//! AR Path="/5C8A/5C8B" Ref="R1"  Part="1"   (0..N)
//! F 0 "R1" H 3070 2046 50  0000 L CNN       (0..N)
//! 	1    3000 2000                  <- trailer
//! 	1    0    0    -1
//! $EndComp
//! ```
//!
//! Each sub-grammar is handled by an explicit tokenizer; nothing outside the block
//! bodies is interpreted.

pub mod component;
pub mod field;
pub mod reference;
pub mod sheet;
pub mod template;

use std::fmt;
use std::ops::{Add, Sub};

use serde::Serialize;

pub use component::{Component, FormatVersion, Trailer};
pub use field::{Field, HJustify, Orientation, VJustify, FIRST_USER_SLOT, FIXED_FIELD_NAMES};
pub use sheet::{extract_blocks, parse_header, sheet_files, BlockId, LineEnding, SheetText};

/// Integer schematic coordinate (mils in the legacy format).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

impl Position {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// `None` when either coordinate overflows.
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        Some(Self::new(self.x.checked_sub(rhs.x)?, self.y.checked_sub(rhs.y)?))
    }
}

// Saturating so rendering an accepted block cannot overflow.
impl Add for Position {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x.saturating_add(rhs.x), self.y.saturating_add(rhs.y))
    }
}

impl Sub for Position {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x.saturating_sub(rhs.x), self.y.saturating_sub(rhs.y))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.x, self.y)
    }
}

/// Whitespace-delimited cursor over a single record line.
#[derive(Debug, Clone)]
pub(crate) struct LineCursor<'a> {
    rest: &'a str,
}

impl<'a> LineCursor<'a> {
    pub(crate) fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    /// Next whitespace-delimited token.
    pub(crate) fn word(&mut self) -> Option<&'a str> {
        let s = self.rest.trim_start();
        if s.is_empty() {
            return None;
        }
        let end = s.find(char::is_whitespace).unwrap_or(s.len());
        self.rest = &s[end..];
        Some(&s[..end])
    }

    /// Consume `keyword` as the next token.
    pub(crate) fn keyword(&mut self, keyword: &str) -> Option<()> {
        (self.word()? == keyword).then_some(())
    }

    pub(crate) fn number<T: std::str::FromStr>(&mut self) -> Option<T> {
        let token = self.word()?;
        if !token
            .chars()
            .all(|c| c.is_ascii_digit() || c == '-')
        {
            return None;
        }
        token.parse().ok()
    }

    /// Quoted text terminated by the first `"` that `accept` approves, given the
    /// remainder of the line after that quote.
    pub(crate) fn quoted_until(&mut self, accept: impl Fn(&str) -> bool) -> Option<&'a str> {
        let body = self.rest.trim_start().strip_prefix('"')?;
        for (idx, _) in body.match_indices('"') {
            let after = &body[idx + 1..];
            if accept(after) {
                self.rest = after;
                return Some(&body[..idx]);
            }
        }
        None
    }

    /// Quoted text spanning to the last `"` on the line.
    pub(crate) fn quoted_to_end(&mut self) -> Option<&'a str> {
        let s = self.rest.trim();
        let inner = s.strip_prefix('"')?.strip_suffix('"')?;
        self.rest = "";
        Some(inner)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.rest.trim().is_empty()
    }
}

/// True for characters allowed in designators and `$NAME` template tokens.
pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
