//! Raw sheet text with explicit component block spans.
//!
//! Blocks are located once, as byte ranges of the bodies between `$Comp` and
//! `$EndComp`. Edits replace a single range and shift the ranges after it, so text
//! outside the edited block is never touched.

use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::FormatVersion;
use crate::error::Error;

const HEADER_PREFIX: &str = "EESchema Schematic File Version";
const BLOCK_START: &str = "$Comp";
const BLOCK_END: &str = "$EndComp";
const SHEET_START: &str = "$Sheet";
const SHEET_END: &str = "$EndSheet";

/// Location of one component block: sheet number and block number within it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BlockId {
    pub sheet: usize,
    pub index: usize,
}

impl BlockId {
    pub const fn new(sheet: usize, index: usize) -> Self {
        Self { sheet, index }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn detect(text: &str) -> Self {
        if text.contains("\r\n") {
            Self::CrLf
        } else {
            Self::Lf
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// Read the format version from the `EESchema` header line.
pub fn parse_header(text: &str) -> Option<FormatVersion> {
    let first = text.lines().next()?;
    let rest = first.trim_start().strip_prefix(HEADER_PREFIX)?.trim_start();
    let digits: &str = &rest[..rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len())];
    digits.parse().ok().map(FormatVersion)
}

// (start offset, line without terminator)
fn lines_with_offsets(text: &str) -> Vec<(usize, &str)> {
    let mut offset = 0;
    text.split_inclusive('\n')
        .map(|raw| {
            let start = offset;
            offset += raw.len();
            (start, raw.trim_end_matches(['\n', '\r']))
        })
        .collect()
}

/// Byte ranges of every `$Comp` block body in `text`.
///
/// Each range starts after the `$Comp` line and ends where the next `$EndComp` line
/// begins, so adjacent blocks are never merged. An unterminated block is ignored.
pub fn extract_blocks(text: &str) -> Vec<Range<usize>> {
    let mut blocks = Vec::new();
    let mut open: Option<usize> = None;
    let mut after_start = false;

    for (start, line) in lines_with_offsets(text) {
        if after_start {
            open = Some(start);
            after_start = false;
        }
        let line = line.trim_end();
        if open.is_none() && line == BLOCK_START {
            after_start = true;
        } else if line == BLOCK_END {
            if let Some(body) = open.take() {
                blocks.push(body..start);
            }
        }
    }
    blocks
}

/// File names referenced by `$Sheet` blocks (`F1 "<file>" <size>`), in file order.
pub fn sheet_files(text: &str) -> Vec<String> {
    let mut files = Vec::new();
    let mut in_sheet = false;

    for line in text.lines() {
        let line = line.trim();
        if line == SHEET_START {
            in_sheet = true;
        } else if line == SHEET_END {
            in_sheet = false;
        } else if in_sheet {
            if let Some(rest) = line.strip_prefix("F1 ") {
                let (Some(open), Some(close)) = (rest.find('"'), rest.rfind('"')) else {
                    continue;
                };
                if close > open + 1 {
                    files.push(rest[open + 1..close].to_string());
                }
            }
        }
    }
    files
}

/// One sheet file held in memory.
#[derive(Debug, Clone)]
pub struct SheetText {
    index: usize,
    path: PathBuf,
    text: String,
    blocks: Vec<Range<usize>>,
    line_ending: LineEnding,
}

impl SheetText {
    /// `path` is the name the sheet is saved under, relative to the root sheet's
    /// directory.
    pub fn new(index: usize, path: impl Into<PathBuf>, text: String) -> Self {
        let blocks = extract_blocks(&text);
        let line_ending = LineEnding::detect(&text);
        Self {
            index,
            path: path.into(),
            text,
            blocks,
            line_ending,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn set_path(&mut self, path: PathBuf) {
        self.path = path;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn block_text(&self, index: usize) -> Option<&str> {
        self.blocks.get(index).map(|span| &self.text[span.clone()])
    }

    /// Every block body with its id, in file order.
    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &str)> + '_ {
        self.blocks
            .iter()
            .enumerate()
            .map(|(idx, span)| (BlockId::new(self.index, idx), &self.text[span.clone()]))
    }

    /// Replace block `index`, which must still hold `original`, with `replacement`.
    ///
    /// # Errors
    ///
    /// `StaleBlock` when the block does not exist or its text differs from `original`.
    pub fn substitute(&mut self, index: usize, original: &str, replacement: &str) -> Result<(), Error> {
        let stale = || Error::StaleBlock {
            sheet: self.index,
            block: index,
        };
        let span = self.blocks.get(index).cloned().ok_or_else(stale)?;
        if self.text[span.clone()] != *original {
            return Err(stale());
        }

        self.text.replace_range(span.clone(), replacement);
        let new_end = span.start + replacement.len();
        self.blocks[index] = span.start..new_end;
        for later in &mut self.blocks[index + 1..] {
            *later = later.start - span.end + new_end..later.end - span.end + new_end;
        }
        Ok(())
    }
}
