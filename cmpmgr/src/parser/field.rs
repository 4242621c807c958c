//! `F` record codec.
//!
//! ```text
//! F <slot> "<text>" <H|V> <x> <y> <size> <visibility> <h> <v><italic><bold> ["<name>"]
//! ```
//!
//! Coordinates are absolute in the file and stored relative to the owning
//! component's anchor.

use std::fmt;

use serde::Serialize;

use super::{Component, LineCursor, Position};

/// Names of the four fixed slots, indexed by slot code.
pub const FIXED_FIELD_NAMES: [&str; 4] = ["Ref", "Value", "Footprint", "DocSheet"];

/// First slot code available to user-defined fields.
pub const FIRST_USER_SLOT: u32 = 4;

const DEFAULT_FONT_SIZE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    fn from_letter(letter: &str) -> Option<Self> {
        match letter {
            "H" => Some(Self::Horizontal),
            "V" => Some(Self::Vertical),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Self::Horizontal => 'H',
            Self::Vertical => 'V',
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Horizontal => "Horizontal",
            Self::Vertical => "Vertical",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HJustify {
    Left,
    Center,
    Right,
}

impl HJustify {
    fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'L' => Some(Self::Left),
            'C' => Some(Self::Center),
            'R' => Some(Self::Right),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Self::Left => 'L',
            Self::Center => 'C',
            Self::Right => 'R',
        }
    }
}

impl fmt::Display for HJustify {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Left => "Left",
            Self::Center => "Center",
            Self::Right => "Right",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VJustify {
    Top,
    Center,
    Bottom,
}

impl VJustify {
    fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'T' => Some(Self::Top),
            'C' => Some(Self::Center),
            'B' => Some(Self::Bottom),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Self::Top => 'T',
            Self::Center => 'C',
            Self::Bottom => 'B',
        }
    }
}

impl fmt::Display for VJustify {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Top => "Top",
            Self::Center => "Center",
            Self::Bottom => "Bottom",
        })
    }
}

/// One displayable attribute of a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub slot: u32,
    pub name: String,
    pub text: String,
    pub orientation: Orientation,
    /// Offset from the owning component's anchor.
    pub offset: Position,
    pub font_size: u32,
    pub visible: bool,
    pub h_justify: HJustify,
    pub v_justify: VJustify,
    pub italic: bool,
    pub bold: bool,
}

impl Field {
    /// Parse one `F` line. Returns `None` when the line does not follow the field
    /// grammar; the caller turns that into a format violation for the whole block.
    pub fn parse(anchor: Position, line: &str) -> Option<Self> {
        let mut cursor = LineCursor::new(line);
        cursor.keyword("F")?;
        let slot = cursor.number::<u32>()?;
        let text = cursor.quoted_until(closes_field_text)?.to_string();
        let orientation = Orientation::from_letter(cursor.word()?)?;
        let x = cursor.number::<i64>()?;
        let y = cursor.number::<i64>()?;
        let font_size = cursor.number::<u32>()?;
        let visibility = cursor.number::<u32>()?;

        let mut h_letters = cursor.word()?.chars();
        let h_justify = HJustify::from_letter(h_letters.next()?)?;
        if h_letters.next().is_some() {
            return None;
        }

        let style: Vec<char> = cursor.word()?.chars().collect();
        let [v, italic, bold] = style[..] else {
            return None;
        };
        let v_justify = VJustify::from_letter(v)?;
        let italic = match italic {
            'I' => true,
            'N' => false,
            _ => return None,
        };
        let bold = match bold {
            'B' => true,
            'N' => false,
            _ => return None,
        };

        let offset = Position::new(x, y).checked_sub(anchor)?;

        let explicit_name = if cursor.is_empty() {
            ""
        } else {
            cursor.quoted_to_end()?
        };

        Some(Self {
            slot,
            name: slot_name(slot, explicit_name),
            text,
            orientation,
            offset,
            font_size,
            visible: visibility == 0,
            h_justify,
            v_justify,
            italic,
            bold,
        })
    }

    /// A new field with neutral defaults for `component`.
    ///
    /// The font size follows the component's reference field and the slot defaults
    /// to the current number of fields.
    pub fn default_for(component: &Component, name: &str, slot: Option<u32>) -> Self {
        let slot = slot.unwrap_or_else(|| {
            u32::try_from(component.fields.len()).unwrap_or(u32::MAX)
        });
        let font_size = component
            .fields
            .iter()
            .find(|f| f.slot == 0)
            .map_or(DEFAULT_FONT_SIZE, |f| f.font_size);

        Self {
            slot,
            name: slot_name(slot, name),
            text: "~".to_string(),
            orientation: Orientation::Horizontal,
            offset: Position::default(),
            font_size,
            visible: true,
            h_justify: HJustify::Center,
            v_justify: VJustify::Center,
            italic: false,
            bold: false,
        }
    }

    /// True for the Ref/Value/Footprint/DocSheet slots.
    pub fn is_fixed(&self) -> bool {
        self.slot < FIRST_USER_SLOT
    }

    /// Render the field back to an `F` line relative to `anchor`.
    pub fn render(&self, anchor: Position) -> String {
        let absolute = anchor + self.offset;
        let mut line = format!(
            "F {} \"{}\" {} {} {} {:<3} {} {} {}{}{}",
            self.slot,
            self.text,
            self.orientation.letter(),
            absolute.x,
            absolute.y,
            self.font_size,
            if self.visible { "0000" } else { "0001" },
            self.h_justify.letter(),
            self.v_justify.letter(),
            if self.italic { 'I' } else { 'N' },
            if self.bold { 'B' } else { 'N' },
        );
        if !self.is_fixed() {
            line.push_str(" \"");
            line.push_str(&self.name);
            line.push('"');
        }
        line
    }
}

fn slot_name(slot: u32, explicit: &str) -> String {
    usize::try_from(slot)
        .ok()
        .and_then(|idx| FIXED_FIELD_NAMES.get(idx))
        .map_or_else(|| explicit.to_string(), |fixed| (*fixed).to_string())
}

// The text ends at the first quote followed by whitespace and an orientation letter.
fn closes_field_text(after: &str) -> bool {
    let trimmed = after.trim_start();
    if trimmed.len() == after.len() {
        return false;
    }
    let mut chars = trimmed.chars();
    matches!(chars.next(), Some('H' | 'V')) && chars.next().is_some_and(char::is_whitespace)
}
