//! `$Comp` block codec.

use std::fmt;

use serde::Serialize;

use super::reference::{self, is_unannotated};
use super::sheet::{BlockId, LineEnding};
use super::{is_word_char, template, Field, LineCursor, Position, FIRST_USER_SLOT};
use crate::error::{Error, Record};

/// Schematic file format version from the `EESchema` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FormatVersion(pub u32);

impl FormatVersion {
    /// Version 2 files have no library name on the reference line.
    pub fn has_library_name(self) -> bool {
        self.0 != 2
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two lines closing a block: `<unit> <x> <y>` and the orientation matrix.
///
/// Whitespace is kept exactly as read; only the coordinates change on render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trailer {
    lead: String,
    unit: String,
    x_gap: String,
    y_gap: String,
    tail: String,
    matrix_line: String,
    matrix: [i8; 4],
}

impl Trailer {
    pub fn parse(position_line: &str, matrix_line: &str) -> Option<Self> {
        let (lead, rest) = split_leading_ws(position_line)?;
        let (unit, rest) = split_token(rest)?;
        let (x_gap, rest) = split_leading_ws(rest)?;
        let (x, rest) = split_token(rest)?;
        let (y_gap, rest) = split_leading_ws(rest)?;
        let (y, tail) = split_token(rest)?;
        if !unit.chars().all(|c| c.is_ascii_digit())
            || x.parse::<i64>().is_err()
            || y.parse::<i64>().is_err()
            || !tail.trim().is_empty()
        {
            return None;
        }

        let (_, entries) = split_leading_ws(matrix_line)?;
        let mut cursor = LineCursor::new(entries);
        let mut matrix = [0i8; 4];
        for slot in &mut matrix {
            *slot = parse_matrix_entry(cursor.word()?)?;
        }
        if !cursor.is_empty() {
            return None;
        }

        Some(Self {
            lead: lead.to_string(),
            unit: unit.to_string(),
            x_gap: x_gap.to_string(),
            y_gap: y_gap.to_string(),
            tail: tail.to_string(),
            matrix_line: matrix_line.to_string(),
            matrix,
        })
    }

    /// Orientation/mirror matrix entries.
    pub fn matrix(&self) -> [i8; 4] {
        self.matrix
    }

    /// Both trailer lines with the coordinates taken from `position`.
    pub fn render(&self, position: Position) -> [String; 2] {
        [
            format!(
                "{}{}{}{}{}{}{}",
                self.lead, self.unit, self.x_gap, position.x, self.y_gap, position.y, self.tail
            ),
            self.matrix_line.clone(),
        ]
    }
}

fn split_leading_ws(s: &str) -> Option<(&str, &str)> {
    let rest = s.trim_start();
    let ws = &s[..s.len() - rest.len()];
    (!ws.is_empty() && !rest.is_empty()).then_some((ws, rest))
}

fn split_token(s: &str) -> Option<(&str, &str)> {
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    (end > 0).then(|| s.split_at(end))
}

fn parse_matrix_entry(token: &str) -> Option<i8> {
    let digits = token.trim_start_matches('-');
    let value: i8 = match digits {
        "0" => 0,
        "1" => 1,
        _ => return None,
    };
    Some(if token.len() > digits.len() { -value } else { value })
}

/// One placed component instance on one sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Component {
    /// Library name, present only in the 3-token reference grammar.
    pub lib: Option<String>,
    pub lib_ref: String,
    /// Effective (annotated) designator.
    pub reference: String,
    /// Placeholder designator kept for rendering when `reference` came from an `AR` line.
    pub display_reference: Option<String>,
    pub part: u32,
    pub unit_marker: u32,
    pub timestamp: String,
    pub position: Position,
    pub fields: Vec<Field>,
    pub alternate_refs: Vec<String>,
    #[serde(skip)]
    pub trailer: Trailer,
    pub version: FormatVersion,
    #[serde(skip)]
    block: BlockId,
    #[serde(skip)]
    original: String,
    #[serde(skip)]
    line_ending: LineEnding,
}

impl Component {
    /// Parse the body of one `$Comp` block (the lines between the markers).
    ///
    /// # Errors
    ///
    /// `FormatViolation` when the reference, unit, position, field or trailer lines do
    /// not match their grammar, and `UnannotatedReference` when the designator is a
    /// placeholder that no `AR` line resolves.
    pub fn parse(text: &str, block: BlockId, version: FormatVersion) -> Result<Self, Error> {
        let violation = |record| Error::FormatViolation {
            record,
            text: text.to_string(),
        };
        let mut lines = text.lines();

        let (lib, lib_ref, designator) = lines
            .next()
            .and_then(|line| parse_reference_line(line, version))
            .ok_or_else(|| violation(Record::Reference))?;

        let (part, unit_marker, timestamp) = lines
            .next()
            .and_then(parse_unit_line)
            .ok_or_else(|| violation(Record::Unit))?;

        let position = lines
            .next()
            .and_then(parse_position_line)
            .ok_or_else(|| violation(Record::Position))?;

        let rest: Vec<&str> = lines.collect();
        let mut alternate_refs = Vec::new();
        let mut fields = Vec::new();
        let mut consumed = 0;
        for line in &rest {
            if line.starts_with("AR ") {
                alternate_refs.push((*line).to_string());
            } else if line.starts_with("F ") {
                fields.push(Field::parse(position, line).ok_or_else(|| violation(Record::Field))?);
            } else {
                break;
            }
            consumed += 1;
        }
        fields.sort_by_key(|f| f.slot);

        let trailer = match rest[consumed..] {
            [position_line, matrix_line] => Trailer::parse(position_line, matrix_line),
            _ => None,
        }
        .ok_or_else(|| violation(Record::Trailer))?;

        let resolved = reference::resolve(&designator, &alternate_refs).ok_or_else(|| {
            Error::UnannotatedReference {
                reference: designator.clone(),
                text: text.to_string(),
            }
        })?;

        Ok(Self {
            lib,
            lib_ref,
            reference: resolved.effective,
            display_reference: resolved.display,
            part,
            unit_marker,
            timestamp,
            position,
            fields,
            alternate_refs,
            trailer,
            version,
            block,
            original: text.to_string(),
            line_ending: LineEnding::detect(text),
        })
    }

    /// Where this component's block lives.
    pub fn block(&self) -> BlockId {
        self.block
    }

    pub fn sheet(&self) -> usize {
        self.block.sheet
    }

    /// The block text as last read from or written to the sheet buffer.
    pub fn original_text(&self) -> &str {
        &self.original
    }

    /// Line terminator of this block as read; sheets may mix endings.
    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    pub(crate) fn mark_saved(&mut self, text: String) {
        self.original = text;
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    /// Insert `field` after every field with the same or a lower slot.
    pub fn add_field(&mut self, field: Field) {
        let at = self.fields.partition_point(|f| f.slot <= field.slot);
        self.fields.insert(at, field);
    }

    /// Remove the first field called `name`.
    pub fn remove_field(&mut self, name: &str) -> Option<Field> {
        let idx = self.fields.iter().position(|f| f.name == name)?;
        Some(self.fields.remove(idx))
    }

    /// Reassign slots 4, 5, 6... to the user fields in list order.
    pub fn renumber_fields(&mut self) {
        let user_fields = self.fields.iter_mut().filter(|f| !f.is_fixed());
        for (slot, field) in (FIRST_USER_SLOT..).zip(user_fields) {
            field.slot = slot;
        }
    }

    /// Expand `$NAME` and `${NAME WITH SPACES}` tokens in `pattern`.
    pub fn resolve_template(&self, pattern: &str) -> String {
        template::resolve(self, pattern)
    }

    /// Render the block body, every line terminated by `line_ending`.
    pub fn render(&self, line_ending: LineEnding) -> String {
        let le = line_ending.as_str();
        let designator = self.display_reference.as_deref().unwrap_or(&self.reference);
        let mut out = match (&self.lib, self.version.has_library_name()) {
            (Some(lib), true) => format!("L {lib}:{} {designator}{le}", self.lib_ref),
            _ => format!("L {} {designator}{le}", self.lib_ref),
        };
        out.push_str(&format!(
            "U {} {} {}{le}",
            self.part, self.unit_marker, self.timestamp
        ));
        out.push_str(&format!("P {}{le}", self.position));
        for line in &self.alternate_refs {
            out.push_str(line);
            out.push_str(le);
        }
        let mut fields: Vec<&Field> = self.fields.iter().collect();
        fields.sort_by_key(|f| f.slot);
        for field in fields {
            out.push_str(&field.render(self.position));
            out.push_str(le);
        }
        for line in self.trailer.render(self.position) {
            out.push_str(&line);
            out.push_str(le);
        }
        out
    }
}

fn parse_reference_line(
    line: &str,
    version: FormatVersion,
) -> Option<(Option<String>, String, String)> {
    let mut cursor = LineCursor::new(line);
    cursor.keyword("L")?;
    let symbol = cursor.word()?;
    let designator = cursor.word()?;
    if !cursor.is_empty() || !is_designator(designator) {
        return None;
    }

    if version.has_library_name() {
        let (lib, lib_ref) = symbol.split_once(':')?;
        if lib.is_empty() || lib_ref.is_empty() {
            return None;
        }
        Some((Some(lib.to_string()), lib_ref.to_string(), designator.to_string()))
    } else {
        Some((None, symbol.to_string(), designator.to_string()))
    }
}

fn is_designator(token: &str) -> bool {
    let body = if is_unannotated(token) {
        &token[..token.len() - 1]
    } else {
        token
    };
    !body.is_empty() && body.chars().all(|c| is_word_char(c) || c == '#')
}

fn parse_unit_line(line: &str) -> Option<(u32, u32, String)> {
    let mut cursor = LineCursor::new(line);
    cursor.keyword("U")?;
    let part = cursor.number()?;
    let marker = cursor.number()?;
    let timestamp = cursor.word()?;
    if !cursor.is_empty() || !timestamp.chars().all(is_word_char) {
        return None;
    }
    Some((part, marker, timestamp.to_string()))
}

fn parse_position_line(line: &str) -> Option<Position> {
    let mut cursor = LineCursor::new(line);
    cursor.keyword("P")?;
    let x = cursor.number()?;
    let y = cursor.number()?;
    cursor.is_empty().then_some(Position::new(x, y))
}
