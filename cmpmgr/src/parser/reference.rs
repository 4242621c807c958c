//! Effective designator resolution.
//!
//! Sheets instantiated several times keep `U?` on the reference line and record the
//! per-instance designators in `AR` lines:
//!
//! ```text
//! AR Path="/5C8A6000/5C8A7000" Ref="U3"  Part="1"
//! ```

use super::{is_word_char, LineCursor};

/// Placeholder suffix of an unannotated designator.
pub const UNANNOTATED_SUFFIX: char = '?';

/// One parsed `AR` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlternateReference<'a> {
    pub path: &'a str,
    pub reference: &'a str,
    pub part: u32,
}

impl<'a> AlternateReference<'a> {
    pub fn parse(line: &'a str) -> Option<Self> {
        let mut cursor = LineCursor::new(line);
        cursor.keyword("AR")?;
        let path = attribute(cursor.word()?, "Path")?;
        let reference = attribute(cursor.word()?, "Ref")?;
        let part = attribute(cursor.word()?, "Part")?.parse().ok()?;
        if !cursor.is_empty() || !path.starts_with('/') || path.len() < 2 {
            return None;
        }
        Some(Self {
            path,
            reference,
            part,
        })
    }
}

fn attribute<'a>(token: &'a str, key: &str) -> Option<&'a str> {
    token
        .strip_prefix(key)?
        .strip_prefix("=\"")?
        .strip_suffix('"')
}

/// Effective and display designators of one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    pub effective: String,
    /// The placeholder form, kept only when `effective` came from an `AR` line.
    pub display: Option<String>,
}

pub fn is_unannotated(designator: &str) -> bool {
    designator.ends_with(UNANNOTATED_SUFFIX)
}

/// Resolve `designator` against the component's `AR` lines.
///
/// Annotated designators are returned unchanged. A placeholder adopts the
/// designator of the first well-formed `AR` entry that is itself annotated; `None`
/// means the component is still unannotated.
pub fn resolve<S: AsRef<str>>(designator: &str, alternates: &[S]) -> Option<ResolvedReference> {
    if !is_unannotated(designator) {
        return Some(ResolvedReference {
            effective: designator.to_string(),
            display: None,
        });
    }

    alternates
        .iter()
        .filter_map(|line| AlternateReference::parse(line.as_ref()))
        .find(|ar| !ar.reference.is_empty() && ar.reference.chars().all(is_word_char))
        .map(|ar| ResolvedReference {
            effective: ar.reference.to_string(),
            display: Some(designator.to_string()),
        })
}
