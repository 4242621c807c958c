//! Components grouped by effective reference across all sheets.

use std::collections::BTreeMap;

use crate::error::Error;
use crate::parser::{Component, FormatVersion, SheetText};

/// Reference prefixes hidden from the index (test points, mounting holes, ...).
///
/// A pattern matches a reference that starts with it and has at least one digit
/// somewhere after the prefix: `TP` hides `TP3` and `TP3A` but not `TPX`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnorePatterns {
    patterns: Vec<String>,
}

impl IgnorePatterns {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn matches(&self, reference: &str) -> bool {
        self.patterns.iter().any(|pattern| {
            reference
                .strip_prefix(pattern.as_str())
                .is_some_and(|rest| rest.chars().any(|c| c.is_ascii_digit()))
        })
    }
}

/// Mapping from effective reference to the components carrying it.
///
/// More than one entry per reference means a multi-unit part or a part repeated
/// across sheet instances. Entries keep sheet order, then in-sheet order.
#[derive(Debug, Clone, Default)]
pub struct ComponentIndex {
    entries: BTreeMap<String, Vec<Component>>,
}

impl ComponentIndex {
    /// Parse every block of every sheet and index the components not hidden by
    /// `ignore`.
    ///
    /// # Errors
    ///
    /// The first block that fails to parse aborts the build.
    pub fn build(
        sheets: &[SheetText],
        version: FormatVersion,
        ignore: &IgnorePatterns,
    ) -> Result<Self, Error> {
        let mut index = Self::default();
        for sheet in sheets {
            let mut ignored = 0usize;
            for (block, text) in sheet.blocks() {
                let component = Component::parse(text, block, version)?;
                if ignore.matches(&component.reference) {
                    ignored += 1;
                    continue;
                }
                index.insert(component);
            }
            tracing::debug!(
                "Sheet {} ({}): {} blocks, {} ignored",
                sheet.index(),
                sheet.path().display(),
                sheet.block_count(),
                ignored
            );
        }
        Ok(index)
    }

    pub fn insert(&mut self, component: Component) {
        self.entries
            .entry(component.reference.clone())
            .or_default()
            .push(component);
    }

    pub fn get(&self, reference: &str) -> Option<&[Component]> {
        self.entries.get(reference).map(Vec::as_slice)
    }

    pub fn get_mut(&mut self, reference: &str) -> Option<&mut Vec<Component>> {
        self.entries.get_mut(reference)
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.entries.contains_key(reference)
    }

    /// References in sorted order.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Component])> {
        self.entries
            .iter()
            .map(|(reference, components)| (reference.as_str(), components.as_slice()))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Vec<Component>)> {
        self.entries
            .iter_mut()
            .map(|(reference, components)| (reference.as_str(), components))
    }

    /// Number of distinct references.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of physical components across all references.
    pub fn component_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}
