//! cmpmgr - KiCad legacy schematic component field manager
//!
//! This library loads legacy EESchema schematics (and their sub-sheets), exposes
//! every placed component with its fields, and writes edits back by replacing only
//! the `$Comp` blocks that changed.
//!
//! # Quick Start
//!
//! ```no_run
//! use cmpmgr::prelude::*;
//! use std::path::Path;
//!
//! let mut project = Project::load(Path::new("amplifier.sch"), &Settings::default()).unwrap();
//!
//! for component in project.components_mut("R1").unwrap() {
//!     if let Some(value) = component.field_mut("Value") {
//!         value.text = "4k7".to_string();
//!     }
//! }
//!
//! let report = project.save_in_place().unwrap();
//! println!("{} components updated", report.rendered);
//! ```
//!
//! # Features
//!
//! - **Exact round-trip**: untouched blocks and non-component text stay byte-identical
//! - **Hierarchical sheets**: sub-sheets discovered from `$Sheet` blocks, `U?`
//!   designators resolved through `AR` records
//! - **Field editing**: add, remove and renumber user fields
//! - **Templates**: `$Ref-$Value` style expansion for file names and labels

pub mod config;
pub mod error;
pub mod index;
pub mod parser;
pub mod project;

// Re-export main types
pub use config::{load_settings, save_settings, Settings};
pub use error::{ConfigError, Error, Record};
pub use index::{ComponentIndex, IgnorePatterns};
pub use parser::{Component, Field, FormatVersion, Position, SheetText};
pub use project::{Project, SaveReport};

/// Load a project with default settings (convenience wrapper).
///
/// # Errors
///
/// See [`Project::load`].
pub fn load_schematic(path: &std::path::Path) -> Result<Project, Error> {
    Project::load(path, &Settings::default())
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Component, ComponentIndex, Error, Field, IgnorePatterns, Project, SaveReport, Settings,
    };
}
