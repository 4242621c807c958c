//! Project context: a root sheet, its sub-sheets and their component index.
//!
//! All state lives in a [`Project`] value created by the caller; there is no
//! process-wide manager.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::Settings;
use crate::error::Error;
use crate::index::{ComponentIndex, IgnorePatterns};
use crate::parser::{parse_header, sheet_files, Component, FormatVersion, SheetText};

/// Outcome of one save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub files: Vec<PathBuf>,
    pub backups: Vec<PathBuf>,
    /// Components whose block text changed.
    pub rendered: usize,
}

type SaveListener = Box<dyn FnMut(&SaveReport)>;

pub struct Project {
    root: PathBuf,
    version: FormatVersion,
    sheets: Vec<SheetText>,
    index: ComponentIndex,
    listeners: Vec<SaveListener>,
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("root", &self.root)
            .field("version", &self.version)
            .field("sheets", &self.sheets.len())
            .field("components", &self.index.component_count())
            .finish_non_exhaustive()
    }
}

impl Project {
    /// Load the root sheet at `path`, every sub-sheet it references, and index their
    /// components.
    ///
    /// # Errors
    ///
    /// Any unreadable file, missing header or malformed component aborts the load.
    pub fn load(path: &Path, settings: &Settings) -> Result<Self, Error> {
        let root_text = read_sheet(path)?;
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        let root_name = path.file_name().map_or_else(|| path.to_path_buf(), PathBuf::from);

        let mut sheets = vec![(root_name, root_text)];
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut queue: VecDeque<usize> = VecDeque::from([0]);
        while let Some(idx) = queue.pop_front() {
            for name in sheet_files(&sheets[idx].1) {
                let name = PathBuf::from(name);
                // Multi-instance sheets share one file.
                if !seen.insert(name.clone()) || name == sheets[0].0 {
                    tracing::debug!("Sheet file {} already loaded", name.display());
                    continue;
                }
                let text = read_sheet(&dir.join(&name))?;
                tracing::debug!("Loaded sub-sheet {}", name.display());
                sheets.push((name, text));
                queue.push_back(sheets.len() - 1);
            }
        }

        let project = Self::from_sheets(path.to_path_buf(), sheets, &settings.ignore_patterns())?;
        tracing::info!(
            "Loaded {} ({} sheets, {} references, {} components)",
            path.display(),
            project.sheets.len(),
            project.index.len(),
            project.index.component_count()
        );
        Ok(project)
    }

    /// Build a project from in-memory sheets; the first one is the root.
    ///
    /// # Errors
    ///
    /// `MissingHeader` when the root has no `EESchema` header, or any parse error.
    pub fn from_sheets(
        root: PathBuf,
        sheets: Vec<(PathBuf, String)>,
        ignore: &IgnorePatterns,
    ) -> Result<Self, Error> {
        let version = sheets
            .first()
            .and_then(|(_, text)| parse_header(text))
            .ok_or_else(|| Error::MissingHeader { path: root.clone() })?;

        let sheets: Vec<SheetText> = sheets
            .into_iter()
            .enumerate()
            .map(|(idx, (name, text))| SheetText::new(idx, name, text))
            .collect();
        let index = ComponentIndex::build(&sheets, version, ignore)?;

        Ok(Self {
            root,
            version,
            sheets,
            index,
            listeners: Vec::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn version(&self) -> FormatVersion {
        self.version
    }

    pub fn sheets(&self) -> &[SheetText] {
        &self.sheets
    }

    pub fn index(&self) -> &ComponentIndex {
        &self.index
    }

    pub fn components(&self, reference: &str) -> Option<&[Component]> {
        self.index.get(reference)
    }

    pub fn components_mut(&mut self, reference: &str) -> Option<&mut Vec<Component>> {
        self.index.get_mut(reference)
    }

    /// Register a callback invoked after every successful save.
    pub fn on_saved(&mut self, listener: impl FnMut(&SaveReport) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Renumber, render and substitute every indexed component into its sheet
    /// buffer. Returns how many blocks changed.
    ///
    /// # Errors
    ///
    /// `StaleBlock` if a buffer no longer holds a component's original text.
    pub fn apply_edits(&mut self) -> Result<usize, Error> {
        let mut changed = 0;
        for (reference, components) in self.index.iter_mut() {
            for component in components.iter_mut() {
                component.renumber_fields();
                let sheet = &mut self.sheets[component.sheet()];
                let rendered = component.render(component.line_ending());
                if rendered == component.original_text() {
                    continue;
                }
                sheet.substitute(component.block().index, component.original_text(), &rendered)?;
                tracing::debug!("Updated {} (part {}) on sheet {}", reference, component.part, sheet.index());
                component.mark_saved(rendered);
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Save all sheets next to `path`, which becomes the new root file name.
    ///
    /// Existing files are copied to `<stem>.~` before being overwritten.
    ///
    /// # Errors
    ///
    /// Rendering errors or any failed backup/write.
    pub fn save(&mut self, path: &Path) -> Result<SaveReport, Error> {
        let rendered = self.apply_edits()?;
        let dir = path.parent().unwrap_or_else(|| Path::new(""));

        let mut report = SaveReport {
            rendered,
            ..SaveReport::default()
        };
        for sheet in &mut self.sheets {
            let dest = if sheet.index() == 0 {
                path.to_path_buf()
            } else {
                dir.join(sheet.path())
            };
            if dest.exists() {
                let backup = backup_path(&dest);
                std::fs::copy(&dest, &backup).map_err(|e| Error::io(&backup, e))?;
                report.backups.push(backup);
            }
            std::fs::write(&dest, sheet.text().as_bytes()).map_err(|e| Error::io(&dest, e))?;
            if sheet.index() == 0 {
                if let Some(name) = path.file_name() {
                    sheet.set_path(PathBuf::from(name));
                }
            }
            report.files.push(dest);
        }
        self.root = path.to_path_buf();

        tracing::info!(
            "Saved {} ({} files, {} components updated)",
            path.display(),
            report.files.len(),
            report.rendered
        );
        for listener in &mut self.listeners {
            listener(&report);
        }
        Ok(report)
    }

    /// Save over the files the project was loaded from.
    ///
    /// # Errors
    ///
    /// See [`Project::save`].
    pub fn save_in_place(&mut self) -> Result<SaveReport, Error> {
        let root = self.root.clone();
        self.save(&root)
    }
}

/// `dir/name.sch` → `dir/name.~`
pub fn backup_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
    path.with_file_name(format!("{stem}.~"))
}

fn read_sheet(path: &Path) -> Result<String, Error> {
    let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    String::from_utf8(bytes).map_err(|e| {
        Error::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    const ROOT: &str = "EESchema Schematic File Version 4
EELAYER 30 0
EELAYER END
$Comp
L Device:R R1
U 1 1 5C8A5B2B
P 3000 2000
F 0 \"R1\" H 3070 2046 50  0000 L CNN
F 1 \"10k\" H 3070 1955 50  0000 L CNN
\t1    3000 2000
\t1    0    0    -1
$EndComp
$Comp
L Connector:TestPoint TP1
U 1 1 5C8A5B2C
P 3500 2000
F 0 \"TP1\" H 3500 2200 50  0000 C CNN
\t1    3500 2000
\t1    0    0    -1
$EndComp
$EndSCHEMATC
";

    fn project(ignore: &[&str]) -> Project {
        Project::from_sheets(
            PathBuf::from("root.sch"),
            vec![(PathBuf::from("root.sch"), ROOT.to_string())],
            &IgnorePatterns::new(ignore.iter().copied()),
        )
        .unwrap()
    }

    #[test]
    fn test_backup_path_replaces_extension() {
        assert_eq!(backup_path(Path::new("/a/b/amp.sch")), PathBuf::from("/a/b/amp.~"));
    }

    #[test]
    fn test_missing_header_is_rejected() {
        let err = Project::from_sheets(
            PathBuf::from("x.sch"),
            vec![(PathBuf::from("x.sch"), "$Comp\n$EndComp\n".to_string())],
            &IgnorePatterns::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::MissingHeader { .. }));
    }

    #[test]
    fn test_unchanged_project_applies_no_edits() {
        let mut p = project(&[]);
        assert_eq!(p.apply_edits().unwrap(), 0);
        assert_eq!(p.sheets()[0].text(), ROOT);
    }

    #[test]
    fn test_edit_changes_only_that_block() {
        let mut p = project(&[]);
        p.components_mut("R1").unwrap()[0]
            .field_mut("Value")
            .unwrap()
            .text = "22k".to_string();

        assert_eq!(p.apply_edits().unwrap(), 1);
        assert_eq!(
            p.sheets()[0].text(),
            ROOT.replace("F 1 \"10k\"", "F 1 \"22k\"")
        );
        assert_eq!(p.apply_edits().unwrap(), 0, "second pass must be a no-op");
    }

    #[test]
    fn test_mixed_line_endings_survive_unedited() {
        let mixed = ROOT.replacen('\n', "\r\n", 1);
        let mut p = Project::from_sheets(
            PathBuf::from("root.sch"),
            vec![(PathBuf::from("root.sch"), mixed.clone())],
            &IgnorePatterns::default(),
        )
        .unwrap();

        assert_eq!(p.apply_edits().unwrap(), 0);
        assert_eq!(p.sheets()[0].text(), mixed);

        p.components_mut("TP1").unwrap()[0].position.y += 10;
        assert_eq!(p.apply_edits().unwrap(), 1);
        assert_eq!(
            p.sheets()[0].text(),
            mixed
                .replace("P 3500 2000\n", "P 3500 2010\n")
                .replace("H 3500 2200", "H 3500 2210")
                .replace("\t1    3500 2000\n", "\t1    3500 2010\n")
        );
    }

    #[test]
    fn test_ignored_components_keep_their_text() {
        let mut p = project(&["TP"]);
        assert!(p.components("TP1").is_none());
        for c in p.components_mut("R1").unwrap() {
            c.position.x += 100;
        }
        p.apply_edits().unwrap();
        assert!(p.sheets()[0].text().contains("F 0 \"TP1\" H 3500 2200 50  0000 C CNN\n"));
        assert!(p.sheets()[0].text().contains("P 3100 2000\n"));
    }

    #[test]
    fn test_save_writes_backup_and_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("root.sch");
        std::fs::write(&path, ROOT).unwrap();

        let mut p = Project::load(&path, &Settings::default()).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        p.on_saved(move |report| sink.borrow_mut().push(report.clone()));

        p.components_mut("R1").unwrap()[0]
            .field_mut("Value")
            .unwrap()
            .text = "1k".to_string();
        let report = p.save_in_place().unwrap();

        assert_eq!(report.rendered, 1);
        assert_eq!(report.files, [path.clone()]);
        assert_eq!(report.backups, [dir.path().join("root.~")]);
        assert_eq!(std::fs::read_to_string(dir.path().join("root.~")).unwrap(), ROOT);
        assert!(std::fs::read_to_string(&path).unwrap().contains("F 1 \"1k\""));
        assert_eq!(seen.borrow().as_slice(), [report]);
    }

    #[test]
    fn test_invalid_utf8_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.sch");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        let err = Project::load(&path, &Settings::default()).unwrap_err();
        assert!(matches!(err, Error::Io { ref source, .. } if source.kind() == std::io::ErrorKind::InvalidData));
    }
}
