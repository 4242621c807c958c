//! List every component of a schematic with a name built from a template.

use cmpmgr::prelude::*;
use std::path::Path;

fn main() -> Result<(), Error> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/amplifier.sch".to_string());
    let template = std::env::args()
        .nth(2)
        .unwrap_or_else(|| "$Ref-$Value".to_string());
    let path = Path::new(&path);

    if !path.exists() {
        eprintln!("File not found: {}", path.display());
        eprintln!("Usage: cargo run --example list_components [path/to/file.sch] [template]");
        std::process::exit(1);
    }

    let project = Project::load(path, &Settings::default())?;

    println!("Components in: {}", project.root().display());
    println!("Sheets: {}", project.sheets().len());
    println!();

    for (reference, units) in project.index().iter() {
        for component in units {
            println!(
                "  {:<8} unit {}  {}",
                reference,
                component.part,
                component.resolve_template(&template)
            );
        }
    }

    Ok(())
}
