//! cmpmgr CLI - inspect and edit component fields of KiCad legacy schematics.

use clap::{Parser, Subcommand, ValueEnum};
use cmpmgr::config::default_config_path;
use cmpmgr::parser::{FIRST_USER_SLOT, FIXED_FIELD_NAMES};
use cmpmgr::{load_settings, save_settings, Component, ConfigError, Field, Project, Settings};
use std::path::{Path, PathBuf};
use std::process;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Unknown reference, unknown field, or a pattern that is not configured.
const EXIT_NOT_FOUND: i32 = 3;

#[derive(Parser)]
#[command(name = "cmpmgr")]
#[command(about = "KiCad legacy schematic component field manager", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (defaults to the platform configuration directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Ignore references with this prefix for this run (repeatable)
    #[arg(long = "ignore", global = true, value_name = "PREFIX")]
    ignore: Vec<String>,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every indexed component of a schematic and its sub-sheets
    List {
        /// Path to the root .sch file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Dump all units and fields of one reference
    Show {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Reference designator, e.g. R12
        #[arg(value_name = "REF")]
        reference: String,

        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Set a field on every unit of a reference, adding it when missing
    Set {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(value_name = "REF")]
        reference: String,

        /// Field name, e.g. Value or MPN
        #[arg(value_name = "FIELD")]
        field: String,

        #[arg(value_name = "TEXT")]
        text: String,
    },

    /// Remove a user field from every unit of a reference
    RemoveField {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(value_name = "REF")]
        reference: String,

        #[arg(value_name = "FIELD")]
        field: String,
    },

    /// Expand a name template such as '$Ref-$Value' for every component
    Name {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(value_name = "TEMPLATE")]
        template: String,
    },

    /// Manage the persisted reference ignore list
    Ignore {
        #[command(subcommand)]
        action: IgnoreAction,
    },
}

#[derive(Subcommand)]
enum IgnoreAction {
    /// Show configured prefixes
    List,
    /// Add a prefix
    Add { prefix: String },
    /// Remove a prefix
    Remove { prefix: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for scripts
    Json,
}

fn main() {
    let cli = Cli::parse();

    let mut settings = match load_cli_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };
    init_tracing(get_log_level(cli.verbose, cli.quiet, &settings.log_level));

    let config = cli.config.as_deref();
    let exit_code = match cli.command {
        Commands::Ignore { action } => handle_ignore(action, config, settings),
        command => {
            settings.component_ignore.extend(cli.ignore);
            run_project_command(command, &settings)
        }
    };

    process::exit(exit_code);
}

/// `ignore add` may create the settings file, so a missing explicit file is fine there.
fn load_cli_settings(cli: &Cli) -> Result<Settings, ConfigError> {
    match load_settings(cli.config.as_deref()) {
        Err(ConfigError::NotFound { .. }) if matches!(cli.command, Commands::Ignore { .. }) => {
            Ok(Settings::default())
        }
        other => other,
    }
}

/// Determines the log level from CLI arguments.
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_project_command(command: Commands, settings: &Settings) -> i32 {
    let file = match &command {
        Commands::List { file, .. }
        | Commands::Show { file, .. }
        | Commands::Set { file, .. }
        | Commands::RemoveField { file, .. }
        | Commands::Name { file, .. } => file.clone(),
        Commands::Ignore { .. } => return 1,
    };

    let mut project = match Project::load(&file, settings) {
        Ok(project) => project,
        Err(e) => {
            eprintln!("Error: {e}");
            return e.exit_code();
        }
    };

    match command {
        Commands::List { format, .. } => handle_list(&project, format),
        Commands::Show {
            reference, format, ..
        } => handle_show(&project, &reference, format),
        Commands::Set {
            reference,
            field,
            text,
            ..
        } => handle_set(&mut project, &reference, &field, &text),
        Commands::RemoveField {
            reference, field, ..
        } => handle_remove_field(&mut project, &reference, &field),
        Commands::Name { template, .. } => handle_name(&project, &template),
        Commands::Ignore { .. } => 1,
    }
}

fn handle_list(project: &Project, format: OutputFormat) -> i32 {
    match format {
        OutputFormat::Human => {
            println!("\nFile: {}", project.root().display());
            println!("{}", "─".repeat(60));
            if project.index().is_empty() {
                println!("  No components found");
                return 0;
            }
            for (reference, units) in project.index().iter() {
                let value = units
                    .first()
                    .and_then(|c| c.field("Value"))
                    .map_or("", |f| f.text.as_str());
                let sheet = units
                    .first()
                    .and_then(|c| project.sheets().get(c.sheet()))
                    .map_or_else(String::new, |s| s.path().display().to_string());
                let lib_ref = units.first().map_or("", |c| c.lib_ref.as_str());
                println!(
                    "  {:<10} {:<20} {:<24} {} unit(s)  {}",
                    reference,
                    value,
                    lib_ref,
                    units.len(),
                    sheet
                );
            }
            println!("\n  Summary:");
            println!("    References: {}", project.index().len());
            println!("    Components: {}", project.index().component_count());
            println!("    Sheets:     {}", project.sheets().len());
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "file": project.root().display().to_string(),
                "version": project.version().0,
                "sheets": project
                    .sheets()
                    .iter()
                    .map(|s| s.path().display().to_string())
                    .collect::<Vec<_>>(),
                "components": project
                    .index()
                    .iter()
                    .map(|(reference, units)| {
                        serde_json::json!({
                            "reference": reference,
                            "lib_ref": units.first().map(|c| c.lib_ref.as_str()),
                            "value": units.first().and_then(|c| c.field("Value")).map(|f| f.text.as_str()),
                            "units": units.iter().map(|c| c.part).collect::<Vec<_>>(),
                        })
                    })
                    .collect::<Vec<_>>(),
            });
            print_json(&output);
        }
    }
    0
}

fn handle_show(project: &Project, reference: &str, format: OutputFormat) -> i32 {
    let Some(units) = project.components(reference) else {
        eprintln!("Error: no component with reference {reference}");
        return EXIT_NOT_FOUND;
    };

    match format {
        OutputFormat::Human => {
            for component in units {
                let sheet = project
                    .sheets()
                    .get(component.sheet())
                    .map_or_else(String::new, |s| s.path().display().to_string());
                output_component_human(component, &sheet);
            }
        }
        OutputFormat::Json => print_json(&units),
    }
    0
}

fn output_component_human(component: &Component, sheet: &str) {
    let unit = if component.part > 1 {
        format!(".{}", component.part)
    } else {
        String::new()
    };
    println!("{}", "═".repeat(100));
    println!("Ref       : {}{}", component.reference, unit);
    if let Some(lib) = &component.lib {
        println!("Lib       : {lib}");
    }
    println!("LibRef    : {}", component.lib_ref);
    println!("X         : {}", component.position.x);
    println!("Y         : {}", component.position.y);
    println!("Timestamp : {}", component.timestamp);
    println!("Sheet     : {sheet}");
    println!("{}", "─".repeat(100));
    println!(
        "{:<12}{:<16}{:<13}{:>7}{:>7}  {:<9}{:<9}{:<9}{:<6}{:<8}{:<6}ID",
        "Name", "Text", "Orientation", "X", "Y", "Visible", "H Align", "V Align", "Font", "Italic", "Bold"
    );
    for field in &component.fields {
        let text: String = field.text.chars().take(15).collect();
        println!(
            "{:<12}{:<16}{:<13}{:>7}{:>7}  {:<9}{:<9}{:<9}{:<6}{:<8}{:<6}{}",
            field.name,
            text,
            field.orientation,
            field.offset.x,
            field.offset.y,
            yes_no(field.visible),
            field.h_justify,
            field.v_justify,
            field.font_size,
            yes_no(field.italic),
            yes_no(field.bold),
            field.slot
        );
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

fn handle_set(project: &mut Project, reference: &str, name: &str, text: &str) -> i32 {
    let Some(units) = project.components_mut(reference) else {
        eprintln!("Error: no component with reference {reference}");
        return EXIT_NOT_FOUND;
    };

    for component in units.iter_mut() {
        if let Some(field) = component.field_mut(name) {
            field.text = text.to_string();
            continue;
        }
        let slot = slot_for(component, name);
        let mut field = Field::default_for(component, name, Some(slot));
        field.text = text.to_string();
        tracing::debug!("Adding field {} to {} (part {})", name, reference, component.part);
        component.add_field(field);
    }

    save(project)
}

/// Fixed names keep their fixed slot; anything else goes after the last field.
fn slot_for(component: &Component, name: &str) -> u32 {
    FIXED_FIELD_NAMES
        .iter()
        .position(|fixed| *fixed == name)
        .and_then(|idx| u32::try_from(idx).ok())
        .unwrap_or_else(|| next_user_slot(component))
}

fn next_user_slot(component: &Component) -> u32 {
    component
        .fields
        .iter()
        .map(|f| f.slot + 1)
        .max()
        .unwrap_or(FIRST_USER_SLOT)
        .max(FIRST_USER_SLOT)
}

fn handle_remove_field(project: &mut Project, reference: &str, name: &str) -> i32 {
    if FIXED_FIELD_NAMES.contains(&name) {
        eprintln!("Error: {name} is a fixed field and cannot be removed");
        return 1;
    }
    let Some(units) = project.components_mut(reference) else {
        eprintln!("Error: no component with reference {reference}");
        return EXIT_NOT_FOUND;
    };

    let removed = units
        .iter_mut()
        .filter_map(|c| c.remove_field(name))
        .count();
    if removed == 0 {
        eprintln!("Error: {reference} has no field named {name}");
        return EXIT_NOT_FOUND;
    }

    save(project)
}

fn save(project: &mut Project) -> i32 {
    match project.save_in_place() {
        Ok(report) => {
            println!(
                "Updated {} component(s) in {} file(s)",
                report.rendered,
                report.files.len()
            );
            for backup in &report.backups {
                println!("  Backup: {}", backup.display());
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {e}");
            e.exit_code()
        }
    }
}

fn handle_name(project: &Project, template: &str) -> i32 {
    for (reference, units) in project.index().iter() {
        for component in units {
            println!("{}\t{}", reference, component.resolve_template(template));
        }
    }
    0
}

fn handle_ignore(action: IgnoreAction, config: Option<&Path>, mut settings: Settings) -> i32 {
    match action {
        IgnoreAction::List => {
            if let Some(path) = config.map(Path::to_path_buf).or_else(default_config_path) {
                println!("Settings: {}", path.display());
            }
            for prefix in &settings.component_ignore {
                println!("  {prefix}");
            }
            0
        }
        IgnoreAction::Add { prefix } => {
            if !settings.add_ignore(&prefix) {
                println!("{prefix} is already ignored");
                return 0;
            }
            persist(config, &settings)
        }
        IgnoreAction::Remove { prefix } => {
            if !settings.remove_ignore(&prefix) {
                eprintln!("Error: {prefix} is not in the ignore list");
                return EXIT_NOT_FOUND;
            }
            persist(config, &settings)
        }
    }
}

fn persist(config: Option<&Path>, settings: &Settings) -> i32 {
    match save_settings(config, settings) {
        Ok(path) => {
            println!("Saved {}", path.display());
            0
        }
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Error: {e}"),
    }
}
