#[macro_use]
extern crate log;

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;

use cfgtoggle::{
    ChangeReport, Engine, EngineOptions, ToggleError,
    appcfg::{AppSchema, FileStore, value_to_text},
};

#[derive(Debug, Parser)]
#[command(
    name = "cfgtoggle",
    version,
    about = "Toggle settings in other applications' config files"
)]
struct Cli {
    /// Directory holding `apps/<name>.yaml` schemas [default: ~/.config/configtoggle]
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Show what would change without writing files or running hooks.
    #[arg(long, global = true)]
    dry_run: bool,

    /// Debug logging and a diff for every change.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Set a field to a value.
    Toggle { app: String, key: String, value: String },
    /// Advance a field to its next allowed value.
    Cycle { app: String, key: String },
    /// Apply a named preset.
    Preset {
        app: String,
        name: String,
        /// Only print the changes the preset would make.
        #[arg(long)]
        show_diff: bool,
    },
    /// Append a value to a list setting.
    Append { app: String, key: String, value: String },
    /// Remove matching entries from a list setting.
    Remove { app: String, key: String, value: String },
    /// List apps, presets or keys.
    List {
        #[command(subcommand)]
        what: ListCommand,
    },
    /// Show the current value of every field of an app.
    Values {
        app: String,
        /// Only fields that differ from their schema default.
        #[arg(long)]
        changed: bool,
    },
    /// Print the JSON Schema of app definition files.
    Schema,
}

#[derive(Debug, Subcommand)]
enum ListCommand {
    Apps,
    Presets { app: String },
    Keys { app: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let store = match cli.config_dir {
        Some(dir) => FileStore::new(dir),
        None => FileStore::from_default_dir().context("cannot open the default config directory")?,
    };
    debug!("Using config dir {}", store.root().display());

    let options = EngineOptions::default()
        .with_dry_run(cli.dry_run)
        .with_verbose(cli.verbose);
    let engine = Engine::new(Arc::new(store), options);

    match cli.command {
        Command::Toggle { app, key, value } => print_report(&engine.toggle(&app, &key, &value)?),
        Command::Cycle { app, key } => print_report(&engine.cycle(&app, &key)?),
        Command::Preset {
            app,
            name,
            show_diff: true,
        } => {
            let diff = engine.preset_diff(&app, &name)?;
            println!("{}", diff.summary().bold());
            print_diff_lines(&diff.lines());
        }
        Command::Preset { app, name, .. } => print_report(&engine.apply_preset(&app, &name)?),
        Command::Append { app, key, value } => print_report(&engine.append(&app, &key, &value)?),
        Command::Remove { app, key, value } => print_report(&engine.remove(&app, &key, &value)?),
        Command::List { what } => match what {
            ListCommand::Apps => {
                let apps = engine.list_apps()?;
                if apps.is_empty() {
                    println!("{}", "No apps configured".yellow());
                }
                for app in apps {
                    println!(
                        "{} {}",
                        app.name.bold(),
                        format!("({} fields, {} presets)", app.fields, app.presets).dimmed()
                    );
                    println!("  {}", app.target_path);
                    if let Some(d) = &app.description {
                        println!("  {d}");
                    }
                }
            }
            ListCommand::Presets { app } => {
                for preset in engine.list_presets(&app)? {
                    println!("{preset}");
                }
            }
            ListCommand::Keys { app } => {
                for key in engine.list_keys(&app)? {
                    println!("{key}");
                }
            }
        },
        Command::Values { app, changed } => {
            let values = if changed {
                engine.get_changed_values(&app)?
            } else {
                engine.get_current_values(&app)?
            };
            if changed && values.is_empty() {
                println!("{}", format!("No values of {app} differ from their defaults").dimmed());
            }
            for (key, value) in values {
                match value {
                    Some(v) => println!("{} = {}", key.bold(), value_to_text(&v)),
                    None => println!("{} = {}", key.bold(), "(unset)".dimmed()),
                }
            }
        }
        Command::Schema => {
            let schema = schemars::schema_for!(AppSchema);
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }
    Ok(())
}

fn print_report(report: &ChangeReport) {
    let headline = report.headline();
    if report.dry_run {
        println!("{}", headline.yellow().bold());
    } else if report.has_changes() {
        println!("{}", headline.green().bold());
    } else {
        println!("{}", headline.dimmed());
    }
    print_diff_lines(&report.diff.lines());
    if let Some(hook) = &report.hook {
        println!(
            "  {} {}",
            format!("hook {}:", hook.lifecycle).cyan(),
            hook.command
        );
    }
    for w in &report.warnings {
        println!("  {} {w}", "warning:".yellow());
    }
}

fn print_diff_lines(lines: &[String]) {
    for line in lines {
        let styled = match line.chars().next() {
            Some('+') => line.green(),
            Some('-') => line.red(),
            _ => line.yellow(),
        };
        println!("  {styled}");
    }
}

fn print_error(err: &anyhow::Error) {
    eprintln!("{} {err}", "error:".red().bold());
    for cause in err.chain().skip(1) {
        eprintln!("  {} {cause}", "caused by:".red());
    }

    if let Some(e) = err.downcast_ref::<ToggleError>() {
        let suggestions = e.suggestions();
        if !suggestions.is_empty() {
            eprintln!(
                "  {} {}",
                format!("[{}]", e.kind()).dimmed(),
                suggestions.join(", ").cyan()
            );
        }
    }
}
