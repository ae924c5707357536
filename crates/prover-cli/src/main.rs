mod commands;
mod logging;
mod progress;

use std::fs;
use std::io::{self, Write};
use std::process;

use anyhow::{anyhow, Context};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use progress::CliReporter;
use prover_core::storage::models::{Finding, RunSummary};
use prover_core::{AppConfig, FileUpload, ProverService};
use serde::Serialize;
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match prover_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    if let Err(err) = run(&args, &config) {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn run(args: &Cli, config: &AppConfig) -> anyhow::Result<()> {
    let command = match &args.command {
        Some(command) => command,
        None => {
            Cli::command().print_long_help()?;
            return Ok(());
        }
    };

    match command {
        Commands::PrintConfig => {
            println!("Configuration: {:?}", config);
            return Ok(());
        }
        Commands::TruncateDb => {
            if prompt_confirm(
                "Are you SURE you want to COMPLETELY DELETE the Database?",
                Some(false),
            )? {
                let db = prover_core::storage::Database::open(&config.db_path)?;
                db.truncate_all()?;
                println!("All tables truncated");
            }
            return Ok(());
        }
        _ => {}
    }

    let owner = args
        .owner
        .as_deref()
        .ok_or_else(|| anyhow!("--owner (or PROVER_OWNER) is required"))?;
    let service = ProverService::open(config).context("opening the store")?;

    match command {
        Commands::Mkdir {
            name,
            description,
            parent,
        } => {
            let id = service.create_directory(owner, name, description.as_deref(), *parent)?;
            println!("{}", id);
        }
        Commands::Upload {
            path,
            description,
            parent,
        } => {
            let bytes =
                fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| anyhow!("{} has no file name", path.display()))?;
            let id = service.create_file(&FileUpload {
                owner,
                name: &name,
                bytes: &bytes,
                description: description.as_deref(),
                parent_id: *parent,
            })?;
            println!("{}", id);
        }
        Commands::Ls { dir } => {
            let listing = service.list_children(*dir, owner)?;
            if args.json {
                print_json(&listing)?;
            } else {
                for d in &listing.directories {
                    println!("{:>6}  {}/", d.id, d.name.blue().bold());
                }
                for f in &listing.files {
                    println!("{:>6}  {}", f.id, f.name);
                }
            }
        }
        Commands::Rmdir { dir } => {
            let stats = service.delete_directory(*dir, owner)?;
            info!(
                "Deleted {} directories and {} files",
                stats.directories, stats.files
            );
        }
        Commands::Rm { file } => {
            service.delete_file(*file, owner)?;
            info!("Deleted file {}", file);
        }
        Commands::Purge { file } => {
            if prompt_confirm(
                &format!("Permanently remove file {} and its history?", file),
                Some(false),
            )? {
                service.purge_file(*file, owner)?;
                info!("Purged file {}", file);
            }
        }
        Commands::Cat { file } => {
            print!("{}", service.file_content(*file, owner)?);
        }
        Commands::Prove { file } => {
            let reporter = CliReporter::new();
            let outcome = service.run_verification(*file, owner, &reporter)?;
            info!(
                "Run #{}: {} findings in {}",
                outcome.generation,
                format!("{}", outcome.findings).cyan(),
                format!("{:.2}s", outcome.tool_duration.as_secs_f64()).green(),
            );
            let findings = service.current_findings(*file, owner)?;
            print_findings(&findings, args.json)?;
        }
        Commands::Findings { file, all } => {
            let findings = if *all {
                service.finding_history(*file, owner)?
            } else {
                service.current_findings(*file, owner)?
            };
            print_findings(&findings, args.json)?;
        }
        Commands::Summary { file } => match service.current_summary(*file, owner)? {
            Some(summary) if args.json => print_json(&summary)?,
            Some(summary) => print!("{}", summary.data),
            None => println!("No current run for file {}", file),
        },
        Commands::History { file } => {
            let history = service.verification_history(*file, owner)?;
            if args.json {
                print_json(&history)?;
            } else {
                for summary in &history {
                    print_history_line(summary);
                }
            }
        }
        Commands::PrintConfig | Commands::TruncateDb => {}
    }

    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_findings(findings: &[Finding], json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(findings);
    }
    for finding in findings {
        let stale = if finding.validity_flag { "" } else { " (superseded)" };
        println!(
            "#{} {} [{}]{}",
            finding.generation,
            finding.category.bold(),
            colored_status(&finding.status),
            stale.dimmed(),
        );
    }
    Ok(())
}

fn print_history_line(summary: &RunSummary) {
    let marker = if summary.validity_flag {
        "current".green()
    } else {
        "superseded".dimmed()
    };
    println!(
        "#{:<4} {}  {}  {} bytes",
        summary.generation,
        summary.created_at,
        marker,
        summary.data.len()
    );
}

fn colored_status(status: &str) -> ColoredString {
    match status.to_lowercase().as_str() {
        "valid" | "proved" => status.green(),
        "unknown" | "timeout" | "unchecked" => status.yellow(),
        "invalid" | "failed" | "counterexample" => status.red(),
        _ => status.normal(),
    }
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
