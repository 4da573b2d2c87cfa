//! `frontdesk worker` — reconciliation loop lifecycle and logs.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use frontdesk_worker::log_rotation::numbered_path;
use frontdesk_worker::paths::log_path;
use frontdesk_worker::{init_tracing, run_once, start_blocking};

use super::load_settings;

#[derive(Subcommand, Debug)]
pub enum WorkerCommand {
    /// Run the reconciliation loop in the foreground until interrupted.
    Start,
    /// Run a single reconciliation cycle and exit.
    Once(WorkerOnceArgs),
    /// Print recent worker log lines.
    Logs(WorkerLogsArgs),
}

#[derive(Args, Debug)]
pub struct WorkerOnceArgs {
    /// Emit the cycle report as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct WorkerLogsArgs {
    /// Number of trailing lines to show.
    #[arg(long, default_value_t = 100)]
    pub lines: usize,

    /// Also show the most recent rotated log.
    #[arg(long)]
    pub previous: bool,
}

pub fn run(command: WorkerCommand) -> Result<()> {
    let settings = load_settings()?;

    match command {
        WorkerCommand::Start => {
            start_blocking(&settings).context("worker exited with error")?;
        }
        WorkerCommand::Once(args) => {
            init_tracing(&settings.log_dir).context("failed to set up worker logging")?;
            let report = run_once(&settings).context("reconciliation cycle failed")?;
            if args.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report)
                        .context("failed to render cycle report JSON")?
                );
            } else if report.attempted() == 0 {
                println!("{} nothing to sync", "✓".green().bold());
            } else {
                let mark = if report.failure_count() == 0 {
                    "✓".green().bold()
                } else {
                    "!".yellow().bold()
                };
                println!("{mark} {report}");
            }
        }
        WorkerCommand::Logs(args) => {
            let live = log_path(&settings.log_dir);
            if args.previous {
                print_tail(&numbered_path(&live, 1), args.lines)
                    .context("failed to read rotated worker log")?;
            }
            print_tail(&live, args.lines).context("failed to read worker log")?;
        }
    }

    Ok(())
}

fn print_tail(path: &Path, lines: usize) -> Result<()> {
    if !path.exists() {
        println!("log file not found: {}", path.display());
        return Ok(());
    }

    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut tail = VecDeque::<String>::new();
    for line in reader.lines() {
        let line = line.with_context(|| format!("read {}", path.display()))?;
        if lines == 0 {
            continue;
        }
        if tail.len() == lines {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    println!("==> {} <==", path.display());
    for line in tail {
        println!("{line}");
    }
    Ok(())
}
