use std::path::Path;

use colored::Colorize;
use tracing_subscriber::EnvFilter;

use pulse_breath_monitor::config::{load_config, save_config, Config};
use pulse_breath_monitor::error::Result;
use pulse_breath_monitor::local::{ReplaySource, SimulatedSource, SimulationParams};
use pulse_breath_monitor::processing::effort::EffortState;
use pulse_breath_monitor::processing::history::RateHistory;
use pulse_breath_monitor::processing::session::{FinalReport, Finalization, FrameUpdate};
use pulse_breath_monitor::processing::worker::{FrameSource, MeasurementWorker, WorkerEvent};
use pulse_breath_monitor::utils::log::{log_rate_history, log_to_file};

const USAGE: &str = "usage:
  pulse-monitor replay <file.csv> [--config <file.yaml>]
  pulse-monitor simulate [bpm] [--breath <rpm>] [--realtime] [--config <file.yaml>]
  pulse-monitor init-config <file.yaml>";

const HISTORY_CSV: &str = "rate_history.csv";
const SUMMARY_LOG: &str = "measurements.log";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pulse_breath_monitor=info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(&args) {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> Result<()> {
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };
    let rest = &args[1..];

    match command.as_str() {
        "replay" => {
            let Some(path) = positional(rest) else {
                println!("{}", USAGE);
                return Ok(());
            };
            let config = config_from_args(rest)?;
            measure(ReplaySource::new(path), config)
        }
        "simulate" => {
            let config = config_from_args(rest)?;
            let mut params = SimulationParams {
                fps: config.processor.fps,
                duration_secs: Some(config.measurement.duration_secs + 1.0),
                realtime: rest.iter().any(|a| a == "--realtime"),
                ..SimulationParams::default()
            };
            if let Some(bpm) = positional(rest).and_then(|v| v.parse().ok()) {
                params.pulse_bpm = bpm;
            }
            if let Some(rpm) = flag_value(rest, "--breath").and_then(|v| v.parse().ok()) {
                params.breath_rpm = Some(rpm);
            }
            measure(SimulatedSource::new(params), config)
        }
        "init-config" => {
            let Some(path) = positional(rest) else {
                println!("{}", USAGE);
                return Ok(());
            };
            save_config(&Config::default(), path)?;
            println!("Wrote default configuration to {}", path.green());
            Ok(())
        }
        _ => {
            println!("Invalid command '{}'\n{}", command, USAGE);
            Ok(())
        }
    }
}

// ARGUMENTS -------------------------------------------------------------------

/// First argument that is neither a flag nor a flag's value.
fn positional(args: &[String]) -> Option<&str> {
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        match arg.as_str() {
            "--config" | "--breath" => skip_next = true,
            a if a.starts_with("--") => {}
            a => return Some(a),
        }
    }
    None
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn config_from_args(args: &[String]) -> Result<Config> {
    match flag_value(args, "--config") {
        Some(path) => load_config(Path::new(path)),
        None => Ok(Config::default()),
    }
}

// MEASUREMENT -----------------------------------------------------------------

fn measure<S: FrameSource + 'static>(source: S, config: Config) -> Result<()> {
    let debug_logging = config.processor.enable_debug_logging;
    let (worker, events) = MeasurementWorker::spawn(source, config)?;

    println!("{}", "Measuring, keep still...".cyan());
    let mut last_effort = None;
    for event in events.iter() {
        match event {
            WorkerEvent::Update(update) => {
                print_update(&update);
                if update.effort.is_some() && update.effort != last_effort {
                    if let Some(effort) = update.effort {
                        println!("          {}", effort.advice().italic());
                    }
                    last_effort = update.effort;
                }
            }
            WorkerEvent::Finished(report) => {
                print_report(&report);
                if debug_logging {
                    log_to_file(SUMMARY_LOG, &report.summary_line())?;
                    export_history(&report.history)?;
                }
            }
            WorkerEvent::Stopped { history } => {
                println!(
                    "{} after {} estimates, no final value",
                    "Measurement stopped".yellow(),
                    history.len()
                );
                if debug_logging {
                    export_history(&history)?;
                }
            }
        }
    }

    let state = worker.join()?;
    tracing::debug!(?state, "worker finished");
    Ok(())
}

fn export_history(history: &RateHistory) -> Result<()> {
    let path = log_rate_history(HISTORY_CSV, history)?;
    println!("Rate history written to {}", path.display());
    Ok(())
}

fn effort_colored(effort: EffortState) -> colored::ColoredString {
    match effort {
        EffortState::Relaxed => effort.label().green(),
        EffortState::Moderate => effort.label().yellow(),
        EffortState::High => effort.label().red(),
    }
}

fn print_update(update: &FrameUpdate) {
    if !update.face_detected {
        println!("{:>6.1}s  {}", update.elapsed_secs, "no face".dimmed());
        return;
    }
    let Some(pulse) = update.pulse else {
        return;
    };

    let mut line = format!("{:>6.1}s  pulse {:>5.1} BPM", update.elapsed_secs, pulse);
    if let Some(breath) = update.breath {
        line.push_str(&format!("  breath {:>4.1} RPM", breath));
    }
    match update.effort {
        Some(effort) => println!("{}  [{}]", line, effort_colored(effort)),
        None => println!("{}", line),
    }
}

fn print_report(report: &FinalReport) {
    let reason = match report.reason {
        Finalization::Stable => "stable reading".green(),
        Finalization::Timeout => "time limit reached".yellow(),
    };
    println!();
    println!("{} ({})", "Measurement complete".bold(), reason);
    println!("  Pulse:       {:.1} BPM", report.pulse);
    match report.breath {
        Some(breath) => println!("  Respiration: {:.1} RPM", breath),
        None => println!("  Respiration: {}", "not measured".dimmed()),
    }
    println!("  Duration:    {:.1} s", report.elapsed_secs);
    println!("  Estimates:   {}", report.history.len());
}
