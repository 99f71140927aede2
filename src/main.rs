use anyhow::{bail, Context};
use serde_json::{Map, Value};
use std::sync::Arc;
use sysinfo::System;
use tokio::io::{AsyncBufReadExt, BufReader};

use stepper_state::config::StepperConfig;
use stepper_state::wizard::{FileStorage, NavigationArgs, NavigationOutcome, Stepper};
use stepper_state::{AppResult, StepperEvent};

const LOG_TARGET_STARTUP: &str = "stepper_state::startup";

/// Initialize tracing with file rotation
///
/// Logs are written to `<config dir>/stepper-state/logs/`, one file per day
/// (`stepper.YYYY-MM-DD.log`). Debug builds also log to stderr.
fn initialize_tracing() {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = dirs::config_dir()
        .map(|dir| dir.join("stepper-state").join("logs"))
        .unwrap_or_else(|| std::path::PathBuf::from("logs"));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    let file_appender = rolling::daily(&log_dir, "stepper.log");

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    // stdout belongs to the prompt
    #[cfg(debug_assertions)]
    {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(console_layer)
            .init();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();
    }

    tracing::info!("Log directory: {}", log_dir.display());
}

fn log_runtime_environment() {
    let version = env!("CARGO_PKG_VERSION");
    let os_name = System::long_os_version()
        .or_else(System::name)
        .unwrap_or_else(|| "Unknown OS".to_string());
    let kernel = System::kernel_version().unwrap_or_else(|| "Unknown Kernel".to_string());

    tracing::info!(target: LOG_TARGET_STARTUP, "Starting stepper v{} on ({})", version, std::env::consts::ARCH);
    tracing::info!(target: LOG_TARGET_STARTUP, "Operating System: {} (kernel {})", os_name, kernel);
}

#[derive(Debug, PartialEq)]
enum Command {
    Next,
    Prev,
    GoTo(usize),
    Set(String, Value),
    Status,
    Errors,
    Clear,
    Quit,
}

fn parse_command(line: &str) -> AppResult<Command> {
    let mut parts = line.trim().splitn(3, char::is_whitespace);
    let command = match (parts.next().unwrap_or(""), parts.next(), parts.next()) {
        ("next", None, _) => Command::Next,
        ("prev", None, _) => Command::Prev,
        ("goto", Some(n), None) => {
            Command::GoTo(n.parse().with_context(|| format!("Invalid step index: {n}"))?)
        }
        ("set", Some(key), Some(json)) => Command::Set(
            key.to_string(),
            serde_json::from_str(json).with_context(|| format!("Invalid JSON value: {json}"))?,
        ),
        ("status", None, _) => Command::Status,
        ("errors", None, _) => Command::Errors,
        ("clear", None, _) => Command::Clear,
        ("quit" | "exit", None, _) => Command::Quit,
        (other, _, _) => bail!("Unknown command: {other:?} (try next, prev, goto <n>, set <key> <json>, status, errors, clear, quit)"),
    };
    Ok(command)
}

fn print_status(stepper: &Stepper) {
    let state = stepper.snapshot();
    let current = stepper.current_step();

    for (index, step) in state.steps.iter().enumerate() {
        let marker = if index == current { ">" } else { " " };
        let completed = if step.is_completed { "x" } else { " " };
        let lock = if step.can_access { "" } else { " (locked)" };
        let optional = if step.is_optional { " (optional)" } else { "" };
        println!("{marker} [{completed}] {index}: {}{lock}{optional}", step.name());
    }

    let info = &state.general_info;
    println!(
        "progress {:.0}% | completed {:.0}% | accessible {:.0}%",
        info.current_progress * 100.0,
        info.completed_progress * 100.0,
        info.can_access_progress * 100.0
    );
    if !state.general_state.is_empty() {
        println!("data {}", Value::Object(state.general_state.clone()));
    }
}

fn print_outcome(outcome: &NavigationOutcome) {
    match outcome {
        NavigationOutcome::Moved { from, to } => println!("moved {from} -> {to}"),
        NavigationOutcome::Stayed { index } => println!("step {index} completed"),
        NavigationOutcome::Unchanged => println!("already there"),
        NavigationOutcome::Blocked(reason) => println!("blocked: {reason}"),
        NavigationOutcome::Failed { reason } => println!("failed: {reason}"),
        NavigationOutcome::Busy => println!("busy"),
    }
}

/// Completion callback: logs the step the wizard just committed
fn log_completion(label: &'static str) -> NavigationArgs {
    NavigationArgs::new().on_complete_step(move |state| async move {
        tracing::debug!(
            completed = state.completed_count(),
            total = state.total_steps(),
            "{} committed",
            label
        );
        Ok(())
    })
}

async fn run(stepper: Stepper) -> AppResult<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_status(&stepper);

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{e:#}");
                continue;
            }
        };

        match command {
            Command::Next => print_outcome(&stepper.on_next(log_completion("next")).await),
            Command::Prev => print_outcome(&stepper.on_prev(log_completion("prev")).await),
            Command::GoTo(target) => match stepper.go_to_step(target, log_completion("goto")).await {
                Ok(outcome) => print_outcome(&outcome),
                Err(e) => println!("{e}"),
            },
            Command::Set(key, value) => {
                let mut patch = Map::new();
                patch.insert(key, value);
                stepper.update_general_state(patch);
            }
            Command::Status => print_status(&stepper),
            Command::Errors => {
                for error in &stepper.snapshot().errors {
                    println!("step {}: {}", error.step_index, error.message);
                }
            }
            Command::Clear => stepper.clear_storage(),
            Command::Quit => break,
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> AppResult<()> {
    initialize_tracing();
    log_runtime_environment();

    let config_path = match std::env::args().nth(1) {
        Some(path) => path.into(),
        None => StepperConfig::default_path()?,
    };
    let setup = StepperConfig::load_or_create(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let storage = FileStorage::in_data_dir().context("Failed to locate storage directory")?;
    tracing::info!("State storage: {}", storage.dir().display());

    let stepper: Stepper = Stepper::builder().storage(Arc::new(storage)).build();
    let (failures, _subscription) = stepper
        .event_bus()
        .subscribe_filtered(|e| matches!(e, StepperEvent::PersistenceFailed { .. }));
    std::thread::spawn(move || {
        for event in failures {
            eprintln!("warning: {}", event.description());
        }
    });

    stepper.initialize(setup);
    run(stepper).await
}
