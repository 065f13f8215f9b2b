//! Impulse CLI - Command-line interface for Impulse Sense
//!
//! Commands:
//! - simulate: Replay an interaction event stream through the engine
//! - levels: Print the intervention level threshold table
//! - doctor: Diagnose engine health and configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use impulse_sense::engine::ImpulseEngine;
use impulse_sense::history::VIEW_WINDOW_SIZE;
use impulse_sense::types::{HistorySample, InteractionEvent, InteractionKind, InterventionLevel};
use impulse_sense::{EngineError, ENGINE_VERSION, PRODUCER_NAME};

/// Impulse Sense - Impulse scoring and intervention engine
#[derive(Parser)]
#[command(name = "impulse")]
#[command(author = "ImpulseSense")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Score shopping interaction signals and derive intervention levels", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an interaction event stream through the engine
    Simulate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Seed for the scoring noise source (omit for OS entropy)
        #[arg(long)]
        seed: Option<u64>,

        /// Viewing window size in samples
        #[arg(long, default_value_t = VIEW_WINDOW_SIZE)]
        window: usize,

        /// Viewing window offset back from the live edge
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Treat the catalog view as active during ticks
        #[arg(long, default_value = "true")]
        shopping: bool,
    },

    /// Print the intervention level threshold table
    Levels {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose engine health and configuration
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one event per line)
    Ndjson,
    /// JSON array of events
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one history sample per line)
    Ndjson,
    /// JSON object with samples and a final state summary
    Json,
    /// Pretty-printed JSON object
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), ImpulseCliError> {
    match cli.command {
        Commands::Simulate {
            input,
            input_format,
            output_format,
            seed,
            window,
            offset,
            shopping,
        } => cmd_simulate(
            &input,
            input_format,
            output_format,
            seed,
            window,
            offset,
            shopping,
        ),

        Commands::Levels { json } => cmd_levels(json),

        Commands::Doctor { json } => cmd_doctor(json),
    }
}

fn cmd_simulate(
    input: &PathBuf,
    input_format: InputFormat,
    output_format: OutputFormat,
    seed: Option<u64>,
    window: usize,
    offset: usize,
    shopping: bool,
) -> Result<(), ImpulseCliError> {
    // Read input
    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    // Parse events
    let events = match input_format {
        InputFormat::Ndjson => InteractionEvent::parse_ndjson(&input_data)?,
        InputFormat::Json => InteractionEvent::parse_array(&input_data)?,
    };

    if events.is_empty() {
        return Err(ImpulseCliError::NoEvents);
    }

    let mut engine = match seed {
        Some(seed) => ImpulseEngine::with_seed(seed),
        None => ImpulseEngine::new(),
    };

    engine.start_session(events[0].timestamp);
    engine.set_shopping(shopping);

    // Drive the engine: 1 Hz ticks fill the gap up to each event's
    // timestamp, then the event itself applies.
    let mut clock = events[0].timestamp;
    for event in &events {
        while clock + chrono::Duration::seconds(1) <= event.timestamp {
            clock += chrono::Duration::seconds(1);
            engine.tick(clock)?;
        }

        match event.kind {
            InteractionKind::ProductView => match &event.product {
                Some(product) => {
                    engine.notify_product_viewed(product.clone(), event.timestamp)?
                }
                None => engine.apply_event(InteractionKind::ProductView, event.timestamp)?,
            },
            kind => engine.apply_event(kind, event.timestamp)?,
        }
    }

    engine.stop_session();

    // Write output
    let samples = engine.history_window(offset, window);
    match output_format {
        OutputFormat::Ndjson => {
            for sample in &samples {
                println!("{}", serde_json::to_string(sample)?);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(&summary(&engine, &samples))?);
        }
        OutputFormat::JsonPretty => {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary(&engine, &samples))?
            );
        }
    }

    Ok(())
}

fn summary(engine: &ImpulseEngine, samples: &[HistorySample]) -> SimulationReport {
    SimulationReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        state: engine.state(),
        samples: samples.to_vec(),
        intervention_events: engine.intervention_events().to_vec(),
    }
}

fn cmd_levels(json: bool) -> Result<(), ImpulseCliError> {
    let rows = [
        (InterventionLevel::SafeMode, 0.85, "full lock, emergency unlock only (-0.5)"),
        (InterventionLevel::MicroLock, 0.70, "typed confirmation unlock (-0.2)"),
        (InterventionLevel::Breathing, 0.60, "guided breathing routine (-0.15)"),
        (InterventionLevel::Grayscale, 0.40, "visual degradation"),
        (InterventionLevel::Reflection, 0.20, "transient 5s notice"),
        (InterventionLevel::Normal, 0.0, "no gating"),
    ];

    if json {
        let table: Vec<LevelRow> = rows
            .iter()
            .map(|(level, min_score, gating)| LevelRow {
                level: *level,
                min_score: *min_score,
                gating: gating.to_string(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&table)?);
    } else {
        println!("Intervention Levels");
        println!("===================");
        println!();
        println!("Scores classify by closed lower bound, highest level first:");
        println!();
        for (level, min_score, gating) in rows {
            println!("  {:>10}  score >= {:.2}  {}", level.as_str(), min_score, gating);
        }
        println!();
        println!("Score is frozen by the automatic tick at breathing and above;");
        println!("only intervention acknowledgments reduce it from there.");
    }

    Ok(())
}

fn cmd_doctor(json: bool) -> Result<(), ImpulseCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Impulse Sense version {}", ENGINE_VERSION),
    });

    // A fresh engine must classify its initial score as normal.
    let engine = ImpulseEngine::with_seed(0);
    let state = engine.state();
    let classify_check = if state.level == InterventionLevel::from_score(state.score) {
        DoctorCheck {
            name: "classifier".to_string(),
            status: CheckStatus::Ok,
            message: format!(
                "initial score {:.2} classifies as {}",
                state.score,
                state.level.as_str()
            ),
        }
    } else {
        DoctorCheck {
            name: "classifier".to_string(),
            status: CheckStatus::Error,
            message: "initial state violates level == classify(score)".to_string(),
        }
    };
    checks.push(classify_check);

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (event replay ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Impulse Doctor Report");
        println!("=====================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(ImpulseCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum ImpulseCliError {
    Io(io::Error),
    Json(serde_json::Error),
    Engine(EngineError),
    NoEvents,
    DoctorFailed,
}

impl From<io::Error> for ImpulseCliError {
    fn from(e: io::Error) -> Self {
        ImpulseCliError::Io(e)
    }
}

impl From<serde_json::Error> for ImpulseCliError {
    fn from(e: serde_json::Error) -> Self {
        ImpulseCliError::Json(e)
    }
}

impl From<EngineError> for ImpulseCliError {
    fn from(e: EngineError) -> Self {
        ImpulseCliError::Engine(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ImpulseCliError> for CliError {
    fn from(e: ImpulseCliError) -> Self {
        match e {
            ImpulseCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ImpulseCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            ImpulseCliError::Engine(e) => match e {
                EngineError::NotRunning => CliError {
                    code: "ENGINE_ERROR".to_string(),
                    message: e.to_string(),
                    hint: Some("The session stopped before the stream ended".to_string()),
                },
                EngineError::JsonError(e) => CliError {
                    code: "JSON_ERROR".to_string(),
                    message: e.to_string(),
                    hint: Some("Check JSON syntax".to_string()),
                },
                EngineError::ParseError(msg) => CliError {
                    code: "PARSE_ERROR".to_string(),
                    message: format!("Failed to parse interaction event: {}", msg),
                    hint: Some("Ensure input is one interaction event per line".to_string()),
                },
            },
            ImpulseCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            ImpulseCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct SimulationReport {
    producer: String,
    version: String,
    state: impulse_sense::ImpulseState,
    samples: Vec<HistorySample>,
    intervention_events: Vec<impulse_sense::InterventionEvent>,
}

#[derive(serde::Serialize)]
struct LevelRow {
    level: InterventionLevel,
    min_score: f64,
    gating: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_error_codes_cover_every_variant() {
        let cases = [
            (
                ImpulseCliError::Engine(EngineError::ParseError("line 2: bad".to_string())),
                "PARSE_ERROR",
            ),
            (
                ImpulseCliError::Engine(EngineError::NotRunning),
                "ENGINE_ERROR",
            ),
            (ImpulseCliError::NoEvents, "NO_EVENTS"),
            (ImpulseCliError::DoctorFailed, "DOCTOR_FAILED"),
        ];
        for (error, code) in cases {
            assert_eq!(CliError::from(error).code, code);
        }
    }

    #[test]
    fn parse_failures_surface_through_the_engine_error() {
        let err = InteractionEvent::parse_ndjson("not json\n").unwrap_err();
        let cli: CliError = ImpulseCliError::from(err).into();
        assert_eq!(cli.code, "PARSE_ERROR");
        assert!(cli.message.contains("line 1"), "{}", cli.message);
    }
}
