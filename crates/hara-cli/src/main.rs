mod workbook;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use hara_core::asil::{AsilLevel, DETERMINATION_TABLE, determine};
use hara_core::config::HaraConfig;
use hara_core::diagnostics::RatingDiagnostics;
use hara_core::event::{EventKind, LogLevel};
use hara_core::pipeline::{Pipeline, SheetSelection};
use hara_core::result::{RESULT_COLUMNS, ResultTable};
use hara_core::similarity::Algorithm;
use hara_core::telemetry::{TelemetryConfig, init_telemetry};
use hara_runner::event_bus::EventBus;
use hara_runner::worker::PipelineWorker;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::error::RecvError;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("HARA_GIT_COMMIT"),
    ", built ",
    env!("HARA_BUILD_TIME"),
    ")"
);

#[derive(Parser)]
#[command(
    name = "hara",
    version = VERSION,
    about = "Match operating scenarios to a risk assessment and determine ASIL grades"
)]
struct Cli {
    /// Path to hara.toml configuration.
    #[arg(long, default_value = "hara.toml", global = true)]
    config: PathBuf,

    /// Directory for JSONL run logs.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Output JSON-structured logs to console.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the matching pipeline on a workbook.
    Run {
        /// Workbook (.xlsx, .xls, .ods or .json).
        file: PathBuf,
        /// Operating Scenario sheet.
        #[arg(long, short = 's')]
        scenarios: String,
        /// Risk Assessment sheet.
        #[arg(long, short = 'r')]
        risk_assessment: String,
        /// Add the result sheet to the source workbook.
        #[arg(long, conflicts_with = "output")]
        save: bool,
        /// Export the result sheet to a new workbook.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Print the result table as JSON instead of text.
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        matching: MatchingArgs,
    },
    /// List the sheets that can be selected as input.
    Sheets {
        file: PathBuf,
        /// Include HAZOP sheets.
        #[arg(long)]
        all: bool,
    },
    /// Check S and C values in a Risk Assessment sheet.
    Diagnose {
        file: PathBuf,
        /// Risk Assessment sheet.
        #[arg(long, short = 'r')]
        risk_assessment: String,
    },
    /// Print the ASIL determination table.
    Table,
    /// Determine a single ASIL grade.
    Determine {
        #[arg(short = 'e', long)]
        exposure: i64,
        #[arg(short = 's', long)]
        severity: i64,
        #[arg(short = 'c', long)]
        controllability: i64,
    },
    /// Print the effective configuration as TOML.
    Config,
}

/// Command-line overrides for `[matching]`.
#[derive(clap::Args, Default)]
struct MatchingArgs {
    /// Exact matching only.
    #[arg(long)]
    no_fuzzy: bool,
    /// Minimum fuzzy score (0-100).
    #[arg(long)]
    threshold: Option<u8>,
    /// Similarity algorithm: ratio, partial, token_sort, token_set.
    #[arg(long)]
    algorithm: Option<Algorithm>,
    #[arg(long)]
    case_sensitive: bool,
    /// Compare text without collapsing whitespace.
    #[arg(long)]
    keep_whitespace: bool,
    /// Weight of the scenario score (e.g. 0.7).
    #[arg(long)]
    os_weight: Option<f64>,
    /// Weight of the hazard score (e.g. 0.3).
    #[arg(long)]
    hazard_weight: Option<f64>,
}

impl MatchingArgs {
    fn apply(&self, config: &mut HaraConfig) {
        let m = &mut config.matching;
        if self.no_fuzzy {
            m.fuzzy_enabled = false;
        }
        if let Some(threshold) = self.threshold {
            m.fuzzy_threshold = threshold;
        }
        if let Some(algorithm) = self.algorithm {
            m.fuzzy_algorithm = algorithm;
        }
        if self.case_sensitive {
            m.case_sensitive = true;
        }
        if self.keep_whitespace {
            m.strip_whitespace = false;
        }
        if let Some(w) = self.os_weight {
            m.os_weight = w;
        }
        if let Some(w) = self.hazard_weight {
            m.hazard_weight = w;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let telemetry_config = TelemetryConfig {
        json_logs: cli.json_logs,
        log_dir: cli.log_dir.clone(),
        ..TelemetryConfig::default()
    };
    let telemetry = init_telemetry(&telemetry_config)?;
    if let Some(path) = telemetry.log_file() {
        tracing::debug!(path = %path.display(), "run log enabled");
    }

    match cli.command {
        Commands::Run {
            file,
            scenarios,
            risk_assessment,
            save,
            output,
            json,
            matching,
        } => {
            let mut config = HaraConfig::load(&cli.config)?;
            matching.apply(&mut config);
            let opts = RunOptions {
                selection: SheetSelection::new(scenarios, risk_assessment),
                save,
                output,
                json,
            };
            cmd_run(&file, config, opts).await
        }
        Commands::Sheets { file, all } => cmd_sheets(&file, all),
        Commands::Diagnose {
            file,
            risk_assessment,
        } => cmd_diagnose(&file, &risk_assessment),
        Commands::Table => cmd_table(),
        Commands::Determine {
            exposure,
            severity,
            controllability,
        } => cmd_determine(exposure, severity, controllability),
        Commands::Config => {
            let config = HaraConfig::load(&cli.config)?;
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

// ─── run ───────────────────────────────────────────────────────────────

struct RunOptions {
    selection: SheetSelection,
    save: bool,
    output: Option<PathBuf>,
    json: bool,
}

async fn cmd_run(file: &Path, config: HaraConfig, opts: RunOptions) -> Result<()> {
    let pipeline = Pipeline::new(config.matching.clone())?;
    let source = workbook::read_workbook(file)?;
    if config.matching.fuzzy_enabled {
        tracing::info!(
            algorithm = %config.matching.fuzzy_algorithm,
            threshold = config.matching.fuzzy_threshold,
            "fuzzy matching enabled"
        );
    } else {
        tracing::info!("fuzzy matching disabled, exact matches only");
    }

    let worker = PipelineWorker::new(EventBus::new());
    let renderer = tokio::spawn(render_events(worker.bus().subscribe()));

    // The run owns its own copy of the workbook.
    let handle = worker.spawn(pipeline, source.clone(), opts.selection.clone())?;
    let outcome = handle.wait().await;
    if let Err(e) = renderer.await {
        tracing::warn!(error = %e, "progress renderer stopped");
    }
    let table = outcome.context("processing failed")?;

    let sheet_name = config.output.result_sheet.as_str();
    if opts.save {
        workbook::save_into_source(file, source, &table, sheet_name)?;
        eprintln!("Saved sheet '{sheet_name}' to {}", file.display());
    } else if let Some(ref output) = opts.output {
        workbook::export(output, &table, sheet_name)?;
        eprintln!("Exported results to {}", output.display());
    }

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&table)?);
    } else if !opts.save && opts.output.is_none() {
        print_table(&table);
    }
    print_summary(&table);
    Ok(())
}

/// Print progress and log events to stderr until the run ends.
async fn render_events(mut rx: tokio::sync::broadcast::Receiver<hara_core::event::PipelineEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                let ts = event.timestamp.format("%H:%M:%S");
                match event.kind {
                    EventKind::Progress { stage, percent } => {
                        eprintln!("{ts} [{percent:>3}%] {stage}");
                    }
                    EventKind::Log { level, message } => match level {
                        LogLevel::Info => eprintln!("{ts}        {message}"),
                        LogLevel::Warn => eprintln!("{ts}        WARNING: {message}"),
                        LogLevel::Error => eprintln!("{ts}        ERROR: {message}"),
                    },
                    EventKind::Completed { rows } => {
                        eprintln!("{ts} done: {rows} rows");
                        break;
                    }
                    EventKind::Failed { message } => {
                        eprintln!("{ts} failed: {message}");
                        break;
                    }
                }
            }
            Err(RecvError::Lagged(n)) => {
                tracing::debug!(skipped = n, "progress renderer lagged, some events missed");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn print_table(table: &ResultTable) {
    println!("{}", RESULT_COLUMNS.join("\t"));
    for row in &table.rows {
        let cells: Vec<String> = row.to_cells().iter().map(ToString::to_string).collect();
        println!("{}", cells.join("\t"));
    }
}

fn print_summary(table: &ResultTable) {
    let s = &table.summary;
    eprintln!("\n=== Summary ===\n");
    eprintln!("  {:<22} {}", "Total scenarios", s.total);
    eprintln!("  {:<22} {}", "ASIL determined", s.with_asil);
    eprintln!("  {:<22} {}", "S values found", s.with_severity);
    eprintln!("  {:<22} {}", "C values found", s.with_controllability);
    eprintln!(
        "  {:<22} {} exact, {} fuzzy, {} unmatched",
        "Matches", s.matches.exact, s.matches.fuzzy, s.matches.unmatched
    );
    if !s.distribution.is_empty() {
        eprintln!("\nDistribution:");
        for (level, count) in s.distribution.iter() {
            eprintln!("  {:<8} {count}", level.long_name());
        }
    }
    if let Some(hint) = s.hint() {
        eprintln!("\nTroubleshooting: {hint}");
    }
}

// ─── inspection commands ───────────────────────────────────────────────

fn cmd_sheets(file: &Path, all: bool) -> Result<()> {
    let book = workbook::read_workbook(file)?;
    let names = if all {
        book.sheet_names()
    } else {
        book.selectable_sheet_names()
    };
    if names.len() < 2 {
        tracing::warn!(
            count = names.len(),
            "a run needs two different sheets (Operating Scenario and Risk Assessment)"
        );
    }
    for name in names {
        let rows = book.sheet(name).map(|s| s.row_count()).unwrap_or(0);
        println!("{name:<40} {rows} rows");
    }
    Ok(())
}

fn cmd_diagnose(file: &Path, sheet: &str) -> Result<()> {
    let book = workbook::read_workbook(file)?;
    let Some(ra) = book.sheet(sheet) else {
        bail!("sheet '{sheet}' not found in {}", file.display());
    };
    let diag = RatingDiagnostics::inspect(ra);
    print!("{diag}");
    if diag.is_clean() {
        println!("\nS and C columns look valid.");
    }
    Ok(())
}

fn cmd_table() -> Result<()> {
    println!("=== ASIL Determination Table ===\n");
    println!("{:<7} {:<4} {:<4} {:<4} {:<4}", "S,E", "C0", "C1", "C2", "C3");
    println!("{}", "-".repeat(27));
    for ((s, e), grades) in DETERMINATION_TABLE {
        let cells: Vec<String> = grades.iter().map(|g| format!("{:<4}", g.grade())).collect();
        println!("{:<7} {}", format!("S{s},E{e}"), cells.join(" "));
    }
    println!("\nS0 has no entry and yields no grade. E is clamped to 1..4.");
    Ok(())
}

fn cmd_determine(exposure: i64, severity: i64, controllability: i64) -> Result<()> {
    let rating = |v: i64| u8::try_from(v).ok().filter(|v| *v <= 3);
    let grade: Option<AsilLevel> = determine(exposure, rating(severity), rating(controllability));
    match grade {
        Some(level) => println!("{level}"),
        None => println!("-"),
    }
    Ok(())
}
