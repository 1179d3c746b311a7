//! Cadence CLI
//!
//! Operator tooling over the SQLite schedule store: record reviews, inspect
//! due queues and learner statistics, and manage the database.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cadence_core::{
    Engine, HistoryRetention, Quality, ReviewObservation, ScheduleRecord, SchedulerConfig,
    SqliteStore,
};

/// File name of the database inside `--data-dir`
const DB_FILE_NAME: &str = "cadence.db";

/// Cadence - SM-2 spaced-repetition scheduler
#[derive(Parser)]
#[command(name = "cadence")]
#[command(author = "Cadence Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Spaced-repetition scheduling from the command line")]
struct Cli {
    /// Directory holding cadence.db (defaults to the platform data directory)
    #[arg(long, global = true, env = "CADENCE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Keep only the most recent N observations per record
    #[arg(long, global = true, env = "CADENCE_HISTORY_LIMIT")]
    history_limit: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a review observation
    Review {
        user: String,
        concept: String,
        /// Recall quality 0-5 (out-of-range values are clamped)
        #[arg(allow_hyphen_values = true)]
        quality: String,
        /// Time taken to answer, in milliseconds
        #[arg(long)]
        response_ms: Option<u64>,
        /// Print the updated record as JSON
        #[arg(long)]
        json: bool,
    },

    /// List concepts due for review, most overdue first
    Due {
        user: String,
        /// Show at most N concepts
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },

    /// Show a learner's schedule statistics
    Stats {
        user: String,
        #[arg(long)]
        json: bool,
    },

    /// Show one schedule record and what each quality would do next
    Show {
        user: String,
        concept: String,
        #[arg(long)]
        json: bool,
    },

    /// Print the performance history of one record
    History { user: String, concept: String },

    /// Open the database, apply pending migrations and report the schema version
    Migrate,

    /// Write a consistent copy of the database
    Backup {
        /// Output file path
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout is reserved for command output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let store = open_store(cli.data_dir.as_ref())?;

    match cli.command {
        Commands::Review {
            user,
            concept,
            quality,
            response_ms,
            json,
        } => {
            let engine = build_engine(store, cli.history_limit)?;
            run_review(&engine, &user, &concept, &quality, response_ms, json)
        }
        Commands::Due { user, limit, json } => {
            run_due(&build_engine(store, cli.history_limit)?, &user, limit, json)
        }
        Commands::Stats { user, json } => {
            run_stats(&build_engine(store, cli.history_limit)?, &user, json)
        }
        Commands::Show {
            user,
            concept,
            json,
        } => run_show(&build_engine(store, cli.history_limit)?, &user, &concept, json),
        Commands::History { user, concept } => {
            run_history(&build_engine(store, cli.history_limit)?, &user, &concept)
        }
        Commands::Migrate => run_migrate(&store),
        Commands::Backup { output } => run_backup(&store, output),
    }
}

/// Open the store under `data_dir`, or at the platform default
fn open_store(data_dir: Option<&PathBuf>) -> anyhow::Result<Arc<SqliteStore>> {
    let path = data_dir.map(|dir| dir.join(DB_FILE_NAME));
    tracing::debug!(path = ?path, "Opening schedule store");
    Ok(Arc::new(SqliteStore::open(path)?))
}

fn scheduler_config(history_limit: Option<usize>) -> SchedulerConfig {
    SchedulerConfig {
        history_retention: match history_limit {
            Some(count) => HistoryRetention::KeepLast { count },
            None => HistoryRetention::Unbounded,
        },
        ..Default::default()
    }
}

fn build_engine(
    store: Arc<SqliteStore>,
    history_limit: Option<usize>,
) -> anyhow::Result<Engine<SqliteStore>> {
    Ok(Engine::with_config(store, scheduler_config(history_limit))?)
}

/// Parse the quality argument and record the review
fn run_review(
    engine: &Engine<SqliteStore>,
    user: &str,
    concept: &str,
    quality: &str,
    response_ms: Option<u64>,
    json: bool,
) -> anyhow::Result<()> {
    let quality: Quality = quality.parse()?;
    let mut observation = ReviewObservation::new(quality);
    if let Some(ms) = response_ms {
        observation = observation.with_response_time_ms(ms);
    }

    let record = engine.record_review(user, concept, observation)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    let verdict = if is_lapse(engine, quality) {
        "lapsed".red().bold()
    } else {
        "recalled".green().bold()
    };
    println!(
        "{} {}/{} with quality {}",
        verdict,
        user,
        concept.bold(),
        quality
    );
    print_record(&record, Utc::now());
    Ok(())
}

fn run_due(
    engine: &Engine<SqliteStore>,
    user: &str,
    limit: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let due = match limit {
        Some(limit) => engine.get_due_limited(user, now, limit)?,
        None => engine.get_due(user, now)?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&due)?);
        return Ok(());
    }

    println!("{}", format!("=== Due for {} ===", user).cyan().bold());
    println!();

    if due.is_empty() {
        println!("{}", "Nothing due. Come back later.".dimmed());
        return Ok(());
    }

    for record in &due {
        println!(
            "  {:<32} {} {:>4}d  EF {:.2}",
            record.concept_id.white().bold(),
            format_overdue(record.next_review, now).yellow(),
            record.interval,
            record.ease_factor
        );
    }
    println!();
    println!("{} {}", "Total due:".white().bold(), due.len());
    Ok(())
}

fn run_stats(engine: &Engine<SqliteStore>, user: &str, json: bool) -> anyhow::Result<()> {
    let stats = engine.get_stats(user, Utc::now())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{}", format!("=== Schedule Statistics: {} ===", user).cyan().bold());
    println!();
    println!("{}: {}", "Total Concepts".white().bold(), stats.total_concepts);
    println!("{}: {}", "Due Now".white().bold(), stats.due_now);
    println!(
        "{}: {}",
        "Mastered".white().bold(),
        stats.mastered_concepts
    );
    println!(
        "{}: {:.1}%",
        "Retention Rate".white().bold(),
        stats.retention_rate
    );
    println!(
        "{}: {:.1} days",
        "Average Interval".white().bold(),
        stats.average_interval
    );

    if stats.total_concepts > 0 {
        println!();
        println!("{}", "=== Mastery ===".yellow().bold());
        print_distribution_bar("Mastered", stats.mastered_concepts, stats.total_concepts, "green");
        print_distribution_bar(
            "Learning",
            stats.total_concepts - stats.mastered_concepts,
            stats.total_concepts,
            "yellow",
        );
        print_distribution_bar("Due", stats.due_now, stats.total_concepts, "red");
    }

    Ok(())
}

fn run_show(
    engine: &Engine<SqliteStore>,
    user: &str,
    concept: &str,
    json: bool,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let record = engine.get_record(user, concept)?;
    let preview = engine.preview_at(user, concept, now)?;

    if json {
        let output = serde_json::json!({
            "record": record,
            "preview": preview,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", format!("=== {}/{} ===", user, concept).cyan().bold());
    println!();
    match &record {
        Some(record) => print_record(record, now),
        None => println!("{}", "Not reviewed yet.".dimmed()),
    }

    println!();
    println!("{}", "=== Next Review By Quality ===".yellow().bold());
    for option in &preview {
        let label = if is_lapse(engine, option.quality) {
            option.quality.to_string().red()
        } else {
            option.quality.to_string().green()
        };
        println!(
            "  q{}  {:>5}d  reps {:<3} EF {:.2}  {}",
            label,
            option.interval,
            option.repetitions,
            option.ease_factor,
            option.next_review.format("%Y-%m-%d %H:%M").to_string().dimmed()
        );
    }
    Ok(())
}

fn run_history(engine: &Engine<SqliteStore>, user: &str, concept: &str) -> anyhow::Result<()> {
    let Some(record) = engine.get_record(user, concept)? else {
        println!("{}", "No history recorded.".dimmed());
        return Ok(());
    };

    println!(
        "{}",
        format!("=== History {}/{} ===", user, concept).cyan().bold()
    );
    println!();
    for (i, entry) in record.performance_history.iter().enumerate() {
        let quality = if is_lapse(engine, entry.quality) {
            entry.quality.to_string().red().bold()
        } else {
            entry.quality.to_string().green().bold()
        };
        let response = entry
            .response_time_ms
            .map(|ms| format!("{} ms", ms))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:>3}. {}  q{}  {}",
            i + 1,
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            quality,
            response.dimmed()
        );
    }
    println!();
    println!(
        "{} {}",
        "Observations:".white().bold(),
        record.performance_history.len()
    );
    Ok(())
}

fn run_migrate(store: &SqliteStore) -> anyhow::Result<()> {
    println!("{}", "=== Cadence Migrate ===".cyan().bold());
    println!();
    println!("  {} {}", "Database:".dimmed(), store.path().display());
    println!(
        "  {} {}",
        "Schema version:".dimmed(),
        store.schema_version()?
    );
    println!("  {} {}", "Records:".dimmed(), store.count()?);
    println!();
    println!("{}", "Schema is up to date.".green().bold());
    Ok(())
}

fn run_backup(store: &SqliteStore, output: PathBuf) -> anyhow::Result<()> {
    println!("{}", "=== Cadence Backup ===".cyan().bold());
    println!();

    if output.exists() {
        anyhow::bail!("Refusing to overwrite existing file: {}", output.display());
    }
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    println!("  {} {}", "From:".dimmed(), store.path().display());
    println!("  {}   {}", "To:".dimmed(), output.display());

    store.backup_to(&output)?;

    let size = std::fs::metadata(&output)?.len();
    println!();
    println!(
        "{} ({:.1} KB)",
        "Backup complete.".green().bold(),
        size as f64 / 1024.0
    );
    Ok(())
}

/// Lapse under the engine's configured success threshold
fn is_lapse(engine: &Engine<SqliteStore>, quality: Quality) -> bool {
    !quality.is_success(engine.scheduler().config().success_threshold)
}

fn print_record(record: &ScheduleRecord, now: DateTime<Utc>) {
    println!("  {} {:.2}", "Ease factor:".dimmed(), record.ease_factor);
    println!("  {} {} days", "Interval:".dimmed(), record.interval);
    println!("  {} {}", "Repetitions:".dimmed(), record.repetitions);
    if let Some(last) = record.last_review {
        println!(
            "  {} {}",
            "Last review:".dimmed(),
            last.format("%Y-%m-%d %H:%M:%S")
        );
    }
    let next = record.next_review.format("%Y-%m-%d %H:%M:%S").to_string();
    if record.is_due(now) {
        println!("  {} {} {}", "Next review:".dimmed(), next, "(due)".yellow());
    } else {
        println!("  {} {}", "Next review:".dimmed(), next);
    }
    if record.is_mastered() {
        println!("  {}", "Mastered".green().bold());
    }
}

/// "3d overdue", "5h overdue" or "due now"
fn format_overdue(next_review: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let overdue = now - next_review;
    if overdue.num_days() > 0 {
        format!("{}d overdue", overdue.num_days())
    } else if overdue.num_hours() > 0 {
        format!("{}h overdue", overdue.num_hours())
    } else {
        "due now".to_string()
    }
}

/// Print a distribution bar
fn print_distribution_bar(label: &str, count: u64, total: u64, color: &str) {
    let percentage = if total > 0 {
        (count as f64 / total as f64) * 100.0
    } else {
        0.0
    };

    let bar_width: usize = 30;
    let filled = ((percentage / 100.0) * bar_width as f64) as usize;
    let empty = bar_width.saturating_sub(filled);

    let bar = format!("{}{}", "#".repeat(filled), "-".repeat(empty));
    let colored_bar = match color {
        "green" => bar.green(),
        "yellow" => bar.yellow(),
        "red" => bar.red(),
        _ => bar.white(),
    };

    println!(
        "  {:10} [{:30}] {:>4} ({:>5.1}%)",
        label, colored_bar, count, percentage
    );
}
