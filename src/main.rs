//! Athlete monitoring pipeline CLI
//!
//! Builds merged daily tables, rolling-window features, and survival
//! labels from athlete monitoring CSVs.

use clap::{Parser, Subcommand};
use injurylab::{Config, EventSource, JoinKind, Result};

#[derive(Parser)]
#[command(name = "injurylab")]
#[command(about = "Rolling features and survival labels for athlete daily data", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge the objective table with the wide wellness tables
    Merge {
        /// Objective CSV (long: player_id, date, session columns)
        #[arg(long)]
        objective: Option<String>,
        /// Fatigue CSV (wide: date column plus one column per athlete)
        #[arg(long)]
        fatigue: Option<String>,
        /// Soreness CSV (wide)
        #[arg(long)]
        soreness: Option<String>,
        /// Sleep quality CSV (wide)
        #[arg(long)]
        sleep_quality: Option<String>,
        /// Stress CSV (wide)
        #[arg(long)]
        stress: Option<String>,
        /// Join kind on (player_id, date)
        #[arg(long, default_value = "left")]
        how: JoinKind,
        /// Output CSV path
        #[arg(long)]
        output: Option<String>,
    },
    /// Build rolling-window features per athlete
    Features {
        /// Input daily CSV (needs player_id and date)
        #[arg(long)]
        input: Option<String>,
        /// Output CSV path
        #[arg(long)]
        output: Option<String>,
        /// Rolling window length in rows
        #[arg(long)]
        window: Option<usize>,
        /// Minimum observations required inside a window
        #[arg(long)]
        min_periods: Option<usize>,
        /// Athlete id column
        #[arg(long)]
        id_col: Option<String>,
        /// Date column
        #[arg(long)]
        date_col: Option<String>,
        /// Extra columns to exclude from feature treatment (repeatable)
        #[arg(long)]
        exclude: Vec<String>,
        /// Comma-separated statistics: mean,max,std
        #[arg(long)]
        stats: Option<String>,
    },
    /// Build survival labels (T, E) for every daily row
    Labels {
        /// Input daily CSV (needs player_id and date)
        #[arg(long)]
        input: Option<String>,
        /// Output CSV path
        #[arg(long)]
        output: Option<String>,
        /// Endpoint events: injury, illness, or both
        #[arg(long)]
        event_source: Option<EventSource>,
        /// Injury events CSV
        #[arg(long)]
        injury_csv: Option<String>,
        /// Illness events CSV
        #[arg(long)]
        illness_csv: Option<String>,
        /// Athlete id column in the daily CSV
        #[arg(long)]
        id_col: Option<String>,
        /// Date column in the daily CSV
        #[arg(long)]
        date_col: Option<String>,
        /// Athlete id column in the event CSVs
        #[arg(long)]
        events_id_col: Option<String>,
        /// Date column in the event CSVs
        #[arg(long)]
        events_date_col: Option<String>,
        /// Parse event dates as day-first (e.g. 20.03.2020)
        #[arg(long)]
        events_dayfirst: bool,
        /// Merge events within this many days into one episode
        #[arg(long)]
        gap_days: Option<i64>,
        /// Count a same-day event as the next event (T can be 0)
        #[arg(long)]
        include_same_day: bool,
    },
    /// Initialize a new project with default config
    Init,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    // Run command
    let result = match cli.command {
        Commands::Merge {
            objective,
            fatigue,
            soreness,
            sleep_quality,
            stress,
            how,
            output,
        } => commands::merge(
            &config,
            objective,
            fatigue,
            soreness,
            sleep_quality,
            stress,
            how,
            output,
        ),
        Commands::Features {
            input,
            output,
            window,
            min_periods,
            id_col,
            date_col,
            exclude,
            stats,
        } => commands::features(
            &config,
            input,
            output,
            window,
            min_periods,
            id_col,
            date_col,
            exclude,
            stats,
        ),
        Commands::Labels {
            input,
            output,
            event_source,
            injury_csv,
            illness_csv,
            id_col,
            date_col,
            events_id_col,
            events_date_col,
            events_dayfirst,
            gap_days,
            include_same_day,
        } => commands::labels(
            &config,
            input,
            output,
            event_source,
            injury_csv,
            illness_csv,
            id_col,
            date_col,
            events_id_col,
            events_date_col,
            events_dayfirst,
            gap_days,
            include_same_day,
        ),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use injurylab::data::events::{normalize_events, EventColumns};
    use injurylab::data::merge::{melt_wellness, merge_daily};
    use injurylab::data::normalize::{normalize, normalize_strict, NormalizeOptions};
    use injurylab::data::Table;
    use injurylab::features::{build_rolling_features, RollingConfig};
    use injurylab::labels::{build_survival_labels, LabelConfig};
    use injurylab::{PipelineError, Stat};
    use std::collections::HashSet;
    use std::path::Path;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all(&config.data.processed_dir)?;
        println!("Created {}/", config.data.processed_dir);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn merge(
        config: &Config,
        objective: Option<String>,
        fatigue: Option<String>,
        soreness: Option<String>,
        sleep_quality: Option<String>,
        stress: Option<String>,
        how: JoinKind,
        output: Option<String>,
    ) -> Result<()> {
        let data = &config.data;
        let objective_path = objective.unwrap_or_else(|| data.objective_csv.clone());
        let output = output.unwrap_or_else(|| processed_path(config, "daily_merged.csv"));

        let table = Table::read_csv(&objective_path)?;
        let daily = normalize_strict(
            table,
            &NormalizeOptions::new("player_id", "date"),
            &objective_path,
        )?;
        daily.ensure_unique_keys(&objective_path)?;

        let sources = [
            ("fatigue", fatigue.unwrap_or_else(|| data.fatigue_csv.clone())),
            (
                "soreness",
                soreness.unwrap_or_else(|| data.soreness_csv.clone()),
            ),
            (
                "sleep_quality",
                sleep_quality.unwrap_or_else(|| data.sleep_quality_csv.clone()),
            ),
            ("stress", stress.unwrap_or_else(|| data.stress_csv.clone())),
        ];
        let mut wellness = Vec::with_capacity(sources.len());
        for (value_col, path) in sources {
            let wide = Table::read_csv(&path)?;
            wellness.push(melt_wellness(&wide, value_col, &path)?);
        }

        let merged = merge_daily(&daily, &wellness, how)?;
        merged.write_csv(&output)?;
        println!(
            "OK: saved {} ({} rows, {} columns)",
            output,
            merged.len(),
            merged.column_count()
        );
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn features(
        config: &Config,
        input: Option<String>,
        output: Option<String>,
        window: Option<usize>,
        min_periods: Option<usize>,
        id_col: Option<String>,
        date_col: Option<String>,
        extra_exclude: Vec<String>,
        stats: Option<String>,
    ) -> Result<()> {
        let defaults = &config.features;
        let input = input.unwrap_or_else(|| config.data.objective_csv.clone());
        let window = window.unwrap_or(defaults.window);
        let min_periods = min_periods.unwrap_or(defaults.min_periods);
        let id_col = id_col.unwrap_or_else(|| defaults.id_col.clone());
        let date_col = date_col.unwrap_or_else(|| defaults.date_col.clone());
        let stats = match stats {
            Some(raw) => parse_stats(&raw)?,
            None => defaults.stats.clone(),
        };
        let output = output.unwrap_or_else(|| {
            processed_path(config, &format!("objective_rolling_{}d.csv", window))
        });

        let mut exclude: HashSet<String> = defaults.exclude.iter().cloned().collect();
        exclude.extend(extra_exclude);

        let table = Table::read_csv(&input)?;
        let normalized = normalize(table, &NormalizeOptions::new(&id_col, &date_col), &input)?;
        if normalized.dropped() > 0 {
            log::warn!(
                "{}: dropped {} rows with missing ids or unparsable dates",
                input,
                normalized.dropped()
            );
        }

        let rolling = RollingConfig {
            id_col,
            date_col,
            window,
            min_periods,
            stats,
            exclude,
        };
        let out = build_rolling_features(&normalized.daily, &rolling)?;
        out.write_csv(&output)?;
        println!(
            "OK: saved {} ({} rows, {} columns)",
            output,
            out.len(),
            out.column_count()
        );
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn labels(
        config: &Config,
        input: Option<String>,
        output: Option<String>,
        event_source: Option<EventSource>,
        injury_csv: Option<String>,
        illness_csv: Option<String>,
        id_col: Option<String>,
        date_col: Option<String>,
        events_id_col: Option<String>,
        events_date_col: Option<String>,
        events_dayfirst: bool,
        gap_days: Option<i64>,
        include_same_day: bool,
    ) -> Result<()> {
        let defaults = &config.labels;
        let input = input.unwrap_or_else(|| config.data.objective_csv.clone());
        let output = output.unwrap_or_else(|| processed_path(config, "daily_labeled.csv"));
        let event_source = event_source.unwrap_or(defaults.event_source);
        let id_col = id_col.unwrap_or_else(|| config.features.id_col.clone());
        let date_col = date_col.unwrap_or_else(|| config.features.date_col.clone());

        let table = Table::read_csv(&input)?;
        let daily = normalize_strict(table, &NormalizeOptions::new(&id_col, &date_col), &input)?;

        let mut sources = Vec::new();
        if event_source.includes_injury() {
            let path = injury_csv.unwrap_or_else(|| config.data.injury_csv.clone());
            sources.push((path.clone(), Table::read_csv(&path)?));
        }
        if event_source.includes_illness() {
            let path = illness_csv.unwrap_or_else(|| config.data.illness_csv.clone());
            sources.push((path.clone(), Table::read_csv(&path)?));
        }
        let columns = EventColumns {
            id_col: events_id_col.unwrap_or_else(|| defaults.events_id_col.clone()),
            date_col: events_date_col.unwrap_or_else(|| defaults.events_date_col.clone()),
            dayfirst: events_dayfirst || defaults.events_dayfirst,
        };
        let events = normalize_events(&sources, &columns)?;
        log::info!("{} unique event records from {}", events.len(), event_source);

        let label_config = LabelConfig {
            gap_days: gap_days.unwrap_or(defaults.gap_days),
            include_same_day: include_same_day || defaults.include_same_day,
        };
        let out = build_survival_labels(&daily, &events, &label_config)?;

        let e_idx = out.column_index("E").ok_or_else(|| {
            PipelineError::InvalidConfig("labelled table lost its E column".to_string())
        })?;
        let n_events = out.rows().iter().filter(|r| r[e_idx] == "1").count();

        out.write_csv(&output)?;
        println!(
            "OK: saved {} ({} rows, {} columns), E=1: {}",
            output,
            out.len(),
            out.column_count(),
            n_events
        );
        Ok(())
    }

    fn parse_stats(raw: &str) -> Result<Vec<Stat>> {
        let mut stats = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let stat: Stat = part.parse().map_err(PipelineError::InvalidConfig)?;
            if !stats.contains(&stat) {
                stats.push(stat);
            }
        }
        Ok(stats)
    }

    fn processed_path(config: &Config, file: &str) -> String {
        Path::new(&config.data.processed_dir)
            .join(file)
            .to_string_lossy()
            .into_owned()
    }
}
