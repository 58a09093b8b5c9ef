//! Main entry point for the bot-rating command line tool
//!
//! Reads one rating period (players and finished games) from a TOML or JSON
//! file, rates it with Glicko-2 and prints the rating changes as JSON.

use anyhow::{anyhow, bail, Context, Result};
use bot_rating::config::AppConfig;
use bot_rating::utils::confidence_interval;
use bot_rating::{PlayerId, Rating, Ruleset};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Bot Rating - Glicko-2 ratings for bots and humans
#[derive(Parser)]
#[command(
    name = "bot-rating",
    version,
    about = "Rate one period of multi-player games with Glicko-2",
    long_about = "Bot Rating reads the players and finished games of one rating period, \
                 reduces multi-player results to pairwise comparisons and applies a \
                 Glicko-2 update to every player at once."
)]
struct Args {
    /// Rating period file
    #[arg(value_name = "PERIOD", help = "Path to the period file (TOML or JSON)")]
    period: Option<PathBuf>,

    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// System constant override
    #[arg(long, value_name = "TAU", help = "Override the Glicko-2 system constant")]
    tau: Option<f64>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Print metrics after rating
    #[arg(long, help = "Print Prometheus metrics to stderr after rating")]
    metrics: bool,

    /// Dry run mode (validate config and period, then exit)
    #[arg(
        long,
        help = "Validate configuration and play the period's games without rating them"
    )]
    dry_run: bool,
}

/// One rating period as read from disk
#[derive(Debug, Deserialize)]
struct PeriodFile {
    #[serde(default)]
    players: Vec<PlayerEntry>,
    #[serde(default)]
    games: Vec<GameEntry>,
}

#[derive(Debug, Deserialize)]
struct PlayerEntry {
    name: String,
    /// Carried-over rating; new players start from the default
    rating: Option<Rating>,
}

#[derive(Debug, Deserialize)]
struct GameEntry {
    /// Player names by slot
    players: Vec<String>,
    /// One relative score per slot
    scores: Option<Vec<f64>>,
    /// Finishing order by name, best first
    ranks: Option<Vec<Vec<String>>>,
}

/// Rating change as printed
#[derive(Debug, Serialize)]
struct ChangeReport {
    name: String,
    player_id: PlayerId,
    old_rating: Rating,
    new_rating: Rating,
    delta: f64,
    interval: (f64, f64),
    encounters: usize,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(tau) = args.tau {
        config.ruleset.system_tau = tau;
    }

    bot_rating::config::validate_config(&config)?;
    Ok(config)
}

fn read_period(path: &Path) -> Result<PeriodFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read period file {}", path.display()))?;

    let period = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse period file {}", path.display()))?,
        _ => toml::from_str(&contents)
            .with_context(|| format!("Failed to parse period file {}", path.display()))?,
    };
    Ok(period)
}

/// Register the players and play the games without closing the period.
///
/// Returns the ruleset and the player names by id.
fn load_ruleset(
    config: &AppConfig,
    period: &PeriodFile,
) -> Result<(Ruleset, HashMap<PlayerId, String>)> {
    let mut ruleset = Ruleset::new(config.ruleset.clone())?;
    let mut ids: HashMap<&str, PlayerId> = HashMap::new();

    for entry in &period.players {
        if ids.contains_key(entry.name.as_str()) {
            bail!("Duplicate player name: {}", entry.name);
        }
        let id = match entry.rating {
            Some(rating) => ruleset.add_player_with_rating(entry.name.as_str(), rating)?,
            None => ruleset.add_player(entry.name.as_str()),
        };
        ids.insert(entry.name.as_str(), id);
    }

    let lookup = |name: &str| -> Result<PlayerId> {
        ids.get(name)
            .copied()
            .ok_or_else(|| anyhow!("Unknown player in game: {}", name))
    };

    for (index, entry) in period.games.iter().enumerate() {
        let slots = entry
            .players
            .iter()
            .map(|name| lookup(name.as_str()))
            .collect::<Result<Vec<_>>>()?;
        let game_id = ruleset
            .create_game(slots, true)
            .with_context(|| format!("Game #{} is invalid", index + 1))?;

        match (&entry.scores, &entry.ranks) {
            (Some(scores), None) => ruleset.finish_game(game_id, scores)?,
            (None, Some(ranks)) => {
                let ranks = ranks
                    .iter()
                    .map(|rank| {
                        rank.iter()
                            .map(|name| lookup(name.as_str()))
                            .collect::<Result<Vec<_>>>()
                    })
                    .collect::<Result<Vec<Vec<_>>>>()?;
                ruleset.finish_game_ranked(game_id, ranks)?
            }
            _ => bail!("Game #{} needs exactly one of scores or ranks", index + 1),
        }
    }

    debug!("Loaded {} players and {} games", ids.len(), period.games.len());

    let names = ids
        .into_iter()
        .map(|(name, id)| (id, name.to_string()))
        .collect();
    Ok((ruleset, names))
}

/// Register the players, play the games and close the period
fn rate_period(
    config: &AppConfig,
    period: &PeriodFile,
    print_metrics: bool,
) -> Result<Vec<ChangeReport>> {
    let (mut ruleset, names) = load_ruleset(config, period)?;
    let summary = ruleset.close_period_and_update()?;
    let reports = summary
        .changes
        .iter()
        .map(|change| ChangeReport {
            name: names.get(&change.player_id).cloned().unwrap_or_default(),
            player_id: change.player_id,
            old_rating: change.old_rating,
            new_rating: change.new_rating,
            delta: change.rating_delta(),
            interval: confidence_interval(&change.new_rating),
            encounters: change.encounters,
        })
        .collect();

    info!(
        "Rated {} players over {} games",
        summary.changes.len(),
        summary.games.len()
    );

    debug!("Calculator config: {}", ruleset.calculator().config());
    if print_metrics {
        eprintln!("{}", ruleset.metrics().export()?);
    }

    Ok(reports)
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration (CLI args can override environment/config file)
    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    // Initialize logging early (before any other operations)
    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!(
        "{} v{} (tau {}, deterministic {})",
        config.service.name,
        bot_rating::VERSION,
        config.ruleset.system_tau,
        config.ruleset.deterministic
    );

    let Some(path) = &args.period else {
        if args.dry_run {
            info!("Configuration validation successful");
            return Ok(());
        }
        bail!("No period file given");
    };

    let period = read_period(path)?;
    if args.dry_run {
        match load_ruleset(&config, &period) {
            Ok((ruleset, _)) => {
                info!(
                    "Period file is valid: {} players, {} games ready to rate",
                    ruleset.stats().players,
                    ruleset.pending_games().len()
                );
                return Ok(());
            }
            Err(e) => {
                error!("Invalid period file: {:#}", e);
                std::process::exit(1);
            }
        }
    }

    let reports = match rate_period(&config, &period, args.metrics) {
        Ok(reports) => reports,
        Err(e) => {
            error!("Failed to rate period: {:#}", e);
            std::process::exit(1);
        }
    };

    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(source: &str) -> PeriodFile {
        toml::from_str(source).unwrap()
    }

    fn load(source: &str) -> Result<(Ruleset, HashMap<PlayerId, String>)> {
        load_ruleset(&AppConfig::default(), &period(source))
    }

    #[test]
    fn test_valid_period_is_loaded_without_rating() {
        let (ruleset, names) = load(
            r#"
            [[players]]
            name = "alpha"

            [[players]]
            name = "beta"
            rating = { rating = 1620.0, deviation = 80.0, volatility = 0.06 }

            [[games]]
            players = ["alpha", "beta"]
            scores = [1.0, 0.0]

            [[games]]
            players = ["alpha", "beta"]
            ranks = [["beta"], ["alpha"]]
            "#,
        )
        .unwrap();

        assert_eq!(ruleset.pending_games().len(), 2);
        assert_eq!(ruleset.stats().periods_closed, 0);
        assert_eq!(names.len(), 2);
        assert!(names.values().any(|name| name == "beta"));
    }

    #[test]
    fn test_invalid_games_are_reported() {
        let with_game = |game: &str| {
            format!(
                "[[players]]\nname = \"alpha\"\n\
                 [[players]]\nname = \"beta\"\n\
                 [[games]]\n{}\n",
                game
            )
        };

        let invalid = [
            r#"players = ["alpha", "gamma"]
               scores = [1.0, 0.0]"#,
            r#"players = ["alpha", "beta"]
               scores = [1.0]"#,
            r#"players = ["alpha", "beta"]
               ranks = [["alpha"]]"#,
            r#"players = ["alpha", "beta"]
               scores = [0.0, 0.0]"#,
            r#"players = ["alpha", "beta"]"#,
        ];
        for game in invalid {
            assert!(load(&with_game(game)).is_err(), "accepted: {}", game);
        }

        let duplicate = "[[players]]\nname = \"alpha\"\n[[players]]\nname = \"alpha\"\n";
        assert!(load(duplicate).is_err());
    }
}
