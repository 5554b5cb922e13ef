use anyhow::{bail, Context, Result};
use clap::Parser;
use radar_core::config::Config;
use radar_core::http::HttpFetch;
use radar_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use radar_core::{CheckOutcome, ListEntry, PlayerOutcome, RadarService, ReqwestFetcher};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

mod output;

#[derive(Parser, Debug)]
#[command(name = "radar")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file; `RADAR_*` environment variables otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser, Debug)]
enum Command {
    /// Show every registered list
    Lists,
    /// Look a player up on all lists
    Check { player: String },
    /// Add or remove players of a private list
    #[command(subcommand)]
    Player(PlayerCommand),
    /// Create, delete and inspect lists
    #[command(subcommand)]
    List(ListCommand),
    /// Re-fetch all public lists
    Refresh,
    /// Write the default configuration to a file
    InitConfig { path: PathBuf },
}

#[derive(Parser, Debug)]
enum PlayerCommand {
    Add {
        namespace: String,
        player: String,
        /// Reason for the entry
        #[arg(num_args = 0.., trailing_var_arg = true)]
        cause: Vec<String>,
    },
    Remove { namespace: String, player: String },
}

#[derive(Parser, Debug)]
enum ListCommand {
    /// Create a private list
    Add { namespace: String, prefix: String },
    Delete { namespace: String },
    Show { namespace: String },
    Prefix { namespace: String, prefix: String },
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::from_env()?,
    };
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }
    Ok(config)
}

fn init_logging(config: &Config) -> Result<()> {
    let log_config = LogConfig::try_from(&config.logging).unwrap_or_else(|e| {
        eprintln!("{}, using 'info'", e);
        LogConfig::new(LogLevel::Info).json_format(config.logging.json_format)
    });
    init_logging_with_config(log_config)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Command::InitConfig { path } = &args.command {
        Config::community().save_to_file(path)?;
        println!("wrote {}", path.display());
        return Ok(());
    }

    let config = load_config(&args)?;
    init_logging(&config)?;
    debug!(?config, "configuration loaded");

    let fetcher: Arc<dyn HttpFetch> = Arc::new(ReqwestFetcher::new()?);
    let service = RadarService::start(config, fetcher).await?;
    let result = run(&service, args.command, args.json).await;
    service.shutdown().await;
    result
}

async fn run(service: &RadarService, command: Command, json: bool) -> Result<()> {
    let registry = service.registry();

    match command {
        Command::Lists => {
            let lists: Vec<_> = registry
                .namespaces()
                .iter()
                .filter_map(|ns| registry.get_list(ns))
                .collect();
            if json {
                let summaries: Vec<_> = lists.iter().map(|list| output::list_json(list)).collect();
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                for list in &lists {
                    println!("{}", output::list_line(list));
                }
            }
        }
        Command::Check { player } => match service.check_player(&player).await {
            CheckOutcome::Listed {
                namespace,
                prefix,
                entry,
            } => {
                if json {
                    println!("{}", serde_json::to_string_pretty(&output::entry_json(&namespace, &entry))?);
                } else {
                    println!("{} {}", prefix, output::entry_line(&namespace, &entry));
                }
            }
            CheckOutcome::NotListed => println!("{} is not on any list", player),
            CheckOutcome::Unresolved => bail!("could not resolve player '{}'", player),
        },
        Command::Player(PlayerCommand::Add {
            namespace,
            player,
            cause,
        }) => {
            let outcome = service.add_player(&namespace, &player, &cause.join(" ")).await;
            report(&namespace, &player, outcome)?;
        }
        Command::Player(PlayerCommand::Remove { namespace, player }) => {
            let outcome = service.remove_player(&namespace, &player).await;
            report(&namespace, &player, outcome)?;
        }
        Command::List(ListCommand::Add { namespace, prefix }) => {
            registry.register_private(&namespace, &prefix)?;
            println!("created list {}", namespace);
        }
        Command::List(ListCommand::Delete { namespace }) => {
            registry.unregister(&namespace)?;
            println!("deleted list {}", namespace);
        }
        Command::List(ListCommand::Show { namespace }) => {
            let Some(list) = registry.get_list(&namespace) else {
                bail!("no list named '{}'", namespace);
            };
            let entries: Vec<ListEntry> = list.entries();
            if json {
                let rows: Vec<_> = entries.iter().map(|e| output::entry_json(&namespace, e)).collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if entries.is_empty() {
                println!("{} {} is empty", list.prefix(), namespace);
            } else {
                println!("{}", output::list_line(&list));
                for entry in &entries {
                    println!("  {}", output::entry_line(&namespace, entry));
                }
            }
        }
        Command::List(ListCommand::Prefix { namespace, prefix }) => {
            registry.set_prefix(&namespace, &prefix)?;
            println!("prefix of {} is now {}", namespace, prefix);
        }
        Command::Refresh => {
            for (namespace, result) in registry.refresh_all_public().await {
                match result {
                    Ok(count) => println!("{}: {} entries", namespace, count),
                    Err(e) => println!("{}: {}", namespace, e),
                }
            }
        }
        Command::InitConfig { .. } => unreachable!("handled before startup"),
    }

    info!("command finished");
    Ok(())
}

fn report(namespace: &str, player: &str, outcome: PlayerOutcome) -> Result<()> {
    match outcome {
        PlayerOutcome::Added(entry) => println!("added {}", output::entry_line(namespace, &entry)),
        PlayerOutcome::Removed(entry) => println!("removed {}", output::entry_line(namespace, &entry)),
        PlayerOutcome::UnknownList => bail!("no list named '{}'", namespace),
        PlayerOutcome::NameUnresolved { alias: true } => {
            bail!("'{}' is an alias name; the player must be online to be resolved", player)
        }
        PlayerOutcome::NameUnresolved { alias: false } => bail!("could not resolve player '{}'", player),
        PlayerOutcome::AlreadyListed => bail!("{} is already on {}", player, namespace),
        PlayerOutcome::NotListed => bail!("{} is not on {}", player, namespace),
        PlayerOutcome::Rejected(e) => return Err(e).context(format!("updating {}", namespace)),
    }
    Ok(())
}
