//! # Rules MCP CLI (`rules-mcp`)
//!
//! ## Usage
//!
//! ```bash
//! rules-mcp --config ./config/rules.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rules-mcp serve` | Serve rules as MCP resources (stdio by default) |
//! | `rules-mcp sync` | Run one refresh cycle and print what happened |
//! | `rules-mcp list` | Print the resource listing |
//! | `rules-mcp read <uri>` | Print one rule body |
//! | `rules-mcp sources` | Show the configured source and its health |

use anyhow::bail;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use rules_mcp::config;
use rules_mcp::logging;
use rules_mcp::resources::RuleResources;
use rules_mcp::server::{self, Transport};
use rules_mcp::sources;
use rules_mcp::sync::{DocumentOutcome, RefreshStatus};

/// Rules MCP: serve a directory or GitHub folder of markdown rules as live
/// MCP resources.
#[derive(Parser)]
#[command(name = "rules-mcp", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/rules.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve rules over MCP until the client disconnects or a termination
    /// signal arrives.
    Serve {
        /// `stdio` for editor integrations, `http` for the streamable HTTP endpoint.
        #[arg(long, value_enum, default_value_t = Transport::Stdio)]
        transport: Transport,
    },

    /// Run one refresh cycle against the source and print the outcome.
    Sync,

    /// List rule resources.
    List,

    /// Print the body of one rule.
    Read {
        /// Resource URI, e.g. `rules:///rust.md`.
        uri: String,
    },

    /// Show the configured source and whether it is healthy.
    Sources,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.logging.level)?;

    match cli.command {
        Commands::Serve { transport } => {
            server::run_server(&cfg, transport).await?;
        }
        Commands::Sync => {
            let (sync, report) = server::bootstrap(&cfg).await?;
            match &report.status {
                RefreshStatus::Published { generation } => {
                    println!("sync {}", sync.source().label());
                    println!("  generation: {}", generation);
                }
                RefreshStatus::NotModified { generation } => {
                    println!("sync {} (not modified)", sync.source().label());
                    println!("  generation: {}", generation);
                }
                RefreshStatus::Aborted(e) => bail!("sync aborted: {}", e),
            }
            let snapshot = sync.store().read();
            println!("  built: {}", snapshot.built_at().to_rfc3339());
            println!("  rules: {}", snapshot.len());
            for outcome in &report.outcomes {
                if let DocumentOutcome::Failed(e) = outcome {
                    println!("  failed: {}", e);
                }
            }
        }
        Commands::List => {
            let (sync, _) = server::bootstrap(&cfg).await?;
            let resources = RuleResources::new(sync);
            let entries = resources.list_resources().await;
            for entry in &entries {
                println!("{}  {}", entry.uri, entry.name);
            }
            println!("{} rules", entries.len());
        }
        Commands::Read { uri } => {
            let (sync, _) = server::bootstrap(&cfg).await?;
            let resources = RuleResources::new(sync);
            let body = resources.read_resource(&uri).await?;
            print!("{}", body.text);
        }
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
    }

    Ok(())
}
