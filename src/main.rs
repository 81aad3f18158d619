//! ucistage CLI
//!
//! Stage and commit UCI changes on a remote device over ubus JSON-RPC, and
//! apply them with automatic rollback.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use ucistage_rpc::{HttpTransport, Rpc, StreamTransport, UbusClient};
use ucistage_store::{OptionValue, Section, Settings, Store};

type CliStore = Store<Box<dyn Rpc>>;

#[derive(Parser)]
#[command(
    name = "ucistage",
    about = "Staged UCI configuration transactions over ubus JSON-RPC",
    version,
    author
)]
struct Cli {
    /// Settings file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// ubus JSON-RPC endpoint URL
    #[arg(long, global = true, env = "UCISTAGE_ENDPOINT")]
    endpoint: Option<String>,

    /// Command speaking line-delimited JSON-RPC on stdio, used instead of
    /// the endpoint
    #[arg(long, global = true)]
    bridge: Option<String>,

    /// ubus session token
    #[arg(long, global = true, env = "UCISTAGE_SESSION")]
    session: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a config, or one section of it
    Show {
        /// Config name
        config: String,
        /// Section id or @type[n] reference
        section: Option<String>,
    },

    /// Print an option value, or the section type when no option is given
    Get {
        config: String,
        section: String,
        option: Option<String>,
    },

    /// Set an option; several values make a list
    Set {
        config: String,
        section: String,
        option: String,
        #[arg(required = true, num_args = 1..)]
        values: Vec<String>,
    },

    /// Remove an option
    Unset {
        config: String,
        section: String,
        option: String,
    },

    /// Add a section, optionally with options given as opt=value
    Add {
        config: String,
        #[arg(value_name = "TYPE")]
        section_type: String,
        /// Section name; anonymous when omitted
        #[arg(long)]
        name: Option<String>,
        assignments: Vec<String>,
    },

    /// Delete a section
    Delete { config: String, section: String },

    /// Move a section to the end, or next to another section
    Move {
        config: String,
        section: String,
        /// Place before this section
        #[arg(long, conflicts_with = "after")]
        before: Option<String>,
        /// Place after this section
        #[arg(long)]
        after: Option<String>,
    },

    /// Show changes pending on the device
    Changes,

    /// Apply pending changes and confirm them before the rollback timeout
    Apply {
        /// Rollback timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::load().context("Failed to load settings")?,
    };

    if let Some(endpoint) = &cli.endpoint {
        settings.endpoint = Some(endpoint.clone());
    }
    if let Some(bridge) = &cli.bridge {
        settings.bridge = bridge.split_whitespace().map(str::to_string).collect();
    }
    if let Some(session) = &cli.session {
        settings.session = session.clone();
    }

    Ok(settings)
}

fn connect(settings: &Settings) -> Result<Box<dyn Rpc>> {
    if let Some((program, args)) = settings.bridge.split_first() {
        info!(program = %program, "Connecting through bridge");
        let transport = StreamTransport::spawn(program, args)
            .with_context(|| format!("Failed to start bridge {}", program))?;
        return Ok(Box::new(UbusClient::with_session(
            transport,
            settings.session.clone(),
        )));
    }

    let endpoint = settings
        .endpoint
        .as_deref()
        .ok_or_else(|| anyhow!("No ubus endpoint configured, use --endpoint or --bridge"))?;

    info!(endpoint, "Connecting to ubus gateway");
    let transport = HttpTransport::with_timeout(endpoint, settings.timeout())?;
    Ok(Box::new(UbusClient::with_session(
        transport,
        settings.session.clone(),
    )))
}

async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(&cli)?;
    let store: CliStore = Store::with_settings(connect(&settings)?, settings);

    match cli.command {
        Commands::Show { config, section } => {
            store.load(&[&config]).await?;
            show(&store, &config, section.as_deref())?;
        }
        Commands::Get {
            config,
            section,
            option,
        } => {
            store.load(&[&config]).await?;
            let value = match option {
                Some(option) => store.get(&config, &section, &option),
                None => store
                    .get_section(&config, &section)
                    .map(|s| OptionValue::from(s.section_type)),
            };
            let value = value.ok_or_else(|| anyhow!("Entry not found"))?;
            println!("{}", value);
        }
        Commands::Set {
            config,
            section,
            option,
            mut values,
        } => {
            store.load(&[&config]).await?;
            require_section(&store, &config, &section)?;

            let value = if values.len() == 1 {
                OptionValue::from(values.remove(0))
            } else {
                OptionValue::from(values)
            };
            store.set(&config, &section, &option, value);
            store.save().await?;
        }
        Commands::Unset {
            config,
            section,
            option,
        } => {
            store.load(&[&config]).await?;
            require_section(&store, &config, &section)?;
            store.unset(&config, &section, &option);
            store.save().await?;
        }
        Commands::Add {
            config,
            section_type,
            name,
            assignments,
        } => {
            store.load(&[&config]).await?;

            let sid = store.add(&config, &section_type, name.as_deref());
            for assignment in &assignments {
                let (option, value) = assignment
                    .split_once('=')
                    .ok_or_else(|| anyhow!("Expected opt=value, got '{}'", assignment))?;
                store.set(&config, &sid, option, value);
            }
            store.save().await?;

            // The server appends new sections.
            let created = match name {
                Some(name) => name,
                None => store
                    .resolve_sid(&config, &format!("@{}[-1]", section_type))
                    .ok_or_else(|| anyhow!("Added section not found after commit"))?,
            };
            println!("{}", created);
        }
        Commands::Delete { config, section } => {
            store.load(&[&config]).await?;
            require_section(&store, &config, &section)?;
            store.remove(&config, &section);
            store.save().await?;
        }
        Commands::Move {
            config,
            section,
            before,
            after,
        } => {
            store.load(&[&config]).await?;
            let (target, place_after) = match (before, after) {
                (Some(target), _) => (Some(target), false),
                (None, Some(target)) => (Some(target), true),
                (None, None) => (None, false),
            };

            if !store.move_section(&config, &section, target.as_deref(), place_after) {
                bail!("Section not found");
            }
            store.save().await?;
        }
        Commands::Changes => {
            let changes = store.changes().await?;
            println!("{}", serde_json::to_string_pretty(&changes)?);
        }
        Commands::Apply { timeout } => {
            let cancel = CancellationToken::new();
            let interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    interrupt.cancel();
                }
            });

            store.apply_with_cancel(timeout, &cancel).await?;
            println!("Changes applied and confirmed");
        }
    }

    Ok(())
}

fn require_section(store: &CliStore, config: &str, section: &str) -> Result<()> {
    if store.get_section(config, section).is_none() {
        bail!("Section {}.{} not found", config, section);
    }
    Ok(())
}

/// Print sections in `uci show` format
fn show(store: &CliStore, config: &str, section: Option<&str>) -> Result<()> {
    let sections = store.sections(config, None);

    let selected: Vec<(String, &Section)> = match section {
        Some(section) => {
            let sid = store
                .resolve_sid(config, section)
                .ok_or_else(|| anyhow!("Entry not found"))?;
            let found = sections
                .iter()
                .find(|s| s.name == sid)
                .ok_or_else(|| anyhow!("Entry not found"))?;
            vec![(display_name(&sections, found), found)]
        }
        None => sections
            .iter()
            .map(|s| (display_name(&sections, s), s))
            .collect(),
    };

    for (name, section) in selected {
        println!("{}.{}={}", config, name, section.section_type);
        for (option, value) in &section.options {
            let rendered: Vec<String> = value.items().into_iter().map(quote).collect();
            println!("{}.{}.{}={}", config, name, option, rendered.join(" "));
        }
    }

    Ok(())
}

/// Anonymous sections are shown positionally, like `@rule[2]`
fn display_name(sections: &[Section], section: &Section) -> String {
    if !section.anonymous {
        return section.name.clone();
    }

    let position = sections
        .iter()
        .filter(|s| s.section_type == section.section_type)
        .position(|s| s.name == section.name)
        .unwrap_or_default();
    format!("@{}[{}]", section.section_type, position)
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}
