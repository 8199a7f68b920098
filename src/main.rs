use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use sbar::{send_notification, AppConfig, NotificationWatcher, StatusRunner, StdoutPublisher};
use sbar_core::{compile_scope, Field, FieldSet, Scope, Template};
use sbar_sources::SystemProvider;
use sbar_types::FieldMetadata;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;

/// sbar - An event-driven status line for Linux window managers
#[derive(Parser, Debug)]
#[command(name = "sbar")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Debug verbosity level (0=quiet, 1=info, 2=debug, 3=trace)
    #[arg(short = 'd', long = "debug", value_name = "LEVEL", default_value = "0", global = true)]
    debug: u8,

    /// Configuration file to use instead of the default location
    #[arg(short = 'c', long = "config", value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Render one full status line, print it and exit
    #[arg(long = "once")]
    once: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mark fields dirty for a running status bar
    Notify {
        /// Field names, `all`, or a raw field set number
        #[arg(value_name = "FIELD", required = true)]
        fields: Vec<String>,
    },
    /// List every field with its bit, kind, parent and template token
    Fields {
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    Config {
        /// Save the effective configuration to the config file
        #[arg(long)]
        write: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // Level 0 (default): warn only
    // Level 1: info
    // Level 2: debug
    // Level 3+: trace
    let log_level = match cli.debug {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // Allow RUST_LOG to override CLI setting
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        eprintln!("sbar: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Some(Command::Notify { fields }) => {
            let set = parse_field_args(&fields)?;
            send_notification(&config.notify_path, set)?;
            info!("Notified {} of {} fields", config.notify_path.display(), set.len());
            Ok(())
        }
        Some(Command::Fields { json }) => list_fields(json),
        Some(Command::Config { write }) => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if write {
                let path = match cli.config {
                    Some(path) => {
                        config.save_to_path(&path)?;
                        path
                    }
                    None => config.save()?,
                };
                eprintln!("Wrote {}", path.display());
            }
            Ok(())
        }
        None => run_status_bar(config, cli.once),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    match path {
        Some(path) if path.exists() => AppConfig::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        Some(path) => {
            warn!("Config file {} does not exist, using defaults", path.display());
            Ok(AppConfig::default())
        }
        None => AppConfig::load().context("Failed to load config"),
    }
}

fn run_status_bar(config: AppConfig, once: bool) -> Result<()> {
    warn!("Starting sbar v{}", env!("CARGO_PKG_VERSION"));

    let template = compile_scope(Scope::Status, &config.formats);
    report_template(&template);

    let provider = SystemProvider::new(config.time_format.clone());
    let runner = StatusRunner::new(template, provider, StdoutPublisher::new())
        .with_timing(config.tick_interval(), config.wait_timeout());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async move {
        let mut runner = runner;
        if once {
            println!("{}", runner.render_once().await);
            return Ok(());
        }

        match NotificationWatcher::new(&config.notify_path) {
            Ok(watcher) => runner = runner.with_watcher(watcher),
            Err(e) => warn!("Notifications disabled: {:#}", e),
        }

        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            flag.store(true, Ordering::SeqCst);
        });

        runner.run(shutdown).await
    })
}

fn report_template(template: &Template) {
    for token in template.dropped_tokens() {
        warn!("Status format contains unknown token '{}'", token);
    }
    info!(
        "Status template uses {} fields: {}",
        template.field_count(),
        template.fields().iter().map(Field::name).collect::<Vec<_>>().join(", ")
    );
}

/// Resolves once Ctrl+C or SIGTERM arrives
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

/// Combine field names, `all` and raw field set numbers into one set
fn parse_field_args(args: &[String]) -> Result<FieldSet> {
    let mut set = FieldSet::NONE;
    for arg in args {
        if arg.eq_ignore_ascii_case("all") {
            set |= FieldSet::ALL;
        } else if let Ok(field) = arg.parse::<Field>() {
            set |= field;
        } else {
            set |= FieldSet::decode(arg).map_err(|_| anyhow!("Unknown field: {}", arg))?;
        }
    }
    Ok(set)
}

#[derive(Serialize)]
struct FieldListing {
    #[serde(flatten)]
    metadata: FieldMetadata,
    scope: Option<Scope>,
    token: Option<char>,
}

impl FieldListing {
    fn new(field: Field) -> Self {
        let scope = Scope::containing(field);
        Self {
            metadata: field.metadata(),
            scope,
            token: scope.and_then(|scope| scope.token_for(field)),
        }
    }
}

fn list_fields(json: bool) -> Result<()> {
    let listings: Vec<FieldListing> = Field::ALL.iter().copied().map(FieldListing::new).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
        return Ok(());
    }

    println!(
        "{:>3}  {:<26} {:<10} {:<16} {:<6} DESCRIPTION",
        "BIT", "NAME", "KIND", "PARENT", "TOKEN"
    );
    for listing in &listings {
        let meta = &listing.metadata;
        let kind = if meta.field.is_composite() { "composite" } else { "leaf" };
        let parent = meta.parent.map(Field::name).unwrap_or("-");
        let token = listing
            .token
            .map(|token| format!("/{}", token))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>3}  {:<26} {:<10} {:<16} {:<6} {}",
            meta.bit,
            meta.field.name(),
            kind,
            parent,
            token,
            meta.description
        );
    }
    Ok(())
}
