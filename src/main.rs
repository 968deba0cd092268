use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use modkeeper::application::errors::{BotError, ModuleError};
use modkeeper::application::messaging::MessageParser;
use modkeeper::application::services::{register_loader_commands, CommandService, ModuleManager};
use modkeeper::domain::entities::ModuleReference;
use modkeeper::domain::traits::Bot;
use modkeeper::infrastructure::adapters::ConsoleAdapter;
use modkeeper::infrastructure::config::Config;
use modkeeper::infrastructure::host::{self, CompanionCleanup, RestartSignal};
use modkeeper::infrastructure::http::HttpFetcher;
use modkeeper::infrastructure::storage::FsModuleStore;

#[derive(Parser)]
#[command(name = "modkeeper")]
#[command(about = "Install, remove and update bot modules", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the console bot
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
    /// Install a module by name or URL, or from a local file
    Install {
        /// Module name or URL
        reference: Option<String>,
        /// Local module file to install instead
        #[arg(long, conflicts_with = "reference")]
        file: Option<PathBuf>,
    },
    /// Remove an installed module
    Remove { name: String },
    /// Print the SHA-256 of the module at a URL
    Hash { url: String },
    /// Install every registry module that is not installed yet
    InstallAll,
    /// Re-download every installed module
    UpdateAll,
    /// List installed modules
    List,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("modkeeper v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config();
        }
        command => {
            let config = load_config(&cli.config);
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    tracing::error!("Failed to start runtime: {}", e);
                    std::process::exit(1);
                }
            };

            let result = rt.block_on(async move {
                match command {
                    Commands::Run => run_console(config).await,
                    other => run_once(config, other).await,
                }
            });

            if let Err(e) = result {
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        }
    }
}

fn load_config(config_path: &str) -> Config {
    if std::path::Path::new(config_path).exists() {
        Config::load(config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::load_env()
        })
    } else {
        Config::load_env()
    }
}

fn build_manager(config: &Config, signal: Arc<RestartSignal>) -> Result<ModuleManager, BotError> {
    let fetcher = HttpFetcher::new(&config.fetch)
        .map_err(|e| BotError::Internal(format!("Failed to build HTTP client: {}", e)))?;
    let store = FsModuleStore::new(&config.modules.directory, config.modules.extension.clone());

    let mut manager = ModuleManager::new(config, Arc::new(fetcher), Arc::new(store), signal);
    for companion in &config.modules.companions {
        manager = manager.with_hook(Arc::new(CompanionCleanup::new(companion.clone())));
    }
    Ok(manager)
}

/// Run a single lifecycle operation from the command line
async fn run_once(config: Config, command: Commands) -> Result<(), BotError> {
    let signal = Arc::new(RestartSignal::new());
    let manager = build_manager(&config, signal.clone())?;

    let result = match command {
        Commands::Install { reference, file } => {
            let reference = match (reference, file) {
                (Some(raw), _) => ModuleReference::parse(&raw),
                (None, Some(path)) => {
                    let file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    ModuleReference::uploaded(file_name, path)
                }
                (None, None) => {
                    return Err(BotError::Internal("install needs a module name, URL or --file".to_string()));
                }
            };
            manager.install(&reference).await.map(|o| o.to_string())
        }
        Commands::Remove { name } => manager.remove(&name).await.map(|o| o.to_string()),
        Commands::Hash { url } => manager.hash(&url).await.map(|o| o.to_string()),
        Commands::InstallAll => manager.install_all_missing().await.map(|o| o.to_string()),
        Commands::UpdateAll => manager.update_all_installed().await.map(|o| o.to_string()),
        Commands::List => manager
            .refresh_catalog()
            .await
            .map(|_| manager.catalog().render()),
        Commands::Run | Commands::Version | Commands::InitConfig => {
            return Err(BotError::Internal("not a module operation".to_string()));
        }
    };

    let (text, outcome) = report(result, signal.is_requested());
    println!("{}", text);
    outcome
}

/// Text shown to the user plus the exit result. The status line is the only
/// place a failure is described.
fn report(result: Result<String, ModuleError>, restart_requested: bool) -> (String, Result<(), BotError>) {
    match result {
        Ok(status) if restart_requested => (format!("{}\nRestart the bot to apply changes", status), Ok(())),
        Ok(status) => (status, Ok(())),
        Err(e) => (e.to_string(), Err(BotError::Internal("module operation failed".to_string()))),
    }
}

async fn run_console(config: Config) -> Result<(), BotError> {
    let signal = Arc::new(RestartSignal::new());
    let manager = Arc::new(build_manager(&config, signal.clone())?);

    match manager.refresh_catalog().await {
        Ok(count) => tracing::info!(
            "Registered {} modules from {}",
            count,
            config.modules.directory.display()
        ),
        Err(e) => tracing::warn!("Failed to scan modules: {}", e),
    }

    // Initialize command service
    let mut commands = CommandService::new(&config.bot.prefix);
    if config.whitelist.enabled {
        commands = commands.with_allowed_users(config.whitelist.users.clone());
    }
    commands.register_defaults();
    register_loader_commands(&mut commands, manager);

    let parser = MessageParser::new(&config.bot.prefix);
    let bot = ConsoleAdapter::new(&config.bot.name);
    bot.start().await?;

    let info = bot.bot_info();
    tracing::info!("Bot started: @{}", info.username);

    loop {
        tokio::select! {
            biased;

            _ = signal.wait() => break,
            line = bot.read_line("> ") => {
                let Some(input) = line else {
                    return Ok(());
                };
                if input.is_empty() {
                    continue;
                }

                let msg = parser.parse("console", input, None).with_platform("console");
                tracing::debug!("Console {} message {}", msg.message_type.as_str(), msg.id);
                let reply = match commands.handle(&msg).await {
                    Ok(Some(response)) => response,
                    Ok(None) => format!("Commands start with {0}, try {0}help", commands.prefix()),
                    Err(e) => format!("Error: {}", e),
                };
                bot.send_message("console", &reply).await?;
            }
        }
    }

    bot.send_message("console", "Restarting...").await?;
    Err(BotError::Io(host::restart_process()))
}

fn init_config() {
    match Config::default().to_yaml() {
        Ok(yaml) => {
            println!("{}", yaml);
            println!("\nSave this to config.yaml and adjust as needed.");
        }
        Err(e) => tracing::error!("{}", e),
    }
}
