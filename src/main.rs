// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};

use yaetwai::app_config::{self, BackendKind, Config};
use yaetwai::app_controller::Controller;

/// CLI Wrapper for BackendKind to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliBackend {
    Ollama,
    DeepSeek,
}

impl From<CliBackend> for BackendKind {
    fn from(cli_backend: CliBackend) -> Self {
        match cli_backend {
            CliBackend::Ollama => BackendKind::Ollama,
            CliBackend::DeepSeek => BackendKind::DeepSeek,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

/// Options shared by every command that talks to a backend
#[derive(Args, Debug, Clone)]
struct CommonArgs {
    /// Translation backend to use
    #[arg(short, long, value_enum)]
    backend: Option<CliBackend>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Target language code (e.g., 'zh', 'fr', 'zh-TW')
    #[arg(short, long)]
    target_language: Option<String>,

    /// DeepSeek API key
    #[arg(long, env = "DEEPSEEK_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate an EPUB file, or every EPUB under a directory
    Translate {
        /// Input EPUB file or directory to process
        #[arg(value_name = "INPUT_PATH")]
        input_path: PathBuf,

        /// Directory for translated books (next to the input by default)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Force overwrite of existing output files
        #[arg(short, long)]
        force_overwrite: bool,

        /// Keep the original text above each translation
        #[arg(long)]
        bilingual: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Translate a single page of an EPUB
    Page {
        /// Input EPUB file
        #[arg(value_name = "INPUT_PATH")]
        input_path: PathBuf,

        /// Page index in reading order, starting at 0
        #[arg(value_name = "INDEX")]
        index: usize,

        /// Discard cached translations of the page first
        #[arg(short, long)]
        retranslate: bool,

        /// Keep the original text above each translation
        #[arg(long)]
        bilingual: bool,

        /// Directory for the translated book (next to the input by default)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Print the translation units of an EPUB
    Segments {
        /// Input EPUB file
        #[arg(value_name = "INPUT_PATH")]
        input_path: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Delete the cached translations of an EPUB for the active backend
    ClearCache {
        /// Input EPUB file
        #[arg(value_name = "INPUT_PATH")]
        input_path: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Generate shell completions for yaetwai
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// YAETwAI - Yet Another EPUB Translator with AI
///
/// Translates EPUB books page by page with a local Ollama model or the
/// DeepSeek API, caching every translated passage.
#[derive(Parser, Debug)]
#[command(name = "yaetwai")]
#[command(version)]
#[command(about = "AI-powered EPUB translation tool")]
#[command(long_about = "YAETwAI splits EPUB books into passages, translates them with an AI backend and writes a translated copy of the book.

EXAMPLES:
    yaetwai translate book.epub                   # Translate using default config
    yaetwai translate -f book.epub                # Force overwrite existing output
    yaetwai translate --bilingual book.epub       # Keep the original next to each translation
    yaetwai translate -b deep-seek book.epub      # Use the DeepSeek API
    yaetwai translate -t fr /books/               # Translate every book in a directory
    yaetwai page book.epub 3 --retranslate        # Retranslate the fourth page
    yaetwai segments book.epub                    # Show how the book is split
    yaetwai completions bash > yaetwai.bash       # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED BACKENDS:
    ollama    - Local Ollama server (default: deepseek-r1:14b)
    deep-seek - DeepSeek chat API (requires API key)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Prefix and ANSI color for a log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("ERROR", "1;31"),
            Level::Warn => ("WARN ", "1;33"),
            Level::Info => ("INFO ", "1;32"),
            Level::Debug => ("DEBUG", "1;36"),
            Level::Trace => ("TRACE", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (prefix, color) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                color,
                now,
                prefix,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Start permissive; the effective level is applied once the config is known
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "yaetwai", &mut std::io::stdout());
            Ok(())
        }
        Commands::Translate {
            input_path,
            output_dir,
            force_overwrite,
            bilingual,
            common,
        } => {
            let mut config = load_config(&common)?;
            config.bilingual |= bilingual;
            let controller = Controller::with_config(config)?;
            if !input_path.exists() {
                return Err(anyhow!("Input path does not exist: {:?}", input_path));
            }
            controller.run(input_path, output_dir, force_overwrite).await
        }
        Commands::Page {
            input_path,
            index,
            retranslate,
            bilingual,
            output_dir,
            common,
        } => {
            let mut config = load_config(&common)?;
            config.bilingual |= bilingual;
            let controller = Controller::with_config(config)?;
            let report = controller
                .translate_page(&input_path, index, retranslate, output_dir.as_deref())
                .await?;
            info!(
                "Page {}: {} units, {} translated, {} cached, {} failed",
                index, report.units, report.translated, report.cached, report.failed
            );
            Ok(())
        }
        Commands::Segments { input_path, common } => {
            let controller = Controller::with_config(load_config(&common)?)?;
            let count = controller.print_segments(&input_path)?;
            info!("{} translation units", count);
            Ok(())
        }
        Commands::ClearCache { input_path, common } => {
            let controller = Controller::with_config(load_config(&common)?)?;
            controller.clear_cache(&input_path)?;
            Ok(())
        }
    }
}

/// Load or create the configuration, apply CLI overrides and validate it
fn load_config(options: &CommonArgs) -> Result<Config> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        log::set_max_level(level_filter(&cmd_log_level.clone().into()));
    }

    let config_path = Path::new(&options.config_path);
    let mut config = if config_path.exists() {
        Config::from_file(config_path)?
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path.display());
        let config = Config::default();
        config
            .save(config_path)
            .with_context(|| format!("Failed to write default config to file: {}", config_path.display()))?;
        config
    };

    // Override config with CLI options if provided
    if let Some(backend) = &options.backend {
        config.translation.backend = backend.clone().into();
    }
    let active = config.translation.backend;
    if let Some(model) = &options.model {
        config.translation.backend_config_mut(active).model = model.clone();
    }
    if let Some(api_key) = &options.api_key {
        config.translation.backend_config_mut(BackendKind::DeepSeek).api_key = api_key.clone();
    }
    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    config.validate().context("Configuration validation failed")?;

    // If log level was not set via command line, update it from config now
    if options.log_level.is_none() {
        log::set_max_level(level_filter(&config.log_level));
    }

    Ok(config)
}
