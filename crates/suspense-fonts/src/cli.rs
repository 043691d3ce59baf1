//! Exposes the command line application.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use suspense_cache::metrics;
use suspense_fonts::config::Config;
use suspense_fonts::fonts::FontRequest;
use suspense_fonts::loader::{FontLoader, font_cache};
use suspense_fonts::logging;
use suspense_fonts::render::{Rendered, Screen};
use tokio::runtime::Handle;

use crate::output::{self, OutputFormat};

/// fontloader commands.
#[derive(Subcommand)]
enum Command {
    /// Render a screen of components that use the given fonts.
    Load {
        /// The fonts to load, as `FAMILY=SOURCE` or `FAMILY/DISPLAY=SOURCE`.
        ///
        /// A source is either a path relative to the configured assets directory, or a `file`,
        /// `http` or `https` URI.
        #[arg(required = true, value_name = "FONT")]
        fonts: Vec<FontRequest>,

        /// The number of components that use each font.
        #[arg(long, default_value_t = 1)]
        repeat: usize,

        /// The output format.
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Print the cache key of each font.
    Key {
        #[arg(required = true, value_name = "FONT")]
        fonts: Vec<FontRequest>,
    },
}

/// Command line interface parser.
#[derive(Parser)]
#[command(bin_name = "fontloader", version)]
struct Cli {
    /// Path to your configuration file.
    #[arg(long, short, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    /// Returns the path to the configuration file.
    fn config(&self) -> Option<&Path> {
        self.config.as_deref()
    }
}

/// Runs the main application.
pub fn execute() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::get(cli.config()).context("failed loading config")?;

    // SAFETY: No other threads have been spawned yet.
    unsafe { logging::init_logging(&config) };

    let _sentry = sentry::init(sentry::ClientOptions {
        dsn: config.sentry_dsn.clone(),
        release: sentry::release_name!(),
        ..Default::default()
    });

    if let Some(ref statsd) = config.metrics.statsd {
        metrics::configure_statsd(
            &config.metrics.prefix,
            statsd.as_str(),
            config.metrics.custom_tags.clone(),
        )
        .context("failed to configure statsd")?;
    }

    match cli.command {
        Command::Load {
            fonts,
            repeat,
            format,
        } => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("failed to create the runtime")?;
            let rendered = runtime.block_on(load(&config, fonts, repeat))?;
            output::print_rendered(&rendered, format)?;
        }
        Command::Key { fonts } => {
            output::print_keys(&fonts).context("failed to derive cache key")?;
        }
    }

    Ok(())
}

async fn load(config: &Config, fonts: Vec<FontRequest>, repeat: usize) -> Result<Rendered> {
    let loader = FontLoader::new(&config.fonts).context("failed to create the http client")?;
    let cache = font_cache(Handle::current());
    let screen = Screen::new(fonts, repeat);

    tracing::info!(slots = screen.slots().len(), "Rendering screen");
    let rendered = screen
        .render(&loader, &cache)
        .await
        .context("failed to derive font cache key")?;
    tracing::info!(
        passes = rendered.passes,
        loaded = rendered.loaded(),
        failed = rendered.failed(),
        fonts = cache.len(),
        "Rendered screen",
    );

    Ok(rendered)
}
