//! Omniplay CLI - Headless source resolution and playback simulation
//!
//! Features:
//! - Capability probes for composite sources
//! - Candidate classification
//! - Fallback plan inspection
//! - Full playback sessions over scripted backends

use clap::{Parser, Subcommand};

mod commands;
mod output;

use output::OutputFormat;

/// Omniplay CLI - Source resolution toolkit
#[derive(Parser)]
#[command(name = "omniplay")]
#[command(author = "Omniplay Developers")]
#[command(version)]
#[command(about = "Inspect and simulate multi-backend media sources", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text", global = true)]
    format: String,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report whether any candidate of a source is playable
    Probe {
        /// Composite `|`-delimited source
        src: String,

        /// Classify as an audio element
        #[arg(long)]
        audio: bool,
    },

    /// Classify every candidate of a source
    Parse {
        /// Composite `|`-delimited source
        src: String,

        /// Classify as an audio element
        #[arg(long)]
        audio: bool,

        /// Ignore `#t=` annotations
        #[arg(long)]
        no_fragments: bool,
    },

    /// Show the order backends would be attempted in
    Plan {
        /// Composite `|`-delimited source
        src: String,

        /// Classify as an audio element
        #[arg(long)]
        audio: bool,

        /// Backends available (default: all)
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,
    },

    /// Play a source against scripted backends and print the event stream
    Simulate {
        /// Composite `|`-delimited source
        src: String,

        /// Audio-only session
        #[arg(long)]
        audio: bool,

        /// Backends whose players fail with a network error
        #[arg(long, value_delimiter = ',')]
        fail: Vec<String>,

        /// Backends whose runtimes fail to load
        #[arg(long, value_delimiter = ',')]
        fail_load: Vec<String>,

        /// Backends whose runtimes report themselves unsupported
        #[arg(long, value_delimiter = ',')]
        unsupported: Vec<String>,

        /// Native element plays HLS playlists
        #[arg(long)]
        native_hls: bool,

        /// Media duration reported by the backends
        #[arg(long, default_value = "60")]
        duration: f64,

        /// Start playback once playable
        #[arg(long)]
        autoplay: bool,

        /// Seek to this position after loading
        #[arg(long)]
        seek: Option<f64>,

        /// Select this quality after loading (`auto` or a level index)
        #[arg(long)]
        quality: Option<String>,

        /// Set this volume after loading
        #[arg(long)]
        volume: Option<f64>,

        /// Mute after loading
        #[arg(long)]
        mute: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();

    omniplay_core::init();

    let format = OutputFormat::from(cli.format.as_str());
    let out = output::OutputManager::new(format, !cli.no_color);

    match cli.command {
        Commands::Probe { src, audio } => {
            commands::probe(&out, &src, audio)?;
        }
        Commands::Parse { src, audio, no_fragments } => {
            commands::parse(&out, &src, audio, !no_fragments)?;
        }
        Commands::Plan { src, audio, only } => {
            commands::plan(&out, &src, audio, &only)?;
        }
        Commands::Simulate {
            src,
            audio,
            fail,
            fail_load,
            unsupported,
            native_hls,
            duration,
            autoplay,
            seek,
            quality,
            volume,
            mute,
        } => {
            let scenario = commands::Scenario {
                audio,
                fail,
                fail_load,
                unsupported,
                native_hls,
                duration,
                autoplay,
                seek,
                quality,
                volume,
                mute,
            };
            commands::simulate(&out, &src, scenario).await?;
        }
    }

    Ok(())
}
