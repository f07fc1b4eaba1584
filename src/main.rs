//! x11q-surface - present a remote X11 framebuffer in a host window
//!
//! ```text
//! x11q-surface resolve --width 2340 --height 1080 --resolution-mode exact --exact 1920x1080
//! x11q-surface view --display :0 --resolution-mode scaled --scale 200
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use x11q_surface::resolution::{self, Size};
use x11q_surface::settings::{self, DisplaySettings, ViewOptions};
use x11q_surface::viewer;

#[derive(Parser)]
#[command(name = "x11q-surface")]
#[command(about = "Surface and resolution negotiation for remote X11 displays")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the negotiated sizes for a physical surface size
    Resolve {
        /// Physical width offered by the host
        #[arg(long)]
        width: u32,

        /// Physical height offered by the host
        #[arg(long)]
        height: u32,

        #[command(flatten)]
        settings: DisplaySettings,
    },

    /// Show an X display (or a test pattern) in a resizable window
    View {
        /// X display to sample (e.g., :0); test pattern when omitted
        #[arg(short, long)]
        display: Option<String>,

        #[command(flatten)]
        settings: DisplaySettings,

        #[command(flatten)]
        options: ViewOptions,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("x11rb=warn".parse().context("bad log directive")?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            width,
            height,
            settings,
        } => run_resolve(Size::new(width, height), &settings),
        Commands::View {
            display,
            settings,
            options,
        } => viewer::run_viewer(display.as_deref(), settings, options).await,
    }
}

fn run_resolve(physical: Size, display_settings: &DisplaySettings) -> Result<()> {
    let config = settings::resolution_config(Some(display_settings));
    let logical = resolution::configure_resolution(&config, physical)
        .context("invalid resolution settings")?;
    let m = resolution::measure(physical, logical);

    println!("physical:     {}", physical);
    println!("logical:      {}", logical);
    println!("presentation: {}", m.presentation);
    match m.fixed_buffer {
        Some(buffer) => println!("buffer:       {}", buffer),
        None => println!("buffer:       (host default)"),
    }
    Ok(())
}
