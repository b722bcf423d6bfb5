/// stlview terminal - orbit an STL model in the terminal
///
/// Controls:
///   - WASD / Arrow Keys: Rotate
///   - IJKL: Pan
///   - +/-: Zoom
///   - R: Reload the file
///   - Q/ESC: Quit
use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use stlview_core::{Color, ViewerConfig};
use stlview_terminal::{PresentMode, TerminalApp};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "stlview-terminal")]
#[command(about = "Render an STL model in the terminal with orbit controls")]
#[command(version)]
struct Args {
    /// STL file to display (path or file:// URL)
    source: String,

    /// Background color (#rgb, #rrggbb or a basic color name)
    #[arg(short, long, default_value = "#f5f5f5")]
    background: Color,

    /// Model color
    #[arg(short, long, default_value = "#00bcd4")]
    color: Color,

    /// Use the ASCII luminosity ramp instead of truecolor half blocks
    #[arg(long)]
    ascii: bool,

    /// Write logs to this file (the screen belongs to the renderer)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn init_logging(args: &Args) -> Result<()> {
    let Some(path) = &args.log_file else {
        return Ok(());
    };

    let file = File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    info!("stlview-terminal v{}", env!("CARGO_PKG_VERSION"));

    let template = ViewerConfig::new(args.source.clone()).with_colors(args.background, args.color);
    let mode = if args.ascii {
        PresentMode::Ascii
    } else {
        PresentMode::HalfBlock
    };

    let mut app = TerminalApp::new(template, mode);
    app.run()?;

    Ok(())
}
