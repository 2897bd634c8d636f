use clap::{Args, Parser, Subcommand};
use inkslate_cli::{App, AppConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "inkslate")]
#[command(version, about = "Record freehand drawing sessions and render them")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay an input script (one JSON event per line) into a new session
    Record {
        script: PathBuf,

        /// JSON options file
        #[arg(long, value_name = "FILE")]
        options: Option<PathBuf>,

        /// Write the session JSON here
        #[arg(long, value_name = "FILE")]
        session: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Render a saved session file
    Render {
        session: PathBuf,

        /// Also write one PNG per animation frame into this directory
        #[arg(long, value_name = "DIR")]
        frames: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// List keyboard shortcuts
    Shortcuts,
}

#[derive(Args, Debug)]
struct OutputArgs {
    #[arg(long, default_value_t = 800)]
    width: u32,

    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Write a PNG of the surface here
    #[arg(long, value_name = "FILE")]
    png: Option<PathBuf>,

    /// Write an SVG export here
    #[arg(long, value_name = "FILE")]
    svg: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Record {
            script,
            options,
            session,
            output,
        } => {
            log::info!("Recording {}", script.display());
            let config = AppConfig {
                width: output.width,
                height: output.height,
                options,
                session_out: session,
                png_out: output.png,
                svg_out: output.svg,
            };
            let mut app = App::new(config, script.parent())?;
            app.record(&script)?;
            app.write_outputs()?;
        }
        Command::Render {
            session,
            frames,
            output,
        } => {
            let config = AppConfig {
                width: output.width,
                height: output.height,
                png_out: output.png,
                svg_out: output.svg,
                ..AppConfig::default()
            };
            inkslate_cli::render_file(&session, &config)?;
            if let Some(dir) = frames {
                let mut app = App::new(config, session.parent())?;
                app.load(&session)?;
                app.write_animation_frames(&dir)?;
            }
        }
        Command::Shortcuts => inkslate_cli::print_shortcuts(),
    }

    Ok(())
}
