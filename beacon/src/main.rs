//! Morse beacon command line

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use beacon::{
    parse_scale, AnyTorch, Command, ConsoleTorch, LedTorch, LineParser, LiveTiming, Preferences,
    Session,
};

#[derive(Parser)]
#[command(name = "beacon")]
#[command(about = "Emit a phrase as looping Morse code on a torch, LED or the console")]
#[command(version)]
struct Cli {
    /// Phrase to start emitting immediately
    phrase: Option<String>,

    /// Speed scale 1-10 (unit period 100-1000 ms)
    #[arg(short, long)]
    speed: Option<String>,

    /// Loop scale 1-10 (pause 1-10 s before repeating)
    #[arg(short = 'l', long = "loop")]
    loop_scale: Option<String>,

    /// LED class device name or brightness file to drive instead of the console
    #[arg(long)]
    led: Option<String>,

    /// Preferences file (defaults to the user config directory)
    #[arg(long)]
    prefs: Option<PathBuf>,

    /// Store the effective speed and loop settings on exit
    #[arg(long)]
    save: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("beacon=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let prefs_path = cli.prefs.clone().or_else(Preferences::default_path);
    let prefs = prefs_path
        .as_deref()
        .map(Preferences::load)
        .unwrap_or_default();

    let mut config = prefs.timing();
    if let Some(raw) = &cli.speed {
        config.speed_scale = parse_scale(raw);
    }
    if let Some(raw) = &cli.loop_scale {
        config.loop_scale = parse_scale(raw);
    }
    info!(
        unit_ms = config.speed_ms(),
        loop_ms = config.loop_ms(),
        "morse beacon v{}",
        env!("CARGO_PKG_VERSION")
    );

    let torch = match &cli.led {
        Some(device) => AnyTorch::Led(LedTorch::new(device)),
        None => AnyTorch::Console(ConsoleTorch::stdout()),
    };
    let timing = Arc::new(LiveTiming::new(config));
    let mut session = Session::new(torch, timing.clone());

    let mut parser = LineParser::new();
    if let Some(phrase) = &cli.phrase {
        // an empty line re-toggles this phrase
        parser.remember(phrase);
        session.toggle(phrase)?;
    } else {
        println!("Type a phrase and press Enter to emit; Enter again stops.");
        println!("Commands: :speed N, :loop N, :stop, :quit");
    }

    let (tx, rx) = mpsc::channel(16);

    let input_tx = tx.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if input_tx.send(parser.parse(&line)).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(%err, "stdin closed");
                    break;
                }
            }
        }
    });

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tx.send(Command::Shutdown).await.ok();
        }
    });

    if let Err(err) = session.run(rx).await {
        error!(%err, "emission aborted");
        return Err(err.into());
    }

    if cli.save {
        match &prefs_path {
            Some(path) => {
                Preferences::from_timing(timing.snapshot()).save(path)?;
                info!(path = %path.display(), "preferences saved");
            }
            None => warn!("no preferences location, settings not saved"),
        }
    }

    Ok(())
}
