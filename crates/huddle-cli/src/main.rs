mod room;

use anyhow::{bail, Context, Result};
use huddle_core::HuddleConfig;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: huddle <meeting-id> [--staff <staff-id>]";

struct Args {
    meeting_id: i64,
    staff_id: Option<i64>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut meeting_id = None;
    let mut staff_id = None;
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => bail!(USAGE),
            "--staff" | "-s" => {
                let v = args.next().context("--staff needs a value")?;
                staff_id = Some(v.parse().with_context(|| format!("invalid staff id '{v}'"))?);
            }
            _ if meeting_id.is_none() => {
                meeting_id = Some(
                    arg.parse()
                        .with_context(|| format!("invalid meeting id '{arg}'"))?,
                );
            }
            _ => bail!("unexpected argument '{arg}'\n{USAGE}"),
        }
    }
    let Some(meeting_id) = meeting_id else {
        bail!(USAGE)
    };
    Ok(Args {
        meeting_id,
        staff_id,
    })
}

/// Log to `~/.huddle/huddle.log`; the terminal belongs to the UI.
fn init_logging() -> Result<()> {
    let path = HuddleConfig::resolve_path("huddle.log");
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("HUDDLE_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
    Ok(())
}

/// Falls back to the defaults, logging the load error.
fn config_or_default(loaded: Result<HuddleConfig>) -> HuddleConfig {
    loaded.unwrap_or_else(|e| {
        warn!("config load failed, using defaults: {:#}", e);
        HuddleConfig::default()
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    // HUDDLE_* defaults may live in a .env file
    dotenvy::dotenv().ok();
    init_logging()?;
    let config = config_or_default(HuddleConfig::load());
    room::run(config, args.meeting_id, args.staff_id).await
}
