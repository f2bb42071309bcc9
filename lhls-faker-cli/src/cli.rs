use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Serve a VOD HLS media playlist as if it were a live low-latency stream.
///
/// `/lhls/manifest.m3u8` exposes a sliding window of the playlist and
/// `/lhls/<segment>` holds and paces segments to their airtime. `/live/`
/// serves the source playlist and files unmodified.
#[derive(Parser, Debug)]
#[command(name = "lhls-faker", author, version, about, long_about = None)]
pub struct Args {
    /// Media playlist (.m3u8) to simulate
    #[arg(value_name = "PLAYLIST")]
    pub playlist: PathBuf,

    /// Address to bind the HTTP server to
    #[arg(short, long, env = "LHLS_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind: String,

    /// Port to listen on
    #[arg(short, long, env = "LHLS_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Seconds of not-yet-aired content exposed in the manifest
    #[arg(
        long,
        env = "LHLS_FUTURE_HORIZON",
        default_value = "5",
        value_parser = parse_seconds
    )]
    pub future_horizon: Duration,

    /// Also write daily-rotated log files to this directory
    #[arg(long, env = "LHLS_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value
        .parse()
        .map_err(|e| format!("`{value}` is not a number: {e}"))?;
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| format!("`{value}` is not a valid number of seconds: {e}"))
}
