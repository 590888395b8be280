use clap::Parser;

/// Vitals monitor CLI arguments. Each flag overrides its environment
/// counterpart.
#[derive(Debug, Parser)]
#[command(
    name = "vitals-monitor",
    version,
    about = "Real-time vitals ingestion, alert evaluation, and dashboard fan-out"
)]
pub struct Cli {
    /// SQLite database URL
    #[arg(long)]
    pub database_url: Option<String>,

    /// Address to bind the HTTP/WebSocket server on
    #[arg(long)]
    pub bind_addr: Option<String>,

    /// Change-poller interval in seconds
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Enable the background change poller
    #[arg(long)]
    pub enable_poller: bool,
}
