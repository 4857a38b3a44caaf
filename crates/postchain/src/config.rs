use std::net::SocketAddr;
use std::time::Duration;

use clap::Args;

use crate::crypto::MAX_DIFFICULTY;

/// Number of leading zero hex characters a block hash needs by default.
pub const DEFAULT_DIFFICULTY: usize = 2;

/// Node configuration, read from the command line with environment fallbacks.
#[derive(Args, Clone, Debug)]
pub struct Config {
    /// Address to listen on
    #[arg(short, long, env = "POSTCHAIN_LISTEN", default_value = "127.0.0.1:8000")]
    pub listen: SocketAddr,

    /// Base URL other nodes use to reach this one (defaults to http://<listen address>)
    #[arg(long, env = "POSTCHAIN_PUBLIC_URL")]
    pub public_url: Option<String>,

    /// Leading zero hex characters required of every block hash.
    /// All nodes in a network must agree on this value.
    #[arg(
        short,
        long,
        env = "POSTCHAIN_DIFFICULTY",
        default_value_t = DEFAULT_DIFFICULTY,
        value_parser = parse_difficulty
    )]
    pub difficulty: usize,

    /// Timeout for each request to a peer, in milliseconds
    #[arg(long, env = "POSTCHAIN_PEER_TIMEOUT_MS", default_value_t = 5_000)]
    pub peer_timeout_ms: u64,

    /// Seconds between background consensus passes (0 disables them)
    #[arg(long, env = "POSTCHAIN_CONSENSUS_INTERVAL_SECS", default_value_t = 30)]
    pub consensus_interval_secs: u64,

    /// Node to register with on start-up
    #[arg(long, env = "POSTCHAIN_BOOTSTRAP")]
    pub bootstrap: Option<String>,
}

impl Config {
    /// Settings for a node whose listener ended up bound to `bound`.
    #[must_use]
    pub fn settings(&self, bound: SocketAddr) -> NodeSettings {
        NodeSettings {
            difficulty: self.difficulty,
            public_url: self
                .public_url
                .clone()
                .unwrap_or_else(|| format!("http://{bound}")),
            peer_timeout: Duration::from_millis(self.peer_timeout_ms),
        }
    }

    /// `None` when background consensus is disabled.
    #[must_use]
    pub const fn consensus_interval(&self) -> Option<Duration> {
        match self.consensus_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// What a [`crate::Node`] needs to know about itself.
#[derive(Clone, Debug)]
pub struct NodeSettings {
    pub difficulty: usize,
    /// Address sent to peers when registering; never added to our own peer set.
    pub public_url: String,
    pub peer_timeout: Duration,
}

impl NodeSettings {
    #[must_use]
    pub fn new(public_url: impl Into<String>, difficulty: usize) -> Self {
        Self {
            difficulty,
            public_url: public_url.into(),
            peer_timeout: Duration::from_secs(5),
        }
    }
}

/// Parse a difficulty, refusing values no SHA-256 hex digest can meet.
pub fn parse_difficulty(value: &str) -> Result<usize, String> {
    let difficulty: usize = value.parse().map_err(|e: std::num::ParseIntError| e.to_string())?;
    if difficulty > MAX_DIFFICULTY {
        return Err(format!("must be at most {MAX_DIFFICULTY}"));
    }
    Ok(difficulty)
}
