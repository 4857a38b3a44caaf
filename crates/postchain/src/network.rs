use std::time::Duration;

use futures::future::join_all;
use reqwest::Response;

use crate::chain::check_chain_validity;
use crate::error::PeerError;
use crate::types::{Block, ChainDump, NodeAddress};

/// HTTP client for talking to other nodes. Every request is bounded by `timeout`.
#[derive(Clone, Debug)]
pub struct PeerClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl PeerClient {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            timeout,
        }
    }

    /// `GET {peer}/chain`
    pub async fn fetch_chain(&self, peer: &str) -> Result<ChainDump, PeerError> {
        let response = self
            .http
            .get(format!("{peer}/chain"))
            .timeout(self.timeout)
            .send()
            .await?;
        Ok(check_status(peer, response)?.json().await?)
    }

    /// `POST {peer}/register_node`, announcing `own_address`. Returns the peer's chain and peers.
    pub async fn register_node(&self, peer: &str, own_address: &str) -> Result<ChainDump, PeerError> {
        let response = self
            .http
            .post(format!("{peer}/register_node"))
            .json(&NodeAddress {
                node_address: own_address.to_owned(),
            })
            .timeout(self.timeout)
            .send()
            .await?;
        Ok(check_status(peer, response)?.json().await?)
    }

    /// `POST {peer}/add_block`
    pub async fn send_block(&self, peer: &str, block: &Block) -> Result<(), PeerError> {
        let response = self
            .http
            .post(format!("{peer}/add_block"))
            .json(block)
            .timeout(self.timeout)
            .send()
            .await?;
        check_status(peer, response)?;
        Ok(())
    }
}

fn check_status(peer: &str, response: Response) -> Result<Response, PeerError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(PeerError::Status {
            peer: peer.to_owned(),
            status: response.status().as_u16(),
        })
    }
}

/// A longer valid chain found on a peer.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub peer: String,
    pub chain: Vec<Block>,
}

/// Poll every peer's chain concurrently and pick the winner of the longest-valid rule.
///
/// Unreachable or misbehaving peers are logged and skipped.
pub async fn resolve(
    client: &PeerClient,
    peers: &[String],
    local_len: usize,
    difficulty: usize,
) -> Option<Candidate> {
    let fetches = peers.iter().map(|peer| async move {
        let result = client.fetch_chain(peer).await;
        (peer, result)
    });

    let mut chains = Vec::with_capacity(peers.len());
    for (peer, result) in join_all(fetches).await {
        match result {
            Ok(dump) => {
                if dump.length != dump.chain.len() {
                    tracing::debug!(
                        peer = %peer,
                        reported = dump.length,
                        actual = dump.chain.len(),
                        "peer reported a length that differs from its chain"
                    );
                }
                chains.push((peer.clone(), dump.chain));
            }
            Err(e) => tracing::warn!(peer = %peer, "skipping peer during consensus: {e}"),
        }
    }

    select_longest_chain(local_len, chains, difficulty)
}

/// Longest-valid rule over chains already fetched, in the order given.
///
/// A chain replaces the running best only if it is strictly longer and
/// valid, so among equally long winners the first one wins.
#[must_use]
pub fn select_longest_chain(
    local_len: usize,
    chains: Vec<(String, Vec<Block>)>,
    difficulty: usize,
) -> Option<Candidate> {
    let mut best_len = local_len;
    let mut best = None;

    for (peer, chain) in chains {
        if chain.len() <= best_len {
            continue;
        }
        match check_chain_validity(&chain, difficulty) {
            Ok(()) => {
                best_len = chain.len();
                best = Some(Candidate { peer, chain });
            }
            Err(e) => tracing::warn!(peer = %peer, "ignoring longer chain: {e}"),
        }
    }

    best
}

/// Push a freshly mined block to every peer. Fire-and-forget: failures are
/// logged, nothing is retried. Returns how many peers accepted it.
pub async fn announce(client: &PeerClient, peers: &[String], block: &Block) -> usize {
    let sends = peers.iter().map(|peer| async move {
        let result = client.send_block(peer, block).await;
        (peer, result)
    });

    join_all(sends)
        .await
        .into_iter()
        .filter(|(peer, result)| match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(peer = %peer, index = block.index, "peer did not take block: {e}");
                false
            }
        })
        .count()
}
