use serde::{Deserialize, Serialize};

/// `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// A post recorded on the chain. Fields are declared in alphabetical order,
/// which is the canonical order used when hashing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub author: String,
    pub content: String,
    /// Unix timestamp (seconds) stamped by the receiving node.
    pub timestamp: u64,
}

/// A transaction as submitted by a client, before the node stamps it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewTransaction {
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl NewTransaction {
    #[must_use]
    pub fn new(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            author: Some(author.into()),
            content: Some(content.into()),
        }
    }
}

/// A block in the chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub transactions: Vec<Transaction>,
    pub timestamp: u64,
    pub previous_hash: String,
    pub nonce: u64,
    /// SHA-256 hex digest of every other field. Set only once the block is accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl Block {
    /// A candidate block that has not been mined yet.
    #[must_use]
    pub const fn new(
        index: u64,
        transactions: Vec<Transaction>,
        timestamp: u64,
        previous_hash: String,
    ) -> Self {
        Self {
            index,
            transactions,
            timestamp,
            previous_hash,
            nonce: 0,
            hash: None,
        }
    }
}

/// Full chain dump, as served by `GET /chain`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainDump {
    pub length: usize,
    pub chain: Vec<Block>,
    #[serde(default)]
    pub peers: Vec<String>,
}

/// Body of `POST /register_node` and `POST /register_with`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeAddress {
    #[serde(default)]
    pub node_address: String,
}

/// Current unix time in seconds.
#[must_use]
pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}
