use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::chain::Chain;
use crate::config::NodeSettings;
use crate::crypto;
use crate::error::{ChainError, NodeError, RegistrationError};
use crate::network::{self, PeerClient};
use crate::peers::{self, PeerRegistry};
use crate::pool::TransactionPool;
use crate::types::{Block, ChainDump, NewTransaction, Transaction, current_timestamp};

/// The chain and the pool, always locked together so that appends and pool
/// drains cannot interleave.
#[derive(Debug)]
pub struct Ledger {
    pub chain: Chain,
    pub pool: TransactionPool,
}

/// Result of a mining request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MineOutcome {
    /// The pool was empty; nothing changed.
    NothingToMine,
    /// The block was appended to the local chain.
    Mined(Block),
}

/// Result of a consensus pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsensusOutcome {
    Unchanged,
    Replaced { peer: String, length: usize },
}

/// A participating node: its ledger, the peers it knows, and a client to reach them.
#[derive(Debug)]
pub struct Node {
    ledger: Mutex<Ledger>,
    peers: RwLock<PeerRegistry>,
    /// Held for the whole of a mining call so only one candidate is in flight.
    mining: Mutex<()>,
    /// Index of the block under the nonce search, 0 while idle.
    mining_index: AtomicU64,
    client: PeerClient,
    public_url: String,
    difficulty: usize,
}

impl Node {
    /// Create a node with a fresh chain (genesis only), an empty pool and no peers.
    pub fn new(settings: NodeSettings) -> Result<Self, ChainError> {
        let chain = Chain::new(settings.difficulty)?;
        tracing::info!(
            difficulty = settings.difficulty,
            genesis = chain.tip_hash(),
            "chain initialized with genesis block"
        );

        Ok(Self {
            ledger: Mutex::new(Ledger {
                chain,
                pool: TransactionPool::new(),
            }),
            peers: RwLock::new(PeerRegistry::new()),
            mining: Mutex::new(()),
            mining_index: AtomicU64::new(0),
            client: PeerClient::new(settings.peer_timeout),
            public_url: peers::normalize(&settings.public_url).to_owned(),
            difficulty: settings.difficulty,
        })
    }

    #[must_use]
    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    #[must_use]
    pub const fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Full chain dump plus the peers we know.
    pub async fn chain_dump(&self) -> ChainDump {
        let peers = self.peers().await;
        self.ledger.lock().await.chain.dump(peers)
    }

    /// Number of blocks in the local chain.
    pub async fn chain_len(&self) -> usize {
        self.ledger.lock().await.chain.len()
    }

    /// Copy of the local chain.
    pub async fn chain(&self) -> Chain {
        self.ledger.lock().await.chain.clone()
    }

    pub async fn peers(&self) -> Vec<String> {
        self.peers.read().await.addresses()
    }

    pub async fn pending_transactions(&self) -> Vec<Transaction> {
        self.ledger.lock().await.pool.snapshot()
    }

    /// Validate and queue a transaction for the next block.
    #[tracing::instrument(skip(self, tx))]
    pub async fn submit_transaction(&self, tx: NewTransaction) -> Result<(), ChainError> {
        let mut ledger = self.ledger.lock().await;
        ledger.pool.add(tx, current_timestamp())?;
        tracing::debug!(pending = ledger.pool.len(), "queued transaction");
        Ok(())
    }

    /// Index of the block whose nonce search is running, if any.
    #[must_use]
    pub fn mining_index(&self) -> Option<u64> {
        match self.mining_index.load(Ordering::Acquire) {
            0 => None,
            index => Some(index),
        }
    }

    /// Mine every pending transaction into a new block.
    ///
    /// The nonce search runs on a blocking worker without holding the ledger
    /// lock, so submissions and reads continue meanwhile; transactions that
    /// arrive during the search wait for the next call. Once started, the
    /// search runs to completion.
    ///
    /// Mined transactions leave the pool only if the block is appended. If the
    /// tip moved while mining (a peer block or a chain replacement landed),
    /// the append is refused, the transactions stay pooled and the error is
    /// returned.
    #[tracing::instrument(skip(self))]
    pub async fn mine(&self) -> Result<MineOutcome, NodeError> {
        let _mining = self.mining.lock().await;

        let Some((candidate, difficulty)) = self.next_candidate().await else {
            return Ok(MineOutcome::NothingToMine);
        };
        let result = self.search_and_append(candidate, difficulty).await;
        self.mining_index.store(0, Ordering::Release);
        result
    }

    /// A block holding the whole pool on top of the current tip, with the
    /// difficulty to mine it at. `None` when the pool is empty.
    pub(crate) async fn next_candidate(&self) -> Option<(Block, usize)> {
        let ledger = self.ledger.lock().await;
        if ledger.pool.is_empty() {
            return None;
        }
        let tip = ledger.chain.tip();
        let candidate = Block::new(
            tip.index + 1,
            ledger.pool.snapshot(),
            current_timestamp(),
            ledger.chain.tip_hash().to_owned(),
        );
        self.mining_index.store(candidate.index, Ordering::Release);
        Some((candidate, ledger.chain.difficulty()))
    }

    /// Run the nonce search off the runtime, then append the block and drop
    /// its transactions from the pool.
    pub(crate) async fn search_and_append(
        &self,
        candidate: Block,
        difficulty: usize,
    ) -> Result<MineOutcome, NodeError> {
        let mined_count = candidate.transactions.len();
        let (block, proof) = tokio::task::spawn_blocking(move || {
            let mut block = candidate;
            let proof = crypto::proof_of_work(&mut block, difficulty)?;
            Ok::<_, ChainError>((block, proof))
        })
        .await
        .map_err(|e| NodeError::Worker(e.to_string()))??;

        let mut ledger = self.ledger.lock().await;
        match ledger.chain.add_block(block, proof) {
            Ok(index) => {
                ledger.pool.remove_mined(mined_count);
                tracing::info!(index, transactions = mined_count, "mined and appended new block");
                Ok(MineOutcome::Mined(ledger.chain.tip().clone()))
            }
            Err(e) => {
                tracing::warn!("mined block was discarded: {e}");
                Err(e.into())
            }
        }
    }

    /// Mine, then make sure we still hold the longest chain before announcing.
    ///
    /// If a consensus pass replaces the local chain, the new block is not
    /// announced.
    pub async fn mine_and_announce(&self) -> Result<MineOutcome, NodeError> {
        let outcome = self.mine().await?;

        if let MineOutcome::Mined(block) = &outcome {
            match self.resolve_conflicts().await {
                ConsensusOutcome::Unchanged => {
                    self.announce(block).await;
                }
                ConsensusOutcome::Replaced { peer, .. } => {
                    tracing::info!(%peer, "chain replaced after mining; not announcing block");
                }
            }
        }

        Ok(outcome)
    }

    /// Validate a block announced by a peer and append it.
    #[tracing::instrument(skip(self, block), fields(index = block.index))]
    pub async fn accept_block(&self, mut block: Block) -> Result<u64, ChainError> {
        let proof = block
            .hash
            .take()
            .ok_or(ChainError::MissingHash { index: block.index })?;

        let mut ledger = self.ledger.lock().await;
        match ledger.chain.add_block(block, proof) {
            Ok(index) => {
                tracing::info!(index, "appended new block from peer");
                Ok(index)
            }
            Err(e) => {
                tracing::warn!("rejected block from peer: {e}");
                Err(e)
            }
        }
    }

    /// Register a remote node and hand back everything it needs to sync.
    #[tracing::instrument(skip(self))]
    pub async fn register_peer(&self, address: &str) -> Result<ChainDump, RegistrationError> {
        let address = peers::normalize(address);
        if address.is_empty() {
            return Err(RegistrationError::MissingAddress);
        }
        if address != self.public_url {
            self.peers.write().await.insert(address);
        }
        Ok(self.chain_dump().await)
    }

    /// Register with `remote`, adopt its chain and learn its peers.
    ///
    /// Registering with our own public URL is refused before any request is made.
    ///
    /// The remote chain is rebuilt block by block; if any block is rejected
    /// the attempt is aborted and neither the chain nor the peer set changes.
    /// Returns the length of the adopted chain.
    #[tracing::instrument(skip(self))]
    pub async fn register_with(&self, remote: &str) -> Result<usize, RegistrationError> {
        let remote = peers::normalize(remote);
        if remote.is_empty() {
            return Err(RegistrationError::MissingAddress);
        }
        if remote == self.public_url {
            return Err(RegistrationError::SelfRegistration);
        }

        let dump = self.client.register_node(remote, &self.public_url).await?;
        let chain = Chain::from_dump(dump.chain, self.difficulty)?;
        let length = chain.len();

        self.ledger.lock().await.chain = chain;

        let mut peers = self.peers.write().await;
        let learned = peers.extend(dump.peers, Some(self.public_url.as_str()));
        peers.insert(remote);
        drop(peers);

        tracing::info!(length, learned, "registered with remote node");
        Ok(length)
    }

    /// One consensus pass: adopt the longest valid chain among our peers, if
    /// it is longer than ours.
    ///
    /// Peers are polled in ascending address order, so when several peers
    /// offer equally long winning chains the lowest address wins.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_conflicts(&self) -> ConsensusOutcome {
        let peers = self.peers().await;
        if peers.is_empty() {
            return ConsensusOutcome::Unchanged;
        }

        let local_len = self.chain_len().await;
        let Some(candidate) =
            network::resolve(&self.client, &peers, local_len, self.difficulty).await
        else {
            return ConsensusOutcome::Unchanged;
        };

        let mut ledger = self.ledger.lock().await;
        let length = candidate.chain.len();
        if length <= ledger.chain.len() {
            tracing::debug!(peer = %candidate.peer, "local chain caught up while polling peers");
            return ConsensusOutcome::Unchanged;
        }

        match ledger.chain.replace(candidate.chain) {
            Ok(()) => {
                tracing::info!(peer = %candidate.peer, length, "replaced local chain with longer chain");
                ConsensusOutcome::Replaced {
                    peer: candidate.peer,
                    length,
                }
            }
            Err(e) => {
                tracing::warn!(peer = %candidate.peer, "candidate chain rejected: {e}");
                ConsensusOutcome::Unchanged
            }
        }
    }

    /// Push `block` to every known peer. Returns how many accepted it.
    pub async fn announce(&self, block: &Block) -> usize {
        let peers = self.peers().await;
        let accepted = network::announce(&self.client, &peers, block).await;
        tracing::info!(index = block.index, accepted, peers = peers.len(), "announced block");
        accepted
    }

    /// Run [`Node::resolve_conflicts`] every `interval` until the task is aborted.
    pub fn spawn_consensus_task(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let node = Arc::clone(self);
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            // The first tick completes immediately.
            timer.tick().await;
            loop {
                timer.tick().await;
                if let ConsensusOutcome::Replaced { peer, length } = node.resolve_conflicts().await
                {
                    tracing::info!(%peer, length, "background consensus adopted peer chain");
                }
            }
        })
    }
}
