use crate::crypto;
use crate::error::{ChainError, ReplayError};
use crate::types::{Block, ChainDump, GENESIS_PREVIOUS_HASH};

/// The blockchain: an ordered list of accepted blocks mined at a fixed difficulty.
#[derive(Clone, Debug)]
pub struct Chain {
    blocks: Vec<Block>,
    difficulty: usize,
}

impl Chain {
    /// Create a chain holding only the genesis block.
    ///
    /// The genesis block has fixed contents (index 0, no transactions,
    /// timestamp 0, previous hash `"0"`), so every node mining at the same
    /// difficulty derives the same genesis hash.
    pub fn new(difficulty: usize) -> Result<Self, ChainError> {
        Ok(Self {
            blocks: vec![genesis_block(difficulty)?],
            difficulty,
        })
    }

    /// Rebuild a chain from a peer's dump.
    ///
    /// The dump's genesis is skipped and recreated locally; every later block
    /// is replayed through [`Chain::add_block`] exactly as an announced block
    /// would be. The first rejected block aborts the replay.
    pub fn from_dump(dump: Vec<Block>, difficulty: usize) -> Result<Self, ReplayError> {
        let mut chain = Self::new(difficulty).map_err(|source| ReplayError { index: 0, source })?;

        for mut block in dump.into_iter().skip(1) {
            let index = block.index;
            let proof = block.hash.take().ok_or(ReplayError {
                index,
                source: ChainError::MissingHash { index },
            })?;
            chain
                .add_block(block, proof)
                .map_err(|source| ReplayError { index, source })?;
        }

        Ok(chain)
    }

    /// Verify `proof` and append the block. Returns the new block's index.
    ///
    /// Nothing is mutated when the block does not extend the current tip or
    /// the proof does not hold.
    pub fn add_block(&mut self, mut block: Block, proof: String) -> Result<u64, ChainError> {
        let tip_hash = self.tip_hash();
        if block.previous_hash != tip_hash {
            return Err(ChainError::InvalidPreviousHash {
                expected: tip_hash.to_owned(),
                got: block.previous_hash,
            });
        }

        if !crypto::is_valid_proof(&block, &proof, self.difficulty) {
            return Err(ChainError::InvalidProof);
        }

        let index = block.index;
        block.hash = Some(proof);
        self.blocks.push(block);
        Ok(index)
    }

    /// Swap in a whole new block list after validating it.
    pub fn replace(&mut self, blocks: Vec<Block>) -> Result<(), ChainError> {
        check_chain_validity(&blocks, self.difficulty)?;
        self.blocks = blocks;
        Ok(())
    }

    /// Whether this chain passes [`check_chain_validity`].
    #[must_use]
    pub fn is_valid_chain(&self) -> bool {
        check_chain_validity(&self.blocks, self.difficulty).is_ok()
    }

    /// The latest accepted block.
    #[must_use]
    pub fn tip(&self) -> &Block {
        self.blocks
            .last()
            .expect("chain always has at least the genesis block")
    }

    /// Stored hash of the latest block.
    #[must_use]
    pub fn tip_hash(&self) -> &str {
        self.tip().hash.as_deref().unwrap_or_default()
    }

    /// Number of blocks, genesis included.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    #[must_use]
    pub const fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Serialisable dump of the chain together with the given peers.
    #[must_use]
    pub fn dump(&self, peers: Vec<String>) -> ChainDump {
        ChainDump {
            length: self.blocks.len(),
            chain: self.blocks.clone(),
            peers,
        }
    }
}

/// Build and mine the genesis block.
pub fn genesis_block(difficulty: usize) -> Result<Block, ChainError> {
    let mut genesis = Block::new(0, Vec::new(), 0, GENESIS_PREVIOUS_HASH.to_owned());
    let hash = crypto::proof_of_work(&mut genesis, difficulty)?;
    genesis.hash = Some(hash);
    Ok(genesis)
}

/// Walk `blocks` from the genesis block and fail on the first broken link or proof.
///
/// The genesis block is accepted as is. Every later block must carry a
/// stored hash that is a valid proof for its other fields and must point at
/// the stored hash of the block before it.
pub fn check_chain_validity(blocks: &[Block], difficulty: usize) -> Result<(), ChainError> {
    let (genesis, rest) = blocks.split_first().ok_or(ChainError::EmptyChain)?;
    let mut previous_hash = genesis.hash.as_deref();

    for (index, block) in (1u64..).zip(rest) {
        let hash = block
            .hash
            .as_deref()
            .ok_or(ChainError::MissingHash { index })?;

        if !crypto::is_valid_proof(block, hash, difficulty) {
            return Err(ChainError::InvalidChain {
                index,
                reason: "proof of work is invalid".into(),
            });
        }

        if previous_hash != Some(block.previous_hash.as_str()) {
            return Err(ChainError::InvalidChain {
                index,
                reason: "previous hash does not match".into(),
            });
        }

        previous_hash = Some(hash);
    }

    Ok(())
}
