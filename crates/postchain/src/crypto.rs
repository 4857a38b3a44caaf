use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::ChainError;
use crate::types::{Block, Transaction};

/// Hex digits in a SHA-256 digest; no hash can have more leading zeros.
pub const MAX_DIFFICULTY: usize = 64;

/// The hashed view of a block: every field except `hash`, in alphabetical order.
#[derive(Serialize)]
struct HashInput<'a> {
    index: u64,
    nonce: u64,
    previous_hash: &'a str,
    timestamp: u64,
    transactions: &'a [Transaction],
}

/// SHA-256 of arbitrary bytes, hex encoded.
#[must_use]
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Hex SHA-256 digest of the block's canonical JSON form. The stored `hash` is never an input.
pub fn compute_hash(block: &Block) -> Result<String, ChainError> {
    let input = HashInput {
        index: block.index,
        nonce: block.nonce,
        previous_hash: &block.previous_hash,
        timestamp: block.timestamp,
        transactions: &block.transactions,
    };
    let encoded =
        serde_json::to_vec(&input).map_err(|e| ChainError::SerializationError(e.to_string()))?;
    Ok(hash_bytes(&encoded))
}

/// True if `hash` starts with `difficulty` zero nibbles.
#[must_use]
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

/// Brute-force a nonce for `block`. The winning nonce is left in the block and
/// its digest returned. Runs until a proof is found.
pub fn proof_of_work(block: &mut Block, difficulty: usize) -> Result<String, ChainError> {
    if difficulty > MAX_DIFFICULTY {
        return Err(ChainError::UnreachableDifficulty(difficulty));
    }
    block.nonce = 0;
    let mut hash = compute_hash(block)?;
    while !meets_difficulty(&hash, difficulty) {
        block.nonce += 1;
        hash = compute_hash(block)?;
    }
    Ok(hash)
}

/// `claimed` is a valid proof for `block` if it meets the difficulty and is the block's digest.
#[must_use]
pub fn is_valid_proof(block: &Block, claimed: &str, difficulty: usize) -> bool {
    meets_difficulty(claimed, difficulty)
        && compute_hash(block).is_ok_and(|computed| computed == claimed)
}
