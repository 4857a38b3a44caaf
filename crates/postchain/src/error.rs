use std::fmt;

/// Errors that can occur while validating or mutating the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    MissingField(&'static str),
    InvalidPreviousHash { expected: String, got: String },
    InvalidProof,
    MissingHash { index: u64 },
    InvalidChain { index: u64, reason: String },
    EmptyChain,
    UnreachableDifficulty(usize),
    SerializationError(String),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing required field: {field}"),
            Self::InvalidPreviousHash { expected, got } => {
                write!(f, "previous hash does not match tip: expected {expected}, got {got}")
            }
            Self::InvalidProof => write!(f, "proof of work is invalid"),
            Self::MissingHash { index } => write!(f, "block {index} carries no hash"),
            Self::InvalidChain { index, reason } => {
                write!(f, "chain invalid at block {index}: {reason}")
            }
            Self::EmptyChain => write!(f, "chain has no genesis block"),
            Self::UnreachableDifficulty(d) => write!(
                f,
                "difficulty {d} exceeds the {} hex digits of a hash",
                crate::crypto::MAX_DIFFICULTY
            ),
            Self::SerializationError(msg) => write!(f, "serialization error: {msg}"),
        }
    }
}

impl std::error::Error for ChainError {}

/// A chain dump could not be replayed; `index` is the first rejected block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayError {
    pub index: u64,
    pub source: ChainError,
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "replay aborted at block {}: {}", self.index, self.source)
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Failure talking to a single peer.
#[derive(Debug)]
pub enum PeerError {
    Transport(reqwest::Error),
    Status { peer: String, status: u16 },
}

impl fmt::Display for PeerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "peer request failed: {e}"),
            Self::Status { peer, status } => write!(f, "peer {peer} answered with status {status}"),
        }
    }
}

impl std::error::Error for PeerError {}

impl From<reqwest::Error> for PeerError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e)
    }
}

/// Why a `register_with` attempt was aborted. Local state is untouched in every case.
#[derive(Debug)]
pub enum RegistrationError {
    MissingAddress,
    SelfRegistration,
    Peer(PeerError),
    Replay(ReplayError),
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAddress => write!(f, "no remote address given"),
            Self::SelfRegistration => write!(f, "cannot register with our own address"),
            Self::Peer(e) => write!(f, "registration failed: {e}"),
            Self::Replay(e) => write!(f, "remote chain rejected: {e}"),
        }
    }
}

impl std::error::Error for RegistrationError {}

impl From<PeerError> for RegistrationError {
    fn from(e: PeerError) -> Self {
        Self::Peer(e)
    }
}

impl From<ReplayError> for RegistrationError {
    fn from(e: ReplayError) -> Self {
        Self::Replay(e)
    }
}

/// Errors surfaced by node-level operations.
#[derive(Debug)]
pub enum NodeError {
    Chain(ChainError),
    Worker(String),
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chain(e) => write!(f, "{e}"),
            Self::Worker(msg) => write!(f, "mining worker failed: {msg}"),
        }
    }
}

impl std::error::Error for NodeError {}

impl From<ChainError> for NodeError {
    fn from(e: ChainError) -> Self {
        Self::Chain(e)
    }
}
