use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::error::{ChainError, NodeError, RegistrationError};
use crate::node::{ConsensusOutcome, MineOutcome, Node};
use crate::types::{Block, ChainDump, NewTransaction, NodeAddress, Transaction};

/// JSON error body returned by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    pub detail: Option<String>,
}

impl ApiError {
    fn new(status: StatusCode, message: &str, detail: Option<String>) -> Self {
        Self {
            status: status.as_u16(),
            message: message.to_owned(),
            detail,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(self),
        )
            .into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(value: ChainError) -> Self {
        match value {
            ChainError::MissingField(_) => {
                Self::new(StatusCode::BAD_REQUEST, "invalid transaction", Some(value.to_string()))
            }
            ChainError::SerializationError(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "serialization failed",
                Some(value.to_string()),
            ),
            _ => Self::new(
                StatusCode::BAD_REQUEST,
                "the block was discarded by the node",
                Some(value.to_string()),
            ),
        }
    }
}

impl From<NodeError> for ApiError {
    fn from(value: NodeError) -> Self {
        match value {
            NodeError::Chain(e) => Self::new(
                StatusCode::CONFLICT,
                "mined block was discarded",
                Some(e.to_string()),
            ),
            NodeError::Worker(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "mining failed",
                Some(value.to_string()),
            ),
        }
    }
}

impl From<RegistrationError> for ApiError {
    fn from(value: RegistrationError) -> Self {
        let status = match value {
            RegistrationError::MissingAddress | RegistrationError::SelfRegistration => {
                StatusCode::BAD_REQUEST
            }
            RegistrationError::Peer(_) => StatusCode::BAD_GATEWAY,
            RegistrationError::Replay(_) => StatusCode::CONFLICT,
        };
        Self::new(status, "registration failed", Some(value.to_string()))
    }
}

/// HTTP API through which clients and other nodes talk to a [`Node`].
pub struct NodeApi {
    router: Router,
}

impl NodeApi {
    #[must_use]
    pub fn new(node: Arc<Node>) -> Self {
        let router = Router::new()
            .route("/chain", routing::get(get_chain))
            .route("/new_transaction", routing::post(new_transaction))
            .route("/mine", routing::get(mine).post(mine))
            .route("/pending_tx", routing::get(pending_transactions))
            .route("/register_node", routing::post(register_node))
            .route("/register_with", routing::post(register_with))
            .route("/add_block", routing::post(add_block))
            .route("/peers", routing::get(get_peers))
            .route("/consensus", routing::post(consensus))
            .route("/health", routing::get(health_check))
            .layer(TraceLayer::new_for_http())
            .with_state(node);

        Self { router }
    }

    /// Serve until the listener fails.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        axum::serve(listener, self.router).await
    }
}

async fn get_chain(State(node): State<Arc<Node>>) -> Json<ChainDump> {
    Json(node.chain_dump().await)
}

async fn new_transaction(
    State(node): State<Arc<Node>>,
    Json(tx): Json<NewTransaction>,
) -> Result<impl IntoResponse, ApiError> {
    node.submit_transaction(tx).await?;
    Ok((StatusCode::CREATED, "Success"))
}

#[derive(Serialize)]
struct MineResponse {
    index: Option<u64>,
    message: String,
}

async fn mine(State(node): State<Arc<Node>>) -> Result<Json<MineResponse>, ApiError> {
    let response = match node.mine_and_announce().await? {
        MineOutcome::NothingToMine => MineResponse {
            index: None,
            message: "nothing to mine".to_owned(),
        },
        MineOutcome::Mined(block) => MineResponse {
            index: Some(block.index),
            message: format!("Block #{} is mined.", block.index),
        },
    };
    Ok(Json(response))
}

async fn pending_transactions(State(node): State<Arc<Node>>) -> Json<Vec<Transaction>> {
    Json(node.pending_transactions().await)
}

async fn register_node(
    State(node): State<Arc<Node>>,
    Json(body): Json<NodeAddress>,
) -> Result<Json<ChainDump>, ApiError> {
    Ok(Json(node.register_peer(&body.node_address).await?))
}

#[derive(Serialize)]
struct RegisterWithResponse {
    message: &'static str,
    length: usize,
}

async fn register_with(
    State(node): State<Arc<Node>>,
    Json(body): Json<NodeAddress>,
) -> Result<Json<RegisterWithResponse>, ApiError> {
    let length = node.register_with(&body.node_address).await?;
    Ok(Json(RegisterWithResponse {
        message: "Registration successful",
        length,
    }))
}

async fn add_block(
    State(node): State<Arc<Node>>,
    Json(block): Json<Block>,
) -> Result<impl IntoResponse, ApiError> {
    node.accept_block(block).await?;
    Ok((StatusCode::CREATED, "Block added to the chain"))
}

async fn get_peers(State(node): State<Arc<Node>>) -> Json<Vec<String>> {
    Json(node.peers().await)
}

#[derive(Serialize)]
struct ConsensusResponse {
    replaced: bool,
    length: usize,
}

async fn consensus(State(node): State<Arc<Node>>) -> Json<ConsensusResponse> {
    let replaced = matches!(
        node.resolve_conflicts().await,
        ConsensusOutcome::Replaced { .. }
    );
    Json(ConsensusResponse {
        replaced,
        length: node.chain_len().await,
    })
}

#[derive(Serialize)]
struct HealthResponse {
    length: usize,
    pending: usize,
    peers: usize,
    difficulty: usize,
    mining: Option<u64>,
}

async fn health_check(State(node): State<Arc<Node>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        length: node.chain_len().await,
        pending: node.pending_transactions().await.len(),
        peers: node.peers().await.len(),
        difficulty: node.difficulty(),
        mining: node.mining_index(),
    })
}
