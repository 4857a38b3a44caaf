#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use axum::{Json, Router, routing};
use postchain::http::NodeApi;
use postchain::{Block, ChainDump, Node, NodeSettings};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;

pub const DIFFICULTY: usize = 2;

/// A node served on an ephemeral port, plus a client to drive it over HTTP.
pub struct TestNode {
    pub node: Arc<Node>,
    pub url: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
pub struct MineResponse {
    pub index: Option<u64>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ConsensusResponse {
    pub replaced: bool,
    pub length: usize,
}

impl TestNode {
    pub async fn spawn() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}", listener.local_addr()?);

        let node = Arc::new(Node::new(NodeSettings::new(url.clone(), DIFFICULTY))?);
        let api = NodeApi::new(Arc::clone(&node));
        tokio::spawn(api.run(listener));

        Ok(Self {
            node,
            url,
            http: reqwest::Client::new(),
        })
    }

    pub async fn post_transaction(&self, author: &str, content: &str) -> Result<reqwest::StatusCode> {
        let response = self
            .http
            .post(format!("{}/new_transaction", self.url))
            .json(&json!({ "author": author, "content": content }))
            .send()
            .await?;
        Ok(response.status())
    }

    pub async fn mine(&self) -> Result<MineResponse> {
        Ok(self
            .http
            .get(format!("{}/mine", self.url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    /// Queue one post and mine it, `blocks` times.
    pub async fn mine_blocks(&self, blocks: usize) -> Result<()> {
        for n in 0..blocks {
            self.post_transaction("miner", &format!("post {n} from {}", self.url))
                .await?;
            self.mine().await?;
        }
        Ok(())
    }

    pub async fn chain(&self) -> Result<ChainDump> {
        Ok(self
            .http
            .get(format!("{}/chain", self.url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    pub async fn pending(&self) -> Result<Vec<serde_json::Value>> {
        Ok(self
            .http
            .get(format!("{}/pending_tx", self.url))
            .send()
            .await?
            .json()
            .await?)
    }

    pub async fn peers(&self) -> Result<Vec<String>> {
        Ok(self
            .http
            .get(format!("{}/peers", self.url))
            .send()
            .await?
            .json()
            .await?)
    }

    /// Ask this node to register itself with `remote`.
    pub async fn register_with(&self, remote: &str) -> Result<reqwest::Response> {
        Ok(self
            .http
            .post(format!("{}/register_with", self.url))
            .json(&json!({ "node_address": remote }))
            .send()
            .await?)
    }

    /// Tell this node about `peer` without syncing anything.
    pub async fn add_peer(&self, peer: &str) -> Result<()> {
        self.http
            .post(format!("{}/register_node", self.url))
            .json(&json!({ "node_address": peer }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn health(&self) -> Result<serde_json::Value> {
        Ok(self
            .http
            .get(format!("{}/health", self.url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    pub async fn consensus(&self) -> Result<ConsensusResponse> {
        Ok(self
            .http
            .post(format!("{}/consensus", self.url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    pub async fn add_block(&self, block: &Block) -> Result<reqwest::StatusCode> {
        let response = self
            .http
            .post(format!("{}/add_block", self.url))
            .json(block)
            .send()
            .await?;
        Ok(response.status())
    }
}

/// Serve a fixed chain on `GET /chain` and `POST /register_node`, the way a
/// misbehaving peer would.
pub async fn spawn_static_peer(chain: Vec<Block>) -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}", listener.local_addr()?);

    let dump = ChainDump {
        length: chain.len(),
        chain,
        peers: Vec::new(),
    };
    let serve_dump = move || {
        let dump = dump.clone();
        async move { Json(dump) }
    };
    let router = Router::new()
        .route("/chain", routing::get(serve_dump.clone()))
        .route("/register_node", routing::post(serve_dump));
    tokio::spawn(async move { axum::serve(listener, router).await });

    Ok(url)
}

/// An address nothing is listening on.
pub async fn unreachable_address() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}", listener.local_addr()?);
    drop(listener);
    Ok(url)
}
