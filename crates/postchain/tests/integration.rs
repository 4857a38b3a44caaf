mod common;

use anyhow::Result;
use common::{DIFFICULTY, TestNode, spawn_static_peer, unreachable_address};
use postchain::check_chain_validity;
use reqwest::StatusCode;

#[tokio::test]
async fn submit_and_mine_over_http() -> Result<()> {
    let node = TestNode::spawn().await?;

    assert_eq!(node.post_transaction("alice", "hello").await?, StatusCode::CREATED);
    assert_eq!(node.pending().await?.len(), 1);

    let mined = node.mine().await?;
    assert_eq!(mined.index, Some(1));
    assert_eq!(mined.message, "Block #1 is mined.");

    let dump = node.chain().await?;
    assert_eq!(dump.length, 2);
    let block = &dump.chain[1];
    assert_eq!(block.previous_hash, dump.chain[0].hash.clone().unwrap_or_default());
    assert!(block.hash.as_deref().is_some_and(|h| h.starts_with("00")));
    assert_eq!(block.transactions[0].author, "alice");
    assert_eq!(block.transactions[0].content, "hello");
    assert!(node.pending().await?.is_empty());

    let idle = node.mine().await?;
    assert_eq!(idle.index, None);
    assert_eq!(idle.message, "nothing to mine");

    Ok(())
}

#[tokio::test]
async fn transaction_missing_field_is_rejected() -> Result<()> {
    let node = TestNode::spawn().await?;

    let response = reqwest::Client::new()
        .post(format!("{}/new_transaction", node.url))
        .json(&serde_json::json!({ "author": "alice" }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(node.pending().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn registration_syncs_chain_and_peers() -> Result<()> {
    let a = TestNode::spawn().await?;
    let b = TestNode::spawn().await?;
    a.mine_blocks(2).await?;

    let response = b.register_with(&a.url).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let a_chain = a.chain().await?;
    let b_chain = b.chain().await?;
    assert_eq!(b_chain.length, 3);
    assert_eq!(b_chain.chain, a_chain.chain);
    check_chain_validity(&b_chain.chain, DIFFICULTY)?;

    assert_eq!(a.peers().await?, vec![b.url.clone()]);
    assert_eq!(b.peers().await?, vec![a.url.clone()]);

    Ok(())
}

#[tokio::test]
async fn registration_learns_remote_peers() -> Result<()> {
    let a = TestNode::spawn().await?;
    let b = TestNode::spawn().await?;
    let c = TestNode::spawn().await?;

    b.register_with(&a.url).await?.error_for_status()?;
    c.register_with(&a.url).await?.error_for_status()?;

    let mut expected = vec![a.url.clone(), b.url.clone()];
    expected.sort();
    assert_eq!(c.peers().await?, expected);

    Ok(())
}

#[tokio::test]
async fn registration_with_missing_or_dead_address_fails() -> Result<()> {
    let node = TestNode::spawn().await?;

    let response = node.register_with("").await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = node.register_with(&node.url).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = node.register_with(&unreachable_address().await?).await?;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(node.peers().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn registration_with_corrupt_chain_changes_nothing() -> Result<()> {
    let local = TestNode::spawn().await?;
    let honest = TestNode::spawn().await?;
    local.mine_blocks(1).await?;
    honest.mine_blocks(3).await?;

    let mut forged = honest.chain().await?.chain;
    forged[2].transactions[0].content = "rewritten".into();
    let remote = spawn_static_peer(forged).await?;

    let before = local.chain().await?;
    let response = local.register_with(&remote).await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = response.json().await?;
    assert!(
        body["detail"]
            .as_str()
            .is_some_and(|d| d.contains("replay aborted at block 2"))
    );

    let after = local.chain().await?;
    assert_eq!(after.chain, before.chain);
    assert!(local.peers().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn health_reports_node_state() -> Result<()> {
    let node = TestNode::spawn().await?;
    node.mine_blocks(1).await?;
    node.post_transaction("alice", "queued").await?;

    let health = node.health().await?;
    assert_eq!(health["length"], 2);
    assert_eq!(health["pending"], 1);
    assert_eq!(health["peers"], 0);
    assert_eq!(health["difficulty"], DIFFICULTY);
    assert!(health["mining"].is_null());

    Ok(())
}

#[tokio::test]
async fn mined_block_is_announced_to_peers() -> Result<()> {
    let a = TestNode::spawn().await?;
    let b = TestNode::spawn().await?;
    b.register_with(&a.url).await?.error_for_status()?;

    a.mine_blocks(1).await?;

    let a_chain = a.chain().await?;
    let b_chain = b.chain().await?;
    assert_eq!(b_chain.length, 2);
    assert_eq!(b_chain.chain, a_chain.chain);

    Ok(())
}

#[tokio::test]
async fn add_block_rejects_tampered_block() -> Result<()> {
    let a = TestNode::spawn().await?;
    let b = TestNode::spawn().await?;
    a.mine_blocks(1).await?;

    let mut block = a.chain().await?.chain[1].clone();
    block.transactions[0].content = "forged".into();
    assert_eq!(b.add_block(&block).await?, StatusCode::BAD_REQUEST);

    let block = a.chain().await?.chain[1].clone();
    assert_eq!(b.add_block(&block).await?, StatusCode::CREATED);
    assert_eq!(b.chain().await?.length, 2);

    Ok(())
}

#[tokio::test]
async fn consensus_adopts_longest_valid_chain() -> Result<()> {
    let local = TestNode::spawn().await?;
    let p1 = TestNode::spawn().await?;
    let p2 = TestNode::spawn().await?;
    local.mine_blocks(4).await?;
    p1.mine_blocks(7).await?;
    p2.mine_blocks(5).await?;

    local.add_peer(&p1.url).await?;
    local.add_peer(&p2.url).await?;

    let outcome = local.consensus().await?;
    assert!(outcome.replaced);
    assert_eq!(outcome.length, 8);
    assert_eq!(local.chain().await?.chain, p1.chain().await?.chain);

    Ok(())
}

#[tokio::test]
async fn consensus_ignores_longer_invalid_chain() -> Result<()> {
    let local = TestNode::spawn().await?;
    let p1 = TestNode::spawn().await?;
    let honest = TestNode::spawn().await?;
    local.mine_blocks(4).await?;
    p1.mine_blocks(4).await?;
    honest.mine_blocks(6).await?;

    let mut forged = honest.chain().await?.chain;
    forged[3].transactions[0].content = "rewritten".into();
    let p2 = spawn_static_peer(forged).await?;

    local.add_peer(&p1.url).await?;
    local.add_peer(&p2).await?;
    let before = local.chain().await?.chain;

    let outcome = local.consensus().await?;
    assert!(!outcome.replaced);
    assert_eq!(outcome.length, 5);
    assert_eq!(local.chain().await?.chain, before);

    Ok(())
}

#[tokio::test]
async fn consensus_skips_unreachable_peers() -> Result<()> {
    let local = TestNode::spawn().await?;
    let longer = TestNode::spawn().await?;
    longer.mine_blocks(2).await?;

    local.add_peer(&unreachable_address().await?).await?;
    local.add_peer(&longer.url).await?;

    let outcome = local.consensus().await?;
    assert!(outcome.replaced);
    assert_eq!(outcome.length, 3);

    Ok(())
}
