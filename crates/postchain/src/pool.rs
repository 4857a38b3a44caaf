use crate::error::ChainError;
use crate::types::{NewTransaction, Transaction};

/// Transactions accepted by this node but not yet in any block, in arrival order.
#[derive(Clone, Debug, Default)]
pub struct TransactionPool {
    pending: Vec<Transaction>,
}

impl TransactionPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check required fields, stamp `timestamp` and queue the transaction.
    pub fn add(&mut self, tx: NewTransaction, timestamp: u64) -> Result<(), ChainError> {
        let author = required(tx.author, "author")?;
        let content = required(tx.content, "content")?;

        self.pending.push(Transaction {
            author,
            content,
            timestamp,
        });
        Ok(())
    }

    #[must_use]
    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Copy of the current contents, used as the body of a candidate block.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.pending.clone()
    }

    /// Drop the oldest `count` transactions once they have been mined.
    pub fn remove_mined(&mut self, count: usize) {
        let count = count.min(self.pending.len());
        self.pending.drain(..count);
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ChainError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(ChainError::MissingField(field))
}
