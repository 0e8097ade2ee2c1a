//! In-process ledger
//!
//! Keeps per-account transaction logs and fans new transactions out to
//! subscribers. Used by tests and local simulations of multi-hop routes.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use hopswap_core::{Address, LedgerError, LogicalTime, TxId};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::Mutex;

use crate::{
    InboundMessage, Ledger, LedgerTransaction, OutboundMessage, Result, SettlementHandle,
    TransactionStream,
};

const FEED_CAPACITY: usize = 256;

/// Transactions of `account` at or after `since`, in logical-time order
fn account_log(inner: &Inner, account: &Address, since: LogicalTime) -> Vec<LedgerTransaction> {
    inner
        .transactions
        .get(account)
        .map(|txs| {
            txs.iter()
                .filter(|tx| tx.logical_time >= since)
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

struct Inner {
    transactions: HashMap<Address, Vec<LedgerTransaction>>,
    next_logical_time: LogicalTime,
    sent: Vec<OutboundMessage>,
    reject_next: Option<String>,
}

/// Ledger kept entirely in memory
pub struct MemoryLedger {
    inner: Arc<Mutex<Inner>>,
    feed: broadcast::Sender<LedgerTransaction>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                transactions: HashMap::new(),
                next_logical_time: 1,
                sent: Vec::new(),
                reject_next: None,
            })),
            feed,
        }
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settle a transaction on `account` triggered by a message from `source`
    pub async fn push_transaction(
        &self,
        account: &Address,
        source: &Address,
        body: Vec<u8>,
    ) -> LedgerTransaction {
        let mut inner = self.inner.lock().await;
        let logical_time = inner.next_logical_time;
        inner.next_logical_time += 1;

        let tx = LedgerTransaction {
            id: TxId::new(format!("{:064x}", logical_time)),
            account: account.clone(),
            logical_time,
            in_message: Some(InboundMessage {
                source: source.clone(),
                body,
            }),
            aborted: false,
        };
        inner
            .transactions
            .entry(account.clone())
            .or_default()
            .push(tx.clone());

        // Sent under the lock so a concurrent subscribe sees it exactly once.
        let _ = self.feed.send(tx.clone());
        tx
    }

    /// Make the signing layer decline the next message
    pub async fn reject_next_message(&self, reason: impl Into<String>) {
        self.inner.lock().await.reject_next = Some(reason.into());
    }

    /// Messages accepted so far, in submission order
    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.inner.lock().await.sent.clone()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn last_logical_time(&self, account: &Address) -> Result<LogicalTime> {
        let inner = self.inner.lock().await;
        Ok(inner
            .transactions
            .get(account)
            .and_then(|txs| txs.last())
            .map(|tx| tx.logical_time)
            .unwrap_or(0))
    }

    async fn send_message(&self, message: OutboundMessage) -> Result<SettlementHandle> {
        let mut inner = self.inner.lock().await;
        if let Some(reason) = inner.reject_next.take() {
            return Err(LedgerError::Rejected { reason });
        }
        inner.sent.push(message);
        Ok(SettlementHandle {
            message_hash: format!("{:064x}", inner.sent.len()),
        })
    }

    async fn subscribe_transactions(
        &self,
        account: &Address,
        since: LogicalTime,
    ) -> Result<TransactionStream> {
        let inner = self.inner.lock().await;
        let backlog = VecDeque::from(account_log(&inner, account, since));
        let receiver = self.feed.subscribe();
        drop(inner);

        let follow = Follow {
            receiver,
            backlog,
            next_wanted: since,
            account: account.clone(),
            log: self.inner.clone(),
        };
        Ok(stream::unfold(follow, |mut follow| async move {
            let tx = follow.next().await?;
            Some((tx, follow))
        })
        .boxed())
    }
}

/// Subscription cursor. Delivers each logical time at most once and refills
/// from the stored log when the live feed lags.
struct Follow {
    receiver: broadcast::Receiver<LedgerTransaction>,
    backlog: VecDeque<LedgerTransaction>,
    next_wanted: LogicalTime,
    account: Address,
    log: Arc<Mutex<Inner>>,
}

impl Follow {
    async fn next(&mut self) -> Option<LedgerTransaction> {
        loop {
            if let Some(tx) = self.backlog.pop_front() {
                self.next_wanted = tx.logical_time + 1;
                return Some(tx);
            }
            match self.receiver.recv().await {
                Ok(tx) if tx.account == self.account && tx.logical_time >= self.next_wanted => {
                    self.next_wanted = tx.logical_time + 1;
                    return Some(tx);
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        "Transaction feed lagged by {} entries, replaying {} from logical time {}",
                        skipped,
                        self.account,
                        self.next_wanted
                    );
                    let inner = self.log.lock().await;
                    self.backlog = account_log(&inner, &self.account, self.next_wanted).into();
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
