//! ledger-client: Transport seam between the router and the ledger
//!
//! The ledger settles each hop locally and reports back through internal
//! messages to the sender's account. This crate defines the transport trait
//! the router depends on, the transaction/message shapes it observes, and
//! the codec for the per-hop callbacks pools send back.

pub mod callbacks;
pub mod memory;

use async_trait::async_trait;
use futures::stream::BoxStream;
use hopswap_core::{Address, Amount, LedgerError, LogicalTime, TokenRoot, TxId};
use serde::{Deserialize, Serialize};

pub use callbacks::{
    decode_callback, encode_cancelled, encode_success, DecodeError, HopCallback,
    HOP_CANCELLED_FUNCTION_ID, HOP_SUCCESS_FUNCTION_ID,
};
pub use memory::MemoryLedger;

/// Result type for ledger client operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Live stream of an account's transactions. Dropping it unsubscribes.
pub type TransactionStream = BoxStream<'static, LedgerTransaction>;

/// Message that triggered a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Originating contract (for hop callbacks, the pool)
    pub source: Address,
    pub body: Vec<u8>,
}

/// A transaction processed on an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: TxId,
    pub account: Address,
    pub logical_time: LogicalTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_message: Option<InboundMessage>,
    #[serde(default)]
    pub aborted: bool,
}

/// Token transfer the sender asks the signing layer to submit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub sender: Address,
    /// Token being spent; the transport resolves the sender's wallet for it
    pub spend_root: TokenRoot,
    /// Pool whose token wallet receives the transfer
    pub recipient: Address,
    pub amount: Amount,
    /// Native gas attached for the whole chain
    pub attached_gas: Amount,
    pub payload: Vec<u8>,
}

impl OutboundMessage {
    pub fn payload_hex(&self) -> String {
        hex::encode(&self.payload)
    }
}

/// Receipt for an accepted external message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementHandle {
    pub message_hash: String,
}

/// Ledger transport used by the execution correlator
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Logical time of the account's latest transaction (0 if none)
    async fn last_logical_time(&self, account: &Address) -> Result<LogicalTime>;

    /// Sign and send a message. `LedgerError::Rejected` means the signing
    /// layer declined and nothing reached the ledger.
    async fn send_message(&self, message: OutboundMessage) -> Result<SettlementHandle>;

    /// Stream the account's transactions with logical time `>= since`,
    /// replaying already-settled ones first.
    async fn subscribe_transactions(
        &self,
        account: &Address,
        since: LogicalTime,
    ) -> Result<TransactionStream>;
}
