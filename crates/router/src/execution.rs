//! Execution correlator
//!
//! Submits a selected route as a single transfer into the first pool and
//! follows the sender's transaction stream until every hop has reported
//! back. Each execution owns its subscription and its correlation table.
//! Dropping an [`Execution`] unsubscribes.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use hopswap_core::{Address, Amount, CallId, GasConfig, LedgerError, LogicalTime};
use ledger_client::{decode_callback, Ledger, OutboundMessage, TransactionStream};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::correlation::{Correlation, ExecutionOutcome, SlotUpdate, StepStatus};
use crate::payload::RoutePayload;
use crate::state::SwapRoute;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    Building,
    Submitted,
    Correlating,
    Terminal,
}

/// Progress reported to the caller. Exactly one `Terminal` event ends
/// every execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum ExecutionEvent {
    Step {
        step_index: usize,
        status: StepStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount: Option<Amount>,
    },
    Terminal(ExecutionOutcome),
}

impl From<SlotUpdate> for ExecutionEvent {
    fn from(update: SlotUpdate) -> Self {
        Self::Step {
            step_index: update.step_index,
            status: update.status,
            amount: update.amount,
        }
    }
}

/// Submits routes on behalf of one sender account
#[derive(Clone)]
pub struct ExecutionCorrelator {
    ledger: Arc<dyn Ledger>,
    sender: Address,
    gas: GasConfig,
    timeout: Option<Duration>,
}

impl ExecutionCorrelator {
    pub fn new(ledger: Arc<dyn Ledger>, sender: Address, gas: GasConfig) -> Self {
        Self {
            ledger,
            sender,
            gas,
            timeout: None,
        }
    }

    /// Give up correlating after `timeout`. Without one, an execution with
    /// a hop that never reports waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn sender(&self) -> &Address {
        &self.sender
    }

    /// Submit `route` and start correlating its callbacks
    pub async fn execute(&self, route: &SwapRoute) -> Execution {
        let call_id = CallId::generate();
        let correlation = Correlation::new(call_id, route);
        let mut execution = Execution {
            call_id,
            phase: ExecutionPhase::Building,
            correlation,
            transactions: None,
            low_water_mark: 0,
            deadline: None,
            queued: VecDeque::new(),
            finished: false,
        };

        tracing::debug!(
            "Execution {}: building payload for {} hops",
            call_id,
            route.hop_count()
        );

        if let Err(reason) = self.submit(&mut execution, route).await {
            tracing::warn!("Execution {} rejected: {}", call_id, reason);
            execution.finish(ExecutionOutcome::Rejected { reason });
        }
        execution
    }

    async fn submit(&self, execution: &mut Execution, route: &SwapRoute) -> Result<(), String> {
        let call_id = execution.call_id;
        let first = route
            .steps
            .first()
            .ok_or_else(|| "route has no steps".to_string())?;

        let payload = RoutePayload::from_route(call_id, route)
            .and_then(|p| p.encode())
            .map_err(|e| e.to_string())?;

        // Anything at or past this mark can belong to the new operation
        let low_water_mark = self
            .ledger
            .last_logical_time(&self.sender)
            .await
            .map_err(|e| e.to_string())?
            + 1;

        let message = OutboundMessage {
            sender: self.sender.clone(),
            spend_root: first.spend_root.clone(),
            recipient: first.pool.clone(),
            amount: first.amount,
            attached_gas: self.gas.attached_for(route.hop_count()),
            payload,
        };
        tracing::debug!(
            "Execution {}: sending {} {} to {} with gas {}, payload {}",
            call_id,
            message.amount,
            message.spend_root,
            message.recipient,
            message.attached_gas,
            message.payload_hex()
        );

        let handle = self.ledger.send_message(message).await.map_err(|e| match e {
            LedgerError::Rejected { reason } => reason,
            other => other.to_string(),
        })?;
        tracing::debug!(
            "Execution {}: submitted as {}",
            call_id,
            handle.message_hash
        );
        execution.set_phase(ExecutionPhase::Submitted);

        // Past this point the message exists on the ledger, so failures
        // leave the operation unresolved rather than rejected.
        let transactions = match self
            .ledger
            .subscribe_transactions(&self.sender, low_water_mark)
            .await
        {
            Ok(transactions) => transactions,
            Err(e) => {
                tracing::warn!("Execution {}: cannot follow callbacks: {}", call_id, e);
                execution.give_up(&format!("cannot follow callbacks: {}", e));
                return Ok(());
            }
        };

        execution.transactions = Some(transactions);
        execution.low_water_mark = low_water_mark;
        execution.deadline = self.timeout.map(|t| Instant::now() + t);
        execution.set_phase(ExecutionPhase::Correlating);
        Ok(())
    }
}

/// A submitted route being correlated
pub struct Execution {
    call_id: CallId,
    phase: ExecutionPhase,
    correlation: Correlation,
    transactions: Option<TransactionStream>,
    low_water_mark: LogicalTime,
    deadline: Option<Instant>,
    queued: VecDeque<ExecutionEvent>,
    finished: bool,
}

impl Execution {
    pub fn call_id(&self) -> CallId {
        self.call_id
    }

    pub fn phase(&self) -> ExecutionPhase {
        self.phase
    }

    /// Next progress event, or `None` once the terminal event was delivered
    pub async fn next_event(&mut self) -> Option<ExecutionEvent> {
        loop {
            if let Some(event) = self.queued.pop_front() {
                return Some(event);
            }
            if self.finished {
                return None;
            }

            let Some(transactions) = self.transactions.as_mut() else {
                self.give_up("not subscribed");
                continue;
            };
            // Outer `None` means the deadline passed
            let next = match self.deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, transactions.next())
                    .await
                    .ok(),
                None => Some(transactions.next().await),
            };
            let tx = match next {
                Some(Some(tx)) => tx,
                Some(None) => {
                    self.give_up("transaction stream closed");
                    continue;
                }
                None => {
                    tracing::warn!("Execution {}: correlation timed out", self.call_id);
                    self.give_up("correlation timed out");
                    continue;
                }
            };

            if tx.logical_time < self.low_water_mark || tx.aborted {
                continue;
            }
            let Some(message) = tx.in_message else {
                continue;
            };
            let callback = match decode_callback(&message.body) {
                Ok(callback) => callback,
                Err(e) => {
                    tracing::trace!("Execution {}: skipping {}: {}", self.call_id, tx.id, e);
                    continue;
                }
            };

            if let Some(update) = self.correlation.apply(&message.source, callback) {
                tracing::debug!(
                    "Execution {}: hop {} {:?} via {}",
                    self.call_id,
                    update.step_index,
                    update.status,
                    message.source
                );
                self.queued.push_back(update.into());
                if let Some(outcome) = self.correlation.resolve() {
                    self.finish(outcome);
                }
            }
        }
    }

    /// Consume the execution as an event stream
    pub fn into_stream(self) -> BoxStream<'static, ExecutionEvent> {
        stream::unfold(self, |mut execution| async move {
            execution
                .next_event()
                .await
                .map(|event| (event, execution))
        })
        .boxed()
    }

    fn set_phase(&mut self, phase: ExecutionPhase) {
        tracing::debug!(
            "Execution {}: {:?} -> {:?}",
            self.call_id,
            self.phase,
            phase
        );
        self.phase = phase;
    }

    fn give_up(&mut self, reason: &str) {
        self.finish(ExecutionOutcome::Unresolved {
            reason: reason.to_string(),
            settled: self.correlation.settled(),
        });
    }

    fn finish(&mut self, outcome: ExecutionOutcome) {
        tracing::info!("Execution {} finished: {:?}", self.call_id, outcome);
        self.transactions = None;
        self.finished = true;
        self.set_phase(ExecutionPhase::Terminal);
        self.queued.push_back(ExecutionEvent::Terminal(outcome));
    }
}
