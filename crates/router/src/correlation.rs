//! Execution correlation table
//!
//! One slot per hop. Callbacks are folded in by originating pool address,
//! in whatever order the ledger delivers them, and the terminal outcome is
//! derived by scanning the slots in hop order.

use hopswap_core::{Address, Amount, CallId, ExecutionError, TokenRoot};
use ledger_client::HopCallback;
use serde::{Deserialize, Serialize};

use crate::state::SwapRoute;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "amount")]
pub enum SlotState {
    Pending,
    Success(Amount),
    Cancelled,
}

/// Hop status reported on the event stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    Cancelled,
}

/// Hop that settled before the operation ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettledHop {
    pub step_index: usize,
    pub receive_root: TokenRoot,
    pub amount: Amount,
}

/// How a submitted operation ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ExecutionOutcome {
    /// Every hop settled; `amount` is the final hop's realized output
    Success {
        amount: Amount,
        settled: Vec<SettledHop>,
    },
    /// Hops before `step_index` settled, hop `step_index` was cancelled.
    /// Funds are left in the last settled hop's output token.
    PartialFailure {
        step_index: usize,
        settled: Vec<SettledHop>,
    },
    /// First hop cancelled, nothing moved
    Failure,
    /// Signing declined before anything reached the ledger
    Rejected { reason: String },
    /// Correlation gave up before every slot resolved
    Unresolved {
        reason: String,
        settled: Vec<SettledHop>,
    },
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Hops that settled, in hop order
    pub fn settled(&self) -> &[SettledHop] {
        match self {
            Self::Success { settled, .. }
            | Self::PartialFailure { settled, .. }
            | Self::Unresolved { settled, .. } => settled,
            Self::Failure | Self::Rejected { .. } => &[],
        }
    }

    /// Intermediate token and amount left behind by a partial execution
    pub fn stranded(&self) -> Option<(&TokenRoot, Amount)> {
        match self {
            Self::PartialFailure { settled, .. } => {
                settled.last().map(|hop| (&hop.receive_root, hop.amount))
            }
            _ => None,
        }
    }

    /// Error view of a non-successful outcome
    pub fn error(&self) -> Option<ExecutionError> {
        match self {
            Self::Success { .. } => None,
            Self::PartialFailure {
                step_index,
                settled,
            } => {
                let (stranded_root, stranded_amount) = settled
                    .last()
                    .map(|hop| (hop.receive_root.clone(), hop.amount))
                    .unwrap_or_else(|| (TokenRoot::new(""), 0));
                Some(ExecutionError::PartialExecution {
                    step_index: *step_index,
                    stranded_root,
                    stranded_amount,
                })
            }
            Self::Failure => Some(ExecutionError::Failed),
            Self::Rejected { reason } => Some(ExecutionError::SubmissionRejected {
                reason: reason.clone(),
            }),
            Self::Unresolved { reason, .. } => Some(ExecutionError::Unresolved {
                reason: reason.clone(),
            }),
        }
    }
}

/// Slot update produced by a matched callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotUpdate {
    pub step_index: usize,
    pub status: StepStatus,
    pub amount: Option<Amount>,
}

/// Result slots for one call id
#[derive(Debug, Clone)]
pub struct Correlation {
    call_id: CallId,
    pools: Vec<Address>,
    receive_roots: Vec<TokenRoot>,
    slots: Vec<SlotState>,
}

impl Correlation {
    pub fn new(call_id: CallId, route: &SwapRoute) -> Self {
        Self {
            call_id,
            pools: route.steps.iter().map(|s| s.pool.clone()).collect(),
            receive_roots: route.steps.iter().map(|s| s.receive_root.clone()).collect(),
            slots: vec![SlotState::Pending; route.steps.len()],
        }
    }

    pub fn call_id(&self) -> CallId {
        self.call_id
    }

    pub fn slots(&self) -> &[SlotState] {
        &self.slots
    }

    /// Fold one callback into the table. Callbacks for another call id, from
    /// a pool not on the route, or for an already filled slot are ignored.
    pub fn apply(&mut self, source: &Address, callback: HopCallback) -> Option<SlotUpdate> {
        if callback.call_id() != self.call_id {
            return None;
        }

        let step_index = self
            .pools
            .iter()
            .zip(&self.slots)
            .position(|(pool, slot)| pool == source && *slot == SlotState::Pending)?;

        let (state, update) = match callback {
            HopCallback::Success { amount, .. } => (
                SlotState::Success(amount),
                SlotUpdate {
                    step_index,
                    status: StepStatus::Success,
                    amount: Some(amount),
                },
            ),
            HopCallback::Cancelled { .. } => (
                SlotState::Cancelled,
                SlotUpdate {
                    step_index,
                    status: StepStatus::Cancelled,
                    amount: None,
                },
            ),
        };
        self.slots[step_index] = state;
        Some(update)
    }

    /// Terminal outcome, or `None` while the scan reaches a pending slot
    pub fn resolve(&self) -> Option<ExecutionOutcome> {
        if self.slots.is_empty() {
            return None;
        }

        for (index, slot) in self.slots.iter().enumerate() {
            match slot {
                SlotState::Pending => return None,
                SlotState::Cancelled if index == 0 => return Some(ExecutionOutcome::Failure),
                SlotState::Cancelled => {
                    return Some(ExecutionOutcome::PartialFailure {
                        step_index: index,
                        settled: self.settled(),
                    })
                }
                SlotState::Success(_) => {}
            }
        }

        let settled = self.settled();
        let amount = settled.last().map(|hop| hop.amount).unwrap_or(0);
        Some(ExecutionOutcome::Success { amount, settled })
    }

    /// Leading run of successful slots
    pub fn settled(&self) -> Vec<SettledHop> {
        self.slots
            .iter()
            .zip(&self.receive_roots)
            .enumerate()
            .map_while(|(step_index, (slot, root))| match slot {
                SlotState::Success(amount) => Some(SettledHop {
                    step_index,
                    receive_root: root.clone(),
                    amount: *amount,
                }),
                _ => None,
            })
            .collect()
    }
}
