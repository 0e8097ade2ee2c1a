//! Route payload codec
//!
//! The whole route travels with the first transfer. The first pool swaps
//! and forwards the remainder to the next pool on the list; each pool
//! enforces its own minimum.
//!
//! ```text
//! [call id: u64][amount: u128][min expected: u128][next step count: u8]
//! per next step:
//!   [pool len: u16][pool: utf8][receive root len: u16][receive root: utf8][min expected: u128]
//! ```
//!
//! All integers are big-endian.

use hopswap_core::{Address, Amount, CallId, TokenRoot};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::SwapRoute;

/// A hop after the first, as seen by the pool forwarding to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextStep {
    pub pool: Address,
    pub receive_root: TokenRoot,
    pub min_expected_amount: Amount,
}

/// Payload attached to the transfer into the first pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePayload {
    pub call_id: CallId,
    /// Spent on the first hop
    pub amount: Amount,
    /// Minimum output of the first hop
    pub min_expected_amount: Amount,
    pub next_steps: Vec<NextStep>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Route has no steps")]
    EmptyRoute,

    #[error("Route has {0} follow-up steps, at most 255 fit in a payload")]
    TooManySteps(usize),

    #[error("Field of {0} bytes does not fit a u16 length prefix")]
    FieldTooLong(usize),

    #[error("Payload truncated at byte {offset}")]
    Truncated { offset: usize },

    #[error("Field at byte {offset} is not valid UTF-8")]
    InvalidUtf8 { offset: usize },

    #[error("{0} unexpected trailing bytes")]
    TrailingBytes(usize),
}

impl RoutePayload {
    pub fn from_route(call_id: CallId, route: &SwapRoute) -> Result<Self, PayloadError> {
        let first = route.steps.first().ok_or(PayloadError::EmptyRoute)?;
        Ok(Self {
            call_id,
            amount: first.amount,
            min_expected_amount: first.min_expected_amount,
            next_steps: route.steps[1..]
                .iter()
                .map(|step| NextStep {
                    pool: step.pool.clone(),
                    receive_root: step.receive_root.clone(),
                    min_expected_amount: step.min_expected_amount,
                })
                .collect(),
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, PayloadError> {
        let count = u8::try_from(self.next_steps.len())
            .map_err(|_| PayloadError::TooManySteps(self.next_steps.len()))?;

        let mut out = Vec::with_capacity(41 + self.next_steps.len() * 64);
        out.extend_from_slice(&self.call_id.0.to_be_bytes());
        out.extend_from_slice(&self.amount.to_be_bytes());
        out.extend_from_slice(&self.min_expected_amount.to_be_bytes());
        out.push(count);
        for step in &self.next_steps {
            write_str(&mut out, step.pool.as_str())?;
            write_str(&mut out, step.receive_root.as_str())?;
            out.extend_from_slice(&step.min_expected_amount.to_be_bytes());
        }
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PayloadError> {
        let mut reader = Reader { bytes, offset: 0 };
        let call_id = CallId(u64::from_be_bytes(reader.array()?));
        let amount = u128::from_be_bytes(reader.array()?);
        let min_expected_amount = u128::from_be_bytes(reader.array()?);
        let [count] = reader.array::<1>()?;

        let mut next_steps = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let pool = Address::new(reader.string()?);
            let receive_root = TokenRoot::new(reader.string()?);
            let min_expected_amount = u128::from_be_bytes(reader.array()?);
            next_steps.push(NextStep {
                pool,
                receive_root,
                min_expected_amount,
            });
        }

        let rest = bytes.len() - reader.offset;
        if rest > 0 {
            return Err(PayloadError::TrailingBytes(rest));
        }
        Ok(Self {
            call_id,
            amount,
            min_expected_amount,
            next_steps,
        })
    }
}

fn write_str(out: &mut Vec<u8>, value: &str) -> Result<(), PayloadError> {
    let len = u16::try_from(value.len()).map_err(|_| PayloadError::FieldTooLong(value.len()))?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], PayloadError> {
        let end = self.offset + len;
        let slice = self
            .bytes
            .get(self.offset..end)
            .ok_or(PayloadError::Truncated {
                offset: self.offset,
            })?;
        self.offset = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], PayloadError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn string(&mut self) -> Result<String, PayloadError> {
        let len = u16::from_be_bytes(self.array()?) as usize;
        let offset = self.offset;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| PayloadError::InvalidUtf8 { offset })
    }
}
