//! Hop callback codec
//!
//! Every pool on a route reports its hop back to the sender with one of two
//! callbacks, both tagged with the call id from the route payload:
//!
//! ```text
//! success:   [function id: u32][call id: u64][amount: u128]
//! cancelled: [function id: u32][call id: u64]
//! ```
//!
//! All integers are big-endian.

use hopswap_core::{Amount, CallId};
use thiserror::Error;

/// Function id of the hop success callback
pub const HOP_SUCCESS_FUNCTION_ID: u32 = 0x5a9d_3c01;

/// Function id of the hop cancellation callback
pub const HOP_CANCELLED_FUNCTION_ID: u32 = 0x1e47_b802;

const FUNCTION_ID_LEN: usize = 4;
const CALL_ID_LEN: usize = 8;
const AMOUNT_LEN: usize = 16;

/// Decoded hop callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HopCallback {
    /// The hop settled; `amount` is the realized output
    Success { call_id: CallId, amount: Amount },
    /// The hop was cancelled and its input bounced back
    Cancelled { call_id: CallId },
}

impl HopCallback {
    pub fn call_id(&self) -> CallId {
        match self {
            Self::Success { call_id, .. } | Self::Cancelled { call_id } => *call_id,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Message body too short: need {expected} bytes, found {found}")]
    TooShort { expected: usize, found: usize },

    #[error("Unknown function id 0x{0:08x}")]
    UnknownFunction(u32),

    #[error("{0} unexpected trailing bytes")]
    TrailingBytes(usize),
}

/// Decode a message body as a hop callback
pub fn decode_callback(body: &[u8]) -> Result<HopCallback, DecodeError> {
    let function_id = u32::from_be_bytes(read_array(body, 0)?);
    let call_id = CallId(u64::from_be_bytes(read_array(body, FUNCTION_ID_LEN)?));
    let header_len = FUNCTION_ID_LEN + CALL_ID_LEN;

    let (callback, consumed) = match function_id {
        HOP_SUCCESS_FUNCTION_ID => {
            let amount = u128::from_be_bytes(read_array(body, header_len)?);
            (
                HopCallback::Success { call_id, amount },
                header_len + AMOUNT_LEN,
            )
        }
        HOP_CANCELLED_FUNCTION_ID => (HopCallback::Cancelled { call_id }, header_len),
        other => return Err(DecodeError::UnknownFunction(other)),
    };

    if body.len() > consumed {
        return Err(DecodeError::TrailingBytes(body.len() - consumed));
    }
    Ok(callback)
}

/// Encode a hop success callback body
pub fn encode_success(call_id: CallId, amount: Amount) -> Vec<u8> {
    let mut body = Vec::with_capacity(FUNCTION_ID_LEN + CALL_ID_LEN + AMOUNT_LEN);
    body.extend_from_slice(&HOP_SUCCESS_FUNCTION_ID.to_be_bytes());
    body.extend_from_slice(&call_id.0.to_be_bytes());
    body.extend_from_slice(&amount.to_be_bytes());
    body
}

/// Encode a hop cancellation callback body
pub fn encode_cancelled(call_id: CallId) -> Vec<u8> {
    let mut body = Vec::with_capacity(FUNCTION_ID_LEN + CALL_ID_LEN);
    body.extend_from_slice(&HOP_CANCELLED_FUNCTION_ID.to_be_bytes());
    body.extend_from_slice(&call_id.0.to_be_bytes());
    body
}

fn read_array<const N: usize>(bytes: &[u8], offset: usize) -> Result<[u8; N], DecodeError> {
    let end = offset + N;
    if bytes.len() < end {
        return Err(DecodeError::TooShort {
            expected: end,
            found: bytes.len(),
        });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[offset..end]);
    Ok(out)
}
