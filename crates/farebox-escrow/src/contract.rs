//! Escrow contract wire layout.
//!
//! The deployed escrow program fixes two byte layouts the client must
//! match exactly:
//!
//! - the contract account record: 96 bytes, three 32-byte party keys
//!   `[payer, gatekeeper, provider]`
//! - the instruction payload: a 4-byte little-endian tag, followed for
//!   `Spend` by a little-endian u64 amount
//!
//! The program invocation additionally fixes the four-party key list
//! order `[payer, contract, gatekeeper, provider]`; see
//! [`crate::session`].

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Size of the on-ledger contract account record.
pub const CONTRACT_RECORD_SIZE: usize = 96;

/// Size of a bare instruction tag.
const TAG_SIZE: usize = 4;

const TAG_INITIALIZE: u32 = 0;
const TAG_SPEND: u32 = 1;
const TAG_REFUND: u32 = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("record size mismatch: expected {CONTRACT_RECORD_SIZE} bytes, got {0}")]
    BadRecordSize(usize),
    #[error("instruction too short: {0} bytes")]
    InstructionTooShort(usize),
    #[error("unknown instruction tag: {0}")]
    UnknownTag(u32),
    #[error("trailing bytes after instruction")]
    TrailingBytes,
}

/// Instruction set of the escrow program.
///
/// The client only ever submits `Initialize`; `Spend` and `Refund` are
/// issued by the gatekeeper and provider against the same layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscrowInstruction {
    /// Record the party keys and arm the contract.
    Initialize,
    /// Move `amount` units from the contract to the provider.
    Spend { amount: u64 },
    /// Return the remaining balance to the payer.
    Refund,
}

impl EscrowInstruction {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(TAG_SIZE + 8);
        match self {
            Self::Initialize => buf.put_u32_le(TAG_INITIALIZE),
            Self::Spend { amount } => {
                buf.put_u32_le(TAG_SPEND);
                buf.put_u64_le(*amount);
            }
            Self::Refund => buf.put_u32_le(TAG_REFUND),
        }
        buf.freeze()
    }

    pub fn decode(mut bytes: &[u8]) -> Result<Self, LayoutError> {
        if bytes.len() < TAG_SIZE {
            return Err(LayoutError::InstructionTooShort(bytes.len()));
        }
        let tag = bytes.get_u32_le();
        let instruction = match tag {
            TAG_INITIALIZE => Self::Initialize,
            TAG_SPEND => {
                if bytes.len() < 8 {
                    return Err(LayoutError::InstructionTooShort(bytes.len() + TAG_SIZE));
                }
                Self::Spend {
                    amount: bytes.get_u64_le(),
                }
            }
            TAG_REFUND => Self::Refund,
            other => return Err(LayoutError::UnknownTag(other)),
        };
        if bytes.has_remaining() {
            return Err(LayoutError::TrailingBytes);
        }
        Ok(instruction)
    }
}

/// In-memory view of the 96-byte contract account record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractRecord {
    pub payer: [u8; 32],
    pub gatekeeper: [u8; 32],
    pub provider: [u8; 32],
}

impl ContractRecord {
    pub fn write_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(CONTRACT_RECORD_SIZE);
        buf.put_slice(&self.payer);
        buf.put_slice(&self.gatekeeper);
        buf.put_slice(&self.provider);
        buf.freeze()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LayoutError> {
        if bytes.len() != CONTRACT_RECORD_SIZE {
            return Err(LayoutError::BadRecordSize(bytes.len()));
        }
        let mut payer = [0u8; 32];
        let mut gatekeeper = [0u8; 32];
        let mut provider = [0u8; 32];
        payer.copy_from_slice(&bytes[0..32]);
        gatekeeper.copy_from_slice(&bytes[32..64]);
        provider.copy_from_slice(&bytes[64..96]);
        Ok(Self {
            payer,
            gatekeeper,
            provider,
        })
    }
}
