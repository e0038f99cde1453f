//! Signed transaction envelope for ledger submission.
//!
//! A transaction is a list of instructions plus Ed25519 signatures over
//! the canonical message bytes. Framing is big-endian length-prefixed;
//! instruction payload internals (tags, amounts) are the program's own
//! little-endian layout and opaque at this level. The submission body is
//! the base64 encoding of signatures followed by the message.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::identity::Keypair;

/// Address the ledger's account-creation primitive lives at.
pub const SYSTEM_PROGRAM_ADDRESS: [u8; 32] = [0u8; 32];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("transaction truncated at {0} bytes")]
    Truncated(usize),
    #[error("signature {index} does not verify")]
    BadSignature { index: usize },
}

/// One instruction: the program it targets, the accounts it touches in
/// program-defined order, and an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program: [u8; 32],
    pub keys: Vec<[u8; 32]>,
    pub data: Bytes,
}

impl Instruction {
    /// Create a system instruction that allocates `space` bytes for a new
    /// account owned by `owner`, seeded with `balance` units. Key order:
    /// funding account, new account.
    pub fn create_account(
        from: [u8; 32],
        new_account: [u8; 32],
        owner: [u8; 32],
        balance: u64,
        space: u64,
    ) -> Self {
        let mut data = BytesMut::with_capacity(48);
        data.put_u64_le(balance);
        data.put_u64_le(space);
        data.put_slice(&owner);
        Self {
            program: SYSTEM_PROGRAM_ADDRESS,
            keys: vec![from, new_account],
            data: data.freeze(),
        }
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.program);
        buf.put_u32(self.keys.len() as u32);
        for key in &self.keys {
            buf.put_slice(key);
        }
        buf.put_u32(self.data.len() as u32);
        buf.put_slice(&self.data);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEntry {
    pub signer: [u8; 32],
    pub signature: [u8; 64],
}

/// A transaction under construction or ready for submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    pub instructions: Vec<Instruction>,
    pub signatures: Vec<SignatureEntry>,
}

impl Transaction {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            instructions,
            signatures: Vec::new(),
        }
    }

    /// Canonical bytes every signature covers.
    pub fn message_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_u32(self.instructions.len() as u32);
        for instruction in &self.instructions {
            instruction.encode_into(&mut buf);
        }
        buf.freeze()
    }

    /// Append one signature per signer, in order.
    pub fn sign(&mut self, signers: &[&Keypair]) {
        let message = self.message_bytes();
        for keypair in signers {
            self.signatures.push(SignatureEntry {
                signer: keypair.public_key_bytes(),
                signature: keypair.sign(&message),
            });
        }
    }

    /// Check every attached signature against the message bytes.
    pub fn verify(&self) -> Result<(), TransactionError> {
        let message = self.message_bytes();
        for (index, entry) in self.signatures.iter().enumerate() {
            if !crate::identity::verify_with_address(
                &crate::identity::LedgerAddress::from_bytes(&entry.signer),
                &message,
                &entry.signature,
            ) {
                return Err(TransactionError::BadSignature { index });
            }
        }
        Ok(())
    }

    /// Full wire bytes: signature list, then message.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_u32(self.signatures.len() as u32);
        for entry in &self.signatures {
            buf.put_slice(&entry.signer);
            buf.put_slice(&entry.signature);
        }
        buf.put_slice(&self.message_bytes());
        buf.freeze()
    }

    /// Base64 body for `submitTransaction`.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    /// Decode wire bytes produced by [`Self::to_bytes`].
    pub fn from_bytes(mut bytes: Bytes) -> Result<Self, TransactionError> {
        let total = bytes.len();
        if bytes.remaining() < 4 {
            return Err(TransactionError::Truncated(total));
        }
        // Counts come off the wire; bound each against the bytes actually
        // present before allocating.
        let sig_count = bytes.get_u32() as usize;
        if bytes.remaining() < sig_count.saturating_mul(96) {
            return Err(TransactionError::Truncated(total));
        }
        let mut signatures = Vec::with_capacity(sig_count);
        for _ in 0..sig_count {
            let mut signer = [0u8; 32];
            bytes.copy_to_slice(&mut signer);
            let mut signature = [0u8; 64];
            bytes.copy_to_slice(&mut signature);
            signatures.push(SignatureEntry { signer, signature });
        }

        if bytes.remaining() < 4 {
            return Err(TransactionError::Truncated(total));
        }
        let instruction_count = bytes.get_u32() as usize;
        // Smallest possible instruction: program + key count + data length.
        if bytes.remaining() < instruction_count.saturating_mul(40) {
            return Err(TransactionError::Truncated(total));
        }
        let mut instructions = Vec::with_capacity(instruction_count);
        for _ in 0..instruction_count {
            if bytes.remaining() < 36 {
                return Err(TransactionError::Truncated(total));
            }
            let mut program = [0u8; 32];
            bytes.copy_to_slice(&mut program);
            let key_count = bytes.get_u32() as usize;
            if bytes.remaining() < key_count.saturating_mul(32) {
                return Err(TransactionError::Truncated(total));
            }
            let mut keys = Vec::with_capacity(key_count);
            for _ in 0..key_count {
                let mut key = [0u8; 32];
                bytes.copy_to_slice(&mut key);
                keys.push(key);
            }
            if bytes.remaining() < 4 {
                return Err(TransactionError::Truncated(total));
            }
            let data_len = bytes.get_u32() as usize;
            if bytes.remaining() < data_len {
                return Err(TransactionError::Truncated(total));
            }
            let data = bytes.copy_to_bytes(data_len);
            instructions.push(Instruction {
                program,
                keys,
                data,
            });
        }

        Ok(Self {
            instructions,
            signatures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::EscrowInstruction;

    fn sample_transaction() -> (Transaction, Keypair, Keypair) {
        let payer = Keypair::generate();
        let contract = Keypair::generate();
        let create = Instruction::create_account(
            payer.public_key_bytes(),
            contract.public_key_bytes(),
            [7u8; 32],
            1_000,
            96,
        );
        let invoke = Instruction {
            program: [7u8; 32],
            keys: vec![
                payer.public_key_bytes(),
                contract.public_key_bytes(),
                [8u8; 32],
                [9u8; 32],
            ],
            data: EscrowInstruction::Initialize.encode(),
        };
        (Transaction::new(vec![create, invoke]), payer, contract)
    }

    #[test]
    fn sign_then_verify() {
        let (mut tx, payer, contract) = sample_transaction();
        tx.sign(&[&payer, &contract]);
        assert_eq!(tx.signatures.len(), 2);
        tx.verify().unwrap();
    }

    #[test]
    fn tampering_breaks_verification() {
        let (mut tx, payer, contract) = sample_transaction();
        tx.sign(&[&payer, &contract]);
        tx.instructions[0].keys[0][0] ^= 0xff;
        assert_eq!(
            tx.verify(),
            Err(TransactionError::BadSignature { index: 0 })
        );
    }

    #[test]
    fn wire_round_trip() {
        let (mut tx, payer, contract) = sample_transaction();
        tx.sign(&[&payer, &contract]);
        let decoded = Transaction::from_bytes(tx.to_bytes()).unwrap();
        assert_eq!(decoded, tx);
        decoded.verify().unwrap();
    }

    #[test]
    fn decode_rejects_truncation() {
        let (mut tx, payer, contract) = sample_transaction();
        tx.sign(&[&payer, &contract]);
        let bytes = tx.to_bytes();
        for cut in [0, 3, 40, bytes.len() - 1] {
            let truncated = bytes.slice(0..cut);
            assert!(Transaction::from_bytes(truncated).is_err());
        }
    }

    #[test]
    fn decode_rejects_oversized_claimed_counts() {
        // A 4-byte body claiming u32::MAX signatures must come back as a
        // truncation error, not attempt a matching allocation.
        let body = Bytes::from_static(&[0xff, 0xff, 0xff, 0xff]);
        assert_eq!(
            Transaction::from_bytes(body),
            Err(TransactionError::Truncated(4))
        );

        // Same for the instruction count after an empty signature list.
        let mut buf = BytesMut::new();
        buf.put_u32(0);
        buf.put_u32(u32::MAX);
        assert_eq!(
            Transaction::from_bytes(buf.freeze()),
            Err(TransactionError::Truncated(8))
        );

        // And for a per-instruction key count.
        let mut buf = BytesMut::new();
        buf.put_u32(0);
        buf.put_u32(1);
        buf.put_slice(&[0u8; 32]);
        buf.put_u32(u32::MAX);
        buf.put_u32(0);
        assert!(Transaction::from_bytes(buf.freeze()).is_err());
    }

    #[test]
    fn base64_body_decodes() {
        let (mut tx, payer, contract) = sample_transaction();
        tx.sign(&[&payer, &contract]);
        let body = tx.to_base64();
        let raw = STANDARD.decode(&body).unwrap();
        let decoded = Transaction::from_bytes(Bytes::from(raw)).unwrap();
        assert_eq!(decoded.instructions.len(), 2);
    }
}
