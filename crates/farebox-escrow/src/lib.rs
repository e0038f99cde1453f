//! Farebox payment substrate.
//!
//! This crate provides:
//! - Ed25519 payer and contract identities with hex-encoded ledger addresses
//! - The escrow contract's account record and instruction wire layout
//! - A signed-transaction envelope for ledger submission
//! - The ledger JSON-RPC client (airdrop, balance, submit)
//! - `EscrowSession`, the fund-then-open flow that yields one confirmed
//!   contract per viewing session

#![forbid(unsafe_code)]

pub mod contract;
pub mod identity;
pub mod ledger;
pub mod session;
pub mod transaction;

pub use contract::{ContractRecord, EscrowInstruction, CONTRACT_RECORD_SIZE};
pub use identity::{Keypair, LedgerAddress};
pub use ledger::LedgerClient;
pub use session::{EscrowContract, EscrowSession, FundedPayer};
pub use transaction::{Instruction, Transaction, SYSTEM_PROGRAM_ADDRESS};
