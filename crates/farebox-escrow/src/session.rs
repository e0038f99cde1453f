//! The per-session escrow flow: fund a fresh payer, then open one
//! contract.
//!
//! Identities are generated per call and never reused; a confirmed
//! contract is immutable and scoped to exactly one viewing session.
//! Every failure here is fatal to the session: funding or submission
//! problems leave no usable partial contract state behind.

use farebox_common::{Error, EscrowConfig, Result};
use tracing::{debug, info};

use crate::contract::{EscrowInstruction, CONTRACT_RECORD_SIZE};
use crate::identity::{Keypair, LedgerAddress};
use crate::ledger::LedgerClient;
use crate::transaction::{Instruction, Transaction};

/// A freshly generated payer identity with confirmed funds.
pub struct FundedPayer {
    keypair: Keypair,
    granted: u64,
}

impl FundedPayer {
    pub fn address(&self) -> LedgerAddress {
        self.keypair.address()
    }

    pub fn granted(&self) -> u64 {
        self.granted
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

/// A confirmed on-ledger escrow contract.
#[derive(Debug, Clone)]
pub struct EscrowContract {
    pub address: LedgerAddress,
    pub balance: u64,
}

/// Drives the fund-then-open sequence against one ledger node.
pub struct EscrowSession {
    ledger: LedgerClient,
    config: EscrowConfig,
    program: [u8; 32],
    gatekeeper: [u8; 32],
    provider: [u8; 32],
}

impl EscrowSession {
    /// Party addresses are parsed eagerly so a misconfigured deployment
    /// fails before any funds move.
    pub fn new(ledger: LedgerClient, config: EscrowConfig) -> Result<Self> {
        let program = LedgerAddress::parse(&config.program_address)?.to_bytes()?;
        let gatekeeper = LedgerAddress::parse(&config.gatekeeper_address)?.to_bytes()?;
        let provider = LedgerAddress::parse(&config.provider_address)?.to_bytes()?;
        Ok(Self {
            ledger,
            config,
            program,
            gatekeeper,
            provider,
        })
    }

    /// Generate a fresh payer and fund it from the ledger's faucet.
    ///
    /// The granted balance is verified with a follow-up `getBalance`; a
    /// shortfall is a `Funding` error, not a warning.
    pub async fn fund(&self) -> Result<FundedPayer> {
        let keypair = Keypair::generate();
        let address = keypair.address();
        debug!(%address, amount = self.config.airdrop_amount, "requesting airdrop");

        let granted = self
            .ledger
            .request_airdrop(&address, self.config.airdrop_amount)
            .await
            .map_err(as_funding_error)?;

        let balance = self
            .ledger
            .get_balance(&address)
            .await
            .map_err(as_funding_error)?;
        if balance < self.config.airdrop_amount {
            return Err(Error::funding(format!(
                "airdrop under-delivered: requested {}, balance {}",
                self.config.airdrop_amount, balance
            )));
        }

        info!(%address, granted, "payer funded");
        Ok(FundedPayer { keypair, granted })
    }

    /// Build, sign, and submit the one transaction that creates and
    /// initializes a fresh escrow contract account. Blocks until the
    /// ledger confirms inclusion.
    pub async fn open_contract(&self, payer: &FundedPayer) -> Result<EscrowContract> {
        let contract_keypair = Keypair::generate();
        let contract_address = contract_keypair.address();
        let payer_key = payer.keypair().public_key_bytes();
        let contract_key = contract_keypair.public_key_bytes();

        let create = Instruction::create_account(
            payer_key,
            contract_key,
            self.program,
            self.config.contract_balance,
            CONTRACT_RECORD_SIZE as u64,
        );
        // Party order is fixed by the program: payer, contract,
        // gatekeeper, provider.
        let initialize = Instruction {
            program: self.program,
            keys: vec![payer_key, contract_key, self.gatekeeper, self.provider],
            data: EscrowInstruction::Initialize.encode(),
        };

        let mut transaction = Transaction::new(vec![create, initialize]);
        transaction.sign(&[payer.keypair(), &contract_keypair]);

        let signature = self
            .ledger
            .submit_transaction(&transaction.to_base64())
            .await?;

        info!(%contract_address, balance = self.config.contract_balance, %signature,
              "escrow contract confirmed");
        Ok(EscrowContract {
            address: contract_address,
            balance: self.config.contract_balance,
        })
    }
}

/// Funding-phase failures surface as `Funding` whatever layer raised them.
fn as_funding_error(err: Error) -> Error {
    match err {
        Error::Ledger(msg) | Error::Timeout(msg) => Error::Funding(msg),
        other => other,
    }
}
