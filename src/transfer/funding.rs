// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Best-effort native funding of freshly registered accounts.
//!
//! New accounts cannot pay fees or hold assets until they carry the
//! ledger's minimum balance. When a funding key is configured, signup
//! sends a small native payment; failures are logged and never surface to
//! the caller.

use std::sync::Arc;

use crate::ledger::{
    amount::MICRO_UNITS_PER_UNIT, wait_for_confirmation, Address, Keypair, Ledger, LedgerError,
    Transaction, DIRECT_CONFIRMATION_ROUNDS,
};

/// Native amount sent to every new account (2 units).
pub const SIGNUP_GRANT: u64 = 2 * MICRO_UNITS_PER_UNIT;

/// Sends native payments from a service-owned funding account.
#[derive(Clone)]
pub struct Funder {
    ledger: Arc<dyn Ledger>,
    keypair: Arc<Keypair>,
    grant: u64,
}

impl Funder {
    pub fn new(ledger: Arc<dyn Ledger>, keypair: Keypair) -> Self {
        Self {
            ledger,
            keypair: Arc::new(keypair),
            grant: SIGNUP_GRANT,
        }
    }

    pub fn address(&self) -> Address {
        self.keypair.address()
    }

    /// Pay the signup grant to `receiver` and wait for confirmation.
    pub async fn fund(&self, receiver: Address) -> Result<String, LedgerError> {
        let params = self.ledger.suggested_params().await?;
        let signed = Transaction::payment(&params, self.keypair.address(), receiver, self.grant)
            .with_suggested_fee(&params)?
            .sign(&self.keypair)?;
        let txid = signed.id()?;

        self.ledger.submit(std::slice::from_ref(&signed)).await?;
        wait_for_confirmation(self.ledger.as_ref(), &txid, DIRECT_CONFIRMATION_ROUNDS).await?;
        Ok(txid)
    }

    /// Fund `receiver` in the background, logging the outcome.
    pub fn spawn_fund(&self, receiver: Address) {
        let funder = self.clone();
        tokio::spawn(async move {
            match funder.fund(receiver).await {
                Ok(txid) => tracing::info!(receiver = %receiver, txid = %txid, "Signup grant sent"),
                Err(e) => tracing::warn!(error = %e, receiver = %receiver, "Signup grant failed"),
            }
        });
    }
}
