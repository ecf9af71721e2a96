// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 The bank-ledger-rs Authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! The transfer engine.
//!
//! [`Ledger::transfer`] moves funds between two accounts inside one unit of
//! work: one transfer row, two entries, two balance updates. Either all
//! five mutations commit or none of them do.
//!
//! # Concurrency
//!
//! Any number of transfers may run concurrently from separate threads;
//! there is no serialization point in the engine itself. Safety rests on
//! the store's row locks plus one rule: the two balance updates are always
//! issued in ascending account-id order, regardless of which side is the
//! source. Opposing transfers between the same pair of accounts therefore
//! acquire their row locks in the same order and cannot deadlock, and each
//! transaction observes a distinct, serialized balance on every row it
//! updates.

use crate::account::Account;
use crate::base::{AccountId, CancelToken};
use crate::entry::CreateEntryParams;
use crate::error::LedgerError;
use crate::store::Store;
use crate::transfer::{CreateTransferParams, TransferRequest, TransferResult};
use crate::tx::Tx;

/// A bank-account ledger: an embedded [`Store`] plus the transactional
/// transfer engine on top of it.
///
/// Plain single-row reads and writes go through [`Ledger::store`];
/// [`Ledger::transfer`] is the only multi-row operation.
pub struct Ledger {
    store: Store,
}

impl Ledger {
    /// Creates a ledger with an empty store.
    pub fn new() -> Self {
        Ledger {
            store: Store::new(),
        }
    }

    /// The ambient store handle for single-row CRUD.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Moves `request.amount` units from the source to the destination
    /// account atomically.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] if the amount is not positive.
    /// - [`LedgerError::SelfTransfer`] if source and destination are the
    ///   same account. Both argument checks run before any transaction is
    ///   opened, so a rejected request performs zero writes.
    /// - [`LedgerError::AccountNotFound`] if either account does not
    ///   exist; everything written so far in the unit of work is rolled
    ///   back.
    /// - Any storage error from the underlying operations, propagated
    ///   verbatim after rollback.
    pub fn transfer(&self, request: TransferRequest) -> Result<TransferResult, LedgerError> {
        self.transfer_with(&CancelToken::new(), request)
    }

    /// Like [`Ledger::transfer`], honoring a cancellation token.
    ///
    /// Cancellation observed mid-transaction rolls back in full and
    /// surfaces as [`LedgerError::Canceled`]; a token canceled only after
    /// commit has no effect.
    pub fn transfer_with(
        &self,
        cancel: &CancelToken,
        request: TransferRequest,
    ) -> Result<TransferResult, LedgerError> {
        if request.amount <= 0 {
            return Err(LedgerError::InvalidAmount);
        }
        if request.from_account_id == request.to_account_id {
            return Err(LedgerError::SelfTransfer);
        }

        self.store.run_with(cancel, |tx| {
            let transfer = tx.create_transfer(CreateTransferParams {
                from_account_id: request.from_account_id,
                to_account_id: request.to_account_id,
                amount: request.amount,
            })?;
            let from_entry = tx.create_entry(CreateEntryParams {
                account_id: request.from_account_id,
                amount: -request.amount,
            })?;
            let to_entry = tx.create_entry(CreateEntryParams {
                account_id: request.to_account_id,
                amount: request.amount,
            })?;
            let (from_account, to_account) = add_balances_ordered(
                tx,
                request.from_account_id,
                request.to_account_id,
                request.amount,
            )?;
            Ok(TransferResult {
                transfer,
                from_entry,
                to_entry,
                from_account,
                to_account,
            })
        })
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies both balance deltas of a transfer.
///
/// Row locks are taken in ascending account-id order, never in request
/// order: every concurrent transfer touching a given pair of accounts
/// agrees on the same lock sequence, whatever its direction.
fn add_balances_ordered(
    tx: &mut Tx<'_>,
    from: AccountId,
    to: AccountId,
    amount: i64,
) -> Result<(Account, Account), LedgerError> {
    if from < to {
        let from_account = tx.add_account_balance(from, -amount)?;
        let to_account = tx.add_account_balance(to, amount)?;
        Ok((from_account, to_account))
    } else {
        let to_account = tx.add_account_balance(to, amount)?;
        let from_account = tx.add_account_balance(from, -amount)?;
        Ok((from_account, to_account))
    }
}
