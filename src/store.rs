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

//! The embedded ledger store.
//!
//! Three tables (accounts, entries, transfers) with single-row CRUD, plus
//! the unit-of-work entry points [`Store::run`] and [`Store::run_with`].
//!
//! Each account row lives behind its own [`Mutex`]; that mutex is the row
//! lock the transfer engine's concurrency design relies on. A transaction
//! updating a balance holds the lock until it commits or rolls back, so a
//! reader never observes an uncommitted balance.
//!
//! # Locking discipline
//!
//! A row mutex is never acquired while a map shard guard is held: every
//! path clones the row's `Arc` out of the map first. This keeps the map's
//! internal locks and the row locks on separate levels.

use crate::account::{Account, CreateAccountParams, UpdateAccountParams};
use crate::base::{AccountId, CancelToken, EntryId, TransferId};
use crate::entry::{CreateEntryParams, Entry, UpdateEntryParams};
use crate::error::LedgerError;
use crate::transfer::{CreateTransferParams, Transfer, UpdateTransferParams};
use crate::tx::Tx;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// One account row and its row lock.
pub(crate) type AccountCell = Arc<Mutex<Account>>;

/// Thread-safe storage for accounts, entries and transfers.
///
/// All ambient methods are independently atomic at the single-row level.
/// Multi-row atomicity is only available through [`Store::run`] /
/// [`Store::run_with`], which hand the work function a transaction-scoped
/// [`Tx`] handle.
pub struct Store {
    pub(crate) accounts: DashMap<AccountId, AccountCell>,
    pub(crate) entries: DashMap<EntryId, Entry>,
    pub(crate) transfers: DashMap<TransferId, Transfer>,
    account_seq: AtomicI64,
    entry_seq: AtomicI64,
    transfer_seq: AtomicI64,
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Store {
            accounts: DashMap::new(),
            entries: DashMap::new(),
            transfers: DashMap::new(),
            account_seq: AtomicI64::new(0),
            entry_seq: AtomicI64::new(0),
            transfer_seq: AtomicI64::new(0),
        }
    }

    // Ids are drawn from monotonic sequences and are consumed even when the
    // allocating transaction rolls back, like database sequences.
    pub(crate) fn next_account_id(&self) -> AccountId {
        AccountId(self.account_seq.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub(crate) fn next_entry_id(&self) -> EntryId {
        EntryId(self.entry_seq.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub(crate) fn next_transfer_id(&self) -> TransferId {
        TransferId(self.transfer_seq.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Clones the row cell out of the map so the caller can lock it without
    /// holding any map guard.
    pub(crate) fn account_cell(&self, id: AccountId) -> Result<AccountCell, LedgerError> {
        self.accounts
            .get(&id)
            .map(|cell| Arc::clone(cell.value()))
            .ok_or(LedgerError::AccountNotFound)
    }

    // === Accounts ===

    /// Creates an account and returns the stored row.
    pub fn create_account(&self, params: CreateAccountParams) -> Account {
        let account = Account {
            id: self.next_account_id(),
            owner: params.owner,
            balance: params.balance,
            currency: params.currency,
            created_at: Utc::now(),
        };
        self.accounts
            .insert(account.id, Arc::new(Mutex::new(account.clone())));
        account
    }

    /// Returns the committed account row.
    ///
    /// Blocks while a transaction holds the row lock, then observes the
    /// committed (or rolled back) state.
    pub fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        let cell = self.account_cell(id)?;
        let row = cell.lock().clone();
        Ok(row)
    }

    /// Updates the owner label of an account.
    pub fn update_account(
        &self,
        id: AccountId,
        params: UpdateAccountParams,
    ) -> Result<(), LedgerError> {
        let cell = self.account_cell(id)?;
        cell.lock().owner = params.owner;
        Ok(())
    }

    /// Applies a signed delta to an account balance as a single atomic
    /// increment and returns the updated row.
    pub fn add_account_balance(&self, id: AccountId, delta: i64) -> Result<Account, LedgerError> {
        let cell = self.account_cell(id)?;
        let mut row = cell.lock();
        apply_delta(&mut row, delta)?;
        Ok(row.clone())
    }

    /// Deletes an account row.
    ///
    /// Waits out any transaction still holding the row lock so an in-flight
    /// balance update is never silently discarded.
    pub fn delete_account(&self, id: AccountId) -> Result<(), LedgerError> {
        let cell = self.account_cell(id)?;
        let guard = cell.lock();
        self.accounts
            .remove(&id)
            .ok_or(LedgerError::AccountNotFound)?;
        drop(guard);
        Ok(())
    }

    /// Lists accounts ordered by id.
    pub fn list_accounts(&self, limit: usize, offset: usize) -> Vec<Account> {
        let cells: Vec<AccountCell> = self
            .accounts
            .iter()
            .map(|item| Arc::clone(item.value()))
            .collect();
        let mut rows: Vec<Account> = cells.iter().map(|cell| cell.lock().clone()).collect();
        rows.sort_by_key(|account| account.id);
        rows.into_iter().skip(offset).take(limit).collect()
    }

    // === Entries ===

    /// Creates an entry. The referenced account must exist.
    pub fn create_entry(&self, params: CreateEntryParams) -> Result<Entry, LedgerError> {
        if !self.accounts.contains_key(&params.account_id) {
            return Err(LedgerError::AccountNotFound);
        }
        let entry = Entry {
            id: self.next_entry_id(),
            account_id: params.account_id,
            amount: params.amount,
            created_at: Utc::now(),
        };
        self.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    pub fn get_entry(&self, id: EntryId) -> Result<Entry, LedgerError> {
        self.entries
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(LedgerError::EntryNotFound)
    }

    pub fn update_entry(&self, id: EntryId, params: UpdateEntryParams) -> Result<(), LedgerError> {
        self.entries
            .get_mut(&id)
            .map(|mut entry| entry.amount = params.amount)
            .ok_or(LedgerError::EntryNotFound)
    }

    pub fn delete_entry(&self, id: EntryId) -> Result<(), LedgerError> {
        self.entries
            .remove(&id)
            .map(|_| ())
            .ok_or(LedgerError::EntryNotFound)
    }

    /// Lists entries ordered by id.
    pub fn list_entries(&self, limit: usize, offset: usize) -> Vec<Entry> {
        let mut rows: Vec<Entry> = self.entries.iter().map(|item| item.value().clone()).collect();
        rows.sort_by_key(|entry| entry.id);
        rows.into_iter().skip(offset).take(limit).collect()
    }

    // === Transfers ===

    /// Creates a transfer row. Both referenced accounts must exist.
    pub fn create_transfer(&self, params: CreateTransferParams) -> Result<Transfer, LedgerError> {
        if !self.accounts.contains_key(&params.from_account_id)
            || !self.accounts.contains_key(&params.to_account_id)
        {
            return Err(LedgerError::AccountNotFound);
        }
        let transfer = Transfer {
            id: self.next_transfer_id(),
            from_account_id: params.from_account_id,
            to_account_id: params.to_account_id,
            amount: params.amount,
            created_at: Utc::now(),
        };
        self.transfers.insert(transfer.id, transfer.clone());
        Ok(transfer)
    }

    pub fn get_transfer(&self, id: TransferId) -> Result<Transfer, LedgerError> {
        self.transfers
            .get(&id)
            .map(|transfer| transfer.value().clone())
            .ok_or(LedgerError::TransferNotFound)
    }

    pub fn update_transfer(
        &self,
        id: TransferId,
        params: UpdateTransferParams,
    ) -> Result<(), LedgerError> {
        self.transfers
            .get_mut(&id)
            .map(|mut transfer| transfer.amount = params.amount)
            .ok_or(LedgerError::TransferNotFound)
    }

    pub fn delete_transfer(&self, id: TransferId) -> Result<(), LedgerError> {
        self.transfers
            .remove(&id)
            .map(|_| ())
            .ok_or(LedgerError::TransferNotFound)
    }

    /// Lists transfers ordered by id.
    pub fn list_transfers(&self, limit: usize, offset: usize) -> Vec<Transfer> {
        let mut rows: Vec<Transfer> = self
            .transfers
            .iter()
            .map(|item| item.value().clone())
            .collect();
        rows.sort_by_key(|transfer| transfer.id);
        rows.into_iter().skip(offset).take(limit).collect()
    }

    // === Unit of work ===

    /// Runs `work` inside a transaction.
    ///
    /// All storage calls inside `work` must go through the [`Tx`] handle it
    /// receives; the handle is the only way to take part in the
    /// transaction. On `Ok` the transaction commits and the value is
    /// returned; on `Err` every buffered write is discarded, every locked
    /// row is restored to its committed image, and the error is returned
    /// verbatim. Locks are released on every exit path, including panics.
    pub fn run<R>(
        &self,
        work: impl FnOnce(&mut Tx<'_>) -> Result<R, LedgerError>,
    ) -> Result<R, LedgerError> {
        self.run_with(&CancelToken::new(), work)
    }

    /// Like [`Store::run`], honoring a caller-supplied cancellation token.
    ///
    /// Cancellation observed during `work` or before commit aborts with
    /// [`LedgerError::Canceled`] and rolls back in full.
    pub fn run_with<R>(
        &self,
        cancel: &CancelToken,
        work: impl FnOnce(&mut Tx<'_>) -> Result<R, LedgerError>,
    ) -> Result<R, LedgerError> {
        let mut tx = Tx::begin(self, cancel.clone());
        match work(&mut tx) {
            Ok(value) => {
                if tx.is_canceled() {
                    tx.rollback();
                    return Err(LedgerError::Canceled);
                }
                tx.commit();
                Ok(value)
            }
            Err(err) => {
                tx.rollback();
                Err(err)
            }
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

/// Checked in-place balance increment shared by the ambient and
/// transactional paths. Overflow is a constraint failure.
pub(crate) fn apply_delta(account: &mut Account, delta: i64) -> Result<(), LedgerError> {
    account.balance = account
        .balance
        .checked_add(delta)
        .ok_or_else(|| LedgerError::Storage("balance overflow".into()))?;
    Ok(())
}
