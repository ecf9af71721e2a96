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

//! The transaction-scoped storage handle.
//!
//! A [`Tx`] is only obtainable inside [`Store::run`] / [`Store::run_with`],
//! so the type system rules out issuing a transactional call outside its
//! transaction. It exposes the same per-entity operations as the ambient
//! [`Store`], bound to the active transaction:
//!
//! - Row creations are buffered and only become visible at commit.
//! - [`Tx::add_account_balance`] acquires the account's row lock and holds
//!   it until commit or rollback (strict two-phase locking), applying the
//!   delta in place with an undo image for rollback.
//! - Updates and deletes of committed rows are recorded in a write-set
//!   applied at commit.
//! - Reads see this transaction's own writes. A read of a row locked by
//!   another transaction blocks until that transaction finishes.
//!
//! Lock acquisition order across multiple accounts is the caller's
//! responsibility; the transfer engine always locks in ascending account-id
//! order, which is what makes it deadlock-free.

use crate::account::{Account, CreateAccountParams, UpdateAccountParams};
use crate::base::{AccountId, CancelToken, EntryId, TransferId};
use crate::entry::{CreateEntryParams, Entry, UpdateEntryParams};
use crate::error::LedgerError;
use crate::store::{Store, apply_delta};
use crate::transfer::{CreateTransferParams, Transfer, UpdateTransferParams};
use chrono::Utc;
use parking_lot::{Mutex, RawMutex};
use std::collections::HashMap;
use std::collections::hash_map::Entry as Slot;
use std::sync::Arc;

/// Owned row-lock guard, held in the transaction until commit or rollback.
type RowGuard = parking_lot::lock_api::ArcMutexGuard<RawMutex, Account>;

/// An account row this transaction has locked.
struct LockedRow {
    guard: RowGuard,
    /// Committed image, restored on rollback.
    original: Account,
    /// Deletion is deferred to commit so other readers never see a row
    /// vanish and reappear.
    deleted: bool,
}

/// Buffered mutations of committed entry/transfer rows.
enum Pending {
    UpdateEntry(EntryId, i64),
    DeleteEntry(EntryId),
    UpdateTransfer(TransferId, i64),
    DeleteTransfer(TransferId),
}

/// A transaction over the [`Store`].
///
/// Dropped without an explicit commit (work-function error, cancellation,
/// panic), the transaction rolls back: buffered writes are discarded and
/// every locked row is restored to its committed image before the lock is
/// released.
pub struct Tx<'s> {
    store: &'s Store,
    cancel: CancelToken,
    locks: HashMap<AccountId, LockedRow>,
    created_accounts: Vec<Account>,
    created_entries: Vec<Entry>,
    created_transfers: Vec<Transfer>,
    pending: Vec<Pending>,
    finished: bool,
}

impl<'s> Tx<'s> {
    pub(crate) fn begin(store: &'s Store, cancel: CancelToken) -> Self {
        Tx {
            store,
            cancel,
            locks: HashMap::new(),
            created_accounts: Vec::new(),
            created_entries: Vec::new(),
            created_transfers: Vec::new(),
            pending: Vec::new(),
            finished: false,
        }
    }

    pub(crate) fn is_canceled(&self) -> bool {
        self.cancel.is_canceled()
    }

    fn check_cancel(&self) -> Result<(), LedgerError> {
        if self.cancel.is_canceled() {
            Err(LedgerError::Canceled)
        } else {
            Ok(())
        }
    }

    /// Acquires (or reuses) the row lock for a committed account.
    fn lock_row(&mut self, id: AccountId) -> Result<&mut LockedRow, LedgerError> {
        match self.locks.entry(id) {
            Slot::Occupied(slot) => Ok(slot.into_mut()),
            Slot::Vacant(slot) => {
                let cell = self.store.account_cell(id)?;
                // Blocks until any other transaction holding this row lock
                // commits or rolls back.
                let guard = cell.lock_arc();
                let original = guard.clone();
                Ok(slot.insert(LockedRow {
                    guard,
                    original,
                    deleted: false,
                }))
            }
        }
    }

    /// An account is visible to this transaction if it is committed, was
    /// created by this transaction, and has not been deleted by it.
    fn account_exists(&self, id: AccountId) -> bool {
        if let Some(locked) = self.locks.get(&id) {
            return !locked.deleted;
        }
        if self.created_accounts.iter().any(|a| a.id == id) {
            return true;
        }
        self.store.accounts.contains_key(&id)
    }

    // === Accounts ===

    /// Creates an account; the row becomes visible to others at commit.
    pub fn create_account(&mut self, params: CreateAccountParams) -> Result<Account, LedgerError> {
        self.check_cancel()?;
        let account = Account {
            id: self.store.next_account_id(),
            owner: params.owner,
            balance: params.balance,
            currency: params.currency,
            created_at: Utc::now(),
        };
        self.created_accounts.push(account.clone());
        Ok(account)
    }

    /// Reads an account, seeing this transaction's own writes first.
    pub fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.check_cancel()?;
        if let Some(locked) = self.locks.get(&id) {
            if locked.deleted {
                return Err(LedgerError::AccountNotFound);
            }
            return Ok(locked.guard.clone());
        }
        if let Some(row) = self.created_accounts.iter().find(|a| a.id == id) {
            return Ok(row.clone());
        }
        self.store.get_account(id)
    }

    /// Applies a signed delta to an account balance.
    ///
    /// The increment is applied as a single `balance = balance + delta`
    /// mutation under the row lock, never as a separate read and write, and
    /// the lock stays held until the transaction finishes. Returns the
    /// updated row, which is exactly the snapshot this transaction will
    /// commit.
    pub fn add_account_balance(
        &mut self,
        id: AccountId,
        delta: i64,
    ) -> Result<Account, LedgerError> {
        self.check_cancel()?;
        if let Some(row) = self.created_accounts.iter_mut().find(|a| a.id == id) {
            apply_delta(row, delta)?;
            return Ok(row.clone());
        }
        let locked = self.lock_row(id)?;
        if locked.deleted {
            return Err(LedgerError::AccountNotFound);
        }
        apply_delta(&mut locked.guard, delta)?;
        Ok(locked.guard.clone())
    }

    /// Updates the owner label of an account.
    pub fn update_account(
        &mut self,
        id: AccountId,
        params: UpdateAccountParams,
    ) -> Result<(), LedgerError> {
        self.check_cancel()?;
        if let Some(row) = self.created_accounts.iter_mut().find(|a| a.id == id) {
            row.owner = params.owner;
            return Ok(());
        }
        let locked = self.lock_row(id)?;
        if locked.deleted {
            return Err(LedgerError::AccountNotFound);
        }
        locked.guard.owner = params.owner;
        Ok(())
    }

    /// Deletes an account; the row disappears for others at commit.
    pub fn delete_account(&mut self, id: AccountId) -> Result<(), LedgerError> {
        self.check_cancel()?;
        if let Some(pos) = self.created_accounts.iter().position(|a| a.id == id) {
            self.created_accounts.remove(pos);
            return Ok(());
        }
        let locked = self.lock_row(id)?;
        if locked.deleted {
            return Err(LedgerError::AccountNotFound);
        }
        locked.deleted = true;
        Ok(())
    }

    /// Lists accounts ordered by id, as visible to this transaction.
    pub fn list_accounts(&self, limit: usize, offset: usize) -> Result<Vec<Account>, LedgerError> {
        self.check_cancel()?;
        let cells: Vec<(AccountId, crate::store::AccountCell)> = self
            .store
            .accounts
            .iter()
            .map(|item| (*item.key(), Arc::clone(item.value())))
            .collect();
        let mut rows = Vec::with_capacity(cells.len() + self.created_accounts.len());
        for (id, cell) in cells {
            if let Some(locked) = self.locks.get(&id) {
                if !locked.deleted {
                    rows.push(locked.guard.clone());
                }
            } else {
                rows.push(cell.lock().clone());
            }
        }
        rows.extend(self.created_accounts.iter().cloned());
        rows.sort_by_key(|account| account.id);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    // === Entries ===

    /// Creates an entry; visible to others at commit. The referenced
    /// account must be visible to this transaction.
    pub fn create_entry(&mut self, params: CreateEntryParams) -> Result<Entry, LedgerError> {
        self.check_cancel()?;
        if !self.account_exists(params.account_id) {
            return Err(LedgerError::AccountNotFound);
        }
        let entry = Entry {
            id: self.store.next_entry_id(),
            account_id: params.account_id,
            amount: params.amount,
            created_at: Utc::now(),
        };
        self.created_entries.push(entry.clone());
        Ok(entry)
    }

    pub fn get_entry(&self, id: EntryId) -> Result<Entry, LedgerError> {
        self.check_cancel()?;
        if let Some(entry) = self.created_entries.iter().find(|e| e.id == id) {
            return Ok(entry.clone());
        }
        let mut row = self.store.get_entry(id);
        for op in &self.pending {
            match op {
                Pending::UpdateEntry(pid, amount) if *pid == id => {
                    if let Ok(entry) = row.as_mut() {
                        entry.amount = *amount;
                    }
                }
                Pending::DeleteEntry(pid) if *pid == id => {
                    row = Err(LedgerError::EntryNotFound);
                }
                _ => {}
            }
        }
        row
    }

    pub fn update_entry(
        &mut self,
        id: EntryId,
        params: UpdateEntryParams,
    ) -> Result<(), LedgerError> {
        self.check_cancel()?;
        if let Some(entry) = self.created_entries.iter_mut().find(|e| e.id == id) {
            entry.amount = params.amount;
            return Ok(());
        }
        self.get_entry(id)?;
        self.pending.push(Pending::UpdateEntry(id, params.amount));
        Ok(())
    }

    pub fn delete_entry(&mut self, id: EntryId) -> Result<(), LedgerError> {
        self.check_cancel()?;
        if let Some(pos) = self.created_entries.iter().position(|e| e.id == id) {
            self.created_entries.remove(pos);
            return Ok(());
        }
        self.get_entry(id)?;
        self.pending.push(Pending::DeleteEntry(id));
        Ok(())
    }

    /// Lists entries ordered by id, as visible to this transaction.
    pub fn list_entries(&self, limit: usize, offset: usize) -> Result<Vec<Entry>, LedgerError> {
        self.check_cancel()?;
        let mut rows: Vec<Entry> = self
            .store
            .entries
            .iter()
            .map(|item| item.value().clone())
            .collect();
        for op in &self.pending {
            match op {
                Pending::UpdateEntry(id, amount) => {
                    if let Some(entry) = rows.iter_mut().find(|e| e.id == *id) {
                        entry.amount = *amount;
                    }
                }
                Pending::DeleteEntry(id) => rows.retain(|e| e.id != *id),
                _ => {}
            }
        }
        rows.extend(self.created_entries.iter().cloned());
        rows.sort_by_key(|entry| entry.id);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    // === Transfers ===

    /// Creates a transfer row; visible to others at commit. Both referenced
    /// accounts must be visible to this transaction.
    pub fn create_transfer(
        &mut self,
        params: CreateTransferParams,
    ) -> Result<Transfer, LedgerError> {
        self.check_cancel()?;
        if !self.account_exists(params.from_account_id)
            || !self.account_exists(params.to_account_id)
        {
            return Err(LedgerError::AccountNotFound);
        }
        let transfer = Transfer {
            id: self.store.next_transfer_id(),
            from_account_id: params.from_account_id,
            to_account_id: params.to_account_id,
            amount: params.amount,
            created_at: Utc::now(),
        };
        self.created_transfers.push(transfer.clone());
        Ok(transfer)
    }

    pub fn get_transfer(&self, id: TransferId) -> Result<Transfer, LedgerError> {
        self.check_cancel()?;
        if let Some(transfer) = self.created_transfers.iter().find(|t| t.id == id) {
            return Ok(transfer.clone());
        }
        let mut row = self.store.get_transfer(id);
        for op in &self.pending {
            match op {
                Pending::UpdateTransfer(pid, amount) if *pid == id => {
                    if let Ok(transfer) = row.as_mut() {
                        transfer.amount = *amount;
                    }
                }
                Pending::DeleteTransfer(pid) if *pid == id => {
                    row = Err(LedgerError::TransferNotFound);
                }
                _ => {}
            }
        }
        row
    }

    pub fn update_transfer(
        &mut self,
        id: TransferId,
        params: UpdateTransferParams,
    ) -> Result<(), LedgerError> {
        self.check_cancel()?;
        if let Some(transfer) = self.created_transfers.iter_mut().find(|t| t.id == id) {
            transfer.amount = params.amount;
            return Ok(());
        }
        self.get_transfer(id)?;
        self.pending
            .push(Pending::UpdateTransfer(id, params.amount));
        Ok(())
    }

    pub fn delete_transfer(&mut self, id: TransferId) -> Result<(), LedgerError> {
        self.check_cancel()?;
        if let Some(pos) = self.created_transfers.iter().position(|t| t.id == id) {
            self.created_transfers.remove(pos);
            return Ok(());
        }
        self.get_transfer(id)?;
        self.pending.push(Pending::DeleteTransfer(id));
        Ok(())
    }

    /// Lists transfers ordered by id, as visible to this transaction.
    pub fn list_transfers(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transfer>, LedgerError> {
        self.check_cancel()?;
        let mut rows: Vec<Transfer> = self
            .store
            .transfers
            .iter()
            .map(|item| item.value().clone())
            .collect();
        for op in &self.pending {
            match op {
                Pending::UpdateTransfer(id, amount) => {
                    if let Some(transfer) = rows.iter_mut().find(|t| t.id == *id) {
                        transfer.amount = *amount;
                    }
                }
                Pending::DeleteTransfer(id) => rows.retain(|t| t.id != *id),
                _ => {}
            }
        }
        rows.extend(self.created_transfers.iter().cloned());
        rows.sort_by_key(|transfer| transfer.id);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    // === Lifecycle ===

    /// Publishes buffered work, then releases the row locks. A reader
    /// blocked on a row lock observes the fully committed state once the
    /// lock is released.
    pub(crate) fn commit(mut self) {
        for account in self.created_accounts.drain(..) {
            self.store
                .accounts
                .insert(account.id, Arc::new(Mutex::new(account)));
        }
        for entry in self.created_entries.drain(..) {
            self.store.entries.insert(entry.id, entry);
        }
        for transfer in self.created_transfers.drain(..) {
            self.store.transfers.insert(transfer.id, transfer);
        }
        for op in self.pending.drain(..) {
            match op {
                Pending::UpdateEntry(id, amount) => {
                    if let Some(mut entry) = self.store.entries.get_mut(&id) {
                        entry.amount = amount;
                    }
                }
                Pending::DeleteEntry(id) => {
                    self.store.entries.remove(&id);
                }
                Pending::UpdateTransfer(id, amount) => {
                    if let Some(mut transfer) = self.store.transfers.get_mut(&id) {
                        transfer.amount = amount;
                    }
                }
                Pending::DeleteTransfer(id) => {
                    self.store.transfers.remove(&id);
                }
            }
        }
        for (id, locked) in self.locks.drain() {
            if locked.deleted {
                self.store.accounts.remove(&id);
            }
            // Row lock released here; in-place balance updates are now
            // committed.
        }
        self.finished = true;
    }

    pub(crate) fn rollback(mut self) {
        self.rollback_in_place();
        self.finished = true;
    }

    fn rollback_in_place(&mut self) {
        self.created_accounts.clear();
        self.created_entries.clear();
        self.created_transfers.clear();
        self.pending.clear();
        for (_, locked) in self.locks.drain() {
            let mut guard = locked.guard;
            *guard = locked.original;
            // Row lock released here with the committed image restored.
        }
    }
}

impl Drop for Tx<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.rollback_in_place();
        }
    }
}
