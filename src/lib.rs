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

//! # Bank Ledger
//!
//! This library provides a minimal bank-account ledger: accounts hold
//! balances, entries record signed balance deltas, and transfers move money
//! between two accounts atomically.
//!
//! ## Core Components
//!
//! - [`Ledger`]: the transfer engine — one transfer is one transfer row,
//!   two entries and two balance updates, committed or rolled back as a
//!   whole
//! - [`Store`]: embedded thread-safe storage with per-entity CRUD and the
//!   unit-of-work executor ([`Store::run`] / [`Store::run_with`])
//! - [`Tx`]: the transaction-scoped storage handle, only obtainable inside
//!   a unit of work
//! - [`LedgerError`]: error taxonomy shared by every operation
//!
//! ## Example
//!
//! ```
//! use bank_ledger_rs::{CreateAccountParams, Ledger, TransferRequest};
//!
//! let ledger = Ledger::new();
//! let alice = ledger.store().create_account(CreateAccountParams {
//!     owner: "alice".into(),
//!     balance: 100,
//!     currency: "USD".into(),
//! });
//! let bob = ledger.store().create_account(CreateAccountParams {
//!     owner: "bob".into(),
//!     balance: 50,
//!     currency: "USD".into(),
//! });
//!
//! let result = ledger
//!     .transfer(TransferRequest {
//!         from_account_id: alice.id,
//!         to_account_id: bob.id,
//!         amount: 30,
//!     })
//!     .unwrap();
//!
//! assert_eq!(result.from_account.balance, 70);
//! assert_eq!(result.to_account.balance, 80);
//! ```
//!
//! ## Thread Safety
//!
//! Transfers may be issued concurrently from any number of threads. Each
//! account row carries its own lock; the engine acquires the two locks of a
//! transfer in ascending account-id order regardless of transfer direction,
//! so opposing transfers over the same pair of accounts cannot deadlock.

pub mod account;
mod base;
mod entry;
pub mod error;
mod ledger;
mod store;
mod transfer;
mod tx;

pub use account::{Account, CreateAccountParams, UpdateAccountParams};
pub use base::{AccountId, CancelToken, EntryId, TransferId};
pub use entry::{CreateEntryParams, Entry, UpdateEntryParams};
pub use error::LedgerError;
pub use ledger::Ledger;
pub use store::Store;
pub use transfer::{
    CreateTransferParams, Transfer, TransferRequest, TransferResult, UpdateTransferParams,
};
pub use tx::Tx;
