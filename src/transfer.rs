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

//! Transfer rows and the request/result types of the transfer engine.
//!
//! A transfer pairs exactly two entries created in the same unit of work:
//! one negative on the source account, one positive on the destination.

use crate::account::Account;
use crate::base::{AccountId, TransferId};
use crate::entry::Entry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the transfers table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    /// Always positive; the sign lives on the paired entries.
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating a transfer row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTransferParams {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: i64,
}

/// Parameters for updating a transfer's amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTransferParams {
    pub amount: i64,
}

/// A request to move `amount` units from one account to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    /// Must be positive; validated before any transaction is opened.
    pub amount: i64,
}

/// Everything a completed transfer changed, as committed by its
/// transaction.
///
/// The account fields are post-mutation snapshots taken while this
/// transaction still held the row locks, not fresh re-reads that could race
/// with other transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub transfer: Transfer,
    pub from_entry: Entry,
    pub to_entry: Entry,
    pub from_account: Account,
    pub to_account: Account,
}
