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

//! Account rows and their operation parameters.
//!
//! An account's balance is a signed integer in the smallest currency unit
//! and is, by construction, the sum of all [`Entry`] amounts recorded
//! against the account.
//!
//! [`Entry`]: crate::Entry

use crate::base::AccountId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the accounts table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub owner: String,
    /// Balance in the smallest currency unit. May be negative: the transfer
    /// engine does not enforce an insufficient-funds policy.
    pub balance: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccountParams {
    pub owner: String,
    pub balance: i64,
    pub currency: String,
}

/// Parameters for updating an account's owner label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAccountParams {
    pub owner: String,
}
