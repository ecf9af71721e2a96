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

//! Error types for ledger operations.

use thiserror::Error;

/// Ledger operation errors.
///
/// The unit-of-work executor propagates every error from a work function
/// verbatim after rolling back, so callers can distinguish permanent
/// argument errors from storage failures by matching on the variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Amount is zero or negative
    #[error("invalid amount (must be positive)")]
    InvalidAmount,

    /// Transfer names the same account as source and destination
    #[error("transfer source and destination accounts must differ")]
    SelfTransfer,

    /// Referenced account id does not exist
    #[error("account not found")]
    AccountNotFound,

    /// Referenced entry id does not exist
    #[error("entry not found")]
    EntryNotFound,

    /// Referenced transfer id does not exist
    #[error("transfer not found")]
    TransferNotFound,

    /// Storage-level failure (constraint violation such as balance overflow)
    #[error("storage failure: {0}")]
    Storage(String),

    /// Unit of work aborted by a caller-supplied cancellation token
    #[error("operation canceled")]
    Canceled,
}

#[cfg(test)]
mod tests {
    use super::LedgerError;

    #[test]
    fn error_display_messages() {
        assert_eq!(
            LedgerError::InvalidAmount.to_string(),
            "invalid amount (must be positive)"
        );
        assert_eq!(
            LedgerError::SelfTransfer.to_string(),
            "transfer source and destination accounts must differ"
        );
        assert_eq!(LedgerError::AccountNotFound.to_string(), "account not found");
        assert_eq!(LedgerError::EntryNotFound.to_string(), "entry not found");
        assert_eq!(LedgerError::TransferNotFound.to_string(), "transfer not found");
        assert_eq!(
            LedgerError::Storage("balance overflow".into()).to_string(),
            "storage failure: balance overflow"
        );
        assert_eq!(LedgerError::Canceled.to_string(), "operation canceled");
    }

    #[test]
    fn errors_are_cloneable() {
        let error = LedgerError::AccountNotFound;
        let cloned = error.clone();
        assert_eq!(error, cloned);
    }
}
