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

//! Property-based tests for the transfer engine.
//!
//! These tests verify invariants that should hold for any sequence of
//! transfers: money is conserved, entries reconcile with balances, and
//! invalid requests never mutate anything.

use bank_ledger_rs::{Account, CreateAccountParams, Ledger, LedgerError, TransferRequest};
use proptest::prelude::*;

// =============================================================================
// Arbitrary Strategies
// =============================================================================

/// Generate a positive transfer amount.
fn arb_amount() -> impl Strategy<Value = i64> {
    1i64..=10_000
}

/// Generate a sequence of (from-index, to-index, amount) triples over a
/// small pool of accounts. Indices may coincide (self transfers are part
/// of the input space and must be rejected).
fn arb_transfer_plan(accounts: usize) -> impl Strategy<Value = Vec<(usize, usize, i64)>> {
    prop::collection::vec((0..accounts, 0..accounts, arb_amount()), 1..40)
}

fn open_accounts(ledger: &Ledger, count: usize, balance: i64) -> Vec<Account> {
    (0..count)
        .map(|i| {
            ledger.store().create_account(CreateAccountParams {
                owner: format!("owner-{i}"),
                balance,
                currency: "USD".into(),
            })
        })
        .collect()
}

// =============================================================================
// Conservation Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// The sum of all balances never changes, whatever mix of valid and
    /// rejected transfers runs.
    #[test]
    fn transfers_conserve_total_balance(plan in arb_transfer_plan(4)) {
        let ledger = Ledger::new();
        let initial = 1_000_000i64;
        let accounts = open_accounts(&ledger, 4, initial);

        for (from, to, amount) in plan {
            let result = ledger.transfer(TransferRequest {
                from_account_id: accounts[from].id,
                to_account_id: accounts[to].id,
                amount,
            });
            if from == to {
                prop_assert_eq!(result, Err(LedgerError::SelfTransfer));
            } else {
                prop_assert!(result.is_ok());
            }
        }

        let total: i64 = ledger
            .store()
            .list_accounts(10, 0)
            .iter()
            .map(|account| account.balance)
            .sum();
        prop_assert_eq!(total, 4 * initial);
    }

    /// Each final balance equals the initial balance plus the net flow of
    /// the successful transfers touching that account.
    #[test]
    fn final_balances_match_net_flow(plan in arb_transfer_plan(4)) {
        let ledger = Ledger::new();
        let initial = 1_000_000i64;
        let accounts = open_accounts(&ledger, 4, initial);
        let mut net = [0i64; 4];

        for (from, to, amount) in plan {
            let result = ledger.transfer(TransferRequest {
                from_account_id: accounts[from].id,
                to_account_id: accounts[to].id,
                amount,
            });
            if result.is_ok() {
                net[from] -= amount;
                net[to] += amount;
            }
        }

        for (i, account) in accounts.iter().enumerate() {
            let current = ledger.store().get_account(account.id).unwrap();
            prop_assert_eq!(current.balance, initial + net[i]);
        }
    }

    /// For every account, the sum of its entries reconciles exactly with
    /// how far its balance moved from the initial value.
    #[test]
    fn entries_reconcile_with_balances(plan in arb_transfer_plan(3)) {
        let ledger = Ledger::new();
        let initial = 1_000_000i64;
        let accounts = open_accounts(&ledger, 3, initial);

        for (from, to, amount) in plan {
            let _ = ledger.transfer(TransferRequest {
                from_account_id: accounts[from].id,
                to_account_id: accounts[to].id,
                amount,
            });
        }

        let entries = ledger.store().list_entries(usize::MAX, 0);
        for account in &accounts {
            let entry_sum: i64 = entries
                .iter()
                .filter(|entry| entry.account_id == account.id)
                .map(|entry| entry.amount)
                .sum();
            let current = ledger.store().get_account(account.id).unwrap();
            prop_assert_eq!(current.balance - initial, entry_sum);
        }
    }
}

// =============================================================================
// Result-Shape Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// A successful transfer's result is internally consistent.
    #[test]
    fn transfer_result_is_consistent(
        initial_from in 0i64..=1_000_000,
        initial_to in 0i64..=1_000_000,
        amount in arb_amount(),
    ) {
        let ledger = Ledger::new();
        let from = ledger.store().create_account(CreateAccountParams {
            owner: "from".into(),
            balance: initial_from,
            currency: "USD".into(),
        });
        let to = ledger.store().create_account(CreateAccountParams {
            owner: "to".into(),
            balance: initial_to,
            currency: "USD".into(),
        });

        let result = ledger.transfer(TransferRequest {
            from_account_id: from.id,
            to_account_id: to.id,
            amount,
        }).unwrap();

        prop_assert_eq!(result.transfer.amount, amount);
        prop_assert_eq!(result.from_entry.amount, -amount);
        prop_assert_eq!(result.to_entry.amount, amount);
        prop_assert_eq!(result.from_account.balance, initial_from - amount);
        prop_assert_eq!(result.to_account.balance, initial_to + amount);

        // Snapshots are exactly what was committed.
        prop_assert_eq!(
            ledger.store().get_account(from.id).unwrap(),
            result.from_account
        );
        prop_assert_eq!(
            ledger.store().get_account(to.id).unwrap(),
            result.to_account
        );
    }

    /// Self transfers are always rejected without writes.
    #[test]
    fn self_transfers_always_rejected(balance in 0i64..=1_000_000, amount in arb_amount()) {
        let ledger = Ledger::new();
        let account = ledger.store().create_account(CreateAccountParams {
            owner: "solo".into(),
            balance,
            currency: "USD".into(),
        });

        let result = ledger.transfer(TransferRequest {
            from_account_id: account.id,
            to_account_id: account.id,
            amount,
        });

        prop_assert_eq!(result, Err(LedgerError::SelfTransfer));
        prop_assert_eq!(ledger.store().get_account(account.id).unwrap().balance, balance);
        prop_assert!(ledger.store().list_transfers(10, 0).is_empty());
        prop_assert!(ledger.store().list_entries(10, 0).is_empty());
    }

    /// Non-positive amounts are always rejected without writes.
    #[test]
    fn non_positive_amounts_always_rejected(amount in -10_000i64..=0) {
        let ledger = Ledger::new();
        let accounts = open_accounts(&ledger, 2, 100);

        let result = ledger.transfer(TransferRequest {
            from_account_id: accounts[0].id,
            to_account_id: accounts[1].id,
            amount,
        });

        prop_assert_eq!(result, Err(LedgerError::InvalidAmount));
        prop_assert!(ledger.store().list_transfers(10, 0).is_empty());
    }
}

// =============================================================================
// Listing Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Pagination returns id-ordered windows of the expected size.
    #[test]
    fn account_listing_paginates_consistently(
        count in 1usize..20,
        limit in 0usize..25,
        offset in 0usize..25,
    ) {
        let ledger = Ledger::new();
        open_accounts(&ledger, count, 0);

        let page = ledger.store().list_accounts(limit, offset);
        let expected = limit.min(count.saturating_sub(offset));
        prop_assert_eq!(page.len(), expected);
        for pair in page.windows(2) {
            prop_assert!(pair[0].id < pair[1].id);
        }
    }
}
