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

//! Transfer engine integration tests, including the concurrency battery.
//!
//! Concurrent transfers are spawned on scoped threads and their results
//! collected by joining the handles; every execution is an independent
//! unit of work producing a single `Result`.

use bank_ledger_rs::{
    Account, AccountId, CancelToken, CreateAccountParams, Ledger, LedgerError, TransferRequest,
    TransferResult,
};
use std::collections::HashSet;

// === Helper Functions ===

fn open_account(ledger: &Ledger, owner: &str, balance: i64) -> Account {
    ledger.store().create_account(CreateAccountParams {
        owner: owner.into(),
        balance,
        currency: "USD".into(),
    })
}

fn make_request(from: AccountId, to: AccountId, amount: i64) -> TransferRequest {
    TransferRequest {
        from_account_id: from,
        to_account_id: to,
        amount,
    }
}

// === Single-Transfer Behavior ===

#[test]
fn transfer_updates_balances_and_creates_rows() {
    let ledger = Ledger::new();
    let alice = open_account(&ledger, "alice", 100);
    let bob = open_account(&ledger, "bob", 50);

    let result = ledger
        .transfer(make_request(alice.id, bob.id, 30))
        .unwrap();

    // Post-mutation snapshots as committed by this transaction.
    assert_eq!(result.from_account.id, alice.id);
    assert_eq!(result.from_account.balance, 70);
    assert_eq!(result.to_account.id, bob.id);
    assert_eq!(result.to_account.balance, 80);

    // Transfer row.
    assert_eq!(result.transfer.from_account_id, alice.id);
    assert_eq!(result.transfer.to_account_id, bob.id);
    assert_eq!(result.transfer.amount, 30);

    // Paired entries.
    assert_eq!(result.from_entry.account_id, alice.id);
    assert_eq!(result.from_entry.amount, -30);
    assert_eq!(result.to_entry.account_id, bob.id);
    assert_eq!(result.to_entry.amount, 30);

    // Everything is persisted exactly as returned.
    let store = ledger.store();
    assert_eq!(store.get_transfer(result.transfer.id).unwrap(), result.transfer);
    assert_eq!(store.get_entry(result.from_entry.id).unwrap(), result.from_entry);
    assert_eq!(store.get_entry(result.to_entry.id).unwrap(), result.to_entry);
    assert_eq!(store.get_account(alice.id).unwrap(), result.from_account);
    assert_eq!(store.get_account(bob.id).unwrap(), result.to_account);
}

#[test]
fn self_transfer_fails_with_zero_writes() {
    let ledger = Ledger::new();
    let alice = open_account(&ledger, "alice", 100);

    let result = ledger.transfer(make_request(alice.id, alice.id, 10));
    assert_eq!(result, Err(LedgerError::SelfTransfer));

    assert_eq!(ledger.store().get_account(alice.id).unwrap().balance, 100);
    assert!(ledger.store().list_transfers(100, 0).is_empty());
    assert!(ledger.store().list_entries(100, 0).is_empty());
}

#[test]
fn non_positive_amount_fails_with_zero_writes() {
    let ledger = Ledger::new();
    let alice = open_account(&ledger, "alice", 100);
    let bob = open_account(&ledger, "bob", 50);

    for amount in [0, -30] {
        let result = ledger.transfer(make_request(alice.id, bob.id, amount));
        assert_eq!(result, Err(LedgerError::InvalidAmount));
    }
    assert!(ledger.store().list_transfers(100, 0).is_empty());
    assert!(ledger.store().list_entries(100, 0).is_empty());
}

#[test]
fn transfer_to_missing_account_rolls_back() {
    let ledger = Ledger::new();
    let alice = open_account(&ledger, "alice", 100);

    let result = ledger.transfer(make_request(alice.id, AccountId(404), 30));
    assert_eq!(result, Err(LedgerError::AccountNotFound));

    assert_eq!(ledger.store().get_account(alice.id).unwrap().balance, 100);
    assert!(ledger.store().list_transfers(100, 0).is_empty());
    assert!(ledger.store().list_entries(100, 0).is_empty());
}

#[test]
fn transfer_from_missing_account_rolls_back() {
    let ledger = Ledger::new();
    let alice = open_account(&ledger, "alice", 100);

    let result = ledger.transfer(make_request(AccountId(404), alice.id, 30));
    assert_eq!(result, Err(LedgerError::AccountNotFound));

    assert_eq!(ledger.store().get_account(alice.id).unwrap().balance, 100);
    assert!(ledger.store().list_transfers(100, 0).is_empty());
}

#[test]
fn pre_canceled_transfer_performs_no_writes() {
    let ledger = Ledger::new();
    let alice = open_account(&ledger, "alice", 100);
    let bob = open_account(&ledger, "bob", 50);

    let cancel = CancelToken::new();
    cancel.cancel();

    let result = ledger.transfer_with(&cancel, make_request(alice.id, bob.id, 30));
    assert_eq!(result, Err(LedgerError::Canceled));

    assert_eq!(ledger.store().get_account(alice.id).unwrap().balance, 100);
    assert_eq!(ledger.store().get_account(bob.id).unwrap().balance, 50);
    assert!(ledger.store().list_transfers(100, 0).is_empty());
    assert!(ledger.store().list_entries(100, 0).is_empty());
}

// === Concurrency ===

/// N identical concurrent transfers must each observe a distinct,
/// serialized intermediate balance: the per-transfer deltas divided by the
/// amount form exactly {1, ..., N}.
#[test]
fn concurrent_transfers_observe_serialized_balances() {
    let ledger = Ledger::new();
    let alice = open_account(&ledger, "alice", 1_000);
    let bob = open_account(&ledger, "bob", 1_000);

    let n = 5;
    let amount = 10;

    let results: Vec<Result<TransferResult, LedgerError>> =
        crossbeam::thread::scope(|scope| {
            let handles: Vec<_> = (0..n)
                .map(|_| scope.spawn(|_| ledger.transfer(make_request(alice.id, bob.id, amount))))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        })
        .unwrap();

    let mut seen = HashSet::new();
    for result in results {
        let result = result.expect("concurrent transfer should succeed");

        assert_eq!(result.transfer.from_account_id, alice.id);
        assert_eq!(result.transfer.to_account_id, bob.id);
        assert_eq!(result.transfer.amount, amount);
        assert_eq!(result.from_entry.amount, -amount);
        assert_eq!(result.to_entry.amount, amount);

        let diff_from = alice.balance - result.from_account.balance;
        let diff_to = result.to_account.balance - bob.balance;
        assert_eq!(diff_from, diff_to);
        assert!(diff_from > 0);
        assert_eq!(diff_from % amount, 0);

        let k = diff_from / amount;
        assert!(k >= 1 && k <= n);
        assert!(
            seen.insert(k),
            "two transfers observed the same intermediate balance (k = {k})"
        );
    }

    let final_alice = ledger.store().get_account(alice.id).unwrap();
    let final_bob = ledger.store().get_account(bob.id).unwrap();
    assert_eq!(final_alice.balance, alice.balance - n * amount);
    assert_eq!(final_bob.balance, bob.balance + n * amount);

    assert_eq!(ledger.store().list_transfers(100, 0).len(), n as usize);
    assert_eq!(ledger.store().list_entries(100, 0).len(), 2 * n as usize);
}

/// Opposing concurrent transfers between the same pair of accounts must
/// all complete (locks are acquired in account-id order, never in request
/// order) and the final balances must reflect the net flow.
#[test]
fn concurrent_opposing_transfers_complete_without_deadlock() {
    let ledger = Ledger::new();
    let alice = open_account(&ledger, "alice", 10_000);
    let bob = open_account(&ledger, "bob", 10_000);

    let n = 12; // alice -> bob
    let m = 7; // bob -> alice
    let amount = 25;

    let results: Vec<Result<TransferResult, LedgerError>> =
        crossbeam::thread::scope(|scope| {
            let mut handles = Vec::with_capacity((n + m) as usize);
            for _ in 0..n {
                handles
                    .push(scope.spawn(|_| ledger.transfer(make_request(alice.id, bob.id, amount))));
            }
            for _ in 0..m {
                handles
                    .push(scope.spawn(|_| ledger.transfer(make_request(bob.id, alice.id, amount))));
            }
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        })
        .unwrap();

    for result in &results {
        assert!(result.is_ok(), "transfer failed: {:?}", result);
    }

    let final_alice = ledger.store().get_account(alice.id).unwrap();
    let final_bob = ledger.store().get_account(bob.id).unwrap();
    assert_eq!(final_alice.balance, alice.balance - n * amount + m * amount);
    assert_eq!(final_bob.balance, bob.balance + n * amount - m * amount);

    assert_eq!(ledger.store().list_transfers(100, 0).len(), (n + m) as usize);
    assert_eq!(ledger.store().list_entries(100, 0).len(), 2 * (n + m) as usize);
}

/// Concurrent transfers across several account pairs conserve the total.
#[test]
fn concurrent_transfers_conserve_total_balance() {
    let ledger = Ledger::new();
    let initial = 5_000;
    let accounts: Vec<Account> = (0..6)
        .map(|i| open_account(&ledger, &format!("owner-{i}"), initial))
        .collect();

    crossbeam::thread::scope(|scope| {
        for worker in 0..12usize {
            let accounts = &accounts;
            let ledger = &ledger;
            scope.spawn(move |_| {
                for round in 0..50usize {
                    let from = accounts[(worker + round) % accounts.len()].id;
                    let to = accounts[(worker + round + 1) % accounts.len()].id;
                    ledger
                        .transfer(make_request(from, to, 3))
                        .expect("transfer should succeed");
                }
            });
        }
    })
    .unwrap();

    let total: i64 = ledger
        .store()
        .list_accounts(100, 0)
        .iter()
        .map(|account| account.balance)
        .sum();
    assert_eq!(total, initial * accounts.len() as i64);
}
