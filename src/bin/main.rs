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

use bank_ledger_rs::{AccountId, CreateAccountParams, Ledger, TransferRequest};
use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;

/// Bank Ledger - Process operation CSV files
///
/// Reads account and transfer operations from a CSV file and outputs the
/// final account table to stdout.
#[derive(Parser, Debug)]
#[command(name = "bank-ledger-rs")]
#[command(about = "A ledger that processes account/transfer operation CSVs", long_about = None)]
struct Args {
    /// Path to CSV file with operations
    ///
    /// Expected format: type,owner,currency,from,to,amount
    /// Example: cargo run -- operations.csv > accounts.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,
}

fn main() {
    let args = Args::parse();

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let ledger = match process_operations(BufReader::new(file)) {
        Ok(ledger) => ledger,
        Err(e) => {
            eprintln!("Error processing operations: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = write_accounts(&ledger, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `type, owner, currency, from, to, amount`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "type")]
    op_type: String,
    owner: Option<String>,
    currency: Option<String>,
    #[serde(deserialize_with = "csv::invalid_option")]
    from: Option<i64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    to: Option<i64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    amount: Option<i64>,
}

/// One parsed ledger operation.
#[derive(Debug)]
enum Operation {
    Open {
        owner: String,
        currency: String,
        balance: i64,
    },
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: i64,
    },
}

impl CsvRecord {
    /// Converts a CSV record to an operation.
    ///
    /// Returns `None` for unknown operation types or missing required
    /// fields.
    fn into_operation(self) -> Option<Operation> {
        match self.op_type.to_lowercase().as_str() {
            "open" => Some(Operation::Open {
                owner: self.owner?,
                currency: self.currency?,
                balance: self.amount.unwrap_or(0),
            }),
            "transfer" => Some(Operation::Transfer {
                from: AccountId(self.from?),
                to: AccountId(self.to?),
                amount: self.amount?,
            }),
            _ => None,
        }
    }
}

/// Process operations from a CSV reader.
///
/// Uses streaming parsing so arbitrarily large files never load into memory
/// at once. Malformed rows and failed operations are silently skipped.
///
/// # CSV Format
///
/// Expected columns: `type, owner, currency, from, to, amount`
/// - `open`: creates an account for `owner` in `currency` with an initial
///   balance of `amount` (accounts receive sequential ids starting at 1)
/// - `transfer`: moves `amount` units from account `from` to account `to`
///
/// # Example
///
/// ```csv
/// type,owner,currency,from,to,amount
/// open,alice,USD,,,10000
/// open,bob,USD,,,5000
/// transfer,,,1,2,2500
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is
/// invalid. Individual operation errors are logged in debug mode but don't
/// stop processing.
pub fn process_operations<R: Read>(reader: R) -> Result<Ledger, csv::Error> {
    let ledger = Ledger::new();

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    for result in rdr.deserialize::<CsvRecord>() {
        match result {
            Ok(record) => {
                let Some(op) = record.into_operation() else {
                    #[cfg(debug_assertions)]
                    eprintln!("Skipping invalid operation record");
                    continue;
                };

                match op {
                    Operation::Open {
                        owner,
                        currency,
                        balance,
                    } => {
                        ledger.store().create_account(CreateAccountParams {
                            owner,
                            balance,
                            currency,
                        });
                    }
                    Operation::Transfer { from, to, amount } => {
                        let request = TransferRequest {
                            from_account_id: from,
                            to_account_id: to,
                            amount,
                        };
                        if let Err(_e) = ledger.transfer(request) {
                            #[cfg(debug_assertions)]
                            eprintln!("Skipping transfer {}->{}: {}", from, to, _e);
                        }
                    }
                }
            }
            Err(_e) => {
                #[cfg(debug_assertions)]
                eprintln!("Skipping malformed row: {}", _e);
                continue;
            }
        }
    }

    Ok(ledger)
}

/// Write the final account table to a CSV writer.
///
/// # CSV Format
///
/// Columns: `id, owner, balance, currency, created_at`
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_accounts<W: Write>(ledger: &Ledger, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    for account in ledger.store().list_accounts(usize::MAX, 0) {
        wtr.serialize(&account)?;
    }

    wtr.flush()?;
    Ok(())
}
