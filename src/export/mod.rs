//! Ledger export of a sent invoice

mod ledger;

pub(crate) use ledger::{LedgerRow, export_invoice, ledger_path, ledger_rows};
