mod format;
mod json;
mod table;

pub(crate) use json::{output_invoice_json, output_item_json, output_ledger_json, output_list_json};
pub(crate) use table::{print_invoice_list, print_invoice_tables};
