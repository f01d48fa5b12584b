//! Voucher spreadsheet for the finance ledger
//!
//! Every invoice item becomes two consecutive rows: a transaction row
//! charging the item's account code and a NIC row crediting the facility
//! code with the negated amount.

use std::fs;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::Serialize;

use crate::consts::{NIC_ACCOUNT, TRANSACTION_ACCOUNT, VOUCHER_HEADER, VOUCHER_SHEET};
use crate::core::{InvoiceCollection, InvoicePeriod};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct LedgerRow {
    pub(crate) description: String,
    pub(crate) amount: f64,
    pub(crate) account_code: u32,
    pub(crate) activity_code: String,
}

/// `[a0, b0, a1, b1, ...]`; stops at the shorter input
pub(crate) fn interleave<T: Clone>(a: &[T], b: &[T]) -> Vec<T> {
    a.iter()
        .zip(b)
        .flat_map(|(x, y)| [x.clone(), y.clone()])
        .collect()
}

/// Build rows from parallel per-item sequences of account codes, rounded
/// amounts and group-head emails.
pub(crate) fn ledger_rows_from(
    accounts: &[String],
    amounts: &[f64],
    group_heads: &[String],
    period: &InvoicePeriod,
    facility_code: &str,
) -> Vec<LedgerRow> {
    let n = accounts.len();
    let nic_codes = vec![facility_code.to_string(); n];
    let activity_codes = interleave(accounts, &nic_codes);

    // subtracting from zero keeps a zero charge at +0.0
    let nic_amounts: Vec<f64> = amounts.iter().map(|a| 0.0 - a).collect();
    let charges = interleave(amounts, &nic_amounts);

    let account_codes = interleave(&vec![TRANSACTION_ACCOUNT; n], &vec![NIC_ACCOUNT; n]);
    let heads = interleave(group_heads, group_heads);

    heads
        .iter()
        .zip(charges)
        .zip(account_codes)
        .zip(activity_codes)
        .map(|(((head, amount), account_code), activity_code)| LedgerRow {
            description: format!(
                "NIC charges for {} {} for {}",
                period.sessions_month, period.sessions_year, head
            ),
            amount,
            account_code,
            activity_code,
        })
        .collect()
}

pub(crate) fn ledger_rows(invoice: &InvoiceCollection, facility_code: &str) -> Vec<LedgerRow> {
    ledger_rows_from(
        &invoice.accounts(),
        &invoice.amounts(),
        &invoice.group_heads(),
        &invoice.period,
        facility_code,
    )
}

/// `{folder}/{sessions_year}/{sessions_month} {sessions_year} NIC user charges new template.xlsx`
pub(crate) fn ledger_path(folder: &Path, period: &InvoicePeriod) -> PathBuf {
    folder.join(&period.sessions_year).join(format!(
        "{} {} NIC user charges new template.xlsx",
        period.sessions_month, period.sessions_year
    ))
}

pub(crate) fn write_ledger(rows: &[LedgerRow], path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| AppError::io(dir, e))?;
    }

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(VOUCHER_SHEET)?;

    for (col, header) in (0u16..).zip(VOUCHER_HEADER) {
        worksheet.write_string_with_format(0, col, header, &bold)?;
    }
    for (row, entry) in (1u32..).zip(rows) {
        worksheet.write_string(row, 0, entry.description.as_str())?;
        worksheet.write_number(row, 1, entry.amount)?;
        worksheet.write_number(row, 2, entry.account_code)?;
        worksheet.write_string(row, 3, entry.activity_code.as_str())?;
    }

    workbook.save(path).map_err(|e| match e {
        XlsxError::IoError(source) => AppError::io(path, source),
        other => AppError::Xlsx(other),
    })
}

/// Write the ledger for a whole invoice under `folder`, returning its path
pub(crate) fn export_invoice(invoice: &InvoiceCollection, facility_code: &str, folder: &Path) -> Result<PathBuf> {
    let rows = ledger_rows(invoice, facility_code);
    let path = ledger_path(folder, &invoice.period);
    write_ledger(&rows, &path)?;
    log::info!("wrote {} ledger rows to {}", rows.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::sample_item;

    fn period() -> InvoicePeriod {
        InvoicePeriod::from_reference("PPMS2-NICatKings-20200101").unwrap()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn interleave_pairs_items() {
        assert_eq!(interleave(&[1, 2, 3], &[-1, -2, -3]), vec![1, -1, 2, -2, 3, -3]);
        assert!(interleave::<i32>(&[], &[]).is_empty());
    }

    #[test]
    fn rows_alternate_transaction_and_nic() {
        let rows = ledger_rows_from(
            &strings(&["AC1", "AC2"]),
            &[100.0, 50.0],
            &strings(&["a@example.ac.uk", "b@example.ac.uk"]),
            &period(),
            "NIC1",
        );
        let pairs: Vec<(&str, f64)> = rows
            .iter()
            .map(|r| (r.activity_code.as_str(), r.amount))
            .collect();
        assert_eq!(
            pairs,
            vec![("AC1", 100.0), ("NIC1", -100.0), ("AC2", 50.0), ("NIC1", -50.0)]
        );

        let accounts: Vec<u32> = rows.iter().map(|r| r.account_code).collect();
        assert_eq!(accounts, vec![4213, 4113, 4213, 4113]);
        assert_eq!(rows[0].description, "NIC charges for December 2019 for a@example.ac.uk");
        assert_eq!(rows[1].description, rows[0].description);
        assert_eq!(rows[3].description, "NIC charges for December 2019 for b@example.ac.uk");
    }

    #[test]
    fn zero_charge_gives_positive_zero_credit() {
        let rows = ledger_rows_from(
            &strings(&["AC1"]),
            &[0.0],
            &strings(&["a@example.ac.uk"]),
            &period(),
            "NIC1",
        );
        assert!(rows[1].amount.is_sign_positive());
        assert_eq!(serde_json::to_string(&rows[1].amount).unwrap(), "0.0");
    }

    #[test]
    fn rows_from_collection_use_rounded_amounts() {
        let mut invoice = InvoiceCollection::new("PPMS2-NICatKings-20191101").unwrap();
        invoice.append(sample_item("AC1", &["10", "0.005"]));
        let rows = ledger_rows(&invoice, "NIC1");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].amount, 10.01);
        assert_eq!(rows[1].amount, -10.01);
        assert_eq!(rows[0].description, "NIC charges for October 2019 for ann.smith@example.ac.uk");
    }

    #[test]
    fn path_uses_sessions_period() {
        let path = ledger_path(Path::new("/ledger"), &period());
        assert_eq!(
            path,
            PathBuf::from("/ledger/2019/December 2019 NIC user charges new template.xlsx")
        );
    }

    #[test]
    fn export_writes_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let mut invoice = InvoiceCollection::new("PPMS2-NICatKings-20191101").unwrap();
        invoice.append(sample_item("AC1", &["12.5"]));
        invoice.append(sample_item("AC2", &["7"]));

        let path = export_invoice(&invoice, "NIC1", dir.path()).unwrap();
        assert!(path.starts_with(dir.path().join("2019")));
        assert!(fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn unwritable_destination_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();

        let rows = ledger_rows_from(&strings(&["AC1"]), &[1.0], &strings(&["a@x"]), &period(), "N");
        let err = write_ledger(&rows, &blocker.join("ledger.xlsx")).unwrap_err();
        assert!(matches!(err, AppError::Io { .. }));
    }
}
