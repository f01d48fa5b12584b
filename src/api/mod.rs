//! PPMS billing API (PUMAPI) access
//!
//! The `BillingApi` trait is the seam between invoice assembly and the
//! network; `PumapiClient` is the HTTP implementation.

mod client;
mod parser;

use std::collections::BTreeMap;

use crate::core::{Group, InvoiceCollection, InvoiceItem, SessionRow};
use crate::error::{AppError, Result};

pub(crate) use client::PumapiClient;

pub(crate) trait BillingApi: Send + Sync {
    /// Final then draft invoice references, newest first
    fn list_invoices(&self) -> Result<Vec<String>>;

    /// Every detail row of an invoice, optionally limited to one account code
    fn invoice_details(&self, reference: &str, account: Option<&str>) -> Result<Vec<SessionRow>>;

    fn group(&self, group_ref: &str) -> Result<Group>;
}

/// Resolve the group billed under `account` and build its item
fn build_item(api: &dyn BillingApi, account: &str, rows: &[SessionRow]) -> Result<InvoiceItem> {
    let group_ref = rows.first().map(SessionRow::group_ref).unwrap_or_default();
    let mut group = api.group(group_ref)?;
    group.account = account.to_string();
    InvoiceItem::from_rows(account, group, rows)
}

/// Fetch a whole invoice: one item per distinct account code, sorted by code
pub(crate) fn fetch_invoice(api: &dyn BillingApi, reference: &str) -> Result<InvoiceCollection> {
    let mut invoice = InvoiceCollection::new(reference)?;
    let rows = api.invoice_details(reference, None)?;

    let mut by_account: BTreeMap<String, Vec<SessionRow>> = BTreeMap::new();
    for row in rows {
        by_account.entry(row.account().to_string()).or_default().push(row);
    }
    log::info!(
        "invoice {} has {} account codes",
        reference,
        by_account.len()
    );

    for (account, rows) in &by_account {
        invoice.append(build_item(api, account, rows)?);
    }
    Ok(invoice)
}

/// Fetch a single account's item using the account-scoped detail call
pub(crate) fn fetch_item(api: &dyn BillingApi, reference: &str, account: &str) -> Result<InvoiceItem> {
    let rows = api.invoice_details(reference, Some(account))?;
    if rows.is_empty() {
        return Err(AppError::UnknownAccount(account.to_string()));
    }
    build_item(api, account, &rows)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::parser::tests::{FULL_DETAILS, GROUP_JSON};
    use crate::api::parser::{parse_group, parse_invoice_details};
    use std::sync::Mutex;

    /// Serves canned PUMAPI bodies and records which groups were looked up
    #[derive(Default)]
    pub(crate) struct FakeApi {
        pub(crate) lookups: Mutex<Vec<String>>,
    }

    impl BillingApi for FakeApi {
        fn list_invoices(&self) -> Result<Vec<String>> {
            Ok(vec!["PPMS2-NICatKings-20191101".to_string()])
        }

        fn invoice_details(&self, _reference: &str, account: Option<&str>) -> Result<Vec<SessionRow>> {
            let rows = parse_invoice_details(FULL_DETAILS, false)?;
            Ok(match account {
                Some(a) => rows.into_iter().filter(|r| r.account() == a).collect(),
                None => rows,
            })
        }

        fn group(&self, group_ref: &str) -> Result<Group> {
            if let Ok(mut lookups) = self.lookups.lock() {
                lookups.push(group_ref.to_string());
            }
            let mut group = parse_group(GROUP_JSON)?;
            group.login = group_ref.to_string();
            Ok(group)
        }
    }

    #[test]
    fn fetch_invoice_groups_rows_by_sorted_account() {
        let api = FakeApi::default();
        let invoice = fetch_invoice(&api, "PPMS2-NICatKings-20191101").unwrap();

        assert_eq!(invoice.accounts(), vec!["AC1", "AC2"]);
        assert_eq!(invoice.autonomous_items, 2);
        assert_eq!(invoice.assisted_items, 1);
        assert_eq!(invoice.training_items, 1);

        let ac1 = invoice.item_for_account("AC1").unwrap();
        assert_eq!(ac1.num_sessions(), 3);
        assert_eq!(ac1.group.account, "AC1");
        assert_eq!(ac1.group.login, "joneslab");
        assert_eq!(invoice.amounts(), vec![67.75, 40.0]);

        let lookups = api.lookups.lock().unwrap();
        assert_eq!(*lookups, vec!["joneslab", "smithlab"]);
    }

    #[test]
    fn fetch_item_scopes_to_one_account() {
        let api = FakeApi::default();
        let item = fetch_item(&api, "PPMS2-NICatKings-20191101", "AC2").unwrap();
        assert_eq!(item.account, "AC2");
        assert_eq!(item.num_sessions(), 1);
        assert_eq!(item.final_amount(), 40.0);
    }

    #[test]
    fn fetch_item_unknown_account() {
        let api = FakeApi::default();
        let err = fetch_item(&api, "PPMS2-NICatKings-20191101", "AC404").unwrap_err();
        assert!(matches!(err, AppError::UnknownAccount(ref a) if a == "AC404"));
    }

    #[test]
    fn fetch_invoice_rejects_bad_reference_before_network() {
        let api = FakeApi::default();
        assert!(fetch_invoice(&api, "bogus").is_err());
        assert!(api.lookups.lock().unwrap().is_empty());
    }
}
