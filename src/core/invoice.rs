//! A whole PPMS invoice: its billing period and the per-account items

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::consts::{DRAFT_SUFFIX, REF_DATE_OFFSET};
use crate::core::item::InvoiceItem;
use crate::core::money::round_to_cents;
use crate::error::{AppError, Result};

/// Dates derived from an invoice reference.
///
/// Sessions are billed the month after they happen, so the sessions month
/// is the calendar month before the invoice date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct InvoicePeriod {
    #[serde(skip)]
    pub(crate) date: NaiveDate,
    pub(crate) invoice_year: String,
    pub(crate) invoice_month: String,
    pub(crate) sessions_month: String,
    pub(crate) sessions_year: String,
    /// Invoice date as DD/MM/YYYY
    pub(crate) invoice_date: String,
    pub(crate) draft: bool,
}

impl InvoicePeriod {
    pub(crate) fn from_reference(reference: &str) -> Result<Self> {
        let invalid = || AppError::InvalidReference {
            input: reference.to_string(),
            offset: REF_DATE_OFFSET,
        };

        let digits = reference
            .get(REF_DATE_OFFSET..REF_DATE_OFFSET + 8)
            .filter(|s| s.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(invalid)?;
        let date = NaiveDate::parse_from_str(digits, "%Y%m%d").map_err(|_| invalid())?;
        let draft = reference[REF_DATE_OFFSET + 8..].contains(DRAFT_SUFFIX);

        Ok(Self::from_date(date, draft))
    }

    pub(crate) fn from_date(date: NaiveDate, draft: bool) -> Self {
        let sessions = previous_month(date);
        InvoicePeriod {
            date,
            invoice_year: date.format("%Y").to_string(),
            invoice_month: date.format("%B").to_string(),
            sessions_month: sessions.format("%B").to_string(),
            sessions_year: sessions.format("%Y").to_string(),
            invoice_date: date.format("%d/%m/%Y").to_string(),
            draft,
        }
    }
}

/// First day of the month before `date`; January rolls back to December
fn previous_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 1 {
        (date.year() - 1, 12)
    } else {
        (date.year(), date.month() - 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
}

/// Ordered invoice items for one billing reference
#[derive(Debug, Clone)]
pub(crate) struct InvoiceCollection {
    pub(crate) reference: String,
    pub(crate) period: InvoicePeriod,
    items: Vec<InvoiceItem>,
    /// Items holding at least one autonomous session
    pub(crate) autonomous_items: usize,
    pub(crate) assisted_items: usize,
    pub(crate) training_items: usize,
}

impl InvoiceCollection {
    pub(crate) fn new(reference: impl Into<String>) -> Result<Self> {
        let reference = reference.into();
        let period = InvoicePeriod::from_reference(&reference)?;
        Ok(InvoiceCollection {
            reference,
            period,
            items: Vec::new(),
            autonomous_items: 0,
            assisted_items: 0,
            training_items: 0,
        })
    }

    pub(crate) fn append(&mut self, item: InvoiceItem) {
        if self.item_for_account(&item.account).is_some() {
            log::warn!(
                "account {} appears twice in invoice {}",
                item.account,
                self.reference
            );
        }
        if item.counts.autonomous > 0 {
            self.autonomous_items += 1;
        }
        if item.counts.assisted > 0 {
            self.assisted_items += 1;
        }
        if item.counts.training > 0 {
            self.training_items += 1;
        }
        self.items.push(item);
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn items(&self) -> &[InvoiceItem] {
        &self.items
    }

    pub(crate) fn item_for_account(&self, account: &str) -> Option<&InvoiceItem> {
        self.items.iter().find(|i| i.account == account)
    }

    /// Account codes in item order
    pub(crate) fn accounts(&self) -> Vec<String> {
        self.items.iter().map(|i| i.account.clone()).collect()
    }

    /// Per-item final amount rounded to cents, in item order
    pub(crate) fn amounts(&self) -> Vec<f64> {
        self.items
            .iter()
            .map(|i| round_to_cents(i.final_amount()))
            .collect()
    }

    pub(crate) fn group_heads(&self) -> Vec<String> {
        self.items.iter().map(|i| i.group.head_email.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::item::tests::sample_item;
    use crate::core::recipient::tests::sample_group;
    use crate::core::session::tests::training_row;

    const REF: &str = "PPMS2-NICatKings-20191101";

    #[test]
    fn period_from_november_reference() {
        let p = InvoicePeriod::from_reference(REF).unwrap();
        assert_eq!(p.invoice_month, "November");
        assert_eq!(p.invoice_year, "2019");
        assert_eq!(p.sessions_month, "October");
        assert_eq!(p.sessions_year, "2019");
        assert_eq!(p.invoice_date, "01/11/2019");
        assert!(!p.draft);
    }

    #[test]
    fn january_rolls_back_to_december() {
        let p = InvoicePeriod::from_reference("PPMS2-NICatKings-20200101").unwrap();
        assert_eq!(p.invoice_month, "January");
        assert_eq!(p.invoice_year, "2020");
        assert_eq!(p.sessions_month, "December");
        assert_eq!(p.sessions_year, "2019");
    }

    #[test]
    fn draft_suffix_detected() {
        let p = InvoicePeriod::from_reference("PPMS2-NICatKings-20191101-DRAFT").unwrap();
        assert!(p.draft);
        assert_eq!(p.sessions_month, "October");
    }

    #[test]
    fn short_or_garbled_reference_rejected() {
        assert!(InvoicePeriod::from_reference("PPMS2-short").is_err());
        assert!(InvoicePeriod::from_reference("PPMS2-NICatKings-2019AB01").is_err());
        assert!(InvoicePeriod::from_reference("PPMS2-NICatKings-20191341").is_err());
    }

    #[test]
    fn append_tracks_family_buckets() {
        let mut invoice = InvoiceCollection::new(REF).unwrap();
        invoice.append(sample_item("AC1", &["10"]));
        let training =
            InvoiceItem::from_rows("AC2", sample_group("AC2"), &[training_row("5", "60")]).unwrap();
        invoice.append(training);

        assert_eq!(invoice.len(), 2);
        assert_eq!(invoice.autonomous_items, 1);
        assert_eq!(invoice.assisted_items, 0);
        assert_eq!(invoice.training_items, 1);
        assert_eq!(invoice.accounts(), vec!["AC1", "AC2"]);
        assert!(invoice.item_for_account("AC2").is_some());
        assert!(invoice.item_for_account("AC3").is_none());
    }

    #[test]
    fn amounts_are_rounded_in_item_order() {
        let mut invoice = InvoiceCollection::new(REF).unwrap();
        invoice.append(sample_item("AC1", &["10", "0.005"]));
        invoice.append(sample_item("AC2", &["3.333"]));
        assert_eq!(invoice.amounts(), vec![10.01, 3.33]);
        assert_eq!(
            invoice.group_heads(),
            vec!["ann.smith@example.ac.uk", "ann.smith@example.ac.uk"]
        );
    }
}
