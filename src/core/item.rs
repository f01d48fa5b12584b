//! One account code's share of an invoice

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::money::format_cents;
use crate::core::recipient::{Addresses, Group};
use crate::core::session::{FamilyCounts, Session, SessionFamily, SessionRow, parse_session};
use crate::core::summary::{SessionSummary, summarize_by_type};
use crate::error::Result;

#[derive(Debug, Clone)]
pub(crate) struct InvoiceItem {
    pub(crate) account: String,
    pub(crate) group: Group,
    addresses: Arc<Addresses>,
    pub(crate) sessions: Vec<Session>,
    /// Summary per literal session type
    pub(crate) summaries: BTreeMap<String, SessionSummary>,
    pub(crate) counts: FamilyCounts,
}

impl InvoiceItem {
    pub(crate) fn new(account: impl Into<String>, group: Group) -> Self {
        let addresses = Arc::new(Addresses::for_group(&group));
        InvoiceItem {
            account: account.into(),
            group,
            addresses,
            sessions: Vec::new(),
            summaries: BTreeMap::new(),
            counts: FamilyCounts::default(),
        }
    }

    /// Build an item from every detail row billed to `account`
    pub(crate) fn from_rows(account: impl Into<String>, group: Group, rows: &[SessionRow]) -> Result<Self> {
        let mut item = InvoiceItem::new(account, group);
        item.load_rows(rows)?;
        Ok(item)
    }

    fn load_rows(&mut self, rows: &[SessionRow]) -> Result<()> {
        self.summaries = summarize_by_type(rows)?;
        for row in rows {
            if let Some(session) = parse_session(row, &mut self.counts)? {
                self.sessions.push(session);
            }
        }
        Ok(())
    }

    /// Current address snapshot. Callers holding it keep seeing the same
    /// lists even if the item's addresses are replaced afterwards.
    pub(crate) fn addresses(&self) -> Arc<Addresses> {
        Arc::clone(&self.addresses)
    }

    pub(crate) fn set_addresses(&mut self, addresses: Addresses) {
        self.addresses = Arc::new(addresses);
    }

    pub(crate) fn num_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Sessions whose type label contains the family's substring
    pub(crate) fn filter_by_session_type(&self, family: SessionFamily) -> Vec<&Session> {
        self.sessions
            .iter()
            .filter(|s| family.matches(s.session_type()))
            .collect()
    }

    /// Unrounded sum over every session
    pub(crate) fn final_amount(&self) -> f64 {
        self.sessions.iter().map(Session::final_amount).sum()
    }

    pub(crate) fn total_charge(sessions: &[&Session]) -> String {
        let total: f64 = sessions.iter().map(|s| s.final_amount()).sum();
        format_cents(total)
    }

    /// Grand total across the three family lists, rounded once at the end
    pub(crate) fn final_total(autonomous: &[&Session], assisted: &[&Session], training: &[&Session]) -> String {
        let total: f64 = autonomous
            .iter()
            .chain(assisted)
            .chain(training)
            .map(|s| s.final_amount())
            .sum();
        format_cents(total)
    }

    /// `(any fee > 0, any subsidy > 0)`
    pub(crate) fn check_for_adjustments(sessions: &[&Session]) -> (bool, bool) {
        let fee_flag = sessions.iter().any(|s| s.fee() > 0.0);
        let subsidy_flag = sessions.iter().any(|s| s.subsidy() > 0.0);
        (fee_flag, subsidy_flag)
    }
}

impl std::fmt::Display for InvoiceItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invoice for {} with {} sessions", self.account, self.num_sessions())
    }
}
