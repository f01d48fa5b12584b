//! Invoice delivery by email
//!
//! A batch is prepared up front from item snapshots, so address edits made
//! after submission never reach a send already in flight.

mod smtp;

use std::sync::Arc;

use crate::config::Settings;
use crate::core::{Addresses, InvoiceItem};
use crate::error::{AppError, Result};

pub(crate) use smtp::SmtpMailer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OutgoingMessage {
    pub(crate) to: Vec<String>,
    pub(crate) cc: Vec<String>,
    pub(crate) subject: String,
    pub(crate) html: String,
}

pub(crate) trait Mailer: Send + Sync {
    fn send(&self, message: &OutgoingMessage) -> Result<()>;
}

/// One rendered invoice plus the addresses it had when the send was submitted
#[derive(Debug, Clone)]
pub(crate) struct PreparedInvoice {
    pub(crate) account: String,
    pub(crate) addresses: Arc<Addresses>,
    pub(crate) send_only_admin: bool,
    pub(crate) html: String,
}

impl PreparedInvoice {
    pub(crate) fn new(item: &InvoiceItem, html: String) -> Self {
        PreparedInvoice {
            account: item.account.clone(),
            addresses: item.addresses(),
            send_only_admin: item.group.send_only_admin,
            html,
        }
    }
}

/// Batch-wide delivery rules
#[derive(Debug, Clone, Default)]
pub(crate) struct Envelope {
    pub(crate) subject: String,
    /// Redirect everything here when set
    pub(crate) test_address: Option<String>,
    /// Manager cc'd on ordinary sends
    pub(crate) manager_cc: Option<String>,
}

impl Envelope {
    pub(crate) fn new(settings: &Settings, reference: &str, copy_manager: bool) -> Self {
        Envelope {
            subject: format!("{}: Invoice {}", settings.facility.name, reference),
            test_address: settings
                .mail
                .test_mode
                .then(|| settings.mail.test_address.clone()),
            manager_cc: copy_manager.then(|| settings.facility.manager_email.clone()),
        }
    }

    /// `(to, cc)` for one invoice. Test mode wins over everything; an
    /// admin-only invoice goes to the cc list alone.
    pub(crate) fn recipients(&self, invoice: &PreparedInvoice) -> (Vec<String>, Vec<String>) {
        if let Some(test) = &self.test_address {
            return (vec![test.clone()], Vec::new());
        }
        if invoice.send_only_admin {
            return (non_blank(&invoice.addresses.cc), Vec::new());
        }
        let mut cc = non_blank(&invoice.addresses.cc);
        if let Some(manager) = &self.manager_cc {
            cc.extend(non_blank(std::slice::from_ref(manager)));
        }
        (non_blank(&invoice.addresses.to), cc)
    }

    pub(crate) fn message_for(&self, invoice: &PreparedInvoice) -> Result<OutgoingMessage> {
        let (to, cc) = self.recipients(invoice);
        if to.is_empty() {
            return Err(AppError::Send(format!("no recipient for account {}", invoice.account)));
        }
        Ok(OutgoingMessage {
            to,
            cc,
            subject: self.subject.clone(),
            html: invoice.html.clone(),
        })
    }
}

fn non_blank(addresses: &[String]) -> Vec<String> {
    addresses
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

/// Send each invoice in order, calling `progress` with the 0-based index
/// after every successful send. Stops at the first failure.
pub(crate) fn send_batch(
    mailer: &dyn Mailer,
    envelope: &Envelope,
    batch: &[PreparedInvoice],
    mut progress: impl FnMut(usize),
) -> Result<usize> {
    for (index, invoice) in batch.iter().enumerate() {
        let message = envelope.message_for(invoice)?;
        log::debug!(
            "sending {} to {:?} cc {:?}",
            invoice.account,
            message.to,
            message.cc
        );
        mailer.send(&message).map_err(|e| match e {
            AppError::Send(_) => e,
            other => AppError::Send(other.to_string()),
        })?;
        progress(index);
    }
    Ok(batch.len())
}
