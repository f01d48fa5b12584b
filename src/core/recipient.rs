//! Billing groups and the addresses an invoice is delivered to

use serde::Serialize;

/// A PPMS group, resolved from a `getgroup` lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub(crate) struct Group {
    /// Group login used as the reference in detail rows
    pub(crate) login: String,
    pub(crate) name: String,
    pub(crate) head_name: String,
    pub(crate) head_email: String,
    pub(crate) admin_name: String,
    pub(crate) admin_email: String,
    /// Account code the group is being billed under
    pub(crate) account: String,
    /// Deliver to the admin address only
    pub(crate) send_only_admin: bool,
    /// Where the rendered invoice for this group was saved
    pub(crate) invoice_path: Option<String>,
}

/// To/cc lists for one invoice item.
///
/// Values are never edited in place: an edit builds a new `Addresses`
/// that replaces the item's current snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub(crate) struct Addresses {
    pub(crate) to: Vec<String>,
    pub(crate) cc: Vec<String>,
}

impl Addresses {
    /// Head of group in `to`, group admin in `cc`
    pub(crate) fn for_group(group: &Group) -> Self {
        Addresses {
            to: vec![group.head_email.clone()],
            cc: vec![group.admin_email.clone()],
        }
    }

    pub(crate) fn with_to(&self, to: Vec<String>) -> Self {
        Addresses {
            to,
            cc: self.cc.clone(),
        }
    }

    pub(crate) fn with_cc(&self, cc: Vec<String>) -> Self {
        Addresses {
            to: self.to.clone(),
            cc,
        }
    }
}
