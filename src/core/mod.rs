//! Core module - invoice domain types and billing arithmetic

mod invoice;
mod item;
mod money;
mod recipient;
mod session;
mod summary;

pub(crate) use invoice::{InvoiceCollection, InvoicePeriod};
pub(crate) use item::InvoiceItem;
pub(crate) use money::{format_cents, round_to_cents};
pub(crate) use recipient::{Addresses, Group};
pub(crate) use session::{Session, SessionFamily, SessionRow};
pub(crate) use summary::SessionSummary;
