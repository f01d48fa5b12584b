//! Invoice presentation: the operator message and the HTML document

mod html;
mod message;

pub(crate) use html::InvoiceRenderer;
pub(crate) use message::format_message;
