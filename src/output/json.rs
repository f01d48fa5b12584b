use serde_json::{Value, json};

use crate::core::{InvoiceCollection, InvoiceItem, InvoicePeriod, round_to_cents};
use crate::export::LedgerRow;

fn to_pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("Failed to serialize JSON output: {}", e);
        "{}".to_string()
    })
}

fn item_json(item: &InvoiceItem) -> Value {
    json!({
        "account": item.account,
        "group": item.group,
        "addresses": item.addresses().as_ref(),
        "final_amount": round_to_cents(item.final_amount()),
        "counts": item.counts,
        "summaries": item.summaries,
        "sessions": item.sessions,
    })
}

pub(crate) fn output_invoice_json(invoice: &InvoiceCollection) -> String {
    let items: Vec<Value> = invoice.items().iter().map(item_json).collect();
    to_pretty(&json!({
        "reference": invoice.reference,
        "period": invoice.period,
        "autonomous_items": invoice.autonomous_items,
        "assisted_items": invoice.assisted_items,
        "training_items": invoice.training_items,
        "items": items,
    }))
}

pub(crate) fn output_item_json(item: &InvoiceItem, html: &str) -> String {
    let mut value = item_json(item);
    value["html"] = json!(html);
    to_pretty(&value)
}

pub(crate) fn output_list_json(references: &[String]) -> String {
    let output: Vec<Value> = references
        .iter()
        .map(|reference| {
            let period = InvoicePeriod::from_reference(reference).ok();
            json!({
                "reference": reference,
                "draft": period.as_ref().map(|p| p.draft),
                "sessions_month": period.as_ref().map(|p| p.sessions_month.clone()),
                "sessions_year": period.as_ref().map(|p| p.sessions_year.clone()),
            })
        })
        .collect();
    to_pretty(&json!(output))
}

pub(crate) fn output_ledger_json(path: &str, rows: &[LedgerRow], sent: Option<usize>) -> String {
    to_pretty(&json!({
        "path": path,
        "sent": sent,
        "rows": rows,
    }))
}
