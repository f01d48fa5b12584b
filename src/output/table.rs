use comfy_table::{Cell, Color, Table};

use crate::consts::DRAFT_SUFFIX;
use crate::core::{InvoiceCollection, InvoiceItem, InvoicePeriod, SessionFamily, SessionSummary};
use crate::output::format::{
    create_styled_table, format_amount, format_hours, header_cell, right_cell, styled_cell,
};

fn family_header(family: SessionFamily, use_color: bool) -> Vec<Cell> {
    let c = use_color;
    let mut h = vec![
        header_cell("Account", c),
        header_cell("Group", c),
        header_cell("Type", c),
        header_cell("Sessions", c),
        header_cell("Hours booked", c),
    ];
    if family != SessionFamily::Training {
        h.extend([
            header_cell("Hours used", c),
            header_cell("Rebate", c),
            header_cell("Fees", c),
            header_cell("Initial", c),
        ]);
    }
    h.push(header_cell("Final", c));
    h
}

fn summary_row(family: SessionFamily, session_type: &str, summary: &SessionSummary) -> Vec<Cell> {
    let (account, group, hours_booked) = match summary {
        SessionSummary::Usage(s) => (&s.account_number, &s.group, s.hours_booked),
        SessionSummary::Training(s) => (&s.account_number, &s.group, s.hours_booked),
    };
    let mut row = vec![
        Cell::new(account),
        Cell::new(group),
        Cell::new(session_type),
        right_cell(&summary.sessions().to_string(), None, false),
        right_cell(&format_hours(hours_booked), None, false),
    ];
    if family != SessionFamily::Training {
        let (used, rebate, fees, initial) = match summary {
            SessionSummary::Usage(s) => (s.hours_used, s.rebate, s.fees, s.initial_amount),
            SessionSummary::Training(s) => (0.0, 0.0, 0.0, s.final_amount),
        };
        row.extend([
            right_cell(&format_hours(used), None, false),
            right_cell(&format_amount(rebate), None, false),
            right_cell(&format_amount(fees), None, false),
            right_cell(&format_amount(initial), None, false),
        ]);
    }
    row.push(right_cell(&format_amount(summary.final_amount()), None, false));
    row
}

/// Summaries of `item` whose session type belongs to `family`
fn family_summaries(
    item: &InvoiceItem,
    family: SessionFamily,
) -> impl Iterator<Item = (&String, &SessionSummary)> {
    item.summaries
        .iter()
        .filter(move |(session_type, _)| family.matches(session_type))
}

/// One row per account and session type in `family`, plus a total row.
/// `None` when no item has sessions of that family.
pub(crate) fn family_table(invoice: &InvoiceCollection, family: SessionFamily, use_color: bool) -> Option<Table> {
    let mut table = create_styled_table();
    table.set_header(family_header(family, use_color));

    let mut sessions = 0;
    let mut total = 0.0;
    for item in invoice.items() {
        for (session_type, summary) in family_summaries(item, family) {
            sessions += summary.sessions();
            total += summary.final_amount();
            table.add_row(summary_row(family, session_type, summary));
        }
    }
    if sessions == 0 {
        return None;
    }

    let total_color = use_color.then_some(Color::Green);
    let filler = if family == SessionFamily::Training { 1 } else { 5 };
    let mut row = vec![
        styled_cell("TOTAL", None, true),
        Cell::new(""),
        Cell::new(""),
        right_cell(&sessions.to_string(), None, true),
    ];
    row.extend((0..filler).map(|_| Cell::new("")));
    row.push(right_cell(&format_amount(total), total_color, true));
    table.add_row(row);
    Some(table)
}

fn period_label(period: &InvoicePeriod) -> String {
    let status = if period.draft { "draft" } else { "final" };
    format!(
        "{} {} sessions, invoiced {} ({status})",
        period.sessions_month, period.sessions_year, period.invoice_date
    )
}

pub(crate) fn print_invoice_tables(invoice: &InvoiceCollection, use_color: bool) {
    println!("\n  Invoice {}", invoice.reference);
    println!("  {}\n", period_label(&invoice.period));

    for family in SessionFamily::ALL {
        let Some(table) = family_table(invoice, family, use_color) else {
            continue;
        };
        println!("  {} sessions\n", family.display_name());
        println!("{table}\n");
    }

    let total: f64 = invoice.amounts().iter().sum();
    println!(
        "  {} accounts ({} autonomous, {} assisted, {} training), total {}\n",
        invoice.len(),
        invoice.autonomous_items,
        invoice.assisted_items,
        invoice.training_items,
        format_amount(total)
    );
}

pub(crate) fn invoice_list_table(references: &[String], use_color: bool) -> Table {
    let mut table = create_styled_table();
    table.set_header(vec![
        header_cell("#", use_color),
        header_cell("Reference", use_color),
        header_cell("Status", use_color),
        header_cell("Sessions", use_color),
    ]);

    for (i, reference) in references.iter().enumerate() {
        let (status, sessions) = match InvoicePeriod::from_reference(reference) {
            Ok(p) => (
                if p.draft { "draft" } else { "final" },
                format!("{} {}", p.sessions_month, p.sessions_year),
            ),
            Err(_) => ("?", String::new()),
        };
        let status_color = (use_color && reference.contains(DRAFT_SUFFIX)).then_some(Color::Yellow);
        table.add_row(vec![
            right_cell(&(i + 1).to_string(), None, false),
            Cell::new(reference),
            styled_cell(status, status_color, false),
            Cell::new(sessions),
        ]);
    }
    table
}

pub(crate) fn print_invoice_list(references: &[String], use_color: bool) {
    println!("\n  PPMS Invoices\n");
    println!("{}", invoice_list_table(references, use_color));
    println!("\n  {} invoices\n", references.len());
}
