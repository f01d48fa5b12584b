use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;

use crate::api::{BillingApi, fetch_invoice, fetch_item};
use crate::cli::{ConfigCommands, Recipients};
use crate::config::Settings;
use crate::core::{InvoiceCollection, InvoiceItem, InvoicePeriod};
use crate::error::{AppError, Result};
use crate::export::{LedgerRow, export_invoice, ledger_path, ledger_rows};
use crate::mail::{Envelope, Mailer, PreparedInvoice, send_batch};
use crate::output::{
    output_invoice_json, output_item_json, output_ledger_json, output_list_json, print_invoice_list,
    print_invoice_tables,
};
use crate::render::{InvoiceRenderer, format_message};
use crate::tasks::{WorkerPool, drain};

pub(crate) struct CommandContext {
    pub(crate) json: bool,
    pub(crate) use_color: bool,
    pub(crate) settings: Arc<Settings>,
    pub(crate) api: Arc<dyn BillingApi>,
    pub(crate) pool: WorkerPool,
}

/// What a `send` run did
#[derive(Debug)]
pub(crate) struct SendReport {
    pub(crate) sent: usize,
    pub(crate) saved: Vec<PathBuf>,
    pub(crate) ledger: Option<(PathBuf, Vec<LedgerRow>)>,
}

pub(crate) struct SendRequest {
    pub(crate) reference: String,
    pub(crate) accounts: Vec<String>,
    pub(crate) all: bool,
    pub(crate) admin_only: bool,
    pub(crate) copy_manager: bool,
    pub(crate) no_export: bool,
    pub(crate) recipients: Recipients,
}

pub(crate) fn handle_list(ctx: &CommandContext) -> Result<()> {
    let api = Arc::clone(&ctx.api);
    let references = drain(ctx.pool.submit(move |_| api.list_invoices()), |_| {})?;

    if ctx.json {
        println!("{}", output_list_json(&references));
    } else if references.is_empty() {
        println!("No invoices found.");
    } else {
        print_invoice_list(&references, ctx.use_color);
    }
    Ok(())
}

pub(crate) fn handle_show(ctx: &CommandContext, reference: &str) -> Result<()> {
    let invoice = fetch_in_background(ctx, reference)?;
    if ctx.json {
        println!("{}", output_invoice_json(&invoice));
    } else if invoice.is_empty() {
        println!("Invoice {} has no sessions.", invoice.reference);
    } else {
        print_invoice_tables(&invoice, ctx.use_color);
    }
    Ok(())
}

fn fetch_in_background(ctx: &CommandContext, reference: &str) -> Result<InvoiceCollection> {
    // reject a malformed reference before touching the network
    InvoicePeriod::from_reference(reference)?;
    let api = Arc::clone(&ctx.api);
    let reference = reference.to_string();
    let rx = ctx.pool.submit(move |_| fetch_invoice(api.as_ref(), &reference));
    let invoice = drain(rx, |_| {})?;
    eprintln!("Fetched {} ({} accounts)", invoice.reference, invoice.len());
    Ok(invoice)
}

pub(crate) fn handle_preview(ctx: &CommandContext, reference: &str, account: &str, save: bool) -> Result<()> {
    InvoicePeriod::from_reference(reference)?;
    let api = Arc::clone(&ctx.api);
    let settings = Arc::clone(&ctx.settings);
    let (reference, account) = (reference.to_string(), account.to_string());

    let rx = ctx.pool.submit(move |_| {
        let mut item = fetch_item(api.as_ref(), &reference, &account)?;
        let renderer = InvoiceRenderer::new(&settings, &reference)?;
        let html = renderer.render(&mut item, save)?;
        Ok((item, html))
    });
    let (item, html) = drain(rx, |_| {})?;

    if ctx.json {
        println!("{}", output_item_json(&item, &html));
    } else {
        println!("{html}");
    }
    if save && let Some(path) = &item.group.invoice_path {
        eprintln!("Saved {path}");
    }
    Ok(())
}

/// Items named by `accounts` in invoice order, or every item when `all`
fn select_items(invoice: &InvoiceCollection, accounts: &[String], all: bool) -> Result<Vec<InvoiceItem>> {
    if all {
        return Ok(invoice.items().to_vec());
    }
    let wanted: BTreeSet<&str> = accounts.iter().map(String::as_str).collect();
    if let Some(missing) = wanted.iter().find(|a| invoice.item_for_account(a).is_none()) {
        return Err(AppError::UnknownAccount((*missing).to_string()));
    }
    Ok(invoice
        .items()
        .iter()
        .filter(|item| wanted.contains(item.account.as_str()))
        .cloned()
        .collect())
}

/// Fetch, render, save and email the selected items, then write the
/// ledger. Runs on a worker; `report` receives the 0-based send counter.
pub(crate) fn run_send(
    api: &dyn BillingApi,
    mailer: &dyn Mailer,
    settings: &Settings,
    request: &SendRequest,
    report: impl FnMut(usize),
) -> Result<SendReport> {
    let invoice = fetch_invoice(api, &request.reference)?;
    let mut items = select_items(&invoice, &request.accounts, request.all)?;

    for item in &mut items {
        if !request.recipients.is_empty() {
            let current = item.addresses();
            let mut edited = (*current).clone();
            if !request.recipients.to.is_empty() {
                edited = edited.with_to(request.recipients.to.clone());
            }
            if !request.recipients.cc.is_empty() {
                edited = edited.with_cc(request.recipients.cc.clone());
            }
            item.set_addresses(edited);
        }
        if request.admin_only {
            item.group.send_only_admin = true;
        }
    }

    let renderer = InvoiceRenderer::new(settings, &request.reference)?;
    let batch: Vec<PreparedInvoice> = items
        .par_iter_mut()
        .map(|item| {
            let html = renderer.render(item, true)?;
            Ok(PreparedInvoice::new(item, html))
        })
        .collect::<Result<_>>()?;
    let saved = items
        .iter()
        .map(|item| renderer.path_for(&item.account))
        .collect();

    let envelope = Envelope::new(settings, &request.reference, request.copy_manager);
    let sent = send_batch(mailer, &envelope, &batch, report)?;
    log::info!("sent {} invoices for {}", sent, request.reference);

    let ledger = if request.no_export {
        None
    } else {
        let folder = Path::new(&settings.general.invoice_folder);
        let path = export_invoice(&invoice, &settings.facility.code, folder)?;
        Some((path, ledger_rows(&invoice, &settings.facility.code)))
    };

    Ok(SendReport { sent, saved, ledger })
}

pub(crate) fn handle_send(ctx: &CommandContext, mailer: Arc<dyn Mailer>, request: SendRequest) -> Result<()> {
    InvoicePeriod::from_reference(&request.reference)?;
    if !request.recipients.is_empty() && request.accounts.len() != 1 {
        return Err(AppError::Config(
            "--to/--cc can only be used with a single --account".to_string(),
        ));
    }

    let api = Arc::clone(&ctx.api);
    let settings = Arc::clone(&ctx.settings);
    if settings.mail.test_mode {
        eprintln!("Test mode: every invoice goes to {}", settings.mail.test_address);
    }

    let rx = ctx.pool.submit(move |progress| {
        run_send(api.as_ref(), mailer.as_ref(), &settings, &request, |i| progress.report(i))
    });
    let report = drain(rx, |i| eprintln!("Sent email {}", i + 1))?;

    if ctx.json {
        let (path, rows) = report
            .ledger
            .as_ref()
            .map(|(p, rows)| (p.display().to_string(), rows.as_slice()))
            .unwrap_or_default();
        println!("{}", output_ledger_json(&path, rows, Some(report.sent)));
    } else {
        println!("Sent {} invoices", report.sent);
        for path in &report.saved {
            println!("  saved {}", path.display());
        }
        if let Some((path, rows)) = &report.ledger {
            println!("Ledger: {} ({} rows)", path.display(), rows.len());
        }
    }
    Ok(())
}

pub(crate) fn handle_export(ctx: &CommandContext, reference: &str) -> Result<()> {
    InvoicePeriod::from_reference(reference)?;
    let api = Arc::clone(&ctx.api);
    let settings = Arc::clone(&ctx.settings);
    let reference = reference.to_string();

    let rx = ctx.pool.submit(move |_| {
        let invoice = fetch_invoice(api.as_ref(), &reference)?;
        let folder = Path::new(&settings.general.invoice_folder);
        let path = export_invoice(&invoice, &settings.facility.code, folder)?;
        Ok((path, ledger_rows(&invoice, &settings.facility.code)))
    });
    let (path, rows) = drain(rx, |_| {})?;

    if ctx.json {
        println!("{}", output_ledger_json(&path.display().to_string(), &rows, None));
    } else {
        println!("Ledger: {} ({} rows)", path.display(), rows.len());
    }
    Ok(())
}

pub(crate) fn handle_message(settings: &Settings, reference: &str, json: bool) -> Result<()> {
    let period = InvoicePeriod::from_reference(reference)?;
    let message = format_message(&settings.general.message_text, &period, &settings.facility)?;
    if json {
        let ledger = ledger_path(Path::new(&settings.general.invoice_folder), &period);
        let value = serde_json::json!({
            "reference": reference,
            "period": period,
            "message": message,
            "ledger_path": ledger.display().to_string(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        println!("{message}");
    }
    Ok(())
}

pub(crate) fn handle_config(command: &ConfigCommands, path: &Path, json: bool) -> Result<()> {
    match command {
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                return Err(AppError::Config(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )));
            }
            Settings::default().save(path)?;
            eprintln!("Wrote default settings to {}", path.display());
        }
        ConfigCommands::Show => {
            let shown = Settings::load(path)?.redacted();
            if json {
                let text = serde_json::to_string_pretty(&shown)
                    .map_err(|e| AppError::Config(e.to_string()))?;
                println!("{text}");
            } else {
                print!("{}", shown.to_toml()?);
            }
        }
        ConfigCommands::Path => println!("{}", path.display()),
        ConfigCommands::Set { key, value } => {
            let mut settings = Settings::load(path)?;
            settings.set(key, value)?;
            settings.save(path)?;
            eprintln!("Set {key} in {}", path.display());
        }
    }
    Ok(())
}
