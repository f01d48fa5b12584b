//! HTML invoice rendering through tera

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tera::{Context, Tera, Value};

use crate::config::{InvoiceColumns, Settings};
use crate::core::{Group, InvoiceItem, InvoicePeriod, Session, SessionFamily, format_cents};
use crate::error::{AppError, Result};
use crate::render::message::format_message;

const TEMPLATE_NAME: &str = "invoice.html";
const DEFAULT_TEMPLATE: &str = include_str!("../../templates/invoice.html");

/// `{{ value | money }}` renders a number with two decimals, rounded half-up
fn money(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let amount = value
        .as_f64()
        .ok_or_else(|| tera::Error::msg(format!("money filter expects a number, got {value}")))?;
    Ok(Value::String(format_cents(amount)))
}

/// Where an item's invoice is saved:
/// `{folder}/{invoice_year}/{sessions_month}/invoice_{reference}-{account}.html`
pub(crate) fn invoice_path(folder: &Path, period: &InvoicePeriod, reference: &str, account: &str) -> PathBuf {
    let file_name = format!("invoice_{reference}-{account}.html").replace('|', "-");
    folder
        .join(&period.invoice_year)
        .join(&period.sessions_month)
        .join(file_name)
}

#[derive(Serialize)]
struct InvoiceContext<'a> {
    invoice_ref: &'a str,
    invoice_date: &'a InvoicePeriod,
    invoice_path: String,
    group: &'a Group,
    autonomous_sessions: Vec<&'a Session>,
    assisted_sessions: Vec<&'a Session>,
    training_sessions: Vec<&'a Session>,
    autonomous_charge: String,
    assisted_charge: String,
    training_charge: String,
    total: String,
    fee_flag: bool,
    subsidy_flag: bool,
    message: &'a str,
    columns: &'a InvoiceColumns,
}

/// Renders every item of one invoice with the same message and columns
pub(crate) struct InvoiceRenderer {
    engine: Tera,
    reference: String,
    period: InvoicePeriod,
    folder: PathBuf,
    message: String,
    columns: InvoiceColumns,
}

impl InvoiceRenderer {
    pub(crate) fn new(settings: &Settings, reference: &str) -> Result<Self> {
        let period = InvoicePeriod::from_reference(reference)?;
        let message = format_message(&settings.general.message_text, &period, &settings.facility)?;

        let source = if settings.general.template.is_empty() {
            DEFAULT_TEMPLATE.to_string()
        } else {
            let path = Path::new(&settings.general.template);
            fs::read_to_string(path).map_err(|e| AppError::io(path, e))?
        };

        let mut engine = Tera::default();
        engine.autoescape_on(vec![]);
        engine.register_filter("money", money);
        engine.add_raw_template(TEMPLATE_NAME, &source)?;

        Ok(InvoiceRenderer {
            engine,
            reference: reference.to_string(),
            period,
            folder: PathBuf::from(&settings.general.invoice_folder),
            message,
            columns: settings.columns.clone(),
        })
    }

    pub(crate) fn path_for(&self, account: &str) -> PathBuf {
        invoice_path(&self.folder, &self.period, &self.reference, account)
    }

    /// Render one item. Records the invoice path on the item's group and,
    /// when `save` is set, writes the HTML there.
    pub(crate) fn render(&self, item: &mut InvoiceItem, save: bool) -> Result<String> {
        let path = self.path_for(&item.account);
        item.group.invoice_path = Some(path.display().to_string());

        let autonomous = item.filter_by_session_type(SessionFamily::Autonomous);
        let assisted = item.filter_by_session_type(SessionFamily::Assisted);
        let training = item.filter_by_session_type(SessionFamily::Training);
        let (fee_flag, subsidy_flag) = InvoiceItem::check_for_adjustments(&autonomous);

        let context = InvoiceContext {
            invoice_ref: &self.reference,
            invoice_date: &self.period,
            invoice_path: path.display().to_string(),
            group: &item.group,
            autonomous_charge: InvoiceItem::total_charge(&autonomous),
            assisted_charge: InvoiceItem::total_charge(&assisted),
            training_charge: InvoiceItem::total_charge(&training),
            total: InvoiceItem::final_total(&autonomous, &assisted, &training),
            autonomous_sessions: autonomous,
            assisted_sessions: assisted,
            training_sessions: training,
            fee_flag,
            subsidy_flag,
            message: &self.message,
            columns: &self.columns,
        };

        let html = self
            .engine
            .render(TEMPLATE_NAME, &Context::from_serialize(&context)?)?;

        if save {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir).map_err(|e| AppError::io(dir, e))?;
            }
            fs::write(&path, &html).map_err(|e| AppError::io(&path, e))?;
            log::debug!("saved {}", path.display());
        }
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::{sample_group, sample_item, training_row, usage_row};

    const REF: &str = "PPMS2-NICatKings-20191101";

    fn settings(folder: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.general.invoice_folder = folder.display().to_string();
        settings.general.message_text = "Charges for {MONTH}\nfrom {F_NAME}".to_string();
        settings.facility.name = "NIC".to_string();
        settings
    }

    fn mixed_item() -> InvoiceItem {
        let rows = vec![
            usage_row("autonomous", "10.004", "2", "0"),
            usage_row("assisted", "20", "0", "5"),
            training_row("7.5", "45"),
        ];
        InvoiceItem::from_rows("AC1", sample_group("AC1"), &rows).unwrap()
    }

    #[test]
    fn path_layout_and_pipe_replacement() {
        let period = InvoicePeriod::from_reference(REF).unwrap();
        let path = invoice_path(Path::new("/inv"), &period, "PPMS2|X", "AC|1");
        assert_eq!(
            path,
            PathBuf::from("/inv/2019/October/invoice_PPMS2-X-AC-1.html")
        );
    }

    #[test]
    fn render_fills_totals_and_message() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = InvoiceRenderer::new(&settings(dir.path()), REF).unwrap();
        let mut item = mixed_item();
        let html = renderer.render(&mut item, false).unwrap();

        assert!(html.contains("Charges for October<br/>from NIC"));
        assert!(html.contains("Autonomous total: 10.00"));
        assert!(html.contains("Assisted total: 20.00"));
        assert!(html.contains("Training total: 7.50"));
        assert!(html.contains("Total due: 37.50"));
        assert!(html.contains("Smith Lab"));
        // fee column appears because an autonomous session carries a fee
        assert!(html.contains("<th>Fee</th>"));
        assert!(!html.contains("<th>Subsidy</th>"));

        let expected = renderer.path_for("AC1").display().to_string();
        assert_eq!(item.group.invoice_path.as_deref(), Some(expected.as_str()));
        assert!(!renderer.path_for("AC1").exists());
    }

    #[test]
    fn hidden_columns_are_left_out() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(dir.path());
        settings.columns.notes = false;
        settings.columns.user = false;
        let renderer = InvoiceRenderer::new(&settings, REF).unwrap();
        let html = renderer.render(&mut sample_item("AC1", &["5"]), false).unwrap();
        assert!(!html.contains("<th>Notes</th>"));
        assert!(!html.contains("<th>User</th>"));
        assert!(html.contains("<th>Final amount</th>"));
    }

    #[test]
    fn save_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = InvoiceRenderer::new(&settings(dir.path()), REF).unwrap();
        let html = renderer.render(&mut sample_item("AC7", &["5"]), true).unwrap();

        let path = dir
            .path()
            .join("2019")
            .join("October")
            .join(format!("invoice_{REF}-AC7.html"));
        assert_eq!(fs::read_to_string(path).unwrap(), html);
    }

    #[test]
    fn external_template_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("custom.html");
        fs::write(&template, "{{ group.account }}={{ total }} {{ 2.5 | money }}").unwrap();

        let mut settings = settings(dir.path());
        settings.general.template = template.display().to_string();
        let renderer = InvoiceRenderer::new(&settings, REF).unwrap();
        let html = renderer.render(&mut sample_item("AC3", &["1.5", "2"]), false).unwrap();
        assert_eq!(html, "AC3=3.50 2.50");
    }

    #[test]
    fn message_is_not_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(dir.path());
        settings.general.message_text = "Mail {F_EMAIL}".to_string();
        settings.facility.email = "nic@example.ac.uk".to_string();
        let renderer = InvoiceRenderer::new(&settings, REF).unwrap();
        let html = renderer.render(&mut sample_item("AC1", &["1"]), false).unwrap();
        assert!(html.contains("<a href='mailto:nic@example.ac.uk'>"));
    }

    #[test]
    fn broken_template_or_message_fails_early() {
        let dir = tempfile::tempdir().unwrap();
        let mut bad_message = settings(dir.path());
        bad_message.general.message_text = "{NOPE}".to_string();
        assert!(matches!(
            InvoiceRenderer::new(&bad_message, REF),
            Err(AppError::Format { .. })
        ));

        let template = dir.path().join("bad.html");
        fs::write(&template, "{% if %}").unwrap();
        let mut bad_template = settings(dir.path());
        bad_template.general.template = template.display().to_string();
        assert!(matches!(
            InvoiceRenderer::new(&bad_template, REF),
            Err(AppError::Template(_))
        ));

        let mut missing = settings(dir.path());
        missing.general.template = dir.path().join("absent.html").display().to_string();
        assert!(matches!(InvoiceRenderer::new(&missing, REF), Err(AppError::Io { .. })));
    }
}
