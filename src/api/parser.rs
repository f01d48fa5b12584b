//! Parsers for PUMAPI response bodies

use csv::{ReaderBuilder, Trim};
use serde::Deserialize;

use crate::core::{Group, SessionRow};
use crate::error::{AppError, Result};

/// `getinvoicelist` returns one reference per `\r\n`-terminated line
pub(crate) fn parse_invoice_list(text: &str) -> Vec<String> {
    let mut refs: Vec<String> = text.split('\r').map(|r| r.trim_matches('\n').to_string()).collect();
    // the final terminator leaves an empty fragment behind
    refs.pop();
    refs
}

/// Drop the first `n` lines of `text`
fn skip_lines(text: &str, n: usize) -> &str {
    let mut rest = text;
    for _ in 0..n {
        match rest.find('\n') {
            Some(pos) => rest = &rest[pos + 1..],
            None => return "",
        }
    }
    rest
}

/// Read a CSV section whose header row sits on line `header_line`.
/// A row with more or fewer cells than the header is an error.
fn read_section(section: &str, header_line: usize) -> Result<Vec<SessionRow>> {
    let body = skip_lines(section, header_line);
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_reader(body.as_bytes());

    reader
        .deserialize::<SessionRow>()
        .map(|row| row.map_err(|e| AppError::Response(format!("invoice details: {e}"))))
        .collect()
}

/// Parse a `getinvoicedetails` body into rows.
///
/// The first two lines are a preamble. A full invoice may hold an
/// autonomous/assisted section followed by a training section, each with
/// its own header row; `scoped` is set when the request named a single
/// account code, which shifts the first section's header down one line.
pub(crate) fn parse_invoice_details(text: &str, scoped: bool) -> Result<Vec<SessionRow>> {
    let mut parts = text.splitn(3, "\r\n");
    let body = parts
        .nth(2)
        .ok_or_else(|| AppError::Response("invoice details: missing preamble".to_string()))?;

    if text.contains("Autonomous") && text.contains("Training") {
        let split = body.find("Training").unwrap_or(body.len());
        let (usage, training) = body.split_at(split);
        let mut rows = read_section(usage, usize::from(scoped))?;
        rows.extend(read_section(training, 1)?);
        Ok(rows)
    } else {
        read_section(body, 1)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GroupRecord {
    unitlogin: String,
    unitname: String,
    headname: String,
    heademail: String,
    admname: String,
    admemail: String,
}

impl From<GroupRecord> for Group {
    fn from(record: GroupRecord) -> Self {
        Group {
            login: record.unitlogin,
            name: record.unitname,
            head_name: record.headname,
            head_email: record.heademail,
            admin_name: record.admname,
            admin_email: record.admemail,
            ..Group::default()
        }
    }
}

/// Parse a `getgroup` JSON body. PPMS returns either a bare object or a
/// one-element array.
pub(crate) fn parse_group(text: &str) -> Result<Group> {
    let value: serde_json::Value = serde_json::from_str(text.trim())
        .map_err(|e| AppError::Response(format!("group: {e}")))?;
    let object = match value {
        serde_json::Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        other => other,
    };
    let record: GroupRecord =
        serde_json::from_value(object).map_err(|e| AppError::Response(format!("group: {e}")))?;
    Ok(record.into())
}
