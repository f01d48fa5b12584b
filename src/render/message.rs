//! Operator message text with named placeholders
//!
//! Placeholders are written `{NAME}`; `{{` and `}}` produce literal braces.

use crate::config::FacilitySettings;
use crate::core::InvoicePeriod;
use crate::error::{AppError, Result};

fn mailto(email: &str) -> String {
    format!("<a href='mailto:{email}'>{email}</a>")
}

/// Substitute placeholders in `template` and turn newlines into `<br/>`.
///
/// `YEAR` is the invoice year and `MONTH` the sessions month, so a
/// January invoice reads "December 2020" for December 2019 sessions.
pub(crate) fn format_message(
    template: &str,
    period: &InvoicePeriod,
    facility: &FacilitySettings,
) -> Result<String> {
    let f_email = mailto(&facility.email);
    let m_email = mailto(&facility.manager_email);
    let values: [(&str, &str); 6] = [
        ("MONTH", period.sessions_month.as_str()),
        ("YEAR", period.invoice_year.as_str()),
        ("F_NAME", facility.name.as_str()),
        ("F_EMAIL", f_email.as_str()),
        ("M_NAME", facility.manager_name.as_str()),
        ("M_EMAIL", m_email.as_str()),
    ];

    let substituted = substitute(template, &values)?;
    Ok(substituted.replace('\n', "<br/>"))
}

fn substitute(template: &str, values: &[(&str, &str)]) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' if chars.peek().is_some_and(|&(_, n)| n == '{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for (_, n) in chars.by_ref() {
                    if n == '}' {
                        closed = true;
                        break;
                    }
                    if n == '{' {
                        return Err(AppError::Brace { position: pos });
                    }
                    name.push(n);
                }
                if !closed {
                    return Err(AppError::Brace { position: pos });
                }
                let (_, value) = values
                    .iter()
                    .find(|(key, _)| *key == name)
                    .ok_or(AppError::Format { name })?;
                out.push_str(value);
            }
            '}' if chars.peek().is_some_and(|&(_, n)| n == '}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(AppError::Brace { position: pos }),
            other => out.push(other),
        }
    }
    Ok(out)
}
