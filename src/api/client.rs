use crate::api::BillingApi;
use crate::api::parser::{parse_group, parse_invoice_details, parse_invoice_list};
use crate::config::ApiSettings;
use crate::core::{Group, SessionRow};
use crate::error::{AppError, Result};

/// PUMAPI client. Every action is a form POST to the facility's API URL.
pub(crate) struct PumapiClient {
    url: String,
    key: String,
    agent: ureq::Agent,
}

impl PumapiClient {
    pub(crate) fn new(settings: &ApiSettings) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder().build().into();
        PumapiClient {
            url: settings.url.clone(),
            key: settings.key.clone(),
            agent,
        }
    }

    fn post(&self, action: &'static str, params: &[(&str, &str)]) -> Result<String> {
        let mut form: Vec<(&str, &str)> = vec![("action", action), ("apikey", self.key.as_str())];
        form.extend_from_slice(params);

        log::debug!("POST {} action={}", self.url, action);
        let connectivity = |reason: String| AppError::Connectivity { action, reason };

        let mut response = self
            .agent
            .post(self.url.as_str())
            .send_form(form)
            .map_err(|e| connectivity(e.to_string()))?;
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| connectivity(e.to_string()))?;

        if text.is_empty() {
            return Err(connectivity("empty body".to_string()));
        }
        Ok(text)
    }
}

impl BillingApi for PumapiClient {
    fn list_invoices(&self) -> Result<Vec<String>> {
        let mut invoices = Vec::new();
        for draft in ["false", "true"] {
            let text = self.post("getinvoicelist", &[("draft", draft)])?;
            invoices.extend(parse_invoice_list(&text));
        }
        invoices.reverse();
        Ok(invoices)
    }

    fn invoice_details(&self, reference: &str, account: Option<&str>) -> Result<Vec<SessionRow>> {
        let mut params = vec![("invoiceid", reference)];
        if let Some(account) = account {
            params.push(("bcode", account));
        }
        let text = self.post("getinvoicedetails", &params)?;
        parse_invoice_details(&text, account.is_some())
    }

    fn group(&self, group_ref: &str) -> Result<Group> {
        let escaped = group_ref.replace('\'', "&#39;");
        let text = self.post(
            "getgroup",
            &[("unitlogin", escaped.as_str()), ("format", "json")],
        )?;
        parse_group(&text)
    }
}
