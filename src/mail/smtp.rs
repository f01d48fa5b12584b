use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};

use crate::config::MailSettings;
use crate::error::{AppError, Result};
use crate::mail::{Mailer, OutgoingMessage};

fn mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|e| AppError::Send(format!("invalid address {address}: {e}")))
}

/// SMTP relay with STARTTLS and login credentials
pub(crate) struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub(crate) fn new(settings: &MailSettings) -> Result<Self> {
        if settings.server.is_empty() {
            return Err(AppError::Config("mail.server is not set".to_string()));
        }
        let from = mailbox(&settings.from_address)?;
        let transport = SmtpTransport::starttls_relay(&settings.server)
            .map_err(|e| AppError::Send(e.to_string()))?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();
        Ok(SmtpMailer { transport, from })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, message: &OutgoingMessage) -> Result<()> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(message.subject.as_str())
            .header(ContentType::TEXT_HTML);
        for to in &message.to {
            builder = builder.to(mailbox(to)?);
        }
        for cc in &message.cc {
            builder = builder.cc(mailbox(cc)?);
        }
        let email = builder
            .body(message.html.clone())
            .map_err(|e| AppError::Send(e.to_string()))?;

        self.transport
            .send(&email)
            .map_err(|e| AppError::Send(e.to_string()))?;
        Ok(())
    }
}
