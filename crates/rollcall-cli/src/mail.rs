use anyhow::{Context, Result};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use rollcall_core::notify::{DeliveryError, MailTransport};

use crate::config::SmtpConfig;

/// SMTP-backed mail transport (implicit TLS, port 465).
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build from config; fails before any send if credentials are
    /// missing or the sender address does not parse.
    pub fn from_config(config: &SmtpConfig) -> Result<Self> {
        let user = config
            .user
            .clone()
            .context("ROLLCALL_SMTP_USER is not set")?;
        let password = config
            .password
            .clone()
            .context("ROLLCALL_SMTP_PASSWORD is not set")?;
        let from = config
            .from
            .clone()
            .unwrap_or_else(|| user.clone())
            .parse::<Mailbox>()
            .context("sender address does not parse")?;

        let transport = SmtpTransport::relay(&config.host)
            .with_context(|| format!("smtp relay {}", config.host))?
            .credentials(Credentials::new(user, password))
            .build();

        Ok(Self { transport, from })
    }
}

impl MailTransport for SmtpMailer {
    fn send(&mut self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        let to = to
            .parse::<Mailbox>()
            .map_err(|e| DeliveryError(format!("bad recipient {to:?}: {e}")))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| DeliveryError(format!("build message: {e}")))?;
        self.transport
            .send(&message)
            .map(|_| ())
            .map_err(|e| DeliveryError(e.to_string()))
    }
}
