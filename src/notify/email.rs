use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::Notifier;
use crate::alerts::Alert;
use crate::config::SmtpConfig;

pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailNotifier {
    /// STARTTLS relay with login credentials.
    pub fn from_config(cfg: &SmtpConfig) -> Result<Self> {
        let creds = Credentials::new(cfg.username.clone(), cfg.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
            .with_context(|| format!("invalid smtp host {}", cfg.host))?
            .port(cfg.port)
            .credentials(creds)
            .build();

        let from = cfg.from.parse().context("invalid smtp.from")?;
        let to = cfg.to.parse().context("invalid smtp.to")?;

        Ok(Self { mailer, from, to })
    }

    fn build_message(&self, alert: &Alert) -> Result<Message> {
        let subject = format!("Stock alert: {}", alert.ticker);
        let body = format!(
            "{}\nKind: {:?}\nValue: {:.2}\nThreshold: {:.2}\n",
            alert.message, alert.kind, alert.value, alert.threshold
        );

        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body)
            .context("build email")
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, alert: &Alert) -> Result<()> {
        let msg = self.build_message(alert)?;
        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}
