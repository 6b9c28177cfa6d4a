use anyhow::Context;
use axum::async_trait;
use lettre::{
    message::Mailbox,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::SmtpConfig;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, text: &str) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        let from = cfg
            .from
            .parse::<Mailbox>()
            .context("parse EMAIL_FROM mailbox")?;

        // Local dev relays (mailtrap, mailhog) run without TLS or credentials.
        let transport = if cfg.username.is_empty() {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&cfg.host)
                .port(cfg.port)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
                .context("smtp relay")?
                .port(cfg.port)
                .credentials(Credentials::new(
                    cfg.username.clone(),
                    cfg.password.clone(),
                ))
                .build()
        };

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, text: &str) -> anyhow::Result<()> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(to.parse::<Mailbox>().context("parse recipient")?)
            .subject(subject)
            .body(text.to_string())
            .context("build email")?;

        self.transport.send(email).await.context("smtp send")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingMailer {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, to: &str, subject: &str, _text: &str) -> anyhow::Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), subject.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn mailer_trait_object_dispatches() {
        let mailer = RecordingMailer {
            sent: Mutex::new(Vec::new()),
        };
        let dyn_mailer: &dyn Mailer = &mailer;
        dyn_mailer
            .send("a@b.com", "Your password reset token", "hi")
            .await
            .unwrap();
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "a@b.com");
    }
}
