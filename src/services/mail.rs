//! Outgoing mail
//!
//! [`Mailer`] enqueues on a bounded channel and never waits: when the queue
//! is full the message is dropped with a warning, when the worker is gone
//! the send is a configuration error. [`MailWorker`] drains the queue and
//! delivers over SMTP.

use std::path::Path;
use std::str::FromStr;

use lettre::{
    message::{header::ContentType, Mailbox, Message},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
    models::MailData,
};

/// Placeholder replaced by the message content in mail templates
pub const BODY_MARKER: &str = "[%body%]";

/// Enqueue side of the mail queue
#[derive(Clone)]
pub struct Mailer {
    sender: mpsc::Sender<MailData>,
}

/// What happened to an enqueued message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    Queued,
    /// Queue full, message discarded
    Dropped,
}

impl Mailer {
    /// Create a queue holding at most `capacity` pending messages
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<MailData>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    pub fn send(&self, msg: MailData) -> AppResult<Enqueued> {
        match self.sender.try_send(msg) {
            Ok(()) => Ok(Enqueued::Queued),
            Err(TrySendError::Full(msg)) => {
                tracing::warn!(to = %msg.to, subject = %msg.subject, "Mail queue full, message dropped");
                Ok(Enqueued::Dropped)
            }
            Err(TrySendError::Closed(_)) => {
                Err(AppError::Internal("Mail queue is closed".to_string()))
            }
        }
    }
}

/// Consumes the mail queue
pub struct MailWorker {
    config: EmailConfig,
    receiver: mpsc::Receiver<MailData>,
}

impl MailWorker {
    pub fn new(config: EmailConfig, receiver: mpsc::Receiver<MailData>) -> Self {
        Self { config, receiver }
    }

    /// Deliver messages until every [`Mailer`] is dropped
    pub async fn run(mut self) {
        tracing::info!("Mail worker started");
        while let Some(msg) = self.receiver.recv().await {
            if let Err(e) = self.deliver(msg).await {
                tracing::error!("Failed to send email: {}", e);
            }
        }
        tracing::info!("Mail worker stopped");
    }

    async fn deliver(&self, msg: MailData) -> AppResult<()> {
        let body = match &msg.template {
            Some(name) => {
                let path = Path::new(&self.config.templates_dir).join(name);
                match tokio::fs::read_to_string(&path).await {
                    Ok(template) => apply_template(&template, &msg.content),
                    Err(e) => {
                        tracing::warn!("Mail template {} unreadable ({}), sending raw content", path.display(), e);
                        msg.content.clone()
                    }
                }
            }
            None => msg.content.clone(),
        };

        let email = build_message(&msg, body)?;
        let mailer = self.transport()?;

        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::Internal(format!("Mail task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        tracing::debug!(to = %msg.to, subject = %msg.subject, "Email sent");
        Ok(())
    }

    fn transport(&self) -> AppResult<SmtpTransport> {
        let builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let builder = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            builder
        };

        Ok(builder.build())
    }
}

/// Insert `content` at the body marker of `template`
pub fn apply_template(template: &str, content: &str) -> String {
    template.replace(BODY_MARKER, content)
}

fn build_message(msg: &MailData, body: String) -> AppResult<Message> {
    let from = Mailbox::from_str(&msg.from)
        .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;
    let to = Mailbox::from_str(&msg.to)
        .map_err(|e| AppError::Internal(format!("Invalid to address: {}", e)))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(msg.subject.clone())
        .header(ContentType::TEXT_HTML)
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))
}
