//! Outgoing mail and the background delivery queue
//!
//! Request handlers only ever enqueue; delivery happens on a worker task that
//! drains the queue, so a slow or failing delivery never holds up a request.
use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "template", rename_all = "snake_case")]
pub enum Mail {
    /// Sent to the creator of a new petition, asking them to collect sponsors.
    GatherSponsors {
        to: String,
        petition_id: u64,
        action: String,
    },
    EmailConfirmationForSigner {
        to: String,
        petition_id: u64,
        signature_id: u64,
        token: String,
    },
    SignatureAlreadyConfirmed {
        to: String,
        petition_id: u64,
        signature_id: u64,
    },
    NoSignatureForPetition {
        to: String,
        petition_id: u64,
    },
}

impl Mail {
    pub fn to(&self) -> &str {
        match self {
            Mail::GatherSponsors { to, .. }
            | Mail::EmailConfirmationForSigner { to, .. }
            | Mail::SignatureAlreadyConfirmed { to, .. }
            | Mail::NoSignatureForPetition { to, .. } => to,
        }
    }
    pub fn subject(&self) -> String {
        match self {
            Mail::GatherSponsors { action, .. } => {
                format!("Action required: Petition \u{201c}{action}\u{201d}")
            }
            Mail::EmailConfirmationForSigner { .. } => "Please confirm your email address".into(),
            Mail::SignatureAlreadyConfirmed { .. } => "Duplicate signature".into(),
            Mail::NoSignatureForPetition { .. } => "We could not find your signature".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope {
    pub from: String,
    pub subject: String,
    pub mail: Mail,
}

impl Envelope {
    pub fn new(from: &str, mail: Mail) -> Self {
        Self {
            from: from.to_string(),
            subject: mail.subject(),
            mail,
        }
    }
}

pub trait Mailer: Send + Sync {
    /// Queues `mail` for delivery and returns immediately.
    fn deliver_later(&self, mail: Mail);
}

/// Sender half of the delivery queue.
#[derive(Clone)]
pub struct MailQueue {
    from: String,
    sender: UnboundedSender<Envelope>,
}

impl MailQueue {
    pub fn new(from: impl Into<String>) -> (Self, UnboundedReceiver<Envelope>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let queue = Self {
            from: from.into(),
            sender,
        };
        (queue, receiver)
    }
}

impl Mailer for MailQueue {
    fn deliver_later(&self, mail: Mail) {
        let envelope = Envelope::new(&self.from, mail);
        debug!(to = envelope.mail.to(), subject = %envelope.subject, "mail queued");
        if let Err(err) = self.sender.send(envelope) {
            warn!(to = err.0.mail.to(), "mail queue closed, dropping mail");
        }
    }
}

pub trait DeliveryMethod: Send + 'static {
    fn deliver(&self, envelope: &Envelope) -> anyhow::Result<()>;
}

/// Writes each mail to the log instead of sending it.
pub struct LogDelivery;

impl DeliveryMethod for LogDelivery {
    fn deliver(&self, envelope: &Envelope) -> anyhow::Result<()> {
        info!(
            from = %envelope.from,
            to = envelope.mail.to(),
            subject = %envelope.subject,
            body = %serde_json::to_string(&envelope.mail)?,
            "mail delivered"
        );
        Ok(())
    }
}

/// Drains the queue until every [`MailQueue`] handle has been dropped.
pub async fn run_delivery_worker(
    mut receiver: UnboundedReceiver<Envelope>,
    method: impl DeliveryMethod,
) {
    while let Some(envelope) = receiver.recv().await {
        if let Err(err) = method.deliver(&envelope) {
            warn!(to = envelope.mail.to(), error = %err, "mail delivery failed");
        }
    }
    info!("mail queue closed, delivery worker stopping");
}

/// Keeps delivered mail in memory. Used where nothing should leave the process.
#[derive(Default)]
pub struct MemoryMailer {
    from: String,
    deliveries: Mutex<Vec<Envelope>>,
}

impl MemoryMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            deliveries: Mutex::new(Vec::new()),
        }
    }
    pub fn deliveries(&self) -> Vec<Envelope> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
    pub fn clear(&self) {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Mailer for MemoryMailer {
    fn deliver_later(&self, mail: Mail) {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Envelope::new(&self.from, mail));
    }
}
