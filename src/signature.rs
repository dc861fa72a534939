//! Signature records
use crate::error::SignatureError;
use crate::params::SignatureParams;
use crate::types::TimeStamp;
use crate::validation::sanitize_postcode;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureState {
    #[n(0)]
    Pending,
    #[n(1)]
    Validated,
    #[n(2)]
    Invalidated,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signature {
    #[n(0)]
    pub id: u64,
    #[n(1)]
    pub petition_id: u64,
    #[n(2)]
    pub name: String,
    #[n(3)]
    pub email: String,
    #[n(4)]
    pub postcode: String,
    #[n(5)]
    pub country: String,
    #[n(6)]
    pub uk_citizenship: bool,
    #[n(7)]
    pub state: SignatureState,
    #[n(8)]
    pub ip_address: String,
    #[n(9)]
    pub notify_by_email: bool,
    #[n(10)]
    pub constituency_id: Option<String>,
    #[n(11)]
    pub uuid: Option<String>,
    #[n(12)]
    #[serde(skip)]
    pub perishable_token_digest: Option<String>,
    #[n(13)]
    pub email_count: u32,
    #[n(14)]
    pub created_at: TimeStamp<Utc>,
}

impl Signature {
    /// Builds the unsaved creator signature for a new petition.
    ///
    /// Text is trimmed, the postcode sanitised, the requester's ip stamped and
    /// `notify_by_email` forced on. The uuid is derived when the email allows.
    pub fn creator_from_params(params: &SignatureParams, ip_address: &str) -> Self {
        let email = params.email.trim().to_string();
        let uuid = Self::generate_uuid(&email).ok();
        Self {
            id: 0,
            petition_id: 0,
            name: params.name.trim().to_string(),
            email,
            postcode: sanitize_postcode(&params.postcode),
            country: params.country.trim().to_string(),
            uk_citizenship: params.uk_citizenship_accepted(),
            state: SignatureState::Pending,
            ip_address: ip_address.to_string(),
            notify_by_email: true,
            constituency_id: None,
            uuid,
            perishable_token_digest: None,
            email_count: 0,
            created_at: TimeStamp::new(),
        }
    }

    /// Stable UUIDv5 (URL namespace) of the `mailto:` URI for `email`.
    pub fn generate_uuid(email: &str) -> Result<String, SignatureError> {
        if email.trim().is_empty() {
            return Err(SignatureError::MissingEmail(None));
        }
        let name = format!("mailto:{email}");
        Ok(Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()).to_string())
    }

    pub fn derive_uuid(&self) -> Result<String, SignatureError> {
        Self::generate_uuid(&self.email).map_err(|_| SignatureError::MissingEmail(Some(self.id)))
    }

    pub fn is_pending(&self) -> bool {
        self.state == SignatureState::Pending
    }
    pub fn is_validated(&self) -> bool {
        self.state == SignatureState::Validated
    }
    pub fn email_matches(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email.trim())
    }

    /// Replaces the stored token digest with that of `token` and counts the
    /// confirmation email about to be sent.
    pub fn reset_perishable_token(&mut self, token: &str) {
        self.perishable_token_digest = Some(sha256::digest(token));
        self.email_count = self.email_count.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_is_derived_from_the_mailto_uri() {
        assert_eq!(
            Signature::generate_uuid("alice@example.com").unwrap(),
            "6613a3fd-c2c4-5bc2-a6de-3dc0b2527dd6"
        );
        assert_eq!(
            Signature::generate_uuid("bob@example.com").unwrap(),
            "b1c51b78-4720-546f-b8b4-b7d925d6b1b9"
        );
    }

    #[test]
    fn uuid_requires_an_email() {
        assert!(Signature::generate_uuid("  ").is_err());
    }

    #[test]
    fn creator_signature_is_pending_and_notified() {
        let params = SignatureParams {
            name: "John Mcenroe ".into(),
            email: " john@example.com ".into(),
            postcode: "se3 4ll".into(),
            country: "United Kingdom".into(),
            uk_citizenship: "1".into(),
        };
        let signature = Signature::creator_from_params(&params, "0.0.0.0");

        assert_eq!(signature.state, SignatureState::Pending);
        assert_eq!(signature.email, "john@example.com");
        assert_eq!(signature.postcode, "SE34LL");
        assert_eq!(signature.ip_address, "0.0.0.0");
        assert!(signature.notify_by_email);
        assert!(signature.uk_citizenship);
        assert_eq!(
            signature.uuid.as_deref(),
            Some(Signature::generate_uuid("john@example.com").unwrap().as_str())
        );
    }

    #[test]
    fn resetting_the_token_counts_emails() {
        let mut signature = Signature::creator_from_params(&SignatureParams::default(), "127.0.0.1");
        signature.reset_perishable_token("token1abc");
        signature.reset_perishable_token("token1def");

        assert_eq!(signature.email_count, 2);
        assert_eq!(
            signature.perishable_token_digest.as_deref(),
            Some(sha256::digest("token1def").as_str())
        );
    }
}
