//! Sending and resending signature confirmation emails
use crate::mailer::{Mail, Mailer};
use crate::petition::Petition;
use crate::store::PetitionStore;
use crate::utils::new_confirmation_token;
use crate::validation::EMAIL_PATTERN;
use regex::Regex;
use tracing::{debug, info};

pub struct SignatureConfirmer<'a> {
    store: &'a PetitionStore,
    petition: &'a Petition,
    email: String,
    mailer: &'a dyn Mailer,
    email_pattern: &'a Regex,
}

impl<'a> SignatureConfirmer<'a> {
    pub fn new(
        store: &'a PetitionStore,
        petition: &'a Petition,
        email: &str,
        mailer: &'a dyn Mailer,
        email_pattern: &'a Regex,
    ) -> Self {
        Self {
            store,
            petition,
            email: email.trim().to_string(),
            mailer,
            email_pattern,
        }
    }

    /// Emails the address about each of its signatures on the petition.
    ///
    /// Pending signatures get a fresh confirmation link, validated ones a
    /// reminder that they already count. An address with no signature is
    /// told so. A malformed address is ignored.
    pub fn confirm(&self) -> anyhow::Result<()> {
        if !self.email_pattern.is_match(&self.email) {
            debug!(petition_id = self.petition.id, "confirmation email not recognised, ignoring");
            return Ok(());
        }

        let signatures: Vec<_> = self
            .store
            .signatures_for_petition(self.petition.id)?
            .into_iter()
            .filter(|signature| signature.email_matches(&self.email))
            .collect();

        if signatures.is_empty() {
            self.mailer.deliver_later(Mail::NoSignatureForPetition {
                to: self.email.clone(),
                petition_id: self.petition.id,
            });
            info!(petition_id = self.petition.id, "no signature found for confirmation email");
            return Ok(());
        }

        for mut signature in signatures {
            if signature.is_validated() {
                self.mailer.deliver_later(Mail::SignatureAlreadyConfirmed {
                    to: signature.email.clone(),
                    petition_id: self.petition.id,
                    signature_id: signature.id,
                });
                continue;
            }
            if !signature.is_pending() {
                continue;
            }

            let token = new_confirmation_token()?;
            signature.reset_perishable_token(&token);
            self.store.save_signature(&signature)?;
            self.mailer.deliver_later(Mail::EmailConfirmationForSigner {
                to: signature.email.clone(),
                petition_id: self.petition.id,
                signature_id: signature.id,
                token,
            });
            info!(
                petition_id = self.petition.id,
                signature_id = signature.id,
                email_count = signature.email_count,
                "confirmation email resent"
            );
        }
        Ok(())
    }
}

/// Resends the confirmation email for `email` on a visible petition.
///
/// Hidden and nonexistent petitions fail with
/// [`StoreError::NotFound`](crate::error::StoreError::NotFound).
pub fn resend_confirmation(
    store: &PetitionStore,
    mailer: &dyn Mailer,
    petition_id: u64,
    email: &str,
) -> anyhow::Result<()> {
    let petition = store.visible().find(petition_id)?;
    SignatureConfirmer::new(store, &petition, email, mailer, &EMAIL_PATTERN).confirm()
}

