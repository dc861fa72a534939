#![allow(dead_code)]

use petitions::constituency::{Constituency, ConstituencyLookup, StaticConstituencyLookup};
use petitions::error::LookupError;
use petitions::mailer::MemoryMailer;
use petitions::params::StageSubmission;
use petitions::petition::{Petition, PetitionState};
use petitions::stage::{Collaborators, RequestContext, StageManager, StageOutcome};
use petitions::store::PetitionStore;
use std::sync::Arc;
use tempfile::TempDir;

pub const MAIL_FROM: &str = "no-reply@test.epetitions.website";

/// A store on its own temporary sled database. Sled locks its files, so every
/// test gets a separate directory; keep the `TempDir` alive with the store.
pub fn temp_store(name: &str) -> anyhow::Result<(TempDir, PetitionStore)> {
    let temp_dir = tempfile::tempdir()?;
    let db = sled::open(temp_dir.path().join(name))?;
    db.clear()?;
    Ok((temp_dir, PetitionStore::new(Arc::new(db))))
}

pub fn north_creatorshire() -> Constituency {
    Constituency::new("54321", "North Creatorshire")
}

pub fn lookup() -> StaticConstituencyLookup {
    StaticConstituencyLookup::new().with_postcode("SE3 4LL", north_creatorshire())
}

pub struct FailingLookup;

impl ConstituencyLookup for FailingLookup {
    fn find_by_postcode(&self, postcode: &str) -> Result<Option<Constituency>, LookupError> {
        Err(LookupError::Unavailable {
            postcode: postcode.to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

/// Form pairs for a complete, valid submission from the final stage.
pub fn valid_form() -> Vec<(String, String)> {
    [
        ("stage", "replay-email"),
        ("move", "next"),
        ("petition[action]", "Save the planet"),
        ("petition[background]", "Limit temperature rise at two degrees"),
        ("petition[additional_details]", "Global warming is upon us"),
        ("petition[creator_signature][name]", "John Mcenroe"),
        ("petition[creator_signature][email]", "john@example.com"),
        ("petition[creator_signature][postcode]", "SE3 4LL"),
        ("petition[creator_signature][country]", "United Kingdom"),
        ("petition[creator_signature][uk_citizenship]", "1"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// `valid_form` with `key` set to `value`, added when absent.
pub fn form_with(key: &str, value: &str) -> Vec<(String, String)> {
    let mut form = valid_form();
    match form.iter_mut().find(|(k, _)| k == key) {
        Some(pair) => pair.1 = value.to_string(),
        None => form.push((key.to_string(), value.to_string())),
    }
    form
}

pub fn submit(
    store: &PetitionStore,
    mailer: &MemoryMailer,
    form: Vec<(String, String)>,
) -> anyhow::Result<(StageManager, StageOutcome)> {
    let lookup = lookup();
    let collaborators = Collaborators {
        store,
        constituencies: &lookup,
        mailer,
    };
    let mut manager = StageManager::from_submission(
        StageSubmission::from_form_pairs(form),
        RequestContext::default(),
    );
    let outcome = manager.advance(&collaborators)?;
    Ok((manager, outcome))
}

/// Creates a petition through the wizard and moves it to `state`.
pub fn create_petition_in_state(
    store: &PetitionStore,
    email: &str,
    state: PetitionState,
) -> anyhow::Result<Petition> {
    let mailer = MemoryMailer::new(MAIL_FROM);
    let (_, outcome) = submit(
        store,
        &mailer,
        form_with("petition[creator_signature][email]", email),
    )?;
    let StageOutcome::Created { petition, .. } = outcome else {
        anyhow::bail!("petition was not created: {outcome:?}");
    };
    let petition = petition.set_state(state);
    store.save_petition(&petition)?;
    Ok(petition)
}
