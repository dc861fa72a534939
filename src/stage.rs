//! The petition creation wizard
//!
//! A submission names the stage it was made from and a direction. Moving
//! forward validates the fields of that stage; errors send the user to the
//! stage owning the failing fields (see [`FIELD_OWNERS`]). Moving forward from
//! the last stage creates the petition and its creator signature.
use crate::constituency::ConstituencyLookup;
use crate::mailer::{Mail, Mailer};
use crate::params::{PetitionParams, StageSubmission};
use crate::petition::Petition;
use crate::signature::Signature;
use crate::store::PetitionStore;
use crate::validation::{self, Field, FieldErrors};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Petition,
    ReplayPetition,
    Creator,
    ReplayEmail,
    Done,
}

impl Stage {
    pub const ORDER: [Stage; 5] = [
        Stage::Petition,
        Stage::ReplayPetition,
        Stage::Creator,
        Stage::ReplayEmail,
        Stage::Done,
    ];

    /// Unknown or missing stage names start the wizard from the beginning.
    pub fn parse(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some("replay-petition") => Stage::ReplayPetition,
            Some("creator") => Stage::Creator,
            Some("replay-email") => Stage::ReplayEmail,
            Some("done") => Stage::Done,
            _ => Stage::Petition,
        }
    }
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Petition => "petition",
            Stage::ReplayPetition => "replay-petition",
            Stage::Creator => "creator",
            Stage::ReplayEmail => "replay-email",
            Stage::Done => "done",
        }
    }
    pub fn next(self) -> Stage {
        match self {
            Stage::Petition => Stage::ReplayPetition,
            Stage::ReplayPetition => Stage::Creator,
            Stage::Creator => Stage::ReplayEmail,
            Stage::ReplayEmail | Stage::Done => Stage::Done,
        }
    }
    pub fn previous(self) -> Stage {
        match self {
            Stage::Petition | Stage::ReplayPetition => Stage::Petition,
            Stage::Creator => Stage::ReplayPetition,
            Stage::ReplayEmail => Stage::Creator,
            Stage::Done => Stage::ReplayEmail,
        }
    }
    /// Fields checked when moving forward from this stage. The final review
    /// stage re-checks everything before creation.
    pub fn validated_fields(self) -> &'static [Field] {
        match self {
            Stage::Petition | Stage::ReplayPetition => &Field::PETITION,
            Stage::Creator => &Field::CREATOR,
            Stage::ReplayEmail | Stage::Done => &Field::ALL,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Move {
    Next,
    Back,
}

impl Move {
    /// Normalises the navigation signals of a submission.
    ///
    /// `move` must be exactly `next` or `back`, anything else means `next`. The
    /// `move:back` companion forces `back`, then `move:next` forces `next`, so
    /// `next` wins when both are sent.
    pub fn normalize(move_to: Option<&str>, move_next: bool, move_back: bool) -> Move {
        let mut direction = match move_to {
            Some("back") => Move::Back,
            _ => Move::Next,
        };
        if move_back {
            direction = Move::Back;
        }
        if move_next {
            direction = Move::Next;
        }
        direction
    }
    pub fn as_str(self) -> &'static str {
        match self {
            Move::Next => "next",
            Move::Back => "back",
        }
    }
}

/// Which stage re-renders when a field fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOwner {
    Fixed(Stage),
    /// Owned by the stage the submission came from when it is one of
    /// `entry_stages`, otherwise by `fallback`.
    EntryStage {
        entry_stages: &'static [Stage],
        fallback: Stage,
    },
}

pub const FIELD_OWNERS: [(Field, FieldOwner); 8] = [
    (Field::Action, FieldOwner::Fixed(Stage::Petition)),
    (Field::Background, FieldOwner::Fixed(Stage::Petition)),
    (Field::AdditionalDetails, FieldOwner::Fixed(Stage::Petition)),
    (Field::Name, FieldOwner::Fixed(Stage::Creator)),
    (Field::UkCitizenship, FieldOwner::Fixed(Stage::Creator)),
    (Field::Postcode, FieldOwner::Fixed(Stage::Creator)),
    (Field::Country, FieldOwner::Fixed(Stage::Creator)),
    (
        Field::Email,
        FieldOwner::EntryStage {
            entry_stages: &[Stage::Creator, Stage::ReplayEmail],
            fallback: Stage::Creator,
        },
    ),
];

impl FieldOwner {
    pub fn of(field: Field) -> FieldOwner {
        FIELD_OWNERS
            .iter()
            .find(|(owned, _)| *owned == field)
            .map(|(_, owner)| *owner)
            .unwrap_or(FieldOwner::Fixed(Stage::Petition))
    }
    pub fn stage(self, entry: Stage) -> Stage {
        match self {
            FieldOwner::Fixed(stage) => stage,
            FieldOwner::EntryStage {
                entry_stages,
                fallback,
            } => {
                if entry_stages.contains(&entry) {
                    entry
                } else {
                    fallback
                }
            }
        }
    }
}

/// The stage to re-render for `errors`: the earliest stage owning a failing field.
pub fn error_stage(errors: &FieldErrors, entry: Stage) -> Stage {
    errors
        .fields()
        .map(|field| FieldOwner::of(field).stage(entry))
        .min()
        .unwrap_or(entry)
}

/// Per-request details the wizard needs from the transport.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub remote_ip: String,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            remote_ip: "0.0.0.0".to_string(),
        }
    }
}

/// Collaborators used when the wizard creates a petition.
pub struct Collaborators<'a> {
    pub store: &'a PetitionStore,
    pub constituencies: &'a dyn ConstituencyLookup,
    pub mailer: &'a dyn Mailer,
}

/// What to render for a stage, including the submitted values for re-display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageView {
    pub stage: Stage,
    pub petition: PetitionParams,
    pub errors: FieldErrors,
}

#[derive(Debug)]
pub enum StageOutcome {
    Render(StageView),
    Created {
        petition: Petition,
        signature: Signature,
    },
}

pub struct StageManager {
    params: PetitionParams,
    stage: Stage,
    direction: Move,
    request: RequestContext,
    errors: FieldErrors,
}

impl StageManager {
    /// A fresh wizard on the first stage, optionally with the action prefilled.
    pub fn start(action: Option<String>) -> Self {
        let params = PetitionParams {
            action: action.unwrap_or_default(),
            ..Default::default()
        };
        Self::new(params, Stage::Petition, Move::Next, RequestContext::default())
    }

    pub fn new(params: PetitionParams, stage: Stage, direction: Move, request: RequestContext) -> Self {
        Self {
            params,
            stage,
            direction,
            request,
            errors: FieldErrors::new(),
        }
    }

    pub fn from_submission(submission: StageSubmission, request: RequestContext) -> Self {
        let direction = Move::normalize(
            submission.move_to.as_deref(),
            submission.move_next,
            submission.move_back,
        );
        let stage = Stage::parse(submission.stage.as_deref());
        Self::new(submission.petition, stage, direction, request)
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }
    pub fn direction(&self) -> Move {
        self.direction
    }
    pub fn params(&self) -> &PetitionParams {
        &self.params
    }
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn view(&self) -> StageView {
        StageView {
            stage: self.stage,
            petition: self.params.clone(),
            errors: self.errors.clone(),
        }
    }

    /// Applies the submission's direction.
    ///
    /// Validation failures are part of the rendered outcome. Errors returned
    /// here come from the lookup or the store and nothing has been persisted.
    pub fn advance(&mut self, collaborators: &Collaborators<'_>) -> anyhow::Result<StageOutcome> {
        let entry = self.stage;
        if self.direction == Move::Back {
            self.stage = entry.previous();
            debug!(from = %entry, to = %self.stage, "wizard moved back");
            return Ok(StageOutcome::Render(self.view()));
        }

        self.errors = validation::validate(&self.params, entry.validated_fields());
        if !self.errors.is_empty() {
            self.stage = error_stage(&self.errors, entry);
            debug!(
                from = %entry,
                to = %self.stage,
                fields = ?self.errors.fields().collect::<Vec<_>>(),
                "wizard submission invalid"
            );
            return Ok(StageOutcome::Render(self.view()));
        }

        self.stage = entry.next();
        if self.stage != Stage::Done {
            debug!(from = %entry, to = %self.stage, "wizard moved forward");
            return Ok(StageOutcome::Render(self.view()));
        }

        let (petition, signature) = self.create(collaborators)?;
        Ok(StageOutcome::Created {
            petition,
            signature,
        })
    }

    fn create(&self, collaborators: &Collaborators<'_>) -> anyhow::Result<(Petition, Signature)> {
        let petition = Petition::from_params(&self.params);
        let mut signature =
            Signature::creator_from_params(&self.params.creator_signature, &self.request.remote_ip);

        if !signature.postcode.is_empty() {
            signature.constituency_id = collaborators
                .constituencies
                .find_by_postcode(&signature.postcode)?
                .map(|constituency| constituency.id);
        }

        let (petition, signature) = collaborators.store.create_petition(petition, signature)?;

        collaborators.mailer.deliver_later(Mail::GatherSponsors {
            to: signature.email.clone(),
            petition_id: petition.id,
            action: petition.action.clone(),
        });

        info!(
            petition_id = petition.id,
            signature_id = signature.id,
            constituency_id = signature.constituency_id.as_deref(),
            "petition created"
        );
        Ok((petition, signature))
    }
}
