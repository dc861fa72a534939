//! Petition records and their lifecycle states
use crate::params::PetitionParams;
use crate::types::TimeStamp;
use chrono::Utc;
use serde::Serialize;
use std::fmt;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PetitionState {
    #[n(0)]
    Pending,
    #[n(1)]
    Validated,
    #[n(2)]
    Sponsored,
    #[n(3)]
    Open,
    #[n(4)]
    Closed,
    #[n(5)]
    Rejected,
    #[n(6)]
    Hidden,
}

impl PetitionState {
    /// States the public may see. Everything else is moderation-only.
    pub const VISIBLE: [PetitionState; 3] =
        [PetitionState::Open, PetitionState::Closed, PetitionState::Rejected];

    pub fn is_visible(self) -> bool {
        Self::VISIBLE.contains(&self)
    }
    pub fn as_str(self) -> &'static str {
        match self {
            PetitionState::Pending => "pending",
            PetitionState::Validated => "validated",
            PetitionState::Sponsored => "sponsored",
            PetitionState::Open => "open",
            PetitionState::Closed => "closed",
            PetitionState::Rejected => "rejected",
            PetitionState::Hidden => "hidden",
        }
    }
}

impl fmt::Display for PetitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Petition {
    #[n(0)]
    pub id: u64,
    #[n(1)]
    pub action: String,
    #[n(2)]
    pub background: String,
    #[n(3)]
    pub additional_details: String,
    #[n(4)]
    pub state: PetitionState,
    #[n(5)]
    pub creator_signature_id: Option<u64>,
    #[n(6)]
    pub created_at: TimeStamp<Utc>,
}

impl Petition {
    /// Builds an unsaved petition from wizard parameters. The id and creator
    /// signature are assigned by the store; the state is always `pending`.
    pub fn from_params(params: &PetitionParams) -> Self {
        Self {
            id: 0,
            action: params.action.trim().to_string(),
            background: params.background.trim().to_string(),
            additional_details: params.additional_details.trim().to_string(),
            state: PetitionState::Pending,
            creator_signature_id: None,
            created_at: TimeStamp::new(),
        }
    }
    pub fn is_visible(&self) -> bool {
        self.state.is_visible()
    }
    pub fn set_state(mut self, state: PetitionState) -> Self {
        self.state = state;
        self
    }
    /// Case-insensitive substring match over the petition text.
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        [&self.action, &self.background, &self.additional_details]
            .iter()
            .any(|text| text.to_lowercase().contains(&query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_petitions_are_pending_and_trimmed() {
        let params = PetitionParams {
            action: " Save the planet".into(),
            background: "Limit temperature rise ".into(),
            ..Default::default()
        };
        let petition = Petition::from_params(&params);

        assert_eq!(petition.state, PetitionState::Pending);
        assert_eq!(petition.action, "Save the planet");
        assert_eq!(petition.background, "Limit temperature rise");
        assert!(!petition.is_visible());
    }

    #[test]
    fn only_public_states_are_visible() {
        let visible: Vec<_> = [
            PetitionState::Pending,
            PetitionState::Validated,
            PetitionState::Sponsored,
            PetitionState::Open,
            PetitionState::Closed,
            PetitionState::Rejected,
            PetitionState::Hidden,
        ]
        .into_iter()
        .filter(|state| state.is_visible())
        .collect();

        assert_eq!(visible, PetitionState::VISIBLE.to_vec());
    }

    #[test]
    fn query_matching_ignores_case() {
        let petition = Petition::from_params(&PetitionParams {
            action: "What is clocks".into(),
            ..Default::default()
        });

        assert!(petition.matches_query("CLOCKS"));
        assert!(petition.matches_query(""));
        assert!(!petition.matches_query("planet"));
    }
}
