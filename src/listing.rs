//! Public petition listings
//!
//! The `state` query parameter selects a facet. Only facets on the configured
//! public whitelist may be requested; anything else is redirected to the same
//! listing with `state=all` so internal states are never exposed through a
//! crafted query string.
use crate::error::StoreError;
use crate::petition::{Petition, PetitionState};
use crate::store::PetitionStore;
use crate::types::TimeStamp;
use chrono::Utc;
use serde::Serialize;
use std::str::FromStr;
use url::form_urlencoded;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    All,
    Open,
    Closed,
    Rejected,
}

impl Facet {
    pub fn as_str(self) -> &'static str {
        match self {
            Facet::All => "all",
            Facet::Open => "open",
            Facet::Closed => "closed",
            Facet::Rejected => "rejected",
        }
    }
    /// Facets only ever select among visible petitions.
    pub fn matches(self, petition: &Petition) -> bool {
        if !petition.is_visible() {
            return false;
        }
        match self {
            Facet::All => true,
            Facet::Open => petition.state == PetitionState::Open,
            Facet::Closed => petition.state == PetitionState::Closed,
            Facet::Rejected => petition.state == PetitionState::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown facet {0:?}")]
pub struct UnknownFacet(pub String);

impl FromStr for Facet {
    type Err = UnknownFacet;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Facet::All),
            "open" => Ok(Facet::Open),
            "closed" => Ok(Facet::Closed),
            "rejected" => Ok(Facet::Rejected),
            other => Err(UnknownFacet(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingResolution {
    Scoped(Facet),
    /// The listing path with the rewritten query.
    Redirect(String),
}

#[derive(Debug, Clone)]
pub struct FacetResolver {
    public: Vec<Facet>,
}

impl FacetResolver {
    pub fn new(public: Vec<Facet>) -> Self {
        Self { public }
    }

    pub fn public_facets(&self) -> &[Facet] {
        &self.public
    }

    /// Resolves the `state` parameter of a raw listing query string. When
    /// `state` repeats, the last value counts.
    pub fn resolve(&self, path: &str, raw_query: Option<&str>) -> ListingResolution {
        let raw_query = raw_query.unwrap_or_default();
        let state = form_urlencoded::parse(raw_query.as_bytes())
            .filter(|(key, _)| key == "state")
            .last()
            .map(|(_, value)| value.into_owned());

        let Some(state) = state.filter(|state| !state.is_empty()) else {
            return ListingResolution::Scoped(Facet::All);
        };
        match state.parse::<Facet>() {
            Ok(facet) if self.public.contains(&facet) => ListingResolution::Scoped(facet),
            _ => ListingResolution::Redirect(format!(
                "{path}?{}",
                replace_state_with_all(raw_query)
            )),
        }
    }
}

/// Rewrites the first `state` pair to `state=all` and drops any others,
/// leaving every other segment byte-for-byte as it was.
pub fn replace_state_with_all(raw_query: &str) -> String {
    let mut replaced = false;
    let mut segments = Vec::new();
    for segment in raw_query.split('&').filter(|segment| !segment.is_empty()) {
        let is_state = form_urlencoded::parse(segment.as_bytes())
            .next()
            .is_some_and(|(key, _)| key == "state");
        if !is_state {
            segments.push(segment);
        } else if !replaced {
            segments.push("state=all");
            replaced = true;
        }
    }
    if !replaced {
        segments.push("state=all");
    }
    segments.join("&")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PetitionSearch {
    pub facet: Facet,
    pub query: Option<String>,
    pub page: usize,
    pub per_page: usize,
}

impl PetitionSearch {
    pub fn new(facet: Facet, per_page: usize) -> Self {
        Self {
            facet,
            query: None,
            page: 1,
            per_page: per_page.max(1),
        }
    }
    /// A search scoped to `facet` with `q` and `page` read from a raw query.
    /// Repeated keys take their last value and a `page` that is not a
    /// number means the first page.
    pub fn from_raw_query(facet: Facet, per_page: usize, raw_query: Option<&str>) -> Self {
        let mut query = None;
        let mut page = 1;
        for (key, value) in form_urlencoded::parse(raw_query.unwrap_or_default().as_bytes()) {
            match key.as_ref() {
                "q" => query = Some(value.into_owned()),
                "page" => page = value.trim().parse().unwrap_or(1),
                _ => {}
            }
        }
        Self::new(facet, per_page).with_query(query).with_page(page)
    }
    pub fn with_query(mut self, query: Option<String>) -> Self {
        self.query = query
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty());
        self
    }
    pub fn with_page(mut self, page: usize) -> Self {
        self.page = page.max(1);
        self
    }

    /// Matching visible petitions, newest first.
    pub fn execute(&self, store: &PetitionStore) -> Result<SearchResults, StoreError> {
        let mut matching: Vec<Petition> = store
            .visible()
            .all()?
            .into_iter()
            .filter(|petition| self.facet.matches(petition))
            .filter(|petition| {
                self.query
                    .as_deref()
                    .is_none_or(|query| petition.matches_query(query))
            })
            .collect();
        matching.reverse();

        let total = matching.len();
        let petitions = matching
            .into_iter()
            .skip((self.page - 1).saturating_mul(self.per_page))
            .take(self.per_page)
            .map(PetitionSummary::from)
            .collect();

        Ok(SearchResults {
            scope: self.facet,
            query: self.query.clone(),
            page: self.page,
            per_page: self.per_page,
            total,
            petitions,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PetitionSummary {
    pub id: u64,
    pub action: String,
    pub state: PetitionState,
    pub created_at: TimeStamp<Utc>,
}

impl From<Petition> for PetitionSummary {
    fn from(petition: Petition) -> Self {
        Self {
            id: petition.id,
            action: petition.action,
            state: petition.state,
            created_at: petition.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResults {
    pub scope: Facet,
    pub query: Option<String>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub petitions: Vec<PetitionSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> FacetResolver {
        FacetResolver::new(vec![Facet::All, Facet::Open, Facet::Closed, Facet::Rejected])
    }

    #[test]
    fn missing_or_blank_state_means_all() {
        assert_eq!(
            resolver().resolve("/petitions", None),
            ListingResolution::Scoped(Facet::All)
        );
        assert_eq!(
            resolver().resolve("/petitions", Some("state=&q=clocks")),
            ListingResolution::Scoped(Facet::All)
        );
    }

    #[test]
    fn last_state_wins() {
        assert_eq!(
            resolver().resolve("/petitions", Some("state=bad&state=open")),
            ListingResolution::Scoped(Facet::Open)
        );
        assert_eq!(
            resolver().resolve("/petitions", Some("state=open&state=bad")),
            ListingResolution::Redirect("/petitions?state=all".into())
        );
    }

    #[test]
    fn search_params_are_read_leniently() {
        let search = PetitionSearch::from_raw_query(Facet::All, 20, Some("q=a&q=clocks&page=abc"));
        assert_eq!(search.query.as_deref(), Some("clocks"));
        assert_eq!(search.page, 1);

        let search = PetitionSearch::from_raw_query(Facet::Open, 20, Some("page=3&state=open"));
        assert_eq!(search.query, None);
        assert_eq!(search.page, 3);
        assert_eq!(search.facet, Facet::Open);
    }

    #[test]
    fn public_facets_are_scoped() {
        assert_eq!(
            resolver().resolve("/petitions", Some("state=open")),
            ListingResolution::Scoped(Facet::Open)
        );
    }

    #[test]
    fn unknown_facets_redirect_to_all() {
        assert_eq!(
            resolver().resolve("/petitions", Some("state=awaiting_monkey")),
            ListingResolution::Redirect("/petitions?state=all".into())
        );
    }

    #[test]
    fn known_but_unlisted_facets_redirect() {
        let resolver = FacetResolver::new(vec![Facet::All, Facet::Open]);
        assert_eq!(
            resolver.resolve("/petitions", Some("state=rejected")),
            ListingResolution::Redirect("/petitions?state=all".into())
        );
    }

    #[test]
    fn redirect_preserves_other_params_verbatim() {
        assert_eq!(
            resolver().resolve("/petitions", Some("q=what+is+clocks&state=awaiting_monkey")),
            ListingResolution::Redirect("/petitions?q=what+is+clocks&state=all".into())
        );
        assert_eq!(
            replace_state_with_all("state=x&page=2&q=caf%C3%A9&state=y"),
            "state=all&page=2&q=caf%C3%A9"
        );
    }
}
