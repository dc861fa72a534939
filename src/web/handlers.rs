//! Petition endpoints
use super::AppState;
use super::errors::{ApiError, ApiResult};
use crate::confirmation::resend_confirmation;
use crate::listing::{Facet, ListingResolution, PetitionSearch, PetitionSummary};
use crate::params::StageSubmission;
use crate::petition::Petition;
use crate::stage::{Collaborators, RequestContext, StageManager, StageOutcome, StageView};
use axum::Json;
use axum::extract::{ConnectInfo, Path, Query, RawQuery, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tracing::info;

fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// Runs store work on the blocking pool so sled I/O never stalls the runtime.
async fn blocking<T, F>(work: F) -> ApiResult<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| ApiError::Internal(err.into()))?;
    Ok(result?)
}

#[derive(Debug, Deserialize)]
pub struct NewPetitionQuery {
    pub petition_action: Option<String>,
}

/// GET /petitions/new
pub async fn new_petition(Query(query): Query<NewPetitionQuery>) -> Json<StageView> {
    Json(StageManager::start(query.petition_action).view())
}

/// POST /petitions/new
pub async fn create_petition(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    axum::Form(pairs): axum::Form<Vec<(String, String)>>,
) -> ApiResult<Response> {
    let request = match connect_info {
        Some(ConnectInfo(addr)) => RequestContext {
            remote_ip: addr.ip().to_string(),
        },
        None => RequestContext::default(),
    };
    let submission = StageSubmission::from_form_pairs(pairs);
    let mut manager = StageManager::from_submission(submission, request);

    let base_url = state.base_url.clone();
    let outcome = blocking(move || {
        let collaborators = Collaborators {
            store: &state.store,
            constituencies: state.constituencies.as_ref(),
            mailer: state.mailer.as_ref(),
        };
        manager.advance(&collaborators)
    })
    .await?;

    match outcome {
        StageOutcome::Render(view) => Ok(Json(view).into_response()),
        StageOutcome::Created { petition, .. } => Ok(found(format!(
            "{base_url}/petitions/{}/thank-you",
            petition.id
        ))),
    }
}

/// GET /petitions/:id
pub async fn show_petition(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Petition>> {
    let petition = blocking(move || Ok(state.store.visible().find(id)?)).await?;
    Ok(Json(petition))
}

#[derive(Debug, Serialize)]
pub struct ThankYou {
    pub petition_id: u64,
    pub message: &'static str,
}

/// GET /petitions/:id/thank-you
pub async fn thank_you(Path(id): Path<u64>) -> Json<ThankYou> {
    Json(ThankYou {
        petition_id: id,
        message: "We've sent you an email. Click the link in it to confirm your email address.",
    })
}

/// GET /petitions
///
/// The `state` check runs on the raw query before anything else is parsed,
/// so a malformed `q` or `page` never prevents the redirect.
pub async fn list_petitions(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
) -> ApiResult<Response> {
    let path = format!("{}/petitions", state.base_url);
    match state.facets.resolve(&path, raw_query.as_deref()) {
        ListingResolution::Redirect(location) => {
            info!(location = %location, "redirecting non-public facet");
            Ok(found(location))
        }
        ListingResolution::Scoped(facet) => {
            let search =
                PetitionSearch::from_raw_query(facet, state.per_page, raw_query.as_deref());
            let results = blocking(move || Ok(search.execute(&state.store)?)).await?;
            Ok(Json(results).into_response())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub query: Option<String>,
    pub similar: Vec<PetitionSummary>,
}

/// GET /petitions/check
///
/// Lets a would-be creator look for existing petitions before starting one.
pub async fn check_petitions(
    State(state): State<AppState>,
    Query(query): Query<CheckQuery>,
) -> ApiResult<Json<CheckResponse>> {
    let search = PetitionSearch::new(Facet::All, state.per_page).with_query(query.q);
    let query = search.query.clone();
    let similar = match query {
        Some(_) => blocking(move || Ok(search.execute(&state.store)?.petitions)).await?,
        None => Vec::new(),
    };
    Ok(Json(CheckResponse { query, similar }))
}

#[derive(Debug, Default, Deserialize)]
pub struct ResendConfirmationForm {
    #[serde(default)]
    pub confirmation_email: String,
}

#[derive(Debug, Serialize)]
pub struct ResendConfirmationResponse {
    pub petition_id: u64,
    pub status: &'static str,
}

/// POST /petitions/:id/resend-confirmation-email
pub async fn resend_confirmation_email(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    axum::Form(form): axum::Form<ResendConfirmationForm>,
) -> ApiResult<Json<ResendConfirmationResponse>> {
    blocking(move || {
        resend_confirmation(
            &state.store,
            state.mailer.as_ref(),
            id,
            &form.confirmation_email,
        )
    })
    .await?;
    Ok(Json(ResendConfirmationResponse {
        petition_id: id,
        status: "resent",
    }))
}
