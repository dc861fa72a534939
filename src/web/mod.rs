//! HTTP adapter
//!
//! Handlers translate requests into calls on the wizard, listing and
//! confirmation modules and answer with JSON view models.
pub mod errors;
pub mod handlers;

use crate::config::AppConfig;
use crate::constituency::ConstituencyLookup;
use crate::listing::FacetResolver;
use crate::mailer::Mailer;
use crate::store::PetitionStore;
use axum::Router;
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<PetitionStore>,
    pub constituencies: Arc<dyn ConstituencyLookup>,
    pub mailer: Arc<dyn Mailer>,
    pub facets: Arc<FacetResolver>,
    pub base_url: Arc<str>,
    pub per_page: usize,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        store: Arc<PetitionStore>,
        constituencies: Arc<dyn ConstituencyLookup>,
        mailer: Arc<dyn Mailer>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            store,
            constituencies,
            mailer,
            facets: Arc::new(config.facet_resolver()?),
            base_url: Arc::from(config.base_url.as_str()),
            per_page: config.per_page,
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/petitions", get(handlers::list_petitions))
        .route(
            "/petitions/new",
            get(handlers::new_petition).post(handlers::create_petition),
        )
        .route("/petitions/check", get(handlers::check_petitions))
        .route("/petitions/:id", get(handlers::show_petition))
        .route("/petitions/:id/thank-you", get(handlers::thank_you))
        .route(
            "/petitions/:id/resend-confirmation-email",
            post(handlers::resend_confirmation_email),
        )
        .with_state(state)
}

/// Serves `state` on `bind_address` until ctrl-c.
pub async fn serve(bind_address: &str, state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_address.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "petitions listening");

    serve_with_shutdown(listener, state, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown requested");
    })
    .await
}

/// Serves `state` on a bound listener until `shutdown` resolves. Handlers see
/// the peer address of each connection.
pub async fn serve_with_shutdown(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;
    Ok(())
}
