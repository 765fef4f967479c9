// app.rs - Shared state and the HTTP router

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::auth::{CredentialVerifier, DisabledVerifier, IdentityResolver, JwtVerifier};
use crate::config::AppConfig;
use crate::database::TableStore;
use crate::handlers::{organizations, public};
use crate::middleware::bearer_auth_middleware;
use crate::notify::{
    ActivitySink, CacheInvalidator, HttpRevalidator, NoopInvalidator, Notifier, NotifyError, StoreActivityLog,
};
use crate::services::OrganizationService;
use crate::sync::{OrderThenName, Synchronizer};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TableStore>,
    pub resolver: IdentityResolver,
    pub organizations: OrganizationService,
}

impl AppState {
    /// Wire the resolver, synchronizer and notifier described by `config` around `store`
    pub fn build(store: Arc<dyn TableStore>, config: &AppConfig) -> Result<Self, NotifyError> {
        let verifier: Arc<dyn CredentialVerifier> =
            match JwtVerifier::new(&config.security.jwt_secret, config.security.jwt_audience.as_deref()) {
                Ok(verifier) => Arc::new(verifier),
                Err(_) => {
                    warn!("JWT_SECRET is not set; only the service credential will be accepted");
                    Arc::new(DisabledVerifier)
                }
            };
        let resolver = IdentityResolver::new(&config.security.service_credential, verifier);

        let cache: Arc<dyn CacheInvalidator> = match &config.notify.revalidate_url {
            Some(url) => Arc::new(HttpRevalidator::new(url, config.notify.revalidate_secret.clone())?),
            None => {
                info!("No revalidation endpoint configured; cache invalidation is off");
                Arc::new(NoopInvalidator)
            }
        };
        let activity = config
            .notify
            .activity_log_enabled
            .then(|| Arc::new(StoreActivityLog::new(store.clone())) as Arc<dyn ActivitySink>);

        let synchronizer = Synchronizer::new(store.clone(), config.sync.menu_key_policy, Arc::new(OrderThenName));
        let organizations = OrganizationService::new(
            store.clone(),
            synchronizer,
            Notifier::new(cache, activity),
            config.sync.consent_page_size,
        );

        Ok(Self {
            store,
            resolver,
            organizations,
        })
    }
}

pub fn router(state: AppState, config: &AppConfig) -> Router {
    let protected = Router::new()
        .route(
            "/api/organizations/:id",
            get(organizations::organization_get)
                .put(organizations::organization_put)
                .delete(organizations::organization_delete),
        )
        .route_layer(from_fn_with_state(state.clone(), bearer_auth_middleware));

    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Protected
        .merge(protected)
        // Global middleware
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .layer(cors_layer(&config.security.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
