/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskdeck_api::{app::AppState, config::Config};
/// use taskdeck_shared::store::memory::MemoryStore;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), config);
/// let app = taskdeck_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use taskdeck_shared::{auth::middleware::resolve_principal, store::Store};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Both fields are reference counted, so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Persistence, PostgreSQL in production
    pub store: Arc<dyn Store>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health                      # Health check (public)
/// └── /api/
///     ├── POST /register               # Tenant + admin signup (public)
///     ├── POST /auth/login             # (public)
///     ├── POST /auth/refresh           # (public)
///     ├── /projects                    # GET, POST
///     ├── /projects/:id                # GET, PUT, DELETE
///     ├── /tasks                       # GET (filters, sort), POST
///     ├── /tasks/:id                   # GET, PUT (partial), DELETE
///     ├── GET    /users                # ADMIN
///     ├── POST   /users/invite         # ADMIN
///     ├── GET    /users/me             # own profile
///     ├── PUT    /users/me
///     ├── PUT    /users/me/password
///     ├── PUT    /users/:id/role       # ADMIN
///     └── DELETE /users/:id            # ADMIN
/// ```
///
/// Everything under `/api` except the three public routes passes through
/// [`session_layer`], which rejects unauthenticated requests with 401 before
/// any handler runs.
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Session (protected routes only)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh));

    let protected_routes = Router::new()
        .route(
            "/projects",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/projects/:id",
            get(routes::projects::get_project)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/users", get(routes::users::list_users))
        .route("/users/invite", post(routes::users::invite_user))
        .route(
            "/users/me",
            get(routes::profile::get_profile).put(routes::profile::update_profile),
        )
        .route("/users/me/password", put(routes::profile::change_password))
        .route("/users/:id/role", put(routes::users::change_role))
        .route("/users/:id", axum::routing::delete(routes::users::delete_user))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_layer,
        ));

    let api_routes = Router::new().merge(public_routes).merge(protected_routes);

    // Configure CORS based on environment
    let cors = if state.config.allows_any_origin() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Session middleware layer
///
/// Resolves the bearer token to a [`Principal`](taskdeck_shared::auth::middleware::Principal)
/// (reloading the user so the role is current) and injects it into request
/// extensions for the `Extension<Principal>` extractor.
async fn session_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let principal =
        resolve_principal(state.store.as_ref(), state.jwt_secret(), authorization).await?;

    tracing::debug!(
        user_id = %principal.user_id(),
        tenant_id = %principal.tenant_id(),
        role = principal.role().as_str(),
        "Session resolved"
    );
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}
