//! # Server Configuration
//!
//! Router assembly and server startup for the bug triage API. Public
//! routes (service info, feedback intake, login) sit outside the
//! bearer-token middleware; everything else under `/api` requires an
//! authenticated, active user.

use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::auth_middleware;
use crate::collaborators::Collaborators;
use crate::config::AppConfig;
use crate::handlers;
use crate::telemetry::{self, TraceContext};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub collaborators: Collaborators,
}

/// Every request runs inside a fresh trace context so log lines and
/// error payloads carry a correlation ID.
async fn trace_context_middleware(request: Request, next: Next) -> Response {
    telemetry::with_trace_context(TraceContext::generate(), next.run(request)).await
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/auth/me", get(handlers::auth::me))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route(
            "/api/tenants",
            get(handlers::tenants::list_tenants).post(handlers::tenants::create_tenant),
        )
        .route(
            "/api/tenants/{id}",
            get(handlers::tenants::get_tenant)
                .put(handlers::tenants::update_tenant)
                .delete(handlers::tenants::delete_tenant),
        )
        .route(
            "/api/tenants/{id}/regenerate-key",
            post(handlers::tenants::regenerate_key),
        )
        .route(
            "/api/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/api/users/{id}",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        .route(
            "/api/integrations",
            get(handlers::integrations::list_integrations)
                .post(handlers::integrations::create_integration),
        )
        .route(
            "/api/integrations/{id}",
            put(handlers::integrations::update_integration)
                .delete(handlers::integrations::delete_integration),
        )
        .route(
            "/api/integrations/{id}/test",
            post(handlers::integrations::test_integration),
        )
        .route("/api/reports", get(handlers::reports::list_reports))
        .route("/api/reports/stats", get(handlers::reports::report_stats))
        .route(
            "/api/reports/{id}",
            get(handlers::reports::get_report)
                .put(handlers::reports::update_report_details)
                .delete(handlers::reports::delete_report),
        )
        .route(
            "/api/reports/{id}/status",
            put(handlers::reports::update_report_status),
        )
        .route(
            "/api/reports/{id}/video",
            get(handlers::reports::get_report_video),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/", get(handlers::root))
        // Feedback submissions carry a screen recording, so the default
        // body limit is far too small for this route.
        .route(
            "/feedback",
            post(handlers::ingest::ingest_feedback)
                .layer(DefaultBodyLimit::max(state.config.max_upload_bytes)),
        )
        .route("/api/auth/login", post(handlers::auth::login))
        .merge(protected)
        .layer(middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let collaborators = Collaborators::from_config(&config);
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;
    let profile = config.profile.clone();

    let state = AppState {
        config: Arc::new(config),
        db,
        collaborators,
    };
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %profile, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Registers the bearer token scheme the `/api` routes require
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    paths(
        crate::handlers::root,
        crate::handlers::ingest::ingest_feedback,
        crate::handlers::auth::login,
        crate::handlers::auth::me,
        crate::handlers::auth::logout,
        crate::handlers::tenants::list_tenants,
        crate::handlers::tenants::create_tenant,
        crate::handlers::tenants::get_tenant,
        crate::handlers::tenants::update_tenant,
        crate::handlers::tenants::delete_tenant,
        crate::handlers::tenants::regenerate_key,
        crate::handlers::users::list_users,
        crate::handlers::users::create_user,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
        crate::handlers::integrations::list_integrations,
        crate::handlers::integrations::create_integration,
        crate::handlers::integrations::update_integration,
        crate::handlers::integrations::delete_integration,
        crate::handlers::integrations::test_integration,
        crate::handlers::reports::list_reports,
        crate::handlers::reports::report_stats,
        crate::handlers::reports::get_report,
        crate::handlers::reports::update_report_status,
        crate::handlers::reports::update_report_details,
        crate::handlers::reports::delete_report,
        crate::handlers::reports::get_report_video,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::user::Role,
            crate::models::integration::IntegrationType,
            crate::models::bug_report::ReportStatus,
            crate::error::ApiError,
            crate::handlers::ingest::IngestResponse,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::LoginResponse,
            crate::handlers::tenants::TenantDto,
            crate::handlers::tenants::CreateTenantRequest,
            crate::handlers::tenants::UpdateTenantRequest,
            crate::handlers::users::UserDto,
            crate::handlers::users::CreateUserRequest,
            crate::handlers::users::UpdateUserRequest,
            crate::handlers::integrations::IntegrationDto,
            crate::handlers::integrations::CreateIntegrationRequest,
            crate::handlers::integrations::UpdateIntegrationRequest,
            crate::handlers::reports::ReportDto,
            crate::handlers::reports::ReportPageDto,
            crate::handlers::reports::UpdateStatusRequest,
            crate::handlers::reports::UpdateDetailsRequest,
            crate::repositories::DashboardStats,
        )
    ),
    info(
        title = "Bugtriage API",
        description = "Multi-tenant bug report intake and triage",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
