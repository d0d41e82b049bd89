use aigate_core::{is_privileged, AppError, Caller};
use axum::{
    extract::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};

use crate::error::HttpAppError;

/// Knowledge provider and tool management endpoints, admitted only for admins.
///
/// Paths use axum's `{param}` capture syntax.
pub const KNOWLEDGE_ADMIN_ROUTES: &[(&str, &str)] = &[
    ("GET", "/api/n9e/knowledge-providers"),
    ("POST", "/api/n9e/knowledge-providers"),
    ("PUT", "/api/n9e/knowledge-providers/{id}"),
    ("DELETE", "/api/n9e/knowledge-providers/{id}"),
    ("GET", "/api/n9e/knowledge-tools"),
    ("POST", "/api/n9e/knowledge-tools"),
    ("PUT", "/api/n9e/knowledge-tools/{id}"),
    ("DELETE", "/api/n9e/knowledge-tools/{id}"),
    ("POST", "/api/n9e/knowledge-reload"),
];

/// Role gate middleware
/// Lets the request through only when the `Caller` extension holds the admin role;
/// otherwise answers 403 with a `PERMISSION_DENIED` body.
pub async fn role_gate_middleware(request: Request, next: Next) -> Response {
    let caller = request.extensions().get::<Caller>();

    if is_privileged(caller) {
        return next.run(request).await;
    }

    tracing::warn!(
        user_id = ?caller.map(|c| c.user_id),
        method = %request.method(),
        path = %request.uri().path(),
        "Role gate refused caller"
    );

    HttpAppError(AppError::PermissionDenied(
        "Admin role required for knowledge management".to_string(),
    ))
    .into_response()
}

/// Apply the role gate to every route in `router`.
///
/// Uses `route_layer` so unmatched paths still produce 404 rather than 403.
pub fn gate_knowledge_routes<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn(role_gate_middleware))
}
