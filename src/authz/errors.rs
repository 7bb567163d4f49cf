use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use miette::Diagnostic;
use serde_json::json;
use thiserror::Error;

/// Raised by the request guards. Carries the alternatives that were tried.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum Unauthorized {
    #[error("User is not logged in.")]
    #[diagnostic(code(rolegate::authz::not_logged_in))]
    NotLoggedIn,

    #[error("User does not have the right roles.")]
    #[diagnostic(code(rolegate::authz::forbidden_roles))]
    ForRoles(Vec<String>),

    #[error("User does not have the right permissions.")]
    #[diagnostic(code(rolegate::authz::forbidden_permissions))]
    ForPermissions(Vec<String>),
}

impl IntoResponse for Unauthorized {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let body = match self {
            Unauthorized::NotLoggedIn => json!({ "error": message }),
            Unauthorized::ForRoles(roles) => json!({ "error": message, "roles": roles }),
            Unauthorized::ForPermissions(permissions) => {
                json!({ "error": message, "permissions": permissions })
            }
        };
        (StatusCode::FORBIDDEN, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_status() {
        let resp = Unauthorized::ForRoles(vec!["admin".into()]).into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = Unauthorized::ForPermissions(vec!["publish".into()]).into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_messages() {
        assert_eq!(Unauthorized::NotLoggedIn.to_string(), "User is not logged in.");
        assert_eq!(
            Unauthorized::ForRoles(vec![]).to_string(),
            "User does not have the right roles."
        );
    }
}
