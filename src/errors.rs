use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use miette::Diagnostic;
use serde_json::json;
use thiserror::Error;

use crate::authz::errors::Unauthorized;

#[derive(Debug, Error, Diagnostic)]
pub enum RolegateError {
    #[error("There is no role named `{0}`.")]
    #[diagnostic(
        code(rolegate::role_does_not_exist),
        help("Roles are never created implicitly, create it first with `rolegate create-role`")
    )]
    RoleDoesNotExist(String),

    #[error("There is no role with id `{0}`.")]
    #[diagnostic(code(rolegate::role_does_not_exist))]
    RoleIdDoesNotExist(i32),

    #[error("There is no permission named `{name}` for guard `{guard}`.")]
    #[diagnostic(
        code(rolegate::permission_does_not_exist),
        help("Permissions are never created implicitly, create it first with `rolegate create-permission`")
    )]
    PermissionDoesNotExist { name: String, guard: String },

    #[error("A role `{name}` already exists for guard `{guard}`.")]
    #[diagnostic(code(rolegate::role_already_exists))]
    RoleAlreadyExists { name: String, guard: String },

    #[error("A `{name}` permission already exists for guard `{guard}`.")]
    #[diagnostic(code(rolegate::permission_already_exists))]
    PermissionAlreadyExists { name: String, guard: String },

    #[error("The given role or permission should use guard `{expected}` instead of `{given}`.")]
    #[diagnostic(
        code(rolegate::guard_does_not_match),
        help("Check the `auth.guards` mapping for the subject type")
    )]
    GuardDoesNotMatch { given: String, expected: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Unauthorized(#[from] Unauthorized),

    #[error("Database error: {0}")]
    #[diagnostic(code(rolegate::db))]
    Db(#[from] sea_orm::DbErr),

    #[error("Cache error: {0}")]
    #[diagnostic(code(rolegate::cache))]
    Cache(String),

    #[error("Config error: {0}")]
    #[diagnostic(code(rolegate::config))]
    Config(#[from] config::ConfigError),
}

impl RolegateError {
    pub fn guard_does_not_match(given: &str, expected: &[String]) -> Self {
        RolegateError::GuardDoesNotMatch {
            given: given.to_string(),
            expected: expected.join(", "),
        }
    }

    /// True for role or permission lookup misses.
    pub fn is_does_not_exist(&self) -> bool {
        matches!(
            self,
            RolegateError::RoleDoesNotExist(_)
                | RolegateError::RoleIdDoesNotExist(_)
                | RolegateError::PermissionDoesNotExist { .. }
        )
    }
}

impl IntoResponse for RolegateError {
    fn into_response(self) -> Response {
        let status = match &self {
            RolegateError::Unauthorized(inner) => return inner.clone().into_response(),
            RolegateError::RoleDoesNotExist(_)
            | RolegateError::RoleIdDoesNotExist(_)
            | RolegateError::PermissionDoesNotExist { .. } => StatusCode::NOT_FOUND,
            RolegateError::RoleAlreadyExists { .. }
            | RolegateError::PermissionAlreadyExists { .. } => StatusCode::CONFLICT,
            RolegateError::GuardDoesNotMatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
