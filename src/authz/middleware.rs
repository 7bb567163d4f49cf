//! Request guards for host frameworks. Both take the alternatives as a
//! `|` separated string and pass when the subject satisfies any of them.

use crate::authz::errors::Unauthorized;
use crate::authz::types::RoleSpec;
use crate::authz::Authorizer;
use crate::errors::RolegateError;
use crate::subject::Subject;

fn alternatives(param: &str) -> Vec<String> {
    param.split('|').map(str::to_string).collect()
}

/// `None` means no authenticated subject.
pub async fn require_roles<S: Subject + ?Sized>(
    authz: &Authorizer,
    subject: Option<&S>,
    roles: &str,
) -> Result<(), RolegateError> {
    let Some(subject) = subject else {
        return Err(Unauthorized::NotLoggedIn.into());
    };

    let roles = alternatives(roles);
    let spec = RoleSpec::Any(roles.iter().map(RoleSpec::from).collect());
    if !authz.has_any_role(subject, spec).await? {
        tracing::debug!(?roles, "Request denied for roles");
        return Err(Unauthorized::ForRoles(roles).into());
    }
    Ok(())
}

/// Each alternative goes through [`Authorizer::can`], so unknown
/// permission names deny instead of erroring.
pub async fn require_permissions<S: Subject + ?Sized>(
    authz: &Authorizer,
    subject: Option<&S>,
    permissions: &str,
) -> Result<(), RolegateError> {
    let Some(subject) = subject else {
        return Err(Unauthorized::NotLoggedIn.into());
    };

    let permissions = alternatives(permissions);
    for permission in &permissions {
        if authz.can(subject, permission).await? {
            return Ok(());
        }
    }

    tracing::debug!(?permissions, "Request denied for permissions");
    Err(Unauthorized::ForPermissions(permissions).into())
}
