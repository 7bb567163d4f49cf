use crate::authz::types::PermissionArg;
use crate::authz::Authorizer;
use crate::errors::RolegateError;
use crate::subject::Subject;

impl Authorizer {
    /// Before-filter for a host ability check.
    ///
    /// `Some(true)` grants. `None` means no decision: the ability is not a
    /// known permission in the subject's default guard, or the subject does
    /// not hold it. This hook never denies on its own.
    ///
    /// A snapshot hit skips the name lookup. A miss still goes to the store,
    /// since another tenant or process may have created the permission since
    /// this tenant's snapshot was loaded.
    pub async fn before<S: Subject + ?Sized>(
        &self,
        subject: &S,
        ability: &str,
    ) -> Result<Option<bool>, RolegateError> {
        let guard = self.guards.default_guard_for(subject);
        let snapshot = self.permissions().await?;
        let permission = match snapshot.find(ability, &guard) {
            Some(cached) => PermissionArg::Permission(cached.permission.clone()),
            None => {
                tracing::debug!(ability, %guard, "Ability not in snapshot, checking store");
                PermissionArg::Name(ability.to_string())
            }
        };

        match self.has_permission_to(subject, permission, None).await {
            Ok(true) => Ok(Some(true)),
            Ok(false) => Ok(None),
            Err(e) if e.is_does_not_exist() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// [`Authorizer::before`] with deny-by-default.
    pub async fn can<S: Subject + ?Sized>(
        &self,
        subject: &S,
        ability: &str,
    ) -> Result<bool, RolegateError> {
        Ok(self.before(subject, ability).await?.unwrap_or(false))
    }
}
