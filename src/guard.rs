use crate::settings::{Auth, Guard};
use crate::subject::Subject;

/// Resolves which guards a subject may be authorized under.
#[derive(Debug, Clone)]
pub struct GuardResolver {
    default_guard: String,
    guards: Vec<Guard>,
}

impl GuardResolver {
    pub fn new(default_guard: impl Into<String>, guards: Vec<Guard>) -> Self {
        Self {
            default_guard: default_guard.into(),
            guards,
        }
    }

    pub fn from_settings(auth: &Auth) -> Self {
        Self::new(auth.default_guard.clone(), auth.guards.clone())
    }

    /// Global fallback guard.
    pub fn default_guard(&self) -> &str {
        &self.default_guard
    }

    /// The subject's declared guard as a singleton, otherwise every
    /// configured guard whose model is the subject's type, in
    /// configuration order. May be empty.
    pub fn guard_names_for<S: Subject + ?Sized>(&self, subject: &S) -> Vec<String> {
        if let Some(guard) = subject.guard_name().filter(|g| !g.is_empty()) {
            return vec![guard.to_string()];
        }
        self.guard_names_for_type(subject.subject_type())
    }

    pub fn guard_names_for_type(&self, subject_type: &str) -> Vec<String> {
        self.guards
            .iter()
            .filter(|g| g.model == subject_type)
            .map(|g| g.name.clone())
            .collect()
    }

    pub fn default_guard_for<S: Subject + ?Sized>(&self, subject: &S) -> String {
        self.guard_names_for(subject)
            .into_iter()
            .next()
            .unwrap_or_else(|| self.default_guard.clone())
    }

    /// Subject type configured for `guard`, if any.
    pub fn model_for_guard(&self, guard: &str) -> Option<&str> {
        self.guards
            .iter()
            .find(|g| g.name == guard)
            .map(|g| g.model.as_str())
    }
}
