//! Subjects are whatever the host application authorizes: users, API
//! clients, service accounts. They are not stored here; only their
//! `(subject_type, subject_id)` pair appears in the link tables.

/// Capability implemented by any host type that can hold roles and
/// permissions.
pub trait Subject: Send + Sync {
    /// Stable type discriminator stored in the link tables, e.g. `User`.
    /// Matched against `auth.guards[].model`.
    fn subject_type(&self) -> &str;

    fn subject_id(&self) -> &str;

    /// Guard declared by the subject itself. Takes precedence over the
    /// configured guard mapping when present and non-empty.
    fn guard_name(&self) -> Option<&str> {
        None
    }
}

/// Plain subject handle for callers that do not want to implement
/// [`Subject`] on their own types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubjectRef {
    pub subject_type: String,
    pub subject_id: String,
    pub guard_name: Option<String>,
}

impl SubjectRef {
    pub fn new(subject_type: impl Into<String>, subject_id: impl Into<String>) -> Self {
        Self {
            subject_type: subject_type.into(),
            subject_id: subject_id.into(),
            guard_name: None,
        }
    }

    pub fn with_guard(mut self, guard_name: impl Into<String>) -> Self {
        self.guard_name = Some(guard_name.into());
        self
    }
}

impl Subject for SubjectRef {
    fn subject_type(&self) -> &str {
        &self.subject_type
    }

    fn subject_id(&self) -> &str {
        &self.subject_id
    }

    fn guard_name(&self) -> Option<&str> {
        self.guard_name.as_deref()
    }
}

impl std::fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.subject_type, self.subject_id)
    }
}
