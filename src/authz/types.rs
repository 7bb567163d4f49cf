use crate::storage::{Permission, Role};

/// What a role query asks for: a name (possibly `a|b` piped), a stored
/// role matched by id, or a list of alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleSpec {
    Name(String),
    Role(Role),
    Any(Vec<RoleSpec>),
}

impl RoleSpec {
    /// True when any alternative matches one of `held`.
    pub fn is_satisfied_by(&self, held: &[Role]) -> bool {
        match self {
            RoleSpec::Name(name) if name.contains('|') => match split_pipe(name) {
                PipeSplit::Raw(raw) => holds_name(held, &raw),
                PipeSplit::Names(names) => names.iter().any(|n| holds_name(held, n)),
            },
            RoleSpec::Name(name) => holds_name(held, name),
            RoleSpec::Role(role) => held.iter().any(|h| h.id == role.id),
            RoleSpec::Any(alternatives) => alternatives.iter().any(|s| s.is_satisfied_by(held)),
        }
    }

    /// True when every requested role is held. Lists compare by name; the
    /// held names filtered down to the requested ones must equal the request.
    pub fn is_fully_satisfied_by(&self, held: &[Role]) -> bool {
        match self {
            RoleSpec::Name(name) if name.contains('|') => match split_pipe(name) {
                PipeSplit::Raw(raw) => holds_name(held, &raw),
                PipeSplit::Names(names) => all_held(held, &names),
            },
            RoleSpec::Name(name) => holds_name(held, name),
            RoleSpec::Role(role) => held.iter().any(|h| h.id == role.id),
            RoleSpec::Any(_) => all_held(held, &self.names()),
        }
    }

    /// Requested names in order, entities contributing their own name.
    pub fn names(&self) -> Vec<String> {
        match self {
            RoleSpec::Name(name) => vec![name.clone()],
            RoleSpec::Role(role) => vec![role.name.clone()],
            RoleSpec::Any(list) => list.iter().flat_map(RoleSpec::names).collect(),
        }
    }

    /// Flattens nested lists into their leaves.
    pub fn leaves(self) -> Vec<RoleSpec> {
        match self {
            RoleSpec::Any(list) => list.into_iter().flat_map(RoleSpec::leaves).collect(),
            leaf => vec![leaf],
        }
    }
}

fn holds_name(held: &[Role], name: &str) -> bool {
    held.iter().any(|h| h.name == name)
}

fn all_held(held: &[Role], requested: &[String]) -> bool {
    let kept: Vec<&String> = requested.iter().filter(|n| holds_name(held, n)).collect();
    kept.len() == requested.len()
}

impl From<&str> for RoleSpec {
    fn from(name: &str) -> Self {
        RoleSpec::Name(name.to_string())
    }
}

impl From<String> for RoleSpec {
    fn from(name: String) -> Self {
        RoleSpec::Name(name)
    }
}

impl From<&String> for RoleSpec {
    fn from(name: &String) -> Self {
        RoleSpec::Name(name.clone())
    }
}

impl From<Role> for RoleSpec {
    fn from(role: Role) -> Self {
        RoleSpec::Role(role)
    }
}

impl From<&Role> for RoleSpec {
    fn from(role: &Role) -> Self {
        RoleSpec::Role(role.clone())
    }
}

impl<T: Into<RoleSpec>> From<Vec<T>> for RoleSpec {
    fn from(list: Vec<T>) -> Self {
        RoleSpec::Any(list.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<RoleSpec>, const N: usize> From<[T; N]> for RoleSpec {
    fn from(list: [T; N]) -> Self {
        RoleSpec::Any(list.into_iter().map(Into::into).collect())
    }
}

/// A role to assign or remove. Ids are only taken from [`RoleArg::Id`];
/// numeric looking names stay names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleArg {
    Name(String),
    Id(i32),
    Role(Role),
}

impl From<&str> for RoleArg {
    fn from(name: &str) -> Self {
        RoleArg::Name(name.to_string())
    }
}

impl From<String> for RoleArg {
    fn from(name: String) -> Self {
        RoleArg::Name(name)
    }
}

impl From<i32> for RoleArg {
    fn from(id: i32) -> Self {
        RoleArg::Id(id)
    }
}

impl From<Role> for RoleArg {
    fn from(role: Role) -> Self {
        RoleArg::Role(role)
    }
}

impl From<&Role> for RoleArg {
    fn from(role: &Role) -> Self {
        RoleArg::Role(role.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionArg {
    Name(String),
    Permission(Permission),
}

impl From<&str> for PermissionArg {
    fn from(name: &str) -> Self {
        PermissionArg::Name(name.to_string())
    }
}

impl From<String> for PermissionArg {
    fn from(name: String) -> Self {
        PermissionArg::Name(name)
    }
}

impl From<&String> for PermissionArg {
    fn from(name: &String) -> Self {
        PermissionArg::Name(name.clone())
    }
}

impl From<Permission> for PermissionArg {
    fn from(permission: Permission) -> Self {
        PermissionArg::Permission(permission)
    }
}

impl From<&Permission> for PermissionArg {
    fn from(permission: &Permission) -> Self {
        PermissionArg::Permission(permission.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipeSplit {
    /// Inputs of two bytes or fewer after trimming are not split.
    Raw(String),
    Names(Vec<String>),
}

/// Splits `a|b|c` into names. A matching pair of surrounding `'` or `"`
/// is stripped first. Parts are not trimmed.
pub fn split_pipe(input: &str) -> PipeSplit {
    let trimmed = input.trim();
    if trimmed.len() <= 2 {
        return PipeSplit::Raw(trimmed.to_string());
    }

    let first = trimmed.chars().next();
    let last = trimmed.chars().last();
    let body = match first {
        Some(q @ ('\'' | '"')) if last == Some(q) => &trimmed[1..trimmed.len() - 1],
        _ => trimmed,
    };

    PipeSplit::Names(body.split('|').map(str::to_string).collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// Row is removed; every role and permission link goes with it.
    Hard,
    /// Row is tombstoned; links are kept.
    Soft,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(id: i32, name: &str) -> Role {
        Role {
            id,
            name: name.into(),
            guard_name: "web".into(),
        }
    }

    #[test]
    fn test_split_pipe() {
        assert_eq!(
            split_pipe("edit|delete"),
            PipeSplit::Names(vec!["edit".into(), "delete".into()])
        );
        assert_eq!(
            split_pipe("  edit|delete "),
            PipeSplit::Names(vec!["edit".into(), "delete".into()])
        );
        assert_eq!(
            split_pipe("edit | delete"),
            PipeSplit::Names(vec!["edit ".into(), " delete".into()])
        );
    }

    #[test]
    fn test_split_pipe_short_input_is_not_split() {
        assert_eq!(split_pipe("|"), PipeSplit::Raw("|".into()));
        assert_eq!(split_pipe(" a| "), PipeSplit::Raw("a|".into()));
        assert_eq!(
            split_pipe("a|b"),
            PipeSplit::Names(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn test_split_pipe_strips_matching_quotes() {
        assert_eq!(
            split_pipe("'edit|delete'"),
            PipeSplit::Names(vec!["edit".into(), "delete".into()])
        );
        assert_eq!(
            split_pipe("\"edit|delete\""),
            PipeSplit::Names(vec!["edit".into(), "delete".into()])
        );
        // Only one quote is stripped from each end
        assert_eq!(
            split_pipe("''a|b''"),
            PipeSplit::Names(vec!["'a".into(), "b'".into()])
        );
        // Unbalanced quotes are left alone
        assert_eq!(
            split_pipe("'edit|delete"),
            PipeSplit::Names(vec!["'edit".into(), "delete".into()])
        );
    }

    #[test]
    fn test_piped_name_is_any_of() {
        let held = vec![role(1, "delete")];
        let piped = RoleSpec::from("edit|delete");
        let listed = RoleSpec::from(vec!["edit", "delete"]);
        assert!(piped.is_satisfied_by(&held));
        assert_eq!(piped.is_satisfied_by(&held), listed.is_satisfied_by(&held));
        assert!(!RoleSpec::from("edit|view").is_satisfied_by(&held));
    }

    #[test]
    fn test_role_entity_matches_by_id() {
        let held = vec![role(1, "editor")];
        assert!(RoleSpec::from(role(1, "renamed")).is_satisfied_by(&held));
        assert!(!RoleSpec::from(role(2, "editor")).is_satisfied_by(&held));
    }

    #[test]
    fn test_all_roles() {
        let held = vec![role(1, "editor"), role(2, "writer")];
        assert!(RoleSpec::from(["writer", "editor"]).is_fully_satisfied_by(&held));
        assert!(RoleSpec::from("editor|writer").is_fully_satisfied_by(&held));
        assert!(!RoleSpec::from(["editor", "admin"]).is_fully_satisfied_by(&held));
        assert!(RoleSpec::from(vec![role(9, "editor")]).is_fully_satisfied_by(&held));
        assert!(RoleSpec::Any(vec![]).is_fully_satisfied_by(&held));
    }

    #[test]
    fn test_leaves_flatten_nested_lists() {
        let spec = RoleSpec::Any(vec![
            RoleSpec::from("a"),
            RoleSpec::from(vec!["b", "c"]),
        ]);
        assert_eq!(spec.names(), vec!["a", "b", "c"]);
        assert_eq!(spec.leaves().len(), 3);
    }
}
