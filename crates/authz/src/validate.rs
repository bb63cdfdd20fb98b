//! Argument shape checks shared by the path tree and the document.
//!
//! These never look at document state. They only answer whether a string is
//! usable as a name, an alias or a path before anything gets mutated.

use std::fmt;

/// Path string addressing a root node itself.
pub const ROOT_PATH: &str = "/";

const PATH_SEPARATOR: char = '/';

// Characters that delimit sections, rules and member lists in an authz file.
const RESERVED_NAME_CHARS: [char; 4] = ['=', '[', ']', ','];

/// Which kind of name failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameKind {
    Repository,
    User,
    UserAlias,
    UserGroup,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameKind::Repository => write!(f, "repository name"),
            NameKind::User => write!(f, "user name"),
            NameKind::UserAlias => write!(f, "user alias"),
            NameKind::UserGroup => write!(f, "user group name"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} may not be blank")]
    Blank { field: &'static str },
    #[error("{field} is not a valid path: {path:?}")]
    InvalidPath { field: &'static str, path: String },
    #[error("invalid {kind}: {name:?}")]
    InvalidName { kind: NameKind, name: String },
}

/// True when the value is absent, empty or whitespace only.
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

pub fn check_not_blank<'a>(
    value: &'a str,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    if is_blank(Some(value)) {
        return Err(ValidationError::Blank { field });
    }
    Ok(value)
}

/// Check that `path` is either `/` or a `/`-separated list of non-empty
/// segments without `=` and without leading or trailing separators.
pub fn check_path<'a>(path: &'a str, field: &'static str) -> Result<&'a str, ValidationError> {
    check_not_blank(path, field)?;
    if path == ROOT_PATH {
        return Ok(path);
    }
    let well_formed = path
        .split(PATH_SEPARATOR)
        .all(|segment| !segment.is_empty() && !segment.contains('='));
    if !well_formed {
        return Err(ValidationError::InvalidPath {
            field,
            path: path.to_string(),
        });
    }
    Ok(path)
}

/// Split a validated path into its segments. `/` yields no segments.
pub fn split_path(path: &str) -> impl Iterator<Item = &str> {
    let rest = if path == ROOT_PATH { "" } else { path };
    rest.split(PATH_SEPARATOR).filter(|s| !s.is_empty())
}

/// Join segments back into the canonical path form.
pub fn join_path<'a, I>(segments: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let joined = segments
        .into_iter()
        .collect::<Vec<_>>()
        .join(&PATH_SEPARATOR.to_string());
    if joined.is_empty() {
        ROOT_PATH.to_string()
    } else {
        joined
    }
}

/// Check that an entity name is usable as an authz identifier.
pub fn check_entity_name(name: &str, kind: NameKind) -> Result<&str, ValidationError> {
    if is_blank(Some(name)) {
        return Err(ValidationError::Blank {
            field: blank_field(kind),
        });
    }
    let padded = name.trim() != name;
    let reserved = name
        .chars()
        .any(|c| c.is_control() || RESERVED_NAME_CHARS.contains(&c));
    if padded || reserved {
        return Err(ValidationError::InvalidName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(name)
}

/// Normalize an optional alias: blank aliases are treated as absent.
pub fn check_alias(alias: Option<&str>) -> Result<Option<&str>, ValidationError> {
    match alias {
        Some(alias) if !is_blank(Some(alias)) => {
            check_entity_name(alias, NameKind::UserAlias).map(Some)
        }
        _ => Ok(None),
    }
}

fn blank_field(kind: NameKind) -> &'static str {
    match kind {
        NameKind::Repository => "Repository name",
        NameKind::User => "User name",
        NameKind::UserAlias => "User alias",
        NameKind::UserGroup => "User group name",
    }
}
