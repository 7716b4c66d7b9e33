//! Polymorphic owner references.
//!
//! Licenses can belong to different kinds of entities. An [`OwnerRef`]
//! pairs the entity kind with its identifier and is compared exactly on
//! both parts.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Kind of entity that can own a license or act on an approval.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OwnerKind {
    /// An individual user account.
    User,
    /// A team within an organization.
    Team,
    /// A whole organization.
    Organization,
    /// Host-defined kind, stored by name.
    Custom(String),
}

impl OwnerKind {
    /// Stable storage name for the kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "user",
            Self::Team => "team",
            Self::Organization => "organization",
            Self::Custom(name) => name,
        }
    }

    /// Parse a storage name back into a kind.
    ///
    /// Unrecognized names become [`OwnerKind::Custom`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "user" => Self::User,
            "team" => Self::Team,
            "organization" => Self::Organization,
            other => Self::Custom(other.to_owned()),
        }
    }
}

impl Display for OwnerKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OwnerKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OwnerKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Reference to an owner or actor: kind plus identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub struct OwnerRef {
    /// Entity kind.
    pub kind: OwnerKind,
    /// Entity identifier within its kind.
    pub id: String,
}

impl OwnerRef {
    /// Construct a reference.
    #[must_use]
    pub fn new(kind: OwnerKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// Shorthand for a user reference.
    #[must_use]
    pub fn user(id: impl Into<String>) -> Self {
        Self::new(OwnerKind::User, id)
    }

    /// Shorthand for a team reference.
    #[must_use]
    pub fn team(id: impl Into<String>) -> Self {
        Self::new(OwnerKind::Team, id)
    }

    /// Shorthand for an organization reference.
    #[must_use]
    pub fn organization(id: impl Into<String>) -> Self {
        Self::new(OwnerKind::Organization, id)
    }
}

impl Display for OwnerRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
