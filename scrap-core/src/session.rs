//! Caller identity as resolved from request credentials.

use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// Role attached to an authenticated identity.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    #[default]
    Member,
    Admin,
}

impl Role {
    /// Whether this role grants everything `required` grants.
    pub fn satisfies(self, required: Role) -> bool {
        self >= required
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub display_name: String,
    #[serde(default)]
    pub role: Role,
}

/// Session state for one invocation.
///
/// Absence of identity is a first-class variant rather than a missing field;
/// procedures decide whether they accept it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Anonymous,
    Authenticated(Identity),
}

impl Session {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(identity) => Some(identity),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

impl From<Option<Identity>> for Session {
    fn from(value: Option<Identity>) -> Self {
        value.map_or(Self::Anonymous, Self::Authenticated)
    }
}
