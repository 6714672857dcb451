//! Domain records handed across the procedure boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier owned by the authentication provider.
///
/// The format is opaque to this crate; it is only compared and displayed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new time-ordered id (UUID v7).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a todo category.
    CategoryId
);
uuid_id!(
    /// Identifier of a scrap book.
    ScrapBookId
);
uuid_id!(
    /// Identifier of a registered feed source.
    FeedSourceId
);

/// A user-owned todo category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub owner: UserId,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A collection of saved scraps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapBook {
    pub id: ScrapBookId,
    pub owner: UserId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub scrap_count: u32,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

impl ScrapBook {
    /// Whether `viewer` may see this book.
    pub fn visible_to(&self, viewer: Option<&UserId>) -> bool {
        self.is_public || viewer == Some(&self.owner)
    }
}

/// A feed endpoint whose items are pulled during refresh.
///
/// `owner == None` places the source in the public collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub id: FeedSourceId,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<UserId>,
}

impl FeedSource {
    pub fn is_public(&self) -> bool {
        self.owner.is_none()
    }
}

/// One entry produced by a feed source.
///
/// Items are opaque to the RPC layer beyond ordering by `published_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: String,
    pub source_id: FeedSourceId,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

/// Which feed collection a read targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeedScope {
    Public,
    User(UserId),
}

impl FeedScope {
    /// Whether `source` belongs to this collection.
    pub fn contains(&self, source: &FeedSource) -> bool {
        match self {
            Self::Public => source.owner.is_none(),
            Self::User(user) => source.owner.as_ref() == Some(user),
        }
    }
}
