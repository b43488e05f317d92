use serde::{Deserialize, Serialize};
use std::str::FromStr;

// Safety limits to prevent resource abuse
pub(crate) const MAX_IN_SET: usize = 1000;
pub(crate) const MAX_SORT_FIELDS: usize = 8;
pub(crate) const MAX_PROJECTION_FIELDS: usize = 64;
pub(crate) const MAX_LIMIT: i64 = 10_000;

/// The command a builder will ultimately dispatch. Declared by the facade
/// constructors or by the terminal call itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Op {
    #[default]
    None,
    Find,
    FindOne,
    Count,
    Distinct,
    Update,
    UpdateMany,
    UpdateOne,
    ReplaceOne,
    Remove,
    DeleteOne,
    DeleteMany,
    FindOneAndUpdate,
    FindOneAndRemove,
}

impl Op {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Find => "find",
            Self::FindOne => "findOne",
            Self::Count => "count",
            Self::Distinct => "distinct",
            Self::Update => "update",
            Self::UpdateMany => "updateMany",
            Self::UpdateOne => "updateOne",
            Self::ReplaceOne => "replaceOne",
            Self::Remove => "remove",
            Self::DeleteOne => "deleteOne",
            Self::DeleteMany => "deleteMany",
            Self::FindOneAndUpdate => "findOneAndUpdate",
            Self::FindOneAndRemove => "findOneAndRemove",
        }
    }

    /// Write commands carry an update document; reads never do.
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(
            self,
            Self::Update
                | Self::UpdateMany
                | Self::UpdateOne
                | Self::ReplaceOne
                | Self::Remove
                | Self::DeleteOne
                | Self::DeleteMany
                | Self::FindOneAndUpdate
                | Self::FindOneAndRemove
        )
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateReport {
    pub matched: u64,
    pub modified: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveReport {
    pub removed: u64,
}

/// Routing hint forwarded to the adapter untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadPreference {
    Primary,
    PrimaryPreferred,
    Secondary,
    SecondaryPreferred,
    Nearest,
}

impl ReadPreference {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::PrimaryPreferred => "primaryPreferred",
            Self::Secondary => "secondary",
            Self::SecondaryPreferred => "secondaryPreferred",
            Self::Nearest => "nearest",
        }
    }
}

impl FromStr for ReadPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" | "p" => Ok(Self::Primary),
            "primaryPreferred" | "pp" => Ok(Self::PrimaryPreferred),
            "secondary" | "s" => Ok(Self::Secondary),
            "secondaryPreferred" | "sp" => Ok(Self::SecondaryPreferred),
            "nearest" | "n" => Ok(Self::Nearest),
            other => Err(format!("unrecognized read preference: {other}")),
        }
    }
}
