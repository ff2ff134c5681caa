//! Role tags and the user snapshot owned by the session
//!
//! The backend sends role names with a `ROLE_` prefix (`ROLE_FREELANCER`).
//! Everything inside the client works with the unprefixed [`RoleTag`].

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Prefix carried by role names on the wire
pub const ROLE_PREFIX: &str = "ROLE_";

/// Normalized role identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoleTag {
    Client,
    Freelancer,
    Admin,
}

impl RoleTag {
    /// Every role, in declaration order
    pub const ALL: [RoleTag; 3] = [RoleTag::Client, RoleTag::Freelancer, RoleTag::Admin];

    /// Unprefixed name, as sent in registration requests
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleTag::Client => "CLIENT",
            RoleTag::Freelancer => "FREELANCER",
            RoleTag::Admin => "ADMIN",
        }
    }

    /// Prefixed name, as the backend reports it
    pub fn wire_name(&self) -> String {
        format!("{}{}", ROLE_PREFIX, self.as_str())
    }

    /// Parse a role name, stripping the `ROLE_` prefix if present
    pub fn normalize(raw: &str) -> Option<Self> {
        let name = raw.trim();
        let name = name.strip_prefix(ROLE_PREFIX).unwrap_or(name);
        match name {
            "CLIENT" => Some(RoleTag::Client),
            "FREELANCER" => Some(RoleTag::Freelancer),
            "ADMIN" => Some(RoleTag::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for RoleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known role
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for RoleTag {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoleTag::normalize(s).ok_or_else(|| UnknownRole(s.to_string()))
    }
}

impl<'de> Deserialize<'de> for RoleTag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// User identifier; the backend may send it as a number or a string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => UserId(n.to_string()),
            RawId::Text(s) => UserId(s),
        })
    }
}

/// User information from the API
///
/// Immutable snapshot; the session replaces it wholesale on every fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(default, deserialize_with = "deserialize_roles")]
    pub roles: BTreeSet<RoleTag>,
}

impl User {
    /// Check whether the user holds a role
    pub fn has_role(&self, role: RoleTag) -> bool {
        self.roles.contains(&role)
    }

    /// Check whether the user holds at least one of `roles`
    pub fn has_any_role(&self, roles: &BTreeSet<RoleTag>) -> bool {
        !self.roles.is_disjoint(roles)
    }
}

/// Unknown role names are dropped rather than failing the whole user payload
fn deserialize_roles<'de, D>(deserializer: D) -> Result<BTreeSet<RoleTag>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .iter()
        .filter_map(|name| {
            let role = RoleTag::normalize(name);
            if role.is_none() {
                tracing::warn!("Ignoring unknown role from backend: {}", name);
            }
            role
        })
        .collect())
}
