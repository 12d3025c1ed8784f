//! Identity models shared by every service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Platform role carried by every user account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Designer,
    Repair,
    Supplier,
    Media,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Designer => "designer",
            Role::Repair => "repair",
            Role::Supplier => "supplier",
            Role::Media => "media",
            Role::Admin => "admin",
        }
    }

    /// Whether this role carries the moderation/admin capability
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "designer" => Ok(Role::Designer),
            "repair" => Ok(Role::Repair),
            "supplier" => Ok(Role::Supplier),
            "media" => Ok(Role::Media),
            "admin" => Ok(Role::Admin),
            other => Err(Error::InvalidInput(format!("Unknown role: {}", other))),
        }
    }
}

/// Professional group a public profile is listed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileGroup {
    Designer,
    Repair,
    Supplier,
    Media,
}

impl ProfileGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileGroup::Designer => "designer",
            ProfileGroup::Repair => "repair",
            ProfileGroup::Supplier => "supplier",
            ProfileGroup::Media => "media",
        }
    }
}

impl fmt::Display for ProfileGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileGroup {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "designer" => Ok(ProfileGroup::Designer),
            "repair" => Ok(ProfileGroup::Repair),
            "supplier" => Ok(ProfileGroup::Supplier),
            "media" => Ok(ProfileGroup::Media),
            other => Err(Error::InvalidInput(format!("Unknown profile group: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub phone: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: i64,
    pub display_name: String,
    pub group: ProfileGroup,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}
