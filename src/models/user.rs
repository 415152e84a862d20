use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinates;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Seller,
    Wholesaler,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
            Role::Wholesaler => "wholesaler",
        }
    }

    /// Sellers and wholesalers may list products; buyers may not.
    pub fn can_sell(&self) -> bool {
        matches!(self, Role::Seller | Role::Wholesaler)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Role::Buyer),
            "seller" => Ok(Role::Seller),
            "wholesaler" => Ok(Role::Wholesaler),
            other => Err(format!("unknown role {other:?}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: Option<Role>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub location: Option<Coordinates>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn can_sell(&self) -> bool {
        self.role.is_some_and(|r| r.can_sell())
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Option<Role>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub location: Option<Coordinates>,
}

/// Role selection plus whichever location fields were supplied.
#[derive(Debug, Clone)]
pub struct RoleUpdate {
    pub role: Role,
    pub city: Option<String>,
    pub state: Option<String>,
    pub location: Option<Coordinates>,
}

/// Public part of a user joined onto product listings.
#[derive(Debug, Clone, PartialEq)]
pub struct Seller {
    pub id: i64,
    pub username: String,
    pub role: Option<Role>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub location: Option<Coordinates>,
}

impl From<&User> for Seller {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
            city: user.city.clone(),
            state: user.state.clone(),
            location: user.location,
        }
    }
}
