//! Role hierarchy
//!
//! Roles form a total order for permission checks: admin ⊇ pm ⊇ viewer.
//! There are no resource-level ownership checks; any pm may edit any project.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Pm,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Pm, Role::Viewer];

    /// Whether an actor holding `self` passes a gate requiring `required`
    ///
    /// # Examples
    ///
    /// ```
    /// use ptra_common::Role;
    ///
    /// assert!(Role::Admin.satisfies(Role::Pm));
    /// assert!(Role::Pm.satisfies(Role::Viewer));
    /// assert!(!Role::Viewer.satisfies(Role::Pm));
    /// ```
    pub fn satisfies(self, required: Role) -> bool {
        match (self, required) {
            (Role::Admin, _) => true,
            (actor, required) if actor == required => true,
            (Role::Pm, Role::Viewer) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Pm => "pm",
            Role::Viewer => "viewer",
        }
    }

    /// Human-readable label for page headers
    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Pm => "Project Manager",
            Role::Viewer => "Viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "admin" => Ok(Role::Admin),
            "pm" => Ok(Role::Pm),
            "viewer" => Ok(Role::Viewer),
            other => Err(crate::Error::InvalidInput(format!("Unknown role: {}", other))),
        }
    }
}
