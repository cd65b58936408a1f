use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role of an authenticated actor.
///
/// The set is closed: adding a role forces every capability and transition
/// table that matches on it to be revisited at compile time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Customer-side user of a client company.
    Client,
    /// Warehouse / logistics staff running preparation, dispatch and returns.
    Fulfillment,
    /// Platform administrator with override authority.
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Client, Role::Fulfillment, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Fulfillment => "fulfillment",
            Role::Admin => "admin",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_role_from_its_name() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn rejects_unknown_role_names() {
        assert_eq!(
            "warehouse".parse::<Role>().unwrap_err(),
            UnknownRole("warehouse".to_string())
        );
    }

    #[test]
    fn serde_uses_snake_case_names() {
        let json = serde_json::to_string(&Role::Fulfillment).unwrap();
        assert_eq!(json, "\"fulfillment\"");
    }
}
