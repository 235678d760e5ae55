use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Who an actor is. Persisted users carry a numeric code, the two built-in
/// accounts carry a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Designer,
    Buyer,
    Delivery,
    Admin,
    Owner,
}

impl Role {
    /// Numeric code stored in `users.role`. `None` for the built-in accounts.
    pub fn code(self) -> Option<i32> {
        match self {
            Role::Designer => Some(1),
            Role::Buyer => Some(2),
            Role::Delivery => Some(3),
            Role::Admin | Role::Owner => None,
        }
    }

    pub fn from_code(code: i32) -> Option<Role> {
        match code {
            1 => Some(Role::Designer),
            2 => Some(Role::Buyer),
            3 => Some(Role::Delivery),
            _ => None,
        }
    }

    pub fn is_persisted(self) -> bool {
        self.code().is_some()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Designer => write!(f, "designer"),
            Role::Buyer => write!(f, "buyer"),
            Role::Delivery => write!(f, "delivery"),
            Role::Admin => write!(f, "admin"),
            Role::Owner => write!(f, "owner"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireRole {
    Code(i32),
    Name(String),
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match (self.code(), self) {
            (Some(code), _) => WireRole::Code(code).serialize(serializer),
            (None, role) => WireRole::Name(role.to_string()).serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match WireRole::deserialize(deserializer)? {
            WireRole::Code(code) => Role::from_code(code)
                .ok_or_else(|| serde::de::Error::custom(format!("unknown role code {}", code))),
            WireRole::Name(name) => match name.as_str() {
                "admin" => Ok(Role::Admin),
                "owner" => Ok(Role::Owner),
                other => Err(serde::de::Error::custom(format!("unknown role {}", other))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persisted_roles_use_numeric_codes() {
        assert_eq!(serde_json::to_value(Role::Designer).unwrap(), 1);
        assert_eq!(serde_json::to_value(Role::Buyer).unwrap(), 2);
        assert_eq!(serde_json::to_value(Role::Delivery).unwrap(), 3);
    }

    #[test]
    fn builtin_roles_use_names() {
        assert_eq!(serde_json::to_value(Role::Admin).unwrap(), "admin");
        assert_eq!(serde_json::to_value(Role::Owner).unwrap(), "owner");
        assert!(!Role::Owner.is_persisted());
    }

    #[test]
    fn parses_both_wire_forms() {
        assert_eq!(serde_json::from_str::<Role>("3").unwrap(), Role::Delivery);
        assert_eq!(serde_json::from_str::<Role>("\"owner\"").unwrap(), Role::Owner);
        assert!(serde_json::from_str::<Role>("4").is_err());
        assert!(serde_json::from_str::<Role>("\"buyer\"").is_err());
    }
}
