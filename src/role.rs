//! Household roles.
//!
//! Role checks are enforced in this client only. Nothing on the remote side
//! stops another client from writing the same paths.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    Father,
    Mother,
    /// Accounts without a stored role are treated as children.
    #[default]
    Child,
}

impl Role {
    /// Only the father may arm or disarm the alarm.
    pub fn can_control_alarm(self) -> bool {
        self == Role::Father
    }

    /// The entry history tab is hidden from children.
    pub fn can_view_history(self) -> bool {
        self != Role::Child
    }

    /// Parent accounts must present the family key at registration.
    pub fn requires_family_key(self) -> bool {
        matches!(self, Role::Father | Role::Mother)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_capabilities() {
        assert!(Role::Father.can_control_alarm());
        assert!(!Role::Mother.can_control_alarm());
        assert!(!Role::Child.can_control_alarm());

        assert!(Role::Mother.can_view_history());
        assert!(!Role::Child.can_view_history());

        assert!(Role::Father.requires_family_key());
        assert!(!Role::Child.requires_family_key());
    }

    #[test]
    fn test_parse_and_default() {
        assert_eq!(Role::from_str("father").unwrap(), Role::Father);
        assert_eq!(Role::from_str("MOTHER").unwrap(), Role::Mother);
        assert!(Role::from_str("uncle").is_err());
        assert_eq!(Role::default(), Role::Child);
        assert_eq!(Role::Father.to_string(), "father");
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Role::Mother).unwrap();
        assert_eq!(json, "\"mother\"");
        let role: Role = serde_json::from_str("\"child\"").unwrap();
        assert_eq!(role, Role::Child);
    }
}
