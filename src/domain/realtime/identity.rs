//! Connection identity and the topics it grants.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{TableId, UserId, ValidationError};

use super::Topic;

/// Role of an authenticated staff member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Admin,
    Manager,
    Waiter,
}

impl StaffRole {
    /// Every staff role, in privilege order.
    pub const ALL: [StaffRole; 3] = [StaffRole::Admin, StaffRole::Manager, StaffRole::Waiter];

    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Admin => "admin",
            StaffRole::Manager => "manager",
            StaffRole::Waiter => "waiter",
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StaffRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(StaffRole::Admin),
            "manager" => Ok(StaffRole::Manager),
            "waiter" => Ok(StaffRole::Waiter),
            other => Err(ValidationError::invalid_format(
                "role",
                format!("unknown staff role '{}'", other),
            )),
        }
    }
}

/// Who is on the other end of a connection.
///
/// A connection starts `Unauthenticated` and receives no routed events until
/// an `AUTH` or `JOIN_TABLE` message attaches an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Identity {
    #[default]
    Unauthenticated,
    Staff { user_id: UserId, role: StaffRole },
    Customer { table_id: TableId },
}

impl Identity {
    pub fn staff(user_id: UserId, role: StaffRole) -> Self {
        Identity::Staff { user_id, role }
    }

    pub fn customer(table_id: TableId) -> Self {
        Identity::Customer { table_id }
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Identity::Unauthenticated)
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Identity::Staff { user_id, .. } => Some(*user_id),
            _ => None,
        }
    }

    pub fn table_id(&self) -> Option<TableId> {
        match self {
            Identity::Customer { table_id } => Some(*table_id),
            _ => None,
        }
    }

    /// Topics a connection holding this identity is joined to.
    pub fn topics(&self) -> BTreeSet<Topic> {
        let mut topics = BTreeSet::new();
        match self {
            Identity::Unauthenticated => {}
            Identity::Staff { user_id, role } => {
                topics.insert(Topic::Staff);
                topics.insert(Topic::Role(*role));
                topics.insert(Topic::User(*user_id));
            }
            Identity::Customer { table_id } => {
                topics.insert(Topic::Table(*table_id));
            }
        }
        topics
    }

    /// Short label used in logs and stats.
    pub fn kind(&self) -> &'static str {
        match self {
            Identity::Unauthenticated => "unauthenticated",
            Identity::Staff { .. } => "staff",
            Identity::Customer { .. } => "customer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_role_parses_case_insensitively() {
        assert_eq!("Waiter".parse::<StaffRole>().unwrap(), StaffRole::Waiter);
        assert_eq!(" admin ".parse::<StaffRole>().unwrap(), StaffRole::Admin);
        assert!("chef".parse::<StaffRole>().is_err());
    }

    #[test]
    fn staff_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&StaffRole::Manager).unwrap(), r#""manager""#);
    }

    #[test]
    fn unauthenticated_identity_has_no_topics() {
        assert!(Identity::Unauthenticated.topics().is_empty());
        assert!(!Identity::Unauthenticated.is_authenticated());
    }

    #[test]
    fn staff_identity_joins_staff_role_and_user_topics() {
        let identity = Identity::staff(UserId::new(5).unwrap(), StaffRole::Waiter);
        let topics: Vec<String> = identity.topics().iter().map(|t| t.to_string()).collect();

        assert!(topics.contains(&"role:staff".to_string()));
        assert!(topics.contains(&"role:waiter".to_string()));
        assert!(topics.contains(&"user:5".to_string()));
        assert_eq!(topics.len(), 3);
    }

    #[test]
    fn customer_identity_joins_only_its_table() {
        let identity = Identity::customer(TableId::new(7).unwrap());
        let topics: Vec<String> = identity.topics().iter().map(|t| t.to_string()).collect();

        assert_eq!(topics, vec!["table:7".to_string()]);
        assert_eq!(identity.table_id(), Some(TableId::new(7).unwrap()));
        assert_eq!(identity.user_id(), None);
    }
}
