//! Routing scopes and the topic keys they resolve to.

use std::collections::BTreeSet;
use std::fmt;

use crate::domain::foundation::{TableId, UserId};

use super::{Identity, StaffRole};

/// Key of a topic a connection can be joined to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topic {
    /// Every authenticated staff connection (`role:staff`).
    Staff,
    /// Staff connections holding one role (`role:waiter`).
    Role(StaffRole),
    /// The connections of one staff user (`user:5`).
    User(UserId),
    /// Customer connections seated at one table (`table:7`).
    Table(TableId),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Staff => f.write_str("role:staff"),
            Topic::Role(role) => write!(f, "role:{}", role),
            Topic::User(user_id) => write!(f, "user:{}", user_id),
            Topic::Table(table_id) => write!(f, "table:{}", table_id),
        }
    }
}

/// Routing predicate attached to every event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every staff connection whose role is in the set.
    BroadcastToRoles(BTreeSet<StaffRole>),
    /// Every customer connection seated at the table.
    TargetTable(TableId),
    /// The live connection(s) of one staff user.
    TargetUser(UserId),
}

impl Scope {
    /// Broadcast to every staff role.
    pub fn all_staff() -> Self {
        Scope::BroadcastToRoles(StaffRole::ALL.into_iter().collect())
    }

    pub fn roles(roles: impl IntoIterator<Item = StaffRole>) -> Self {
        Scope::BroadcastToRoles(roles.into_iter().collect())
    }

    pub fn table(table_id: TableId) -> Self {
        Scope::TargetTable(table_id)
    }

    pub fn user(user_id: UserId) -> Self {
        Scope::TargetUser(user_id)
    }

    /// Topics whose members receive events with this scope.
    ///
    /// A role set covering every staff role resolves to [`Topic::Staff`].
    pub fn topics(&self) -> BTreeSet<Topic> {
        match self {
            Scope::BroadcastToRoles(roles) if StaffRole::ALL.iter().all(|r| roles.contains(r)) => {
                BTreeSet::from([Topic::Staff])
            }
            Scope::BroadcastToRoles(roles) => roles.iter().copied().map(Topic::Role).collect(),
            Scope::TargetTable(table_id) => BTreeSet::from([Topic::Table(*table_id)]),
            Scope::TargetUser(user_id) => BTreeSet::from([Topic::User(*user_id)]),
        }
    }

    /// Whether a connection holding `identity` is addressed by this scope.
    pub fn matches(&self, identity: &Identity) -> bool {
        let wanted = self.topics();
        identity.topics().iter().any(|topic| wanted.contains(topic))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = self.topics().iter().map(|t| t.to_string()).collect();
        f.write_str(&keys.join(","))
    }
}
