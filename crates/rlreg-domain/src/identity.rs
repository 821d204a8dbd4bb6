//! User / Role / Group / Membership types owned by the Identity Store.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::rights::RightSet;

/// Reserved group name every user implicitly belongs to, with the `guest`
/// role, whether or not they hold an explicit membership row for it.
pub const GLOBAL_GROUP: &str = "global";

/// Built-in role names, provisioned on first boot by the Identity Store.
pub mod builtin_roles {
    pub const ADMIN: &str = "admin";
    pub const CONTENT_ADMIN: &str = "content_admin";
    pub const CONTRIBUTOR: &str = "contributor";
    pub const GUEST: &str = "guest";
}

/// A user's roles within a single group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Membership {
    pub group_name: String,
    pub roles: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(default)]
    pub memberships: Vec<Membership>,
}

impl User {
    /// The name of this user's personal group — always equal to the
    /// username. Collapses "owner" and "publication scope" into the same
    /// mechanism (see the design notes on the personal-group trick).
    pub fn personal_group(&self) -> &str {
        &self.username
    }

    pub fn membership_in(&self, group: &str) -> Option<&Membership> {
        self.memberships.iter().find(|m| m.group_name == group)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub role: String,
    #[serde(default)]
    pub description: String,
    pub rights: RightSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_by: String,
}

/// A group with its resolved member list, returned by `read_group`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupWithMembers {
    #[serde(flatten)]
    pub group: Group,
    pub members: Vec<GroupMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMember {
    pub user: String,
    pub roles: BTreeSet<String>,
}

/// One entry in an `add_members` request: the target user and the final
/// (replacing, not merging) set of role names they should hold in the
/// group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberUpdate {
    pub user: String,
    pub roles: BTreeSet<String>,
}

/// The caller's effective rights, indexed by group, plus the raw
/// memberships they were computed from. Built once per request by the
/// Identity Store and handed to the Rights Evaluator.
#[derive(Debug, Clone)]
pub struct Caller {
    pub username: String,
    pub memberships: Vec<Membership>,
    /// Union of role rights per group the caller belongs to (including
    /// the implicit `global` membership).
    pub rights_by_group: HashMap<String, RightSet>,
}

impl Caller {
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.memberships.iter().map(|m| m.group_name.as_str())
    }

    pub fn rights_in(&self, group: &str) -> RightSet {
        self.rights_by_group
            .get(group)
            .copied()
            .unwrap_or(RightSet::EMPTY)
    }

    pub fn rights_in_personal_group(&self) -> RightSet {
        self.rights_in(&self.username)
    }

    /// `admin` in `global` is an unconditional grant for every right
    /// (rights-evaluation procedure, step 5).
    pub fn is_global_admin(&self) -> bool {
        let global = self.rights_in(GLOBAL_GROUP);
        crate::rights::Right::ALL.iter().all(|r| global.contains(*r))
    }
}
