//! Builds the [`Caller`] the Rights Evaluator consumes from a stored
//! [`User`] plus the current role table.

use std::collections::{BTreeSet, HashMap};

use rlreg_domain::identity::{builtin_roles, Caller, Membership, Role, GLOBAL_GROUP};
use rlreg_domain::rights::RightSet;

pub fn build_caller(user: &rlreg_domain::identity::User, roles: &HashMap<String, Role>) -> Caller {
    let mut rights_by_group: HashMap<String, RightSet> = HashMap::new();

    // Every user is implicitly a member of `global` with the `guest`
    // role, whether or not they hold an explicit membership row for it.
    if let Some(guest) = roles.get(builtin_roles::GUEST) {
        rights_by_group
            .entry(GLOBAL_GROUP.to_string())
            .or_insert(RightSet::EMPTY)
            .union_with(&guest.rights);
    }

    let mut memberships = user.memberships.clone();
    if !memberships.iter().any(|m| m.group_name == GLOBAL_GROUP) {
        memberships.push(Membership { group_name: GLOBAL_GROUP.to_string(), roles: BTreeSet::new() });
    }

    for m in &memberships {
        let entry = rights_by_group.entry(m.group_name.clone()).or_insert(RightSet::EMPTY);
        for role_name in &m.roles {
            if let Some(role) = roles.get(role_name) {
                entry.union_with(&role.rights);
            }
        }
    }

    Caller { username: user.username.clone(), memberships, rights_by_group }
}
