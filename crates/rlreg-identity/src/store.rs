//! Identity Store (C1) — persists users, roles, groups, memberships.
//!
//! Each collection is a `RwLock<HashMap<...>>` flushed to its own JSON
//! file under the configured state directory, the same load-on-open /
//! flush-on-write shape as the teacher's `SessionStore`.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::info;

use rlreg_domain::error::{Error, Result};
use rlreg_domain::identity::{
    builtin_roles, Caller, Group, GroupMember, GroupWithMembers, MemberUpdate, Membership, Role,
    User, GLOBAL_GROUP,
};
use rlreg_domain::rights::{Right, RightSet};

use crate::caller::build_caller;
use crate::password::PasswordHasherService;

pub struct IdentityStore {
    users_path: PathBuf,
    roles_path: PathBuf,
    groups_path: PathBuf,
    users: RwLock<HashMap<String, User>>,
    roles: RwLock<HashMap<String, Role>>,
    groups: RwLock<HashMap<String, Group>>,
    hasher: PasswordHasherService,
}

fn load_or_default<T: serde::de::DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if path.exists() {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw).unwrap_or_default())
    } else {
        Ok(T::default())
    }
}

fn flush<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| Error::Storage(format!("serializing {}: {e}", path.display())))?;
    std::fs::write(path, json)?;
    Ok(())
}

impl IdentityStore {
    pub fn new(dir: &Path, argon2_mem_cost_kib: u32) -> Result<Self> {
        std::fs::create_dir_all(dir)?;

        let users_path = dir.join("users.json");
        let roles_path = dir.join("roles.json");
        let groups_path = dir.join("groups.json");

        let users: HashMap<String, User> = load_or_default(&users_path)?;
        let roles: HashMap<String, Role> = load_or_default(&roles_path)?;
        let groups: HashMap<String, Group> = load_or_default(&groups_path)?;

        info!(
            users = users.len(),
            roles = roles.len(),
            groups = groups.len(),
            "identity store loaded"
        );

        let store = Self {
            users_path,
            roles_path,
            groups_path,
            users: RwLock::new(users),
            roles: RwLock::new(roles),
            groups: RwLock::new(groups),
            hasher: PasswordHasherService::new(argon2_mem_cost_kib),
        };
        store.ensure_builtin_roles()?;
        store.ensure_global_group()?;
        Ok(store)
    }

    fn flush_users(&self) -> Result<()> {
        flush(&self.users_path, &*self.users.read())
    }
    fn flush_roles(&self) -> Result<()> {
        flush(&self.roles_path, &*self.roles.read())
    }
    fn flush_groups(&self) -> Result<()> {
        flush(&self.groups_path, &*self.groups.read())
    }

    /// Provision the built-in roles on first boot (idempotent — re-running
    /// on an already-provisioned store is a no-op).
    fn ensure_builtin_roles(&self) -> Result<()> {
        use Right::*;
        let defaults: [(&str, &[Right]); 4] = [
            (builtin_roles::ADMIN, Right::ALL),
            (
                builtin_roles::CONTENT_ADMIN,
                &[
                    ArtifactRead, ArtifactCreate, ArtifactDelete,
                    BenchmarkRead, BenchmarkCreate, BenchmarkDelete,
                    EpisodeRead, EpisodeCreate, EpisodeDelete,
                ],
            ),
            (
                builtin_roles::CONTRIBUTOR,
                &[ArtifactRead, ArtifactCreate, BenchmarkRead, BenchmarkCreate, EpisodeRead, EpisodeCreate],
            ),
            (
                builtin_roles::GUEST,
                &[ArtifactRead, BenchmarkRead, EpisodeRead],
            ),
        ];

        let mut roles = self.roles.write();
        let mut changed = false;
        for (name, rights) in defaults {
            if !roles.contains_key(name) {
                roles.insert(
                    name.to_string(),
                    Role {
                        role: name.to_string(),
                        description: format!("built-in role: {name}"),
                        rights: RightSet::from_rights(rights.iter().copied()),
                    },
                );
                changed = true;
            }
        }
        drop(roles);
        if changed {
            self.flush_roles()?;
        }
        Ok(())
    }

    fn ensure_global_group(&self) -> Result<()> {
        let mut groups = self.groups.write();
        if !groups.contains_key(GLOBAL_GROUP) {
            groups.insert(
                GLOBAL_GROUP.to_string(),
                Group {
                    name: GLOBAL_GROUP.to_string(),
                    description: "implicit scope every user belongs to".into(),
                    created_by: "system".into(),
                },
            );
            drop(groups);
            self.flush_groups()?;
        }
        Ok(())
    }

    // ── Users ────────────────────────────────────────────────────────

    pub fn create_user(&self, username: &str, password: &str) -> Result<User> {
        if self.users.read().contains_key(username) {
            return Err(Error::Conflict(format!("user '{username}' already exists")));
        }
        let password_hash = self.hasher.hash(password)?;

        let user = User {
            username: username.to_string(),
            password_hash,
            memberships: vec![
                Membership {
                    group_name: username.to_string(),
                    roles: BTreeSet::from([builtin_roles::ADMIN.to_string()]),
                },
                Membership {
                    group_name: GLOBAL_GROUP.to_string(),
                    roles: BTreeSet::from([builtin_roles::GUEST.to_string()]),
                },
            ],
        };

        self.users.write().insert(username.to_string(), user.clone());
        self.groups.write().entry(username.to_string()).or_insert(Group {
            name: username.to_string(),
            description: format!("personal group for {username}"),
            created_by: username.to_string(),
        });
        self.flush_users()?;
        self.flush_groups()?;
        Ok(user)
    }

    /// Grant a user `global`-scope admin rights, bypassing the guest
    /// default. Used once at bootstrap to provision the initial admin.
    pub fn grant_global_admin(&self, username: &str) -> Result<()> {
        let mut users = self.users.write();
        let user = users
            .get_mut(username)
            .ok_or_else(|| Error::NotFound(format!("user '{username}' not found")))?;
        match user.memberships.iter_mut().find(|m| m.group_name == GLOBAL_GROUP) {
            Some(m) => {
                m.roles = BTreeSet::from([builtin_roles::ADMIN.to_string()]);
            }
            None => user.memberships.push(Membership {
                group_name: GLOBAL_GROUP.to_string(),
                roles: BTreeSet::from([builtin_roles::ADMIN.to_string()]),
            }),
        }
        drop(users);
        self.flush_users()
    }

    pub fn delete_user(&self, username: &str) -> Result<()> {
        let mut users = self.users.write();
        users.remove(username);
        drop(users);
        let mut groups = self.groups.write();
        groups.remove(username);
        drop(groups);
        self.flush_users()?;
        self.flush_groups()?;
        Ok(())
    }

    pub fn list_users(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.read().values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users
    }

    pub fn change_password(&self, username: &str, new_password: &str) -> Result<()> {
        let hash = self.hasher.hash(new_password)?;
        let mut users = self.users.write();
        let user = users
            .get_mut(username)
            .ok_or_else(|| Error::NotFound(format!("user '{username}' not found")))?;
        user.password_hash = hash;
        drop(users);
        self.flush_users()
    }

    pub fn get_user(&self, username: &str) -> Result<User> {
        self.users
            .read()
            .get(username)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("user '{username}' not found")))
    }

    /// Verify a username/password pair, constant-time via argon2's
    /// verifier. Returns the user on success.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        let user = self
            .users
            .read()
            .get(username)
            .cloned()
            .ok_or_else(|| Error::Unauthorized("invalid username or password".into()))?;
        if self.hasher.verify(password, &user.password_hash) {
            Ok(user)
        } else {
            Err(Error::Unauthorized("invalid username or password".into()))
        }
    }

    /// Replace a user's `global`-scope roles wholesale (the
    /// `change-roles` endpoint, supplemented from the original source).
    pub fn set_global_roles(&self, username: &str, roles: BTreeSet<String>) -> Result<User> {
        for role in &roles {
            if !self.roles.read().contains_key(role) {
                return Err(Error::NotFound(format!("role '{role}' not found")));
            }
        }
        let mut users = self.users.write();
        let user = users
            .get_mut(username)
            .ok_or_else(|| Error::NotFound(format!("user '{username}' not found")))?;
        match user.memberships.iter_mut().find(|m| m.group_name == GLOBAL_GROUP) {
            Some(m) => m.roles = roles,
            None => user.memberships.push(Membership { group_name: GLOBAL_GROUP.to_string(), roles }),
        }
        let updated = user.clone();
        drop(users);
        self.flush_users()?;
        Ok(updated)
    }

    // ── Roles ────────────────────────────────────────────────────────

    pub fn create_role(&self, role: Role) -> Result<Role> {
        let mut roles = self.roles.write();
        if roles.contains_key(&role.role) {
            return Err(Error::Conflict(format!("role '{}' already exists", role.role)));
        }
        roles.insert(role.role.clone(), role.clone());
        drop(roles);
        self.flush_roles()?;
        Ok(role)
    }

    /// Idempotent; strips the role from every user's membership role
    /// sets before removing it, so a deleted role stops granting rights
    /// immediately rather than lingering in stale membership data.
    pub fn delete_role(&self, name: &str) -> Result<()> {
        let mut roles = self.roles.write();
        let existed = roles.remove(name).is_some();
        drop(roles);
        if !existed {
            return Ok(());
        }

        let mut users = self.users.write();
        for user in users.values_mut() {
            for membership in &mut user.memberships {
                membership.roles.remove(name);
            }
        }
        drop(users);

        self.flush_roles()?;
        self.flush_users()?;
        Ok(())
    }

    pub fn list_roles(&self) -> Vec<Role> {
        let mut roles: Vec<Role> = self.roles.read().values().cloned().collect();
        roles.sort_by(|a, b| a.role.cmp(&b.role));
        roles
    }

    pub fn get_role(&self, name: &str) -> Option<Role> {
        self.roles.read().get(name).cloned()
    }

    // ── Groups ───────────────────────────────────────────────────────

    pub fn create_group(&self, group: Group, creator: &str) -> Result<Group> {
        if group.name == GLOBAL_GROUP {
            return Err(Error::Conflict("'global' is a reserved group name".into()));
        }
        let mut groups = self.groups.write();
        if groups.contains_key(&group.name) {
            return Err(Error::Conflict(format!("group '{}' already exists", group.name)));
        }
        groups.insert(group.name.clone(), group.clone());
        drop(groups);

        let mut users = self.users.write();
        let user = users
            .get_mut(creator)
            .ok_or_else(|| Error::NotFound(format!("user '{creator}' not found")))?;
        user.memberships.push(Membership {
            group_name: group.name.clone(),
            roles: BTreeSet::from([builtin_roles::ADMIN.to_string()]),
        });
        drop(users);

        self.flush_groups()?;
        self.flush_users()?;
        Ok(group)
    }

    /// Idempotent; removes the group from every user's memberships.
    /// Callers (the gateway) are responsible for also unpublishing
    /// resources from this scope via the Resource Store, since
    /// publication data is owned there, not here.
    pub fn delete_group(&self, name: &str) -> Result<()> {
        if name == GLOBAL_GROUP {
            return Err(Error::Forbidden("'global' cannot be deleted".into()));
        }
        let mut groups = self.groups.write();
        let existed = groups.remove(name).is_some();
        drop(groups);
        if !existed {
            return Ok(());
        }

        let mut users = self.users.write();
        for user in users.values_mut() {
            user.memberships.retain(|m| m.group_name != name);
        }
        drop(users);

        self.flush_groups()?;
        self.flush_users()?;
        Ok(())
    }

    pub fn list_groups_visible_to(&self, username: &str) -> Result<Vec<Group>> {
        let user = self.get_user(username)?;
        let groups = self.groups.read();
        let mut visible: Vec<Group> = user
            .memberships
            .iter()
            .filter_map(|m| groups.get(&m.group_name).cloned())
            .collect();
        if !visible.iter().any(|g| g.name == GLOBAL_GROUP) {
            if let Some(global) = groups.get(GLOBAL_GROUP) {
                visible.push(global.clone());
            }
        }
        visible.sort_by(|a, b| a.name.cmp(&b.name));
        visible.dedup_by(|a, b| a.name == b.name);
        Ok(visible)
    }

    pub fn read_group(&self, name: &str) -> Result<GroupWithMembers> {
        let group = self
            .groups
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("group '{name}' not found")))?;

        let members: Vec<GroupMember> = self
            .users
            .read()
            .values()
            .filter_map(|u| {
                u.membership_in(name).map(|m| GroupMember { user: u.username.clone(), roles: m.roles.clone() })
            })
            .collect();

        Ok(GroupWithMembers { group, members })
    }

    /// Replaces (not merges) each target user's roles for `group`. An
    /// entry with an empty role set is a no-op. Any missing user or role
    /// yields `not_found`.
    pub fn add_members(&self, group: &str, updates: &[MemberUpdate]) -> Result<()> {
        if !self.groups.read().contains_key(group) {
            return Err(Error::NotFound(format!("group '{group}' not found")));
        }

        for update in updates {
            if update.roles.is_empty() {
                continue;
            }
            if !self.users.read().contains_key(&update.user) {
                return Err(Error::NotFound(format!("user '{}' not found", update.user)));
            }
            for role in &update.roles {
                if !self.roles.read().contains_key(role) {
                    return Err(Error::NotFound(format!("role '{role}' not found")));
                }
            }
        }

        let mut users = self.users.write();
        for update in updates {
            if update.roles.is_empty() {
                continue;
            }
            let user = users.get_mut(&update.user).expect("validated above");
            match user.memberships.iter_mut().find(|m| m.group_name == group) {
                Some(m) => m.roles = update.roles.clone(),
                None => user.memberships.push(Membership {
                    group_name: group.to_string(),
                    roles: update.roles.clone(),
                }),
            }
        }
        drop(users);
        self.flush_users()
    }

    /// Tolerant: a missing user or missing membership is a success.
    pub fn remove_members(&self, group: &str, usernames: &[String]) -> Result<()> {
        let mut users = self.users.write();
        for username in usernames {
            if let Some(user) = users.get_mut(username) {
                user.memberships.retain(|m| m.group_name != group);
            }
        }
        drop(users);
        self.flush_users()
    }

    // ── Caller construction ──────────────────────────────────────────

    pub fn build_caller(&self, username: &str) -> Result<Caller> {
        let user = self.get_user(username)?;
        Ok(build_caller(&user, &self.roles.read()))
    }
}
