//! Rights Evaluator (C3) — decides allow/deny from memberships + resource
//! publication scopes. Owns no persistent state; it is a pure function
//! over a [`Caller`] (built by the Identity Store) and either a concrete
//! resource or a bare publication scope.

use rlreg_domain::error::{Error, Result};
use rlreg_domain::identity::{Caller, GLOBAL_GROUP};
use rlreg_domain::resource::Publishable;
use rlreg_domain::rights::Right;

/// Step 1 of the decision procedure: no caller at all.
pub fn require_caller(caller: Option<&Caller>) -> Result<&Caller> {
    caller.ok_or_else(|| Error::Unauthorized("no authenticated caller".into()))
}

/// Authorize an action against a concrete resource (steps 2–3, 5 of the
/// decision procedure in the Rights Evaluator's design).
///
/// - The owner path (3a) grants `right` if the caller holds it in their
///   *personal* group — this is what lets `content_admin`/`contributor`
///   creators always manage their own resources while a demoted `guest`
///   creator cannot.
/// - The scope path (3b) grants `right` if any group the resource is
///   published in, that the caller also belongs to, carries `right`.
/// - `admin` in `global` (step 5) is an unconditional grant.
pub fn authorize(caller: Option<&Caller>, right: Right, resource: &impl Publishable) -> Result<()> {
    let caller = require_caller(caller)?;

    if caller.is_global_admin() {
        return Ok(());
    }

    if resource.created_by() == caller.username && caller.rights_in_personal_group().contains(right) {
        return Ok(());
    }

    let owning_scope_grants = resource
        .published_in()
        .iter()
        .any(|group| caller.groups().any(|g| g == group) && caller.rights_in(group).contains(right));

    if owning_scope_grants {
        return Ok(());
    }

    Err(Error::Forbidden(format!(
        "caller '{}' lacks {right:?} on this resource",
        caller.username
    )))
}

/// Authorize a publish/unpublish action into `scope` (step 4): requires
/// the resource kind's CREATE or DELETE right *in that scope*.
pub fn authorize_scope(caller: Option<&Caller>, right: Right, scope: &str) -> Result<()> {
    let caller = require_caller(caller)?;

    if caller.is_global_admin() {
        return Ok(());
    }

    let in_scope = caller.groups().any(|g| g == scope) && caller.rights_in(scope).contains(right);
    if in_scope {
        return Ok(());
    }

    Err(Error::Forbidden(format!(
        "caller '{}' lacks {right:?} in scope '{scope}'",
        caller.username
    )))
}

/// Authorize a non-resource-scoped action (users/roles/groups management):
/// grants if the caller holds `right` anywhere in their `global` rights.
pub fn authorize_global(caller: Option<&Caller>, right: Right) -> Result<()> {
    let caller = require_caller(caller)?;
    if caller.is_global_admin() || caller.rights_in(GLOBAL_GROUP).contains(right) {
        Ok(())
    } else {
        Err(Error::Forbidden(format!(
            "caller '{}' lacks {right:?}",
            caller.username
        )))
    }
}

/// What a `list_*` call is authorized to see: used to push the
/// authorization predicate into the query (Filter Engine) instead of
/// filtering post-hoc, so pagination stays correct.
pub struct ListAuthorization {
    /// Whether the caller's personal-group rights grant `right` — if so,
    /// every resource they created is visible regardless of scope.
    pub owned_visible: bool,
    /// Every group (other than the caller's personal group) where the
    /// caller holds `right` — a resource published in any of these is
    /// visible even if the caller didn't create it.
    pub visible_scopes: Vec<String>,
}

pub fn list_authorization(caller: &Caller, right: Right) -> ListAuthorization {
    if caller.is_global_admin() {
        // Admins see everything; an empty scope list paired with
        // `owned_visible` is interpreted by the caller of this function
        // as "no restriction" via `ListAuthorization::unrestricted`.
        return ListAuthorization { owned_visible: true, visible_scopes: vec![GLOBAL_GROUP.to_string()] };
    }

    let owned_visible = caller.rights_in_personal_group().contains(right);
    let visible_scopes = caller
        .groups()
        .filter(|g| *g != caller.username)
        .filter(|g| caller.rights_in(g).contains(right))
        .map(str::to_owned)
        .collect();

    ListAuthorization { owned_visible, visible_scopes }
}

impl ListAuthorization {
    pub fn is_admin_unrestricted(&self, caller: &Caller) -> bool {
        caller.is_global_admin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlreg_domain::identity::Membership;
    use rlreg_domain::rights::RightSet;
    use std::collections::{BTreeSet, HashMap};

    struct FakeResource {
        created_by: String,
        published_in: BTreeSet<String>,
    }
    impl Publishable for FakeResource {
        fn created_by(&self) -> &str {
            &self.created_by
        }
        fn published_in(&self) -> &BTreeSet<String> {
            &self.published_in
        }
    }

    fn caller(username: &str, groups: &[(&str, RightSet)]) -> Caller {
        let mut rights_by_group = HashMap::new();
        let mut memberships = Vec::new();
        for (g, rights) in groups {
            rights_by_group.insert(g.to_string(), *rights);
            memberships.push(Membership {
                group_name: g.to_string(),
                roles: Default::default(),
            });
        }
        Caller {
            username: username.to_string(),
            memberships,
            rights_by_group,
        }
    }

    #[test]
    fn no_caller_is_unauthorized() {
        let resource = FakeResource { created_by: "alice".into(), published_in: BTreeSet::new() };
        let err = authorize(None, Right::BenchmarkRead, &resource).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[test]
    fn owner_with_personal_rights_can_access_private_resource() {
        let c = caller(
            "alice",
            &[("alice", RightSet::from_rights([Right::BenchmarkRead, Right::BenchmarkDelete]))],
        );
        let resource = FakeResource { created_by: "alice".into(), published_in: BTreeSet::new() };
        assert!(authorize(Some(&c), Right::BenchmarkDelete, &resource).is_ok());
    }

    #[test]
    fn non_owner_without_scope_membership_is_forbidden() {
        let c = caller("bob", &[("bob", RightSet::all())]);
        let resource = FakeResource { created_by: "alice".into(), published_in: BTreeSet::new() };
        let err = authorize(Some(&c), Right::BenchmarkRead, &resource).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn non_owner_with_published_scope_membership_can_read() {
        let mut published_in = BTreeSet::new();
        published_in.insert("team".to_string());
        let resource = FakeResource { created_by: "alice".into(), published_in };

        let c = caller(
            "bob",
            &[("bob", RightSet::EMPTY), ("team", RightSet::from_rights([Right::BenchmarkRead]))],
        );
        assert!(authorize(Some(&c), Right::BenchmarkRead, &resource).is_ok());
    }

    #[test]
    fn global_admin_bypasses_everything() {
        let c = caller("root", &[("global", RightSet::all())]);
        let resource = FakeResource { created_by: "alice".into(), published_in: BTreeSet::new() };
        assert!(authorize(Some(&c), Right::BenchmarkDelete, &resource).is_ok());
    }

    #[test]
    fn publish_requires_create_right_in_target_scope() {
        let c = caller("bob", &[("team", RightSet::from_rights([Right::BenchmarkCreate]))]);
        assert!(authorize_scope(Some(&c), Right::BenchmarkCreate, "team").is_ok());
        assert!(authorize_scope(Some(&c), Right::BenchmarkCreate, "other_team").is_err());
    }

    #[test]
    fn list_authorization_collects_owned_and_scoped_visibility() {
        let mut published_in = BTreeSet::new();
        published_in.insert("team".to_string());
        let _ = published_in; // illustrative only — list auth doesn't take a resource

        let c = caller(
            "bob",
            &[
                ("bob", RightSet::from_rights([Right::BenchmarkRead])),
                ("team", RightSet::from_rights([Right::BenchmarkRead])),
                ("other", RightSet::EMPTY),
            ],
        );
        let auth = list_authorization(&c, Right::BenchmarkRead);
        assert!(auth.owned_visible);
        assert_eq!(auth.visible_scopes, vec!["team".to_string()]);
    }
}
