//! Pushes a `ListAuthorization` down into the Filter Engine so list
//! queries never filter visibility after the fact.

use rlreg_domain::filter::Filter;
use rlreg_domain::identity::Caller;
use rlreg_rights::ListAuthorization;

/// Combine the caller's visibility (`auth`) with an optional
/// caller-supplied predicate into a single filter to evaluate against
/// every document in a collection. An empty/absent caller-supplied
/// filter means "no predicate, still apply authorization".
pub fn authorized_filter(caller: &Caller, auth: ListAuthorization, user_filter: Option<Filter>) -> Filter {
    if auth.is_admin_unrestricted(caller) {
        return user_filter.unwrap_or_else(|| Filter::and(vec![]));
    }

    let mut visibility = Vec::new();
    if auth.owned_visible {
        visibility.push(Filter::eq("created_by", caller.username.clone()));
    }
    for scope in auth.visible_scopes {
        visibility.push(Filter::eq("published_in", scope));
    }
    let visibility = Filter::or(visibility);

    match user_filter {
        Some(f) => Filter::and(vec![visibility, f]),
        None => visibility,
    }
}
