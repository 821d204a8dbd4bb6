//! Filter Engine (C4) — translates the [`Filter`] tree to a backend's
//! native query form, and interprets it directly over loaded documents.
//!
//! The server's "document database" in this workspace is an in-process
//! JSON document store (see `rlreg-store`), so [`evaluate`] doubles as
//! that store's actual execution engine; [`to_native`] exists for the
//! reference translation spelled out in the filter engine's design (and
//! is what the filesystem client backend would hand a real document
//! database, if one were ever swapped in behind the same trait).

use rlreg_domain::filter::Filter;
use serde_json::Value;

/// Walk a dotted path (`metadata.agent`) into a JSON document.
fn dig<'a>(doc: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(doc, |cur, part| cur.get(part))
}

fn cmp(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Array fields match Mongo's implicit "array contains" semantics for
/// `EQ`/`NE`: `{field: value}` matches when `field` is an array
/// containing `value` as an element, not when the whole array equals
/// `value`. This is what lets the Rights Evaluator express "published_in
/// contains this group" as a plain `EQ`.
fn eq_matches(doc_value: &Value, target: &Value) -> bool {
    match doc_value {
        Value::Array(items) => items.iter().any(|v| v == target),
        other => other == target,
    }
}

/// Evaluate a filter tree against a single loaded document.
pub fn evaluate(filter: &Filter, doc: &Value) -> bool {
    match filter {
        Filter::Eq { key, value } => dig(doc, key).is_some_and(|v| eq_matches(v, value)),
        Filter::Ne { key, value } => !dig(doc, key).is_some_and(|v| eq_matches(v, value)),
        Filter::Geq { key, value } => dig(doc, key)
            .and_then(|v| cmp(v, value))
            .is_some_and(|o| o != std::cmp::Ordering::Less),
        Filter::Leq { key, value } => dig(doc, key)
            .and_then(|v| cmp(v, value))
            .is_some_and(|o| o != std::cmp::Ordering::Greater),
        Filter::Gt { key, value } => dig(doc, key)
            .and_then(|v| cmp(v, value))
            .is_some_and(|o| o == std::cmp::Ordering::Greater),
        Filter::Lt { key, value } => dig(doc, key)
            .and_then(|v| cmp(v, value))
            .is_some_and(|o| o == std::cmp::Ordering::Less),
        Filter::In { key, values } => {
            dig(doc, key).is_some_and(|v| values.iter().any(|candidate| eq_matches(v, candidate)))
        }
        Filter::And { filters } => filters.iter().all(|f| evaluate(f, doc)),
        Filter::Or { filters } => filters.iter().any(|f| evaluate(f, doc)),
    }
}

/// Translate a filter tree to its native document-query form, per the
/// filter engine's reference translation table.
pub fn to_native(filter: &Filter) -> Value {
    match filter {
        Filter::Eq { key, value } => serde_json::json!({ key: value }),
        Filter::Ne { key, value } => serde_json::json!({ key: { "$ne": value } }),
        Filter::Geq { key, value } => serde_json::json!({ key: { "$gte": value } }),
        Filter::Leq { key, value } => serde_json::json!({ key: { "$lte": value } }),
        Filter::Gt { key, value } => serde_json::json!({ key: { "$gt": value } }),
        Filter::Lt { key, value } => serde_json::json!({ key: { "$lt": value } }),
        Filter::In { key, values } => serde_json::json!({ key: { "$in": values } }),
        Filter::And { filters } => {
            serde_json::json!({ "$and": filters.iter().map(to_native).collect::<Vec<_>>() })
        }
        Filter::Or { filters } => {
            serde_json::json!({ "$or": filters.iter().map(to_native).collect::<Vec<_>>() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn eq_matches_scalar_field() {
        let doc = json!({"metadata": {"difficulty": "hard"}});
        let f = Filter::eq("metadata.difficulty", "hard");
        assert!(evaluate(&f, &doc));
        let f2 = Filter::eq("metadata.difficulty", "easy");
        assert!(!evaluate(&f2, &doc));
    }

    #[test]
    fn eq_matches_array_membership() {
        let doc = json!({"published_in": ["global", "team"]});
        assert!(evaluate(&Filter::eq("published_in", "team"), &doc));
        assert!(!evaluate(&Filter::eq("published_in", "other"), &doc));
    }

    #[test]
    fn and_or_compose() {
        let doc = json!({"metadata": {"difficulty": "hard", "version": "2.0"}});
        let f = Filter::and(vec![
            Filter::eq("metadata.difficulty", "hard"),
            Filter::or(vec![
                Filter::eq("metadata.version", "1.0"),
                Filter::eq("metadata.version", "2.0"),
            ]),
        ]);
        assert!(evaluate(&f, &doc));
    }

    #[test]
    fn geq_leq_numeric_range() {
        let doc = json!({"reward": 0.5});
        assert!(evaluate(&Filter::Geq { key: "reward".into(), value: json!(0.0) }, &doc));
        assert!(evaluate(&Filter::Leq { key: "reward".into(), value: json!(1.0) }, &doc));
        assert!(!evaluate(&Filter::Gt { key: "reward".into(), value: json!(0.5) }, &doc));
    }

    #[test]
    fn in_matches_any_candidate() {
        let doc = json!({"metadata": {"agent": "ppo"}});
        let f = Filter::In { key: "metadata.agent".into(), values: vec![json!("ppo"), json!("dqn")] };
        assert!(evaluate(&f, &doc));
    }

    #[test]
    fn missing_key_never_matches() {
        let doc = json!({});
        assert!(!evaluate(&Filter::eq("metadata.missing", "x"), &doc));
    }

    #[test]
    fn native_translation_matches_reference_table() {
        let f = Filter::and(vec![Filter::eq("k", "v"), Filter::Geq { key: "g".into(), value: json!(1) }]);
        let native = to_native(&f);
        assert_eq!(
            native,
            json!({"$and": [{"k": "v"}, {"g": {"$gte": 1}}]})
        );
    }
}
