//! Pure attribute conflict resolution.
//!
//! One function, one table. Given `(attribute name, old, new)` it returns the
//! merged value deterministically — no access to the graph, no I/O, no
//! randomness, so the same inputs always produce the same output (the
//! "conflict resolution determinism" law).

use crate::entity::AttrValue;

/// Attribute names treated as monotonically-growing numeric stats, clamped
/// to `[0, max]` when a `max_health`-like bound is known.
const HEALTH_LIKE: &[&str] = &["health", "hp", "current_health"];
const MAX_HEALTH_LIKE: &[&str] = &["max_health", "max_hp"];
const MONOTONIC_NUMERIC: &[&str] = &["level", "experience", "exp", "xp"];
const EPISODIC_STRING: &[&str] = &["location", "status"];

fn is_one_of(name: &str, set: &[&str]) -> bool {
    let lower = name.to_ascii_lowercase();
    set.iter().any(|candidate| *candidate == lower)
}

/// Resolve one attribute's merged value given the old and incoming values.
///
/// `max_health` is the node's current `max_health`-like attribute, if any —
/// used to clamp a `health`-like update. Pass `None` when the node has no
/// such bound yet (the new value passes through unclamped).
pub fn resolve_attribute(name: &str, old: Option<&AttrValue>, new: &AttrValue, max_health: Option<f64>) -> AttrValue {
    if is_one_of(name, HEALTH_LIKE) {
        return clamp_numeric(new, 0.0, max_health);
    }
    if is_one_of(name, MAX_HEALTH_LIKE) {
        return max_numeric(old, new);
    }
    if is_one_of(name, MONOTONIC_NUMERIC) {
        return max_numeric(old, new);
    }
    if let AttrValue::List(new_list) = new {
        let merged = match old {
            Some(AttrValue::List(old_list)) => union_preserving_order(old_list, new_list),
            _ => union_preserving_order(&[], new_list),
        };
        return AttrValue::List(merged);
    }
    if is_one_of(name, EPISODIC_STRING) {
        // Last-write-wins, logged by the caller.
        return new.clone();
    }
    // Otherwise: last-write-wins.
    new.clone()
}

fn clamp_numeric(new: &AttrValue, min: f64, max: Option<f64>) -> AttrValue {
    let Some(value) = new.as_f64() else {
        return new.clone();
    };
    let clamped = match max {
        Some(max) => value.clamp(min, max),
        None => value.max(min),
    };
    AttrValue::Number(clamped)
}

fn max_numeric(old: Option<&AttrValue>, new: &AttrValue) -> AttrValue {
    let new_val = new.as_f64().unwrap_or(f64::MIN);
    let old_val = old.and_then(AttrValue::as_f64).unwrap_or(f64::MIN);
    AttrValue::Number(new_val.max(old_val))
}

fn union_preserving_order(old: &[String], new: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(old.len() + new.len());
    for item in old.iter().chain(new.iter()) {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_clamps_to_max() {
        let resolved = resolve_attribute("health", Some(&AttrValue::Number(10.0)), &AttrValue::Number(500.0), Some(100.0));
        assert_eq!(resolved, AttrValue::Number(100.0));
    }

    #[test]
    fn health_clamps_negative_to_zero() {
        let resolved = resolve_attribute("hp", None, &AttrValue::Number(-40.0), Some(100.0));
        assert_eq!(resolved, AttrValue::Number(0.0));
    }

    #[test]
    fn max_health_takes_larger_value() {
        let resolved = resolve_attribute("max_health", Some(&AttrValue::Number(100.0)), &AttrValue::Number(80.0), None);
        assert_eq!(resolved, AttrValue::Number(100.0));
    }

    #[test]
    fn level_is_monotonic() {
        let resolved = resolve_attribute("level", Some(&AttrValue::Number(5.0)), &AttrValue::Number(3.0), None);
        assert_eq!(resolved, AttrValue::Number(5.0));
        let resolved = resolve_attribute("level", Some(&AttrValue::Number(5.0)), &AttrValue::Number(7.0), None);
        assert_eq!(resolved, AttrValue::Number(7.0));
    }

    #[test]
    fn lists_union_and_dedupe_preserving_order() {
        let old = AttrValue::List(vec!["sword".into(), "shield".into()]);
        let new = AttrValue::List(vec!["shield".into(), "potion".into()]);
        let resolved = resolve_attribute("inventory", Some(&old), &new, None);
        assert_eq!(resolved, AttrValue::List(vec!["sword".into(), "shield".into(), "potion".into()]));
    }

    #[test]
    fn location_is_last_write_wins() {
        let old = AttrValue::Text("tavern".into());
        let new = AttrValue::Text("forest".into());
        let resolved = resolve_attribute("location", Some(&old), &new, None);
        assert_eq!(resolved, AttrValue::Text("forest".into()));
    }

    #[test]
    fn unknown_attribute_is_last_write_wins() {
        let old = AttrValue::Text("rusty".into());
        let new = AttrValue::Text("gleaming".into());
        let resolved = resolve_attribute("finish", Some(&old), &new, None);
        assert_eq!(resolved, new);
    }

    #[test]
    fn deterministic_for_same_inputs() {
        let old = AttrValue::Number(3.0);
        let new = AttrValue::Number(9.0);
        let a = resolve_attribute("level", Some(&old), &new, None);
        let b = resolve_attribute("level", Some(&old), &new, None);
        assert_eq!(a, b);
    }
}
