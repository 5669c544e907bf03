//! Reply conditions
//!
//! Decides whether an inbound message qualifies for an auto-reply.

use std::collections::BTreeMap;

use super::config::ConditionKind;

/// Check a message against an account's conditions.
///
/// Both the message and each operand are lowercased before matching. Every
/// recognized condition must hold; an empty mapping always matches.
/// Unrecognized kinds are skipped.
pub fn should_reply(text: &str, conditions: &BTreeMap<String, String>) -> bool {
    let text = text.to_lowercase();

    conditions.iter().all(|(kind, operand)| {
        let operand = operand.to_lowercase();
        match ConditionKind::parse(kind) {
            Some(ConditionKind::Contains) => text.contains(&operand),
            Some(ConditionKind::StartsWith) => text.starts_with(&operand),
            Some(ConditionKind::EndsWith) => text.ends_with(&operand),
            None => {
                tracing::debug!(kind = %kind, "ignoring unknown condition kind");
                true
            }
        }
    })
}

/// Condition kinds in `conditions` that [`should_reply`] does not recognize
pub fn unknown_condition_kinds(conditions: &BTreeMap<String, String>) -> Vec<String> {
    conditions
        .keys()
        .filter(|k| ConditionKind::parse(k).is_none())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conditions(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_conditions_always_match() {
        let empty = BTreeMap::new();
        assert!(should_reply("anything", &empty));
        assert!(should_reply("", &empty));
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let c = conditions(&[("contains", "PRICE")]);
        assert!(should_reply("What's the price of this?", &c));
        assert!(should_reply("PRICE list please", &c));
        assert!(!should_reply("How much is it?", &c));
    }

    #[test]
    fn test_starts_with() {
        let c = conditions(&[("starts_with", "Hi")]);
        assert!(should_reply("hi there", &c));
        assert!(!should_reply("oh hi", &c));
    }

    #[test]
    fn test_ends_with() {
        let c = conditions(&[("ends_with", "?")]);
        assert!(should_reply("What time do you open?", &c));
        assert!(!should_reply("Great store!", &c));
    }

    #[test]
    fn test_all_conditions_must_hold() {
        let c = conditions(&[("contains", "open"), ("starts_with", "when")]);
        // contains passes, starts_with fails
        assert!(!should_reply("What time do you open?", &c));
        assert!(should_reply("When do you open?", &c));
    }

    #[test]
    fn test_unknown_kind_ignored() {
        let c = conditions(&[("regex", "^x$"), ("contains", "hello")]);
        assert!(should_reply("hello world", &c));
        assert!(!should_reply("goodbye", &c));

        let only_unknown = conditions(&[("equals", "nope")]);
        assert!(should_reply("anything", &only_unknown));
    }

    #[test]
    fn test_unknown_condition_kinds() {
        let c = conditions(&[("regex", "x"), ("contains", "y"), ("equals", "z")]);
        assert_eq!(unknown_condition_kinds(&c), vec!["equals", "regex"]);
        assert!(unknown_condition_kinds(&conditions(&[("ends_with", "?")])).is_empty());
    }

    #[test]
    fn test_unicode_lowercasing() {
        let c = conditions(&[("contains", "ÉTÉ")]);
        assert!(should_reply("Soldes d'été!", &c));
    }
}
