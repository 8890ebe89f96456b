//! Campaign rule evaluation
//!
//! All rules of a campaign must hold for a contact to be eligible. A
//! contact missing the targeted custom field is never eligible, and
//! unsupported condition types evaluate to ineligible rather than failing
//! the scheduler tick.

use courier_common::types::{ConditionType, CustomFieldId};
use courier_storage::models::CampaignRule;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// AND-evaluate every rule against a contact's custom field values
pub fn contact_is_eligible(
    custom_values: &HashMap<CustomFieldId, Value>,
    rules: &[CampaignRule],
) -> bool {
    for rule in rules {
        let Some(contact_value) = custom_values.get(&rule.custom_field_id) else {
            return false;
        };

        let condition = ConditionType::parse(&rule.condition_type);
        if !evaluate_condition(&condition, contact_value, &rule.value) {
            return false;
        }
    }

    true
}

/// Evaluate one condition against a contact value
pub fn evaluate_condition(
    condition: &ConditionType,
    contact_value: &Value,
    rule_value: &Value,
) -> bool {
    match condition {
        ConditionType::Equals => contact_value == rule_value,
        ConditionType::NotEquals => contact_value != rule_value,
        ConditionType::Contains => contact_value
            .as_array()
            .map(|items| items.contains(rule_value))
            .unwrap_or(false),
        ConditionType::GreaterThan => compare(contact_value, rule_value)
            .map(std::cmp::Ordering::is_gt)
            .unwrap_or(false),
        ConditionType::LessThan => compare(contact_value, rule_value)
            .map(std::cmp::Ordering::is_lt)
            .unwrap_or(false),
        ConditionType::StartsWith => match (contact_value.as_str(), rule_value.as_str()) {
            (Some(contact), Some(prefix)) => contact.starts_with(prefix),
            _ => false,
        },
        ConditionType::EndsWith => match (contact_value.as_str(), rule_value.as_str()) {
            (Some(contact), Some(suffix)) => contact.ends_with(suffix),
            _ => false,
        },
        ConditionType::IsEmpty => is_empty(contact_value),
        ConditionType::NotEmpty => has_length(contact_value) && !is_empty(contact_value),
        ConditionType::Unsupported => {
            warn!("unsupported condition type, contact is ineligible");
            false
        }
    }
}

/// Order two values: numbers numerically, strings lexicographically
fn compare(left: &Value, right: &Value) -> Option<std::cmp::Ordering> {
    if let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) {
        return l.partial_cmp(&r);
    }
    if let (Some(l), Some(r)) = (left.as_str(), right.as_str()) {
        return Some(l.cmp(r));
    }
    None
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn has_length(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Array(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn rule(field: CustomFieldId, condition: &str, value: Value) -> CampaignRule {
        CampaignRule {
            id: Uuid::new_v4(),
            campaign_id: Uuid::new_v4(),
            custom_field_id: field,
            condition_type: condition.to_string(),
            value,
            created_at: Utc::now(),
        }
    }

    fn values(entries: &[(CustomFieldId, Value)]) -> HashMap<CustomFieldId, Value> {
        entries.iter().cloned().collect()
    }

    #[test]
    fn test_missing_custom_field_is_never_eligible() {
        let field = Uuid::new_v4();
        let empty = HashMap::new();

        for condition in [
            "equals", "not_equals", "contains", "greater_than", "less_than",
            "starts_with", "ends_with", "is_empty", "not_empty", "bogus",
        ] {
            let rules = vec![rule(field, condition, json!("x"))];
            assert!(
                !contact_is_eligible(&empty, &rules),
                "condition {condition} matched a missing field"
            );
        }
    }

    #[test]
    fn test_unsupported_condition_is_ineligible_not_an_error() {
        let field = Uuid::new_v4();
        let vals = values(&[(field, json!("anything"))]);
        let rules = vec![rule(field, "matches_regex", json!(".*"))];

        assert!(!contact_is_eligible(&vals, &rules));
    }

    #[test]
    fn test_all_rules_must_hold() {
        let city = Uuid::new_v4();
        let age = Uuid::new_v4();
        let vals = values(&[(city, json!("bogota")), (age, json!(30))]);

        let both_hold = vec![
            rule(city, "equals", json!("bogota")),
            rule(age, "greater_than", json!(18)),
        ];
        assert!(contact_is_eligible(&vals, &both_hold));

        let one_fails = vec![
            rule(city, "equals", json!("bogota")),
            rule(age, "less_than", json!(18)),
        ];
        assert!(!contact_is_eligible(&vals, &one_fails));
    }

    #[test]
    fn test_equals_and_not_equals() {
        assert!(evaluate_condition(
            &ConditionType::Equals,
            &json!("a"),
            &json!("a")
        ));
        assert!(!evaluate_condition(
            &ConditionType::Equals,
            &json!("a"),
            &json!("b")
        ));
        assert!(evaluate_condition(
            &ConditionType::NotEquals,
            &json!(1),
            &json!(2)
        ));
    }

    #[test]
    fn test_contains_requires_array() {
        assert!(evaluate_condition(
            &ConditionType::Contains,
            &json!(["vip", "beta"]),
            &json!("vip")
        ));
        assert!(!evaluate_condition(
            &ConditionType::Contains,
            &json!("vip"),
            &json!("vip")
        ));
    }

    #[test]
    fn test_numeric_and_string_comparison() {
        assert!(evaluate_condition(
            &ConditionType::GreaterThan,
            &json!(10),
            &json!(5)
        ));
        assert!(evaluate_condition(
            &ConditionType::LessThan,
            &json!("abc"),
            &json!("abd")
        ));
        // Mixed types never compare
        assert!(!evaluate_condition(
            &ConditionType::GreaterThan,
            &json!("10"),
            &json!(5)
        ));
    }

    #[test]
    fn test_starts_and_ends_with() {
        assert!(evaluate_condition(
            &ConditionType::StartsWith,
            &json!("premium-plan"),
            &json!("premium")
        ));
        assert!(evaluate_condition(
            &ConditionType::EndsWith,
            &json!("premium-plan"),
            &json!("plan")
        ));
        assert!(!evaluate_condition(
            &ConditionType::StartsWith,
            &json!(42),
            &json!("4")
        ));
    }

    #[test]
    fn test_empty_checks() {
        assert!(evaluate_condition(&ConditionType::IsEmpty, &json!(""), &json!(null)));
        assert!(evaluate_condition(&ConditionType::IsEmpty, &json!([]), &json!(null)));
        assert!(evaluate_condition(&ConditionType::IsEmpty, &json!(null), &json!(null)));
        assert!(!evaluate_condition(&ConditionType::IsEmpty, &json!("x"), &json!(null)));

        assert!(evaluate_condition(&ConditionType::NotEmpty, &json!("x"), &json!(null)));
        assert!(evaluate_condition(&ConditionType::NotEmpty, &json!([1]), &json!(null)));
        assert!(!evaluate_condition(&ConditionType::NotEmpty, &json!(""), &json!(null)));
        // Scalars have no length; not_empty never matches them
        assert!(!evaluate_condition(&ConditionType::NotEmpty, &json!(5), &json!(null)));
    }
}
