use crate::models::macros::{Combinator, ConditionField, ConditionOperator, MacroCondition};
use crate::models::ticket::Ticket;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Evaluate a single condition against a ticket snapshot.
///
/// Pure and infallible: operator/field compatibility is enforced when the
/// macro is saved (`MacroCondition::validate`), so a mismatch can only be
/// seen here for rules persisted before validation existed; those
/// conservatively evaluate to false rather than guessing.
pub fn matches(ticket: &Ticket, condition: &MacroCondition, now: DateTime<Utc>) -> bool {
    match condition.field {
        ConditionField::Status => {
            string_compare(&ticket.status.to_string(), condition)
        }
        ConditionField::Priority => {
            string_compare(&ticket.priority.to_string(), condition)
        }
        ConditionField::Category => option_compare(ticket.category_id.as_deref(), condition),
        ConditionField::Assignee => option_compare(ticket.assignee.as_deref(), condition),
        ConditionField::Content => content_compare(&ticket.content(), condition),
        ConditionField::AgeHours => numeric_compare(ticket.age_hours(now), condition),
    }
}

/// Evaluate a macro's full condition set.
///
/// Under AND an empty list is vacuously true; under OR it is false, since
/// "match nothing" cannot satisfy "at least one".
pub fn matches_all(
    ticket: &Ticket,
    conditions: &[MacroCondition],
    combinator: Combinator,
    now: DateTime<Utc>,
) -> bool {
    match combinator {
        Combinator::And => conditions.iter().all(|c| matches(ticket, c, now)),
        Combinator::Or => conditions.iter().any(|c| matches(ticket, c, now)),
    }
}

fn string_compare(actual: &str, condition: &MacroCondition) -> bool {
    let Some(expected) = condition.value.as_str() else {
        return false;
    };
    let equal = actual.eq_ignore_ascii_case(expected);
    match condition.operator {
        ConditionOperator::Equals => equal,
        ConditionOperator::NotEquals => !equal,
        _ => false,
    }
}

fn option_compare(actual: Option<&str>, condition: &MacroCondition) -> bool {
    let equal = match (&condition.value, actual) {
        (Value::Null, None) => true,
        (Value::String(expected), Some(actual)) => actual.eq_ignore_ascii_case(expected),
        _ => false,
    };
    match condition.operator {
        ConditionOperator::Equals => equal,
        ConditionOperator::NotEquals => !equal,
        _ => false,
    }
}

fn content_compare(content: &str, condition: &MacroCondition) -> bool {
    let Some(expected) = condition.value.as_str() else {
        return false;
    };
    let haystack = content.to_lowercase();
    let needle = expected.to_lowercase();
    match condition.operator {
        ConditionOperator::Equals => haystack == needle,
        ConditionOperator::NotEquals => haystack != needle,
        ConditionOperator::Contains => haystack.contains(&needle),
        ConditionOperator::NotContains => !haystack.contains(&needle),
        _ => false,
    }
}

fn numeric_compare(actual: f64, condition: &MacroCondition) -> bool {
    let Some(expected) = condition.value.as_f64() else {
        return false;
    };
    match condition.operator {
        ConditionOperator::Equals => actual == expected,
        ConditionOperator::NotEquals => actual != expected,
        ConditionOperator::GreaterThan => actual > expected,
        ConditionOperator::LessThan => actual < expected,
        _ => false,
    }
}
