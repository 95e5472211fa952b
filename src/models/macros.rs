use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::models::ticket::{TicketPriority, TicketStatus};

/// What causes a macro to be considered for execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacroTrigger {
    Manual,
    Keyword,
    StatusChange,
    Category,
    Priority,
    SlaBreach,
}

impl fmt::Display for MacroTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacroTrigger::Manual => write!(f, "manual"),
            MacroTrigger::Keyword => write!(f, "keyword"),
            MacroTrigger::StatusChange => write!(f, "status_change"),
            MacroTrigger::Category => write!(f, "category"),
            MacroTrigger::Priority => write!(f, "priority"),
            MacroTrigger::SlaBreach => write!(f, "sla_breach"),
        }
    }
}

/// Ticket attribute a condition reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionField {
    Status,
    Priority,
    Category,
    Assignee,
    Content,
    AgeHours,
}

impl fmt::Display for ConditionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionField::Status => write!(f, "status"),
            ConditionField::Priority => write!(f, "priority"),
            ConditionField::Category => write!(f, "category"),
            ConditionField::Assignee => write!(f, "assignee"),
            ConditionField::Content => write!(f, "content"),
            ConditionField::AgeHours => write!(f, "age_hours"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    GreaterThan,
    LessThan,
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionOperator::Equals => write!(f, "equals"),
            ConditionOperator::NotEquals => write!(f, "not_equals"),
            ConditionOperator::Contains => write!(f, "contains"),
            ConditionOperator::NotContains => write!(f, "not_contains"),
            ConditionOperator::GreaterThan => write!(f, "greater_than"),
            ConditionOperator::LessThan => write!(f, "less_than"),
        }
    }
}

/// One condition of a macro. Pure data; only mutated through macro edits.
///
/// The value is kept as JSON and type-checked against the field at macro
/// save time, so evaluation never has to report a mismatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroCondition {
    pub field: ConditionField,
    pub operator: ConditionOperator,
    pub value: serde_json::Value,
}

impl MacroCondition {
    /// Field/operator/value compatibility check, run when a macro is created
    /// or edited and never during evaluation.
    pub fn validate(&self) -> Result<(), MacroValidationError> {
        match self.operator {
            ConditionOperator::Contains | ConditionOperator::NotContains => {
                if self.field != ConditionField::Content {
                    return Err(MacroValidationError::ConditionTypeMismatch {
                        field: self.field,
                        operator: self.operator,
                    });
                }
            }
            ConditionOperator::GreaterThan | ConditionOperator::LessThan => {
                if self.field != ConditionField::AgeHours {
                    return Err(MacroValidationError::ConditionTypeMismatch {
                        field: self.field,
                        operator: self.operator,
                    });
                }
            }
            ConditionOperator::Equals | ConditionOperator::NotEquals => {}
        }

        match self.field {
            ConditionField::AgeHours => {
                if !self.value.is_number() {
                    return Err(MacroValidationError::ConditionValueType {
                        field: self.field,
                        expected: "number",
                    });
                }
            }
            ConditionField::Category | ConditionField::Assignee => {
                // Null matches an unset category/assignee.
                if !self.value.is_string() && !self.value.is_null() {
                    return Err(MacroValidationError::ConditionValueType {
                        field: self.field,
                        expected: "string or null",
                    });
                }
            }
            _ => {
                if !self.value.is_string() {
                    return Err(MacroValidationError::ConditionValueType {
                        field: self.field,
                        expected: "string",
                    });
                }
            }
        }

        Ok(())
    }
}

/// How a macro's condition list combines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Combinator {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

/// One macro action, decoded into a variant carrying only the fields that
/// action needs. Parameters are validated once, when the macro is saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MacroAction {
    AddReply {
        content: String,
        #[serde(default)]
        is_internal: bool,
    },
    ChangeStatus {
        status: TicketStatus,
    },
    AssignAgent {
        agent_id: String,
    },
    ChangePriority {
        priority: TicketPriority,
    },
    AddTags {
        tags: Vec<String>,
    },
    SendEmail {
        recipient: Option<String>,
        template: String,
        #[serde(default)]
        variables: HashMap<String, String>,
    },
    CreateTask {
        description: String,
        assignee: Option<String>,
    },
    Escalate {
        assignee: Option<String>,
    },
}

impl MacroAction {
    /// Stable name recorded in execution outcomes.
    pub fn kind(&self) -> &'static str {
        match self {
            MacroAction::AddReply { .. } => "add_reply",
            MacroAction::ChangeStatus { .. } => "change_status",
            MacroAction::AssignAgent { .. } => "assign_agent",
            MacroAction::ChangePriority { .. } => "change_priority",
            MacroAction::AddTags { .. } => "add_tags",
            MacroAction::SendEmail { .. } => "send_email",
            MacroAction::CreateTask { .. } => "create_task",
            MacroAction::Escalate { .. } => "escalate",
        }
    }

    pub fn validate(&self) -> Result<(), MacroValidationError> {
        match self {
            MacroAction::AddReply { content, .. } => {
                if content.is_empty() {
                    return Err(MacroValidationError::MissingActionParameter {
                        action: "add_reply",
                        parameter: "content",
                    });
                }
            }
            MacroAction::AssignAgent { agent_id } => {
                if agent_id.is_empty() {
                    return Err(MacroValidationError::MissingActionParameter {
                        action: "assign_agent",
                        parameter: "agent_id",
                    });
                }
            }
            MacroAction::AddTags { tags } => {
                if tags.is_empty() {
                    return Err(MacroValidationError::MissingActionParameter {
                        action: "add_tags",
                        parameter: "tags",
                    });
                }
            }
            MacroAction::SendEmail { template, .. } => {
                if template.is_empty() {
                    return Err(MacroValidationError::MissingActionParameter {
                        action: "send_email",
                        parameter: "template",
                    });
                }
            }
            MacroAction::CreateTask { description, .. } => {
                if description.is_empty() {
                    return Err(MacroValidationError::MissingActionParameter {
                        action: "create_task",
                        parameter: "description",
                    });
                }
            }
            MacroAction::ChangeStatus { .. }
            | MacroAction::ChangePriority { .. }
            | MacroAction::Escalate { .. } => {}
        }
        Ok(())
    }
}

/// A named, conditionally-triggered list of actions. Administrators
/// soft-disable macros via `active = false`; macros are never deleted so
/// the execution log keeps resolving.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Macro {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub trigger: MacroTrigger,
    pub conditions: Vec<MacroCondition>,
    pub combinator: Combinator,
    pub actions: Vec<MacroAction>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub active: bool,
    /// Execution order within a pass: higher runs first.
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Macro {
    /// Fail-fast gate run before a macro is stored or activated. A macro
    /// that passes here can always be evaluated without type errors.
    pub fn validate(&self) -> Result<(), MacroValidationError> {
        if self.name.len() < 2 || self.name.len() > 255 {
            return Err(MacroValidationError::InvalidName);
        }
        if self.actions.is_empty() {
            return Err(MacroValidationError::NoActions);
        }
        if self.trigger == MacroTrigger::Keyword && self.keywords.is_empty() {
            return Err(MacroValidationError::MissingKeywords);
        }
        for condition in &self.conditions {
            condition.validate()?;
        }
        for action in &self.actions {
            action.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum MacroValidationError {
    #[error("Macro name must be between 2 and 255 characters")]
    InvalidName,
    #[error("Macro must have at least one action")]
    NoActions,
    #[error("Keyword-triggered macro must have at least one keyword")]
    MissingKeywords,
    #[error("Operator {operator} cannot be applied to field {field}")]
    ConditionTypeMismatch {
        field: ConditionField,
        operator: ConditionOperator,
    },
    #[error("Condition on field {field} requires a {expected} value")]
    ConditionValueType {
        field: ConditionField,
        expected: &'static str,
    },
    #[error("Action {action} requires parameter '{parameter}'")]
    MissingActionParameter {
        action: &'static str,
        parameter: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Automatic,
    Manual,
    DryRun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Failed,
    Skipped,
}

/// Result of one action within one macro execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub action: String,
    pub status: OutcomeStatus,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Failed,
    Partial,
}

/// Audit record of one attempt to run one macro against one ticket.
/// Immutable once appended; references macro and ticket by id only so it
/// survives macro edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroExecution {
    pub id: String,
    pub macro_id: String,
    pub ticket_id: String,
    pub trigger: String,
    pub mode: ExecutionMode,
    pub outcomes: Vec<ActionOutcome>,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl MacroExecution {
    /// Overall status from per-action outcomes: `Failed` when every outcome
    /// failed, `Partial` when some did, `Success` otherwise. Skipped
    /// outcomes never count against the aggregate, so a clean dry run
    /// reports `Success`.
    pub fn aggregate_status(outcomes: &[ActionOutcome]) -> ExecutionStatus {
        let failed = outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Failed)
            .count();
        if failed == 0 {
            ExecutionStatus::Success
        } else if failed == outcomes.len() {
            ExecutionStatus::Failed
        } else {
            ExecutionStatus::Partial
        }
    }
}
