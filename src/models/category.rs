use crate::config::SlaDefaults;
use crate::models::sla::SlaLimits;
use serde::{Deserialize, Serialize};

/// Ticket category carrying the SLA thresholds and an intake form schema.
///
/// The form schema is opaque to this core; it is stored and handed back to
/// the surrounding application untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketCategory {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub sla_response_hours: f64,
    pub sla_resolution_hours: f64,
    #[serde(default)]
    pub form_schema: serde_json::Value,
    pub active: bool,
}

impl TicketCategory {
    pub fn sla_limits(&self) -> SlaLimits {
        SlaLimits {
            response_hours: self.sla_response_hours,
            resolution_hours: self.sla_resolution_hours,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.len() < 2 || self.name.len() > 255 {
            return Err("Category name must be between 2 and 255 characters".to_string());
        }
        if self.sla_response_hours < 1.0 {
            return Err("SLA response hours must be at least 1".to_string());
        }
        if self.sla_resolution_hours < 1.0 {
            return Err("SLA resolution hours must be at least 1".to_string());
        }
        Ok(())
    }
}

impl SlaLimits {
    /// Limits for a ticket with no category.
    pub fn from_defaults(defaults: &SlaDefaults) -> Self {
        Self {
            response_hours: defaults.response_hours,
            resolution_hours: defaults.resolution_hours,
        }
    }
}
