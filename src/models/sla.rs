use serde::{Deserialize, Serialize};

/// Response/resolution thresholds in hours, from the ticket's category or
/// the configured defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlaLimits {
    pub response_hours: f64,
    pub resolution_hours: f64,
}

/// Snapshot of a ticket's SLA clocks at one instant. Recomputed on demand;
/// never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlaStatus {
    pub response_elapsed_hours: f64,
    pub resolution_elapsed_hours: f64,
    pub response_breached: bool,
    pub resolution_breached: bool,
}

impl SlaStatus {
    pub fn breached(&self) -> bool {
        self.response_breached || self.resolution_breached
    }
}

/// Which SLA deadline a breach trigger refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaBreachKind {
    Response,
    Resolution,
}

impl std::fmt::Display for SlaBreachKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlaBreachKind::Response => write!(f, "response"),
            SlaBreachKind::Resolution => write!(f, "resolution"),
        }
    }
}
