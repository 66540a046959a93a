//! Delivery-report classification.
//!
//! The push-delivery entry point hands us a batch of decrypted delivery
//! reports and needs a yes/no alerting decision plus a display category.
//! [`ReportKind`] is a closed enum with a total mapping to its category, so
//! there is no stringly-typed fallthrough: `default` and `silent` are the
//! only kinds that never alert, and an unknown wire name fails at the parse
//! boundary instead of being silently swallowed.
//!
//! Pure functions only — no state, no side effects.

use serde::{Deserialize, Serialize};

/// Every report kind the protocol layer can deliver.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ReportKind {
    #[serde(rename = "default")]
    Default,
    #[serde(rename = "silent")]
    Silent,
    #[serde(rename = "request")]
    Request,
    #[serde(rename = "confirm")]
    Confirm,
    #[serde(rename = "e2e")]
    E2e,
    #[serde(rename = "group")]
    Group,
    #[serde(rename = "endFT")]
    EndFt,
    #[serde(rename = "groupRq")]
    GroupRequest,
    #[serde(rename = "reset")]
    Reset,
}

impl ReportKind {
    /// Wire name as carried in raw report payloads.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Silent => "silent",
            Self::Request => "request",
            Self::Confirm => "confirm",
            Self::E2e => "e2e",
            Self::Group => "group",
            Self::EndFt => "endFT",
            Self::GroupRequest => "groupRq",
            Self::Reset => "reset",
        }
    }

    /// Total mapping to a display category.  `None` for the two kinds that
    /// never alert.
    pub fn category(&self) -> Option<ReportCategory> {
        match self {
            Self::Default | Self::Silent => None,
            Self::Request => Some(ReportCategory::Request),
            Self::Confirm => Some(ReportCategory::Confirm),
            Self::E2e => Some(ReportCategory::E2e),
            Self::Group => Some(ReportCategory::Group),
            Self::EndFt => Some(ReportCategory::EndFt),
            Self::GroupRequest => Some(ReportCategory::GroupRequest),
            Self::Reset => Some(ReportCategory::Reset),
        }
    }
}

impl std::str::FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "silent" => Ok(Self::Silent),
            "request" => Ok(Self::Request),
            "confirm" => Ok(Self::Confirm),
            "e2e" => Ok(Self::E2e),
            "group" => Ok(Self::Group),
            "endFT" => Ok(Self::EndFt),
            "groupRq" => Ok(Self::GroupRequest),
            "reset" => Ok(Self::Reset),
            other => Err(format!("unknown report kind: {other}")),
        }
    }
}

/// Display category of an alerting report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ReportCategory {
    Request,
    Confirm,
    E2e,
    Group,
    EndFt,
    GroupRequest,
    Reset,
}

impl ReportCategory {
    /// User-facing alert title.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Request => "Request received",
            Self::Confirm => "Request accepted",
            Self::E2e => "New private message",
            Self::Group => "New group message",
            Self::EndFt => "New media received",
            Self::GroupRequest => "Group request received",
            Self::Reset => "Contact restored their account",
        }
    }
}

/// One decrypted inbound delivery report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryReport {
    #[serde(rename = "forMe")]
    pub for_me: bool,
    #[serde(rename = "type")]
    pub kind: ReportKind,
}

impl DeliveryReport {
    /// Parse one raw JSON report payload.
    pub fn from_json(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }

    /// Parse a raw JSON array of report payloads.
    pub fn batch_from_json(payload: &str) -> serde_json::Result<Vec<Self>> {
        serde_json::from_str(payload)
    }
}

/// The alerting decision for one report batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub should_alert: bool,
    pub category: Option<ReportCategory>,
}

/// Scan a report batch in order; the first report addressed to the local
/// user with an alert-worthy kind wins.
pub fn classify(reports: &[DeliveryReport]) -> Classification {
    for report in reports {
        if !report.for_me {
            continue;
        }
        if let Some(category) = report.kind.category() {
            return Classification {
                should_alert: true,
                category: Some(category),
            };
        }
    }

    Classification {
        should_alert: false,
        category: None,
    }
}
