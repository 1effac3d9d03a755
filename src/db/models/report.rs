use serde::{Deserialize, Serialize};
use sqlx::types::{Json, Uuid};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "report_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Registered,
    InProgress,
    Resolved,
    Closed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Registered => "registered",
            ReportStatus::InProgress => "in_progress",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Closed => "closed",
        }
    }

    /// A report counts as open until it reaches `resolved` or `closed`.
    pub fn is_open(&self) -> bool {
        !matches!(self, ReportStatus::Resolved | ReportStatus::Closed)
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registered" => Ok(ReportStatus::Registered),
            "in_progress" => Ok(ReportStatus::InProgress),
            "resolved" => Ok(ReportStatus::Resolved),
            "closed" => Ok(ReportStatus::Closed),
            other => Err(format!("Unknown status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "report_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportCategory {
    Water,
    Road,
    Electricity,
    Garbage,
    Streetlight,
    Other,
}

impl ReportCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportCategory::Water => "water",
            ReportCategory::Road => "road",
            ReportCategory::Electricity => "electricity",
            ReportCategory::Garbage => "garbage",
            ReportCategory::Streetlight => "streetlight",
            ReportCategory::Other => "other",
        }
    }

    /// Submissions with an unknown or missing category land in `other`.
    pub fn parse_or_other(s: &str) -> Self {
        s.parse().unwrap_or(ReportCategory::Other)
    }
}

impl FromStr for ReportCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "water" => Ok(ReportCategory::Water),
            "road" => Ok(ReportCategory::Road),
            "electricity" => Ok(ReportCategory::Electricity),
            "garbage" => Ok(ReportCategory::Garbage),
            "streetlight" => Ok(ReportCategory::Streetlight),
            "other" => Ok(ReportCategory::Other),
            unknown => Err(format!("Unknown category: {}", unknown)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "report_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl ReportPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPriority::Low => "low",
            ReportPriority::Medium => "medium",
            ReportPriority::High => "high",
        }
    }
}

impl FromStr for ReportPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(ReportPriority::Low),
            "medium" => Ok(ReportPriority::Medium),
            "high" => Ok(ReportPriority::High),
            other => Err(format!("Unknown priority: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
}

/// One entry in a report's audit log. Entries are immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub by_user_id: Option<Uuid>,
    pub by_user_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Report {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: ReportCategory,
    pub priority: ReportPriority,
    pub status: ReportStatus,
    #[sqlx(flatten)]
    pub location: Location,
    pub images: Vec<String>,
    pub created_by: Option<Uuid>,
    pub created_by_name: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub assigned_to_name: Option<String>,
    pub timeline: Json<Vec<TimelineEntry>>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Validate)]
pub struct NewReport {
    #[validate(length(min = 1))]
    pub title: String,
    pub description: Option<String>,
    pub category: ReportCategory,
    pub priority: ReportPriority,
    pub location: Location,
    pub images: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignUpdate {
    pub assigned_to_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            ReportStatus::Registered,
            ReportStatus::InProgress,
            ReportStatus::Resolved,
            ReportStatus::Closed,
        ] {
            assert_eq!(status.as_str().parse::<ReportStatus>().unwrap(), status);
        }
        assert!("escalated".parse::<ReportStatus>().is_err());
    }

    #[test]
    fn open_statuses() {
        assert!(ReportStatus::Registered.is_open());
        assert!(ReportStatus::InProgress.is_open());
        assert!(!ReportStatus::Resolved.is_open());
        assert!(!ReportStatus::Closed.is_open());
    }

    #[test]
    fn unknown_category_falls_back_to_other() {
        assert_eq!(ReportCategory::parse_or_other("road"), ReportCategory::Road);
        assert_eq!(
            ReportCategory::parse_or_other("sinkholes"),
            ReportCategory::Other
        );
        assert_eq!(ReportCategory::parse_or_other(""), ReportCategory::Other);
    }

    #[test]
    fn priority_defaults_to_medium() {
        assert_eq!(ReportPriority::default(), ReportPriority::Medium);
        assert!("urgent".parse::<ReportPriority>().is_err());
    }

    #[test]
    fn timeline_entry_serializes_with_rfc3339_timestamp() {
        let entry = TimelineEntry {
            status: ReportStatus::Registered,
            comment: None,
            by_user_id: None,
            by_user_name: "Anonymous".to_string(),
            timestamp: OffsetDateTime::UNIX_EPOCH,
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["status"], "registered");
        assert_eq!(json["timestamp"], "1970-01-01T00:00:00Z");
        assert!(json.get("comment").is_none());

        let back: TimelineEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }
}
