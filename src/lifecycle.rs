//! Report lifecycle rules: who may mutate a report, which status moves are
//! legal, and how the audit timeline is built.
//!
//! Everything here is pure over the model types; handlers load records,
//! run them through these functions, and persist the outcome.

use sqlx::types::Json;
use std::collections::BTreeMap;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::models::{
    NewReport, Report, ReportCategory, ReportComment, ReportPriority, ReportStatus, TimelineEntry,
    User, UserRole,
};

/// Upper bound on attached images per report.
pub const MAX_REPORT_IMAGES: usize = 5;

/// Roles permitted to change a report's status.
pub const STAFF_ROLES: &[UserRole] = &[UserRole::Admin, UserRole::Technician];

pub const ANONYMOUS_ACTOR: &str = "Anonymous";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    InvalidArgument(String),
}

/// Single capability check used by every mutating operation.
pub fn authorize(actor: &User, allowed: &[UserRole]) -> Result<(), LifecycleError> {
    if allowed.contains(&actor.role) {
        Ok(())
    } else {
        Err(LifecycleError::Forbidden(
            "insufficient role for this operation",
        ))
    }
}

/// The status graph is free: any status may follow any other, including
/// re-entering an earlier one. Role is the only guard. Tightening the graph
/// later only means changing this function.
pub fn transition_allowed(_from: ReportStatus, _to: ReportStatus) -> bool {
    true
}

/// Build a new report in `registered` state with its seed timeline entry.
/// The submitter may be anonymous; such reports are attributable to no
/// account and never surface in per-user filtered views.
pub fn open_report(input: NewReport, actor: Option<&User>) -> Result<Report, LifecycleError> {
    if input.title.trim().is_empty() {
        return Err(LifecycleError::InvalidArgument(
            "title must not be empty".to_string(),
        ));
    }
    if input.images.len() > MAX_REPORT_IMAGES {
        return Err(LifecycleError::InvalidArgument(format!(
            "at most {} images are allowed",
            MAX_REPORT_IMAGES
        )));
    }

    let now = OffsetDateTime::now_utc();
    let seed = TimelineEntry {
        status: ReportStatus::Registered,
        comment: None,
        by_user_id: actor.map(|user| user.id),
        by_user_name: actor
            .map(|user| user.name.clone())
            .unwrap_or_else(|| ANONYMOUS_ACTOR.to_string()),
        timestamp: now,
    };

    Ok(Report {
        id: Uuid::new_v4(),
        title: input.title,
        description: input.description,
        category: input.category,
        priority: input.priority,
        status: ReportStatus::Registered,
        location: input.location,
        images: input.images,
        created_by: actor.map(|user| user.id),
        created_by_name: actor.map(|user| user.name.clone()),
        assigned_to: None,
        assigned_to_name: None,
        timeline: Json(vec![seed]),
        created_at: now,
        updated_at: now,
    })
}

/// Append a status change to the timeline and move the report to the new
/// status. Staff only. A redundant update (same status, no comment) is
/// accepted and appended; the caller is expected to suppress those, the
/// manager keeps no idempotence guard.
pub fn apply_status(
    report: &mut Report,
    actor: &User,
    new_status: ReportStatus,
    comment: Option<String>,
) -> Result<TimelineEntry, LifecycleError> {
    authorize(actor, STAFF_ROLES)?;

    if !transition_allowed(report.status, new_status) {
        return Err(LifecycleError::InvalidArgument(format!(
            "transition {} -> {} is not allowed",
            report.status, new_status
        )));
    }

    let entry = TimelineEntry {
        status: new_status,
        comment: comment.filter(|text| !text.trim().is_empty()),
        by_user_id: Some(actor.id),
        by_user_name: actor.name.clone(),
        timestamp: OffsetDateTime::now_utc(),
    };

    report.timeline.0.push(entry.clone());
    report.status = new_status;
    report.updated_at = entry.timestamp;
    Ok(entry)
}

/// Point a report at a technician. Admin only, and the target must actually
/// hold the technician role. Assignment is a side attribute: it appends no
/// timeline entry and leaves the status untouched.
pub fn assign_technician(
    report: &mut Report,
    actor: &User,
    target: &User,
) -> Result<(), LifecycleError> {
    authorize(actor, &[UserRole::Admin])?;

    if target.role != UserRole::Technician {
        return Err(LifecycleError::InvalidArgument(format!(
            "user {} is not a technician",
            target.id
        )));
    }

    report.assigned_to = Some(target.id);
    report.assigned_to_name = Some(target.name.clone());
    report.updated_at = OffsetDateTime::now_utc();
    Ok(())
}

/// Build a comment on a report. Any authenticated identity may comment;
/// anonymous callers may not. Comments never touch status or timeline.
pub fn record_comment(
    report: &Report,
    actor: Option<&User>,
    text: &str,
) -> Result<ReportComment, LifecycleError> {
    let actor = actor.ok_or(LifecycleError::Unauthorized)?;

    if text.trim().is_empty() {
        return Err(LifecycleError::InvalidArgument(
            "comment text must not be empty".to_string(),
        ));
    }

    Ok(ReportComment {
        id: Uuid::new_v4(),
        report_id: report.id,
        user_id: actor.id,
        user_name: actor.name.clone(),
        text: text.to_string(),
        created_at: OffsetDateTime::now_utc(),
    })
}

/// Conjunctive report filter. `search` matches case-insensitively against
/// title or description substrings.
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub category: Option<ReportCategory>,
    pub priority: Option<ReportPriority>,
    pub created_by: Option<Uuid>,
    pub search: Option<String>,
}

impl ReportFilter {
    /// The authority on filter semantics; SQL narrowing in the repository
    /// must stay a subset of this predicate.
    pub fn matches(&self, report: &Report) -> bool {
        if let Some(status) = self.status {
            if report.status != status {
                return false;
            }
        }
        if let Some(category) = self.category {
            if report.category != category {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if report.priority != priority {
                return false;
            }
        }
        if let Some(created_by) = self.created_by {
            if report.created_by != Some(created_by) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_title = report.title.to_lowercase().contains(&needle);
            let in_description = report
                .description
                .as_deref()
                .map(|text| text.to_lowercase().contains(&needle))
                .unwrap_or(false);
            if !in_title && !in_description {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AnalyticsSummary {
    pub total_reports: u64,
    pub open_reports: u64,
    pub resolved_reports: u64,
    pub status_counts: BTreeMap<&'static str, u64>,
    pub category_counts: BTreeMap<&'static str, u64>,
}

/// Aggregate counts over the full report set.
pub fn summarize(reports: &[Report]) -> AnalyticsSummary {
    let mut status_counts = BTreeMap::new();
    let mut category_counts = BTreeMap::new();
    let mut open_reports = 0;
    let mut resolved_reports = 0;

    for report in reports {
        *status_counts.entry(report.status.as_str()).or_insert(0) += 1;
        *category_counts.entry(report.category.as_str()).or_insert(0) += 1;
        if report.status.is_open() {
            open_reports += 1;
        }
        if report.status == ReportStatus::Resolved {
            resolved_reports += 1;
        }
    }

    AnalyticsSummary {
        total_reports: reports.len() as u64,
        open_reports,
        resolved_reports,
        status_counts,
        category_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Location;

    fn user(name: &str, role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            password_hash: "$2b$12$hash".to_string(),
            phone: None,
            role,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn submission(title: &str, category: ReportCategory) -> NewReport {
        NewReport {
            title: title.to_string(),
            description: Some("Deep pothole near the crosswalk".to_string()),
            category,
            priority: ReportPriority::High,
            location: Location {
                latitude: 40.0,
                longitude: -75.0,
                address: Some("123 Main St".to_string()),
            },
            images: Vec::new(),
        }
    }

    #[test]
    fn new_report_is_registered_with_seed_entry() {
        let citizen = user("Ada", UserRole::Citizen);
        let report =
            open_report(submission("Pothole on Main St", ReportCategory::Road), Some(&citizen))
                .unwrap();

        assert_eq!(report.status, ReportStatus::Registered);
        assert_eq!(report.timeline.0.len(), 1);
        assert_eq!(report.timeline.0[0].status, ReportStatus::Registered);
        assert_eq!(report.timeline.0[0].comment, None);
        assert_eq!(report.timeline.0[0].by_user_id, Some(citizen.id));
        assert_eq!(report.timeline.0[0].by_user_name, "Ada");
        assert_eq!(report.created_by, Some(citizen.id));
        assert!(report.images.is_empty());
    }

    #[test]
    fn anonymous_report_is_unattributed() {
        let report = open_report(submission("Broken lamp", ReportCategory::Streetlight), None)
            .unwrap();

        assert_eq!(report.created_by, None);
        assert_eq!(report.timeline.0[0].by_user_id, None);
        assert_eq!(report.timeline.0[0].by_user_name, ANONYMOUS_ACTOR);
        // Unreachable through any per-user view.
        let mine = ReportFilter {
            created_by: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert!(!mine.matches(&report));
    }

    #[test]
    fn empty_title_is_rejected() {
        let err = open_report(submission("  ", ReportCategory::Road), None).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidArgument(_)));
    }

    #[test]
    fn too_many_images_are_rejected() {
        let mut input = submission("Flooded underpass", ReportCategory::Water);
        input.images = (0..6).map(|i| format!("/uploads/{}.jpg", i)).collect();
        let err = open_report(input, None).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidArgument(_)));
    }

    #[test]
    fn status_always_mirrors_last_timeline_entry() {
        let admin = user("Root", UserRole::Admin);
        let mut report =
            open_report(submission("Pothole on Main St", ReportCategory::Road), None).unwrap();

        let moves = [
            (ReportStatus::InProgress, Some("Crew dispatched".to_string())),
            (ReportStatus::Resolved, Some("Fixed".to_string())),
            (ReportStatus::Closed, None),
        ];
        for (status, comment) in moves {
            apply_status(&mut report, &admin, status, comment).unwrap();
            assert_eq!(report.status, report.timeline.0.last().unwrap().status);
        }
        assert_eq!(report.timeline.0.len(), 1 + 3);
    }

    #[test]
    fn update_records_actor_and_comment() {
        let admin = user("Root", UserRole::Admin);
        let mut report =
            open_report(submission("Pothole on Main St", ReportCategory::Road), None).unwrap();
        apply_status(&mut report, &admin, ReportStatus::InProgress, None).unwrap();

        let entry = apply_status(
            &mut report,
            &admin,
            ReportStatus::Resolved,
            Some("Fixed".to_string()),
        )
        .unwrap();

        assert_eq!(entry.status, ReportStatus::Resolved);
        assert_eq!(entry.comment.as_deref(), Some("Fixed"));
        assert_eq!(entry.by_user_id, Some(admin.id));
        assert_eq!(report.status, ReportStatus::Resolved);
    }

    #[test]
    fn citizens_cannot_change_status() {
        let citizen = user("Ada", UserRole::Citizen);
        let mut report =
            open_report(submission("Pothole on Main St", ReportCategory::Road), None).unwrap();

        let err =
            apply_status(&mut report, &citizen, ReportStatus::Resolved, None).unwrap_err();
        assert!(matches!(err, LifecycleError::Forbidden(_)));
        assert_eq!(report.timeline.0.len(), 1);
        assert_eq!(report.status, ReportStatus::Registered);
    }

    #[test]
    fn transition_graph_is_free() {
        let technician = user("Tess", UserRole::Technician);
        let mut report =
            open_report(submission("Pothole on Main St", ReportCategory::Road), None).unwrap();

        // registered -> resolved directly, then back to registered.
        apply_status(&mut report, &technician, ReportStatus::Resolved, None).unwrap();
        apply_status(&mut report, &technician, ReportStatus::Registered, None).unwrap();
        assert_eq!(report.status, ReportStatus::Registered);
        assert_eq!(report.timeline.0.len(), 3);
    }

    #[test]
    fn redundant_update_is_accepted_and_appended() {
        let admin = user("Root", UserRole::Admin);
        let mut report =
            open_report(submission("Pothole on Main St", ReportCategory::Road), None).unwrap();

        apply_status(&mut report, &admin, ReportStatus::Registered, None).unwrap();
        assert_eq!(report.timeline.0.len(), 2);
        assert_eq!(report.status, ReportStatus::Registered);
    }

    #[test]
    fn blank_comment_is_dropped_from_entry() {
        let admin = user("Root", UserRole::Admin);
        let mut report =
            open_report(submission("Pothole on Main St", ReportCategory::Road), None).unwrap();

        let entry = apply_status(
            &mut report,
            &admin,
            ReportStatus::InProgress,
            Some("   ".to_string()),
        )
        .unwrap();
        assert_eq!(entry.comment, None);
    }

    #[test]
    fn only_admins_assign() {
        let technician = user("Tess", UserRole::Technician);
        let target = user("Tom", UserRole::Technician);
        let mut report =
            open_report(submission("Pothole on Main St", ReportCategory::Road), None).unwrap();

        let err = assign_technician(&mut report, &technician, &target).unwrap_err();
        assert!(matches!(err, LifecycleError::Forbidden(_)));
        assert_eq!(report.assigned_to, None);
    }

    #[test]
    fn assignment_target_must_be_a_technician() {
        let admin = user("Root", UserRole::Admin);
        let target = user("Ada", UserRole::Citizen);
        let mut report =
            open_report(submission("Pothole on Main St", ReportCategory::Road), None).unwrap();

        let err = assign_technician(&mut report, &admin, &target).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidArgument(_)));
        assert_eq!(report.assigned_to, None);
    }

    #[test]
    fn assignment_sets_assignee_without_touching_timeline() {
        let admin = user("Root", UserRole::Admin);
        let target = user("Tess", UserRole::Technician);
        let mut report =
            open_report(submission("Pothole on Main St", ReportCategory::Road), None).unwrap();

        assign_technician(&mut report, &admin, &target).unwrap();
        assert_eq!(report.assigned_to, Some(target.id));
        assert_eq!(report.assigned_to_name.as_deref(), Some("Tess"));
        assert_eq!(report.status, ReportStatus::Registered);
        assert_eq!(report.timeline.0.len(), 1);

        // Reassignment replaces, never clears.
        let other = user("Tom", UserRole::Technician);
        assign_technician(&mut report, &admin, &other).unwrap();
        assert_eq!(report.assigned_to, Some(other.id));
    }

    #[test]
    fn comments_require_an_authenticated_actor() {
        let report =
            open_report(submission("Pothole on Main St", ReportCategory::Road), None).unwrap();

        let err = record_comment(&report, None, "Any update?").unwrap_err();
        assert_eq!(err, LifecycleError::Unauthorized);

        let citizen = user("Ada", UserRole::Citizen);
        let comment = record_comment(&report, Some(&citizen), "Any update?").unwrap();
        assert_eq!(comment.report_id, report.id);
        assert_eq!(comment.user_id, citizen.id);
        assert_eq!(comment.text, "Any update?");
    }

    #[test]
    fn empty_comment_text_is_rejected() {
        let citizen = user("Ada", UserRole::Citizen);
        let report =
            open_report(submission("Pothole on Main St", ReportCategory::Road), None).unwrap();

        let err = record_comment(&report, Some(&citizen), "  ").unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidArgument(_)));
    }

    #[test]
    fn filters_are_conjunctive() {
        let admin = user("Root", UserRole::Admin);
        let mut resolved_road =
            open_report(submission("Pothole on Main St", ReportCategory::Road), None).unwrap();
        apply_status(&mut resolved_road, &admin, ReportStatus::Resolved, None).unwrap();

        let mut resolved_water =
            open_report(submission("Burst main", ReportCategory::Water), None).unwrap();
        apply_status(&mut resolved_water, &admin, ReportStatus::Resolved, None).unwrap();

        let open_road =
            open_report(submission("Cracked asphalt", ReportCategory::Road), None).unwrap();

        let filter = ReportFilter {
            status: Some(ReportStatus::Resolved),
            category: Some(ReportCategory::Road),
            ..Default::default()
        };

        assert!(filter.matches(&resolved_road));
        assert!(!filter.matches(&resolved_water));
        assert!(!filter.matches(&open_road));
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_description() {
        let report =
            open_report(submission("Pothole on Main St", ReportCategory::Road), None).unwrap();

        let by_title = ReportFilter {
            search: Some("pothole".to_string()),
            ..Default::default()
        };
        let by_description = ReportFilter {
            search: Some("CROSSWALK".to_string()),
            ..Default::default()
        };
        let miss = ReportFilter {
            search: Some("graffiti".to_string()),
            ..Default::default()
        };

        assert!(by_title.matches(&report));
        assert!(by_description.matches(&report));
        assert!(!miss.matches(&report));
    }

    #[test]
    fn summary_counts_by_status_and_category() {
        let admin = user("Root", UserRole::Admin);
        let mut reports = vec![
            open_report(submission("Pothole on Main St", ReportCategory::Road), None).unwrap(),
            open_report(submission("Burst main", ReportCategory::Water), None).unwrap(),
            open_report(submission("Dark street", ReportCategory::Streetlight), None).unwrap(),
            open_report(submission("More potholes", ReportCategory::Road), None).unwrap(),
        ];
        apply_status(&mut reports[0], &admin, ReportStatus::Resolved, None).unwrap();
        apply_status(&mut reports[1], &admin, ReportStatus::InProgress, None).unwrap();
        apply_status(&mut reports[2], &admin, ReportStatus::Closed, None).unwrap();

        let summary = summarize(&reports);
        assert_eq!(summary.total_reports, 4);
        // registered + in_progress are open; closed is neither open nor resolved.
        assert_eq!(summary.open_reports, 2);
        assert_eq!(summary.resolved_reports, 1);
        assert_eq!(summary.status_counts["resolved"], 1);
        assert_eq!(summary.status_counts["registered"], 1);
        assert_eq!(summary.category_counts["road"], 2);
        assert_eq!(summary.category_counts["water"], 1);
    }

    #[test]
    fn summary_of_nothing_is_zeroes() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_reports, 0);
        assert_eq!(summary.open_reports, 0);
        assert!(summary.status_counts.is_empty());
    }
}
