//! Database models

use crate::progress::{clamp_percentage, PhaseProgress};
use crate::roles::Role;
use chrono::{Datelike, Months, NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Row of the user management listing
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    /// Active projects created by this user
    pub project_count: i64,
}

/// Values written by user create
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub password_hash: String,
    pub is_active: bool,
}

/// Values written by user edit. `password_hash` of `None` keeps the old password.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub password_hash: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Project {
    pub id: i64,
    pub project_name: String,
    pub contract_description: String,
    pub scope_of_work: String,
    pub contract_value_ngn: f64,
    pub contract_value_usd: f64,
    pub notice_of_award: Option<NaiveDate>,
    pub contract_signed: Option<NaiveDate>,
    pub commencement_date: Option<NaiveDate>,
    pub proposed_completion: Option<NaiveDate>,
    pub contractual_completion: Option<NaiveDate>,
    pub is_active: bool,
    pub created_by: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Editable project fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectInput {
    pub project_name: String,
    pub contract_description: String,
    pub scope_of_work: String,
    pub contract_value_ngn: f64,
    pub contract_value_usd: f64,
    pub notice_of_award: Option<NaiveDate>,
    pub contract_signed: Option<NaiveDate>,
    pub commencement_date: Option<NaiveDate>,
    pub proposed_completion: Option<NaiveDate>,
    pub contractual_completion: Option<NaiveDate>,
}

impl From<&Project> for ProjectInput {
    fn from(p: &Project) -> Self {
        Self {
            project_name: p.project_name.clone(),
            contract_description: p.contract_description.clone(),
            scope_of_work: p.scope_of_work.clone(),
            contract_value_ngn: p.contract_value_ngn,
            contract_value_usd: p.contract_value_usd,
            notice_of_award: p.notice_of_award,
            contract_signed: p.contract_signed,
            commencement_date: p.commencement_date,
            proposed_completion: p.proposed_completion,
            contractual_completion: p.contractual_completion,
        }
    }
}

/// One-to-one progress row of a project
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProgressRecord {
    pub project_id: i64,
    pub engineering_design: f64,
    pub procurement: f64,
    pub civil: f64,
    pub installation: f64,
    pub testing_commissioning: f64,
    pub disbursement_progress: f64,
    pub planned_progress: f64,
    pub actual_progress: f64,
    pub updated_by: Option<i64>,
    pub updated_at: NaiveDateTime,
}

impl ProgressRecord {
    pub fn phases(&self) -> PhaseProgress {
        PhaseProgress::new(
            self.engineering_design,
            self.procurement,
            self.civil,
            self.installation,
            self.testing_commissioning,
        )
    }
}

/// Submitted progress values
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressInput {
    pub phases: PhaseProgress,
    pub disbursement_progress: f64,
    pub planned_progress: f64,
    pub actual_progress: f64,
}

impl ProgressInput {
    /// Every percentage clamped into [0, 100]
    pub fn clamped(self) -> Self {
        Self {
            phases: self.phases.clamped(),
            disbursement_progress: clamp_percentage(self.disbursement_progress),
            planned_progress: clamp_percentage(self.planned_progress),
            actual_progress: clamp_percentage(self.actual_progress),
        }
    }
}

impl From<&ProgressRecord> for ProgressInput {
    fn from(r: &ProgressRecord) -> Self {
        Self {
            phases: r.phases(),
            disbursement_progress: r.disbursement_progress,
            planned_progress: r.planned_progress,
            actual_progress: r.actual_progress,
        }
    }
}

/// Active project joined with its (possibly missing) progress row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectOverview {
    pub id: i64,
    pub project_name: String,
    pub contract_value_ngn: f64,
    pub contract_value_usd: f64,
    pub commencement_date: Option<NaiveDate>,
    pub proposed_completion: Option<NaiveDate>,
    pub contractual_completion: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub created_by_name: Option<String>,
    pub engineering_design: Option<f64>,
    pub procurement: Option<f64>,
    pub civil: Option<f64>,
    pub installation: Option<f64>,
    pub testing_commissioning: Option<f64>,
    pub disbursement_progress: Option<f64>,
    pub planned_progress: Option<f64>,
    pub actual_progress: Option<f64>,
}

impl ProjectOverview {
    /// Phase values; a missing progress row counts as zero
    pub fn phases(&self) -> PhaseProgress {
        PhaseProgress::new(
            self.engineering_design.unwrap_or(0.0),
            self.procurement.unwrap_or(0.0),
            self.civil.unwrap_or(0.0),
            self.installation.unwrap_or(0.0),
            self.testing_commissioning.unwrap_or(0.0),
        )
    }

    pub fn overall_progress(&self) -> f64 {
        self.phases().overall()
    }
}

/// Project detail page data
#[derive(Debug, Clone)]
pub struct ProjectDetail {
    pub project: Project,
    pub progress: Option<ProgressRecord>,
    pub created_by_name: Option<String>,
}

impl ProjectDetail {
    pub fn phases(&self) -> PhaseProgress {
        self.progress
            .as_ref()
            .map(ProgressRecord::phases)
            .unwrap_or_default()
    }
}

/// The two activity logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    /// What happened this month (`monthly_summary`)
    Monthly,
    /// What is planned for next month (`planned_activities`)
    Planned,
}

impl ActivityKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "monthly" => Some(ActivityKind::Monthly),
            "planned" => Some(ActivityKind::Planned),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Monthly => "monthly",
            ActivityKind::Planned => "planned",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ActivityKind::Monthly => "Monthly",
            ActivityKind::Planned => "Planned",
        }
    }

    pub(crate) fn table_name(&self) -> &'static str {
        match self {
            ActivityKind::Monthly => "monthly_summary",
            ActivityKind::Planned => "planned_activities",
        }
    }

    /// First day of the month this log covers, relative to `today`
    pub fn period_start(&self, today: NaiveDate) -> NaiveDate {
        let first = today.with_day0(0).unwrap_or(today);
        match self {
            ActivityKind::Monthly => first,
            ActivityKind::Planned => first.checked_add_months(Months::new(1)).unwrap_or(first),
        }
    }

    /// `YYYY-MM` key of the month this log covers
    pub fn month_year(&self, today: NaiveDate) -> String {
        self.period_start(today).format("%Y-%m").to_string()
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Activity {
    pub id: i64,
    pub project_id: i64,
    pub month_year: String,
    pub serial_number: i64,
    pub activity_description: String,
    pub duration_weeks: i64,
    pub responsible_party: Option<String>,
    pub remarks: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct NewActivity {
    pub description: String,
    pub duration_weeks: i64,
    /// Planned activities only
    pub responsible_party: String,
    /// Planned activities only
    pub remarks: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectImage {
    pub id: i64,
    pub project_id: i64,
    pub image_filename: String,
    pub image_caption: Option<String>,
    pub uploaded_by: Option<i64>,
    pub uploaded_by_name: Option<String>,
    pub uploaded_at: NaiveDateTime,
}

/// Aggregates shown on the reports page
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct ReportStats {
    pub total_projects: i64,
    pub completed_projects: i64,
    pub total_value_ngn: f64,
    pub total_value_usd: f64,
    /// Average overall progress; projects without a progress row count as 0
    pub avg_progress: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_year_keys() {
        let today = NaiveDate::from_ymd_opt(2025, 12, 15).unwrap();
        assert_eq!(ActivityKind::Monthly.month_year(today), "2025-12");
        assert_eq!(ActivityKind::Planned.month_year(today), "2026-01");
    }

    #[test]
    fn test_planned_month_from_month_end() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        assert_eq!(ActivityKind::Planned.month_year(today), "2025-02");
    }

    #[test]
    fn test_activity_kind_parse() {
        assert_eq!(ActivityKind::parse("monthly"), Some(ActivityKind::Monthly));
        assert_eq!(ActivityKind::parse("planned"), Some(ActivityKind::Planned));
        assert_eq!(ActivityKind::parse("weekly"), None);
    }

    #[test]
    fn test_progress_input_clamped() {
        let input = ProgressInput {
            phases: PhaseProgress::new(120.0, 50.0, -1.0, 0.0, 100.0),
            disbursement_progress: 101.0,
            planned_progress: -3.0,
            actual_progress: 55.5,
        }
        .clamped();

        assert_eq!(input.phases, PhaseProgress::new(100.0, 50.0, 0.0, 0.0, 100.0));
        assert_eq!(input.disbursement_progress, 100.0);
        assert_eq!(input.planned_progress, 0.0);
        assert_eq!(input.actual_progress, 55.5);
    }
}
