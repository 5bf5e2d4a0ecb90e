//! Dashboard: summary counts and one card per active project

use chrono::NaiveDate;
use ptra_common::db::ProjectOverview;
use ptra_common::progress::ScheduleStatus;
use ptra_common::Role;

use super::format::{escape, naira, percent, progress_bar};
use super::layout::{page, Flash, Nav};
use crate::session::SessionUser;

/// Counts shown above the project cards
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSummary {
    pub total: usize,
    pub completed: usize,
    pub overdue: usize,
    pub average_progress: f64,
}

impl DashboardSummary {
    pub fn from_projects(projects: &[ProjectOverview], today: NaiveDate) -> Self {
        let total = projects.len();
        let completed = projects.iter().filter(|p| p.phases().is_complete()).count();
        let overdue = projects
            .iter()
            .filter(|p| {
                !p.phases().is_complete()
                    && ScheduleStatus::from_completion(p.contractual_completion, today)
                        == ScheduleStatus::Overdue
            })
            .count();
        let average_progress = if total == 0 {
            0.0
        } else {
            projects.iter().map(|p| p.overall_progress()).sum::<f64>() / total as f64
        };

        Self {
            total,
            completed,
            overdue,
            average_progress,
        }
    }
}

fn project_card(project: &ProjectOverview, user: &SessionUser, today: NaiveDate) -> String {
    let status = ScheduleStatus::from_completion(project.contractual_completion, today);
    let planned = project.planned_progress.unwrap_or(0.0);
    let actual = project.actual_progress.unwrap_or(0.0);

    let actions = if user.role.satisfies(Role::Pm) {
        format!(
            r#" <a class="btn btn-secondary" href="/admin/projects/{id}/edit">Edit</a> <a class="btn btn-secondary" href="/admin/projects/{id}/progress">Progress</a>"#,
            id = project.id
        )
    } else {
        String::new()
    };

    format!(
        r#"<div class="card">
    <h3><a href="/projects/{id}">{name}</a> <span class="badge bg-{status_class}">{status}</span></h3>
    <p class="muted">{value}</p>
    <p>Overall progress</p>{overall}
    <p>Disbursement</p>{disbursement}
    <p>Planned {planned} / Actual {actual}</p>{actual_bar}
    <p><a class="btn" href="/projects/{id}">View</a>{actions}</p>
</div>"#,
        id = project.id,
        name = escape(&project.project_name),
        status_class = status.css_class(),
        status = status.label(),
        value = naira(project.contract_value_ngn),
        overall = progress_bar(project.overall_progress()),
        disbursement = progress_bar(project.disbursement_progress.unwrap_or(0.0)),
        planned = percent(planned),
        actual = percent(actual),
        actual_bar = progress_bar(actual),
        actions = actions,
    )
}

pub fn dashboard_page(
    user: &SessionUser,
    flash: &Flash,
    projects: &[ProjectOverview],
    today: NaiveDate,
) -> String {
    let summary = DashboardSummary::from_projects(projects, today);

    let stats = format!(
        r#"<div class="stats">
    <div class="card stat"><div class="muted">Active projects</div><div class="value">{}</div></div>
    <div class="card stat"><div class="muted">Completed</div><div class="value">{}</div></div>
    <div class="card stat"><div class="muted">Overdue</div><div class="value">{}</div></div>
    <div class="card stat"><div class="muted">Average progress</div><div class="value">{}</div></div>
</div>"#,
        summary.total,
        summary.completed,
        summary.overdue,
        percent(summary.average_progress)
    );

    let new_button = if user.role.satisfies(Role::Pm) {
        r#"<p><a class="btn" href="/admin/projects/new">New project</a></p>"#
    } else {
        ""
    };

    let cards = if projects.is_empty() {
        r#"<p class="muted">No projects yet.</p>"#.to_string()
    } else {
        let cards: Vec<String> = projects.iter().map(|p| project_card(p, user, today)).collect();
        format!(r#"<div class="cards">{}</div>"#, cards.join("\n"))
    };

    let body = format!(
        "<p>Welcome, {}.</p>\n{}\n{}\n{}",
        escape(&user.full_name),
        stats,
        new_button,
        cards
    );
    page("Dashboard", Some(user), Nav::Dashboard, flash, &body)
}
