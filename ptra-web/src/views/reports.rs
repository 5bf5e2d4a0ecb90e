//! Portfolio report

use ptra_common::db::{ProjectOverview, ReportStats};

use super::format::{date, dollars, escape, naira, percent, progress_bar};
use super::layout::{page, Flash, Nav};
use crate::session::SessionUser;

pub fn reports_page(
    user: &SessionUser,
    flash: &Flash,
    stats: &ReportStats,
    projects: &[ProjectOverview],
) -> String {
    let rows: Vec<String> = projects
        .iter()
        .map(|p| {
            let phases = p.phases();
            format!(
                r#"<tr><td><a href="/projects/{}">{}</a></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
                p.id,
                escape(&p.project_name),
                naira(p.contract_value_ngn),
                dollars(p.contract_value_usd),
                percent(phases.engineering_design),
                percent(phases.procurement),
                percent(phases.civil),
                percent(phases.installation),
                percent(phases.testing_commissioning),
                progress_bar(p.overall_progress()),
                date(p.contractual_completion),
            )
        })
        .collect();

    let table = if rows.is_empty() {
        r#"<p class="muted">No active projects.</p>"#.to_string()
    } else {
        format!(
            "<table><thead><tr><th>Project</th><th>NGN</th><th>USD</th><th>Eng.</th><th>Proc.</th><th>Civil</th><th>Inst.</th><th>T&amp;C</th><th>Overall</th><th>Completion</th></tr></thead><tbody>{}</tbody></table>",
            rows.join("\n")
        )
    };

    let body = format!(
        r#"<div class="stats">
    <div class="card stat"><div class="muted">Total projects</div><div class="value">{total}</div></div>
    <div class="card stat"><div class="muted">Completed</div><div class="value">{completed}</div></div>
    <div class="card stat"><div class="muted">Total value (NGN)</div><div class="value">{ngn}</div></div>
    <div class="card stat"><div class="muted">Total value (USD)</div><div class="value">{usd}</div></div>
    <div class="card stat"><div class="muted">Average progress</div><div class="value">{avg}</div></div>
</div>
<div class="card">{table}</div>"#,
        total = stats.total_projects,
        completed = stats.completed_projects,
        ngn = naira(stats.total_value_ngn),
        usd = dollars(stats.total_value_usd),
        avg = percent(stats.avg_progress),
        table = table,
    );

    page("Reports", Some(user), Nav::Reports, flash, &body)
}
