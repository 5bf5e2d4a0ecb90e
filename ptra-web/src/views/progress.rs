//! Progress update form

use ptra_common::db::{ProgressInput, Project};

use super::format::{escape, percent};
use super::layout::{csrf_field, page, Flash, Nav};
use crate::session::SessionUser;

fn percent_input(name: &str, label: &str, value: f64) -> String {
    format!(
        r#"<label for="{name}">{label}</label><input type="number" id="{name}" name="{name}" min="0" max="100" step="0.01" value="{value:.2}">"#,
        name = name,
        label = label,
        value = value
    )
}

pub fn progress_form_page(
    user: &SessionUser,
    flash: &Flash,
    project: &Project,
    current: &ProgressInput,
    csrf_token: &str,
) -> String {
    let phases = &current.phases;
    let body = format!(
        r#"<div class="card">
<p><strong>{name}</strong>: current overall progress {overall}</p>
<form method="post" action="/admin/projects/{id}/progress">
    {csrf}
    <h2>Phases</h2>
    {eng}
    {procurement}
    {civil}
    {inst}
    {test}
    <h2>Tracking</h2>
    {disb}
    {planned}
    {actual}
    <p><button class="btn" type="submit">Save progress</button> <a class="btn btn-secondary" href="/projects/{id}">Cancel</a></p>
</form>
</div>"#,
        name = escape(&project.project_name),
        overall = percent(phases.overall()),
        id = project.id,
        csrf = csrf_field(csrf_token),
        eng = percent_input("engineering_design", "Engineering design (20%)", phases.engineering_design),
        procurement = percent_input("procurement", "Procurement (25%)", phases.procurement),
        civil = percent_input("civil", "Civil works (25%)", phases.civil),
        inst = percent_input("installation", "Installation (25%)", phases.installation),
        test = percent_input(
            "testing_commissioning",
            "Testing &amp; commissioning (5%)",
            phases.testing_commissioning
        ),
        disb = percent_input("disbursement_progress", "Disbursement progress", current.disbursement_progress),
        planned = percent_input("planned_progress", "Planned progress", current.planned_progress),
        actual = percent_input("actual_progress", "Actual progress", current.actual_progress),
    );

    page("Update Progress", Some(user), Nav::Projects, flash, &body)
}
