//! Activity log editor (monthly summary or planned activities)

use ptra_common::db::{Activity, ActivityKind, Project};
use ptra_common::validation::{ActivityForm, MAX_DURATION_WEEKS};

use super::format::{attr, escape, month_label};
use super::layout::{csrf_field, page, Flash, Nav};
use crate::session::SessionUser;

pub struct ActivitiesView<'a> {
    pub project: &'a Project,
    pub kind: ActivityKind,
    pub month_year: &'a str,
    pub activities: &'a [Activity],
    /// Sticky values after a failed add
    pub form: &'a ActivityForm,
}

pub fn activities_page(
    user: &SessionUser,
    flash: &Flash,
    view: &ActivitiesView<'_>,
    csrf_token: &str,
) -> String {
    let project = view.project;
    let action = format!(
        "/admin/projects/{}/activities?type={}",
        project.id,
        view.kind.as_str()
    );
    let planned = view.kind == ActivityKind::Planned;

    let rows: Vec<String> = view
        .activities
        .iter()
        .map(|a| {
            let extra = if planned {
                format!(
                    "<td>{}</td><td>{}</td>",
                    escape(a.responsible_party.as_deref().unwrap_or("")),
                    escape(a.remarks.as_deref().unwrap_or(""))
                )
            } else {
                String::new()
            };
            format!(
                r#"<tr><td>{serial}</td><td>{desc}</td><td>{weeks}</td>{extra}<td><form class="inline" method="post" action="{action}">{csrf}<input type="hidden" name="action" value="delete"><input type="hidden" name="activity_id" value="{id}"><button class="btn btn-danger" type="submit">Delete</button></form></td></tr>"#,
                serial = a.serial_number,
                desc = escape(&a.activity_description),
                weeks = a.duration_weeks,
                extra = extra,
                action = attr(&action),
                csrf = csrf_field(csrf_token),
                id = a.id,
            )
        })
        .collect();

    let extra_headers = if planned {
        "<th>Responsible</th><th>Remarks</th>"
    } else {
        ""
    };
    let table = if rows.is_empty() {
        r#"<p class="muted">No activities recorded for this month.</p>"#.to_string()
    } else {
        format!(
            "<table><thead><tr><th>S/N</th><th>Activity</th><th>Weeks</th>{}<th></th></tr></thead><tbody>{}</tbody></table>",
            extra_headers,
            rows.join("")
        )
    };

    let planned_fields = if planned {
        format!(
            r#"<label for="responsible_party">Responsible party</label><input type="text" id="responsible_party" name="responsible_party" value="{}">
    <label for="remarks">Remarks</label><input type="text" id="remarks" name="remarks" value="{}">"#,
            attr(&view.form.responsible_party),
            attr(&view.form.remarks)
        )
    } else {
        String::new()
    };

    let other = match view.kind {
        ActivityKind::Monthly => ActivityKind::Planned,
        ActivityKind::Planned => ActivityKind::Monthly,
    };

    let body = format!(
        r#"<p><strong>{name}</strong>: {month}</p>
<p><a class="btn btn-secondary" href="/admin/projects/{id}/activities?type={other}">{other_label} activities</a> <a class="btn btn-secondary" href="/projects/{id}">Back to project</a></p>
<div class="card">{table}</div>
<div class="card"><h2>Add activity</h2>
<form method="post" action="{action}">
    {csrf}
    <input type="hidden" name="action" value="add">
    <label for="activity_description">Activity description</label><textarea id="activity_description" name="activity_description" rows="2">{desc}</textarea>
    <label for="duration_weeks">Duration (weeks)</label><input type="number" id="duration_weeks" name="duration_weeks" min="1" max="{max_weeks}" value="{weeks}">
    {planned_fields}
    <p><button class="btn" type="submit">Add activity</button></p>
</form></div>"#,
        name = escape(&project.project_name),
        month = month_label(view.month_year),
        id = project.id,
        max_weeks = MAX_DURATION_WEEKS,
        other = other.as_str(),
        other_label = other.label(),
        table = table,
        action = attr(&action),
        csrf = csrf_field(csrf_token),
        desc = escape(&view.form.activity_description),
        weeks = attr(&view.form.duration_weeks),
        planned_fields = planned_fields,
    );

    let title = format!("{} Activities", view.kind.label());
    page(&title, Some(user), Nav::Projects, flash, &body)
}
