//! Project list, project form and project detail pages

use chrono::NaiveDate;
use ptra_common::db::{Activity, ActivityKind, ProjectDetail, ProjectImage, ProjectOverview};
use ptra_common::progress::ScheduleStatus;
use ptra_common::validation::ProjectForm;
use ptra_common::Role;

use super::format::{attr, date, dollars, escape, month_label, naira, percent, progress_bar, timestamp};
use super::layout::{csrf_field, page, Flash, Nav};
use crate::session::SessionUser;

pub fn projects_page(
    user: &SessionUser,
    flash: &Flash,
    projects: &[ProjectOverview],
    csrf_token: &str,
) -> String {
    let is_pm = user.role.satisfies(Role::Pm);
    let is_admin = user.role == Role::Admin;

    let rows: Vec<String> = projects
        .iter()
        .map(|p| {
            let mut actions = format!(r#"<a class="btn" href="/projects/{}">View</a>"#, p.id);
            if is_pm {
                actions.push_str(&format!(
                    r#" <a class="btn btn-secondary" href="/admin/projects/{id}/edit">Edit</a> <a class="btn btn-secondary" href="/admin/projects/{id}/progress">Progress</a> <a class="btn btn-secondary" href="/admin/projects/{id}/activities?type=monthly">Activities</a>"#,
                    id = p.id
                ));
            }
            if is_admin {
                actions.push_str(&format!(
                    r#" <form class="inline" method="post" action="/admin/projects/delete" onsubmit="return confirm('Delete this project?');">{}<input type="hidden" name="project_id" value="{}"><button class="btn btn-danger" type="submit">Delete</button></form>"#,
                    csrf_field(csrf_token),
                    p.id
                ));
            }
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&p.project_name),
                naira(p.contract_value_ngn),
                date(p.contractual_completion),
                progress_bar(p.overall_progress()),
                escape(p.created_by_name.as_deref().unwrap_or("Unknown")),
                actions
            )
        })
        .collect();

    let new_button = if is_pm {
        r#"<p><a class="btn" href="/admin/projects/new">New project</a></p>"#
    } else {
        ""
    };

    let table = if rows.is_empty() {
        r#"<p class="muted">No projects found.</p>"#.to_string()
    } else {
        format!(
            "<table><thead><tr><th>Project</th><th>Contract value</th><th>Completion</th><th>Overall</th><th>Created by</th><th></th></tr></thead><tbody>{}</tbody></table>",
            rows.join("\n")
        )
    };

    page(
        "Projects",
        Some(user),
        Nav::Projects,
        flash,
        &format!("{}\n{}", new_button, table),
    )
}

fn text_input(name: &str, label: &str, value: &str, kind: &str) -> String {
    format!(
        r#"<label for="{name}">{label}</label><input type="{kind}" id="{name}" name="{name}" value="{value}">"#,
        name = name,
        label = label,
        kind = kind,
        value = attr(value)
    )
}

fn text_area(name: &str, label: &str, value: &str) -> String {
    format!(
        r#"<label for="{name}">{label}</label><textarea id="{name}" name="{name}" rows="3">{value}</textarea>"#,
        name = name,
        label = label,
        value = escape(value)
    )
}

/// Create (`project_id` of `None`) or edit form
pub fn project_form_page(
    user: &SessionUser,
    flash: &Flash,
    project_id: Option<i64>,
    form: &ProjectForm,
    csrf_token: &str,
) -> String {
    let (title, action) = match project_id {
        Some(id) => ("Edit Project".to_string(), format!("/admin/projects/{}/edit", id)),
        None => ("New Project".to_string(), "/admin/projects/new".to_string()),
    };

    let body = format!(
        r#"<div class="card"><form method="post" action="{action}">
    {csrf}
    {name}
    {description}
    {scope}
    {ngn}
    {usd}
    {award}
    {signed}
    {commencement}
    {proposed}
    {contractual}
    <p><button class="btn" type="submit">Save project</button> <a class="btn btn-secondary" href="/admin/projects">Cancel</a></p>
</form></div>"#,
        action = action,
        csrf = csrf_field(csrf_token),
        name = text_input("project_name", "Project name *", &form.project_name, "text"),
        description = text_area("contract_description", "Contract description", &form.contract_description),
        scope = text_area("scope_of_work", "Scope of work", &form.scope_of_work),
        ngn = text_input("contract_value_ngn", "Contract value (NGN) *", &form.contract_value_ngn, "text"),
        usd = text_input("contract_value_usd", "Contract value (USD)", &form.contract_value_usd, "text"),
        award = text_input("notice_of_award", "Notice of award", &form.notice_of_award, "date"),
        signed = text_input("contract_signed", "Contract signed", &form.contract_signed, "date"),
        commencement = text_input("commencement_date", "Commencement date", &form.commencement_date, "date"),
        proposed = text_input("proposed_completion", "Proposed completion", &form.proposed_completion, "date"),
        contractual = text_input(
            "contractual_completion",
            "Contractual completion",
            &form.contractual_completion,
            "date"
        ),
    );

    page(&title, Some(user), Nav::Projects, flash, &body)
}

fn activity_table(kind: ActivityKind, activities: &[Activity]) -> String {
    if activities.is_empty() {
        return r#"<p class="muted">No activities recorded.</p>"#.to_string();
    }
    let planned = kind == ActivityKind::Planned;
    let rows: Vec<String> = activities
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
                "<tr><td>{}</td><td>{}</td><td>{}</td>{}</tr>",
                a.serial_number,
                escape(&a.activity_description),
                a.duration_weeks,
                extra
            )
        })
        .collect();
    let extra_headers = if planned {
        "<th>Responsible</th><th>Remarks</th>"
    } else {
        ""
    };
    format!(
        "<table><thead><tr><th>S/N</th><th>Activity</th><th>Weeks</th>{}</tr></thead><tbody>{}</tbody></table>",
        extra_headers,
        rows.join("")
    )
}

/// Everything shown on the project detail page
pub struct ProjectDetailView<'a> {
    pub detail: &'a ProjectDetail,
    pub monthly: &'a [Activity],
    pub monthly_key: &'a str,
    pub planned: &'a [Activity],
    pub planned_key: &'a str,
    pub images: &'a [ProjectImage],
    pub today: NaiveDate,
}

pub fn project_detail_page(
    user: &SessionUser,
    flash: &Flash,
    view: &ProjectDetailView<'_>,
    csrf_token: &str,
) -> String {
    let project = &view.detail.project;
    let phases = view.detail.phases();
    let progress = view.detail.progress.as_ref();
    let status = ScheduleStatus::from_completion(project.contractual_completion, view.today);
    let is_pm = user.role.satisfies(Role::Pm);

    let actions = if is_pm {
        format!(
            r#"<p><a class="btn btn-secondary" href="/admin/projects/{id}/edit">Edit project</a> <a class="btn btn-secondary" href="/admin/projects/{id}/progress">Update progress</a> <a class="btn btn-secondary" href="/admin/projects/{id}/activities?type=monthly">Monthly summary</a> <a class="btn btn-secondary" href="/admin/projects/{id}/activities?type=planned">Planned activities</a></p>"#,
            id = project.id
        )
    } else {
        String::new()
    };

    let info = format!(
        r#"<div class="card">
    <p><span class="badge bg-{status_class}">{status}</span></p>
    <p><strong>Contract value:</strong> {ngn} / {usd}</p>
    <p><strong>Description:</strong> {description}</p>
    <p><strong>Scope of work:</strong> {scope}</p>
    <table>
        <tr><th>Notice of award</th><td>{award}</td><th>Contract signed</th><td>{signed}</td></tr>
        <tr><th>Commencement</th><td>{commencement}</td><th>Proposed completion</th><td>{proposed}</td></tr>
        <tr><th>Contractual completion</th><td>{contractual}</td><th>Created by</th><td>{created_by}</td></tr>
    </table>
</div>"#,
        status_class = status.css_class(),
        status = status.label(),
        ngn = naira(project.contract_value_ngn),
        usd = dollars(project.contract_value_usd),
        description = escape(&project.contract_description),
        scope = escape(&project.scope_of_work),
        award = date(project.notice_of_award),
        signed = date(project.contract_signed),
        commencement = date(project.commencement_date),
        proposed = date(project.proposed_completion),
        contractual = date(project.contractual_completion),
        created_by = escape(view.detail.created_by_name.as_deref().unwrap_or("Unknown")),
    );

    let progress_card = format!(
        r#"<div class="card">
    <h2>Progress</h2>
    <p><strong>Overall:</strong> {overall_text}</p>{overall}
    <table>
        <tr><td>Engineering design (20%)</td><td>{eng}</td></tr>
        <tr><td>Procurement (25%)</td><td>{procurement}</td></tr>
        <tr><td>Civil works (25%)</td><td>{civil}</td></tr>
        <tr><td>Installation (25%)</td><td>{inst}</td></tr>
        <tr><td>Testing &amp; commissioning (5%)</td><td>{test}</td></tr>
        <tr><td>Disbursement</td><td>{disb}</td></tr>
        <tr><td>Planned</td><td>{planned}</td></tr>
        <tr><td>Actual</td><td>{actual}</td></tr>
    </table>
</div>"#,
        overall_text = percent(phases.overall()),
        overall = progress_bar(phases.overall()),
        eng = progress_bar(phases.engineering_design),
        procurement = progress_bar(phases.procurement),
        civil = progress_bar(phases.civil),
        inst = progress_bar(phases.installation),
        test = progress_bar(phases.testing_commissioning),
        disb = progress_bar(progress.map_or(0.0, |p| p.disbursement_progress)),
        planned = percent(progress.map_or(0.0, |p| p.planned_progress)),
        actual = percent(progress.map_or(0.0, |p| p.actual_progress)),
    );

    let activities = format!(
        r#"<div class="card"><h2>Monthly summary: {monthly_label}</h2>{monthly}</div>
<div class="card"><h2>Planned activities: {planned_label}</h2>{planned}</div>"#,
        monthly_label = month_label(view.monthly_key),
        monthly = activity_table(ActivityKind::Monthly, view.monthly),
        planned_label = month_label(view.planned_key),
        planned = activity_table(ActivityKind::Planned, view.planned),
    );

    let gallery_items: Vec<String> = view
        .images
        .iter()
        .map(|img| {
            format!(
                r#"<figure><a href="/uploads/{file}"><img src="/uploads/{file}" alt="{alt}"></a><figcaption>{caption}<br><span class="muted">{who}, {when}</span></figcaption></figure>"#,
                file = attr(&urlencoding::encode(&img.image_filename)),
                alt = attr(img.image_caption.as_deref().unwrap_or(&project.project_name)),
                caption = escape(img.image_caption.as_deref().unwrap_or("")),
                who = escape(img.uploaded_by_name.as_deref().unwrap_or("Unknown")),
                when = timestamp(img.uploaded_at),
            )
        })
        .collect();
    let gallery = if gallery_items.is_empty() {
        r#"<p class="muted">No images uploaded.</p>"#.to_string()
    } else {
        format!(r#"<div class="gallery">{}</div>"#, gallery_items.join(""))
    };

    let upload_form = if is_pm {
        format!(
            r#"<form method="post" action="/projects/{id}/images" enctype="multipart/form-data">
    {csrf}
    <label for="image">Image (JPG, PNG or GIF, max 5MB)</label><input type="file" id="image" name="image" accept="image/*" required>
    <label for="caption">Caption</label><input type="text" id="caption" name="caption">
    <p><button class="btn" type="submit">Upload</button></p>
</form>"#,
            id = project.id,
            csrf = csrf_field(csrf_token)
        )
    } else {
        String::new()
    };

    let body = format!(
        "{actions}\n{info}\n{progress_card}\n{activities}\n<div class=\"card\"><h2>Gallery</h2>{gallery}{upload_form}</div>",
    );

    page(&project.project_name, Some(user), Nav::Projects, flash, &body)
}
