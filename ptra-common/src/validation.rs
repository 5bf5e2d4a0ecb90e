//! Form validation
//!
//! Submitted forms arrive as strings. Each `validate` collects every
//! problem into [`ValidationErrors`] instead of stopping at the first one,
//! and on success yields typed values ready for the database layer.

use crate::db::{NewActivity, ProgressInput, ProjectInput};
use crate::progress::PhaseProgress;
use crate::roles::Role;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fmt;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;
/// Longest activity the logs accept, in weeks
pub const MAX_DURATION_WEEKS: i64 = 52;

/// Accumulated validation messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    messages: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// All messages joined into one line
    pub fn message(&self) -> String {
        self.messages.join(" ")
    }

    pub fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for ValidationErrors {}

/// Minimal structural email check: `local@domain.tld`, no whitespace
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

/// Lenient number parse: blank or malformed input reads as zero
fn parse_number(raw: &str) -> f64 {
    raw.trim()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn parse_date(raw: &str, label: &str, errors: &mut ValidationErrors) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push(format!("{} must be a valid date.", label));
            None
        }
    }
}

/// User create/edit form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserForm {
    pub csrf_token: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub password: String,
    pub confirm_password: String,
    /// Checkbox: present when checked
    pub is_active: Option<String>,
}

/// Who is submitting a [`UserForm`] and against which record
#[derive(Debug, Clone, Copy)]
pub struct UserFormContext {
    pub is_new: bool,
    /// The actor's current role, set when the actor edits their own account
    pub own_role: Option<Role>,
}

/// Validated user form values. `password` is `None` when left blank on edit.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub password: Option<String>,
    pub is_active: bool,
}

impl UserForm {
    pub fn is_active_checked(&self) -> bool {
        self.is_active.as_deref().is_some_and(|v| !v.is_empty() && v != "0")
    }

    pub fn validate(&self, ctx: UserFormContext) -> Result<ValidUser, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let username = self.username.trim().to_string();
        let email = self.email.trim().to_string();
        let full_name = self.full_name.trim().to_string();
        let is_active = self.is_active_checked();

        if username.is_empty() {
            errors.push("Username is required.");
        } else if username.chars().count() < MIN_USERNAME_LEN {
            errors.push("Username must be at least 3 characters long.");
        }

        if !is_valid_email(&email) {
            errors.push("Valid email address is required.");
        }

        if full_name.is_empty() {
            errors.push("Full name is required.");
        }

        let role = self.role.parse::<Role>().ok();
        if role.is_none() {
            errors.push("Invalid role selected.");
        }

        let password = if ctx.is_new || !self.password.is_empty() {
            if ctx.is_new && self.password.is_empty() {
                errors.push("Password is required for new users.");
            } else if self.password.chars().count() < MIN_PASSWORD_LEN {
                errors.push("Password must be at least 6 characters long.");
            } else if self.password != self.confirm_password {
                errors.push("Passwords do not match.");
            }
            Some(self.password.clone())
        } else {
            None
        };

        if let Some(own_role) = ctx.own_role {
            if role.is_some_and(|r| r != own_role) {
                errors.push("You cannot change your own role.");
            }
            if !is_active {
                errors.push("You cannot deactivate your own account.");
            }
        }

        match role {
            Some(role) if errors.is_empty() => Ok(ValidUser {
                username,
                email,
                full_name,
                role,
                password,
                is_active,
            }),
            _ => Err(errors),
        }
    }
}

/// Project create/edit form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectForm {
    pub csrf_token: String,
    pub project_name: String,
    pub contract_description: String,
    pub scope_of_work: String,
    pub contract_value_ngn: String,
    pub contract_value_usd: String,
    pub notice_of_award: String,
    pub contract_signed: String,
    pub commencement_date: String,
    pub proposed_completion: String,
    pub contractual_completion: String,
}

impl ProjectForm {
    /// Pre-fill from stored values
    pub fn from_input(input: &ProjectInput) -> Self {
        let date = |d: Option<NaiveDate>| d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();
        Self {
            csrf_token: String::new(),
            project_name: input.project_name.clone(),
            contract_description: input.contract_description.clone(),
            scope_of_work: input.scope_of_work.clone(),
            contract_value_ngn: format!("{:.2}", input.contract_value_ngn),
            contract_value_usd: format!("{:.2}", input.contract_value_usd),
            notice_of_award: date(input.notice_of_award),
            contract_signed: date(input.contract_signed),
            commencement_date: date(input.commencement_date),
            proposed_completion: date(input.proposed_completion),
            contractual_completion: date(input.contractual_completion),
        }
    }

    pub fn validate(&self) -> Result<ProjectInput, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let project_name = self.project_name.trim().to_string();
        if project_name.is_empty() {
            errors.push("Project name is required.");
        }

        let contract_value_ngn = parse_number(&self.contract_value_ngn);
        if contract_value_ngn <= 0.0 {
            errors.push("Contract value (NGN) must be greater than zero.");
        }

        let input = ProjectInput {
            project_name,
            contract_description: self.contract_description.trim().to_string(),
            scope_of_work: self.scope_of_work.trim().to_string(),
            contract_value_ngn,
            contract_value_usd: parse_number(&self.contract_value_usd),
            notice_of_award: parse_date(&self.notice_of_award, "Notice of award", &mut errors),
            contract_signed: parse_date(&self.contract_signed, "Contract signed", &mut errors),
            commencement_date: parse_date(&self.commencement_date, "Commencement date", &mut errors),
            proposed_completion: parse_date(
                &self.proposed_completion,
                "Proposed completion",
                &mut errors,
            ),
            contractual_completion: parse_date(
                &self.contractual_completion,
                "Contractual completion",
                &mut errors,
            ),
        };

        errors.into_result(input)
    }
}

/// Progress update form: eight percentages
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProgressForm {
    pub csrf_token: String,
    pub engineering_design: String,
    pub procurement: String,
    pub civil: String,
    pub installation: String,
    pub testing_commissioning: String,
    pub disbursement_progress: String,
    pub planned_progress: String,
    pub actual_progress: String,
}

impl ProgressForm {
    /// Parse and clamp. Malformed numbers read as zero; this never fails.
    pub fn to_input(&self) -> ProgressInput {
        ProgressInput {
            phases: PhaseProgress::new(
                parse_number(&self.engineering_design),
                parse_number(&self.procurement),
                parse_number(&self.civil),
                parse_number(&self.installation),
                parse_number(&self.testing_commissioning),
            ),
            disbursement_progress: parse_number(&self.disbursement_progress),
            planned_progress: parse_number(&self.planned_progress),
            actual_progress: parse_number(&self.actual_progress),
        }
        .clamped()
    }
}

/// Activity add/delete form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ActivityForm {
    pub csrf_token: String,
    /// `add` or `delete`
    pub action: String,
    pub activity_id: String,
    pub activity_description: String,
    pub duration_weeks: String,
    pub responsible_party: String,
    pub remarks: String,
}

impl ActivityForm {
    pub fn validate(&self) -> Result<NewActivity, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let description = self.activity_description.trim().to_string();
        let duration_weeks = self.duration_weeks.trim().parse::<i64>().unwrap_or(0);

        if description.is_empty() || !(1..=MAX_DURATION_WEEKS).contains(&duration_weeks) {
            errors.push("Activity description and duration are required.");
        }

        errors.into_result(NewActivity {
            description,
            duration_weeks,
            responsible_party: self.responsible_party.trim().to_string(),
            remarks: self.remarks.trim().to_string(),
        })
    }

    pub fn activity_id(&self) -> Option<i64> {
        self.activity_id.trim().parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_form(role: &str) -> UserForm {
        UserForm {
            username: "jdoe".into(),
            email: "jdoe@example.com".into(),
            full_name: "Jane Doe".into(),
            role: role.into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
            is_active: Some("1".into()),
            ..Default::default()
        }
    }

    const NEW: UserFormContext = UserFormContext {
        is_new: true,
        own_role: None,
    };

    #[test]
    fn test_email_check() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last@sub.example.org"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a@localhost"));
        assert!(!is_valid_email("a@b..com"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("a@b@c.com"));
    }

    #[test]
    fn test_valid_new_user() {
        let valid = user_form("pm").validate(NEW).unwrap();
        assert_eq!(valid.role, Role::Pm);
        assert_eq!(valid.password.as_deref(), Some("secret1"));
        assert!(valid.is_active);
    }

    #[test]
    fn test_errors_accumulate() {
        let form = UserForm {
            username: "ab".into(),
            email: "bad".into(),
            role: "root".into(),
            ..Default::default()
        };
        let errors = form.validate(NEW).unwrap_err();
        assert_eq!(
            errors.messages(),
            [
                "Username must be at least 3 characters long.",
                "Valid email address is required.",
                "Full name is required.",
                "Invalid role selected.",
                "Password is required for new users.",
            ]
        );
        assert!(errors.message().starts_with("Username must be"));
    }

    #[test]
    fn test_password_rules() {
        let mut form = user_form("viewer");
        form.password = "12345".into();
        form.confirm_password = "12345".into();
        assert_eq!(
            form.validate(NEW).unwrap_err().message(),
            "Password must be at least 6 characters long."
        );

        form.password = "123456".into();
        form.confirm_password = "654321".into();
        assert_eq!(form.validate(NEW).unwrap_err().message(), "Passwords do not match.");
    }

    #[test]
    fn test_password_optional_on_edit() {
        let mut form = user_form("viewer");
        form.password.clear();
        form.confirm_password.clear();
        let ctx = UserFormContext {
            is_new: false,
            own_role: None,
        };
        assert_eq!(form.validate(ctx).unwrap().password, None);
    }

    #[test]
    fn test_pm_cannot_change_own_role() {
        let mut form = user_form("admin");
        form.password.clear();
        let ctx = UserFormContext {
            is_new: false,
            own_role: Some(Role::Pm),
        };
        assert_eq!(
            form.validate(ctx).unwrap_err().message(),
            "You cannot change your own role."
        );
    }

    #[test]
    fn test_pm_cannot_deactivate_self() {
        let mut form = user_form("pm");
        form.password.clear();
        form.is_active = None;
        let ctx = UserFormContext {
            is_new: false,
            own_role: Some(Role::Pm),
        };
        assert_eq!(
            form.validate(ctx).unwrap_err().message(),
            "You cannot deactivate your own account."
        );
    }

    #[test]
    fn test_project_form_rules() {
        let form = ProjectForm {
            contract_value_ngn: "0".into(),
            ..Default::default()
        };
        assert_eq!(
            form.validate().unwrap_err().message(),
            "Project name is required. Contract value (NGN) must be greater than zero."
        );

        let form = ProjectForm {
            project_name: " Substation ".into(),
            contract_value_ngn: "1,500,000.50".into(),
            contract_value_usd: "not a number".into(),
            commencement_date: "2025-03-01".into(),
            ..Default::default()
        };
        let input = form.validate().unwrap();
        assert_eq!(input.project_name, "Substation");
        assert_eq!(input.contract_value_ngn, 1_500_000.5);
        assert_eq!(input.contract_value_usd, 0.0);
        assert_eq!(input.commencement_date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(input.proposed_completion, None);
    }

    #[test]
    fn test_project_form_bad_date() {
        let form = ProjectForm {
            project_name: "Line".into(),
            contract_value_ngn: "10".into(),
            contract_signed: "31/02/2025".into(),
            ..Default::default()
        };
        assert_eq!(
            form.validate().unwrap_err().message(),
            "Contract signed must be a valid date."
        );
    }

    #[test]
    fn test_progress_form_clamps() {
        let form = ProgressForm {
            engineering_design: "150".into(),
            procurement: "-4".into(),
            civil: "abc".into(),
            installation: "50.5".into(),
            testing_commissioning: "100".into(),
            ..Default::default()
        };
        let input = form.to_input();
        assert_eq!(input.phases, PhaseProgress::new(100.0, 0.0, 0.0, 50.5, 100.0));
        assert_eq!(input.actual_progress, 0.0);
    }

    #[test]
    fn test_activity_form_rules() {
        let form = ActivityForm {
            activity_description: "Pour foundations".into(),
            duration_weeks: "0".into(),
            ..Default::default()
        };
        assert_eq!(
            form.validate().unwrap_err().message(),
            "Activity description and duration are required."
        );

        let form = ActivityForm {
            activity_description: "  ".into(),
            duration_weeks: "3".into(),
            ..Default::default()
        };
        assert!(form.validate().is_err());

        let form = ActivityForm {
            activity_description: "Pour foundations".into(),
            duration_weeks: "3".into(),
            ..Default::default()
        };
        let activity = form.validate().unwrap();
        assert_eq!(activity.duration_weeks, 3);
    }

    #[test]
    fn test_activity_duration_upper_bound() {
        let form = |weeks: &str| ActivityForm {
            activity_description: "Pour foundations".into(),
            duration_weeks: weeks.into(),
            ..Default::default()
        };

        assert_eq!(form("52").validate().unwrap().duration_weeks, 52);
        assert_eq!(
            form("53").validate().unwrap_err().message(),
            "Activity description and duration are required."
        );
        assert!(form("500").validate().is_err());
    }
}
