//! Weighted progress calculation
//!
//! Overall progress is never stored. It is always derived from the five
//! phase percentages:
//!
//! | Phase                    | Weight |
//! |--------------------------|--------|
//! | Engineering design       | 0.20   |
//! | Procurement              | 0.25   |
//! | Civil works              | 0.25   |
//! | Installation             | 0.25   |
//! | Testing & commissioning  | 0.05   |
//!
//! Phase values are clamped to [0, 100] when written. The weighted sum is
//! not re-clamped when read.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const ENGINEERING_WEIGHT: f64 = 0.20;
pub const PROCUREMENT_WEIGHT: f64 = 0.25;
pub const CIVIL_WEIGHT: f64 = 0.25;
pub const INSTALLATION_WEIGHT: f64 = 0.25;
pub const TESTING_WEIGHT: f64 = 0.05;

/// Days before contractual completion at which a project counts as "due soon"
pub const DUE_SOON_DAYS: i64 = 30;

/// Clamp a submitted percentage into [0, 100]. Non-finite input becomes 0.
pub fn clamp_percentage(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Round to one decimal place for display
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Completion percentages of the five tracked phases
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseProgress {
    pub engineering_design: f64,
    pub procurement: f64,
    pub civil: f64,
    pub installation: f64,
    pub testing_commissioning: f64,
}

impl PhaseProgress {
    pub fn new(
        engineering_design: f64,
        procurement: f64,
        civil: f64,
        installation: f64,
        testing_commissioning: f64,
    ) -> Self {
        Self {
            engineering_design,
            procurement,
            civil,
            installation,
            testing_commissioning,
        }
    }

    /// Weighted overall progress
    ///
    /// # Examples
    ///
    /// ```
    /// use ptra_common::PhaseProgress;
    ///
    /// let done = PhaseProgress::new(100.0, 100.0, 100.0, 100.0, 100.0);
    /// assert!((done.overall() - 100.0).abs() < 1e-9);
    ///
    /// let design_only = PhaseProgress::new(50.0, 0.0, 0.0, 0.0, 0.0);
    /// assert!((design_only.overall() - 10.0).abs() < 1e-9);
    /// ```
    pub fn overall(&self) -> f64 {
        self.engineering_design * ENGINEERING_WEIGHT
            + self.procurement * PROCUREMENT_WEIGHT
            + self.civil * CIVIL_WEIGHT
            + self.installation * INSTALLATION_WEIGHT
            + self.testing_commissioning * TESTING_WEIGHT
    }

    /// Copy with every phase clamped into [0, 100]
    pub fn clamped(self) -> Self {
        Self {
            engineering_design: clamp_percentage(self.engineering_design),
            procurement: clamp_percentage(self.procurement),
            civil: clamp_percentage(self.civil),
            installation: clamp_percentage(self.installation),
            testing_commissioning: clamp_percentage(self.testing_commissioning),
        }
    }

    /// All five phases at 100% or more
    pub fn is_complete(&self) -> bool {
        self.engineering_design >= 100.0
            && self.procurement >= 100.0
            && self.civil >= 100.0
            && self.installation >= 100.0
            && self.testing_commissioning >= 100.0
    }
}

/// Colour band used by progress bars
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressBand {
    Success,
    Info,
    Warning,
    Danger,
}

impl ProgressBand {
    pub fn for_percentage(percentage: f64) -> Self {
        if percentage >= 80.0 {
            ProgressBand::Success
        } else if percentage >= 60.0 {
            ProgressBand::Info
        } else if percentage >= 40.0 {
            ProgressBand::Warning
        } else {
            ProgressBand::Danger
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            ProgressBand::Success => "success",
            ProgressBand::Info => "info",
            ProgressBand::Warning => "warning",
            ProgressBand::Danger => "danger",
        }
    }
}

/// Schedule status derived from the contractual completion date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleStatus {
    InProgress,
    Overdue,
    DueSoon,
    OnTrack,
}

impl ScheduleStatus {
    pub fn from_completion(completion: Option<NaiveDate>, today: NaiveDate) -> Self {
        match completion {
            None => ScheduleStatus::InProgress,
            Some(date) if date < today => ScheduleStatus::Overdue,
            Some(date) if (date - today).num_days() <= DUE_SOON_DAYS => ScheduleStatus::DueSoon,
            Some(_) => ScheduleStatus::OnTrack,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScheduleStatus::InProgress => "In Progress",
            ScheduleStatus::Overdue => "Overdue",
            ScheduleStatus::DueSoon => "Due Soon",
            ScheduleStatus::OnTrack => "On Track",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            ScheduleStatus::Overdue => "danger",
            ScheduleStatus::DueSoon => "warning",
            ScheduleStatus::InProgress | ScheduleStatus::OnTrack => "success",
        }
    }
}
