use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use thiserror::Error;

use crate::client::{CreateClient, UpdateClient};
use crate::project::{CreateProject, Project, UpdateProject};
use crate::task::{CreateTask, UpdateTask};
use crate::time_entry::{CreateTimeEntry, TimeEntry, UpdateTimeEntry};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));

// Optional leading '+', then 7-20 digits allowing spaces and ()-. separators.
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[\d\s().-]{7,20}$").expect("phone regex"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone) && phone.chars().filter(|c| c.is_ascii_digit()).count() >= 7
}

fn required(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError(format!("{field} is required")));
    }
    Ok(())
}

fn check_email(email: &str) -> Result<(), ValidationError> {
    required("email", email)?;
    if !is_valid_email(email) {
        return Err(ValidationError(format!("invalid email address: {email}")));
    }
    Ok(())
}

fn check_phone(phone: &str) -> Result<(), ValidationError> {
    if !phone.is_empty() && !is_valid_phone(phone) {
        return Err(ValidationError(format!("invalid phone number: {phone}")));
    }
    Ok(())
}

fn check_date_order(
    starts_at: Option<DateTime<Utc>>,
    due_at: Option<DateTime<Utc>>,
) -> Result<(), ValidationError> {
    if let (Some(start), Some(due)) = (starts_at, due_at) {
        if start > due {
            return Err(ValidationError(
                "start date must not be after due date".into(),
            ));
        }
    }
    Ok(())
}

// -- Clients --

pub fn create_client(input: &CreateClient) -> Result<(), ValidationError> {
    required("name", &input.name)?;
    check_email(&input.email)?;
    check_phone(&input.phone)?;
    Ok(())
}

pub fn update_client(patch: &UpdateClient) -> Result<(), ValidationError> {
    if let Some(ref name) = patch.name {
        required("name", name)?;
    }
    if let Some(ref email) = patch.email {
        check_email(email)?;
    }
    if let Some(ref phone) = patch.phone {
        check_phone(phone)?;
    }
    Ok(())
}

// -- Projects --

pub fn create_project(input: &CreateProject) -> Result<(), ValidationError> {
    required("name", &input.name)?;
    if input.hourly_rate_cents < 0 {
        return Err(ValidationError("hourly rate must not be negative".into()));
    }
    if input.budget_cents < 0 {
        return Err(ValidationError("budget must not be negative".into()));
    }
    check_date_order(input.starts_at, input.due_at)
}

/// The date-order check runs against the effective values: the patch where
/// present, the stored row otherwise.
pub fn update_project(stored: &Project, patch: &UpdateProject) -> Result<(), ValidationError> {
    if let Some(ref name) = patch.name {
        required("name", name)?;
    }
    if let Some(rate) = patch.hourly_rate_cents {
        if rate < 0 {
            return Err(ValidationError("hourly rate must not be negative".into()));
        }
    }
    if let Some(budget) = patch.budget_cents {
        if budget < 0 {
            return Err(ValidationError("budget must not be negative".into()));
        }
    }
    let starts_at = patch.starts_at.unwrap_or(stored.starts_at);
    let due_at = patch.due_at.unwrap_or(stored.due_at);
    check_date_order(starts_at, due_at)
}

// -- Tasks --

pub fn create_task(input: &CreateTask) -> Result<(), ValidationError> {
    required("title", &input.title)?;
    if let Some(est) = input.estimated_minutes {
        if est <= 0 {
            return Err(ValidationError("estimated minutes must be positive".into()));
        }
    }
    Ok(())
}

pub fn update_task(patch: &UpdateTask) -> Result<(), ValidationError> {
    if let Some(ref title) = patch.title {
        required("title", title)?;
    }
    if let Some(Some(est)) = patch.estimated_minutes {
        if est <= 0 {
            return Err(ValidationError("estimated minutes must be positive".into()));
        }
    }
    Ok(())
}

// -- Time entries --

pub fn create_time_entry(input: &CreateTimeEntry) -> Result<(), ValidationError> {
    let ended = input
        .ended_at
        .ok_or_else(|| ValidationError("end time is required".into()))?;
    if ended <= input.started_at {
        return Err(ValidationError("end time must be after start time".into()));
    }
    if let Some(rate) = input.hourly_rate_cents {
        if rate < 0 {
            return Err(ValidationError("hourly rate must not be negative".into()));
        }
    }
    Ok(())
}

pub fn update_time_entry(
    stored: &TimeEntry,
    patch: &UpdateTimeEntry,
) -> Result<(), ValidationError> {
    let started = patch.started_at.unwrap_or(stored.started_at);
    let ended = patch.ended_at.unwrap_or(stored.ended_at);
    if let Some(ended) = ended {
        if ended <= started {
            return Err(ValidationError("end time must be after start time".into()));
        }
    }
    if let Some(Some(rate)) = patch.hourly_rate_cents {
        if rate < 0 {
            return Err(ValidationError("hourly rate must not be negative".into()));
        }
    }
    Ok(())
}
