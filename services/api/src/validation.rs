//! Input validation
//!
//! Every function here is pure: it takes a request payload and returns either
//! the validated value or the list of offending fields.

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::models::{
    AssignSlotsRequest, ChangePasswordRequest, CreateGroupRequest, CreateNotificationRequest,
    GroupChanges, NewGroup, ProfileUpdate, SlotAssignment, SlotChanges, UpdateGroupRequest,
    UpdateSlotRequest,
};

pub const MAX_GROUP_NAME_LEN: usize = 50;
pub const MAX_RANK_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 8;

/// A rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type ValidationResult<T> = Result<T, Vec<FieldError>>;

/// Validated group update: column changes plus the optional participation toggle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupUpdate {
    pub changes: GroupChanges,
    pub is_part: Option<bool>,
}

/// Parse the owner participation flag from a boolean or a `"true"`/`"false"` string
pub fn parse_is_part(value: &Value) -> Result<bool, FieldError> {
    match value {
        Value::Bool(flag) => Ok(*flag),
        Value::String(text) => match text.trim().to_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(invalid_is_part()),
        },
        _ => Err(invalid_is_part()),
    }
}

fn invalid_is_part() -> FieldError {
    FieldError::new("is_part", "Invalid value for is_part")
}

fn parse_amount(value: &Value) -> Result<i32, FieldError> {
    let amount = match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };

    amount
        .filter(|amount| *amount > 0)
        .and_then(|amount| i32::try_from(amount).ok())
        .ok_or_else(|| FieldError::new("mensuel", "mensuel must be a positive integer."))
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, FieldError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        FieldError::new(field, format!("{field} must be a date in YYYY-MM-DD format."))
    })
}

fn parse_name(value: &str) -> Result<String, FieldError> {
    let name = value.trim();
    if name.is_empty() {
        return Err(FieldError::new("name", "name is required."));
    }
    if name.chars().count() > MAX_GROUP_NAME_LEN {
        return Err(FieldError::new(
            "name",
            format!("name must be at most {MAX_GROUP_NAME_LEN} characters."),
        ));
    }
    Ok(name.to_string())
}

fn parse_rank(value: &str) -> Result<String, FieldError> {
    let rank = value.trim();
    if rank.is_empty() || rank.chars().count() > MAX_RANK_LEN {
        return Err(FieldError::new(
            "order",
            format!("order must be 1 to {MAX_RANK_LEN} characters."),
        ));
    }
    Ok(rank.to_string())
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Number(number) => number.as_f64() == Some(0.0),
        _ => false,
    }
}

/// Validate a new group for `owner_id`. The join code is left empty for the
/// caller to fill in.
pub fn validate_new_group(
    owner_id: Uuid,
    request: &CreateGroupRequest,
) -> ValidationResult<NewGroup> {
    // Checked first so that a bad flag is reported on its own
    let is_part = match &request.is_part {
        Some(value) => parse_is_part(value).map_err(|e| vec![e])?,
        None => false,
    };

    let mut errors = Vec::new();

    let name = match request.name.as_deref() {
        Some(name) => parse_name(name).map_err(|e| errors.push(e)).ok(),
        None => {
            errors.push(FieldError::new("name", "name is required."));
            None
        }
    };

    let date_start = match request.date_start.as_deref() {
        Some(date) => parse_date("date_start", date)
            .map_err(|e| errors.push(e))
            .ok(),
        None => {
            errors.push(FieldError::new("date_start", "date_start is required."));
            None
        }
    };

    let monthly_amount = match &request.mensuel {
        Some(value) => parse_amount(value).map_err(|e| errors.push(e)).ok(),
        None => {
            errors.push(FieldError::new("mensuel", "mensuel is required."));
            None
        }
    };

    match (name, date_start, monthly_amount) {
        (Some(name), Some(date_start), Some(monthly_amount)) if errors.is_empty() => Ok(NewGroup {
            owner_id,
            name,
            date_start,
            monthly_amount,
            is_part,
            join_code: String::new(),
        }),
        _ => Err(errors),
    }
}

/// Validate a partial group update
pub fn validate_group_update(request: &UpdateGroupRequest) -> ValidationResult<GroupUpdate> {
    for (field, value) in [
        ("name", &request.name),
        ("date_start", &request.date_start),
        ("mensuel", &request.mensuel),
    ] {
        if value.as_ref().is_some_and(is_blank) {
            return Err(vec![FieldError::new(
                field,
                format!("{field} cannot be empty."),
            )]);
        }
    }

    let is_part = request
        .is_part
        .as_ref()
        .map(parse_is_part)
        .transpose()
        .map_err(|e| vec![e])?;

    let mut errors = Vec::new();
    let mut changes = GroupChanges::default();

    match &request.name {
        Some(Value::String(name)) => match parse_name(name) {
            Ok(name) => changes.name = Some(name),
            Err(e) => errors.push(e),
        },
        Some(_) => errors.push(FieldError::new("name", "name must be a string.")),
        None => {}
    }

    match &request.date_start {
        Some(Value::String(date)) => match parse_date("date_start", date) {
            Ok(date) => changes.date_start = Some(date),
            Err(e) => errors.push(e),
        },
        Some(_) => errors.push(FieldError::new(
            "date_start",
            "date_start must be a date in YYYY-MM-DD format.",
        )),
        None => {}
    }

    if let Some(value) = &request.mensuel {
        match parse_amount(value) {
            Ok(amount) => changes.monthly_amount = Some(amount),
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(GroupUpdate { changes, is_part })
    } else {
        Err(errors)
    }
}

/// Validate a bulk slot assignment
pub fn validate_assignments(request: &AssignSlotsRequest) -> ValidationResult<Vec<SlotAssignment>> {
    if request.assignments.is_empty() {
        return Err(vec![FieldError::new(
            "assignments",
            "No participants data provided",
        )]);
    }

    let mut assignments = Vec::with_capacity(request.assignments.len());
    for entry in &request.assignments {
        let (Some(group_id), Some(user_id), Some(payout_date), Some(order)) = (
            entry.group_id,
            entry.user_id,
            entry.payout_date,
            entry.order.as_deref(),
        ) else {
            return Err(vec![FieldError::new("assignments", "Missing participant data")]);
        };

        let rank = parse_rank(order).map_err(|e| vec![e])?;
        assignments.push(SlotAssignment {
            group_id,
            user_id,
            payout_date,
            rank,
        });
    }

    Ok(assignments)
}

/// Validate a partial slot update
pub fn validate_slot_changes(request: &UpdateSlotRequest) -> ValidationResult<SlotChanges> {
    let rank = request
        .order
        .as_deref()
        .map(parse_rank)
        .transpose()
        .map_err(|e| vec![e])?;

    Ok(SlotChanges {
        payout_date: request.payout_date,
        rank,
        is_received: request.is_received,
    })
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value.as_deref().map(|v| v.trim().to_string())
}

fn check_pattern(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: Option<&str>,
    regex: &Regex,
    message: &str,
) {
    if let Some(value) = value {
        if !regex.is_match(value) {
            errors.push(FieldError::new(field, message));
        }
    }
}

/// Validate a profile update, returning it with every text field trimmed
pub fn validate_profile_update(update: &ProfileUpdate) -> ValidationResult<ProfileUpdate> {
    static CNIE_REGEX: OnceLock<Regex> = OnceLock::new();
    static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    static BANK_ACCOUNT_REGEX: OnceLock<Regex> = OnceLock::new();

    let cnie_regex = CNIE_REGEX
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9]{1,15}$").expect("Failed to compile cnie regex"));
    let phone_regex = PHONE_REGEX
        .get_or_init(|| Regex::new(r"^[0-9+ ]{1,20}$").expect("Failed to compile phone regex"));
    let bank_account_regex = BANK_ACCOUNT_REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9 ]{1,30}$").expect("Failed to compile bank account regex")
    });

    let cleaned = ProfileUpdate {
        first_name: trimmed(&update.first_name),
        last_name: trimmed(&update.last_name),
        birthday: update.birthday,
        phone: trimmed(&update.phone),
        bank_account: trimmed(&update.bank_account),
        cnie: trimmed(&update.cnie),
    };

    let mut errors = Vec::new();

    for (field, value) in [
        ("first_name", &cleaned.first_name),
        ("last_name", &cleaned.last_name),
    ] {
        if value.as_ref().is_some_and(|v| v.chars().count() > 150) {
            errors.push(FieldError::new(
                field,
                format!("{field} must be at most 150 characters."),
            ));
        }
    }

    check_pattern(
        &mut errors,
        "cnie",
        cleaned.cnie.as_deref(),
        cnie_regex,
        "cnie must be 1 to 15 letters or digits.",
    );
    check_pattern(
        &mut errors,
        "phone",
        cleaned.phone.as_deref(),
        phone_regex,
        "phone must be at most 20 digits, spaces or '+'.",
    );
    check_pattern(
        &mut errors,
        "bank_account",
        cleaned.bank_account.as_deref(),
        bank_account_regex,
        "bank_account must be 1 to 30 letters, digits or spaces.",
    );

    if errors.is_empty() {
        Ok(cleaned)
    } else {
        Err(errors)
    }
}

/// Validated password change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// Validate a password change. The current password itself is checked by the
/// caller against the stored hash.
pub fn validate_password_change(
    request: &ChangePasswordRequest,
) -> ValidationResult<PasswordChange> {
    let mut errors = Vec::new();

    for (field, value) in [
        ("current_password", &request.current_password),
        ("new_password", &request.new_password),
        ("new_password_confirm", &request.new_password_confirm),
    ] {
        if value.as_deref().is_none_or(str::is_empty) {
            errors.push(FieldError::new(field, format!("{field} is required.")));
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let current_password = request.current_password.clone().unwrap_or_default();
    let new_password = request.new_password.clone().unwrap_or_default();

    if request.new_password_confirm.as_deref() != Some(new_password.as_str()) {
        return Err(vec![FieldError::new(
            "new_password_confirm",
            "New passwords do not match",
        )]);
    }

    if new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(vec![FieldError::new(
            "new_password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters long"),
        )]);
    }

    Ok(PasswordChange {
        current_password,
        new_password,
    })
}

/// Validate a join code taken from the URL
pub fn validate_join_code(code: &str) -> Result<(), FieldError> {
    static CODE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = CODE_REGEX
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9]{1,20}$").expect("Failed to compile code regex"));

    if regex.is_match(code) {
        Ok(())
    } else {
        Err(FieldError::new("code", "Invalid join code"))
    }
}

/// Validated notification: destination username and message text
pub fn validate_notification(
    request: &CreateNotificationRequest,
) -> ValidationResult<(String, String)> {
    let destination = request.user_destination.as_deref().map(str::trim);
    let message = request.message.as_deref().map(str::trim);

    match (destination, message) {
        (Some(destination), Some(message)) if !destination.is_empty() && !message.is_empty() => {
            Ok((destination.to_string(), message.to_string()))
        }
        _ => Err(vec![FieldError::new(
            "user_destination",
            "Both user_destination and message are required.",
        )]),
    }
}
