//! Custom field checks shared by the `validator` derives.

use validator::{ValidationError, ValidationErrors};

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() { Err(ValidationError::new("blank")) } else { Ok(()) }
}

/// Ten digits once separators and other formatting characters are dropped.
pub fn phone_number(value: &str) -> Result<(), ValidationError> {
    let digits = value.chars().filter(char::is_ascii_digit).count();
    if digits == 10 { Ok(()) } else { Err(ValidationError::new("phone")) }
}

/// Sorted names of the fields that failed.
pub fn failed_fields(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<String> = errors.field_errors().keys().map(|k| k.to_string()).collect();
    fields.sort();
    fields
}
