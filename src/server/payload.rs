//! Request body parsing and field validation.
//!
//! Bodies must be JSON objects. Creation requires every field; updates accept
//! any subset and ignore unknown keys. Field errors are collected so the
//! client sees all problems at once.

use serde_json::{Map, Number, Value};

use crate::error::{ApiError, FieldErrors};
use crate::store::{NewUser, UserPatch};

const USERNAME: &str = "username";
const AGE: &str = "age";
const HOBBIES: &str = "hobbies";

/// Parses and validates a creation payload.
pub fn new_user(body: &[u8]) -> Result<NewUser, ApiError> {
    let object = parse_object(body)?;
    let mut errors = FieldErrors::new();

    let username = extract(&object, USERNAME, true, as_username, &mut errors);
    let age = extract(&object, AGE, true, as_age, &mut errors);
    let hobbies = extract(&object, HOBBIES, true, as_hobbies, &mut errors);

    match (username, age, hobbies) {
        (Some(username), Some(age), Some(hobbies)) => Ok(NewUser {
            username,
            age,
            hobbies,
        }),
        _ => Err(ApiError::InvalidUser(errors)),
    }
}

/// Parses and validates an update payload. Absent fields stay `None`.
pub fn user_patch(body: &[u8]) -> Result<UserPatch, ApiError> {
    let object = parse_object(body)?;
    let mut errors = FieldErrors::new();

    let patch = UserPatch {
        username: extract(&object, USERNAME, false, as_username, &mut errors),
        age: extract(&object, AGE, false, as_age, &mut errors),
        hobbies: extract(&object, HOBBIES, false, as_hobbies, &mut errors),
    };

    if errors.is_empty() {
        Ok(patch)
    } else {
        Err(ApiError::InvalidUser(errors))
    }
}

fn parse_object(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    match serde_json::from_slice(body) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(ApiError::MalformedBody(format!(
            "expected a JSON object, got {}",
            kind(&other)
        ))),
        Err(e) => Err(ApiError::MalformedBody(e.to_string())),
    }
}

fn extract<T>(
    object: &Map<String, Value>,
    name: &'static str,
    required: bool,
    check: fn(&Value) -> Result<T, String>,
    errors: &mut FieldErrors,
) -> Option<T> {
    let Some(value) = object.get(name) else {
        if required {
            errors.insert(name, format!("Field {} is not provided.", name));
        }
        return None;
    };

    match check(value) {
        Ok(parsed) => Some(parsed),
        Err(message) => {
            errors.insert(name, message);
            None
        }
    }
}

fn as_username(value: &Value) -> Result<String, String> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| format!("Field {} is not a string.", USERNAME))
}

fn as_age(value: &Value) -> Result<Number, String> {
    match value {
        Value::Number(age) => Ok(age.clone()),
        _ => Err(format!("Field {} is not a number.", AGE)),
    }
}

fn as_hobbies(value: &Value) -> Result<Vec<String>, String> {
    let Value::Array(items) = value else {
        return Err(format!("Field {} is not an array.", HOBBIES));
    };

    items
        .iter()
        .map(|item| item.as_str().map(str::to_owned))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| format!("Field {} is not an array of strings.", HOBBIES))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
