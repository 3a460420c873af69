//! User profile records and write payloads

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ApiError, ApiResult};

const REQUIRED_FIELDS_MESSAGE: &str = "Fields 'name' and 'email' are required";

/// Column limit for `name` and `country`
pub const MAX_TEXT_LEN: usize = 255;

/// Longest address accepted for `email`
pub const MAX_EMAIL_LEN: usize = 254;

/// Stored user profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    #[sqlx(rename = "nombre")]
    pub name: String,
    pub email: String,
    #[sqlx(rename = "edad")]
    pub age: Option<i64>,
    #[sqlx(rename = "pais")]
    pub country: Option<String>,
}

/// Validated user fields ready for insert or full update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    pub name: String,
    pub email: String,
    pub age: Option<i64>,
    pub country: Option<String>,
}

/// POST/PUT request body
///
/// Legacy field names (`nombre`, `edad`, `pais`) are accepted as aliases.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPayload {
    #[serde(alias = "nombre")]
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(alias = "edad")]
    pub age: Option<i64>,
    #[serde(alias = "pais")]
    pub country: Option<String>,
}

impl UserPayload {
    /// Validate required fields
    pub fn into_draft(self) -> ApiResult<UserDraft> {
        UserDraft::new(self.name, self.email, self.age, self.country)
    }
}

impl UserDraft {
    /// Build a draft, rejecting a missing or blank name/email
    pub fn new(
        name: Option<String>,
        email: Option<String>,
        age: Option<i64>,
        country: Option<String>,
    ) -> ApiResult<Self> {
        let name = name.filter(|n| !n.trim().is_empty());
        let email = email.filter(|e| !e.trim().is_empty());

        let (Some(name), Some(email)) = (name, email) else {
            return Err(ApiError::Validation(REQUIRED_FIELDS_MESSAGE.to_string()));
        };

        check_length("name", &name, MAX_TEXT_LEN)?;
        if let Some(country) = &country {
            check_length("country", country, MAX_TEXT_LEN)?;
        }
        if email.chars().count() > MAX_EMAIL_LEN || !is_email_shaped(&email) {
            return Err(ApiError::Validation("Field 'email' must be a valid email address".to_string()));
        }

        Ok(Self {
            name,
            email,
            age,
            country,
        })
    }

    /// Merge a PATCH body over the current record
    ///
    /// Absent keys keep the current value; `null` clears `age`/`country` and
    /// fails validation for `name`/`email`. `id` and unknown keys are ignored.
    pub fn patched(current: &User, patch: &Map<String, Value>) -> ApiResult<Self> {
        let mut name = Some(current.name.clone());
        let mut email = Some(current.email.clone());
        let mut age = current.age;
        let mut country = current.country.clone();

        if let Some(value) = lookup(patch, "name", "nombre") {
            name = optional_string(value, "name")?;
        }
        if let Some(value) = patch.get("email") {
            email = optional_string(value, "email")?;
        }
        if let Some(value) = lookup(patch, "age", "edad") {
            age = optional_integer(value, "age")?;
        }
        if let Some(value) = lookup(patch, "country", "pais") {
            country = optional_string(value, "country")?;
        }

        Self::new(name, email, age, country)
    }
}

fn check_length(field: &str, value: &str, max: usize) -> ApiResult<()> {
    if value.chars().count() > max {
        return Err(ApiError::Validation(format!(
            "Field '{}' must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

/// `local@domain.tld` with no whitespace and no empty domain labels
fn is_email_shaped(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

fn lookup<'a>(map: &'a Map<String, Value>, key: &str, alias: &str) -> Option<&'a Value> {
    map.get(key).or_else(|| map.get(alias))
}

fn optional_string(value: &Value, field: &str) -> ApiResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        _ => Err(ApiError::Validation(format!("Field '{}' must be a string", field))),
    }
}

fn optional_integer(value: &Value, field: &str) -> ApiResult<Option<i64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| ApiError::Validation(format!("Field '{}' must be an integer", field))),
        _ => Err(ApiError::Validation(format!("Field '{}' must be an integer", field))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn current() -> User {
        User {
            id: 3,
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            age: Some(30),
            country: Some("AR".to_string()),
        }
    }

    fn as_map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_draft_requires_name_and_email() {
        assert!(UserDraft::new(Some("Ana".into()), None, None, None).is_err());
        assert!(UserDraft::new(Some("  ".into()), Some("a@b.c".into()), None, None).is_err());
        assert!(UserDraft::new(Some("Ana".into()), Some("a@b.c".into()), None, None).is_ok());
    }

    #[test]
    fn test_draft_rejects_malformed_email() {
        for email in ["not-an-email", "ana@", "@example.com", "ana@example", "a b@example.com", "a@b@c.com", "ana@example..com"] {
            let result = UserDraft::new(Some("Ana".into()), Some(email.into()), None, None);
            assert!(
                matches!(result, Err(ApiError::Validation(_))),
                "{} should be rejected",
                email
            );
        }
        assert!(UserDraft::new(Some("Ana".into()), Some("ana.maria+music@mail.example.com".into()), None, None).is_ok());
    }

    #[test]
    fn test_draft_enforces_length_limits() {
        let long = "x".repeat(MAX_TEXT_LEN + 1);
        let at_limit = "ñ".repeat(MAX_TEXT_LEN);

        assert!(matches!(
            UserDraft::new(Some(long.clone()), Some("a@b.co".into()), None, None),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            UserDraft::new(Some("Ana".into()), Some("a@b.co".into()), None, Some(long)),
            Err(ApiError::Validation(_))
        ));
        assert!(UserDraft::new(Some(at_limit.clone()), Some("a@b.co".into()), None, Some(at_limit)).is_ok());

        let long_email = format!("{}@example.com", "a".repeat(MAX_EMAIL_LEN));
        assert!(UserDraft::new(Some("Ana".into()), Some(long_email), None, None).is_err());
    }

    #[test]
    fn test_patch_revalidates_email_shape() {
        assert!(matches!(
            UserDraft::patched(&current(), &as_map(json!({"email": "nope"}))),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_payload_accepts_legacy_aliases() {
        let payload: UserPayload =
            serde_json::from_value(json!({"nombre": "Ana", "email": "a@b.c", "edad": 31, "pais": "UY"}))
                .unwrap();
        let draft = payload.into_draft().unwrap();

        assert_eq!(draft.name, "Ana");
        assert_eq!(draft.age, Some(31));
        assert_eq!(draft.country.as_deref(), Some("UY"));
    }

    #[test]
    fn test_patch_keeps_unspecified_fields() {
        let draft = UserDraft::patched(&current(), &as_map(json!({"country": "CL"}))).unwrap();

        assert_eq!(draft.name, "Ana");
        assert_eq!(draft.email, "ana@example.com");
        assert_eq!(draft.age, Some(30));
        assert_eq!(draft.country.as_deref(), Some("CL"));
    }

    #[test]
    fn test_patch_null_clears_optional_field() {
        let draft = UserDraft::patched(&current(), &as_map(json!({"age": null}))).unwrap();
        assert_eq!(draft.age, None);
    }

    #[test]
    fn test_patch_ignores_id() {
        let draft = UserDraft::patched(&current(), &as_map(json!({"id": 99, "name": "Bea"}))).unwrap();
        assert_eq!(draft.name, "Bea");
    }

    #[test]
    fn test_patch_rejects_blank_email_and_bad_types() {
        assert!(matches!(
            UserDraft::patched(&current(), &as_map(json!({"email": ""}))),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            UserDraft::patched(&current(), &as_map(json!({"age": "thirty"}))),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            UserDraft::patched(&current(), &as_map(json!({"name": null}))),
            Err(ApiError::Validation(_))
        ));
    }
}
