use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime};

use crate::error::ApiError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Query-string dates come as RFC3339 or a bare `YYYY-MM-DD` (midnight UTC).
pub(crate) fn parse_date_param(raw: &str) -> Result<OffsetDateTime, ApiError> {
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(ts);
    }
    let date = Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map_err(|_| ApiError::validation(format!("Invalid date: {raw}")))?;
    Ok(date.midnight().assume_utc())
}

/// Body of POST /users/create.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_second: String,
    pub cellphone: Option<String>,
}

/// Body of PUT /users/:id; absent fields keep the stored values.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub password: Option<String>,
    pub cellphone: Option<String>,
}

/// Body of POST /users/bulkCreate. Entries are validated one by one, so every
/// field is optional at the wire level.
#[derive(Debug, Deserialize)]
pub struct BulkCreateRequest {
    pub users: Vec<BulkUserEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BulkUserEntry {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_second: Option<String>,
    pub cellphone: Option<String>,
}

/// Outcome counters for the bulk insert; a bad entry never fails the batch.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct BulkReport {
    pub successful: u32,
    pub failed: u32,
}

/// Query of GET /users/findUsers.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindUsersQuery {
    pub deleted: Option<String>,
    pub name: Option<String>,
    pub login_before: Option<String>,
    pub login_after: Option<String>,
}

/// Query of GET /users/search (session-window variant).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub status: Option<String>,
    pub log_before: Option<String>,
    pub log_after: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn email_regex_accepts_plausible_addresses() {
        assert!(is_valid_email("ann@example.com"));
        assert!(is_valid_email("a.b+c@sub.domain.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("name@nodot"));
    }

    #[test]
    fn parses_bare_dates_as_midnight_utc() {
        let ts = parse_date_param("2024-01-01").expect("date");
        assert_eq!(ts, datetime!(2024-01-01 00:00 UTC));
    }

    #[test]
    fn parses_rfc3339_timestamps() {
        let ts = parse_date_param("2024-06-15T10:30:00Z").expect("timestamp");
        assert_eq!(ts, datetime!(2024-06-15 10:30 UTC));
    }

    #[test]
    fn rejects_garbage_dates() {
        let err = parse_date_param("yesterday").unwrap_err();
        assert_eq!(err.to_string(), "Invalid date: yesterday");
    }

    #[test]
    fn find_users_query_uses_camel_case_params() {
        let q: FindUsersQuery =
            serde_json::from_str(r#"{"deleted":"true","loginBefore":"2024-01-01"}"#).unwrap();
        assert_eq!(q.deleted.as_deref(), Some("true"));
        assert_eq!(q.login_before.as_deref(), Some("2024-01-01"));
        assert!(q.name.is_none());
        assert!(q.login_after.is_none());
    }

    #[test]
    fn bulk_entries_tolerate_missing_fields() {
        let body: BulkCreateRequest =
            serde_json::from_str(r#"{"users":[{"email":"a@x.com"},{}]}"#).unwrap();
        assert_eq!(body.users.len(), 2);
        assert!(body.users[0].name.is_none());
        assert_eq!(body.users[0].email.as_deref(), Some("a@x.com"));
    }
}
