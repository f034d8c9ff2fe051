use sqlx::PgPool;
use tracing::{info, warn};

use crate::auth::password::hash_password;
use crate::error::ApiError;
use crate::users::dto::{
    is_valid_email, parse_date_param, BulkReport, BulkUserEntry, CreateUserRequest,
    FindUsersQuery, SearchQuery, UpdateUserRequest,
};
use crate::users::repo::{User, UserFilter};

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Empty-valued query params (`?loginBefore=`) count as absent, like the
/// original wire contract.
fn opt_param(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Validates one bulk entry; returns the insertable fields or None when the
/// entry must be counted as failed.
fn validate_entry(entry: &BulkUserEntry) -> Option<(&str, &str, &str, Option<&str>)> {
    let name = entry.name.as_deref().filter(|s| !s.is_empty())?;
    let email = entry.email.as_deref().filter(|s| !s.is_empty())?;
    let password = entry.password.as_deref().filter(|s| !s.is_empty())?;
    if entry.password_second.as_deref() != Some(password) {
        return None;
    }
    if !is_valid_email(email) {
        return None;
    }
    Some((name, email, password, entry.cellphone.as_deref()))
}

fn filter_from_query(query: &FindUsersQuery) -> Result<UserFilter, ApiError> {
    Ok(UserFilter {
        status: query.deleted.as_deref().map(|d| d != "true"),
        name: opt_param(&query.name).map(str::to_string),
        login_before: opt_param(&query.login_before)
            .map(parse_date_param)
            .transpose()?,
        login_after: opt_param(&query.login_after)
            .map(parse_date_param)
            .transpose()?,
    })
}

pub async fn create_user(db: &PgPool, req: CreateUserRequest) -> Result<String, ApiError> {
    if req.password != req.password_second {
        return Err(ApiError::validation("Passwords do not match"));
    }
    if !is_valid_email(&req.email) {
        return Err(ApiError::validation("Invalid email"));
    }

    if User::find_by_email(db, &req.email).await?.is_some() {
        return Err(ApiError::validation("User already exists"));
    }

    let hash = hash_password(&req.password)?;
    let user = match User::insert(db, &req.name, &req.email, &hash, req.cellphone.as_deref()).await
    {
        Ok(u) => u,
        // The unique index on email is the canonical duplicate signal; the
        // pre-check above can race with a concurrent insert.
        Err(e) if is_unique_violation(&e) => {
            warn!(email = %req.email, "duplicate email lost the insert race");
            return Err(ApiError::validation("User already exists"));
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = %user.id, email = %user.email, "user created");
    Ok(format!("User created successfully with ID: {}", user.id))
}

pub async fn get_all_users(db: &PgPool) -> Result<Vec<User>, ApiError> {
    Ok(User::list_active(db).await?)
}

pub async fn get_user_by_id(db: &PgPool, id: i64) -> Result<User, ApiError> {
    User::find_active(db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

pub async fn update_user(
    db: &PgPool,
    id: i64,
    req: UpdateUserRequest,
) -> Result<String, ApiError> {
    let user = User::find_active(db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    // Absent fields keep the stored values; a new password is re-hashed.
    let name = req.name.unwrap_or(user.name);
    let password = match req.password.as_deref() {
        Some(plain) => hash_password(plain)?,
        None => user.password,
    };
    let cellphone = req.cellphone.or(user.cellphone);

    User::update_profile(db, id, &name, &password, cellphone.as_deref()).await?;

    info!(user_id = %id, "user updated");
    Ok("User updated successfully".to_string())
}

pub async fn delete_user(db: &PgPool, id: i64) -> Result<String, ApiError> {
    User::find_active(db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    User::soft_delete(db, id).await?;

    info!(user_id = %id, "user soft-deleted");
    Ok("User deleted successfully".to_string())
}

pub async fn find_users(db: &PgPool, query: FindUsersQuery) -> Result<Vec<User>, ApiError> {
    let filter = filter_from_query(&query)?;
    Ok(User::search(db, &filter).await?)
}

/// Sequential, per-entry inserts; one bad entry never fails the batch.
pub async fn bulk_create_users(
    db: &PgPool,
    users: Vec<BulkUserEntry>,
) -> Result<BulkReport, ApiError> {
    let mut report = BulkReport {
        successful: 0,
        failed: 0,
    };

    for entry in &users {
        let Some((name, email, password, cellphone)) = validate_entry(entry) else {
            report.failed += 1;
            continue;
        };

        if User::find_by_email(db, email).await?.is_some() {
            report.failed += 1;
            continue;
        }

        let hash = hash_password(password)?;
        match User::insert(db, name, email, &hash, cellphone).await {
            Ok(_) => report.successful += 1,
            Err(e) if is_unique_violation(&e) => report.failed += 1,
            Err(e) => return Err(e.into()),
        }
    }

    info!(successful = report.successful, failed = report.failed, "bulk create done");
    Ok(report)
}

/// Session-window search: status flag substring plus "has a session before
/// X / after Y" bounds, ANDed over the supplied criteria.
pub async fn search_users(db: &PgPool, query: SearchQuery) -> Result<Vec<User>, ApiError> {
    let status = opt_param(&query.status).map(str::to_lowercase);
    let logged_before = opt_param(&query.log_before)
        .map(parse_date_param)
        .transpose()?;
    let logged_after = opt_param(&query.log_after)
        .map(parse_date_param)
        .transpose()?;

    Ok(User::search_by_sessions(db, status.as_deref(), logged_before, logged_after).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn entry(
        name: Option<&str>,
        email: Option<&str>,
        password: Option<&str>,
        password_second: Option<&str>,
    ) -> BulkUserEntry {
        BulkUserEntry {
            name: name.map(String::from),
            email: email.map(String::from),
            password: password.map(String::from),
            password_second: password_second.map(String::from),
            cellphone: None,
        }
    }

    #[test]
    fn bulk_entry_requires_name_email_and_password() {
        assert!(validate_entry(&entry(None, Some("a@x.com"), Some("pw"), Some("pw"))).is_none());
        assert!(validate_entry(&entry(Some("Ann"), None, Some("pw"), Some("pw"))).is_none());
        assert!(validate_entry(&entry(Some("Ann"), Some("a@x.com"), None, None)).is_none());
        assert!(validate_entry(&entry(Some(""), Some("a@x.com"), Some("pw"), Some("pw"))).is_none());
    }

    #[test]
    fn bulk_entry_requires_matching_passwords() {
        assert!(
            validate_entry(&entry(Some("Ann"), Some("a@x.com"), Some("pw"), Some("other")))
                .is_none()
        );
        assert!(validate_entry(&entry(Some("Ann"), Some("a@x.com"), Some("pw"), None)).is_none());
    }

    #[test]
    fn bulk_entry_rejects_malformed_email() {
        assert!(validate_entry(&entry(Some("Ann"), Some("nope"), Some("pw"), Some("pw"))).is_none());
    }

    #[test]
    fn bulk_entry_accepts_a_complete_record() {
        let e = entry(Some("Ann"), Some("a@x.com"), Some("pw"), Some("pw"));
        let (name, email, password, cellphone) = validate_entry(&e).expect("valid entry");
        assert_eq!(name, "Ann");
        assert_eq!(email, "a@x.com");
        assert_eq!(password, "pw");
        assert!(cellphone.is_none());
    }

    #[test]
    fn deleted_param_inverts_into_status() {
        let f = filter_from_query(&FindUsersQuery {
            deleted: Some("true".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(f.status, Some(false));

        let f = filter_from_query(&FindUsersQuery {
            deleted: Some("false".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(f.status, Some(true));

        // Anything but the literal "true" selects active rows.
        let f = filter_from_query(&FindUsersQuery {
            deleted: Some("yes".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(f.status, Some(true));

        let f = filter_from_query(&FindUsersQuery::default()).unwrap();
        assert_eq!(f.status, None);
    }

    #[test]
    fn login_window_params_parse_into_instants() {
        let f = filter_from_query(&FindUsersQuery {
            login_before: Some("2024-01-01".into()),
            login_after: Some("2023-06-15T08:00:00Z".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(f.login_before, Some(datetime!(2024-01-01 00:00 UTC)));
        assert_eq!(f.login_after, Some(datetime!(2023-06-15 08:00 UTC)));
    }

    #[test]
    fn empty_params_impose_no_constraint() {
        let f = filter_from_query(&FindUsersQuery {
            name: Some(String::new()),
            login_before: Some(String::new()),
            login_after: Some(String::new()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(f.name, None);
        assert_eq!(f.login_before, None);
        assert_eq!(f.login_after, None);

        assert_eq!(opt_param(&Some(String::new())), None);
        assert_eq!(opt_param(&None), None);
        assert_eq!(opt_param(&Some("x".into())), Some("x"));
    }

    #[test]
    fn bad_login_window_param_is_a_validation_error() {
        let err = filter_from_query(&FindUsersQuery {
            login_before: Some("not-a-date".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
