use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;

const USER_COLUMNS: &str = "id, name, email, password, cellphone, status, last_login";

/// User record. `status = false` marks a soft-deleted row; the password hash
/// is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub cellphone: Option<String>,
    pub status: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
}

/// Login session, read-only except for `open`. Feeds the session-window
/// search.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: i64,
    pub id_user: i64,
    pub created_at: OffsetDateTime,
}

/// Store-level predicates for `findUsers`; absent fields impose no
/// constraint.
#[derive(Debug, Default, Clone)]
pub struct UserFilter {
    pub status: Option<bool>,
    pub name: Option<String>,
    pub login_before: Option<OffsetDateTime>,
    pub login_after: Option<OffsetDateTime>,
}

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await
    }

    /// Active (not soft-deleted) user by id.
    pub async fn find_active(db: &PgPool, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND status = TRUE"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn list_active(db: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE status = TRUE ORDER BY id"
        ))
        .fetch_all(db)
        .await
    }

    pub async fn insert(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
        cellphone: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password, cellphone, status)
            VALUES ($1, $2, $3, $4, TRUE)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(cellphone)
        .fetch_one(db)
        .await
    }

    pub async fn update_profile(
        db: &PgPool,
        id: i64,
        name: &str,
        password_hash: &str,
        cellphone: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET name = $2, password = $3, cellphone = $4 WHERE id = $1")
            .bind(id)
            .bind(name)
            .bind(password_hash)
            .bind(cellphone)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn soft_delete(db: &PgPool, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET status = FALSE WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn touch_last_login(db: &PgPool, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Dynamic filter pushed into a single query; rows of either status
    /// return unless the filter pins one.
    pub async fn search(db: &PgPool, filter: &UserFilter) -> Result<Vec<User>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {USER_COLUMNS} FROM users WHERE 1 = 1"
        ));
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(name) = &filter.name {
            qb.push(" AND name LIKE ").push_bind(format!("%{name}%"));
        }
        if let Some(ts) = filter.login_before {
            qb.push(" AND last_login < ").push_bind(ts);
        }
        if let Some(ts) = filter.login_after {
            qb.push(" AND last_login > ").push_bind(ts);
        }
        qb.push(" ORDER BY id");
        qb.build_query_as::<User>().fetch_all(db).await
    }

    /// Users matched against their session history in one indexed query.
    /// `status` is a substring match on the textual flag ("true"/"false");
    /// the window bounds require at least one session strictly before/after
    /// the given instant. Supplied criteria AND together.
    pub async fn search_by_sessions(
        db: &PgPool,
        status: Option<&str>,
        logged_before: Option<OffsetDateTime>,
        logged_after: Option<OffsetDateTime>,
    ) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users u
            WHERE ($1::text IS NULL
                   OR position($1 in CASE WHEN u.status THEN 'true' ELSE 'false' END) > 0)
              AND ($2::timestamptz IS NULL OR EXISTS (
                    SELECT 1 FROM sessions s
                    WHERE s.id_user = u.id AND s.created_at < $2))
              AND ($3::timestamptz IS NULL OR EXISTS (
                    SELECT 1 FROM sessions s
                    WHERE s.id_user = u.id AND s.created_at > $3))
            ORDER BY u.id
            "#
        ))
        .bind(status)
        .bind(logged_before)
        .bind(logged_after)
        .fetch_all(db)
        .await
    }
}

impl Session {
    pub async fn open(db: &PgPool, id_user: i64) -> Result<Session, sqlx::Error> {
        sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id_user)
            VALUES ($1)
            RETURNING id, id_user, created_at
            "#,
        )
        .bind(id_user)
        .fetch_one(db)
        .await
    }
}
