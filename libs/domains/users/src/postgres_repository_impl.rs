//! PostgreSQL repositories using raw statements through SeaORM.
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE users (
//!     id          UUID PRIMARY KEY,
//!     email       TEXT NOT NULL,
//!     password    TEXT,
//!     first_name  TEXT,
//!     last_name   TEXT,
//!     roles       TEXT NOT NULL DEFAULT '[]',  -- JSON array of role names
//!     created_at  TIMESTAMPTZ NOT NULL,
//!     updated_at  TIMESTAMPTZ,
//!     deleted_at  TIMESTAMPTZ
//! );
//! CREATE UNIQUE INDEX users_email_key ON users (lower(email));
//!
//! CREATE TABLE auth_tokens (
//!     id            UUID PRIMARY KEY,
//!     user_id       UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE,
//!     token         TEXT NOT NULL UNIQUE,
//!     name          TEXT NOT NULL,
//!     created_at    TIMESTAMPTZ NOT NULL,
//!     last_used_at  TIMESTAMPTZ NOT NULL,
//!     expires_at    TIMESTAMPTZ,
//!     UNIQUE (name, user_id)
//! );
//!
//! CREATE TABLE refresh_tokens (
//!     id             UUID PRIMARY KEY,
//!     refresh_token  TEXT NOT NULL UNIQUE,
//!     username       TEXT NOT NULL,
//!     valid          TIMESTAMPTZ NOT NULL
//! );
//!
//! CREATE TABLE reset_password_tokens (
//!     email        TEXT PRIMARY KEY,
//!     reset_token  TEXT NOT NULL UNIQUE,
//!     valid_until  TIMESTAMPTZ
//! );
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbBackend, DbErr, FromQueryResult, Statement,
};
use uuid::Uuid;

use crate::error::{DUPLICATE_EMAIL, UserError, UserResult};
use crate::repository::{
    AuthTokenRepository, RefreshTokenRepository, ResetPasswordTokenRepository, UserListCriteria,
    UserOrder, UserRepository,
};
use crate::tokens::{AuthToken, RefreshToken, ResetPasswordToken};
use crate::user::User;
use crate::value_objects::{Email, EntityId, UserRole};

const USER_COLUMNS: &str =
    "id, email, password, first_name, last_name, roles, created_at, updated_at, deleted_at";

const TOKEN_COLUMNS: &str = "id, user_id, token, name, created_at, last_used_at, expires_at";

fn is_unique_violation(e: &DbErr) -> bool {
    let text = e.to_string();
    text.contains("duplicate key") || text.contains("unique constraint")
}

fn statement<I>(sql: &str, values: I) -> Statement
where
    I: IntoIterator<Item = sea_orm::Value>,
{
    Statement::from_sql_and_values(DbBackend::Postgres, sql, values)
}

#[derive(Debug, FromQueryResult)]
struct UserRow {
    id: Uuid,
    email: String,
    password: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    roles: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
}

impl UserRow {
    fn into_user(self, auth_tokens: Vec<AuthToken>) -> UserResult<User> {
        let names: Vec<String> = serde_json::from_str(&self.roles)
            .map_err(|e| UserError::Internal(format!("Corrupt roles for user {}: {e}", self.id)))?;
        let roles = names
            .iter()
            .map(|name| name.parse::<UserRole>())
            .collect::<UserResult<Vec<_>>>()?;

        Ok(User {
            id: EntityId::from(self.id),
            email: Email::parse(&self.email)?,
            password: self.password,
            first_name: self.first_name,
            last_name: self.last_name,
            roles,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
            auth_tokens,
        })
    }
}

#[derive(Debug, FromQueryResult)]
struct AuthTokenRow {
    id: Uuid,
    user_id: Uuid,
    token: String,
    name: String,
    created_at: DateTime<Utc>,
    last_used_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl From<AuthTokenRow> for AuthToken {
    fn from(row: AuthTokenRow) -> Self {
        AuthToken {
            id: row.id,
            user_id: EntityId::from(row.user_id),
            token: row.token,
            name: row.name,
            created_at: row.created_at,
            last_used_at: row.last_used_at,
            expires_at: row.expires_at,
        }
    }
}

#[derive(Debug, FromQueryResult)]
struct RefreshTokenRow {
    id: Uuid,
    refresh_token: String,
    username: String,
    valid: DateTime<Utc>,
}

impl From<RefreshTokenRow> for RefreshToken {
    fn from(row: RefreshTokenRow) -> Self {
        RefreshToken {
            id: row.id,
            refresh_token: row.refresh_token,
            username: row.username,
            valid: row.valid,
        }
    }
}

#[derive(Debug, FromQueryResult)]
struct ResetTokenRow {
    email: String,
    reset_token: String,
    valid_until: Option<DateTime<Utc>>,
}

impl From<ResetTokenRow> for ResetPasswordToken {
    fn from(row: ResetTokenRow) -> Self {
        ResetPasswordToken {
            email: row.email,
            reset_token: row.reset_token,
            valid_until: row.valid_until,
        }
    }
}

#[derive(Debug, FromQueryResult)]
struct CountRow {
    count: i64,
}

/// `ORDER BY` clause for the whitelisted sort keys. Nulls sort first when
/// ascending and last when descending, with the id as a stable tiebreaker.
fn order_clause(order: Option<UserOrder>, ascending: bool) -> String {
    let (direction, nulls) = if ascending {
        ("ASC", "NULLS FIRST")
    } else {
        ("DESC", "NULLS LAST")
    };

    let columns: &[&str] = match order {
        None => return "id ASC".to_string(),
        Some(UserOrder::Id) => return format!("id {direction}"),
        Some(UserOrder::Name) => &["last_name", "first_name", "email"],
        Some(UserOrder::Email) => &["email"],
        Some(UserOrder::CreatedAt) => &["created_at"],
    };

    let mut parts: Vec<String> = columns
        .iter()
        .map(|column| format!("{column} {direction} {nulls}"))
        .collect();
    parts.push("id ASC".to_string());
    parts.join(", ")
}

#[derive(Clone)]
pub struct PostgresUserRepository {
    db: DatabaseConnection,
}

impl PostgresUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn tokens_for(db: &DatabaseConnection, user_id: Uuid) -> UserResult<Vec<AuthToken>> {
        let sql = format!("SELECT {TOKEN_COLUMNS} FROM auth_tokens WHERE user_id = $1 ORDER BY id");
        let rows = AuthTokenRow::find_by_statement(statement(&sql, [user_id.into()]))
            .all(db)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn hydrate(&self, row: Option<UserRow>) -> UserResult<Option<User>> {
        match row {
            Some(row) => {
                let tokens = Self::tokens_for(&self.db, row.id).await?;
                row.into_user(tokens).map(Some)
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find(&self, id: EntityId, with_deleted: bool) -> UserResult<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND ($2 OR deleted_at IS NULL)"
        );
        let row = UserRow::find_by_statement(statement(
            &sql,
            [id.as_uuid().into(), with_deleted.into()],
        ))
        .one(&self.db)
        .await?;

        self.hydrate(row).await
    }

    async fn find_by_email(&self, email: &str, with_deleted: bool) -> UserResult<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE lower(email) = lower($1) AND ($2 OR deleted_at IS NULL)"
        );
        let row = UserRow::find_by_statement(statement(
            &sql,
            [email.trim().into(), with_deleted.into()],
        ))
        .one(&self.db)
        .await?;

        self.hydrate(row).await
    }

    async fn email_exists(&self, email: &str, exclude: Option<EntityId>) -> UserResult<bool> {
        let sql = "SELECT COUNT(*) AS count FROM users \
                   WHERE lower(email) = lower($1) AND ($2::uuid IS NULL OR id <> $2)";
        let row = CountRow::find_by_statement(statement(
            sql,
            [email.trim().into(), exclude.map(Uuid::from).into()],
        ))
        .one(&self.db)
        .await?;

        Ok(row.is_some_and(|r| r.count > 0))
    }

    async fn save(&self, user: &User) -> UserResult<()> {
        let roles: Vec<&str> = user.roles.iter().map(UserRole::as_str).collect();
        let roles = serde_json::to_string(&roles)
            .map_err(|e| UserError::Internal(format!("Failed to encode roles: {e}")))?;

        let sql = r#"
            INSERT INTO users (id, email, password, first_name, last_name, roles, created_at, updated_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                password = EXCLUDED.password,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                roles = EXCLUDED.roles,
                updated_at = EXCLUDED.updated_at,
                deleted_at = EXCLUDED.deleted_at
        "#;
        self.db
            .execute_raw(statement(
                sql,
                [
                    user.id.as_uuid().into(),
                    user.email.as_str().into(),
                    user.password.clone().into(),
                    user.first_name.clone().into(),
                    user.last_name.clone().into(),
                    roles.into(),
                    user.created_at.into(),
                    user.updated_at.into(),
                    user.deleted_at.into(),
                ],
            ))
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    UserError::Conflict(DUPLICATE_EMAIL.to_string())
                } else {
                    UserError::Database(e)
                }
            })?;

        tracing::debug!(user_id = %user.id, "Saved user");
        Ok(())
    }

    async fn delete(&self, id: EntityId) -> UserResult<bool> {
        let result = self
            .db
            .execute_raw(statement(
                "DELETE FROM users WHERE id = $1",
                [id.as_uuid().into()],
            ))
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, criteria: &UserListCriteria) -> UserResult<(Vec<User>, u64)> {
        let count = CountRow::find_by_statement(statement(
            "SELECT COUNT(*) AS count FROM users WHERE ($1 OR deleted_at IS NULL)",
            [criteria.with_deleted.into()],
        ))
        .one(&self.db)
        .await?
        .map(|r| r.count)
        .unwrap_or(0);

        let order = order_clause(criteria.order, criteria.ascending);
        let offset = i64::try_from(criteria.offset).unwrap_or(i64::MAX);

        let rows = match criteria.limit {
            Some(limit) => {
                let sql = format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE ($1 OR deleted_at IS NULL) \
                     ORDER BY {order} LIMIT $2 OFFSET $3"
                );
                let limit = i64::try_from(limit).unwrap_or(i64::MAX);
                UserRow::find_by_statement(statement(
                    &sql,
                    [criteria.with_deleted.into(), limit.into(), offset.into()],
                ))
                .all(&self.db)
                .await?
            }
            None => {
                let sql = format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE ($1 OR deleted_at IS NULL) \
                     ORDER BY {order} OFFSET $2"
                );
                UserRow::find_by_statement(statement(
                    &sql,
                    [criteria.with_deleted.into(), offset.into()],
                ))
                .all(&self.db)
                .await?
            }
        };

        let users = rows
            .into_iter()
            .map(|row| row.into_user(Vec::new()))
            .collect::<UserResult<Vec<_>>>()?;

        Ok((users, u64::try_from(count).unwrap_or(0)))
    }
}

async fn upsert_token<C: ConnectionTrait>(db: &C, token: &AuthToken) -> UserResult<()> {
    let sql = r#"
        INSERT INTO auth_tokens (id, user_id, token, name, created_at, last_used_at, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (id) DO UPDATE SET
            last_used_at = EXCLUDED.last_used_at,
            expires_at = EXCLUDED.expires_at
    "#;

    db.execute_raw(statement(
        sql,
        [
            token.id.into(),
            token.user_id.as_uuid().into(),
            token.token.clone().into(),
            token.name.clone().into(),
            token.created_at.into(),
            token.last_used_at.into(),
            token.expires_at.into(),
        ],
    ))
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            UserError::Conflict(format!("Token for device {} already exists", token.name))
        } else {
            UserError::Database(e)
        }
    })?;

    Ok(())
}

#[derive(Clone)]
pub struct PostgresAuthTokenRepository {
    db: DatabaseConnection,
}

impl PostgresAuthTokenRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn one(&self, sql: &str, values: Vec<sea_orm::Value>) -> UserResult<Option<AuthToken>> {
        let row = AuthTokenRow::find_by_statement(statement(sql, values))
            .one(&self.db)
            .await?;
        Ok(row.map(Into::into))
    }
}

#[async_trait]
impl AuthTokenRepository for PostgresAuthTokenRepository {
    async fn find(&self, id: Uuid) -> UserResult<Option<AuthToken>> {
        let sql = format!("SELECT {TOKEN_COLUMNS} FROM auth_tokens WHERE id = $1");
        self.one(&sql, vec![id.into()]).await
    }

    async fn find_by_token(&self, token: &str) -> UserResult<Option<AuthToken>> {
        let sql = format!("SELECT {TOKEN_COLUMNS} FROM auth_tokens WHERE token = $1");
        self.one(&sql, vec![token.into()]).await
    }

    async fn find_by_user_and_name(
        &self,
        user_id: EntityId,
        name: &str,
    ) -> UserResult<Option<AuthToken>> {
        let sql = format!("SELECT {TOKEN_COLUMNS} FROM auth_tokens WHERE user_id = $1 AND name = $2");
        self.one(&sql, vec![user_id.as_uuid().into(), name.into()])
            .await
    }

    async fn save(&self, token: &AuthToken) -> UserResult<()> {
        upsert_token(&self.db, token).await
    }

    async fn delete(&self, id: Uuid) -> UserResult<bool> {
        let result = self
            .db
            .execute_raw(statement("DELETE FROM auth_tokens WHERE id = $1", [id.into()]))
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Clone)]
pub struct PostgresRefreshTokenRepository {
    db: DatabaseConnection,
}

impl PostgresRefreshTokenRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RefreshTokenRepository for PostgresRefreshTokenRepository {
    async fn find_by_token(&self, refresh_token: &str) -> UserResult<Option<RefreshToken>> {
        let row = RefreshTokenRow::find_by_statement(statement(
            "SELECT id, refresh_token, username, valid FROM refresh_tokens WHERE refresh_token = $1",
            [refresh_token.into()],
        ))
        .one(&self.db)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn save(&self, token: &RefreshToken) -> UserResult<()> {
        let sql = r#"
            INSERT INTO refresh_tokens (id, refresh_token, username, valid)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET valid = EXCLUDED.valid
        "#;
        self.db
            .execute_raw(statement(
                sql,
                [
                    token.id.into(),
                    token.refresh_token.clone().into(),
                    token.username.clone().into(),
                    token.valid.into(),
                ],
            ))
            .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> UserResult<bool> {
        let result = self
            .db
            .execute_raw(statement(
                "DELETE FROM refresh_tokens WHERE id = $1",
                [id.into()],
            ))
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_for_username(&self, username: &str) -> UserResult<u64> {
        let result = self
            .db
            .execute_raw(statement(
                "DELETE FROM refresh_tokens WHERE username = $1",
                [username.into()],
            ))
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Clone)]
pub struct PostgresResetPasswordTokenRepository {
    db: DatabaseConnection,
}

impl PostgresResetPasswordTokenRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ResetPasswordTokenRepository for PostgresResetPasswordTokenRepository {
    async fn find_by_token(&self, reset_token: &str) -> UserResult<Option<ResetPasswordToken>> {
        let row = ResetTokenRow::find_by_statement(statement(
            "SELECT email, reset_token, valid_until FROM reset_password_tokens WHERE reset_token = $1",
            [reset_token.into()],
        ))
        .one(&self.db)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn find_by_email(&self, email: &str) -> UserResult<Option<ResetPasswordToken>> {
        let row = ResetTokenRow::find_by_statement(statement(
            "SELECT email, reset_token, valid_until FROM reset_password_tokens WHERE email = $1",
            [email.into()],
        ))
        .one(&self.db)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn save(&self, token: &ResetPasswordToken) -> UserResult<()> {
        let sql = r#"
            INSERT INTO reset_password_tokens (email, reset_token, valid_until)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO UPDATE SET
                reset_token = EXCLUDED.reset_token,
                valid_until = EXCLUDED.valid_until
        "#;
        self.db
            .execute_raw(statement(
                sql,
                [
                    token.email.clone().into(),
                    token.reset_token.clone().into(),
                    token.valid_until.into(),
                ],
            ))
            .await?;
        Ok(())
    }

    async fn delete_by_email(&self, email: &str) -> UserResult<bool> {
        let result = self
            .db
            .execute_raw(statement(
                "DELETE FROM reset_password_tokens WHERE email = $1",
                [email.into()],
            ))
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_clause_whitelist() {
        assert_eq!(order_clause(None, false), "id ASC");
        assert_eq!(order_clause(Some(UserOrder::Id), false), "id DESC");
        assert_eq!(
            order_clause(Some(UserOrder::Name), true),
            "last_name ASC NULLS FIRST, first_name ASC NULLS FIRST, email ASC NULLS FIRST, id ASC"
        );
        assert_eq!(
            order_clause(Some(UserOrder::CreatedAt), false),
            "created_at DESC NULLS LAST, id ASC"
        );
    }

    #[test]
    fn test_row_with_unknown_role_is_rejected() {
        let row = UserRow {
            id: Uuid::now_v7(),
            email: "jane@example.com".into(),
            password: None,
            first_name: None,
            last_name: None,
            roles: r#"["ROLE_ROOT"]"#.into(),
            created_at: Utc::now(),
            updated_at: None,
            deleted_at: None,
        };
        assert!(row.into_user(Vec::new()).is_err());
    }

    #[test]
    fn test_row_maps_to_user() {
        let row = UserRow {
            id: Uuid::now_v7(),
            email: "jane@example.com".into(),
            password: Some("hash".into()),
            first_name: Some("Jane".into()),
            last_name: None,
            roles: r#"["ROLE_ADMIN"]"#.into(),
            created_at: Utc::now(),
            updated_at: None,
            deleted_at: None,
        };
        let user = row.into_user(Vec::new()).unwrap();
        assert_eq!(user.role(), UserRole::Admin);
        assert_eq!(user.display_name(), "Jane");
    }
}
