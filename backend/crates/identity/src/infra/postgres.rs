//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use platform::password::HashedPassword;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{account::Account, session::Session};
use crate::domain::repository::{AccountRepository, SessionRepository};
use crate::domain::value_object::{
    UserId, email::Email, mac_address::MacAddress, phone_number::PhoneNumber,
    user_name::UserName, user_role::UserRole,
};
use crate::error::{IdentityError, IdentityResult};

const ACCOUNT_COLUMNS: &str = r#"
    user_id,
    user_name,
    email,
    email_confirmed,
    phone_number,
    phone_number_confirmed,
    user_role,
    password_hash,
    access_failed_count,
    lockout_end,
    created_at,
    updated_at
"#;

/// PostgreSQL-backed identity repository
#[derive(Clone)]
pub struct PgIdentityRepository {
    pool: PgPool,
}

impl PgIdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_account_where(
        &self,
        predicate: &str,
        value: &str,
    ) -> IdentityResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE {predicate} = $1");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.map(AccountRow::into_account).transpose()
    }
}

/// Map unique violations on the account table to domain errors
fn map_unique_violation(err: sqlx::Error) -> IdentityError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            match db_err.constraint() {
                Some("accounts_user_name_canonical_key") => return IdentityError::UserNameTaken,
                Some("accounts_email_key") => return IdentityError::EmailTaken,
                _ => {}
            }
        }
    }
    IdentityError::Database(err)
}

// ============================================================================
// Account Repository Implementation
// ============================================================================

impl AccountRepository for PgIdentityRepository {
    async fn create(&self, account: &Account) -> IdentityResult<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (
                user_id,
                user_name,
                user_name_canonical,
                email,
                email_confirmed,
                phone_number,
                phone_number_confirmed,
                user_role,
                password_hash,
                access_failed_count,
                lockout_end,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(account.user_id.as_uuid())
        .bind(account.user_name.as_str())
        .bind(account.user_name.canonical())
        .bind(account.email.as_str())
        .bind(account.email_confirmed)
        .bind(account.phone_number.as_ref().map(|p| p.as_str()))
        .bind(account.phone_number_confirmed)
        .bind(account.role.id())
        .bind(account.password_hash.as_phc_string())
        .bind(account.access_failed_count as i16)
        .bind(account.lockout_end)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(())
    }

    async fn find_by_id(&self, user_id: &UserId) -> IdentityResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = $1");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(AccountRow::into_account).transpose()
    }

    async fn find_by_user_name(&self, user_name: &UserName) -> IdentityResult<Option<Account>> {
        self.find_account_where("user_name_canonical", &user_name.canonical())
            .await
    }

    async fn find_by_email(&self, email: &Email) -> IdentityResult<Option<Account>> {
        self.find_account_where("email", email.as_str()).await
    }

    async fn exists_by_user_name(&self, user_name: &UserName) -> IdentityResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE user_name_canonical = $1)",
        )
        .bind(user_name.canonical())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn exists_by_email(&self, email: &Email) -> IdentityResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM accounts WHERE email = $1)")
                .bind(email.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn update(&self, account: &Account) -> IdentityResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                user_name = $2,
                user_name_canonical = $3,
                email = $4,
                email_confirmed = $5,
                phone_number = $6,
                phone_number_confirmed = $7,
                user_role = $8,
                password_hash = $9,
                access_failed_count = $10,
                lockout_end = $11,
                updated_at = $12
            WHERE user_id = $1
            "#,
        )
        .bind(account.user_id.as_uuid())
        .bind(account.user_name.as_str())
        .bind(account.user_name.canonical())
        .bind(account.email.as_str())
        .bind(account.email_confirmed)
        .bind(account.phone_number.as_ref().map(|p| p.as_str()))
        .bind(account.phone_number_confirmed)
        .bind(account.role.id())
        .bind(account.password_hash.as_phc_string())
        .bind(account.access_failed_count as i16)
        .bind(account.lockout_end)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        if result.rows_affected() == 0 {
            return Err(IdentityError::AccountNotFound);
        }

        Ok(())
    }
}

// ============================================================================
// Session Repository Implementation
// ============================================================================

impl SessionRepository for PgIdentityRepository {
    async fn find_session(&self, user_id: &UserId) -> IdentityResult<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT
                user_id,
                token,
                refresh_token,
                mac_address,
                last_login
            FROM sessions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SessionRow::into_session))
    }

    async fn save_session(&self, session: &Session) -> IdentityResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (
                user_id,
                token,
                refresh_token,
                mac_address,
                last_login
            ) VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE SET
                token = EXCLUDED.token,
                refresh_token = EXCLUDED.refresh_token,
                mac_address = EXCLUDED.mac_address,
                last_login = EXCLUDED.last_login
            "#,
        )
        .bind(session.user_id.as_uuid())
        .bind(session.token.as_deref())
        .bind(session.refresh_token.as_deref())
        .bind(session.mac_address.as_ref().map(|m| m.as_str()))
        .bind(session.last_login)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn replace_session_if(
        &self,
        session: &Session,
        expected: Option<&str>,
    ) -> IdentityResult<bool> {
        // The upsert's WHERE is evaluated against the locked, committed row
        let result = sqlx::query(
            r#"
            INSERT INTO sessions (
                user_id,
                token,
                refresh_token,
                mac_address,
                last_login
            ) VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE SET
                token = EXCLUDED.token,
                refresh_token = EXCLUDED.refresh_token,
                mac_address = EXCLUDED.mac_address,
                last_login = EXCLUDED.last_login
            WHERE sessions.token IS NOT DISTINCT FROM $6
            "#,
        )
        .bind(session.user_id.as_uuid())
        .bind(session.token.as_deref())
        .bind(session.refresh_token.as_deref())
        .bind(session.mac_address.as_ref().map(|m| m.as_str()))
        .bind(session.last_login)
        .bind(expected)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct AccountRow {
    user_id: Uuid,
    user_name: String,
    email: String,
    email_confirmed: bool,
    phone_number: Option<String>,
    phone_number_confirmed: bool,
    user_role: i16,
    password_hash: String,
    access_failed_count: i16,
    lockout_end: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_account(self) -> IdentityResult<Account> {
        let role = UserRole::from_id(self.user_role).ok_or_else(|| {
            IdentityError::Internal(format!("Invalid user_role: {}", self.user_role))
        })?;

        let password_hash = HashedPassword::from_phc_string(self.password_hash)
            .map_err(|e| IdentityError::Internal(format!("Invalid password_hash: {}", e)))?;

        Ok(Account {
            user_id: UserId::from_uuid(self.user_id),
            user_name: UserName::from_db(self.user_name),
            email: Email::from_db(self.email),
            email_confirmed: self.email_confirmed,
            phone_number: self.phone_number.map(PhoneNumber::from_db),
            phone_number_confirmed: self.phone_number_confirmed,
            role,
            password_hash,
            access_failed_count: self.access_failed_count.max(0) as u16,
            lockout_end: self.lockout_end,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    user_id: Uuid,
    token: Option<String>,
    refresh_token: Option<String>,
    mac_address: Option<String>,
    last_login: DateTime<Utc>,
}

impl SessionRow {
    fn into_session(self) -> Session {
        Session {
            user_id: UserId::from_uuid(self.user_id),
            token: self.token,
            refresh_token: self.refresh_token,
            mac_address: self.mac_address.map(MacAddress::from_db),
            last_login: self.last_login,
        }
    }
}
