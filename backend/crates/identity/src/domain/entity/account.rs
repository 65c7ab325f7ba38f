//! Account Entity
//!
//! The user record the session logic needs: credentials, contact
//! channels with their confirmation state, role, and lockout tracking.

use chrono::{DateTime, Duration, Utc};
use platform::password::HashedPassword;

use crate::domain::value_object::{
    UserId, email::Email, phone_number::PhoneNumber, user_name::UserName, user_role::UserRole,
};

#[derive(Debug, Clone)]
pub struct Account {
    pub user_id: UserId,
    pub user_name: UserName,
    pub email: Email,
    pub email_confirmed: bool,
    pub phone_number: Option<PhoneNumber>,
    pub phone_number_confirmed: bool,
    pub role: UserRole,
    pub password_hash: HashedPassword,
    /// Consecutive failed sign-in attempts
    pub access_failed_count: u16,
    /// Locked until this time, if locked
    pub lockout_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Maximum sign-in failures before temporary lockout
    pub const MAX_ACCESS_FAILURES: u16 = 5;
    /// Lockout duration in minutes
    pub const LOCKOUT_MINUTES: i64 = 15;

    pub fn new(
        user_name: UserName,
        email: Email,
        phone_number: Option<PhoneNumber>,
        password_hash: HashedPassword,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: UserId::new(),
            user_name,
            email,
            email_confirmed: false,
            phone_number,
            phone_number_confirmed: false,
            role: UserRole::default(),
            password_hash,
            access_failed_count: 0,
            lockout_end: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_locked_out(&self, now: DateTime<Utc>) -> bool {
        self.lockout_end.is_some_and(|end| now < end)
    }

    /// Record a failed sign-in; returns `true` when this failure locked the account
    ///
    /// The counter restarts once the lockout is applied.
    pub fn record_failure(&mut self, now: DateTime<Utc>) -> bool {
        self.access_failed_count += 1;
        self.updated_at = now;

        if self.access_failed_count >= Self::MAX_ACCESS_FAILURES {
            self.lockout_end = Some(now + Duration::minutes(Self::LOCKOUT_MINUTES));
            self.access_failed_count = 0;
            return true;
        }
        false
    }

    pub fn reset_failures(&mut self, now: DateTime<Utc>) {
        if self.access_failed_count != 0 || self.lockout_end.is_some() {
            self.access_failed_count = 0;
            self.lockout_end = None;
            self.updated_at = now;
        }
    }

    pub fn confirm_email(&mut self, now: DateTime<Utc>) {
        self.email_confirmed = true;
        self.updated_at = now;
    }

    /// Replace the email; proving the code counts as confirmation
    pub fn change_email(&mut self, email: Email, now: DateTime<Utc>) {
        self.email = email;
        self.email_confirmed = true;
        self.updated_at = now;
    }

    pub fn confirm_phone_number(&mut self, now: DateTime<Utc>) {
        self.phone_number_confirmed = true;
        self.updated_at = now;
    }

    pub fn change_phone_number(&mut self, phone_number: PhoneNumber, now: DateTime<Utc>) {
        self.phone_number = Some(phone_number);
        self.phone_number_confirmed = true;
        self.updated_at = now;
    }

    pub fn set_password(&mut self, password_hash: HashedPassword, now: DateTime<Utc>) {
        self.password_hash = password_hash;
        self.updated_at = now;
    }
}
