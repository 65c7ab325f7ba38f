//! User Validator
//!
//! Enforces the session rules on every login and every authenticated
//! request: one live login per user (`restrict_single_login`), one device
//! per user (`restrict_single_device`), token rotation and session reset.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use platform::clock::Clock;

use crate::application::config::IdentityConfig;
use crate::domain::entity::session::Session;
use crate::domain::repository::SessionRepository;
use crate::domain::value_object::{UserId, mac_address::MacAddress};
use crate::error::{IdentityError, IdentityResult};

pub struct UserValidator<R>
where
    R: SessionRepository,
{
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
    config: Arc<IdentityConfig>,
}

impl<R> UserValidator<R>
where
    R: SessionRepository,
{
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>, config: Arc<IdentityConfig>) -> Self {
        Self {
            repo,
            clock,
            config,
        }
    }

    /// Same checks as [`Self::validate_user_identity`], answered as a bool
    pub async fn verify_user_identity(
        &self,
        user_id: &UserId,
        token: Option<&str>,
        device: Option<&str>,
    ) -> bool {
        self.validate_user_identity(user_id, token, device)
            .await
            .is_ok()
    }

    /// Check a login attempt (`token == None`) or an authenticated request
    ///
    /// `device` is the raw `Mac-Address` header value.
    pub async fn validate_user_identity(
        &self,
        user_id: &UserId,
        token: Option<&str>,
        device: Option<&str>,
    ) -> IdentityResult<()> {
        let now = self.clock.now();
        let mac_address = MacAddress::from_header(device);
        let mut session = self
            .get_or_create_session(user_id, mac_address.clone(), now)
            .await?;

        if self.config.restrict_single_login {
            self.validate_single_login(&mut session, token, now).await?;
        }

        if self.config.restrict_single_device {
            self.validate_single_device(&mut session, token, mac_address)
                .await?;
        }

        Ok(())
    }

    /// Rotate the session token pair, creating the session if needed
    pub async fn update_user_session(
        &self,
        user_id: &UserId,
        device: Option<&str>,
    ) -> IdentityResult<(String, String)> {
        let now = self.clock.now();
        let mac_address = MacAddress::from_header(device);
        let mut session = match self.repo.find_session(user_id).await? {
            Some(session) => session,
            None => Session::new(*user_id, mac_address.clone(), now),
        };

        let pair = session.rotate(now);
        if let Some(mac_address) = mac_address {
            session.bind_device(mac_address);
        }
        self.repo.save_session(&session).await?;

        tracing::debug!(user_id = %user_id, "Session token rotated");
        Ok(pair)
    }

    /// Admit a login and start its session in one step
    ///
    /// Applies the single-login and single-device rules for a new login,
    /// then rotates the token pair. When a live session blocks new logins
    /// the write is a compare-and-set on the token seen by the check, so
    /// of two concurrent logins at most one gets a session.
    pub async fn login_user_session(
        &self,
        user_id: &UserId,
        device: Option<&str>,
    ) -> IdentityResult<(String, String)> {
        let now = self.clock.now();
        let mac_address = MacAddress::from_header(device);
        let mut session = match self.repo.find_session(user_id).await? {
            Some(session) => session,
            None => Session::new(*user_id, mac_address.clone(), now),
        };
        let seen_token = session.token.clone();

        let exclusive = self.config.restrict_single_login && !self.config.logout_on_new_login;
        if self.config.restrict_single_login && !self.login_eligible(&session, now) {
            if exclusive {
                return Err(IdentityError::AlreadyLoggedIn);
            }
            tracing::info!(user_id = %user_id, "Previous login replaced by a new one");
        }
        if self.config.restrict_single_device && mac_address.is_none() {
            return Err(IdentityError::UnauthorizedDevice);
        }

        let pair = session.rotate(now);
        if let Some(mac_address) = mac_address {
            session.bind_device(mac_address);
        }

        if exclusive {
            if !self
                .repo
                .replace_session_if(&session, seen_token.as_deref())
                .await?
            {
                tracing::warn!(user_id = %user_id, "Concurrent login rejected");
                return Err(IdentityError::AlreadyLoggedIn);
            }
        } else {
            self.repo.save_session(&session).await?;
        }

        tracing::debug!(user_id = %user_id, "Session started");
        Ok(pair)
    }

    /// Log the user out; `forced` also forgets the bound device
    pub async fn reset_user_session(&self, user_id: &UserId, forced: bool) -> IdentityResult<()> {
        let Some(mut session) = self.repo.find_session(user_id).await? else {
            return Ok(());
        };

        session.reset(forced);
        self.repo.save_session(&session).await?;

        tracing::debug!(user_id = %user_id, forced, "Session reset");
        Ok(())
    }

    /// Exchange a refresh token for a new token pair
    pub async fn refresh_user_session(
        &self,
        user_id: &UserId,
        refresh_token: &str,
        device: Option<&str>,
    ) -> IdentityResult<(String, String)> {
        let now = self.clock.now();
        let mut session = self
            .repo
            .find_session(user_id)
            .await?
            .ok_or(IdentityError::InvalidRefreshToken)?;

        if !session.refresh_token_matches(refresh_token) {
            return Err(IdentityError::InvalidRefreshToken);
        }
        if session.is_expired(now, self.config.session_expiration_period) {
            return Err(IdentityError::SessionExpired);
        }
        if self.config.restrict_single_device {
            let mac_address =
                MacAddress::from_header(device).ok_or(IdentityError::UnauthorizedDevice)?;
            if !session.is_bound_to(&mac_address) {
                return Err(IdentityError::UnauthorizedDevice);
            }
        }

        let pair = session.rotate(now);
        self.repo.save_session(&session).await?;

        tracing::debug!(user_id = %user_id, "Session refreshed");
        Ok(pair)
    }

    async fn get_or_create_session(
        &self,
        user_id: &UserId,
        mac_address: Option<MacAddress>,
        now: DateTime<Utc>,
    ) -> IdentityResult<Session> {
        if let Some(session) = self.repo.find_session(user_id).await? {
            return Ok(session);
        }

        let session = Session::new(*user_id, mac_address, now);
        self.repo.save_session(&session).await?;
        Ok(session)
    }

    async fn validate_single_login(
        &self,
        session: &mut Session,
        token: Option<&str>,
        now: DateTime<Utc>,
    ) -> IdentityResult<()> {
        if token.is_none() {
            if self.login_eligible(session, now) {
                return Ok(());
            }
            if !self.config.logout_on_new_login {
                return Err(IdentityError::AlreadyLoggedIn);
            }

            session.reset(false);
            self.repo.save_session(session).await?;
            tracing::info!(user_id = %session.user_id, "Previous login replaced by a new one");
        }

        if !session.token_matches(token) {
            return Err(IdentityError::Unauthorized);
        }
        Ok(())
    }

    /// No live session stands in the way of a new login
    fn login_eligible(&self, session: &Session, now: DateTime<Utc>) -> bool {
        !session.is_logged_in() || session.is_expired(now, self.config.session_expiration_period)
    }

    async fn validate_single_device(
        &self,
        session: &mut Session,
        token: Option<&str>,
        mac_address: Option<MacAddress>,
    ) -> IdentityResult<()> {
        let mac_address = mac_address.ok_or(IdentityError::UnauthorizedDevice)?;

        if token.is_some() {
            if !session.is_bound_to(&mac_address) {
                return Err(IdentityError::UnauthorizedDevice);
            }
            return Ok(());
        }

        session.bind_device(mac_address);
        self.repo.save_session(session).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::InMemoryIdentityRepository;
    use chrono::Duration;
    use platform::clock::ManualClock;

    const MAC_A: &str = "00:1A:2B:3C:4D:5E";
    const MAC_B: &str = "AA-BB-CC-DD-EE-FF";

    struct Fixture {
        repo: Arc<InMemoryIdentityRepository>,
        clock: Arc<ManualClock>,
        validator: UserValidator<InMemoryIdentityRepository>,
    }

    fn fixture(config: IdentityConfig) -> Fixture {
        let repo = Arc::new(InMemoryIdentityRepository::new());
        let clock = Arc::new(ManualClock::starting_now());
        let validator = UserValidator::new(repo.clone(), clock.clone(), Arc::new(config));
        Fixture {
            repo,
            clock,
            validator,
        }
    }

    fn single_login(logout_on_new_login: bool) -> IdentityConfig {
        IdentityConfig {
            restrict_single_login: true,
            logout_on_new_login,
            ..IdentityConfig::with_random_secret()
        }
    }

    fn single_device() -> IdentityConfig {
        IdentityConfig {
            restrict_single_device: true,
            ..IdentityConfig::with_random_secret()
        }
    }

    #[tokio::test]
    async fn test_first_login_creates_session() {
        let f = fixture(single_login(false));
        let user_id = UserId::new();

        f.validator
            .validate_user_identity(&user_id, None, Some(MAC_A))
            .await
            .unwrap();

        let session = f.repo.find_session(&user_id).await.unwrap().unwrap();
        assert!(!session.is_logged_in());
        assert_eq!(session.mac_address.unwrap().as_str(), MAC_A);
    }

    #[tokio::test]
    async fn test_second_login_rejected_while_session_live() {
        let f = fixture(single_login(false));
        let user_id = UserId::new();
        f.validator.update_user_session(&user_id, None).await.unwrap();

        let err = f
            .validator
            .validate_user_identity(&user_id, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::AlreadyLoggedIn));
    }

    #[tokio::test]
    async fn test_new_login_replaces_live_session() {
        let f = fixture(single_login(true));
        let user_id = UserId::new();
        let (old_token, _) = f.validator.update_user_session(&user_id, None).await.unwrap();

        f.validator
            .validate_user_identity(&user_id, None, None)
            .await
            .unwrap();

        // The old token no longer works
        assert!(
            !f.validator
                .verify_user_identity(&user_id, Some(&old_token), None)
                .await
        );
        let session = f.repo.find_session(&user_id).await.unwrap().unwrap();
        assert!(!session.is_logged_in());
    }

    #[tokio::test]
    async fn test_expired_session_allows_relogin() {
        let f = fixture(single_login(false));
        let user_id = UserId::new();
        f.validator.update_user_session(&user_id, None).await.unwrap();

        f.clock.advance(Duration::hours(24) + Duration::seconds(1));

        f.validator
            .validate_user_identity(&user_id, None, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_token_must_match_stored_token() {
        let f = fixture(single_login(false));
        let user_id = UserId::new();
        let (token, _) = f.validator.update_user_session(&user_id, None).await.unwrap();

        f.validator
            .validate_user_identity(&user_id, Some(&token), None)
            .await
            .unwrap();

        let err = f
            .validator
            .validate_user_identity(&user_id, Some("0123456789abcdef0123456789abcdef"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Unauthorized));
    }

    #[tokio::test]
    async fn test_unrestricted_login_skips_checks() {
        let f = fixture(IdentityConfig::with_random_secret());
        let user_id = UserId::new();
        f.validator.update_user_session(&user_id, None).await.unwrap();

        assert!(f.validator.verify_user_identity(&user_id, None, None).await);
        assert!(
            f.validator
                .verify_user_identity(&user_id, Some("anything"), Some("junk"))
                .await
        );
    }

    #[tokio::test]
    async fn test_single_device_requires_valid_mac() {
        let f = fixture(single_device());
        let user_id = UserId::new();

        for device in [None, Some("not-a-mac"), Some("00:1A:2B:3C:4D")] {
            let err = f
                .validator
                .validate_user_identity(&user_id, None, device)
                .await
                .unwrap_err();
            assert!(matches!(err, IdentityError::UnauthorizedDevice));
        }
    }

    #[tokio::test]
    async fn test_single_device_binds_on_login_and_checks_after() {
        let f = fixture(single_device());
        let user_id = UserId::new();

        f.validator
            .validate_user_identity(&user_id, None, Some(MAC_A))
            .await
            .unwrap();
        let (token, _) = f
            .validator
            .update_user_session(&user_id, Some(MAC_A))
            .await
            .unwrap();

        f.validator
            .validate_user_identity(&user_id, Some(&token), Some(MAC_A))
            .await
            .unwrap();

        let err = f
            .validator
            .validate_user_identity(&user_id, Some(&token), Some(MAC_B))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::UnauthorizedDevice));
    }

    #[tokio::test]
    async fn test_login_from_new_device_rebinds() {
        let f = fixture(single_device());
        let user_id = UserId::new();

        f.validator
            .validate_user_identity(&user_id, None, Some(MAC_A))
            .await
            .unwrap();
        f.validator
            .validate_user_identity(&user_id, None, Some(MAC_B))
            .await
            .unwrap();

        let session = f.repo.find_session(&user_id).await.unwrap().unwrap();
        assert_eq!(session.mac_address.unwrap().as_str(), MAC_B);
    }

    #[tokio::test]
    async fn test_update_overwrites_previous_pair() {
        let f = fixture(IdentityConfig::with_random_secret());
        let user_id = UserId::new();

        let (t1, r1) = f.validator.update_user_session(&user_id, Some(MAC_A)).await.unwrap();
        let (t2, r2) = f.validator.update_user_session(&user_id, Some("junk")).await.unwrap();
        assert_ne!(t1, t2);
        assert_ne!(r1, r2);

        let session = f.repo.find_session(&user_id).await.unwrap().unwrap();
        assert_eq!(session.token.as_deref(), Some(t2.as_str()));
        assert_eq!(session.refresh_token.as_deref(), Some(r2.as_str()));
        // A malformed MAC leaves the bound device alone
        assert_eq!(session.mac_address.unwrap().as_str(), MAC_A);
    }

    #[tokio::test]
    async fn test_reset_session() {
        let f = fixture(IdentityConfig::with_random_secret());
        let user_id = UserId::new();

        // No session yet: nothing to do
        f.validator.reset_user_session(&user_id, true).await.unwrap();
        assert!(f.repo.find_session(&user_id).await.unwrap().is_none());

        f.validator.update_user_session(&user_id, Some(MAC_A)).await.unwrap();
        f.validator.reset_user_session(&user_id, false).await.unwrap();
        let session = f.repo.find_session(&user_id).await.unwrap().unwrap();
        assert!(!session.is_logged_in());
        assert!(session.mac_address.is_some());

        f.validator.reset_user_session(&user_id, true).await.unwrap();
        let session = f.repo.find_session(&user_id).await.unwrap().unwrap();
        assert!(session.mac_address.is_none());
    }

    #[tokio::test]
    async fn test_refresh_rotates_pair() {
        let f = fixture(IdentityConfig::with_random_secret());
        let user_id = UserId::new();
        let (token, refresh) = f.validator.update_user_session(&user_id, None).await.unwrap();

        let (new_token, new_refresh) = f
            .validator
            .refresh_user_session(&user_id, &refresh, None)
            .await
            .unwrap();
        assert_ne!(token, new_token);
        assert_ne!(refresh, new_refresh);

        // The used refresh token is gone
        let err = f
            .validator
            .refresh_user_session(&user_id, &refresh, None)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::InvalidRefreshToken));
    }

    #[tokio::test]
    async fn test_refresh_rejected_after_expiry_or_logout() {
        let f = fixture(IdentityConfig::with_random_secret());
        let user_id = UserId::new();
        let (_, refresh) = f.validator.update_user_session(&user_id, None).await.unwrap();

        f.clock.advance(Duration::hours(25));
        let err = f
            .validator
            .refresh_user_session(&user_id, &refresh, None)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::SessionExpired));

        f.validator.reset_user_session(&user_id, false).await.unwrap();
        let err = f
            .validator
            .refresh_user_session(&user_id, &refresh, None)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::InvalidRefreshToken));
    }

    #[tokio::test]
    async fn test_refresh_checks_device() {
        let f = fixture(single_device());
        let user_id = UserId::new();
        let (_, refresh) = f
            .validator
            .update_user_session(&user_id, Some(MAC_A))
            .await
            .unwrap();

        let err = f
            .validator
            .refresh_user_session(&user_id, &refresh, Some(MAC_B))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::UnauthorizedDevice));

        f.validator
            .refresh_user_session(&user_id, &refresh, Some(MAC_A))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_login_session_rejects_second_login() {
        let f = fixture(single_login(false));
        let user_id = UserId::new();

        let (token, _) = f.validator.login_user_session(&user_id, None).await.unwrap();
        let err = f
            .validator
            .login_user_session(&user_id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::AlreadyLoggedIn));

        // The first login's token survives the rejected attempt
        f.validator
            .validate_user_identity(&user_id, Some(&token), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_login_session_replaces_under_logout_on_new_login() {
        let f = fixture(single_login(true));
        let user_id = UserId::new();

        let (old_token, _) = f.validator.login_user_session(&user_id, None).await.unwrap();
        let (new_token, _) = f.validator.login_user_session(&user_id, None).await.unwrap();

        assert!(
            !f.validator
                .verify_user_identity(&user_id, Some(&old_token), None)
                .await
        );
        assert!(
            f.validator
                .verify_user_identity(&user_id, Some(&new_token), None)
                .await
        );
    }

    #[tokio::test]
    async fn test_login_session_requires_device_and_binds_it() {
        let f = fixture(single_device());
        let user_id = UserId::new();

        let err = f
            .validator
            .login_user_session(&user_id, Some("junk"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::UnauthorizedDevice));

        let (token, _) = f
            .validator
            .login_user_session(&user_id, Some(MAC_A))
            .await
            .unwrap();
        let session = f.repo.find_session(&user_id).await.unwrap().unwrap();
        assert_eq!(session.mac_address.unwrap().as_str(), MAC_A);
        assert!(
            f.validator
                .verify_user_identity(&user_id, Some(&token), Some(MAC_A))
                .await
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_logins_admit_exactly_one() {
        let repo = Arc::new(InMemoryIdentityRepository::new());
        let validator = Arc::new(UserValidator::new(
            repo.clone(),
            Arc::new(ManualClock::starting_now()),
            Arc::new(single_login(false)),
        ));

        for _ in 0..50 {
            let user_id = UserId::new();
            let tasks: Vec<_> = (0..2)
                .map(|_| {
                    let validator = validator.clone();
                    tokio::spawn(async move { validator.login_user_session(&user_id, None).await })
                })
                .collect();

            let mut winners = Vec::new();
            for task in tasks {
                match task.await.unwrap() {
                    Ok((token, _)) => winners.push(token),
                    Err(err) => assert!(matches!(err, IdentityError::AlreadyLoggedIn)),
                }
            }
            assert_eq!(winners.len(), 1);

            let session = repo.find_session(&user_id).await.unwrap().unwrap();
            assert_eq!(session.token.as_deref(), Some(winners[0].as_str()));
        }
    }
}
