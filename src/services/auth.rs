use std::sync::Arc;
use std::time::Duration as StdDuration;

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{respond, Reply, RequestHandler, Service, ServiceError};
use crate::models::admins::{AdminIdentity, Credentials, NewAdmin, ProfileUpdate, SessionToken};
use crate::repositories::{AdminRepository, Datastore};

const SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(60);
const MIN_PASSWORD_LENGTH: usize = 8;

pub enum AuthRequest {
    Login {
        credentials: Credentials,
        response: Reply<SessionToken>,
    },
    Logout {
        token: String,
        response: Reply<()>,
    },
    Authenticate {
        token: String,
        response: Reply<AdminIdentity>,
    },
    UpdateProfile {
        admin_id: String,
        update: ProfileUpdate,
        response: Reply<AdminIdentity>,
    },
}

struct Session {
    admin: AdminIdentity,
    expires_at: DateTime<Utc>,
}

/// Sessions are keyed by the SHA-256 of the bearer token, so the map never
/// holds a usable credential.
fn token_digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

fn invalid_credentials() -> ServiceError {
    ServiceError::Unauthorized("invalid email or password".to_string())
}

pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::Internal(format!("Hashing failed: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            log::error!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

#[derive(Clone)]
pub struct AuthRequestHandler {
    store: Arc<dyn Datastore>,
    sessions: Arc<DashMap<String, Session>>,
    ttl: Duration,
}

impl AuthRequestHandler {
    pub fn new(store: Arc<dyn Datastore>, ttl_minutes: i64) -> Self {
        AuthRequestHandler {
            store,
            sessions: Arc::new(DashMap::new()),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Creates the configured administrator unless the email is already
    /// registered. An existing account keeps its password.
    pub async fn ensure_admin(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<(), ServiceError> {
        if self.store.get_admin_by_email(email).await?.is_some() {
            log::info!("Administrator {} already exists.", email);
            return Ok(());
        }

        let admin = self
            .store
            .insert_admin(&NewAdmin {
                email: email.trim().to_string(),
                display_name: display_name.to_string(),
                password_hash: hash_password(password)?,
            })
            .await?;
        log::info!("Created administrator {}.", admin.email);

        Ok(())
    }

    pub fn start_session_sweeper(&self) {
        let sessions = self.sessions.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                interval.tick().await;

                let now = Utc::now();
                let before = sessions.len();
                sessions.retain(|_, session| session.expires_at > now);
                let removed = before.saturating_sub(sessions.len());
                if removed > 0 {
                    log::debug!("Swept {} expired sessions.", removed);
                }
            }
        });
    }

    async fn login(&self, credentials: Credentials) -> Result<SessionToken, ServiceError> {
        let admin = self
            .store
            .get_admin_by_email(&credentials.email)
            .await?
            .ok_or_else(invalid_credentials)?;
        if !verify_password(&credentials.password, &admin.password_hash) {
            return Err(invalid_credentials());
        }

        let token = Uuid::new_v4().hyphenated().to_string();
        let identity = AdminIdentity::from(&admin);
        let expires_at = Utc::now() + self.ttl;
        self.sessions.insert(
            token_digest(&token),
            Session {
                admin: identity.clone(),
                expires_at,
            },
        );
        log::info!("Administrator {} signed in.", admin.email);

        Ok(SessionToken {
            token,
            expires_at,
            admin: identity,
        })
    }

    fn logout(&self, token: &str) -> Result<(), ServiceError> {
        match self.sessions.remove(&token_digest(token)) {
            Some((_, session)) => {
                log::info!("Administrator {} signed out.", session.admin.email);
                Ok(())
            }
            None => Err(ServiceError::Unauthorized("session not found".to_string())),
        }
    }

    fn authenticate(&self, token: &str) -> Result<AdminIdentity, ServiceError> {
        let digest = token_digest(token);

        let identity = match self.sessions.get(&digest) {
            Some(session) if session.expires_at > Utc::now() => Ok(session.admin.clone()),
            Some(_) => Err(ServiceError::Unauthorized("session expired".to_string())),
            None => Err(ServiceError::Unauthorized("not signed in".to_string())),
        };
        if identity.is_err() {
            self.sessions.remove(&digest);
        }

        identity
    }

    async fn update_profile(
        &self,
        admin_id: &str,
        update: ProfileUpdate,
    ) -> Result<AdminIdentity, ServiceError> {
        let admin = self
            .store
            .get_admin(admin_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("admin not found: {}", admin_id)))?;

        let display_name = match update.display_name.as_deref().map(str::trim) {
            Some("") => return Err(ServiceError::Invalid("displayName must not be blank".into())),
            other => other,
        };

        let password_hash = match update.new_password.as_deref() {
            Some(new_password) => {
                let current = update.current_password.as_deref().unwrap_or_default();
                if !verify_password(current, &admin.password_hash) {
                    return Err(ServiceError::Unauthorized(
                        "current password is incorrect".to_string(),
                    ));
                }
                if new_password.len() < MIN_PASSWORD_LENGTH {
                    return Err(ServiceError::Invalid(format!(
                        "newPassword must be at least {} characters",
                        MIN_PASSWORD_LENGTH
                    )));
                }
                Some(hash_password(new_password)?)
            }
            None => None,
        };

        let admin = self
            .store
            .update_admin(admin_id, display_name, password_hash.as_deref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("admin not found: {}", admin_id)))?;
        let identity = AdminIdentity::from(&admin);

        for mut session in self.sessions.iter_mut() {
            if session.admin.admin_id == identity.admin_id {
                session.admin = identity.clone();
            }
        }
        log::info!("Administrator {} updated their profile.", admin.email);

        Ok(identity)
    }
}

#[async_trait]
impl RequestHandler<AuthRequest> for AuthRequestHandler {
    async fn handle_request(&self, request: AuthRequest) {
        match request {
            AuthRequest::Login {
                credentials,
                response,
            } => {
                let session = self.login(credentials).await;
                respond("login", response, session);
            }
            AuthRequest::Logout { token, response } => {
                respond("logout", response, self.logout(&token));
            }
            AuthRequest::Authenticate { token, response } => {
                let identity = self.authenticate(&token);
                if response.send(identity).is_err() {
                    log::debug!("authenticate: caller went away before the reply");
                }
            }
            AuthRequest::UpdateProfile {
                admin_id,
                update,
                response,
            } => {
                let identity = self.update_profile(&admin_id, update).await;
                respond("update profile", response, identity);
            }
        }
    }
}

pub struct AuthService;

impl AuthService {
    pub fn new() -> Self {
        AuthService {}
    }
}

#[async_trait]
impl Service<AuthRequest, AuthRequestHandler> for AuthService {}
