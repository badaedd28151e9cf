use crate::config::Config;
use crate::dto::auth_dto::{LoginPayload, LoginResponse, RegisterPayload, RegisterResponse};
use crate::error::{Error, Result};
use crate::models::user::{Role, User};
use crate::utils::crypto::{hash_password, sha256_hex, token_matches, verify_password};
use crate::utils::token::{generate_access_token, issue_jwt};
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, name, email, password_hash, role, domain, blocked, approved, \
     email_verified, verification_token_hash, created_at, updated_at";

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
}

impl AuthService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn register(&self, payload: RegisterPayload) -> Result<RegisterResponse> {
        let role = match payload.role.as_deref() {
            None => Role::Candidate,
            Some(raw) => raw.parse::<Role>().map_err(Error::BadRequest)?,
        };
        if role == Role::Admin {
            return Err(Error::Forbidden(
                "Admin accounts cannot be self-registered".to_string(),
            ));
        }
        if role == Role::Head && payload.domain.is_none() {
            return Err(Error::BadRequest("A head must name a domain".to_string()));
        }

        let email = normalize_email(&payload.email);
        let password_hash = hash_password(&payload.password)?;
        let verification_token = generate_access_token(40);
        // Heads wait for an admin; candidates may start right away.
        let approved = role == Role::Candidate;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, role, domain, approved, email_verified, verification_token_hash)
            VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(payload.name.trim())
        .bind(&email)
        .bind(password_hash)
        .bind(role.as_str())
        .bind(payload.domain)
        .bind(approved)
        .bind(sha256_hex(&verification_token))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match Error::from(e) {
            Error::Conflict(_) => Error::Conflict("Email is already registered".to_string()),
            other => other,
        })?;

        tracing::info!(user_id = %user.id, role = %role, "User registered");
        tracing::info!(email = %user.email, token = %verification_token, "Email verification token issued");

        Ok(RegisterResponse {
            user,
            verification_token: Some(verification_token),
        })
    }

    pub async fn verify_email(&self, email: &str, token: &str) -> Result<User> {
        let user = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| Error::BadRequest("Invalid verification token".to_string()))?;

        if user.email_verified {
            return Ok(user);
        }
        let valid = user
            .verification_token_hash
            .as_deref()
            .map(|stored| token_matches(token, stored))
            .unwrap_or(false);
        if !valid {
            return Err(Error::BadRequest("Invalid verification token".to_string()));
        }

        let updated = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET email_verified = TRUE, verification_token_hash = NULL, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .fetch_one(&self.pool)
        .await?;
        tracing::info!(user_id = %updated.id, "Email verified");
        Ok(updated)
    }

    pub async fn login(&self, payload: &LoginPayload, config: &Config) -> Result<LoginResponse> {
        let invalid = || Error::Unauthorized("Invalid email or password".to_string());
        let user = self.find_by_email(&payload.email).await?.ok_or_else(invalid)?;

        if !verify_password(&payload.password, &user.password_hash)? {
            tracing::warn!(user_id = %user.id, "Login rejected: wrong password");
            return Err(invalid());
        }
        check_can_sign_in(&user, config.require_email_verification)?;

        let token = issue_jwt(
            user.id,
            &user.role,
            user.domain.clone(),
            &config.jwt_secret,
            config.jwt_ttl_hours,
        )?;
        tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

        Ok(LoginResponse {
            token,
            token_type: "Bearer",
            expires_in_hours: config.jwt_ttl_hours,
            user,
        })
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Makes sure the configured bootstrap admin exists and can sign in.
    pub async fn ensure_admin(&self, config: &Config) -> Result<()> {
        let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
            return Ok(());
        };
        let email = normalize_email(email);
        if let Some(existing) = self.find_by_email(&email).await? {
            sqlx::query(
                r#"UPDATE users SET role = 'admin', approved = TRUE, blocked = FALSE, email_verified = TRUE, updated_at = NOW() WHERE id = $1"#,
            )
            .bind(existing.id)
            .execute(&self.pool)
            .await?;
            tracing::info!(user_id = %existing.id, "Bootstrap admin confirmed");
            return Ok(());
        }

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO users (name, email, password_hash, role, approved, email_verified)
            VALUES ($1, $2, $3, 'admin', TRUE, TRUE)
            RETURNING id
            "#,
        )
        .bind(&config.admin_name)
        .bind(&email)
        .bind(hash_password(password)?)
        .fetch_one(&self.pool)
        .await?;
        tracing::info!(user_id = %id, "Bootstrap admin created");
        Ok(())
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Account-state checks shared by login and by every authenticated request.
pub fn check_can_sign_in(user: &User, require_email_verification: bool) -> Result<()> {
    if user.blocked {
        return Err(Error::Forbidden("Account is blocked".to_string()));
    }
    if !user.approved {
        return Err(Error::Forbidden(
            "Account is awaiting administrator approval".to_string(),
        ));
    }
    if require_email_verification && !user.email_verified {
        return Err(Error::Forbidden("Email address is not verified".to_string()));
    }
    Ok(())
}
