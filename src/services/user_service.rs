use crate::dto::user_dto::{ListUsersQuery, UpdateUserPayload};
use crate::error::{Error, Result};
use crate::models::user::{Role, User};
use crate::utils::retry::{with_fixed_backoff, DEFAULT_ATTEMPTS, DEFAULT_BACKOFF};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Default, Clone)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub domain: Option<String>,
    pub blocked: Option<bool>,
}

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Users visible to `actor`: admins see everyone, heads see the candidates
    /// of their own domain.
    pub async fn list_users(&self, actor: &User, query: ListUsersQuery) -> Result<Vec<User>> {
        let filter = scope_filter(actor, query)?;
        let role = filter.role.map(|r| r.as_str().to_string());

        let users = with_fixed_backoff("list_users", DEFAULT_ATTEMPTS, DEFAULT_BACKOFF, || {
            sqlx::query_as::<_, User>(
                r#"
                SELECT id, name, email, password_hash, role, domain, blocked, approved,
                       email_verified, verification_token_hash, created_at, updated_at
                FROM users
                WHERE ($1::text IS NULL OR role = $1)
                  AND ($2::text IS NULL OR domain = $2)
                  AND ($3::bool IS NULL OR blocked = $3)
                ORDER BY created_at DESC
                "#,
            )
            .bind(role.clone())
            .bind(filter.domain.clone())
            .bind(filter.blocked)
            .fetch_all(&self.pool)
        })
        .await?;

        Ok(users)
    }

    pub async fn get_user(&self, id: Uuid) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, domain, blocked, approved,
                   email_verified, verification_token_hash, created_at, updated_at
            FROM users WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))?;
        Ok(user)
    }

    pub async fn update_user(
        &self,
        actor: &User,
        id: Uuid,
        payload: UpdateUserPayload,
    ) -> Result<User> {
        require_admin(actor)?;
        let role = match payload.role.as_deref() {
            Some(raw) => Some(raw.parse::<Role>().map_err(Error::BadRequest)?),
            None => None,
        };
        if actor.id == id {
            if payload.blocked == Some(true) || role.is_some_and(|r| r != Role::Admin) {
                return Err(Error::BadRequest(
                    "Administrators cannot block or demote themselves".to_string(),
                ));
            }
        }

        let current = self.get_user(id).await?;
        let target_role = role.unwrap_or_else(|| current.role());
        let target_domain = if payload.clear_domain {
            None
        } else {
            payload.domain.clone().or(current.domain.clone())
        };
        if target_role == Role::Head && target_domain.is_none() {
            return Err(Error::BadRequest("A head must have a domain".to_string()));
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET role = $2,
                domain = $3,
                blocked = COALESCE($4, blocked),
                approved = COALESCE($5, approved),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, password_hash, role, domain, blocked, approved,
                      email_verified, verification_token_hash, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(target_role.as_str())
        .bind(target_domain)
        .bind(payload.blocked)
        .bind(payload.approved)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(actor = %actor.id, user_id = %user.id, role = %user.role, blocked = user.blocked, approved = user.approved, "User updated");
        Ok(user)
    }

    pub async fn delete_user(&self, actor: &User, id: Uuid) -> Result<()> {
        require_admin(actor)?;
        if actor.id == id {
            return Err(Error::BadRequest(
                "Administrators cannot delete themselves".to_string(),
            ));
        }
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("User not found".to_string()));
        }
        tracing::info!(actor = %actor.id, user_id = %id, "User deleted");
        Ok(())
    }
}

pub fn require_admin(actor: &User) -> Result<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(Error::Forbidden("Administrator role required".to_string()))
    }
}

fn scope_filter(actor: &User, query: ListUsersQuery) -> Result<UserFilter> {
    let requested_role = match query.role.as_deref() {
        Some(raw) => Some(raw.parse::<Role>().map_err(Error::BadRequest)?),
        None => None,
    };
    match actor.role() {
        Role::Admin => Ok(UserFilter {
            role: requested_role,
            domain: query.domain,
            blocked: query.blocked,
        }),
        Role::Head => {
            if requested_role.is_some_and(|r| r != Role::Candidate) {
                return Err(Error::Forbidden("Heads can only list candidates".to_string()));
            }
            let domain = actor
                .domain
                .clone()
                .ok_or_else(|| Error::Forbidden("Head has no domain assigned".to_string()))?;
            Ok(UserFilter {
                role: Some(Role::Candidate),
                domain: Some(domain),
                blocked: query.blocked,
            })
        }
        Role::Candidate => Err(Error::Forbidden("Not allowed to list users".to_string())),
    }
}
