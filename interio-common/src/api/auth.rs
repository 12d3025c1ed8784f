//! Bearer token verification and capability tokens
//!
//! Tokens are issued by the accounts service and have the form
//! `<user_id>.<expires_at_ms>.<signature>` where the signature is the
//! SHA-256 hex digest of `"<user_id>.<expires_at_ms>"` immediately followed by
//! the shared secret as a decimal i64 string. The shared secret lives in the
//! `settings` table under [`SHARED_SECRET_KEY`].
//!
//! A verified token yields a [`Principal`]. Admin-only operations take an
//! [`AdminCapability`], which can only be obtained from a principal whose
//! stored role is `admin`.

use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::db::models::{Role, User};
use crate::db::{settings, users};
use crate::{Error, Result};

/// Settings key holding the token signing secret
pub const SHARED_SECRET_KEY: &str = "api_shared_secret";

// ========================================
// Shared Secret Management
// ========================================

/// Load the shared secret, generating one on first use
///
/// Concurrent first starts agree on a single stored value.
pub async fn load_shared_secret(db: &SqlitePool) -> Result<i64> {
    let value = match settings::get_setting(db, SHARED_SECRET_KEY).await? {
        Some(value) => value,
        None => {
            let candidate = generate_shared_secret().to_string();
            settings::ensure_setting(db, SHARED_SECRET_KEY, &candidate).await?
        }
    };

    value
        .parse::<i64>()
        .map_err(|e| Error::Config(format!("Invalid {}: {}", SHARED_SECRET_KEY, e)))
}

fn generate_shared_secret() -> i64 {
    use rand::Rng;

    let mut rng = rand::thread_rng();
    loop {
        let val = rng.gen::<i64>();
        if val != 0 {
            break val;
        }
    }
}

// ========================================
// Token Signing and Verification
// ========================================

/// Claims carried by a verified token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: i64,
    pub expires_at_ms: i64,
}

/// SHA-256 hex signature over the token payload and shared secret
pub fn calculate_signature(user_id: i64, expires_at_ms: i64, shared_secret: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}.{}{}", user_id, expires_at_ms, shared_secret).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Build a bearer token (the accounts service does this in production)
pub fn sign_token(user_id: i64, expires_at_ms: i64, shared_secret: i64) -> String {
    format!(
        "{}.{}.{}",
        user_id,
        expires_at_ms,
        calculate_signature(user_id, expires_at_ms, shared_secret)
    )
}

/// Verify token structure, signature and expiry
pub fn verify_token(token: &str, shared_secret: i64, now_ms: i64) -> Result<TokenClaims> {
    let mut parts = token.trim().splitn(3, '.');
    let (Some(user_part), Some(expiry_part), Some(signature)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return Err(Error::Unauthorized("Malformed token".to_string()));
    };

    let user_id: i64 = user_part
        .parse()
        .map_err(|_| Error::Unauthorized("Malformed token".to_string()))?;
    let expires_at_ms: i64 = expiry_part
        .parse()
        .map_err(|_| Error::Unauthorized("Malformed token".to_string()))?;

    let expected = calculate_signature(user_id, expires_at_ms, shared_secret);
    if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
        return Err(Error::Unauthorized("Invalid token signature".to_string()));
    }

    if expires_at_ms <= now_ms {
        return Err(Error::Unauthorized("Token expired".to_string()));
    }

    Ok(TokenClaims {
        user_id,
        expires_at_ms,
    })
}

/// Verify a token and resolve the caller's identity and role
pub async fn authenticate(db: &SqlitePool, token: &str, shared_secret: i64) -> Result<Principal> {
    let claims = verify_token(token, shared_secret, crate::time::now_millis())?;

    let user = users::get_user(db, claims.user_id)
        .await?
        .ok_or_else(|| Error::Unauthorized("Unknown user".to_string()))?;

    if !user.is_active {
        return Err(Error::Unauthorized("User is inactive".to_string()));
    }

    debug!(user_id = user.id, role = %user.role, "Authenticated request");
    Ok(Principal::from_user(&user))
}

// ========================================
// Capability Tokens
// ========================================

/// Authenticated caller identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    user_id: i64,
    role: Role,
}

impl Principal {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Obtain the admin capability, or `PermissionDenied`
    pub fn admin_capability(&self) -> Result<AdminCapability> {
        if self.is_admin() {
            Ok(AdminCapability {
                admin_id: self.user_id,
            })
        } else {
            Err(Error::PermissionDenied(
                "Only administrators may perform this operation".to_string(),
            ))
        }
    }
}

/// Proof that the holder is an administrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminCapability {
    admin_id: i64,
}

impl AdminCapability {
    pub fn admin_id(&self) -> i64 {
        self.admin_id
    }
}
