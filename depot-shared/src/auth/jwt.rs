/// JWT token generation and validation
///
/// Tokens are HS256-signed and carry the username as `sub`, the configured
/// audience as `aud`, plus `iat` and `exp`. A token only names a user; the
/// user row is re-read on every request, so deleting or renaming a user
/// invalidates outstanding tokens.
///
/// # Example
///
/// ```
/// use chrono::Duration;
/// use depot_shared::auth::jwt::{create_token, validate_token, Claims, JwtSettings};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = JwtSettings {
///     secret: "a-secret-of-at-least-thirty-two-bytes!!".to_string(),
///     audience: "https://depot.example.org".to_string(),
///     lifetime: Duration::days(7),
/// };
///
/// let token = create_token(&Claims::new("alice", &settings), &settings.secret)?;
/// let claims = validate_token(&token, &settings)?;
/// assert_eq!(claims.sub, "alice");
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Signature or format check failed
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// `aud` does not match the configured audience
    #[error("Invalid audience")]
    InvalidAudience,
}

/// Signing configuration shared by login and bearer verification
#[derive(Debug, Clone)]
pub struct JwtSettings {
    /// HMAC secret (at least 32 bytes)
    pub secret: String,

    /// Expected `aud` claim
    pub audience: String,

    /// Token lifetime
    pub lifetime: Duration,
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            secret: String::new(),
            audience: "depot".to_string(),
            lifetime: Duration::days(7),
        }
    }
}

/// Token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username
    pub sub: String,

    /// Audience
    pub aud: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Claims for `username` valid from now for `settings.lifetime`
    pub fn new(username: &str, settings: &JwtSettings) -> Self {
        let now = Utc::now();

        Self {
            sub: username.to_string(),
            aud: settings.audience.clone(),
            iat: now.timestamp(),
            exp: (now + settings.lifetime).timestamp(),
        }
    }

    /// Seconds from `iat` to `exp`
    pub fn expires_in(&self) -> i64 {
        self.exp - self.iat
    }
}

/// Signs `claims` with HS256
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails.
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Verifies signature, expiry and audience and returns the claims
///
/// # Errors
///
/// - `JwtError::Expired` past `exp`
/// - `JwtError::InvalidAudience` for a foreign `aud`
/// - `JwtError::ValidationError` for anything else (bad signature, garbage)
pub fn validate_token(token: &str, settings: &JwtSettings) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(settings.secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[settings.audience.as_str()]);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidAudience => JwtError::InvalidAudience,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-key-at-least-32-bytes-long".to_string(),
            audience: "depot-test".to_string(),
            lifetime: Duration::days(7),
        }
    }

    #[test]
    fn test_claims_lifetime() {
        let claims = Claims::new("alice", &settings());
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.aud, "depot-test");
        assert_eq!(claims.expires_in(), 7 * 24 * 3600);
    }

    #[test]
    fn test_create_and_validate_token() {
        let settings = settings();
        let claims = Claims::new("alice", &settings);
        let token = create_token(&claims, &settings.secret).unwrap();

        let validated = validate_token(&token, &settings).unwrap();
        assert_eq!(validated, claims);
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let settings = settings();
        let token = create_token(&Claims::new("alice", &settings), &settings.secret).unwrap();

        let other = JwtSettings {
            secret: "another-secret-key-at-least-32-bytes!".to_string(),
            ..settings
        };
        assert!(matches!(
            validate_token(&token, &other),
            Err(JwtError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_with_wrong_audience() {
        let settings = settings();
        let token = create_token(&Claims::new("alice", &settings), &settings.secret).unwrap();

        let other = JwtSettings {
            audience: "somebody-else".to_string(),
            ..settings
        };
        assert!(matches!(
            validate_token(&token, &other),
            Err(JwtError::InvalidAudience)
        ));
    }

    #[test]
    fn test_expired_token() {
        let settings = JwtSettings {
            lifetime: Duration::hours(-2),
            ..settings()
        };
        let token = create_token(&Claims::new("alice", &settings), &settings.secret).unwrap();

        assert!(matches!(
            validate_token(&token, &settings),
            Err(JwtError::Expired)
        ));
    }

    #[test]
    fn test_garbage_token() {
        assert!(matches!(
            validate_token("not.a.token", &settings()),
            Err(JwtError::ValidationError(_))
        ));
    }
}
