/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: legacy-compatible SHA-1 password hashing
/// - [`jwt`]: HS256 token generation and validation
/// - [`credentials`]: Basic and Bearer credential verification
/// - [`authorization`]: admin / manager / same-user gates
///
/// # Example
///
/// ```
/// use depot_shared::auth::jwt::{create_token, validate_token, Claims, JwtSettings};
/// use depot_shared::auth::password::{hash_for_storage, verify_stored};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let stored = hash_for_storage("user_password")?;
/// assert!(verify_stored(&stored.hashed_password, &stored.salt, "user_password"));
///
/// let settings = JwtSettings {
///     secret: "secret-key-of-at-least-thirty-two-bytes".to_string(),
///     ..Default::default()
/// };
/// let token = create_token(&Claims::new("alice", &settings), &settings.secret)?;
/// assert_eq!(validate_token(&token, &settings)?.sub, "alice");
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod credentials;
pub mod jwt;
pub mod password;
