/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id hashing, password policy, temporary passwords
/// - [`jwt`]: HS256 access and refresh tokens
/// - [`middleware`]: resolving a request's bearer token to a [`Principal`](middleware::Principal)
/// - [`tenancy`]: the [`TenantScope`](tenancy::TenantScope) guard every store call requires
/// - [`authorization`]: role rules for user administration
///
/// # Example
///
/// ```
/// use taskdeck_shared::auth::password::{hash_password, verify_password};
/// use taskdeck_shared::auth::jwt::{issue_token_pair, validate_access_token};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("C0rrect#Horse")?;
/// assert!(verify_password("C0rrect#Horse", &hash)?);
///
/// let secret = "an-example-secret-of-at-least-32-bytes";
/// let pair = issue_token_pair(Uuid::new_v4(), Uuid::new_v4(), secret)?;
/// validate_access_token(&pair.access_token, secret)?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod tenancy;
