/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength rules
/// - [`jwt`]: Access/refresh token issuing and validation
/// - [`middleware`]: Bearer-token middleware producing an [`middleware::AuthContext`]
/// - [`authorization`]: Permission predicates for tasks, projects and time entries
///
/// # Example
///
/// ```no_run
/// use teamtask_shared::auth::password::{hash_password, verify_password};
/// use teamtask_shared::auth::jwt::{create_token, validate_access_token, Claims, TokenType};
/// use teamtask_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Corr3ct!horse")?;
/// assert!(verify_password("Corr3ct!horse", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), UserRole::User, TokenType::Access);
/// let token = create_token(&claims, "secret-key")?;
/// let validated = validate_access_token(&token, "secret-key")?;
/// assert_eq!(validated.role, UserRole::User);
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
