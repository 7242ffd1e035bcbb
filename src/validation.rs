// Input validation for forms and seed files

use serde::Serialize;

pub const USERNAME_MAX_LEN: usize = 50;
pub const PASSWORD_MAX_LEN: usize = 128;
/// Minimum length for passwords set by the seeder
pub const NEW_PASSWORD_MIN_LEN: usize = 8;

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

/// Login form input that passed validation
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Validate the login form. The username is trimmed; the password is taken
/// as typed.
pub fn validate_login_form(username: &str, password: &str) -> Result<LoginCredentials, Vec<FieldError>> {
    let username = username.trim();
    let mut errors = Vec::new();

    if let Err(e) = validate_username(username) {
        errors.push(e);
    }
    if password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    } else if password.chars().count() > PASSWORD_MAX_LEN {
        errors.push(FieldError::new("password", "Password is too long"));
    }

    if errors.is_empty() {
        Ok(LoginCredentials {
            username: username.to_string(),
            password: password.to_string(),
        })
    } else {
        Err(errors)
    }
}

pub fn validate_username(username: &str) -> Result<(), FieldError> {
    if username.is_empty() {
        return Err(FieldError::new("username", "Username is required"));
    }
    if username.chars().count() > USERNAME_MAX_LEN {
        return Err(FieldError::new("username", "Username is too long"));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(FieldError::new("username", "Username contains invalid characters"));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), FieldError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(FieldError::new("email", "Email address is invalid")),
    }
}

pub fn validate_new_password(password: &str) -> Result<(), FieldError> {
    let len = password.chars().count();
    if len < NEW_PASSWORD_MIN_LEN {
        return Err(FieldError::new("password", "Password must be at least 8 characters"));
    }
    if len > PASSWORD_MAX_LEN {
        return Err(FieldError::new("password", "Password is too long"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_login_form_is_trimmed() {
        let creds = validate_login_form("  radiology.lead ", " pass word ").unwrap();
        assert_eq!(creds.username, "radiology.lead");
        assert_eq!(creds.password, " pass word ");
    }

    #[test]
    fn test_empty_fields_rejected() {
        let errors = validate_login_form("   ", "").unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["username", "password"]);
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("it-admin_2.0").is_ok());
        assert!(validate_username(&"a".repeat(50)).is_ok());
        assert!(validate_username(&"a".repeat(51)).is_err());
        assert!(validate_username("robert'); drop table").is_err());
        assert!(validate_username("user name").is_err());
    }

    #[test]
    fn test_password_length_limit() {
        assert!(validate_login_form("user", &"p".repeat(128)).is_ok());
        let errors = validate_login_form("user", &"p".repeat(129)).unwrap_err();
        assert_eq!(errors, vec![FieldError::new("password", "Password is too long")]);
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = validate_login_form("user", "hunter22").unwrap();
        assert!(!format!("{:?}", creds).contains("hunter22"));
    }

    #[test]
    fn test_seed_rules() {
        assert!(validate_email("it@hospital.example").is_ok());
        assert!(validate_email("nobody").is_err());
        assert!(validate_email("@hospital.example").is_err());
        assert!(validate_new_password("short").is_err());
        assert!(validate_new_password("long enough").is_ok());
    }
}
