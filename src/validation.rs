//! 客户端表单校验
//!
//! 校验失败在本地阻止提交，永远不会触达网络。

use campusvoice_shared::{
    CreateComplaintRequest, LoginRequest, RegisterRequest, UpdateProfileRequest,
};
use thiserror::Error;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_DESCRIPTION_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required.")]
    Required { field: &'static str },

    #[error("{field} must be at least {min} characters.")]
    TooShort { field: &'static str, min: usize },

    #[error("Please enter a valid email address.")]
    InvalidEmail,

    #[error("Complaints cannot be moved back to pending.")]
    InvalidTransition,
}

/// 邮箱形状检查：`local@domain.tld`，不含空白
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

fn required(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(())
}

fn min_len(field: &'static str, value: &str, min: usize) -> Result<(), ValidationError> {
    if value.chars().count() < min {
        return Err(ValidationError::TooShort { field, min });
    }
    Ok(())
}

fn credentials(email: &str, password: &str) -> Result<(), ValidationError> {
    required("Email", email)?;
    if !is_valid_email(email) {
        return Err(ValidationError::InvalidEmail);
    }
    required("Password", password)?;
    min_len("Password", password, MIN_PASSWORD_LEN)
}

pub fn validate_login(req: &LoginRequest) -> Result<(), ValidationError> {
    credentials(&req.email, &req.password)
}

pub fn validate_register(req: &RegisterRequest) -> Result<(), ValidationError> {
    credentials(&req.email, &req.password)
}

pub fn validate_profile(req: &UpdateProfileRequest) -> Result<(), ValidationError> {
    required("Name", &req.name)?;
    required("Username", &req.username)
}

pub fn validate_complaint(req: &CreateComplaintRequest) -> Result<(), ValidationError> {
    required("Description", &req.description)?;
    min_len("Description", req.description.trim(), MIN_DESCRIPTION_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("ana@campus.edu"));
        assert!(is_valid_email("  ana@campus.edu "));
        assert!(!is_valid_email("ana@campus"));
        assert!(!is_valid_email("@campus.edu"));
        assert!(!is_valid_email("ana@@campus.edu"));
        assert!(!is_valid_email("an a@campus.edu"));
        assert!(!is_valid_email("ana.campus.edu"));
    }

    #[test]
    fn test_login_rules() {
        let ok = LoginRequest {
            email: "ana@campus.edu".into(),
            password: "secret1".into(),
        };
        assert!(validate_login(&ok).is_ok());

        let short = LoginRequest {
            password: "abc".into(),
            ..ok.clone()
        };
        assert_eq!(
            validate_login(&short),
            Err(ValidationError::TooShort {
                field: "Password",
                min: MIN_PASSWORD_LEN
            })
        );

        let missing = LoginRequest {
            email: "  ".into(),
            ..ok
        };
        assert_eq!(
            validate_login(&missing),
            Err(ValidationError::Required { field: "Email" })
        );
    }

    #[test]
    fn test_complaint_length_counts_trimmed_text() {
        let padded = CreateComplaintRequest {
            description: "   long enough    ".into(),
        };
        assert!(validate_complaint(&padded).is_ok());

        let short = CreateComplaintRequest {
            description: "   short   ".into(),
        };
        assert!(matches!(
            validate_complaint(&short),
            Err(ValidationError::TooShort { .. })
        ));
    }

    #[test]
    fn test_profile_requires_both_fields() {
        let req = UpdateProfileRequest {
            name: "Ana".into(),
            username: " ".into(),
        };
        assert_eq!(
            validate_profile(&req),
            Err(ValidationError::Required { field: "Username" })
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ValidationError::TooShort {
                field: "Description",
                min: 10
            }
            .to_string(),
            "Description must be at least 10 characters."
        );
    }
}
