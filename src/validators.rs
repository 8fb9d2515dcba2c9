/// Input validators
///
/// Every validator trims its input and returns the cleaned value, so
/// handlers store exactly what was checked.
/// - Length limits keep oversized payloads out of the database
/// - Identifiers (usernames, slugs) are restricted to a safe alphabet
/// - Free text rejects control characters other than newlines and tabs

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 50;
const MAX_PASSWORD_LENGTH: usize = 128;
const MAX_SLUG_LENGTH: usize = 200;
const MAX_TAG_LENGTH: usize = 50;
const MAX_TAGS: usize = 20;

lazy_static! {
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_.-]+$").unwrap();
    // lowercase words joined by single hyphens
    static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

pub fn validate_username(username: &str) -> Result<String, ValidationError> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("username".to_string()));
    }
    if trimmed.chars().count() < MIN_USERNAME_LENGTH {
        return Err(ValidationError::TooShort(
            "username".to_string(),
            MIN_USERNAME_LENGTH,
        ));
    }
    if trimmed.chars().count() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong(
            "username".to_string(),
            MAX_USERNAME_LENGTH,
        ));
    }
    if !USERNAME_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("username".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Passwords are checked for presence and size only; they are never trimmed.
pub fn validate_password(password: &str) -> Result<&str, ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        ));
    }
    Ok(password)
}

pub fn validate_slug(slug: &str) -> Result<String, ValidationError> {
    let trimmed = slug.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("slug".to_string()));
    }
    if trimmed.len() > MAX_SLUG_LENGTH {
        return Err(ValidationError::TooLong("slug".to_string(), MAX_SLUG_LENGTH));
    }
    if !SLUG_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("slug".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Required single-line text such as a title or a category name
pub fn validate_required_text(
    field: &str,
    value: &str,
    max_length: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field.to_string()));
    }
    if trimmed.chars().count() > max_length {
        return Err(ValidationError::TooLong(field.to_string(), max_length));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(ValidationError::InvalidFormat(field.to_string()));
    }

    Ok(trimmed.to_string())
}

/// Optional text; a missing value becomes the empty string.
pub fn validate_optional_text(
    field: &str,
    value: Option<&str>,
    max_length: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.unwrap_or_default().trim();

    if trimmed.chars().count() > max_length {
        return Err(ValidationError::TooLong(field.to_string(), max_length));
    }
    if trimmed
        .chars()
        .any(|c| c.is_control() && c != '\n' && c != '\r' && c != '\t')
    {
        return Err(ValidationError::InvalidFormat(field.to_string()));
    }

    Ok(trimmed.to_string())
}

/// Trims tags, drops blanks and duplicates, keeps first-seen order.
pub fn validate_tags(tags: &[String]) -> Result<Vec<String>, ValidationError> {
    let mut cleaned: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() || cleaned.iter().any(|t| t == tag) {
            continue;
        }
        if tag.chars().count() > MAX_TAG_LENGTH {
            return Err(ValidationError::TooLong("tag".to_string(), MAX_TAG_LENGTH));
        }
        if tag.chars().any(char::is_control) {
            return Err(ValidationError::InvalidFormat("tag".to_string()));
        }
        cleaned.push(tag.to_string());
    }

    if cleaned.len() > MAX_TAGS {
        return Err(ValidationError::TooLong("tags".to_string(), MAX_TAGS));
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_username() {
        assert_eq!(validate_username("  alice  ").unwrap(), "alice");
        assert!(validate_username("bob_the.builder-2").is_ok());
    }

    #[test]
    fn test_invalid_username() {
        assert!(matches!(
            validate_username("   "),
            Err(ValidationError::EmptyField(_))
        ));
        assert!(matches!(
            validate_username("ab"),
            Err(ValidationError::TooShort(_, 3))
        ));
        assert!(validate_username(&"a".repeat(51)).is_err());
        assert!(validate_username("alice'; DROP TABLE users--").is_err());
        assert!(validate_username("with space").is_err());
    }

    #[test]
    fn test_password_is_not_trimmed() {
        assert_eq!(validate_password(" secret ").unwrap(), " secret ");
        assert!(validate_password("").is_err());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_slug() {
        assert_eq!(validate_slug("hello-world-2").unwrap(), "hello-world-2");
        assert!(validate_slug("Hello-World").is_err());
        assert!(validate_slug("double--hyphen").is_err());
        assert!(validate_slug("-leading").is_err());
        assert!(validate_slug("").is_err());
    }

    #[test]
    fn test_required_text() {
        assert_eq!(validate_required_text("title", " Hi ", 10).unwrap(), "Hi");
        assert!(validate_required_text("title", "", 10).is_err());
        assert!(validate_required_text("title", "0123456789a", 10).is_err());
        assert!(validate_required_text("title", "bad\0title", 50).is_err());
    }

    #[test]
    fn test_optional_text_allows_newlines() {
        assert_eq!(validate_optional_text("excerpt", None, 10).unwrap(), "");
        assert!(validate_optional_text("excerpt", Some("line\nline"), 50).is_ok());
        assert!(validate_optional_text("excerpt", Some("nul\0"), 50).is_err());
    }

    #[test]
    fn test_tags_are_cleaned() {
        let tags = vec![
            " rust ".to_string(),
            "".to_string(),
            "rust".to_string(),
            "actix".to_string(),
        ];
        assert_eq!(validate_tags(&tags).unwrap(), vec!["rust", "actix"]);

        let too_many: Vec<String> = (0..21).map(|i| format!("tag{}", i)).collect();
        assert!(validate_tags(&too_many).is_err());
    }
}
