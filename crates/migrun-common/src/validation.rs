use crate::error::{Error, Result};

/// Longest table or column name accepted.
pub const MAX_NAME_LEN: usize = 64;

/// Narrowest zero padding of a migration identifier's position prefix.
pub const MIN_IDENTIFIER_WIDTH: usize = 3;

/// Widest padding accepted.
pub const MAX_IDENTIFIER_WIDTH: usize = 9;

/// Check that `name` is safe to interpolate as a table or column name.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidIdentifier("name cannot be empty".into()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(Error::InvalidIdentifier(format!(
            "'{name}' is longer than {MAX_NAME_LEN} characters"
        )));
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(Error::InvalidIdentifier(format!(
            "'{name}' cannot start with a digit"
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::InvalidIdentifier(format!(
            "'{name}' may only contain ASCII letters, digits and underscores"
        )));
    }
    Ok(())
}

pub fn validate_identifier_width(width: usize) -> Result<()> {
    if !(MIN_IDENTIFIER_WIDTH..=MAX_IDENTIFIER_WIDTH).contains(&width) {
        return Err(Error::InvalidIdentifier(format!(
            "identifier width must be between {MIN_IDENTIFIER_WIDTH} and {MAX_IDENTIFIER_WIDTH}, got {width}"
        )));
    }
    Ok(())
}
