//! SQL identifier checks for table and column names taken from configuration.

/// Longest identifier accepted, matching the strictest common engine limit.
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Validate that `name` is a plain SQL identifier.
///
/// Rules:
/// - Must not be empty or longer than [`MAX_IDENTIFIER_LEN`] bytes.
/// - Must start with a letter (`a-zA-Z`) or underscore (`_`).
/// - Remaining characters must be letters, digits, or underscores.
///
/// # Errors
///
/// Returns a description of the first rule `name` breaks.
pub fn validate_identifier(name: &str) -> Result<(), String> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err("identifier must not be empty".to_string());
    };

    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(format!(
            "identifier '{name}' exceeds maximum length of {MAX_IDENTIFIER_LEN} bytes (got {})",
            name.len()
        ));
    }

    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(format!(
            "identifier must start with a letter or underscore, got '{first}'"
        ));
    }

    if let Some(bad) = chars.find(|ch| !ch.is_ascii_alphanumeric() && *ch != '_') {
        return Err(format!("identifier contains invalid character '{bad}'"));
    }

    Ok(())
}

/// Double-quote an identifier that already passed [`validate_identifier`].
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
