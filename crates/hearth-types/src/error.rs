use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("identifier space exhausted")]
    IdSpaceExhausted,

    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },
}

/// Reject empty or whitespace-only input for a named field.
pub fn require_non_empty(field: &'static str, value: &str) -> Result<(), TypeError> {
    if value.trim().is_empty() {
        return Err(TypeError::EmptyField { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_rejected() {
        assert_eq!(
            require_non_empty("display_name", "  \t"),
            Err(TypeError::EmptyField { field: "display_name" })
        );
        assert!(require_non_empty("display_name", "alice").is_ok());
    }

    #[test]
    fn messages_name_the_field() {
        let err = TypeError::EmptyField { field: "secret" };
        assert_eq!(err.to_string(), "secret must not be empty");
    }
}
