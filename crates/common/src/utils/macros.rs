//! Declarative macros shared across the workspace.

/// Implements `Display` and `FromStr` for label-like enums
///
/// Generates:
/// - `Display`: writes the configured label for each variant
/// - `FromStr`: case-insensitive parse of the label back into the variant
///
/// Labels must be lowercase for parsing to round-trip.
///
/// # Example
///
/// ```rust
/// use rebound_common::impl_status_conversions;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// pub enum CallOutcome {
///     Success,
///     Failure,
/// }
///
/// impl_status_conversions!(CallOutcome {
///     Success => "success",
///     Failure => "failure",
/// });
///
/// assert_eq!(CallOutcome::Failure.to_string(), "failure");
/// assert_eq!("SUCCESS".parse::<CallOutcome>(), Ok(CallOutcome::Success));
/// ```
#[macro_export]
macro_rules! impl_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    //! Unit tests for utils::macros.
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Phase {
        Waiting,
        IgnoredError,
    }

    impl_status_conversions!(Phase {
        Waiting => "waiting",
        IgnoredError => "ignored_error",
    });

    /// Validates display labels, including multi-word ones.
    ///
    /// Assertions:
    /// - Confirms `Phase::IgnoredError.to_string()` equals `"ignored_error"`.
    #[test]
    fn test_display_conversion() {
        assert_eq!(Phase::Waiting.to_string(), "waiting");
        assert_eq!(Phase::IgnoredError.to_string(), "ignored_error");
    }

    /// Validates case-insensitive parsing.
    ///
    /// Assertions:
    /// - Upper and mixed case labels parse to the same variant.
    #[test]
    fn test_fromstr_case_insensitive() {
        assert_eq!(Phase::from_str("WAITING").unwrap(), Phase::Waiting);
        assert_eq!(Phase::from_str("Ignored_Error").unwrap(), Phase::IgnoredError);
    }

    /// Validates rejection of unknown labels.
    ///
    /// Assertions:
    /// - The error names the enum and the offending input.
    #[test]
    fn test_fromstr_invalid() {
        let result = Phase::from_str("sleeping");
        assert_eq!(result.unwrap_err(), "Invalid Phase: sleeping");
        assert!(Phase::from_str("").is_err());
    }
}
