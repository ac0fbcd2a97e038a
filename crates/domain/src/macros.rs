//! Macro for implementing text conversions on closed domain enums
//!
//! Statuses, capability resources, actions and scopes all travel as text at
//! the glue layer and in the SQLite adapter. This macro gives each of them the
//! same canonical spelling, case-insensitive parsing and an `ALL` listing.
//!
//! # Example
//!
//! ```rust
//! use caseledger_domain::impl_domain_enum_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Stage {
//!     Draft,
//!     Final,
//! }
//!
//! impl_domain_enum_conversions!(Stage {
//!     Draft => "draft",
//!     Final => "final",
//! });
//!
//! assert_eq!(Stage::Final.as_str(), "final");
//! assert_eq!("DRAFT".parse::<Stage>(), Ok(Stage::Draft));
//! assert_eq!(Stage::ALL.len(), 2);
//! ```

/// Implements `as_str`, `ALL`, Display and FromStr for a fieldless enum
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their canonical text
///
/// Parsing trims surrounding whitespace and ignores case. The error is a
/// readable message naming the enum and the rejected input.
#[macro_export]
macro_rules! impl_domain_enum_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl $enum_name {
            /// Every variant, in declaration order
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Canonical text form
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Phase {
        Open,
        UnderReview,
        Closed,
    }

    impl_domain_enum_conversions!(Phase {
        Open => "open",
        UnderReview => "under_review",
        Closed => "closed",
    });

    #[test]
    fn test_display_uses_canonical_text() {
        assert_eq!(Phase::Open.to_string(), "open");
        assert_eq!(Phase::UnderReview.to_string(), "under_review");
        assert_eq!(Phase::Closed.as_str(), "closed");
    }

    #[test]
    fn test_fromstr_ignores_case_and_whitespace() {
        assert_eq!(Phase::from_str("OPEN").unwrap(), Phase::Open);
        assert_eq!(Phase::from_str("Under_Review").unwrap(), Phase::UnderReview);
        assert_eq!(Phase::from_str("  closed ").unwrap(), Phase::Closed);
    }

    #[test]
    fn test_fromstr_rejects_unknown() {
        let err = Phase::from_str("archived").unwrap_err();
        assert_eq!(err, "Invalid Phase: archived");
        assert!(Phase::from_str("").is_err());
    }

    #[test]
    fn test_all_lists_every_variant_in_order() {
        assert_eq!(Phase::ALL, &[Phase::Open, Phase::UnderReview, Phase::Closed]);
        for phase in Phase::ALL {
            assert_eq!(Phase::from_str(phase.as_str()).unwrap(), *phase);
        }
    }
}
