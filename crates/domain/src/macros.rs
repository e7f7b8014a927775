//! Macro for implementing Display and FromStr for status enums
//!
//! Status enums are persisted as lowercase strings, so every one of them
//! needs the same pair of conversions. The macro keeps the string mapping in
//! one place per enum.

/// Implements Display and FromStr traits for status enums
///
/// Parsing is case-insensitive; Display always produces the lowercase form
/// that is stored in the database.
#[macro_export]
macro_rules! impl_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            // Spelled out so the expansion survives a crate-local Result alias
            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
