//! Typed coercion of raw configuration strings.
//!
//! Every lookup starts as a string. [`FromConfigValue`] turns that string
//! into a typed value, returning `None` when it cannot; callers then fall
//! back to their default. Enums opt in through [`config_enum!`](crate::config_enum).

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Conversion from a raw configuration string.
///
/// Implementations must not panic; `None` means "use the default".
///
/// # Example
///
/// ```
/// use switchyard_config::FromConfigValue;
///
/// assert_eq!(u16::from_config_value(" 8080 "), Some(8080));
/// assert_eq!(bool::from_config_value("TRUE"), Some(true));
/// assert_eq!(u16::from_config_value("eighty"), None);
/// ```
pub trait FromConfigValue: Sized {
    /// Parses `raw`, returning `None` if it is not a valid value.
    fn from_config_value(raw: &str) -> Option<Self>;
}

macro_rules! from_str_values {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl FromConfigValue for $ty {
                fn from_config_value(raw: &str) -> Option<Self> {
                    raw.trim().parse().ok()
                }
            }
        )+
    };
}

from_str_values!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, IpAddr, SocketAddr,
);

impl FromConfigValue for bool {
    fn from_config_value(raw: &str) -> Option<Self> {
        parse_bool(raw.trim())
    }
}

impl FromConfigValue for char {
    fn from_config_value(raw: &str) -> Option<Self> {
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }
}

impl FromConfigValue for String {
    fn from_config_value(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

impl FromConfigValue for PathBuf {
    fn from_config_value(raw: &str) -> Option<Self> {
        Some(PathBuf::from(raw.trim()))
    }
}

/// Durations are written in milliseconds.
impl FromConfigValue for Duration {
    fn from_config_value(raw: &str) -> Option<Self> {
        u64::from_config_value(raw).map(Duration::from_millis)
    }
}

impl<T: FromConfigValue> FromConfigValue for Option<T> {
    fn from_config_value(raw: &str) -> Option<Self> {
        T::from_config_value(raw).map(Some)
    }
}

/// Case-insensitive enum variant matching used by [`config_enum!`](crate::config_enum).
///
/// Underscores and hyphens are ignored, so `allow_all`, `allow-all` and
/// `AllowAll` all name the same variant.
#[doc(hidden)]
#[must_use]
pub fn variant_matches(raw: &str, variant: &str) -> bool {
    let normalized = raw.trim().replace(['_', '-'], "");
    normalized.eq_ignore_ascii_case(variant)
}

/// Implements [`FromConfigValue`] for a fieldless enum.
///
/// Variant names match case-insensitively.
///
/// # Example
///
/// ```
/// use switchyard_config::{config_enum, FromConfigValue};
///
/// #[derive(Debug, PartialEq)]
/// enum Mode { Fast, SafeAndSlow }
///
/// config_enum!(Mode { Fast, SafeAndSlow });
///
/// assert_eq!(Mode::from_config_value("FAST"), Some(Mode::Fast));
/// assert_eq!(Mode::from_config_value("safe_and_slow"), Some(Mode::SafeAndSlow));
/// assert_eq!(Mode::from_config_value("medium"), None);
/// ```
#[macro_export]
macro_rules! config_enum {
    ($ty:ident { $($variant:ident),+ $(,)? }) => {
        impl $crate::FromConfigValue for $ty {
            fn from_config_value(raw: &str) -> ::core::option::Option<Self> {
                $(
                    if $crate::value::variant_matches(raw, stringify!($variant)) {
                        return ::core::option::Option::Some($ty::$variant);
                    }
                )+
                ::core::option::Option::None
            }
        }
    };
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
