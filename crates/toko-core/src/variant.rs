//! # Variant Normalization
//!
//! Batches carry an optional free-text variant (flavor, color, model). Three
//! spellings mean "no variant": `NULL`, an empty string and `"Standard"`.
//! They are collapsed into one canonical value the moment input enters the
//! ledger, so allocation and grouping compare variants with plain equality.
//!
//! ```text
//!   None ─────────┐
//!   ""  / "  " ───┼──► Variant("Standard")
//!   "standard" ───┘
//!   " Merah " ────────► Variant("Merah")
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use ts_rs::TS;

/// Canonical sentinel stored for "no variant".
pub const STANDARD_VARIANT: &str = "Standard";

/// A normalized batch variant.
///
/// Construct with [`Variant::normalize`]; the inner string is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Variant(String);

impl Variant {
    /// The implicit "Standard" variant.
    pub fn standard() -> Self {
        Variant(STANDARD_VARIANT.to_string())
    }

    /// Normalizes raw input into a canonical variant.
    ///
    /// ## Example
    /// ```rust
    /// use toko_core::Variant;
    ///
    /// assert_eq!(Variant::normalize(None), Variant::standard());
    /// assert_eq!(Variant::normalize(Some("")), Variant::standard());
    /// assert_eq!(Variant::normalize(Some("STANDARD")), Variant::standard());
    /// assert_eq!(Variant::normalize(Some(" Merah ")).as_str(), "Merah");
    /// ```
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Variant::standard(),
            Some(s) if s.eq_ignore_ascii_case(STANDARD_VARIANT) => Variant::standard(),
            Some(s) => Variant(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_standard(&self) -> bool {
        self.0 == STANDARD_VARIANT
    }
}

impl Default for Variant {
    fn default() -> Self {
        Variant::standard()
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Variant {
    fn from(raw: &str) -> Self {
        Variant::normalize(Some(raw))
    }
}

impl From<Option<String>> for Variant {
    fn from(raw: Option<String>) -> Self {
        Variant::normalize(raw.as_deref())
    }
}

/// Deserialization normalizes, so `null`, `""` and `"Standard"` all arrive
/// as the same value.
impl<'de> Deserialize<'de> for Variant {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(Variant::normalize(raw.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_spellings_collapse() {
        let a = Variant::normalize(None);
        let b = Variant::normalize(Some(""));
        let c = Variant::normalize(Some("Standard"));
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert!(a.is_standard());
    }

    #[test]
    fn test_named_variant_is_trimmed() {
        let v = Variant::from(" Hitam ");
        assert_eq!(v.as_str(), "Hitam");
        assert!(!v.is_standard());
    }

    #[test]
    fn test_deserialize_normalizes() {
        let v: Variant = serde_json::from_str("null").unwrap();
        assert!(v.is_standard());
        let v: Variant = serde_json::from_str("\"\"").unwrap();
        assert!(v.is_standard());
        let v: Variant = serde_json::from_str("\"Biru\"").unwrap();
        assert_eq!(v.as_str(), "Biru");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&Variant::standard()).unwrap();
        assert_eq!(json, "\"Standard\"");
    }
}
