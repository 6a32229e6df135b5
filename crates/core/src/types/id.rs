//! Newtype codes for type-safe entity references.
//!
//! Catalog entities are keyed by human-readable codes such as `BB-PRO-001`
//! or `CUST-001`. Use the `define_code!` macro to create wrappers that keep
//! product codes from being passed where customer codes are expected.

/// Macro to define a type-safe string code wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `Display`
/// - `new()`, `as_str()`, `From<&str>` and `PartialEq<str>`
///
/// # Example
///
/// ```rust
/// # use progear_core::define_code;
/// define_code!(WarehouseCode);
///
/// let code = WarehouseCode::new("WH-WEST");
/// assert_eq!(code.as_str(), "WH-WEST");
/// assert!(code == *"WH-WEST");
/// ```
#[macro_export]
macro_rules! define_code {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new code from any string-like value.
            #[must_use]
            pub fn new(code: impl Into<String>) -> Self {
                Self(code.into())
            }

            /// Get the underlying code.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(code: &str) -> Self {
                Self(code.to_owned())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_code!(ProductId);
define_code!(CustomerId);
define_code!(OrderId);
define_code!(QuoteId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_equality_with_str() {
        let id = ProductId::new("BB-PRO-001");
        assert!(id == *"BB-PRO-001");
        assert!(id != *"BB-PRO-002");
    }

    #[test]
    fn test_code_serializes_transparently() {
        let id = CustomerId::from("CUST-007");
        assert_eq!(
            serde_json::to_string(&id).expect("serialize"),
            "\"CUST-007\""
        );
        let back: CustomerId = serde_json::from_str("\"CUST-007\"").expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn test_code_display() {
        assert_eq!(OrderId::new("ORD-2024-001").to_string(), "ORD-2024-001");
    }
}
