//! Strongly-typed identifiers used across the domain.
//!
//! Every entity gets its own newtype over a UUIDv7 so ids of different tables can never
//! be mixed up. Domain crates declare theirs with [`entity_id!`].

/// Declare a UUID-backed identifier newtype.
///
/// The generated type is `Copy`, ordered (UUIDv7 sorts by creation time), serializes
/// transparently as the UUID string and parses with `FromStr`.
#[macro_export]
macro_rules! entity_id {
    ($(#[$meta:meta])* $vis:vis struct $t:ident; $name:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        #[serde(transparent)]
        $vis struct $t($crate::__private::Uuid);

        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self($crate::__private::Uuid::now_v7())
            }

            pub fn from_uuid(uuid: $crate::__private::Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &$crate::__private::Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl ::core::fmt::Display for $t {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<$crate::__private::Uuid> for $t {
            fn from(value: $crate::__private::Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for $crate::__private::Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl ::core::str::FromStr for $t {
            type Err = $crate::DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = <$crate::__private::Uuid as ::core::str::FromStr>::from_str(s.trim())
                    .map_err(|e| $crate::DomainError::validation(format!("invalid {}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

entity_id! {
    /// Identifier of a user (actor identity).
    pub struct UserId; "user id"
}

#[cfg(test)]
mod tests {
    use super::*;

    entity_id!(struct SampleId; "sample id");

    #[test]
    fn parses_and_displays_round_trip() {
        let id = SampleId::new();
        let parsed: SampleId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn rejects_garbage_with_a_validation_error() {
        let err = "not-a-uuid".parse::<UserId>().unwrap_err();
        match err {
            crate::DomainError::Validation(msg) => assert!(msg.starts_with("invalid user id")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn ids_are_time_ordered() {
        let first = UserId::new();
        let second = UserId::new();
        assert!(first < second);
    }
}
