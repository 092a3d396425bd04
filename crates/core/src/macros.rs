//! Helper macro for status/kind enums persisted as lowercase TEXT columns.
//!
//! Each generated enum gets `as_str` (database representation), `parse`
//! (returns [`CoreError::Validation`](crate::error::CoreError) for unknown
//! values), an `ALL` slice and a `Display` impl.

macro_rules! define_text_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($label:literal) {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Return the database string representation.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $val ),+
                }
            }

            /// Parse from a string, returning a validation error for unknown values.
            pub fn parse(s: &str) -> Result<Self, $crate::error::CoreError> {
                match s {
                    $( $val => Ok($name::$variant), )+
                    other => Err($crate::error::CoreError::Validation(format!(
                        "Unknown {}: '{other}'. Valid values: {}",
                        $label,
                        [$($val),+].join(", ")
                    ))),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}
