#![allow(clippy::struct_excessive_bools)]

/// Per-call configuration of the scanner and parser.
///
/// Each flag toggles one leniency or decoding behavior. Flags are independent
/// and combine freely.
///
/// # Examples
///
/// ```rust
/// use jsonloom::{ParserOptions, Value};
///
/// let options = ParserOptions {
///     allow_single_quotes: true,
///     ordered_field: true,
///     ..Default::default()
/// };
/// let value = jsonloom::parse_with("{'b':1,'a':2}", options).unwrap();
/// assert_eq!(value.to_string(), r#"{"b":1,"a":2}"#);
/// ```
///
/// # Default
///
/// All options default to `false`, which accepts standard JSON only.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserOptions {
    /// Whether `//` line comments and `/* */` block comments are skipped as
    /// whitespace. An unterminated block comment is a fatal error.
    pub allow_comments: bool,

    /// Whether object keys may be bare identifiers (`{a:1}`).
    pub allow_unquoted_field_names: bool,

    /// Whether strings and keys may be delimited by `'`.
    pub allow_single_quotes: bool,

    /// Whether string values that look like dates decode as dates.
    ///
    /// The whole string must be a recognized date or the value stays a
    /// string.
    pub allow_iso8601_date_format: bool,

    /// Whether runs of commas and trailing commas inside objects are skipped.
    ///
    /// # Examples
    ///
    /// ```json
    /// {,,"a":1,,,"b":2,}
    /// ```
    pub allow_arbitrary_commas: bool,

    /// Whether fractional numbers decode as exact decimals instead of `f64`.
    pub use_big_decimal: bool,

    /// Disables `$ref` recognition and all parse-context bookkeeping.
    pub disable_circular_reference_detect: bool,

    /// Disables recognition of the type key and `$ref`; both become ordinary
    /// keys.
    pub disable_special_key_detect: bool,

    /// Rejects every type-key name, regardless of any other setting.
    pub safe_mode: bool,

    /// Allows type-key names that pass the deny lists to be loaded even when
    /// they are not explicitly accepted.
    pub support_auto_type: bool,

    /// Drops type keys without consulting the security gate.
    pub ignore_auto_type: bool,

    /// Whether objects keep their keys in insertion order.
    ///
    /// When `false`, keys are sorted once the object closes.
    pub ordered_field: bool,

    /// Whether arrays are tagged as fixed object arrays rather than lists.
    pub use_object_array: bool,

    /// Whether numeric and structural keys are accepted and stringified.
    ///
    /// # Examples
    ///
    /// ```json
    /// {1:"a",{"x":1}:"b"}
    /// ```
    pub non_string_key_as_string: bool,

    /// Whether string values bound to typed fields are trimmed.
    pub trim_string_field_value: bool,
}

impl ParserOptions {
    /// The leniencies most producers in the wild rely on: unquoted keys,
    /// single quotes, comments, arbitrary commas, exact decimals and
    /// insertion-ordered objects.
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            allow_comments: true,
            allow_unquoted_field_names: true,
            allow_single_quotes: true,
            allow_arbitrary_commas: true,
            use_big_decimal: true,
            ordered_field: true,
            ..Self::default()
        }
    }

    pub(crate) fn detects_special_keys(&self) -> bool {
        !self.disable_special_key_detect
    }

    pub(crate) fn tracks_contexts(&self) -> bool {
        !self.disable_circular_reference_detect
    }
}
