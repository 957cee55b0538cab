//! Serde adapter for `f64` fields that may be non-finite.
//!
//! JSON has no representation for infinity or NaN, and `serde_json` writes
//! them as `null`, which would make a perfect-match PSNR indistinguishable
//! from a missing value. Fields using this adapter serialize finite values as
//! numbers and non-finite values as the strings `"inf"`, `"-inf"` and `"nan"`.
//!
//! ```rust,ignore
//! #[derive(Serialize, Deserialize)]
//! struct Row {
//!     #[serde(with = "recodec_analysis::float_repr")]
//!     psnr: f64,
//! }
//! ```

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

/// Serialize an `f64`, tagging non-finite values as strings.
pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_str(tag(*value))
    }
}

/// Deserialize an `f64` written by [`serialize`].
///
/// Also accepts `"Infinity"`, `"-Infinity"` and `"NaN"`.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Number(v) => Ok(v),
        Repr::Text(text) => parse_tag(&text)
            .ok_or_else(|| D::Error::custom(format!("invalid float value: '{text}'"))),
    }
}

/// String tag for a non-finite value. Finite inputs fall through to the sign tags.
pub fn tag(value: f64) -> &'static str {
    if value.is_nan() {
        "nan"
    } else if value > 0.0 {
        "inf"
    } else {
        "-inf"
    }
}

/// Parse a non-finite tag.
pub fn parse_tag(text: &str) -> Option<f64> {
    match text {
        "inf" | "+inf" | "Infinity" => Some(f64::INFINITY),
        "-inf" | "-Infinity" => Some(f64::NEG_INFINITY),
        "nan" | "NaN" => Some(f64::NAN),
        _ => None,
    }
}

/// Format a value for text output (CSV, terminal), using the same tags.
pub fn display(value: f64) -> String {
    if value.is_finite() {
        format!("{value}")
    } else {
        tag(value).to_string()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Row {
        #[serde(with = "super")]
        v: f64,
    }

    fn to_json(v: f64) -> String {
        serde_json::to_string(&Row { v }).unwrap()
    }

    fn from_json(s: &str) -> f64 {
        serde_json::from_str::<Row>(s).unwrap().v
    }

    #[test]
    fn finite_values_stay_numbers() {
        assert_eq!(to_json(1.5), r#"{"v":1.5}"#);
        assert_eq!(from_json(r#"{"v":1.5}"#), 1.5);
        assert_eq!(from_json(r#"{"v":0}"#), 0.0);
    }

    #[test]
    fn non_finite_values_are_tagged() {
        assert_eq!(to_json(f64::INFINITY), r#"{"v":"inf"}"#);
        assert_eq!(to_json(f64::NEG_INFINITY), r#"{"v":"-inf"}"#);
        assert_eq!(to_json(f64::NAN), r#"{"v":"nan"}"#);

        assert_eq!(from_json(r#"{"v":"inf"}"#), f64::INFINITY);
        assert_eq!(from_json(r#"{"v":"-Infinity"}"#), f64::NEG_INFINITY);
        assert!(from_json(r#"{"v":"nan"}"#).is_nan());
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!(serde_json::from_str::<Row>(r#"{"v":"huge"}"#).is_err());
    }
}
