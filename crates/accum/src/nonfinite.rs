//! Serde adapters for `f64` fields that may hold NaN or infinities.
//!
//! JSON has no non-finite numbers: `serde_json` writes them as `null` and
//! refuses `null` for an `f64` on the way back. With these adapters finite
//! values stay plain numbers, non-finite values are written as the strings
//! `"NaN"`, `"inf"` and `"-inf"`, and a bare `null` reads back as NaN.
//!
//! ```ignore
//! #[serde(with = "crate::nonfinite")]
//! lat: f64,
//! ```

use serde::Deserialize;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
    Number(f64),
    Tag(String),
}

fn tag(value: f64) -> &'static str {
    if value.is_nan() {
        "NaN"
    } else if value > 0.0 {
        "inf"
    } else {
        "-inf"
    }
}

fn from_repr<E: de::Error>(repr: Option<Repr>) -> Result<f64, E> {
    match repr {
        None => Ok(f64::NAN),
        Some(Repr::Number(v)) => Ok(v),
        Some(Repr::Tag(s)) => match s.as_str() {
            "NaN" | "nan" => Ok(f64::NAN),
            "inf" | "+inf" | "Infinity" => Ok(f64::INFINITY),
            "-inf" | "-Infinity" => Ok(f64::NEG_INFINITY),
            other => Err(E::custom(format!("invalid float `{other}`"))),
        },
    }
}

pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_str(tag(*value))
    }
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    from_repr(Option::<Repr>::deserialize(deserializer)?)
}

/// Same encoding for `Option<f64>`; `None` is `null`.
pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => super::serialize(v, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<f64>, D::Error> {
        match Option::<Repr>::deserialize(deserializer)? {
            None => Ok(None),
            repr => from_repr(repr).map(Some),
        }
    }
}
