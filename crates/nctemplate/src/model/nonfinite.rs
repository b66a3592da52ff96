//! Serde helpers for float fields that may hold NaN or infinities.
//!
//! serde_json writes non-finite floats as `null` and refuses to read them
//! back. These helpers write them as the strings `"NaN"`, `"Infinity"` and
//! `"-Infinity"` and accept numbers or those strings when reading.

use std::fmt;
use std::marker::PhantomData;

use ndarray::{ArrayD, IxDyn};
use num_traits::{AsPrimitive, Float};
use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

const NAN: &str = "NaN";
const INFINITY: &str = "Infinity";
const NEG_INFINITY: &str = "-Infinity";

/// Version tag of ndarray's serde layout.
const ARRAY_VERSION: u8 = 1;

/// A float whose non-finite values serialize as strings.
#[derive(Debug, Clone, Copy)]
struct Lenient<T>(T);

impl<T: Float + Serialize> Serialize for Lenient<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let v = self.0;
        if v.is_nan() {
            serializer.serialize_str(NAN)
        } else if v.is_infinite() {
            serializer.serialize_str(if v > T::zero() { INFINITY } else { NEG_INFINITY })
        } else {
            v.serialize(serializer)
        }
    }
}

struct LenientVisitor<T>(PhantomData<T>);

impl<'de, T> Visitor<'de> for LenientVisitor<T>
where
    T: Float + 'static,
    f64: AsPrimitive<T>,
    i64: AsPrimitive<T>,
    u64: AsPrimitive<T>,
{
    type Value = T;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a number, \"NaN\", \"Infinity\" or \"-Infinity\"")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<T, E> {
        Ok(v.as_())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<T, E> {
        Ok(v.as_())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<T, E> {
        Ok(v.as_())
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<T, E> {
        match v {
            NAN => Ok(T::nan()),
            INFINITY => Ok(T::infinity()),
            NEG_INFINITY => Ok(T::neg_infinity()),
            _ => Err(E::invalid_value(Unexpected::Str(v), &self)),
        }
    }
}

impl<'de, T> Deserialize<'de> for Lenient<T>
where
    T: Float + 'static,
    f64: AsPrimitive<T>,
    i64: AsPrimitive<T>,
    u64: AsPrimitive<T>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer
            .deserialize_any(LenientVisitor(PhantomData))
            .map(Lenient)
    }
}

/// `#[serde(with)]` module for a single float.
pub(crate) mod scalar {
    use super::*;

    pub(crate) fn serialize<T, S>(v: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Float + Serialize,
        S: Serializer,
    {
        Lenient(*v).serialize(serializer)
    }

    pub(crate) fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: Float + 'static,
        f64: AsPrimitive<T>,
        i64: AsPrimitive<T>,
        u64: AsPrimitive<T>,
        D: Deserializer<'de>,
    {
        Lenient::<T>::deserialize(deserializer).map(|l| l.0)
    }
}

/// `#[serde(with)]` module for a float array, keeping ndarray's
/// `{v, dim, data}` layout.
pub(crate) mod array {
    use super::*;

    #[derive(Serialize)]
    #[serde(bound(serialize = "Lenient<T>: Serialize"))]
    struct ArrayOut<'a, T> {
        v: u8,
        dim: &'a [usize],
        data: Vec<Lenient<T>>,
    }

    #[derive(Deserialize)]
    #[serde(bound(deserialize = "Lenient<T>: Deserialize<'de>"))]
    struct ArrayIn<T> {
        v: u8,
        dim: Vec<usize>,
        data: Vec<Lenient<T>>,
    }

    pub(crate) fn serialize<T, S>(array: &ArrayD<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Float + Serialize,
        S: Serializer,
    {
        ArrayOut {
            v: ARRAY_VERSION,
            dim: array.shape(),
            data: array.iter().map(|v| Lenient(*v)).collect(),
        }
        .serialize(serializer)
    }

    pub(crate) fn deserialize<'de, T, D>(deserializer: D) -> Result<ArrayD<T>, D::Error>
    where
        T: Float + 'static,
        f64: AsPrimitive<T>,
        i64: AsPrimitive<T>,
        u64: AsPrimitive<T>,
        D: Deserializer<'de>,
    {
        let raw = ArrayIn::<T>::deserialize(deserializer)?;
        if raw.v != ARRAY_VERSION {
            return Err(de::Error::custom(format!(
                "unknown array version: {}",
                raw.v
            )));
        }
        let data = raw.data.into_iter().map(|l| l.0).collect();
        ArrayD::from_shape_vec(IxDyn(&raw.dim), data).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "scalar")]
        value: f32,
        #[serde(with = "array")]
        data: ArrayD<f64>,
    }

    #[test]
    fn test_non_finite_values_as_strings() {
        let holder = Holder {
            value: f32::NAN,
            data: ArrayD::from_shape_vec(
                IxDyn(&[2, 2]),
                vec![1.5, f64::INFINITY, f64::NEG_INFINITY, f64::NAN],
            )
            .unwrap(),
        };
        let text = serde_json::to_string(&holder).unwrap();
        assert_eq!(
            text,
            r#"{"value":"NaN","data":{"v":1,"dim":[2,2],"data":[1.5,"Infinity","-Infinity","NaN"]}}"#
        );

        let back: Holder = serde_json::from_str(&text).unwrap();
        assert!(back.value.is_nan());
        assert_eq!(back.data.shape(), &[2, 2]);
        let values: Vec<f64> = back.data.iter().copied().collect();
        assert_eq!(&values[..3], &[1.5, f64::INFINITY, f64::NEG_INFINITY]);
        assert!(values[3].is_nan());
    }

    #[test]
    fn test_rejects_bad_input() {
        let bad_text = r#"{"value":"nan","data":{"v":1,"dim":[1],"data":[0]}}"#;
        assert!(serde_json::from_str::<Holder>(bad_text).is_err());

        let bad_shape = r#"{"value":1,"data":{"v":1,"dim":[3],"data":[0, 1]}}"#;
        assert!(serde_json::from_str::<Holder>(bad_shape).is_err());

        let bad_version = r#"{"value":1,"data":{"v":2,"dim":[1],"data":[0]}}"#;
        assert!(serde_json::from_str::<Holder>(bad_version).is_err());

        let integers = r#"{"value":3,"data":{"v":1,"dim":[1],"data":[4]}}"#;
        let holder: Holder = serde_json::from_str(integers).unwrap();
        assert_eq!(holder.value, 3.0);
    }
}
