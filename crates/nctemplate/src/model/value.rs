//! Value types for templates and data objects.
//!
//! Template documents carry loosely typed scalars (whatever the document layer
//! imported); data objects carry values cast to the declared data type.

use std::fmt;

use ndarray::{ArrayD, IxDyn};
use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};

use crate::model::nonfinite;

/// Data types a template may declare for attributes and variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Str,
    Int8,
    Int16,
    Int32,
    Float32,
    Float64,
}

/// The subset of data types that can back a dense array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericType {
    Int8,
    Int16,
    Int32,
    Float32,
    Float64,
}

/// Numeric family of a data type or of an imported literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Integer,
    Floating,
}

impl DataType {
    /// All permissible data types, in the order templates usually list them.
    pub const ALL: [DataType; 6] = [
        DataType::Str,
        DataType::Int8,
        DataType::Int16,
        DataType::Int32,
        DataType::Float32,
        DataType::Float64,
    ];

    /// Parses a data type name as written in a template (`"int32"`, ...).
    pub fn from_name(name: &str) -> Option<DataType> {
        match name {
            "str" => Some(DataType::Str),
            "int8" => Some(DataType::Int8),
            "int16" => Some(DataType::Int16),
            "int32" => Some(DataType::Int32),
            "float32" => Some(DataType::Float32),
            "float64" => Some(DataType::Float64),
            _ => None,
        }
    }

    /// Returns the template spelling of this data type.
    pub fn name(self) -> &'static str {
        match self {
            DataType::Str => "str",
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
        }
    }

    /// Returns the numeric type, or None for `str`.
    pub fn numeric(self) -> Option<NumericType> {
        match self {
            DataType::Str => None,
            DataType::Int8 => Some(NumericType::Int8),
            DataType::Int16 => Some(NumericType::Int16),
            DataType::Int32 => Some(NumericType::Int32),
            DataType::Float32 => Some(NumericType::Float32),
            DataType::Float64 => Some(NumericType::Float64),
        }
    }

    /// Returns the numeric family, or None for `str`.
    pub fn family(self) -> Option<Family> {
        self.numeric().map(NumericType::family)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl NumericType {
    pub fn family(self) -> Family {
        match self {
            NumericType::Int8 | NumericType::Int16 | NumericType::Int32 => Family::Integer,
            NumericType::Float32 | NumericType::Float64 => Family::Floating,
        }
    }

    /// Size of one element in bytes.
    pub fn size(self) -> usize {
        match self {
            NumericType::Int8 => std::mem::size_of::<i8>(),
            NumericType::Int16 => std::mem::size_of::<i16>(),
            NumericType::Int32 => std::mem::size_of::<i32>(),
            NumericType::Float32 => std::mem::size_of::<f32>(),
            NumericType::Float64 => std::mem::size_of::<f64>(),
        }
    }

    /// Returns true if an array of this type and shape can be allocated
    /// without overflowing `isize`.
    pub fn fits_shape(self, shape: &[usize]) -> bool {
        shape
            .iter()
            .try_fold(1usize, |count, &length| count.checked_mul(length))
            .map_or(false, |count| count <= isize::MAX as usize / self.size())
    }

    /// Returns true if `value` is representable without wrapping.
    ///
    /// Floating types accept every integer.
    pub fn accepts_integer(self, value: i64) -> bool {
        match self {
            NumericType::Int8 => i8::try_from(value).is_ok(),
            NumericType::Int16 => i16::try_from(value).is_ok(),
            NumericType::Int32 => i32::try_from(value).is_ok(),
            NumericType::Float32 | NumericType::Float64 => true,
        }
    }
}

impl From<NumericType> for DataType {
    fn from(t: NumericType) -> DataType {
        match t {
            NumericType::Int8 => DataType::Int8,
            NumericType::Int16 => DataType::Int16,
            NumericType::Int32 => DataType::Int32,
            NumericType::Float32 => DataType::Float32,
            NumericType::Float64 => DataType::Float64,
        }
    }
}

impl fmt::Display for NumericType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(DataType::from(*self).name())
    }
}

/// An attribute value as imported from a template document.
///
/// `Str` is interpolation text and only occurs with data type `str`.
/// `PlaceholderRef` holds the key of a `$key` reference and only occurs with
/// numeric data types.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Str(String),
    Int(i64),
    Float(f64),
    IntList(Vec<i64>),
    FloatList(Vec<f64>),
    PlaceholderRef(String),
}

impl From<NumericList> for ScalarValue {
    fn from(list: NumericList) -> ScalarValue {
        match list {
            NumericList::Int(values) => ScalarValue::IntList(values),
            NumericList::Float(values) => ScalarValue::FloatList(values),
        }
    }
}

/// A homogeneous, non-empty list of numeric literals.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericList {
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl NumericList {
    pub fn len(&self) -> usize {
        match self {
            NumericList::Int(values) => values.len(),
            NumericList::Float(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A caller-supplied substitution value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Substitution {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Substitution {
    /// Renders the value for interpolation into `str` text.
    pub fn to_text(&self) -> String {
        match self {
            Substitution::Str(s) => s.clone(),
            Substitution::Int(v) => v.to_string(),
            Substitution::Float(v) => float_repr(*v),
        }
    }

    /// Casts the value to a numeric type. Strings are parsed first.
    pub fn to_number(&self, t: NumericType) -> Option<Number> {
        match self {
            Substitution::Int(v) => Some(Number::from_i64(*v, t)),
            Substitution::Float(v) => Some(Number::from_f64(*v, t)),
            Substitution::Str(s) => match t.family() {
                Family::Integer => s.trim().parse::<i64>().ok().map(|v| Number::from_i64(v, t)),
                Family::Floating => s.trim().parse::<f64>().ok().map(|v| Number::from_f64(v, t)),
            },
        }
    }
}

impl From<&str> for Substitution {
    fn from(s: &str) -> Self {
        Substitution::Str(s.to_string())
    }
}

impl From<String> for Substitution {
    fn from(s: String) -> Self {
        Substitution::Str(s)
    }
}

impl From<i64> for Substitution {
    fn from(v: i64) -> Self {
        Substitution::Int(v)
    }
}

impl From<i32> for Substitution {
    fn from(v: i32) -> Self {
        Substitution::Int(v.into())
    }
}

impl From<f64> for Substitution {
    fn from(v: f64) -> Self {
        Substitution::Float(v)
    }
}

impl From<f32> for Substitution {
    fn from(v: f32) -> Self {
        Substitution::Float(v.into())
    }
}

/// Shortest round-trip rendering in Python's `repr` style.
///
/// Finite values with a decimal exponent in `-4..16` are written positionally
/// with at least one fractional digit. Others use an exponent with a sign and
/// at least two digits (`1e+20`, `1.5e-07`).
pub(crate) fn float_repr(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let scientific = format!("{:e}", v);
    if let Some((mantissa, exponent)) = scientific.split_once('e') {
        if let Ok(exponent) = exponent.parse::<i32>() {
            if !(-4..16).contains(&exponent) {
                let sign = if exponent < 0 { '-' } else { '+' };
                return format!("{}e{}{:02}", mantissa, sign, exponent.abs());
            }
        }
    }
    let s = v.to_string();
    if s.contains('.') {
        s
    } else {
        format!("{}.0", s)
    }
}

/// A single value cast to a numeric type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Number {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Float32(#[serde(with = "nonfinite::scalar")] f32),
    Float64(#[serde(with = "nonfinite::scalar")] f64),
}

impl Number {
    pub fn from_i64(v: i64, t: NumericType) -> Number {
        match t {
            NumericType::Int8 => Number::Int8(v.as_()),
            NumericType::Int16 => Number::Int16(v.as_()),
            NumericType::Int32 => Number::Int32(v.as_()),
            NumericType::Float32 => Number::Float32(v.as_()),
            NumericType::Float64 => Number::Float64(v.as_()),
        }
    }

    pub fn from_f64(v: f64, t: NumericType) -> Number {
        match t {
            NumericType::Int8 => Number::Int8(v.as_()),
            NumericType::Int16 => Number::Int16(v.as_()),
            NumericType::Int32 => Number::Int32(v.as_()),
            NumericType::Float32 => Number::Float32(v.as_()),
            NumericType::Float64 => Number::Float64(v.as_()),
        }
    }

    pub fn numeric_type(&self) -> NumericType {
        match self {
            Number::Int8(_) => NumericType::Int8,
            Number::Int16(_) => NumericType::Int16,
            Number::Int32(_) => NumericType::Int32,
            Number::Float32(_) => NumericType::Float32,
            Number::Float64(_) => NumericType::Float64,
        }
    }

    pub fn to_f64(self) -> f64 {
        match self {
            Number::Int8(v) => v.into(),
            Number::Int16(v) => v.into(),
            Number::Int32(v) => v.into(),
            Number::Float32(v) => v.into(),
            Number::Float64(v) => v,
        }
    }
}

/// Element types storable in a [`ValueArray`].
trait Element: Copy + Default + 'static {
    fn from_i64(v: i64) -> Self;
    fn from_f64(v: f64) -> Self;
    fn from_number(n: Number) -> Self;
    fn into_number(self) -> Number;
}

macro_rules! impl_element {
    ($t:ty, $variant:ident) => {
        impl Element for $t {
            fn from_i64(v: i64) -> Self {
                v.as_()
            }

            fn from_f64(v: f64) -> Self {
                v.as_()
            }

            fn from_number(n: Number) -> Self {
                match n {
                    Number::Int8(v) => v.as_(),
                    Number::Int16(v) => v.as_(),
                    Number::Int32(v) => v.as_(),
                    Number::Float32(v) => v.as_(),
                    Number::Float64(v) => v.as_(),
                }
            }

            fn into_number(self) -> Number {
                Number::$variant(self)
            }
        }
    };
}

impl_element!(i8, Int8);
impl_element!(i16, Int16);
impl_element!(i32, Int32);
impl_element!(f32, Float32);
impl_element!(f64, Float64);

/// A dense n-dimensional array of one numeric type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueArray {
    Int8(ArrayD<i8>),
    Int16(ArrayD<i16>),
    Int32(ArrayD<i32>),
    Float32(#[serde(with = "nonfinite::array")] ArrayD<f32>),
    Float64(#[serde(with = "nonfinite::array")] ArrayD<f64>),
}

macro_rules! each_array {
    ($array:expr, $a:ident => $body:expr) => {
        match $array {
            ValueArray::Int8($a) => $body,
            ValueArray::Int16($a) => $body,
            ValueArray::Int32($a) => $body,
            ValueArray::Float32($a) => $body,
            ValueArray::Float64($a) => $body,
        }
    };
}

fn copy_into<T: Element, S: Copy>(array: &mut ArrayD<T>, values: &[S], convert: fn(S) -> T) {
    for (slot, v) in array.iter_mut().zip(values) {
        *slot = convert(*v);
    }
}

impl ValueArray {
    /// Allocates a zero-filled array of the given type and shape.
    pub fn zeros(t: NumericType, shape: &[usize]) -> ValueArray {
        let dim = IxDyn(shape);
        match t {
            NumericType::Int8 => ValueArray::Int8(ArrayD::default(dim)),
            NumericType::Int16 => ValueArray::Int16(ArrayD::default(dim)),
            NumericType::Int32 => ValueArray::Int32(ArrayD::default(dim)),
            NumericType::Float32 => ValueArray::Float32(ArrayD::default(dim)),
            NumericType::Float64 => ValueArray::Float64(ArrayD::default(dim)),
        }
    }

    /// Builds a one-dimensional array from integer literals, casting each.
    pub fn from_ints(t: NumericType, values: &[i64]) -> ValueArray {
        let mut array = ValueArray::zeros(t, &[values.len()]);
        array.assign_ints(values);
        array
    }

    /// Builds a one-dimensional array from floating literals, casting each.
    pub fn from_floats(t: NumericType, values: &[f64]) -> ValueArray {
        let mut array = ValueArray::zeros(t, &[values.len()]);
        array.assign_floats(values);
        array
    }

    pub fn numeric_type(&self) -> NumericType {
        match self {
            ValueArray::Int8(_) => NumericType::Int8,
            ValueArray::Int16(_) => NumericType::Int16,
            ValueArray::Int32(_) => NumericType::Int32,
            ValueArray::Float32(_) => NumericType::Float32,
            ValueArray::Float64(_) => NumericType::Float64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        each_array!(self, a => a.shape())
    }

    pub fn len(&self) -> usize {
        each_array!(self, a => a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sets every element to `value`, cast to this array's type.
    pub fn fill(&mut self, value: Number) {
        each_array!(self, a => a.fill(Element::from_number(value)))
    }

    /// Copies integer literals into the array in logical order.
    ///
    /// Copying stops at whichever of the array or the slice ends first.
    pub fn assign_ints(&mut self, values: &[i64]) {
        each_array!(self, a => copy_into(a, values, Element::from_i64))
    }

    /// Copies floating literals into the array in logical order.
    pub fn assign_floats(&mut self, values: &[f64]) {
        each_array!(self, a => copy_into(a, values, Element::from_f64))
    }

    pub fn assign_list(&mut self, list: &NumericList) {
        match list {
            NumericList::Int(values) => self.assign_ints(values),
            NumericList::Float(values) => self.assign_floats(values),
        }
    }

    /// Returns the elements in logical order.
    pub fn numbers(&self) -> Vec<Number> {
        each_array!(self, a => a.iter().map(|v| v.into_number()).collect())
    }

    /// Returns the elements in logical order, widened to f64.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.numbers().into_iter().map(Number::to_f64).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_names() {
        for t in DataType::ALL {
            assert_eq!(DataType::from_name(t.name()), Some(t));
        }
        assert_eq!(DataType::from_name("int64"), None);
        assert_eq!(DataType::from_name("double"), None);
        assert_eq!(DataType::Str.numeric(), None);
        assert_eq!(DataType::Float32.family(), Some(Family::Floating));
        assert_eq!(DataType::Int16.family(), Some(Family::Integer));
    }

    #[test]
    fn test_accepts_integer() {
        assert!(NumericType::Int8.accepts_integer(127));
        assert!(!NumericType::Int8.accepts_integer(128));
        assert!(NumericType::Int16.accepts_integer(-32768));
        assert!(!NumericType::Int32.accepts_integer(i64::from(i32::MAX) + 1));
        assert!(NumericType::Float32.accepts_integer(i64::MAX));
    }

    #[test]
    fn test_number_casts() {
        assert_eq!(Number::from_i64(7, NumericType::Float32), Number::Float32(7.0));
        assert_eq!(Number::from_f64(3.9, NumericType::Int32), Number::Int32(3));
        assert_eq!(Number::from_f64(-3.9, NumericType::Int16), Number::Int16(-3));
        assert_eq!(Number::Float32(2.5).numeric_type(), NumericType::Float32);
    }

    #[test]
    fn test_substitution_to_number() {
        assert_eq!(
            Substitution::Int(7).to_number(NumericType::Int16),
            Some(Number::Int16(7))
        );
        assert_eq!(
            Substitution::from(" 42 ").to_number(NumericType::Int32),
            Some(Number::Int32(42))
        );
        assert_eq!(
            Substitution::from("1.5").to_number(NumericType::Float64),
            Some(Number::Float64(1.5))
        );
        assert_eq!(Substitution::from("1.5").to_number(NumericType::Int32), None);
        assert_eq!(Substitution::from("abc").to_number(NumericType::Float32), None);
    }

    #[test]
    fn test_substitution_to_text() {
        assert_eq!(Substitution::from("Alpha").to_text(), "Alpha");
        assert_eq!(Substitution::Int(-3).to_text(), "-3");
        assert_eq!(Substitution::Float(2.0).to_text(), "2.0");
        assert_eq!(Substitution::Float(0.1).to_text(), "0.1");
        assert_eq!(Substitution::Float(f64::NEG_INFINITY).to_text(), "-inf");
    }

    #[test]
    fn test_float_repr() {
        assert_eq!(float_repr(1e20), "1e+20");
        assert_eq!(float_repr(1e-7), "1e-07");
        assert_eq!(float_repr(1.5e-5), "1.5e-05");
        assert_eq!(float_repr(-2.5e100), "-2.5e+100");
        assert_eq!(float_repr(1e16), "1e+16");
        assert_eq!(float_repr(1e15), "1000000000000000.0");
        assert_eq!(float_repr(0.0001), "0.0001");
        assert_eq!(float_repr(0.0), "0.0");
        assert_eq!(float_repr(-0.0), "-0.0");
        assert_eq!(float_repr(123.25), "123.25");
        assert_eq!(float_repr(f64::NAN), "nan");
    }

    #[test]
    fn test_fits_shape() {
        assert!(NumericType::Float64.fits_shape(&[]));
        assert!(NumericType::Float64.fits_shape(&[4, 3]));
        assert!(NumericType::Int8.fits_shape(&[isize::MAX as usize]));
        assert!(!NumericType::Int16.fits_shape(&[isize::MAX as usize]));
        assert!(!NumericType::Int8.fits_shape(&[usize::MAX]));
        assert!(!NumericType::Int8.fits_shape(&[1 << 40, 1 << 40]));
        assert!(NumericType::Int8.fits_shape(&[usize::MAX, 0]));
    }

    #[test]
    fn test_non_finite_numbers_survive_json() {
        let number = Number::Float32(f32::NAN);
        let text = serde_json::to_string(&number).unwrap();
        assert_eq!(text, r#"{"Float32":"NaN"}"#);
        let back: Number = serde_json::from_str(&text).unwrap();
        assert!(matches!(back, Number::Float32(v) if v.is_nan()));

        let mut array = ValueArray::zeros(NumericType::Float64, &[2]);
        array.fill(Number::Float64(f64::NEG_INFINITY));
        let text = serde_json::to_string(&array).unwrap();
        let back: ValueArray = serde_json::from_str(&text).unwrap();
        assert_eq!(back, array);

        let ints = ValueArray::from_ints(NumericType::Int16, &[1, 2]);
        let text = serde_json::to_string(&ints).unwrap();
        let back: ValueArray = serde_json::from_str(&text).unwrap();
        assert_eq!(back, ints);
    }

    #[test]
    fn test_value_array_zeros_and_fill() {
        let mut array = ValueArray::zeros(NumericType::Int32, &[5]);
        assert_eq!(array.shape(), &[5]);
        assert_eq!(array.to_f64_vec(), vec![0.0; 5]);

        array.fill(Number::Float64(7.8));
        assert_eq!(array.numbers(), vec![Number::Int32(7); 5]);
    }

    #[test]
    fn test_value_array_assign() {
        let mut array = ValueArray::zeros(NumericType::Float32, &[3]);
        array.assign_ints(&[1, 2, 3, 4]);
        assert_eq!(array.to_f64_vec(), vec![1.0, 2.0, 3.0]);

        let array = ValueArray::from_floats(NumericType::Int8, &[1.9, -2.2]);
        assert_eq!(array.numbers(), vec![Number::Int8(1), Number::Int8(-2)]);

        let array = ValueArray::from_ints(NumericType::Int32, &[10, 20]);
        assert_eq!(array.numbers(), vec![Number::Int32(10), Number::Int32(20)]);
        assert_eq!(array.shape(), &[2]);
    }
}
