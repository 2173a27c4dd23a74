use std::time::SystemTime;

/// Numeric value of a point field or an accumulated counter.
///
/// The kind is fixed per counter key at first insertion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
}
impl FieldValue {
    pub fn kind(&self) -> NumericKind {
        match self {
            Self::Int(_) => NumericKind::Int,
            Self::Float(_) => NumericKind::Float,
        }
    }
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }
}
impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}
impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}
impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}
impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}
impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    Int,
    Float,
}
impl core::fmt::Display for NumericKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Int => f.write_str("integer"),
            Self::Float => f.write_str("float"),
        }
    }
}

/// One timestamped record: a measurement with a single tag and a single `value` field.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub tag: (String, String),
    pub value: FieldValue,
    pub time: SystemTime,
}
impl Point {
    pub fn new(
        measurement: impl Into<String>,
        tag_key: impl Into<String>,
        tag_value: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Self {
        Self {
            measurement: measurement.into(),
            tag: (tag_key.into(), tag_value.into()),
            value: value.into(),
            time: SystemTime::now(),
        }
    }
    pub fn at(mut self, time: SystemTime) -> Self {
        self.time = time;
        self
    }
}
