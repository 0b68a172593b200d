use chrono::{DateTime, Utc};
use std::fmt;

/// TDMS data type codes as stored in segment metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Void,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    SingleFloat,
    DoubleFloat,
    SingleFloatWithUnit,
    DoubleFloatWithUnit,
    String,
    Boolean,
    TimeStamp,
    ComplexSingleFloat,
    ComplexDoubleFloat,
    DaqMxRawData,
}

impl DataType {
    pub fn from_code(code: u32) -> Option<Self> {
        let data_type = match code {
            0x00 => DataType::Void,
            0x01 => DataType::I8,
            0x02 => DataType::I16,
            0x03 => DataType::I32,
            0x04 => DataType::I64,
            0x05 => DataType::U8,
            0x06 => DataType::U16,
            0x07 => DataType::U32,
            0x08 => DataType::U64,
            0x09 => DataType::SingleFloat,
            0x0A => DataType::DoubleFloat,
            0x19 => DataType::SingleFloatWithUnit,
            0x1A => DataType::DoubleFloatWithUnit,
            0x20 => DataType::String,
            0x21 => DataType::Boolean,
            0x44 => DataType::TimeStamp,
            0x08_000C => DataType::ComplexSingleFloat,
            0x10_000D => DataType::ComplexDoubleFloat,
            0xFFFF_FFFF => DataType::DaqMxRawData,
            _ => return None,
        };
        Some(data_type)
    }

    pub fn code(&self) -> u32 {
        match self {
            DataType::Void => 0x00,
            DataType::I8 => 0x01,
            DataType::I16 => 0x02,
            DataType::I32 => 0x03,
            DataType::I64 => 0x04,
            DataType::U8 => 0x05,
            DataType::U16 => 0x06,
            DataType::U32 => 0x07,
            DataType::U64 => 0x08,
            DataType::SingleFloat => 0x09,
            DataType::DoubleFloat => 0x0A,
            DataType::SingleFloatWithUnit => 0x19,
            DataType::DoubleFloatWithUnit => 0x1A,
            DataType::String => 0x20,
            DataType::Boolean => 0x21,
            DataType::TimeStamp => 0x44,
            DataType::ComplexSingleFloat => 0x08_000C,
            DataType::ComplexDoubleFloat => 0x10_000D,
            DataType::DaqMxRawData => 0xFFFF_FFFF,
        }
    }

    /// Size in bytes of one raw value, `None` for variable-size types.
    pub fn size(&self) -> Option<usize> {
        match self {
            DataType::Void => Some(0),
            DataType::I8 | DataType::U8 | DataType::Boolean => Some(1),
            DataType::I16 | DataType::U16 => Some(2),
            DataType::I32 | DataType::U32 | DataType::SingleFloat => Some(4),
            DataType::SingleFloatWithUnit => Some(4),
            DataType::I64 | DataType::U64 | DataType::DoubleFloat => Some(8),
            DataType::DoubleFloatWithUnit | DataType::ComplexSingleFloat => Some(8),
            DataType::TimeStamp | DataType::ComplexDoubleFloat => Some(16),
            DataType::String | DataType::DaqMxRawData => None,
        }
    }

    /// Whether raw values of this type can be widened into an `f64` column.
    pub fn is_numeric(&self) -> bool {
        !matches!(
            self,
            DataType::String
                | DataType::DaqMxRawData
                | DataType::ComplexSingleFloat
                | DataType::ComplexDoubleFloat
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataType::Void => "Void",
            DataType::I8 => "Int8",
            DataType::I16 => "Int16",
            DataType::I32 => "Int32",
            DataType::I64 => "Int64",
            DataType::U8 => "Uint8",
            DataType::U16 => "Uint16",
            DataType::U32 => "Uint32",
            DataType::U64 => "Uint64",
            DataType::SingleFloat => "SingleFloat",
            DataType::DoubleFloat => "DoubleFloat",
            DataType::SingleFloatWithUnit => "SingleFloatWithUnit",
            DataType::DoubleFloatWithUnit => "DoubleFloatWithUnit",
            DataType::String => "String",
            DataType::Boolean => "Boolean",
            DataType::TimeStamp => "TimeStamp",
            DataType::ComplexSingleFloat => "ComplexSingleFloat",
            DataType::ComplexDoubleFloat => "ComplexDoubleFloat",
            DataType::DaqMxRawData => "DaqMxRawData",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Boolean(bool),
    String(String),
    Timestamp(DateTime<Utc>),
}

impl PropertyValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Int(v) => Some(*v as f64),
            PropertyValue::UInt(v) => Some(*v as f64),
            PropertyValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            PropertyValue::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Int(v) => write!(f, "{}", v),
            PropertyValue::UInt(v) => write!(f, "{}", v),
            PropertyValue::Float(v) => write!(f, "{}", v),
            PropertyValue::Boolean(v) => write!(f, "{}", v),
            PropertyValue::String(s) => f.write_str(s),
            PropertyValue::Timestamp(t) => write!(f, "{}", t.format("%Y-%m-%dT%H:%M:%S%.6f")),
        }
    }
}

/// Insertion-ordered property set. Re-setting a key keeps its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    entries: Vec<(String, PropertyValue)>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>>(&mut self, key: S, value: PropertyValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Extend<(String, PropertyValue)> for Properties {
    fn extend<T: IntoIterator<Item = (String, PropertyValue)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl IntoIterator for Properties {
    type Item = (String, PropertyValue);
    type IntoIter = std::vec::IntoIter<(String, PropertyValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_codes_round_trip() {
        for code in [0x01, 0x03, 0x0A, 0x20, 0x44, 0x10_000D] {
            let data_type = DataType::from_code(code).unwrap();
            assert_eq!(data_type.code(), code);
        }
        assert!(DataType::from_code(0x55).is_none());
    }

    #[test]
    fn test_properties_keep_insertion_order() {
        let mut props = Properties::new();
        props.insert("b", PropertyValue::Int(1));
        props.insert("a", PropertyValue::Int(2));
        props.insert("b", PropertyValue::Int(3));

        let keys: Vec<&str> = props.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(props.get("b"), Some(&PropertyValue::Int(3)));
        assert_eq!(props.len(), 2);
    }

    #[test]
    fn test_property_value_conversions() {
        assert_eq!(PropertyValue::UInt(7).as_f64(), Some(7.0));
        assert_eq!(PropertyValue::String("V".into()).as_str(), Some("V"));
        assert!(PropertyValue::Boolean(true).as_f64().is_none());
    }
}
