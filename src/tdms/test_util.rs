//! In-memory TDMS segment builder for unit tests.

use super::types::{DataType, PropertyValue};
use super::{PROP_NAME, PROP_UNIT, PROP_WF_INCREMENT, PROP_WF_SAMPLES, PROP_WF_START_OFFSET, PROP_WF_START_TIME};
use chrono::{DateTime, TimeZone, Utc};

const LABVIEW_EPOCH_OFFSET: i64 = 2_082_844_800;

pub(crate) fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 7, 8, 2, 3, 4).unwrap()
}

enum RawData {
    None,
    New { data_type: DataType, count: u64, bytes: Vec<u8> },
    SameIndex { count: u64, bytes: Vec<u8> },
}

struct TestObject {
    path: String,
    raw: RawData,
    properties: Vec<(String, PropertyValue)>,
}

pub(crate) struct SegmentBuilder {
    objects: Vec<TestObject>,
    new_object_list: bool,
    interleaved: bool,
}

impl SegmentBuilder {
    pub(crate) fn new() -> Self {
        Self {
            objects: Vec::new(),
            new_object_list: true,
            interleaved: false,
        }
    }

    /// A segment that extends the previous segment's object list.
    pub(crate) fn continuation() -> Self {
        Self {
            new_object_list: false,
            ..Self::new()
        }
    }

    /// A segment holding only little-endian f64 raw data.
    pub(crate) fn raw_only(values: &[f64]) -> Vec<u8> {
        let raw: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        lead_in(1 << 3, 0, raw.len() as u64)
            .into_iter()
            .chain(raw)
            .collect()
    }

    pub(crate) fn object(mut self, path: &str, properties: &[(&str, PropertyValue)]) -> Self {
        self.objects.push(TestObject {
            path: path.to_string(),
            raw: RawData::None,
            properties: own(properties),
        });
        self
    }

    pub(crate) fn channel_f64(
        mut self,
        path: &str,
        values: &[f64],
        properties: &[(&str, PropertyValue)],
    ) -> Self {
        self.objects.push(TestObject {
            path: path.to_string(),
            raw: RawData::New {
                data_type: DataType::DoubleFloat,
                count: values.len() as u64,
                bytes: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
            },
            properties: own(properties),
        });
        self
    }

    pub(crate) fn channel_i32(
        mut self,
        path: &str,
        values: &[i32],
        properties: &[(&str, PropertyValue)],
    ) -> Self {
        self.objects.push(TestObject {
            path: path.to_string(),
            raw: RawData::New {
                data_type: DataType::I32,
                count: values.len() as u64,
                bytes: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
            },
            properties: own(properties),
        });
        self
    }

    pub(crate) fn channel_f64_same_index(mut self, path: &str, values: &[f64]) -> Self {
        self.objects.push(TestObject {
            path: path.to_string(),
            raw: RawData::SameIndex {
                count: values.len() as u64,
                bytes: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
            },
            properties: Vec::new(),
        });
        self
    }

    pub(crate) fn interleaved(mut self) -> Self {
        self.interleaved = true;
        self
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let mut meta = Vec::new();
        put_u32(&mut meta, self.objects.len() as u32);

        for object in &self.objects {
            put_string(&mut meta, &object.path);
            match &object.raw {
                RawData::None => put_u32(&mut meta, 0xFFFF_FFFF),
                RawData::SameIndex { .. } => put_u32(&mut meta, 0),
                RawData::New {
                    data_type, count, ..
                } => {
                    put_u32(&mut meta, 20);
                    put_u32(&mut meta, data_type.code());
                    put_u32(&mut meta, 1);
                    put_u64(&mut meta, *count);
                }
            }

            put_u32(&mut meta, object.properties.len() as u32);
            for (name, value) in &object.properties {
                put_string(&mut meta, name);
                put_property(&mut meta, value);
            }
        }

        let channels: Vec<(u64, &[u8])> = self
            .objects
            .iter()
            .filter_map(|o| match &o.raw {
                RawData::None => None,
                RawData::New { count, bytes, .. } | RawData::SameIndex { count, bytes } => {
                    Some((*count, bytes.as_slice()))
                }
            })
            .collect();

        let mut raw = Vec::new();
        if self.interleaved {
            let count = channels.first().map(|(c, _)| *c).unwrap_or(0) as usize;
            for i in 0..count {
                for (n, bytes) in &channels {
                    let size = bytes.len() / *n as usize;
                    raw.extend_from_slice(&bytes[i * size..(i + 1) * size]);
                }
            }
        } else {
            for (_, bytes) in &channels {
                raw.extend_from_slice(bytes);
            }
        }

        let mut toc = 1 << 1;
        if !channels.is_empty() {
            toc |= 1 << 3;
        }
        if self.new_object_list {
            toc |= 1 << 2;
        }
        if self.interleaved {
            toc |= 1 << 5;
        }

        let mut segment = lead_in(toc, meta.len() as u64, raw.len() as u64);
        segment.extend(meta);
        segment.extend(raw);
        segment
    }
}

/// Root `name` = dev2_1, group `Untitled`, a waveform channel `ch0`
/// (0, 1, 2, ... in volts) and a plain channel `ch1` (0, -1, -2, ... in amps).
pub(crate) fn waveform_recording(samples: usize, increment: f64) -> Vec<u8> {
    let ch0: Vec<f64> = (0..samples).map(|i| i as f64).collect();
    let ch1: Vec<f64> = (0..samples).map(|i| -(i as f64)).collect();

    SegmentBuilder::new()
        .object("/", &[(PROP_NAME, PropertyValue::String("dev2_1".into()))])
        .object("/'Untitled'", &[])
        .channel_f64(
            "/'Untitled'/'ch0'",
            &ch0,
            &[
                (PROP_UNIT, PropertyValue::String("V".into())),
                (PROP_WF_SAMPLES, PropertyValue::UInt(samples as u64)),
                (PROP_WF_START_TIME, PropertyValue::Timestamp(start_time())),
                (PROP_WF_START_OFFSET, PropertyValue::Float(0.0)),
                (PROP_WF_INCREMENT, PropertyValue::Float(increment)),
            ],
        )
        .channel_f64(
            "/'Untitled'/'ch1'",
            &ch1,
            &[(PROP_UNIT, PropertyValue::String("A".into()))],
        )
        .build()
}

fn own(properties: &[(&str, PropertyValue)]) -> Vec<(String, PropertyValue)> {
    properties
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn lead_in(toc: u32, meta_len: u64, raw_len: u64) -> Vec<u8> {
    let mut out = b"TDSm".to_vec();
    put_u32(&mut out, toc);
    put_u32(&mut out, 4713);
    put_u64(&mut out, meta_len + raw_len);
    put_u64(&mut out, meta_len);
    out
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_string(out: &mut Vec<u8>, value: &str) {
    put_u32(out, value.len() as u32);
    out.extend_from_slice(value.as_bytes());
}

fn put_property(out: &mut Vec<u8>, value: &PropertyValue) {
    match value {
        PropertyValue::Int(v) => {
            put_u32(out, DataType::I64.code());
            out.extend_from_slice(&v.to_le_bytes());
        }
        PropertyValue::UInt(v) => {
            put_u32(out, DataType::U64.code());
            put_u64(out, *v);
        }
        PropertyValue::Float(v) => {
            put_u32(out, DataType::DoubleFloat.code());
            out.extend_from_slice(&v.to_le_bytes());
        }
        PropertyValue::Boolean(v) => {
            put_u32(out, DataType::Boolean.code());
            out.push(*v as u8);
        }
        PropertyValue::String(s) => {
            put_u32(out, DataType::String.code());
            put_string(out, s);
        }
        PropertyValue::Timestamp(t) => {
            put_u32(out, DataType::TimeStamp.code());
            let fractions = ((t.timestamp_subsec_nanos() as u128) << 64) / 1_000_000_000;
            put_u64(out, fractions as u64);
            out.extend_from_slice(&(t.timestamp() + LABVIEW_EPOCH_OFFSET).to_le_bytes());
        }
    }
}
