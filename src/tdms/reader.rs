use super::types::{DataType, Properties, PropertyValue};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io;

const LEAD_IN_SIZE: usize = 28;
const SEGMENT_TAG: &[u8; 4] = b"TDSm";

const TOC_META_DATA: u32 = 1 << 1;
const TOC_NEW_OBJ_LIST: u32 = 1 << 2;
const TOC_RAW_DATA: u32 = 1 << 3;
const TOC_INTERLEAVED_DATA: u32 = 1 << 5;
const TOC_BIG_ENDIAN: u32 = 1 << 6;
const TOC_DAQMX_RAW_DATA: u32 = 1 << 7;

const NO_RAW_DATA: u32 = 0xFFFF_FFFF;
const SAME_RAW_INDEX: u32 = 0x0000_0000;
const DAQMX_FORMAT_CHANGING: u32 = 0x6912_0000;
const DAQMX_DIGITAL_LINE: u32 = 0x6913_0000;

/// Seconds from the LabVIEW epoch (1904-01-01 UTC) to the Unix epoch.
const LABVIEW_EPOCH_OFFSET: i64 = 2_082_844_800;

/// One decoded object (root, group or channel), in first-seen order.
#[derive(Debug)]
pub(super) struct RawObject {
    pub path: String,
    pub data_type: Option<DataType>,
    pub properties: Properties,
    pub data: Vec<f64>,
}

#[derive(Debug, Clone, Copy)]
struct RawIndex {
    data_type: DataType,
    count: u64,
}

#[derive(Debug, Clone, Copy)]
enum Endian {
    Little,
    Big,
}

/// Decode every segment of a TDMS byte buffer.
pub(super) fn read_segments(bytes: &[u8]) -> io::Result<Vec<RawObject>> {
    let mut state = SegmentState::default();
    let mut offset = 0usize;

    while offset < bytes.len() {
        if bytes.len() - offset < LEAD_IN_SIZE {
            return Err(invalid(format!("truncated lead-in at byte {}", offset)));
        }

        let lead_in = &bytes[offset..offset + LEAD_IN_SIZE];
        if &lead_in[..4] != SEGMENT_TAG {
            return Err(invalid(format!("missing TDSm tag at byte {}", offset)));
        }

        // The ToC mask is always little-endian; it decides the rest.
        let toc = LittleEndian::read_u32(&lead_in[4..8]);
        let endian = if toc & TOC_BIG_ENDIAN != 0 {
            Endian::Big
        } else {
            Endian::Little
        };

        let mut header = ByteReader::new(&lead_in[8..], endian);
        let _version = header.u32()?;
        let next_segment_offset = header.u64()?;
        let raw_data_offset = header.u64()?;

        let body_start = offset + LEAD_IN_SIZE;
        let segment_end = if next_segment_offset == u64::MAX {
            bytes.len()
        } else {
            body_start
                .saturating_add(next_segment_offset as usize)
                .min(bytes.len())
        };
        let data_start = body_start.saturating_add(raw_data_offset as usize);
        if data_start > segment_end {
            return Err(invalid(format!(
                "raw data offset {} lies beyond the segment end",
                raw_data_offset
            )));
        }

        if toc & TOC_DAQMX_RAW_DATA != 0 {
            return Err(unsupported("DAQmx raw data"));
        }

        if toc & TOC_META_DATA != 0 {
            let mut meta = ByteReader::new(&bytes[body_start..data_start], endian);
            state.read_metadata(&mut meta, toc & TOC_NEW_OBJ_LIST != 0)?;
        }

        if toc & TOC_RAW_DATA != 0 {
            let raw = ByteReader::new(&bytes[data_start..segment_end], endian);
            state.read_raw_data(raw, toc & TOC_INTERLEAVED_DATA != 0)?;
        }

        if next_segment_offset == u64::MAX {
            break;
        }
        offset = segment_end;
    }

    Ok(state.objects)
}

#[derive(Default)]
struct SegmentState {
    objects: Vec<RawObject>,
    indexes: Vec<Option<RawIndex>>,
    lookup: HashMap<String, usize>,
    // objects listed for the current segment, in raw data order
    active: Vec<usize>,
}

impl SegmentState {
    fn object_id(&mut self, path: &str) -> usize {
        if let Some(&id) = self.lookup.get(path) {
            return id;
        }

        self.objects.push(RawObject {
            path: path.to_string(),
            data_type: None,
            properties: Properties::new(),
            data: Vec::new(),
        });
        self.indexes.push(None);
        let id = self.objects.len() - 1;
        self.lookup.insert(path.to_string(), id);
        id
    }

    fn read_metadata(&mut self, reader: &mut ByteReader<'_>, new_object_list: bool) -> io::Result<()> {
        if new_object_list {
            self.active.clear();
        }

        let object_count = reader.u32()?;
        for _ in 0..object_count {
            let path = reader.string()?;
            let id = self.object_id(&path);

            match reader.u32()? {
                NO_RAW_DATA => self.indexes[id] = None,
                SAME_RAW_INDEX => {
                    if self.indexes[id].is_none() {
                        return Err(invalid(format!(
                            "{} reuses a raw data index it never declared",
                            path
                        )));
                    }
                }
                DAQMX_FORMAT_CHANGING | DAQMX_DIGITAL_LINE => {
                    return Err(unsupported("DAQmx raw data index"));
                }
                _ => {
                    let code = reader.u32()?;
                    let data_type = DataType::from_code(code)
                        .ok_or_else(|| invalid(format!("unknown data type 0x{:X} for {}", code, path)))?;
                    let dimension = reader.u32()?;
                    if dimension != 1 {
                        return Err(invalid(format!(
                            "array dimension {} for {} (only 1 is valid)",
                            dimension, path
                        )));
                    }
                    let count = reader.u64()?;
                    if data_type == DataType::String {
                        let _total_size = reader.u64()?;
                    }
                    self.indexes[id] = Some(RawIndex { data_type, count });
                    self.objects[id].data_type = Some(data_type);
                }
            }

            if !self.active.contains(&id) {
                self.active.push(id);
            }

            let property_count = reader.u32()?;
            for _ in 0..property_count {
                let name = reader.string()?;
                let code = reader.u32()?;
                let data_type = DataType::from_code(code).ok_or_else(|| {
                    invalid(format!("unknown property type 0x{:X} for {}", code, name))
                })?;
                let value = reader.property(data_type)?;
                self.objects[id].properties.insert(name, value);
            }
        }

        Ok(())
    }

    fn read_raw_data(&mut self, mut reader: ByteReader<'_>, interleaved: bool) -> io::Result<()> {
        let entries: Vec<(usize, RawIndex)> = self
            .active
            .iter()
            .filter_map(|&id| self.indexes[id].map(|index| (id, index)))
            .filter(|(_, index)| index.count > 0 && index.data_type != DataType::Void)
            .collect();

        if entries.is_empty() {
            return Ok(());
        }

        let mut chunk_size = 0usize;
        for (id, index) in &entries {
            let size = match index.data_type.size() {
                Some(size) if index.data_type.is_numeric() => size,
                _ => {
                    return Err(unsupported(&format!(
                        "{} raw data in {}",
                        index.data_type, self.objects[*id].path
                    )))
                }
            };
            chunk_size = usize::try_from(index.count)
                .ok()
                .and_then(|count| count.checked_mul(size))
                .and_then(|bytes| bytes.checked_add(chunk_size))
                .ok_or_else(|| {
                    invalid(format!(
                        "raw data size overflows for {} ({} values)",
                        self.objects[*id].path, index.count
                    ))
                })?;
        }

        let chunks = reader.remaining() / chunk_size;

        if interleaved {
            let count = entries[0].1.count;
            if entries.iter().any(|(_, index)| index.count != count) {
                return Err(invalid("interleaved channels with different value counts"));
            }
            for _ in 0..chunks {
                for _ in 0..count {
                    for (id, index) in &entries {
                        let value = reader.sample(index.data_type)?;
                        self.objects[*id].data.push(value);
                    }
                }
            }
        } else {
            for _ in 0..chunks {
                for (id, index) in &entries {
                    let data = &mut self.objects[*id].data;
                    data.reserve(index.count as usize);
                    for _ in 0..index.count {
                        data.push(reader.sample(index.data_type)?);
                    }
                }
            }
        }

        Ok(())
    }
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    position: usize,
    endian: Endian,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8], endian: Endian) -> Self {
        Self {
            bytes,
            position: 0,
            endian,
        }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    fn take(&mut self, length: usize) -> io::Result<&'a [u8]> {
        if self.remaining() < length {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("needed {} bytes, {} left", length, self.remaining()),
            ));
        }
        let bytes: &'a [u8] = self.bytes;
        let slice = &bytes[self.position..self.position + length];
        self.position += length;
        Ok(slice)
    }

    fn u8(&mut self) -> io::Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> io::Result<u16> {
        let raw = self.take(2)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_u16(raw),
            Endian::Big => BigEndian::read_u16(raw),
        })
    }

    fn u32(&mut self) -> io::Result<u32> {
        let raw = self.take(4)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_u32(raw),
            Endian::Big => BigEndian::read_u32(raw),
        })
    }

    fn u64(&mut self) -> io::Result<u64> {
        let raw = self.take(8)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_u64(raw),
            Endian::Big => BigEndian::read_u64(raw),
        })
    }

    fn f32(&mut self) -> io::Result<f32> {
        let raw = self.take(4)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_f32(raw),
            Endian::Big => BigEndian::read_f32(raw),
        })
    }

    fn f64(&mut self) -> io::Result<f64> {
        let raw = self.take(8)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_f64(raw),
            Endian::Big => BigEndian::read_f64(raw),
        })
    }

    fn string(&mut self) -> io::Result<String> {
        let length = self.u32()? as usize;
        let raw = self.take(length)?;
        String::from_utf8(raw.to_vec()).map_err(|e| invalid(format!("invalid UTF-8 string: {}", e)))
    }

    fn timestamp(&mut self) -> io::Result<DateTime<Utc>> {
        let (seconds, fractions) = match self.endian {
            Endian::Little => {
                let fractions = self.u64()?;
                (self.u64()? as i64, fractions)
            }
            Endian::Big => {
                let seconds = self.u64()? as i64;
                (seconds, self.u64()?)
            }
        };

        // fractions are units of 2^-64 seconds
        let nanos = ((fractions as u128 * 1_000_000_000) >> 64) as u32;
        DateTime::<Utc>::from_timestamp(seconds - LABVIEW_EPOCH_OFFSET, nanos)
            .ok_or_else(|| invalid(format!("timestamp {} out of range", seconds)))
    }

    fn property(&mut self, data_type: DataType) -> io::Result<PropertyValue> {
        let value = match data_type {
            DataType::I8 => PropertyValue::Int(self.u8()? as i8 as i64),
            DataType::I16 => PropertyValue::Int(self.u16()? as i16 as i64),
            DataType::I32 => PropertyValue::Int(self.u32()? as i32 as i64),
            DataType::I64 => PropertyValue::Int(self.u64()? as i64),
            DataType::U8 => PropertyValue::UInt(self.u8()? as u64),
            DataType::U16 => PropertyValue::UInt(self.u16()? as u64),
            DataType::U32 => PropertyValue::UInt(self.u32()? as u64),
            DataType::U64 => PropertyValue::UInt(self.u64()?),
            DataType::SingleFloat | DataType::SingleFloatWithUnit => {
                PropertyValue::Float(self.f32()? as f64)
            }
            DataType::DoubleFloat | DataType::DoubleFloatWithUnit => {
                PropertyValue::Float(self.f64()?)
            }
            DataType::String => PropertyValue::String(self.string()?),
            DataType::Boolean => PropertyValue::Boolean(self.u8()? != 0),
            DataType::TimeStamp => PropertyValue::Timestamp(self.timestamp()?),
            other => return Err(unsupported(&format!("{} property", other))),
        };
        Ok(value)
    }

    fn sample(&mut self, data_type: DataType) -> io::Result<f64> {
        let value = match data_type {
            DataType::I8 => self.u8()? as i8 as f64,
            DataType::I16 => self.u16()? as i16 as f64,
            DataType::I32 => self.u32()? as i32 as f64,
            DataType::I64 => self.u64()? as i64 as f64,
            DataType::U8 => self.u8()? as f64,
            DataType::U16 => self.u16()? as f64,
            DataType::U32 => self.u32()? as f64,
            DataType::U64 => self.u64()? as f64,
            DataType::SingleFloat | DataType::SingleFloatWithUnit => self.f32()? as f64,
            DataType::DoubleFloat | DataType::DoubleFloatWithUnit => self.f64()?,
            DataType::Boolean => {
                if self.u8()? != 0 {
                    1.0
                } else {
                    0.0
                }
            }
            DataType::TimeStamp => {
                let t = self.timestamp()?;
                t.timestamp() as f64 + t.timestamp_subsec_nanos() as f64 * 1e-9
            }
            other => return Err(unsupported(&format!("{} sample", other))),
        };
        Ok(value)
    }
}

fn invalid<S: Into<String>>(message: S) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.into())
}

fn unsupported(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, format!("{} is not supported", what))
}
