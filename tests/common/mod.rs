//! TDMS fixtures written byte by byte, little-endian, one segment.

use std::fs;
use std::path::{Path, PathBuf};

const TOC_META_DATA: u32 = 1 << 1;
const TOC_NEW_OBJ_LIST: u32 = 1 << 2;
const TOC_RAW_DATA: u32 = 1 << 3;

const TYPE_U64: u32 = 0x08;
const TYPE_DOUBLE: u32 = 0x0A;
const TYPE_STRING: u32 = 0x20;
const TYPE_TIMESTAMP: u32 = 0x44;

/// 2020-07-08T02:03:04Z in seconds since 1904-01-01 UTC.
const START_SECONDS: i64 = 1_594_173_784 + 2_082_844_800;

pub enum Prop<'a> {
    Str(&'a str),
    UInt(u64),
    Float(f64),
    StartTime,
}

pub struct Fixture<'a> {
    channels: Vec<(&'a str, Vec<f64>, Vec<(&'a str, Prop<'a>)>)>,
}

impl<'a> Fixture<'a> {
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
        }
    }

    pub fn channel(mut self, name: &'a str, values: Vec<f64>, props: Vec<(&'a str, Prop<'a>)>) -> Self {
        self.channels.push((name, values, props));
        self
    }

    pub fn bytes(&self) -> Vec<u8> {
        let mut meta = Vec::new();
        put_u32(&mut meta, 2 + self.channels.len() as u32);

        put_str(&mut meta, "/");
        put_u32(&mut meta, 0xFFFF_FFFF);
        put_u32(&mut meta, 1);
        put_str(&mut meta, "name");
        put_prop(&mut meta, &Prop::Str("dev2_1"));

        put_str(&mut meta, "/'Untitled'");
        put_u32(&mut meta, 0xFFFF_FFFF);
        put_u32(&mut meta, 0);

        let mut raw = Vec::new();
        for (name, values, props) in &self.channels {
            put_str(&mut meta, &format!("/'Untitled'/'{}'", name));
            put_u32(&mut meta, 20);
            put_u32(&mut meta, TYPE_DOUBLE);
            put_u32(&mut meta, 1);
            put_u64(&mut meta, values.len() as u64);
            put_u32(&mut meta, props.len() as u32);
            for (key, value) in props {
                put_str(&mut meta, key);
                put_prop(&mut meta, value);
            }
            for value in values {
                raw.extend_from_slice(&value.to_le_bytes());
            }
        }

        let mut out = b"TDSm".to_vec();
        put_u32(&mut out, TOC_META_DATA | TOC_NEW_OBJ_LIST | TOC_RAW_DATA);
        put_u32(&mut out, 4713);
        put_u64(&mut out, (meta.len() + raw.len()) as u64);
        put_u64(&mut out, meta.len() as u64);
        out.extend(meta);
        out.extend(raw);
        out
    }

    pub fn write(&self, path: &Path) -> PathBuf {
        fs::write(path, self.bytes()).unwrap();
        path.to_path_buf()
    }
}

/// Waveform `ch0` (0, 1, 2, ... volts, 1 ms increment) and plain `ch1`
/// (0, -1, -2, ... amps), 100 samples each.
pub fn waveform_fixture() -> Fixture<'static> {
    let samples = 100;
    Fixture::new()
        .channel(
            "ch0",
            (0..samples).map(|i| i as f64).collect(),
            vec![
                ("unit_string", Prop::Str("V")),
                ("wf_samples", Prop::UInt(samples as u64)),
                ("wf_start_time", Prop::StartTime),
                ("wf_start_offset", Prop::Float(0.0)),
                ("wf_increment", Prop::Float(0.001)),
            ],
        )
        .channel(
            "ch1",
            (0..samples).map(|i| -(i as f64)).collect(),
            vec![("unit_string", Prop::Str("A"))],
        )
}

/// Files in `dir` with the given extension, sorted by name.
pub fn files_with_extension(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == extension))
        .collect();
    files.sort();
    files
}

/// Header text and little-endian f64 payload of an `.npy` file.
pub fn read_npy(path: &Path) -> (String, Vec<f64>) {
    let bytes = fs::read(path).unwrap();
    assert_eq!(&bytes[..6], b"\x93NUMPY");
    let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
    let header = String::from_utf8(bytes[10..10 + header_len].to_vec()).unwrap();
    let values = bytes[10 + header_len..]
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes(c.try_into().unwrap()))
        .collect();
    (header, values)
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_str(out: &mut Vec<u8>, value: &str) {
    put_u32(out, value.len() as u32);
    out.extend_from_slice(value.as_bytes());
}

fn put_prop(out: &mut Vec<u8>, value: &Prop) {
    match value {
        Prop::Str(s) => {
            put_u32(out, TYPE_STRING);
            put_str(out, s);
        }
        Prop::UInt(v) => {
            put_u32(out, TYPE_U64);
            put_u64(out, *v);
        }
        Prop::Float(v) => {
            put_u32(out, TYPE_DOUBLE);
            out.extend_from_slice(&v.to_le_bytes());
        }
        Prop::StartTime => {
            put_u32(out, TYPE_TIMESTAMP);
            put_u64(out, 0);
            out.extend_from_slice(&START_SECONDS.to_le_bytes());
        }
    }
}
