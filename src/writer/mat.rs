use super::{keyed_columns, TableWriter};
use crate::error::{Result, Tdms2xError};
use crate::extractor::ExtractedTable;
use byteorder::{LittleEndian, WriteBytesExt};
use chrono::Local;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

const HEADER_TEXT_SIZE: usize = 116;
const MAT_VERSION: u16 = 0x0100;

const MI_INT8: u32 = 1;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_DOUBLE: u32 = 9;
const MI_MATRIX: u32 = 14;
const MI_COMPRESSED: u32 = 15;

const MX_DOUBLE_CLASS: u32 = 6;

/// Writes MATLAB level 5 MAT files. Every column becomes a `1xN` double
/// variable named after its label.
#[derive(Debug, Default)]
pub struct MatWriter;

impl MatWriter {
    fn save(&self, path: &Path, variables: &[(&str, &[f64])], compress: bool) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        write_header(&mut writer)?;
        for (name, values) in variables {
            write_variable(&mut writer, name, values, compress)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl TableWriter for MatWriter {
    fn validate(&self, table: &ExtractedTable, labels: &[String]) -> Result<()> {
        if labels.len() != table.column_count() {
            return Err(Tdms2xError::LabelCountMismatch {
                labels: labels.len(),
                columns: table.column_count(),
            });
        }
        Ok(())
    }

    fn write_single(
        &self,
        table: &ExtractedTable,
        path: &Path,
        labels: &[String],
        compress: bool,
    ) -> Result<Vec<PathBuf>> {
        self.validate(table, labels)?;
        self.save(path, &keyed_columns(table, labels), compress)?;
        Ok(vec![path.to_path_buf()])
    }

    fn write_split(
        &self,
        table: &ExtractedTable,
        paths: &[PathBuf],
        labels: &[String],
        compress: bool,
    ) -> Result<Vec<PathBuf>> {
        self.validate(table, labels)?;
        for (n, path) in paths.iter().enumerate() {
            self.save(path, &[(labels[n].as_str(), table.column(n))], compress)?;
        }
        Ok(paths.to_vec())
    }
}

/// 128 byte file header: descriptive text, subsystem offset, version and
/// the `IM` endian indicator.
fn write_header<W: Write>(writer: &mut W) -> io::Result<()> {
    let text = format!(
        "MATLAB 5.0 MAT-file Platform: {}, Created on: {}",
        std::env::consts::OS,
        Local::now().format("%a %b %e %H:%M:%S %Y")
    );
    let mut header = text.into_bytes();
    header.resize(HEADER_TEXT_SIZE, b' ');

    writer.write_all(&header)?;
    writer.write_all(&[0u8; 8])?;
    writer.write_u16::<LittleEndian>(MAT_VERSION)?;
    writer.write_all(b"IM")?;
    Ok(())
}

fn write_variable<W: Write>(writer: &mut W, name: &str, values: &[f64], compress: bool) -> io::Result<()> {
    let element = matrix_element(name, values)?;
    if !compress {
        return writer.write_all(&element);
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&element)?;
    let compressed = encoder.finish()?;

    write_tag(writer, MI_COMPRESSED, compressed.len())?;
    writer.write_all(&compressed)
}

/// miMATRIX element holding a real `1 x len` double array.
fn matrix_element(name: &str, values: &[f64]) -> io::Result<Vec<u8>> {
    let mut body = Vec::new();

    write_tag(&mut body, MI_UINT32, 8)?;
    body.write_u32::<LittleEndian>(MX_DOUBLE_CLASS)?;
    body.write_u32::<LittleEndian>(0)?;

    write_tag(&mut body, MI_INT32, 8)?;
    body.write_i32::<LittleEndian>(1)?;
    body.write_i32::<LittleEndian>(values.len() as i32)?;

    write_tag(&mut body, MI_INT8, name.len())?;
    body.write_all(name.as_bytes())?;
    pad_to_eight(&mut body);

    write_tag(&mut body, MI_DOUBLE, values.len() * 8)?;
    for &value in values {
        body.write_f64::<LittleEndian>(value)?;
    }

    let mut element = Vec::with_capacity(body.len() + 8);
    write_tag(&mut element, MI_MATRIX, body.len())?;
    element.extend(body);
    Ok(element)
}

fn write_tag<W: Write>(writer: &mut W, data_type: u32, size: usize) -> io::Result<()> {
    writer.write_u32::<LittleEndian>(data_type)?;
    writer.write_u32::<LittleEndian>(size as u32)
}

fn pad_to_eight(buffer: &mut Vec<u8>) {
    let padding = (8 - buffer.len() % 8) % 8;
    buffer.resize(buffer.len() + padding, 0);
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{labels, sample_table};
    use super::*;
    use byteorder::ReadBytesExt;
    use flate2::read::ZlibDecoder;
    use std::io::{Cursor, Read};
    use tempfile::TempDir;

    /// Minimal reader for what `MatWriter` produces: (name, values) pairs.
    fn read_variables(bytes: &[u8]) -> Vec<(String, Vec<f64>)> {
        assert!(bytes.starts_with(b"MATLAB 5.0 MAT-file"));
        assert_eq!(&bytes[126..128], b"IM");

        let mut variables = Vec::new();
        let mut cursor = Cursor::new(&bytes[128..]);
        while let Ok(data_type) = cursor.read_u32::<LittleEndian>() {
            let size = cursor.read_u32::<LittleEndian>().unwrap() as usize;
            let mut payload = vec![0u8; size];
            cursor.read_exact(&mut payload).unwrap();

            let matrix = if data_type == MI_COMPRESSED {
                let mut inflated = Vec::new();
                ZlibDecoder::new(&payload[..]).read_to_end(&mut inflated).unwrap();
                inflated[8..].to_vec()
            } else {
                assert_eq!(data_type, MI_MATRIX);
                payload
            };
            variables.push(parse_matrix(&matrix));
        }
        variables
    }

    fn next_element(cursor: &mut Cursor<&[u8]>) -> (u32, Vec<u8>) {
        let data_type = cursor.read_u32::<LittleEndian>().unwrap();
        let size = cursor.read_u32::<LittleEndian>().unwrap() as usize;
        let mut data = vec![0u8; size];
        cursor.read_exact(&mut data).unwrap();
        let position = cursor.position() as usize;
        cursor.set_position(((position + 7) / 8 * 8) as u64);
        (data_type, data)
    }

    fn parse_matrix(body: &[u8]) -> (String, Vec<f64>) {
        let mut cursor = Cursor::new(body);

        let (flags_type, flags) = next_element(&mut cursor);
        assert_eq!(flags_type, MI_UINT32);
        assert_eq!(flags[0] as u32, MX_DOUBLE_CLASS);

        let (dims_type, dims) = next_element(&mut cursor);
        assert_eq!(dims_type, MI_INT32);
        assert_eq!(i32::from_le_bytes(dims[0..4].try_into().unwrap()), 1);

        let (_, name) = next_element(&mut cursor);
        let (data_type, data) = next_element(&mut cursor);
        assert_eq!(data_type, MI_DOUBLE);
        let values = data
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes(c.try_into().unwrap()))
            .collect();
        (String::from_utf8(name).unwrap(), values)
    }

    #[test]
    fn test_single_file_one_variable_per_label() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mat");
        MatWriter
            .write_single(&sample_table(3), &path, &labels(&["t", "volt", "amp"]), false)
            .unwrap();

        let variables = read_variables(&std::fs::read(&path).unwrap());
        assert_eq!(variables.len(), 3);
        assert_eq!(variables[0], ("t".to_string(), vec![0.0, 0.5, 1.0]));
        assert_eq!(variables[1], ("volt".to_string(), vec![0.0, 1.0, 2.0]));
        assert_eq!(variables[2].0, "amp");
    }

    #[test]
    fn test_compressed_elements() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mat");
        MatWriter
            .write_single(&sample_table(50), &path, &labels(&["t", "volt", "amp"]), true)
            .unwrap();

        let variables = read_variables(&std::fs::read(&path).unwrap());
        assert_eq!(variables.len(), 3);
        assert_eq!(variables[2].1[49], -49.0);
    }

    #[test]
    fn test_split_files() {
        let dir = TempDir::new().unwrap();
        let paths: Vec<PathBuf> = ["t", "a", "b"]
            .iter()
            .map(|n| dir.path().join(format!("out-{}.mat", n)))
            .collect();
        let written = MatWriter
            .write_split(&sample_table(2), &paths, &labels(&["t", "a", "b"]), false)
            .unwrap();

        assert_eq!(written, paths);
        let variables = read_variables(&std::fs::read(&paths[1]).unwrap());
        assert_eq!(variables, vec![("a".to_string(), vec![0.0, 1.0])]);
    }

    #[test]
    fn test_label_count_mismatch_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mat");
        let err = MatWriter
            .write_single(&sample_table(3), &path, &labels(&["t", "volt"]), false)
            .unwrap_err();

        assert!(matches!(
            err,
            Tdms2xError::LabelCountMismatch {
                labels: 2,
                columns: 3
            }
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_duplicate_labels_keep_last_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mat");
        MatWriter
            .write_single(&sample_table(3), &path, &labels(&["time", "volt", "time"]), false)
            .unwrap();

        let variables = read_variables(&std::fs::read(&path).unwrap());
        assert_eq!(
            variables,
            vec![
                ("time".to_string(), vec![0.0, -1.0, -2.0]),
                ("volt".to_string(), vec![0.0, 1.0, 2.0]),
            ]
        );
    }
}
