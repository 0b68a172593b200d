use super::{keyed_columns, labels_match, TableWriter};
use crate::error::Result;
use crate::extractor::ExtractedTable;
use byteorder::{LittleEndian, WriteBytesExt};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const NPY_MAGIC: &[u8] = b"\x93NUMPY";
const HEADER_ALIGNMENT: usize = 64;
/// Key numpy gives the first positional array of an archive.
const POSITIONAL_KEY: &str = "arr_0";

/// Write a little-endian f64 array in NPY v1.0 layout, row-major.
pub fn write_npy<W: Write>(writer: &mut W, values: &[f64], shape: &[usize]) -> io::Result<()> {
    let header = npy_header(shape);

    writer.write_all(NPY_MAGIC)?;
    writer.write_all(&[1, 0])?;
    writer.write_u16::<LittleEndian>(header.len() as u16)?;
    writer.write_all(header.as_bytes())?;
    for &value in values {
        writer.write_f64::<LittleEndian>(value)?;
    }
    Ok(())
}

fn npy_header(shape: &[usize]) -> String {
    let shape = match shape {
        [n] => format!("({},)", n),
        dims => format!(
            "({})",
            dims.iter()
                .map(usize::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    };
    let mut header = format!(
        "{{'descr': '<f8', 'fortran_order': False, 'shape': {}, }}",
        shape
    );

    // magic + version + length field + header + newline ends on a 64 byte boundary
    let unpadded = NPY_MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (HEADER_ALIGNMENT - unpadded % HEADER_ALIGNMENT) % HEADER_ALIGNMENT;
    header.extend(std::iter::repeat(' ').take(padding));
    header.push('\n');
    header
}

/// Writes `.npy` arrays, or `.npz` archives when compression is on.
#[derive(Debug, Default)]
pub struct NpyWriter;

impl NpyWriter {
    fn save_npy(&self, path: &Path, values: &[f64], shape: &[usize]) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        write_npy(&mut writer, values, shape)?;
        writer.flush()?;
        Ok(())
    }

    fn save_npz(&self, path: &Path, members: &[(&str, &[f64], Vec<usize>)]) -> Result<()> {
        let mut zip = ZipWriter::new(BufWriter::new(File::create(path)?));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);

        for (key, values, shape) in members {
            zip.start_file(format!("{}.npy", key), options)?;
            write_npy(&mut zip, values, shape)?;
        }

        zip.finish()?.flush()?;
        Ok(())
    }
}

impl TableWriter for NpyWriter {
    fn write_single(
        &self,
        table: &ExtractedTable,
        path: &Path,
        labels: &[String],
        compress: bool,
    ) -> Result<Vec<PathBuf>> {
        if !compress {
            self.save_npy(
                path,
                &table.row_major(),
                &[table.rows(), table.column_count()],
            )?;
            return Ok(vec![path.to_path_buf()]);
        }

        let path = path.with_extension("npz");
        if labels_match(table, labels) {
            let members: Vec<_> = keyed_columns(table, labels)
                .into_iter()
                .map(|(label, column)| (label, column, vec![table.rows()]))
                .collect();
            self.save_npz(&path, &members)?;
        } else {
            let values = table.row_major();
            self.save_npz(
                &path,
                &[(
                    POSITIONAL_KEY,
                    values.as_slice(),
                    vec![table.rows(), table.column_count()],
                )],
            )?;
        }
        Ok(vec![path])
    }

    fn write_split(
        &self,
        table: &ExtractedTable,
        paths: &[PathBuf],
        labels: &[String],
        compress: bool,
    ) -> Result<Vec<PathBuf>> {
        let keyed = labels_match(table, labels);
        let mut written = Vec::with_capacity(paths.len());

        for (n, path) in paths.iter().enumerate() {
            let column = table.column(n);
            if compress {
                let path = path.with_extension("npz");
                let key = if keyed { labels[n].as_str() } else { POSITIONAL_KEY };
                self.save_npz(&path, &[(key, column, vec![table.rows()])])?;
                written.push(path);
            } else {
                self.save_npy(path, column, &[table.rows()])?;
                written.push(path.clone());
            }
        }

        Ok(written)
    }
}
