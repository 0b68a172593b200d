use crate::error::{Result, Tdms2xError};
use crate::tdms::TdmsFile;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

pub const SIDECAR_EXTENSION: &str = "info";

/// Render the meta info of a recording: root name, then every group and
/// channel with its data type, length and properties.
pub fn describe(recording: &TdmsFile, path: &Path) -> String {
    let mut info = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(info, ">>> TDMS file \"{}\" info:", path.display());
    let _ = writeln!(
        info,
        "  - root name: {}",
        recording.root_name().unwrap_or("(none)")
    );

    for (m, group) in recording.groups().iter().enumerate() {
        let _ = writeln!(info, "\tGroup #{}: {}", m + 1, group.path);
        for (n, channel) in group.channels.iter().enumerate() {
            let _ = writeln!(info, "\t  - Channel #{}: {}", n + 1, channel.path);
            let _ = writeln!(info, "\t\tdata_type: {}", channel.data_type);
            let _ = writeln!(info, "\t\tlength: {}", channel.len());
            for (name, value) in channel.properties.iter() {
                let _ = writeln!(info, "\t\t{}: {}", name, value);
            }
            info.push('\n');
        }
    }

    info
}

/// `{stem}.info`, next to the source unless `output_dir` is given.
pub fn sidecar_path(source: &Path, output_dir: Option<&Path>) -> PathBuf {
    let dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => source.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    dir.join(format!("{}.{}", stem, SIDECAR_EXTENSION))
}

/// Write the meta info sidecar for `source`. Any failure is a `MetaSave` fault.
pub fn save_meta_info(source: &Path, output_dir: Option<&Path>) -> Result<PathBuf> {
    let target = sidecar_path(source, output_dir);
    let meta_save = |message: String| Tdms2xError::MetaSave {
        path: source.display().to_string(),
        message,
    };

    let recording = TdmsFile::open(source).map_err(|e| meta_save(e.to_string()))?;
    fs::write(&target, describe(&recording, source)).map_err(|e| meta_save(e.to_string()))?;

    Ok(target)
}
