use super::table::{ColumnMeta, ExtractedTable};
use crate::error::{Result, Tdms2xError};
use crate::tdms::{
    Channel, PropertyValue, TdmsFile, PROP_UNIT, PROP_WF_INCREMENT, PROP_WF_START_OFFSET,
    PROP_WF_START_TIME,
};
use chrono::Local;
use log::{debug, info};
use std::path::Path;

/// Open `path` and extract the selected channels of its first group.
pub fn extract_file<P: AsRef<Path>>(
    path: P,
    selection: &[usize],
    want_time_track: bool,
) -> Result<ExtractedTable> {
    let recording = TdmsFile::open(path.as_ref())?;
    extract(&recording, selection, want_time_track)
}

/// Build the output table from the first group of `recording`.
///
/// An empty `selection` picks every channel in natural order. The time
/// column is prepended only when asked for and channel 0 carries
/// `wf_increment`. Every selected channel must have the length of channel 0.
pub fn extract(
    recording: &TdmsFile,
    selection: &[usize],
    want_time_track: bool,
) -> Result<ExtractedTable> {
    let group = recording
        .groups()
        .first()
        .ok_or_else(|| Tdms2xError::NoGroups {
            path: recording.path.display().to_string(),
        })?;

    let channels = &group.channels;
    let reference = channels.first().ok_or_else(|| Tdms2xError::EmptyGroup {
        group: group.path.clone(),
    })?;

    if recording.groups().len() > 1 {
        debug!(
            "{} has {} groups, only {} is converted",
            recording.path.display(),
            recording.groups().len(),
            group.path
        );
    }

    let indexes: Vec<usize> = if selection.is_empty() {
        (0..channels.len()).collect()
    } else {
        selection.to_vec()
    };

    if let Some(&index) = indexes.iter().find(|&&i| i >= channels.len()) {
        return Err(Tdms2xError::ChannelIndexOutOfRange {
            index,
            count: channels.len(),
        });
    }

    let rows = reference.len();
    let mut table = ExtractedTable::new(rows);

    if want_time_track {
        match reference.time_track() {
            Some(track) => table.push_column(track, ColumnMeta::time()),
            None => debug!("{} has no wf_increment, time track skipped", reference.path),
        }
    }

    for index in indexes {
        let channel = &channels[index];
        if channel.len() != rows {
            return Err(Tdms2xError::ChannelLengthMismatch {
                channel: channel.path.clone(),
                expected: rows,
                actual: channel.len(),
            });
        }

        let meta = column_meta(channel, &recording.path)?;
        table.push_column(channel.data.clone(), meta);
    }

    info!(
        "Extracted {} rows x {} columns from {}",
        table.rows(),
        table.column_count(),
        recording.path.display()
    );

    Ok(table)
}

fn column_meta(channel: &Channel, file: &Path) -> Result<ColumnMeta> {
    let unit = channel.require_property(PROP_UNIT)?.to_string();
    let mut meta = ColumnMeta {
        name: channel.path.clone(),
        unit: Some(unit),
        start_time: None,
        start_offset: None,
        increment: None,
    };

    if channel.is_waveform() {
        let start = channel
            .require_property(PROP_WF_START_TIME)?
            .as_timestamp()
            .ok_or_else(|| wrong_type(channel, PROP_WF_START_TIME, file))?;
        meta.start_time = Some(start.with_timezone(&Local).fixed_offset());
        meta.start_offset = Some(number(channel, PROP_WF_START_OFFSET, file)?);
        meta.increment = Some(number(channel, PROP_WF_INCREMENT, file)?);
    }

    Ok(meta)
}

fn number(channel: &Channel, key: &str, file: &Path) -> Result<f64> {
    channel
        .require_property(key)?
        .as_f64()
        .ok_or_else(|| wrong_type(channel, key, file))
}

fn wrong_type(channel: &Channel, key: &str, file: &Path) -> Tdms2xError {
    let found = channel
        .property(key)
        .map(PropertyValue::to_string)
        .unwrap_or_default();
    Tdms2xError::Tdms {
        path: file.display().to_string(),
        message: format!("{} of {} has unexpected value '{}'", key, channel.path, found),
    }
}
