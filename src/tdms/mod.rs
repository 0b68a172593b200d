//! Minimal reader for NI TDMS recordings.
//!
//! Only what the converter needs is decoded: root/group/channel properties
//! and numeric raw data, widened to `f64`. DAQmx raw data and string
//! channels are rejected.

mod reader;
mod types;

#[cfg(test)]
pub(crate) mod test_util;

pub use types::{DataType, Properties, PropertyValue};

use crate::error::{Tdms2xError, Result};
use std::path::{Path, PathBuf};

/// Property keys used by waveform channels.
pub const PROP_NAME: &str = "name";
pub const PROP_UNIT: &str = "unit_string";
pub const PROP_WF_SAMPLES: &str = "wf_samples";
pub const PROP_WF_START_TIME: &str = "wf_start_time";
pub const PROP_WF_START_OFFSET: &str = "wf_start_offset";
pub const PROP_WF_INCREMENT: &str = "wf_increment";

#[derive(Debug, Clone)]
pub struct Channel {
    pub path: String,
    pub name: String,
    pub data_type: DataType,
    pub properties: Properties,
    pub data: Vec<f64>,
}

impl Channel {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Like [`Channel::property`] but a missing key is a fault.
    pub fn require_property(&self, key: &str) -> Result<&PropertyValue> {
        self.properties
            .get(key)
            .ok_or_else(|| Tdms2xError::MissingProperty {
                channel: self.path.clone(),
                key: key.to_string(),
            })
    }

    pub fn is_waveform(&self) -> bool {
        self.properties.contains_key(PROP_WF_SAMPLES)
    }

    /// Elapsed time of every sample relative to the recording start.
    ///
    /// Returns `None` when the channel has no `wf_increment`.
    pub fn time_track(&self) -> Option<Vec<f64>> {
        let increment = self.property(PROP_WF_INCREMENT)?.as_f64()?;
        let offset = self
            .property(PROP_WF_START_OFFSET)
            .and_then(PropertyValue::as_f64)
            .unwrap_or(0.0);

        Some(
            (0..self.len())
                .map(|i| offset + increment * i as f64)
                .collect(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct Group {
    pub path: String,
    pub name: String,
    pub properties: Properties,
    pub channels: Vec<Channel>,
}

/// An opened recording, fully decoded into memory.
#[derive(Debug, Clone)]
pub struct TdmsFile {
    pub path: PathBuf,
    pub properties: Properties,
    pub groups: Vec<Group>,
}

impl TdmsFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, path)
    }

    pub fn from_bytes<P: AsRef<Path>>(bytes: &[u8], path: P) -> Result<Self> {
        let path = path.as_ref();
        let objects = reader::read_segments(bytes).map_err(|e| Tdms2xError::Tdms {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let mut file = TdmsFile {
            path: path.to_path_buf(),
            properties: Properties::new(),
            groups: Vec::new(),
        };

        for object in objects {
            let components = split_object_path(&object.path);
            match components.as_slice() {
                [] => file.properties.extend(object.properties),
                [group] => {
                    let group = file.group_entry(group);
                    group.properties.extend(object.properties);
                }
                [group, channel] => {
                    let data_type = object.data_type.unwrap_or(DataType::Void);
                    let channel = Channel {
                        path: object.path.clone(),
                        name: channel.clone(),
                        data_type,
                        properties: object.properties,
                        data: object.data,
                    };
                    file.group_entry(group).channels.push(channel);
                }
                _ => {
                    return Err(Tdms2xError::Tdms {
                        path: path.display().to_string(),
                        message: format!("invalid object path {}", object.path),
                    })
                }
            }
        }

        Ok(file)
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn root_name(&self) -> Option<&str> {
        self.properties.get(PROP_NAME).and_then(PropertyValue::as_str)
    }

    fn group_entry(&mut self, name: &str) -> &mut Group {
        let position = match self.groups.iter().position(|g| g.name == name) {
            Some(position) => position,
            None => {
                self.groups.push(Group {
                    path: format!("/'{}'", name.replace('\'', "''")),
                    name: name.to_string(),
                    properties: Properties::new(),
                    channels: Vec::new(),
                });
                self.groups.len() - 1
            }
        };
        &mut self.groups[position]
    }
}

/// Split a TDMS object path such as `/'Group'/'It''s'` into its unquoted
/// components. The root path `/` yields no components.
pub fn split_object_path(path: &str) -> Vec<String> {
    let mut components = Vec::new();
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '/' {
            continue;
        }
        if chars.peek() != Some(&'\'') {
            continue;
        }
        chars.next();

        let mut component = String::new();
        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    component.push('\'');
                } else {
                    break;
                }
            } else {
                component.push(c);
            }
        }
        components.push(component);
    }

    components
}
