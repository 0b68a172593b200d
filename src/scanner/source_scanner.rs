use crate::config::ScanConfig;
use crate::error::{Result, Tdms2xError};
use crate::scanner::file_filter::FileFilter;
use log::warn;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the scanned root, the file name for a single file.
    pub relative_path: PathBuf,
    pub size: u64,
}

impl SourceFile {
    pub fn display_path(&self) -> String {
        self.relative_path.display().to_string()
    }
}

pub struct SourceScanner {
    filter: FileFilter,
    max_depth: usize,
}

impl SourceScanner {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            filter: FileFilter::new(config),
            max_depth: config.max_depth,
        }
    }

    /// Resolve an input path to the ordered list of source files: the file
    /// itself, or every matching file below a directory sorted by path.
    pub fn resolve<P: AsRef<Path>>(&self, input: P) -> Result<Vec<SourceFile>> {
        let input = input.as_ref();

        if !input.exists() {
            return Err(Tdms2xError::InvalidPath {
                path: format!("{} does not exist", input.display()),
            });
        }

        if input.is_dir() {
            return self.scan_directory(input);
        }

        if !input.is_file() {
            return Err(Tdms2xError::InvalidPath {
                path: format!("{} is not a file or folder", input.display()),
            });
        }

        if !self.filter.is_source_file(input) {
            return Err(Tdms2xError::InvalidPath {
                path: format!(
                    "{} is not a .{} file",
                    input.display(),
                    self.filter.extension()
                ),
            });
        }

        let size = input.metadata()?.len();
        Ok(vec![SourceFile {
            path: input.to_path_buf(),
            relative_path: input
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| input.to_path_buf()),
            size,
        }])
    }

    pub fn scan_directory<P: AsRef<Path>>(&self, root: P) -> Result<Vec<SourceFile>> {
        let root_path = root.as_ref();

        if !root_path.is_dir() {
            return Err(Tdms2xError::InvalidPath {
                path: format!("{} is not a directory", root_path.display()),
            });
        }

        let mut sources = Vec::new();

        let walker = WalkDir::new(root_path)
            .max_depth(self.max_depth)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| self.should_traverse(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Scan error: {}", err);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.filter.is_source_file(entry.path()) {
                continue;
            }

            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(err) => {
                    warn!("Cannot read metadata of {}: {}", entry.path().display(), err);
                    continue;
                }
            };

            let relative_path = entry
                .path()
                .strip_prefix(root_path)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| entry.path().to_path_buf());

            sources.push(SourceFile {
                path: entry.path().to_path_buf(),
                relative_path,
                size,
            });
        }

        if sources.is_empty() {
            return Err(Tdms2xError::NoSourceFiles {
                path: root_path.display().to_string(),
                extension: self.filter.extension().to_string(),
            });
        }

        sources.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        Ok(sources)
    }

    fn should_traverse(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        self.filter.should_traverse_directory(entry.path())
    }

    pub fn get_statistics(&self, sources: &[SourceFile]) -> ScanStatistics {
        let (largest_file_size, largest_file_path) = sources
            .iter()
            .max_by_key(|s| s.size)
            .map(|s| (s.size, s.relative_path.clone()))
            .unwrap_or((0, PathBuf::new()));

        ScanStatistics {
            total_files: sources.len(),
            total_size: sources.iter().map(|s| s.size).sum(),
            largest_file_size,
            largest_file_path,
        }
    }
}

#[derive(Debug, Default)]
pub struct ScanStatistics {
    pub total_files: usize,
    pub total_size: u64,
    pub largest_file_size: u64,
    pub largest_file_path: PathBuf,
}

impl ScanStatistics {
    pub fn display_summary(&self) -> String {
        let mut summary = format!(
            "Scan Results:\n  Total files: {}\n  Total size: {}\n",
            self.total_files,
            format_bytes(self.total_size)
        );

        if self.largest_file_size > 0 {
            summary.push_str(&format!(
                "  Largest file: {} ({})\n",
                self.largest_file_path.display(),
                format_bytes(self.largest_file_size)
            ));
        }

        summary
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
