use crate::config::ScanConfig;
use regex::Regex;
use std::path::Path;

pub struct FileFilter {
    extension: String,
    exclude_dirs: Vec<String>,
    exclude_patterns: Vec<Regex>,
}

impl FileFilter {
    pub fn new(config: &ScanConfig) -> Self {
        let exclude_patterns = config
            .exclude_patterns
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect();

        Self {
            extension: config.extension.trim_start_matches('.').to_lowercase(),
            exclude_dirs: config.exclude_dirs.clone(),
            exclude_patterns,
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Source files match the configured extension in any letter case and no
    /// exclude pattern.
    pub fn is_source_file(&self, path: &Path) -> bool {
        let matches_extension = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.to_lowercase() == self.extension);

        matches_extension && !self.matches_any_pattern(&path.to_string_lossy())
    }

    pub fn should_traverse_directory(&self, path: &Path) -> bool {
        let Some(dir_name) = path.file_name().and_then(|s| s.to_str()) else {
            return true;
        };
        let dir_name_lower = dir_name.to_lowercase();

        if self
            .exclude_dirs
            .iter()
            .any(|exclude| exclude.to_lowercase() == dir_name_lower)
        {
            return false;
        }

        if self.matches_any_pattern(&path.to_string_lossy()) {
            return false;
        }

        // hidden directories
        !(dir_name.starts_with('.') && dir_name != "." && dir_name != "..")
    }

    pub fn matches_any_pattern(&self, text: &str) -> bool {
        self.exclude_patterns
            .iter()
            .any(|pattern| pattern.is_match(text))
    }
}

impl Default for FileFilter {
    fn default() -> Self {
        Self::new(&ScanConfig::default())
    }
}
