pub mod channel_extractor;
pub mod metainfo;
pub mod table;

pub use channel_extractor::{extract, extract_file};
pub use metainfo::{describe, save_meta_info, sidecar_path};
pub use table::{ColumnMeta, ExtractedTable, TIME_COLUMN};
