pub mod analyses;
pub mod common_types;
pub mod import_columns;
pub mod import_rows;
pub mod imports;
pub mod transformations;

pub use common_types::*;
