pub mod column_types;
pub mod fix_service;
pub mod import_service;
pub mod ingest_service;
pub mod materialize_service;
pub mod profile_service;
pub mod quality_service;
pub mod suggest_service;

pub use fix_service::FixService;
pub use import_service::ImportService;
pub use ingest_service::IngestService;
pub use materialize_service::MaterializeService;
pub use profile_service::ProfileService;
pub use quality_service::QualityService;
