pub mod csv_import;
pub mod export;
pub mod import_job;
pub mod resolver;
pub mod stream_import;
pub mod writer;
