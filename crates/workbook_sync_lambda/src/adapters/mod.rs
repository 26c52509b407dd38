pub mod honeycode;
pub mod object_store;
pub mod s3;
pub mod workbook_store;
