pub mod headers;
pub mod temp_file;
