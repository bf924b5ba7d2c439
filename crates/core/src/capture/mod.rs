pub mod capture_pipeline;
pub mod domain;
pub mod frame_ingest;
pub mod infrastructure;
