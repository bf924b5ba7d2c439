pub mod pipeline_logger;
pub mod recognition_loop;
