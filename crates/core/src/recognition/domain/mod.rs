pub mod recognition_engine;
pub mod recognition_result;
