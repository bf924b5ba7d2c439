pub mod scripted_engine;
pub mod simulated_engine;
