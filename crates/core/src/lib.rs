pub mod capture;
pub mod enrollment;
pub mod pipeline;
pub mod recognition;
pub mod shared;
