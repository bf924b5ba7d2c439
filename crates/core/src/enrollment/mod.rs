pub mod domain;
pub mod enrollment_controller;
