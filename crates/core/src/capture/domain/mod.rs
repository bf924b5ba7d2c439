pub mod capture_authorizer;
pub mod capture_backend;
pub mod capture_device;
pub mod capture_error;
pub mod capture_state;
pub mod frame_gate;
pub mod frame_mailbox;
