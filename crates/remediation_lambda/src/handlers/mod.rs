pub mod alert;
pub mod batch;
pub mod teardown;
