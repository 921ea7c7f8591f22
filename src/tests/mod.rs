// Test modules

mod capture_service_test;
pub mod common;
