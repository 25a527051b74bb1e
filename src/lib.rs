pub mod capture;
pub mod configuration;
pub mod controller;
pub mod decoding;
pub mod error_handling;
pub mod metrics;
