// Main library entry point for the man page toolchain.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;
