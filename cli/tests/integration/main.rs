//! Integration tests for the teectl CLI
//!
//! These tests spawn the actual binary and test end-to-end behavior that
//! needs no network: argument parsing, local config and key handling.

mod local_commands;
