//! Installer test suite entry point.

mod fixture;
mod fetch_rules;
