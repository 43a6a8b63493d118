//! Command handler modules for rels-cli.

pub mod ensure;
