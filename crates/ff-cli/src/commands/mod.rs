//! CLI subcommand implementations.

pub mod events;
pub mod fetch;
pub mod report;
pub mod turned_off;
pub mod util;
