//! CLI subcommand implementations for the m3u8-finder binary.

pub mod crawl_cmd;
pub mod doctor;
pub mod output;
pub mod sniff_cmd;
pub mod verify_cmd;
