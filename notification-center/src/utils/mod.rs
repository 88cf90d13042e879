pub mod format;

pub use format::{format_timestamp, format_timestamp_in};
