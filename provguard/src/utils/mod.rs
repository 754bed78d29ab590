//! Utility functions for id generation and timestamp handling.

pub mod timestamps;
mod uuid_utils;

pub use timestamps::{format_iso8601, iso_timestamp, now_utc, Timestamp};
pub use uuid_utils::{generate_run_id, generate_uuid, generate_uuid_v7};
