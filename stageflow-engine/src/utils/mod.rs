//! Utility functions for id generation and timestamp handling.

pub mod timestamps;
mod ids;

pub use ids::{generate_timer_id, generate_uuid};
pub use timestamps::{iso_timestamp, now_utc, parse_iso8601, Timestamp};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_uuid_is_valid() {
        let id = generate_uuid();
        assert_eq!(id.get_version_num(), 4);
    }

    #[test]
    fn test_iso_timestamp_format() {
        let ts = iso_timestamp();
        assert!(ts.contains('T'));
        assert!(ts.ends_with("+00:00"));
    }
}
