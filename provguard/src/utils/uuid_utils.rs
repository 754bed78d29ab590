//! UUID generation utilities.

use uuid::Uuid;

/// Generates a new UUID v4.
#[must_use]
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

/// Generates a new UUID v7 (time-ordered).
#[must_use]
pub fn generate_uuid_v7() -> Uuid {
    Uuid::now_v7()
}

/// Generates a short, time-ordered run id for log file names.
///
/// The first 12 hex digits of a v7 UUID encode the millisecond timestamp,
/// so run ids sort chronologically; the last 8 digits are random.
#[must_use]
pub fn generate_run_id() -> String {
    let hex = generate_uuid_v7().simple().to_string();
    format!("{}-{}", &hex[..12], &hex[24..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_versions() {
        assert_eq!(generate_uuid().get_version_num(), 4);
        assert_eq!(generate_uuid_v7().get_version_num(), 7);
    }

    #[test]
    fn test_run_id_shape() {
        let id = generate_run_id();
        assert_eq!(id.len(), 21);
        assert_eq!(id.as_bytes()[12], b'-');
        assert_ne!(generate_run_id(), generate_run_id());
    }
}
