//! Identifier generation.

use uuid::Uuid;

/// Generates a new UUID v4.
#[must_use]
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

/// Generates a timer identifier.
///
/// Ids are prefixed so they are recognisable in logs and serialized
/// timer state.
#[must_use]
pub fn generate_timer_id() -> String {
    format!("timer-{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_ids_are_unique() {
        let a = generate_timer_id();
        let b = generate_timer_id();
        assert_ne!(a, b);
        assert!(a.starts_with("timer-"));
    }
}
