use std::sync::atomic::{AtomicU8, Ordering};

/// Wrapping allocator for outbound session ids.
///
/// Session ids only need to be distinct among a sender's messages that can
/// be in flight at the same time, so a wrapping counter suffices: reuse
/// happens after 256 messages.
#[derive(Debug, Default)]
pub struct SessionIdGenerator {
    next: AtomicU8,
}

impl SessionIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting from `first`.
    pub fn starting_at(first: u8) -> Self {
        Self {
            next: AtomicU8::new(first),
        }
    }

    /// Allocate the next id, wrapping from 255 back to 0.
    #[inline]
    pub fn next_id(&self) -> u8 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids() {
        let ids = SessionIdGenerator::new();
        assert_eq!(ids.next_id(), 0);
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
    }

    #[test]
    fn test_wraps_around() {
        let ids = SessionIdGenerator::starting_at(255);
        assert_eq!(ids.next_id(), 255);
        assert_eq!(ids.next_id(), 0);
    }
}
