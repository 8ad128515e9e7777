//! Bounded FIFO of recently emitted replies, for same-process de-duplication.

use std::collections::VecDeque;

/// Replies remembered for de-duplication
pub const RECENT_CAPACITY: usize = 12;

#[derive(Debug, Clone)]
pub struct RecentOutputBuffer {
    entries: VecDeque<String>,
    capacity: usize,
}

impl RecentOutputBuffer {
    pub fn new() -> Self {
        Self::with_capacity(RECENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn contains(&self, text: &str) -> bool {
        self.entries.iter().any(|e| e == text)
    }

    /// Append, evicting the oldest entry past capacity.
    pub fn push(&mut self, text: impl Into<String>) {
        self.entries.push_back(text.into());
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

impl Default for RecentOutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_exceeds_capacity() {
        let mut buf = RecentOutputBuffer::new();
        for i in 0..40 {
            buf.push(format!("reply {}", i));
            assert!(buf.len() <= RECENT_CAPACITY);
        }
        assert_eq!(buf.len(), RECENT_CAPACITY);
    }

    #[test]
    fn test_evicts_oldest_first() {
        let mut buf = RecentOutputBuffer::new();
        for i in 0..13 {
            buf.push(format!("reply {}", i));
        }
        assert!(!buf.contains("reply 0"));
        assert!(buf.contains("reply 1"));
        assert!(buf.contains("reply 12"));
        assert_eq!(buf.iter().next(), Some("reply 1"));
    }
}
