use crate::melt::types::SurrogateId;
use std::num::NonZeroU64;

/// Hands out surrogate ids: 1, 2, 3, ... for the lifetime of one run.
#[derive(Debug)]
pub struct IdAllocator {
    next: NonZeroU64,
}

impl IdAllocator {
    pub fn new() -> Self {
        IdAllocator {
            next: NonZeroU64::MIN,
        }
    }

    pub fn next_id(&mut self) -> SurrogateId {
        let id = self.next;
        self.next = id.saturating_add(1);
        SurrogateId::new(id)
    }

    /// Number of ids issued so far, which is also the largest one.
    pub fn issued(&self) -> u64 {
        self.next.get() - 1
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        IdAllocator::new()
    }
}
