// Monotonic identifier counter that splits id space into remote and local ranges.
use crate::core::error::{Error, ErrorKind};
use crate::core::post::DEFAULT_BOUNDARY;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IdAllocator {
    boundary: u64,
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::with_boundary(DEFAULT_BOUNDARY)
    }

    pub fn with_boundary(boundary: u64) -> Self {
        Self {
            boundary,
            next: boundary,
        }
    }

    pub fn boundary(&self) -> u64 {
        self.boundary
    }

    /// Highest id handed out so far (or the boundary when none has been).
    pub fn next(&self) -> u64 {
        self.next
    }

    /// The id the next `allocate` will return, or `Corrupt` once the id space is spent.
    pub fn peek(&self) -> Result<u64, Error> {
        self.next.checked_add(1).ok_or_else(|| {
            Error::new(ErrorKind::Corrupt)
                .with_message(format!("id counter {} cannot be advanced", self.next))
        })
    }

    pub fn allocate(&mut self) -> Result<u64, Error> {
        self.next = self.peek()?;
        Ok(self.next)
    }

    /// Missing counters fall back to the boundary; the counter never drops below it.
    pub fn restore(&mut self, counter: Option<u64>) {
        self.next = counter.unwrap_or(self.boundary).max(self.boundary);
    }

    /// Raise the counter to at least `id` so later allocations skip it.
    pub fn observe(&mut self, id: u64) -> bool {
        if id > self.next {
            self.next = id;
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.next = self.boundary;
    }

    pub fn is_local_range(&self, id: u64) -> bool {
        id > self.boundary
    }

    pub fn is_valid_range(&self, id: u64) -> bool {
        (1..=self.next).contains(&id)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
