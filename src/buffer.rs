use std::collections::VecDeque;

use crate::error::BufferError;
use crate::models::PictureReport;

/// Fixed-capacity FIFO of pending reports.
///
/// Pushing into a full buffer evicts the oldest report so capture never waits
/// on delivery. The evicted report is handed back to the caller for logging
/// and archiving.
#[derive(Debug, Clone)]
pub struct ReportBuffer {
    records: VecDeque<PictureReport>,
    capacity: usize,
}

impl ReportBuffer {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, record: PictureReport) -> Option<PictureReport> {
        let evicted = if self.is_full() {
            self.records.pop_front()
        } else {
            None
        };
        self.records.push_back(record);
        evicted
    }

    pub fn peek(&self) -> Result<&PictureReport, BufferError> {
        self.records.front().ok_or(BufferError::Empty)
    }

    pub fn pop(&mut self) -> Result<PictureReport, BufferError> {
        self.records.pop_front().ok_or(BufferError::Empty)
    }

    pub fn is_full(&self) -> bool {
        self.records.len() == self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &PictureReport> {
        self.records.iter()
    }
}
