//! Bounded record of dispatched command text.

use std::collections::VecDeque;

/// Default number of entries kept.
pub const HISTORY_CAPACITY: usize = 100;

/// Most-recent-last command history.
///
/// Every dispatch is recorded, including consecutive repeats.
#[derive(Debug, Clone)]
pub struct CommandHistory {
	entries: VecDeque<String>,
	capacity: usize,
	last: Option<String>,
}

impl CommandHistory {
	pub fn new(capacity: usize) -> Self {
		let capacity = capacity.max(1);
		Self {
			entries: VecDeque::with_capacity(capacity),
			capacity,
			last: None,
		}
	}

	pub fn record(&mut self, command: impl Into<String>) {
		let command = command.into();
		if self.entries.len() == self.capacity {
			self.entries.pop_front();
		}
		self.entries.push_back(command.clone());
		self.last = Some(command);
	}

	/// The command a "repeat" action would run again.
	pub fn last(&self) -> Option<&str> {
		self.last.as_deref()
	}

	pub fn entries(&self) -> Vec<String> {
		self.entries.iter().cloned().collect()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}
}

impl Default for CommandHistory {
	fn default() -> Self {
		Self::new(HISTORY_CAPACITY)
	}
}
