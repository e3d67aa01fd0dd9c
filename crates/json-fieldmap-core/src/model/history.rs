//! Bounded undo/redo over config snapshots.

use std::collections::VecDeque;

use super::MappingConfig;

/// Default number of undo steps retained.
pub const DEFAULT_CAPACITY: usize = 50;

/// Current config plus the snapshots needed to step backwards and forwards.
///
/// Because configs are immutable values, every edit simply pushes the
/// previous snapshot. The oldest snapshot is dropped once `capacity` is hit.
#[derive(Debug, Clone)]
pub struct EditHistory {
    current: MappingConfig,
    undo: VecDeque<MappingConfig>,
    redo: Vec<MappingConfig>,
    capacity: usize,
}

impl EditHistory {
    pub fn new(initial: MappingConfig) -> Self {
        Self::with_capacity(initial, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(initial: MappingConfig, capacity: usize) -> Self {
        Self {
            current: initial,
            undo: VecDeque::new(),
            redo: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn current(&self) -> &MappingConfig {
        &self.current
    }

    /// Make `next` current. Pushing a config equal to the current one is a
    /// no-op; any other push clears the redo stack.
    pub fn push(&mut self, next: MappingConfig) {
        if next == self.current {
            return;
        }
        let previous = std::mem::replace(&mut self.current, next);
        self.undo.push_back(previous);
        if self.undo.len() > self.capacity {
            self.undo.pop_front();
        }
        self.redo.clear();
    }

    /// Apply an edit to the current config and record it.
    pub fn apply<E>(
        &mut self,
        edit: impl FnOnce(&MappingConfig) -> Result<MappingConfig, E>,
    ) -> Result<&MappingConfig, E> {
        let next = edit(&self.current)?;
        self.push(next);
        Ok(&self.current)
    }

    pub fn undo(&mut self) -> Option<&MappingConfig> {
        let previous = self.undo.pop_back()?;
        let current = std::mem::replace(&mut self.current, previous);
        self.redo.push(current);
        Some(&self.current)
    }

    pub fn redo(&mut self) -> Option<&MappingConfig> {
        let next = self.redo.pop()?;
        let current = std::mem::replace(&mut self.current, next);
        self.undo.push_back(current);
        Some(&self.current)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
}
