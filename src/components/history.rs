use std::collections::VecDeque;
use std::sync::Arc;

use crate::canvas::PixelBuffer;
use crate::error::EditError;

// ============================================================================
// SNAPSHOT – immutable full-buffer copy
// ============================================================================

/// A frozen copy of the pixel buffer at one point of the edit history.
///
/// The bytes live behind an `Arc<[u8]>` and are never handed out mutably, so
/// restoring a snapshot always copies into the live buffer and can't alias it.
#[derive(Clone, Debug)]
pub struct HistorySnapshot {
    description: String,
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl HistorySnapshot {
    pub fn capture(buffer: &PixelBuffer, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            width: buffer.width(),
            height: buffer.height(),
            pixels: Arc::from(buffer.as_raw()),
        }
    }

    /// Copy this snapshot into `buffer`, adopting its dimensions.
    pub fn restore_into(&self, buffer: &mut PixelBuffer) {
        if !buffer.copy_from_raw(self.width, self.height, &self.pixels) {
            crate::log_err!(
                "HistorySnapshot: failed to restore '{}' ({}×{})",
                self.description,
                self.width,
                self.height
            );
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn memory_size(&self) -> usize {
        self.pixels.len()
    }
}

// ============================================================================
// HISTORY MANAGER – linear snapshot list with a cursor
// ============================================================================

/// Linear undo/redo history.
///
/// `cursor` is `None` before the first snapshot, otherwise the index of the
/// snapshot matching the live buffer. Pushing truncates everything after the
/// cursor, so no redo branch survives a new edit.
pub struct HistoryManager {
    snapshots: VecDeque<HistorySnapshot>,
    cursor: Option<usize>,
    /// Maximum retained snapshots, 0 = unlimited.
    max_history_size: usize,
    /// Running byte total across all snapshots.
    total_memory: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(0)
    }
}

impl HistoryManager {
    pub fn new(max_history_size: usize) -> Self {
        Self {
            snapshots: VecDeque::new(),
            cursor: None,
            max_history_size,
            total_memory: 0,
        }
    }

    /// Append `snapshot` after the cursor, dropping any redo targets, and move
    /// the cursor onto it.
    pub fn push(&mut self, snapshot: HistorySnapshot) {
        let keep = self.cursor.map_or(0, |c| c + 1);
        for dropped in self.snapshots.drain(keep..) {
            self.total_memory = self.total_memory.saturating_sub(dropped.memory_size());
        }

        self.total_memory += snapshot.memory_size();
        self.snapshots.push_back(snapshot);
        self.cursor = Some(self.snapshots.len() - 1);

        self.prune();
    }

    /// Move the cursor back one step and return the snapshot to restore.
    pub fn step_back(&mut self) -> Result<&HistorySnapshot, EditError> {
        match self.cursor {
            Some(c) if c > 0 => {
                self.cursor = Some(c - 1);
                Ok(&self.snapshots[c - 1])
            }
            _ => Err(EditError::EmptyHistory),
        }
    }

    /// Move the cursor forward one step and return the snapshot to restore.
    pub fn step_forward(&mut self) -> Result<&HistorySnapshot, EditError> {
        match self.cursor {
            Some(c) if c + 1 < self.snapshots.len() => {
                self.cursor = Some(c + 1);
                Ok(&self.snapshots[c + 1])
            }
            _ => Err(EditError::EmptyHistory),
        }
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(c) if c > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.cursor, Some(c) if c + 1 < self.snapshots.len())
    }

    /// Cursor as a signed index in `[-1, len - 1]`.
    pub fn cursor(&self) -> isize {
        self.cursor.map_or(-1, |c| c as isize)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// The snapshot the live buffer currently corresponds to.
    pub fn current(&self) -> Option<&HistorySnapshot> {
        self.cursor.and_then(|c| self.snapshots.get(c))
    }

    /// All snapshot labels, oldest first.
    pub fn descriptions(&self) -> Vec<String> {
        self.snapshots.iter().map(|s| s.description().to_string()).collect()
    }

    /// Bytes held by all snapshots (O(1) via cached total).
    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }

    /// Change the cap. Lowering it below the current length discards redo
    /// targets first, then the oldest snapshots; the snapshot under the
    /// cursor is always kept.
    pub fn set_max_history_size(&mut self, max: usize) {
        self.max_history_size = max;
        self.prune();
    }

    fn prune(&mut self) {
        if self.max_history_size == 0 || self.snapshots.len() <= self.max_history_size {
            return;
        }
        let Some(cursor) = self.cursor else { return };

        let redo_len = self.snapshots.len() - (cursor + 1);
        let excess = self.snapshots.len() - self.max_history_size;
        let drop_tail = redo_len.min(excess);
        let keep = self.snapshots.len() - drop_tail;
        for dropped in self.snapshots.drain(keep..) {
            self.total_memory = self.total_memory.saturating_sub(dropped.memory_size());
        }

        // Cursor is now the last entry; the front can go.
        let drop_front = self.snapshots.len().saturating_sub(self.max_history_size);
        for dropped in self.snapshots.drain(..drop_front) {
            self.total_memory = self.total_memory.saturating_sub(dropped.memory_size());
        }
        self.cursor = Some(cursor - drop_front);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn snap(value: u8) -> HistorySnapshot {
        let buf = PixelBuffer::new_filled(2, 2, Rgba([value, value, value, 255]));
        HistorySnapshot::capture(&buf, format!("fill {}", value))
    }

    #[test]
    fn starts_before_first_snapshot() {
        let h = HistoryManager::new(0);
        assert_eq!(h.cursor(), -1);
        assert!(!h.can_undo());
        assert!(!h.can_redo());
        assert!(h.current().is_none());
    }

    #[test]
    fn push_moves_cursor_to_end() {
        let mut h = HistoryManager::new(0);
        h.push(snap(1));
        h.push(snap(2));
        h.push(snap(3));
        assert_eq!(h.len(), 3);
        assert_eq!(h.cursor(), 2);
        assert!(h.can_undo());
        assert!(!h.can_redo());
    }

    #[test]
    fn cannot_step_back_past_first_snapshot() {
        let mut h = HistoryManager::new(0);
        h.push(snap(1));
        assert!(matches!(h.step_back(), Err(EditError::EmptyHistory)));
        assert_eq!(h.cursor(), 0);
    }

    #[test]
    fn push_after_undo_truncates_redo_branch() {
        let mut h = HistoryManager::new(0);
        h.push(snap(1));
        h.push(snap(2));
        h.push(snap(3));
        h.step_back().unwrap();
        h.step_back().unwrap();
        assert_eq!(h.cursor(), 0);

        h.push(snap(9));
        assert_eq!(h.len(), 2);
        assert_eq!(h.cursor(), 1);
        assert!(!h.can_redo());
        assert!(matches!(h.step_forward(), Err(EditError::EmptyHistory)));
        assert_eq!(h.descriptions(), vec!["fill 1", "fill 9"]);
    }

    #[test]
    fn step_back_and_forward_return_neighbours() {
        let mut h = HistoryManager::new(0);
        h.push(snap(1));
        h.push(snap(2));
        assert_eq!(h.step_back().unwrap().description(), "fill 1");
        assert_eq!(h.step_forward().unwrap().description(), "fill 2");
    }

    #[test]
    fn cap_drops_oldest_and_shifts_cursor() {
        let mut h = HistoryManager::new(2);
        h.push(snap(1));
        h.push(snap(2));
        h.push(snap(3));
        assert_eq!(h.len(), 2);
        assert_eq!(h.cursor(), 1);
        assert_eq!(h.descriptions(), vec!["fill 2", "fill 3"]);
        assert_eq!(h.memory_usage(), 2 * 16);
    }

    #[test]
    fn lowering_cap_after_undo_keeps_current_snapshot() {
        let mut h = HistoryManager::new(0);
        for v in 1..=5 {
            h.push(snap(v));
        }
        for _ in 0..3 {
            h.step_back().unwrap();
        }
        assert_eq!(h.current().unwrap().description(), "fill 2");

        h.set_max_history_size(2);
        assert_eq!(h.len(), 2);
        assert_eq!(h.current().unwrap().description(), "fill 2");
        assert_eq!(h.descriptions(), vec!["fill 1", "fill 2"]);
        assert!(!h.can_redo());
        assert_eq!(h.memory_usage(), 2 * 16);
    }

    #[test]
    fn lowering_cap_to_one_keeps_only_current() {
        let mut h = HistoryManager::new(0);
        for v in 1..=4 {
            h.push(snap(v));
        }
        h.step_back().unwrap();
        h.set_max_history_size(1);
        assert_eq!(h.cursor(), 0);
        assert_eq!(h.descriptions(), vec!["fill 3"]);
        assert!(!h.can_undo());
    }

    #[test]
    fn memory_tracks_truncation() {
        let mut h = HistoryManager::new(0);
        h.push(snap(1));
        h.push(snap(2));
        assert_eq!(h.memory_usage(), 32);
        h.step_back().unwrap();
        h.push(snap(3));
        assert_eq!(h.memory_usage(), 32);
    }

    #[test]
    fn restore_copies_instead_of_aliasing() {
        let original = PixelBuffer::new_filled(2, 2, Rgba([5, 5, 5, 255]));
        let snapshot = HistorySnapshot::capture(&original, "base");

        let mut live = PixelBuffer::new(1, 1);
        snapshot.restore_into(&mut live);
        assert_eq!(live, original);

        live.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        assert_eq!(&snapshot.pixels()[..4], &[5, 5, 5, 255]);
    }
}
