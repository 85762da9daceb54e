//! Replicated undo history.
//!
//! One snapshot is recorded per completed stroke. Undo pops the newest
//! snapshot and repaints from the one below it, then the whole remaining
//! list is replicated rather than a delta, so a peer that missed an earlier
//! undo converges on the next one. Reordered deliveries resolve as last
//! write wins.

use crate::snapshot::{self, CodecError, SurfaceSnapshot};
use crate::surface::Surface;

/// Result of installing a history received from another peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaceReport {
    /// Entries that decoded and were kept.
    pub accepted: usize,
    /// Entries that failed to decode and were skipped.
    pub rejected: usize,
}

/// Ordered surface snapshots, oldest first. The last entry is the current
/// surface; an empty history means an empty surface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndoHistory {
    entries: Vec<SurfaceSnapshot>,
}

impl UndoHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SurfaceSnapshot] {
        &self.entries
    }

    /// Capture the surface and append it. Returns the new length.
    pub fn record<S: Surface + ?Sized>(&mut self, surface: &S) -> Result<usize, CodecError> {
        let snapshot = snapshot::encode(&surface.get_image_data())?;
        self.entries.push(snapshot);
        Ok(self.entries.len())
    }

    /// Drop the newest snapshot and repaint from the one before it.
    ///
    /// Returns the full remaining history to replicate, or `None` when there
    /// was nothing to undo.
    pub fn undo<S: Surface + ?Sized>(&mut self, surface: &mut S) -> Option<Vec<SurfaceSnapshot>> {
        self.entries.pop()?;
        self.repaint(surface);
        Some(self.entries.clone())
    }

    /// Empty the history and the surface.
    pub fn clear<S: Surface + ?Sized>(&mut self, surface: &mut S) {
        self.entries.clear();
        surface.clear();
    }

    /// Install a history received from another peer.
    ///
    /// Each entry is decoded on its own; entries that fail are reported and
    /// skipped, and whatever decodes becomes the local history.
    pub fn replace_from_remote<S: Surface + ?Sized>(
        &mut self,
        entries: Vec<SurfaceSnapshot>,
        surface: &mut S,
    ) -> ReplaceReport {
        let mut report = ReplaceReport::default();
        let mut kept = Vec::with_capacity(entries.len());
        let mut last_image = None;

        for (index, entry) in entries.into_iter().enumerate() {
            match snapshot::decode(&entry) {
                Ok(image) => {
                    report.accepted += 1;
                    last_image = Some(image);
                    kept.push(entry);
                }
                Err(e) => {
                    report.rejected += 1;
                    log::warn!("Skipping undo history entry {}: {}", index, e);
                }
            }
        }

        self.entries = kept;
        surface.clear();
        if let Some(image) = last_image {
            surface.put_image_data(&image);
        }
        report
    }

    fn repaint<S: Surface + ?Sized>(&self, surface: &mut S) {
        surface.clear();
        let Some(current) = self.entries.last() else {
            return;
        };
        match snapshot::decode(current) {
            Ok(image) => surface.put_image_data(&image),
            Err(e) => log::warn!("Failed to repaint from history: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{ImageData, RasterSurface};
    use kurbo::Point;

    fn draw_line(surface: &mut RasterSurface, y: f64) {
        surface.set_line_width(2.0);
        surface.begin_path();
        surface.move_to(Point::new(0.0, y));
        surface.line_to(Point::new(20.0, y));
        surface.stroke();
    }

    #[test]
    fn test_undo_on_empty_is_noop() {
        let mut history = UndoHistory::new();
        let mut surface = RasterSurface::new(20, 20);
        assert!(history.undo(&mut surface).is_none());
        assert!(history.is_empty());
    }

    #[test]
    fn test_undo_restores_previous_snapshot() {
        let mut history = UndoHistory::new();
        let mut surface = RasterSurface::new(20, 20);
        let mut recorded = Vec::new();

        for y in [3.0, 8.0, 13.0, 18.0] {
            draw_line(&mut surface, y);
            history.record(&surface).unwrap();
            recorded.push(surface.get_image_data());
        }

        for expected_len in (0..4).rev() {
            let replicated = history.undo(&mut surface).unwrap();
            assert_eq!(history.len(), expected_len);
            assert_eq!(replicated.len(), expected_len);
            let expected = if expected_len == 0 {
                ImageData::blank(20, 20)
            } else {
                recorded[expected_len - 1].clone()
            };
            assert_eq!(surface.get_image_data(), expected);
        }
        assert!(history.undo(&mut surface).is_none());
    }

    #[test]
    fn test_clear_empties_history_and_surface() {
        let mut history = UndoHistory::new();
        let mut surface = RasterSurface::new(20, 20);
        draw_line(&mut surface, 5.0);
        history.record(&surface).unwrap();
        history.clear(&mut surface);
        assert!(history.is_empty());
        assert!(surface.image().is_blank());
    }

    #[test]
    fn test_replace_keeps_decodable_entries() {
        let mut source = UndoHistory::new();
        let mut drawn = RasterSurface::new(20, 20);
        draw_line(&mut drawn, 4.0);
        source.record(&drawn).unwrap();
        draw_line(&mut drawn, 12.0);
        source.record(&drawn).unwrap();

        let mut entries = source.entries().to_vec();
        entries.insert(1, SurfaceSnapshot::from_encoded("garbage"));

        let mut history = UndoHistory::new();
        let mut surface = RasterSurface::new(20, 20);
        let report = history.replace_from_remote(entries, &mut surface);

        assert_eq!(report, ReplaceReport { accepted: 2, rejected: 1 });
        assert_eq!(history.entries(), source.entries());
        assert_eq!(surface.get_image_data(), drawn.get_image_data());
    }

    #[test]
    fn test_replace_with_empty_clears_surface() {
        let mut history = UndoHistory::new();
        let mut surface = RasterSurface::new(20, 20);
        draw_line(&mut surface, 5.0);
        history.record(&surface).unwrap();

        let report = history.replace_from_remote(Vec::new(), &mut surface);
        assert_eq!(report.accepted, 0);
        assert!(history.is_empty());
        assert!(surface.image().is_blank());
    }

    #[test]
    fn test_stale_replacement_last_write_wins() {
        let mut source = UndoHistory::new();
        let mut drawn = RasterSurface::new(20, 20);
        for y in [2.0, 9.0, 16.0] {
            draw_line(&mut drawn, y);
            source.record(&drawn).unwrap();
        }
        let fresh = source.entries()[..1].to_vec();
        let stale = source.entries()[..2].to_vec();

        let mut history = UndoHistory::new();
        let mut surface = RasterSurface::new(20, 20);
        history.replace_from_remote(fresh, &mut surface);
        history.replace_from_remote(stale.clone(), &mut surface);

        // The stale list simply replaces the fresher one; the stack stays
        // internally consistent with its own last entry.
        assert_eq!(history.entries(), stale.as_slice());
        let expected = snapshot::decode(stale.last().unwrap()).unwrap();
        assert_eq!(surface.get_image_data(), expected);
    }
}
