//! Cursor-to-display resolution.
//!
//! Display lists follow the "index 0 is the virtual desktop" convention: entry 0
//! is the bounding box of every physical display and is never used for
//! containment tests. [`virtual_layout`] builds such a list from the physical
//! displays reported by the OS.

use std::sync::Mutex;
use thiserror::Error;

/// One physical display (or the virtual desktop at index 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayGeometry {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl DisplayGeometry {
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self { left, top, width, height }
    }

    /// Half-open containment: `left <= x < left + width`, same for y.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let (x, y) = (x as i64, y as i64);
        let left = self.left as i64;
        let top = self.top as i64;
        x >= left && x < left + self.width as i64 && y >= top && y < top + self.height as i64
    }

    fn right(&self) -> i64 {
        self.left as i64 + self.width as i64
    }

    fn bottom(&self) -> i64 {
        self.top as i64 + self.height as i64
    }
}

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("cursor position unavailable: {0}")]
    CursorUnavailable(String),

    #[error("no display found")]
    NoDisplayFound,
}

/// The display picked for a cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    /// Index into the layout the display was picked from
    pub index: usize,
    pub geometry: DisplayGeometry,
    /// False when the fallback policy picked the display
    pub contains_cursor: bool,
}

/// Prepend the virtual bounding box to a list of physical displays.
/// Returns an empty layout when there are no displays.
pub fn virtual_layout(physical: &[DisplayGeometry]) -> Vec<DisplayGeometry> {
    let Some(first) = physical.first() else {
        return Vec::new();
    };

    let (mut left, mut top) = (first.left as i64, first.top as i64);
    let (mut right, mut bottom) = (first.right(), first.bottom());
    for display in &physical[1..] {
        left = left.min(display.left as i64);
        top = top.min(display.top as i64);
        right = right.max(display.right());
        bottom = bottom.max(display.bottom());
    }

    let mut layout = Vec::with_capacity(physical.len() + 1);
    layout.push(DisplayGeometry {
        left: left as i32,
        top: top as i32,
        width: (right - left) as u32,
        height: (bottom - top) as u32,
    });
    layout.extend_from_slice(physical);
    layout
}

/// Pick the display containing `(x, y)`.
///
/// Index 0 is skipped during the search. Ties go to the first match in
/// enumeration order. When nothing contains the point the first physical
/// display (index 1) is returned, then the lone virtual entry, then
/// [`LocateError::NoDisplayFound`].
pub fn locate(x: i32, y: i32, layout: &[DisplayGeometry]) -> Result<Located, LocateError> {
    if let Some((index, geometry)) = layout
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, display)| display.contains(x, y))
    {
        return Ok(Located { index, geometry: *geometry, contains_cursor: true });
    }

    let index = if layout.len() > 1 { 1 } else { 0 };
    layout
        .get(index)
        .map(|geometry| Located { index, geometry: *geometry, contains_cursor: false })
        .ok_or(LocateError::NoDisplayFound)
}

/// Source of the current cursor position.
pub trait CursorSource: Send + Sync {
    fn position(&self) -> Result<(i32, i32), LocateError>;
}

/// Cursor position kept up to date by the mouse listener.
#[derive(Debug, Default)]
pub struct TrackedCursor {
    last: Mutex<Option<(i32, i32)>>,
}

impl TrackedCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, x: f64, y: f64) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        *last = Some((x.floor() as i32, y.floor() as i32));
    }
}

impl CursorSource for TrackedCursor {
    fn position(&self) -> Result<(i32, i32), LocateError> {
        let last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        last.ok_or_else(|| {
            LocateError::CursorUnavailable("no pointer movement observed yet".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn side_by_side() -> Vec<DisplayGeometry> {
        virtual_layout(&[
            DisplayGeometry::new(0, 0, 1920, 1080),
            DisplayGeometry::new(1920, 0, 1280, 1024),
        ])
    }

    #[test]
    fn test_virtual_layout_bounds_all_displays() {
        let layout = virtual_layout(&[
            DisplayGeometry::new(-1280, 200, 1280, 1024),
            DisplayGeometry::new(0, 0, 1920, 1080),
        ]);
        assert_eq!(layout.len(), 3);
        assert_eq!(layout[0], DisplayGeometry::new(-1280, 0, 3200, 1224));
    }

    #[test]
    fn test_virtual_layout_empty() {
        assert!(virtual_layout(&[]).is_empty());
    }

    #[test]
    fn test_cursor_inside_second_display() {
        let located = locate(2000, 500, &side_by_side()).unwrap();
        assert_eq!(located.index, 2);
        assert!(located.contains_cursor);
    }

    #[test]
    fn test_shared_edge_belongs_to_right_display() {
        let layout = side_by_side();
        assert_eq!(locate(1920, 10, &layout).unwrap().index, 2);
        assert_eq!(locate(1919, 10, &layout).unwrap().index, 1);
    }

    #[test]
    fn test_virtual_entry_never_matches_directly() {
        // (1930, 1050) is inside the virtual box but below the second display
        let located = locate(1930, 1050, &side_by_side()).unwrap();
        assert_eq!(located.index, 1);
        assert!(!located.contains_cursor);
    }

    #[test]
    fn test_fallback_to_virtual_when_alone() {
        let layout = vec![DisplayGeometry::new(0, 0, 800, 600)];
        let located = locate(5000, 5000, &layout).unwrap();
        assert_eq!(located.index, 0);
    }

    #[test]
    fn test_no_display() {
        assert!(matches!(locate(0, 0, &[]), Err(LocateError::NoDisplayFound)));
    }

    #[test]
    fn test_negative_coordinates() {
        let layout = virtual_layout(&[
            DisplayGeometry::new(0, 0, 1920, 1080),
            DisplayGeometry::new(-1920, 0, 1920, 1080),
        ]);
        assert_eq!(locate(-1, 0, &layout).unwrap().index, 2);
    }

    #[test]
    fn test_tracked_cursor_starts_unknown() {
        let cursor = TrackedCursor::new();
        assert!(matches!(cursor.position(), Err(LocateError::CursorUnavailable(_))));
        cursor.update(10.7, -3.2);
        assert_eq!(cursor.position().unwrap(), (10, -4));
    }
}
