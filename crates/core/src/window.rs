//! Viewport windowing: which rows of a long list have to be rendered.
//!
//! Everything here is O(1) in the list length, so a picker over a hundred
//! thousand entities renders the same handful of rows as one over twenty.

use std::ops::Range;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewportWindow {
    pub start: usize,
    pub end: usize,
}

impl ViewportWindow {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        self.range().contains(&index)
    }
}

/// Rows to render for the given scroll position.
///
/// Offsets and heights share one unit (pixels in a browser, terminal lines
/// in the TUI). A zero `row_height` yields an empty window, and the start is
/// clamped to `total` so scrolling past the end keeps `start <= end`.
pub fn compute_window(
    scroll_offset: u32,
    row_height: u32,
    viewport_height: u32,
    overscan: usize,
    total: usize,
) -> ViewportWindow {
    if row_height == 0 || total == 0 {
        return ViewportWindow::default();
    }

    let row_height = row_height as u64;
    let visible = (viewport_height as u64).div_ceil(row_height) as usize;
    let first_visible = (scroll_offset as u64 / row_height) as usize;
    let start = first_visible.saturating_sub(overscan).min(total);
    let span = visible.saturating_add(overscan.saturating_mul(2));
    let end = start.saturating_add(span).min(total);

    ViewportWindow { start, end }
}

/// Upper bound on rendered rows for a viewport, independent of list length.
pub fn max_rendered_rows(row_height: u32, viewport_height: u32, overscan: usize) -> usize {
    if row_height == 0 {
        return 0;
    }
    (viewport_height as u64).div_ceil(row_height as u64) as usize + 2 * overscan
}

/// Scroll position for a keyboard-driven list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollState {
    offset: u32,
    row_height: u32,
    viewport_height: u32,
    overscan: usize,
}

impl ScrollState {
    pub fn new(row_height: u32, viewport_height: u32, overscan: usize) -> Self {
        Self {
            offset: 0,
            row_height,
            viewport_height,
            overscan,
        }
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn viewport_height(&self) -> u32 {
        self.viewport_height
    }

    pub fn set_offset(&mut self, offset: u32) {
        self.offset = offset;
    }

    pub fn resize(&mut self, viewport_height: u32) {
        self.viewport_height = viewport_height;
    }

    pub fn reset(&mut self) {
        self.offset = 0;
    }

    pub fn window(&self, total: usize) -> ViewportWindow {
        compute_window(
            self.offset,
            self.row_height,
            self.viewport_height,
            self.overscan,
            total,
        )
    }

    /// Rows fully on screen, without overscan.
    pub fn visible_rows(&self) -> Range<usize> {
        if self.row_height == 0 {
            return 0..0;
        }
        let first = (self.offset / self.row_height) as usize;
        let count = (self.viewport_height / self.row_height) as usize;
        first..first + count
    }

    /// Scroll the minimum distance that puts `index` inside the viewport.
    pub fn ensure_visible(&mut self, index: usize) {
        let row_height = self.row_height as u64;
        let top = index as u64 * row_height;
        let bottom = top + row_height;
        let offset = self.offset as u64;
        let viewport = self.viewport_height as u64;

        if top < offset {
            self.offset = saturate(top);
        } else if bottom > offset + viewport {
            self.offset = saturate(bottom.saturating_sub(viewport));
        }
    }

    /// Pin the offset after the list shrank underneath it.
    pub fn clamp(&mut self, total: usize) {
        let content = total as u64 * self.row_height as u64;
        let max_offset = content.saturating_sub(self.viewport_height as u64);
        if self.offset as u64 > max_offset {
            self.offset = saturate(max_offset);
        }
    }
}

fn saturate(value: u64) -> u32 {
    value.min(u32::MAX as u64) as u32
}
