use crate::types::{Length, Margins, Size};

/// Page box, margins and the flowing cursor of the page being drawn.
///
/// Owned by [`crate::Canvas`]; layout code only observes it and moves the cursor
/// through canvas operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    page_size: Size,
    margins: Margins,
    cursor_x: Length,
    cursor_y: Length,
}

impl PageGeometry {
    pub fn new(page_size: Size, margins: Margins) -> Self {
        Self {
            page_size,
            margins,
            cursor_x: margins.left,
            cursor_y: margins.top,
        }
    }

    pub fn page_size(&self) -> Size {
        self.page_size
    }

    pub fn margins(&self) -> Margins {
        self.margins
    }

    pub fn page_height(&self) -> Length {
        self.page_size.height
    }

    pub fn bottom_margin(&self) -> Length {
        self.margins.bottom
    }

    pub fn cursor_x(&self) -> Length {
        self.cursor_x
    }

    pub fn cursor_y(&self) -> Length {
        self.cursor_y
    }

    /// Lowest y a flowing element may reach before the page overflows.
    pub fn page_break_trigger(&self) -> Length {
        self.page_size.height - self.margins.bottom
    }

    pub fn content_width(&self) -> Length {
        (self.page_size.width - self.margins.left - self.margins.right).max(Length::ZERO)
    }

    /// Right edge of the content box.
    pub fn right_edge(&self) -> Length {
        self.page_size.width - self.margins.right
    }

    pub fn remaining_height(&self) -> Length {
        (self.page_break_trigger() - self.cursor_y).max(Length::ZERO)
    }

    pub fn is_at_top(&self) -> bool {
        self.cursor_y <= self.margins.top
    }

    pub(crate) fn reset_to_top(&mut self) {
        self.cursor_x = self.margins.left;
        self.cursor_y = self.margins.top;
    }

    pub(crate) fn set_cursor_x(&mut self, x: Length) {
        self.cursor_x = x;
    }

    pub(crate) fn set_cursor_y(&mut self, y: Length) {
        self.cursor_y = y;
    }

    pub(crate) fn advance_x(&mut self, dx: Length) {
        self.cursor_x += dx;
    }

    /// Line feed: back to the left margin and down by `dy`.
    pub(crate) fn line_feed(&mut self, dy: Length) {
        self.cursor_x = self.margins.left;
        self.cursor_y += dy;
    }
}
