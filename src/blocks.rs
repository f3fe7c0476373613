//! Fixed statement blocks drawn around tables: section bands, free-form ruled rows
//! and signature boxes.

use crate::canvas::{Canvas, CellBorder, PageCanvas, TextAlign};
use crate::types::{Color, Length};

pub fn section_title<C: PageCanvas + ?Sized>(canvas: &mut C, text: &str, fill: Color) {
    let saved = canvas.style();
    canvas.set_fill_color(fill);
    let width = canvas.content_width();
    canvas.draw_cell(
        width,
        Length::from_f32(8.0),
        text,
        CellBorder::NONE,
        TextAlign::Left,
        true,
    );
    canvas.advance_cursor(Length::from_f32(8.0));
    canvas.advance_cursor(Length::from_f32(1.0));
    canvas.apply_style(saved);
}

/// One cell of a free-form row. Widths may span several table columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RowCell {
    pub width: Length,
    pub text: String,
    pub align: TextAlign,
    pub border: CellBorder,
    pub fill: Option<Color>,
}

impl RowCell {
    pub fn new(width: Length, text: impl Into<String>) -> Self {
        Self {
            width,
            text: text.into(),
            align: TextAlign::Left,
            border: CellBorder::ALL,
            fill: None,
        }
    }

    pub fn align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn border(mut self, border: CellBorder) -> Self {
        self.border = border;
        self
    }

    pub fn fill(mut self, color: Color) -> Self {
        self.fill = Some(color);
        self
    }
}

/// Draws `cells` left to right from the cursor, then moves down one row.
pub fn draw_row<C: PageCanvas + ?Sized>(canvas: &mut C, cells: &[RowCell], height: Length) {
    let saved = canvas.style();
    for cell in cells {
        if let Some(color) = cell.fill {
            canvas.set_fill_color(color);
        }
        canvas.draw_cell(
            cell.width,
            height,
            &cell.text,
            cell.border,
            cell.align,
            cell.fill.is_some(),
        );
    }
    canvas.advance_cursor(height);
    canvas.apply_style(saved);
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignatureBox {
    pub x: Length,
    pub y: Length,
    pub width: Length,
    pub height: Length,
    pub name: String,
    pub role: String,
    /// Share of the height given to the name part.
    pub name_ratio: f32,
}

impl SignatureBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32, name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            x: Length::from_f32(x),
            y: Length::from_f32(y),
            width: Length::from_f32(width),
            height: Length::from_f32(height),
            name: name.into(),
            role: role.into(),
            name_ratio: 0.72,
        }
    }
}

/// Outlined box with a rule between the signer's name and role. Leaves the cursor at
/// the end of the role line.
pub fn signature_box(canvas: &mut Canvas, sig: &SignatureBox) {
    let ratio = sig.name_ratio.clamp(0.0, 1.0);
    let name_height = sig.height * ratio;
    let role_height = sig.height - name_height;
    let split = sig.y + name_height;

    canvas.stroke_rect(sig.x, sig.y, sig.width, sig.height);
    canvas.line(sig.x, split, sig.x + sig.width, split);

    // The name sits low in its part, just above the rule.
    let name_offset = Length::from_f32(7.0).min(name_height);
    canvas.set_xy(sig.x, sig.y + name_offset);
    canvas.cell(
        sig.width,
        name_height - name_offset,
        &sig.name,
        CellBorder::NONE,
        TextAlign::Center,
        false,
    );
    canvas.set_xy(sig.x, split);
    canvas.cell(
        sig.width,
        role_height,
        &sig.role,
        CellBorder::NONE,
        TextAlign::Center,
        false,
    );
}
