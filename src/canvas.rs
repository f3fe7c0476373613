use crate::doc_context::DocContext;
use crate::error::LayoutError;
use crate::geometry::PageGeometry;
use crate::page_template::{OnPageCallback, PageTemplate};
use crate::types::{Color, Length, Size, Unit};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // Non-rendered metadata used for layout reporting. Ignored by the PDF writer.
    Meta {
        key: String,
        value: String,
    },
    SetFillColor(Color),
    SetStrokeColor(Color),
    SetLineWidth(Length),
    // Points, independent of the document unit.
    SetFontSize(f32),
    MoveTo {
        x: Length,
        y: Length,
    },
    LineTo {
        x: Length,
        y: Length,
    },
    Stroke,
    // `y` is the text baseline.
    DrawString {
        x: Length,
        y: Length,
        text: String,
    },
    // Filled with the current fill color.
    DrawRect {
        x: Length,
        y: Length,
        width: Length,
        height: Length,
    },
    // Outlined with the current stroke color and width.
    StrokeRect {
        x: Length,
        y: Length,
        width: Length,
        height: Length,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub commands: Vec<Command>,
}

impl Page {
    fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub page_size: Size,
    pub unit: Unit,
    pub pages: Vec<Page>,
}

/// The ambient drawing state, applied as a whole and restored as a whole.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawStyle {
    pub fill_color: Color,
    pub text_color: Color,
    pub stroke_color: Color,
    pub stroke_width: Length,
    pub font_size: f32,
}

impl Default for DrawStyle {
    fn default() -> Self {
        Self {
            fill_color: Color::WHITE,
            text_color: Color::BLACK,
            stroke_color: Color::BLACK,
            stroke_width: Length::from_f32(0.2),
            font_size: 12.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    #[serde(alias = "L")]
    Left,
    #[serde(alias = "C")]
    Center,
    #[serde(alias = "R")]
    Right,
}

/// Which edges of a cell get a ruled line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellBorder {
    pub left: bool,
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
}

impl CellBorder {
    pub const NONE: CellBorder = CellBorder {
        left: false,
        top: false,
        right: false,
        bottom: false,
    };

    pub const ALL: CellBorder = CellBorder {
        left: true,
        top: true,
        right: true,
        bottom: true,
    };

    pub fn is_all(self) -> bool {
        self == CellBorder::ALL
    }

    pub fn is_none(self) -> bool {
        self == CellBorder::NONE
    }
}

/// Parses `"1"` (all edges), `"0"` or `""` (none), or any combination of `L`, `T`, `R`, `B`.
impl FromStr for CellBorder {
    type Err = LayoutError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        match spec.trim() {
            "1" => return Ok(CellBorder::ALL),
            "0" | "" => return Ok(CellBorder::NONE),
            _ => {}
        }
        let mut border = CellBorder::NONE;
        for ch in spec.trim().chars() {
            match ch.to_ascii_uppercase() {
                'L' => border.left = true,
                'T' => border.top = true,
                'R' => border.right = true,
                'B' => border.bottom = true,
                other => {
                    return Err(LayoutError::InvalidConfiguration(format!(
                        "unknown border edge '{other}' in \"{spec}\""
                    )));
                }
            }
        }
        Ok(border)
    }
}

/// The page surface a table is laid out on.
///
/// Implementations own the cursor and page lifecycle; layout code reads positions and
/// requests operations but never moves geometry by itself.
pub trait PageCanvas {
    /// Draws a cell at the cursor and moves the cursor right by `width`.
    fn draw_cell(
        &mut self,
        width: Length,
        height: Length,
        text: &str,
        border: CellBorder,
        align: TextAlign,
        fill: bool,
    );
    /// Moves the cursor down by `dy` and back to the left margin.
    fn advance_cursor(&mut self, dy: Length);
    fn new_page(&mut self);
    fn cursor_x(&self) -> Length;
    fn set_cursor_x(&mut self, x: Length);
    fn cursor_y(&self) -> Length;
    fn page_height(&self) -> Length;
    fn bottom_margin(&self) -> Length;
    fn content_width(&self) -> Length;
    fn style(&self) -> DrawStyle;
    fn set_fill_color(&mut self, color: Color);
    fn set_text_color(&mut self, color: Color);
    fn set_stroke_color(&mut self, color: Color);
    fn set_stroke_width(&mut self, width: Length);
    fn set_font_size(&mut self, size: f32);
    /// Outlined rectangle at absolute coordinates.
    fn draw_rect(&mut self, x: Length, y: Length, width: Length, height: Length);

    fn apply_style(&mut self, style: DrawStyle) {
        self.set_fill_color(style.fill_color);
        self.set_text_color(style.text_color);
        self.set_stroke_color(style.stroke_color);
        self.set_stroke_width(style.stroke_width);
        self.set_font_size(style.font_size);
    }

    /// Non-rendered annotation; surfaces that keep no metadata ignore it.
    fn marker(&mut self, _key: &str, _value: &str) {}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSettings {
    pub unit: Unit,
    pub style: DrawStyle,
    /// Horizontal inset of cell text from the cell edge.
    pub cell_padding: Length,
    /// Open a new page when a cell would cross the bottom margin.
    pub auto_page_break: bool,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            unit: Unit::Mm,
            style: DrawStyle::default(),
            cell_padding: Length::from_f32(1.0),
            auto_page_break: true,
        }
    }
}

// What the current page's command stream has already set.
#[derive(Debug, Clone, Copy, Default)]
struct EmittedState {
    fill: Option<Color>,
    stroke: Option<Color>,
    line_width: Option<Length>,
    font_size: Option<f32>,
}

#[derive(Clone, Copy)]
enum Decoration {
    Header,
    Footer,
}

/// Recording canvas: every drawing call becomes a [`Command`] on the current page.
pub struct Canvas {
    template: PageTemplate,
    settings: CanvasSettings,
    geometry: PageGeometry,
    style: DrawStyle,
    emitted: EmittedState,
    pages: Vec<Page>,
    current: Option<Page>,
    in_decoration: bool,
}

impl Canvas {
    pub fn new(template: PageTemplate, settings: CanvasSettings) -> Self {
        let geometry = PageGeometry::new(template.page_size, template.margins);
        Self {
            template,
            settings,
            geometry,
            style: settings.style,
            emitted: EmittedState::default(),
            pages: Vec::new(),
            current: None,
            in_decoration: false,
        }
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn settings(&self) -> &CanvasSettings {
        &self.settings
    }

    pub fn template(&self) -> &PageTemplate {
        &self.template
    }

    /// 1-based number of the page being drawn, 0 before the first page.
    pub fn page_number(&self) -> usize {
        self.pages.len() + usize::from(self.current.is_some())
    }

    /// Closes the current page (running its footer) and opens the next one (running
    /// its header). Page decorations cannot open pages themselves.
    pub fn new_page(&mut self) {
        if self.in_decoration {
            return;
        }
        if self.current.is_some() {
            self.run_decoration(Decoration::Footer);
            if let Some(page) = self.current.take() {
                self.pages.push(page);
            }
        }
        self.current = Some(Page::new());
        self.emitted = EmittedState::default();
        self.geometry.reset_to_top();
        self.run_decoration(Decoration::Header);
    }

    /// Runs the last footer and hands the recorded pages over.
    pub fn finish(mut self) -> Document {
        if self.current.is_some() {
            self.run_decoration(Decoration::Footer);
        }
        if let Some(page) = self.current.take() {
            self.pages.push(page);
        }
        Document {
            page_size: self.template.page_size,
            unit: self.settings.unit,
            pages: self.pages,
        }
    }

    fn run_decoration(&mut self, kind: Decoration) {
        let callback: Option<OnPageCallback> = match kind {
            Decoration::Header => self.template.on_page_header().cloned(),
            Decoration::Footer => self.template.on_page_footer().cloned(),
        };
        let Some(callback) = callback else {
            return;
        };
        let ctx = DocContext::new(self.page_number(), self.template.name.clone());
        let saved = self.style;
        self.in_decoration = true;
        callback(self, &ctx);
        self.in_decoration = false;
        self.style = saved;
    }

    fn ensure_page(&mut self) {
        if self.current.is_none() {
            self.new_page();
        }
    }

    fn push(&mut self, command: Command) {
        if let Some(page) = self.current.as_mut() {
            page.commands.push(command);
        }
    }

    fn sync_fill(&mut self, color: Color) {
        if self.emitted.fill != Some(color) {
            self.emitted.fill = Some(color);
            self.push(Command::SetFillColor(color));
        }
    }

    fn sync_stroke(&mut self) {
        let color = self.style.stroke_color;
        if self.emitted.stroke != Some(color) {
            self.emitted.stroke = Some(color);
            self.push(Command::SetStrokeColor(color));
        }
        let width = self.style.stroke_width;
        if self.emitted.line_width != Some(width) {
            self.emitted.line_width = Some(width);
            self.push(Command::SetLineWidth(width));
        }
    }

    fn sync_font(&mut self) {
        let size = self.style.font_size;
        if self.emitted.font_size != Some(size) {
            self.emitted.font_size = Some(size);
            self.push(Command::SetFontSize(size));
        }
    }

    pub fn style(&self) -> DrawStyle {
        self.style
    }

    pub fn apply_style(&mut self, style: DrawStyle) {
        self.style = style;
    }

    pub fn set_fill_color(&mut self, color: Color) {
        self.style.fill_color = color;
    }

    pub fn set_text_color(&mut self, color: Color) {
        self.style.text_color = color;
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        self.style.stroke_color = color;
    }

    pub fn set_stroke_width(&mut self, width: Length) {
        self.style.stroke_width = width.max(Length::ZERO);
    }

    pub fn set_font_size(&mut self, size: f32) {
        if size.is_finite() && size > 0.0 {
            self.style.font_size = size;
        }
    }

    /// Height of the current font in document units.
    pub fn font_height(&self) -> Length {
        self.settings.unit.from_points(self.style.font_size)
    }

    /// Advance width of `text` with the current font size.
    ///
    /// Uses a fixed 0.6 em per character since no font program is loaded.
    pub fn text_width(&self, text: &str) -> Length {
        let char_width = self.settings.unit.from_points(self.style.font_size * 0.6);
        char_width * (text.chars().count() as i32)
    }

    pub fn set_xy(&mut self, x: Length, y: Length) {
        self.set_y(y);
        self.set_x(x);
    }

    /// Negative values are measured from the right page edge.
    pub fn set_x(&mut self, x: Length) {
        self.ensure_page();
        let x = if x < Length::ZERO {
            self.geometry.page_size().width + x
        } else {
            x
        };
        self.geometry.set_cursor_x(x);
    }

    /// Moves to `y` and back to the left margin. Negative values are measured from the
    /// bottom page edge.
    pub fn set_y(&mut self, y: Length) {
        self.ensure_page();
        let y = if y < Length::ZERO {
            self.geometry.page_height() + y
        } else {
            y
        };
        self.geometry.set_cursor_x(self.geometry.margins().left);
        self.geometry.set_cursor_y(y);
    }

    pub fn ln(&mut self, dy: Length) {
        self.ensure_page();
        self.geometry.line_feed(dy);
    }

    pub fn meta(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.ensure_page();
        self.push(Command::Meta {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn cell(
        &mut self,
        width: Length,
        height: Length,
        text: &str,
        border: CellBorder,
        align: TextAlign,
        fill: bool,
    ) {
        self.ensure_page();
        if self.settings.auto_page_break
            && !self.in_decoration
            && !self.geometry.is_at_top()
            && self.geometry.cursor_y() + height > self.geometry.page_break_trigger()
        {
            let x = self.geometry.cursor_x();
            self.new_page();
            self.geometry.set_cursor_x(x);
        }

        let x = self.geometry.cursor_x();
        let y = self.geometry.cursor_y();
        let width = if width > Length::ZERO {
            width
        } else {
            (self.geometry.right_edge() - x).max(Length::ZERO)
        };

        if fill {
            self.sync_fill(self.style.fill_color);
            self.push(Command::DrawRect {
                x,
                y,
                width,
                height,
            });
        }
        self.draw_border(x, y, width, height, border);

        if !text.is_empty() {
            self.sync_font();
            self.sync_fill(self.style.text_color);
            let text_width = self.text_width(text);
            let padding = self.settings.cell_padding;
            let text_x = match align {
                TextAlign::Left => x + padding,
                TextAlign::Center => x + (width - text_width).mul_ratio(1, 2),
                TextAlign::Right => x + width - padding - text_width,
            };
            let baseline = y + height.mul_ratio(1, 2) + self.font_height() * 0.3;
            self.push(Command::DrawString {
                x: text_x,
                y: baseline,
                text: text.to_string(),
            });
        }

        self.geometry.advance_x(width);
    }

    fn draw_border(&mut self, x: Length, y: Length, width: Length, height: Length, border: CellBorder) {
        if border.is_none() {
            return;
        }
        self.sync_stroke();
        if border.is_all() {
            self.push(Command::StrokeRect {
                x,
                y,
                width,
                height,
            });
            return;
        }
        let right = x + width;
        let bottom = y + height;
        if border.left {
            self.segment(x, y, x, bottom);
        }
        if border.top {
            self.segment(x, y, right, y);
        }
        if border.right {
            self.segment(right, y, right, bottom);
        }
        if border.bottom {
            self.segment(x, bottom, right, bottom);
        }
    }

    fn segment(&mut self, x1: Length, y1: Length, x2: Length, y2: Length) {
        self.push(Command::MoveTo { x: x1, y: y1 });
        self.push(Command::LineTo { x: x2, y: y2 });
        self.push(Command::Stroke);
    }

    pub fn line(&mut self, x1: Length, y1: Length, x2: Length, y2: Length) {
        self.ensure_page();
        self.sync_stroke();
        self.segment(x1, y1, x2, y2);
    }

    pub fn stroke_rect(&mut self, x: Length, y: Length, width: Length, height: Length) {
        self.ensure_page();
        self.sync_stroke();
        self.push(Command::StrokeRect {
            x,
            y,
            width,
            height,
        });
    }

    pub fn fill_rect(&mut self, x: Length, y: Length, width: Length, height: Length) {
        self.ensure_page();
        self.sync_fill(self.style.fill_color);
        self.push(Command::DrawRect {
            x,
            y,
            width,
            height,
        });
    }

    /// Text with its baseline at `y`; does not move the cursor.
    pub fn text_at(&mut self, x: Length, y: Length, text: &str) {
        self.ensure_page();
        self.sync_font();
        self.sync_fill(self.style.text_color);
        self.push(Command::DrawString {
            x,
            y,
            text: text.to_string(),
        });
    }
}

impl PageCanvas for Canvas {
    fn draw_cell(
        &mut self,
        width: Length,
        height: Length,
        text: &str,
        border: CellBorder,
        align: TextAlign,
        fill: bool,
    ) {
        self.cell(width, height, text, border, align, fill);
    }

    fn advance_cursor(&mut self, dy: Length) {
        self.ln(dy);
    }

    fn new_page(&mut self) {
        Canvas::new_page(self);
    }

    fn cursor_x(&self) -> Length {
        self.geometry.cursor_x()
    }

    fn set_cursor_x(&mut self, x: Length) {
        self.set_x(x);
    }

    fn cursor_y(&self) -> Length {
        self.geometry.cursor_y()
    }

    fn page_height(&self) -> Length {
        self.geometry.page_height()
    }

    fn bottom_margin(&self) -> Length {
        self.geometry.bottom_margin()
    }

    fn content_width(&self) -> Length {
        self.geometry.content_width()
    }

    fn style(&self) -> DrawStyle {
        self.style
    }

    fn set_fill_color(&mut self, color: Color) {
        Canvas::set_fill_color(self, color);
    }

    fn set_text_color(&mut self, color: Color) {
        Canvas::set_text_color(self, color);
    }

    fn set_stroke_color(&mut self, color: Color) {
        Canvas::set_stroke_color(self, color);
    }

    fn set_stroke_width(&mut self, width: Length) {
        Canvas::set_stroke_width(self, width);
    }

    fn set_font_size(&mut self, size: f32) {
        Canvas::set_font_size(self, size);
    }

    fn draw_rect(&mut self, x: Length, y: Length, width: Length, height: Length) {
        self.stroke_rect(x, y, width, height);
    }

    fn apply_style(&mut self, style: DrawStyle) {
        Canvas::apply_style(self, style);
    }

    fn marker(&mut self, key: &str, value: &str) {
        self.meta(key, value);
    }
}
