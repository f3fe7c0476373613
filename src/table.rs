//! Paginated table layout.
//!
//! A table is one header row followed by body rows of equal height. Before each body
//! row the engine checks the cursor against the page-break threshold; when the row would
//! not fit it asks the canvas for a new page and replays the header so that every page
//! of the table can be read on its own. Cell values arrive preformatted as strings.

use crate::canvas::{CellBorder, PageCanvas, TextAlign};
use crate::debug::DebugLogger;
use crate::error::{LayoutError, Result};
use crate::types::{Color, Length, Rect};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub header: String,
    /// Left out to share the remaining content width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<Length>,
    /// Body alignment; header cells are always centred.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<TextAlign>,
}

impl ColumnSpec {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            width: None,
            align: None,
        }
    }

    pub fn width(mut self, width: f32) -> Self {
        self.width = Some(Length::from_f32(width));
        self
    }

    pub fn align(mut self, align: TextAlign) -> Self {
        self.align = Some(align);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOptions {
    pub header_fill: Color,
    pub header_text_color: Color,
    pub draw_outer_grid: bool,
    /// Points. Unset keeps whatever the canvas is using.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_font_size: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_font_size: Option<f32>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            header_fill: Color::rgb8(232, 240, 254),
            header_text_color: Color::rgb8(31, 31, 31),
            draw_outer_grid: true,
            header_font_size: None,
            body_font_size: None,
        }
    }
}

/// Column schema plus options, as loaded from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    pub columns: Vec<ColumnSpec>,
    pub row_height: Length,
    #[serde(default)]
    pub options: TableOptions,
}

impl TableSpec {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Outline drawn around the last contiguous block of a table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridRegion {
    pub rect: Rect,
    /// Body rows inside the outline, header excluded.
    pub body_rows: usize,
}

/// What one `render_table` call did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableLayout {
    pub rows_drawn: usize,
    /// Includes a break taken before the first header when the table starts too low.
    pub page_breaks: usize,
    /// Header blocks drawn after a page break; the first header is not counted.
    pub header_replays: usize,
    /// Index of each body row that was moved to a fresh page.
    pub break_rows: Vec<usize>,
    pub rows_on_last_page: usize,
    pub grid: Option<GridRegion>,
}

pub const META_TABLE_HEADER: &str = "table.header";
pub const META_TABLE_GRID: &str = "table.grid";

#[derive(Clone)]
pub struct TableLayoutEngine {
    break_slack: Length,
    outer_grid_width: Length,
    debug: Option<Arc<DebugLogger>>,
}

impl Default for TableLayoutEngine {
    fn default() -> Self {
        Self {
            break_slack: Length::from_f32(1.5),
            outer_grid_width: Length::from_f32(0.7),
            debug: None,
        }
    }
}

struct ResolvedColumn<'a> {
    header: &'a str,
    width: Length,
    align: TextAlign,
}

impl TableLayoutEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extra room, beyond one row height, that must remain above the bottom margin
    /// for a row to stay on the current page.
    pub fn with_break_slack(mut self, slack: Length) -> Self {
        self.break_slack = slack.max(Length::ZERO);
        self
    }

    pub fn with_outer_grid_width(mut self, width: Length) -> Self {
        self.outer_grid_width = width.max(Length::ZERO);
        self
    }

    pub fn with_debug_logger(mut self, debug: Option<Arc<DebugLogger>>) -> Self {
        self.debug = debug;
        self
    }

    pub fn break_slack(&self) -> Length {
        self.break_slack
    }

    /// Lowest cursor position at which a row of `row_height` may still start.
    pub fn break_threshold<C: PageCanvas + ?Sized>(&self, canvas: &C, row_height: Length) -> Length {
        canvas.page_height() - canvas.bottom_margin() - (row_height + self.break_slack)
    }

    pub fn render_spec<C, R, S>(&self, canvas: &mut C, spec: &TableSpec, rows: &[R]) -> Result<TableLayout>
    where
        C: PageCanvas + ?Sized,
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        self.render_table(canvas, &spec.columns, rows, spec.row_height, &spec.options)
    }

    /// Lays out `rows` under a header built from `columns`, starting at the canvas cursor.
    ///
    /// Fails with [`LayoutError::InvalidGeometry`] before drawing anything when the row
    /// height or a column width is not positive, and with [`LayoutError::SchemaMismatch`]
    /// at the first row whose cell count differs from the column count. Rows before the
    /// bad one stay drawn; no cell of the bad row is.
    pub fn render_table<C, R, S>(
        &self,
        canvas: &mut C,
        columns: &[ColumnSpec],
        rows: &[R],
        row_height: Length,
        options: &TableOptions,
    ) -> Result<TableLayout>
    where
        C: PageCanvas + ?Sized,
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        if !row_height.is_positive() {
            return Err(LayoutError::InvalidGeometry(format!(
                "row height must be positive, got {}",
                row_height.to_f32()
            )));
        }
        let columns = resolve_columns(columns, canvas.content_width())?;
        let total_width: Length = columns.iter().map(|c| c.width).sum();
        let origin_x = canvas.cursor_x();

        tracing::debug!(
            columns = columns.len(),
            rows = rows.len(),
            row_height = row_height.to_f32(),
            x = origin_x.to_f32(),
            y = canvas.cursor_y().to_f32(),
            "table layout begin"
        );
        if let Some(debug) = &self.debug {
            debug.log_event(
                "table.begin",
                json!({
                    "columns": columns.len(),
                    "rows": rows.len(),
                    "row_height": row_height.to_f32(),
                    "x": origin_x.to_f32(),
                    "y": canvas.cursor_y().to_f32(),
                    "total_width": total_width.to_f32(),
                }),
            );
        }

        let mut layout = TableLayout::default();
        // A header that would start below the threshold goes to the next page.
        let cursor_y = canvas.cursor_y();
        let threshold = self.break_threshold(canvas, row_height);
        if cursor_y > threshold {
            tracing::debug!(
                cursor_y = cursor_y.to_f32(),
                threshold = threshold.to_f32(),
                "table header moved to a new page"
            );
            if let Some(debug) = &self.debug {
                debug.log_event(
                    "table.page_break",
                    json!({
                        "row": null,
                        "cursor_y": cursor_y.to_f32(),
                        "threshold": threshold.to_f32(),
                    }),
                );
            }
            canvas.new_page();
            canvas.set_cursor_x(origin_x);
            layout.page_breaks += 1;
        }

        let saved = canvas.style();
        self.draw_header(canvas, &columns, row_height, options);
        if let Some(size) = options.body_font_size {
            canvas.set_font_size(size);
        }
        let body = self.draw_body(canvas, &columns, rows, row_height, options, origin_x, &mut layout);
        canvas.apply_style(saved);
        body?;

        if options.draw_outer_grid {
            let rows_in_block = layout.rows_on_last_page as i32 + 1;
            let height = row_height * rows_in_block;
            let rect = Rect {
                x: origin_x,
                y: canvas.cursor_y() - height,
                width: total_width,
                height,
            };
            canvas.set_stroke_width(self.outer_grid_width);
            canvas.draw_rect(rect.x, rect.y, rect.width, rect.height);
            canvas.set_stroke_width(saved.stroke_width);
            canvas.marker(META_TABLE_GRID, &format!("{}", layout.rows_on_last_page));
            layout.grid = Some(GridRegion {
                rect,
                body_rows: layout.rows_on_last_page,
            });
        }

        if let Some(debug) = &self.debug {
            debug.increment("table.rows", layout.rows_drawn as u64);
            debug.log_event(
                "table.end",
                json!({
                    "rows": layout.rows_drawn,
                    "page_breaks": layout.page_breaks,
                    "rows_on_last_page": layout.rows_on_last_page,
                    "grid": layout.grid.is_some(),
                }),
            );
        }
        Ok(layout)
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_body<C, R, S>(
        &self,
        canvas: &mut C,
        columns: &[ResolvedColumn<'_>],
        rows: &[R],
        row_height: Length,
        options: &TableOptions,
        origin_x: Length,
        layout: &mut TableLayout,
    ) -> Result<()>
    where
        C: PageCanvas + ?Sized,
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        for (index, row) in rows.iter().enumerate() {
            let cells = row.as_ref();
            if cells.len() != columns.len() {
                return Err(LayoutError::SchemaMismatch {
                    row: index,
                    expected: columns.len(),
                    found: cells.len(),
                });
            }

            let cursor_y = canvas.cursor_y();
            let threshold = self.break_threshold(canvas, row_height);
            if cursor_y > threshold {
                tracing::debug!(
                    row = index,
                    cursor_y = cursor_y.to_f32(),
                    threshold = threshold.to_f32(),
                    "table page break"
                );
                if let Some(debug) = &self.debug {
                    debug.log_event(
                        "table.page_break",
                        json!({
                            "row": index,
                            "cursor_y": cursor_y.to_f32(),
                            "threshold": threshold.to_f32(),
                        }),
                    );
                }
                canvas.new_page();
                canvas.set_cursor_x(origin_x);
                self.draw_header(canvas, columns, row_height, options);
                layout.page_breaks += 1;
                layout.header_replays += 1;
                layout.break_rows.push(index);
                layout.rows_on_last_page = 0;
            }

            canvas.set_cursor_x(origin_x);
            for (column, value) in columns.iter().zip(cells) {
                canvas.draw_cell(
                    column.width,
                    row_height,
                    value.as_ref(),
                    CellBorder::ALL,
                    column.align,
                    false,
                );
            }
            canvas.advance_cursor(row_height);
            layout.rows_drawn += 1;
            layout.rows_on_last_page += 1;
        }
        Ok(())
    }

    fn draw_header<C: PageCanvas + ?Sized>(
        &self,
        canvas: &mut C,
        columns: &[ResolvedColumn<'_>],
        row_height: Length,
        options: &TableOptions,
    ) {
        let saved = canvas.style();
        canvas.set_fill_color(options.header_fill);
        canvas.set_text_color(options.header_text_color);
        if let Some(size) = options.header_font_size {
            canvas.set_font_size(size);
        }
        canvas.marker(META_TABLE_HEADER, &columns.len().to_string());
        for column in columns {
            canvas.draw_cell(
                column.width,
                row_height,
                column.header,
                CellBorder::ALL,
                TextAlign::Center,
                true,
            );
        }
        canvas.advance_cursor(row_height);
        canvas.apply_style(saved);
    }
}

fn resolve_columns(columns: &[ColumnSpec], content_width: Length) -> Result<Vec<ResolvedColumn<'_>>> {
    if columns.is_empty() {
        return Err(LayoutError::InvalidGeometry(
            "a table needs at least one column".to_string(),
        ));
    }
    for (index, column) in columns.iter().enumerate() {
        if let Some(width) = column.width {
            if !width.is_positive() {
                return Err(LayoutError::InvalidGeometry(format!(
                    "column {index} (\"{}\") has non-positive width {}",
                    column.header,
                    width.to_f32()
                )));
            }
        }
    }

    let fixed: Length = columns.iter().filter_map(|c| c.width).sum();
    let open = columns.iter().filter(|c| c.width.is_none()).count();
    let shared = if open > 0 {
        let share = (content_width - fixed) / open as i32;
        if !share.is_positive() {
            return Err(LayoutError::InvalidGeometry(format!(
                "no width left for {open} unsized column(s)"
            )));
        }
        share
    } else {
        Length::ZERO
    };

    Ok(columns
        .iter()
        .map(|column| ResolvedColumn {
            header: column.header.as_str(),
            width: column.width.unwrap_or(shared),
            align: column.align.unwrap_or_default(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Canvas, CanvasSettings, Command, DrawStyle, Page};
    use crate::page_template::PageTemplate;
    use crate::types::{Margins, Size};

    fn mm(v: f32) -> Length {
        Length::from_f32(v)
    }

    fn statement_columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("Item").width(60.0),
            ColumnSpec::new("Period").width(20.0).align(TextAlign::Center),
            ColumnSpec::new("kWh").width(53.0).align(TextAlign::Right),
            ColumnSpec::new("Amount").width(53.0).align(TextAlign::Right),
        ]
    }

    fn statement_canvas() -> Canvas {
        Canvas::new(
            PageTemplate::new("statement", Size::a4(), Margins::all(12.0)),
            CanvasSettings::default(),
        )
    }

    fn rows(count: usize) -> Vec<Vec<String>> {
        (0..count)
            .map(|i| {
                vec![
                    format!("line {i}"),
                    "P".to_string(),
                    format!("{:.2}", i as f32 * 100.0),
                    format!("{:.2}", i as f32 * 4.1),
                ]
            })
            .collect()
    }

    fn header_markers(page: &Page) -> usize {
        page.commands
            .iter()
            .filter(|cmd| matches!(cmd, Command::Meta { key, .. } if key == META_TABLE_HEADER))
            .count()
    }

    fn texts(page: &Page) -> Vec<String> {
        page.commands
            .iter()
            .filter_map(|cmd| match cmd {
                Command::DrawString { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Cell {
            width: Length,
            text: String,
            align: TextAlign,
            fill: bool,
        },
        Advance(Length),
        NewPage,
        Rect(Length, Length, Length, Length),
        StrokeWidth(Length),
    }

    // Minimal surface with an explicit cursor, to exercise the engine against the
    // canvas contract alone.
    struct ScriptedCanvas {
        x: Length,
        y: Length,
        top: Length,
        left: Length,
        page_height: Length,
        bottom_margin: Length,
        style: DrawStyle,
        ops: Vec<Op>,
    }

    impl ScriptedCanvas {
        fn new(start_y: f32) -> Self {
            Self {
                x: mm(12.0),
                y: mm(start_y),
                top: mm(12.0),
                left: mm(12.0),
                page_height: mm(297.0),
                bottom_margin: mm(12.0),
                style: DrawStyle::default(),
                ops: Vec::new(),
            }
        }

        fn cells(&self) -> Vec<&Op> {
            self.ops.iter().filter(|op| matches!(op, Op::Cell { .. })).collect()
        }
    }

    impl PageCanvas for ScriptedCanvas {
        fn draw_cell(
            &mut self,
            width: Length,
            _height: Length,
            text: &str,
            _border: CellBorder,
            align: TextAlign,
            fill: bool,
        ) {
            self.ops.push(Op::Cell {
                width,
                text: text.to_string(),
                align,
                fill,
            });
            self.x += width;
        }

        fn advance_cursor(&mut self, dy: Length) {
            self.ops.push(Op::Advance(dy));
            self.x = self.left;
            self.y += dy;
        }

        fn new_page(&mut self) {
            self.ops.push(Op::NewPage);
            self.x = self.left;
            self.y = self.top;
        }

        fn cursor_x(&self) -> Length {
            self.x
        }

        fn set_cursor_x(&mut self, x: Length) {
            self.x = x;
        }

        fn cursor_y(&self) -> Length {
            self.y
        }

        fn page_height(&self) -> Length {
            self.page_height
        }

        fn bottom_margin(&self) -> Length {
            self.bottom_margin
        }

        fn content_width(&self) -> Length {
            mm(186.0)
        }

        fn style(&self) -> DrawStyle {
            self.style
        }

        fn set_fill_color(&mut self, color: Color) {
            self.style.fill_color = color;
        }

        fn set_text_color(&mut self, color: Color) {
            self.style.text_color = color;
        }

        fn set_stroke_color(&mut self, color: Color) {
            self.style.stroke_color = color;
        }

        fn set_stroke_width(&mut self, width: Length) {
            self.ops.push(Op::StrokeWidth(width));
            self.style.stroke_width = width;
        }

        fn set_font_size(&mut self, size: f32) {
            self.style.font_size = size;
        }

        fn draw_rect(&mut self, x: Length, y: Length, width: Length, height: Length) {
            self.ops.push(Op::Rect(x, y, width, height));
        }
    }

    #[test]
    fn empty_rows_draw_only_the_header() {
        let mut canvas = ScriptedCanvas::new(250.0);
        let options = TableOptions {
            draw_outer_grid: false,
            ..TableOptions::default()
        };
        let layout = TableLayoutEngine::new()
            .render_table(&mut canvas, &statement_columns(), &Vec::<Vec<String>>::new(), mm(6.5), &options)
            .expect("render");
        assert_eq!(layout.rows_drawn, 0);
        assert_eq!(layout.page_breaks, 0);
        assert_eq!(canvas.cells().len(), 4);
        assert!(!canvas.ops.contains(&Op::NewPage));
        assert_eq!(canvas.y, mm(256.5));
    }

    #[test]
    fn header_is_centred_and_body_defaults_to_left() {
        let mut canvas = ScriptedCanvas::new(20.0);
        let columns = vec![ColumnSpec::new("A").width(30.0), ColumnSpec::new("B").width(30.0)];
        TableLayoutEngine::new()
            .render_table(&mut canvas, &columns, &[["1", "2"]], mm(8.0), &TableOptions::default())
            .expect("render");
        let cells = canvas.cells();
        assert_eq!(cells.len(), 4);
        for (i, cell) in cells.iter().enumerate() {
            let Op::Cell { align, fill, .. } = cell else {
                unreachable!()
            };
            if i < 2 {
                assert_eq!(*align, TextAlign::Center);
                assert!(*fill);
            } else {
                assert_eq!(*align, TextAlign::Left);
                assert!(!*fill);
            }
        }
    }

    #[test]
    fn header_ignores_column_alignment() {
        let mut canvas = ScriptedCanvas::new(20.0);
        TableLayoutEngine::new()
            .render_table(&mut canvas, &statement_columns(), &rows(1), mm(6.5), &TableOptions::default())
            .expect("render");
        let aligns: Vec<TextAlign> = canvas
            .cells()
            .iter()
            .filter_map(|op| match op {
                Op::Cell { align, .. } => Some(*align),
                _ => None,
            })
            .collect();
        assert_eq!(
            aligns,
            vec![
                TextAlign::Center,
                TextAlign::Center,
                TextAlign::Center,
                TextAlign::Center,
                TextAlign::Left,
                TextAlign::Center,
                TextAlign::Right,
                TextAlign::Right,
            ]
        );
    }

    #[test]
    fn omitted_widths_share_the_content_width() {
        let mut canvas = ScriptedCanvas::new(20.0);
        let columns = vec![
            ColumnSpec::new("A"),
            ColumnSpec::new("B").width(66.0),
            ColumnSpec::new("C"),
        ];
        let layout = TableLayoutEngine::new()
            .render_table(&mut canvas, &columns, &[["a", "b", "c"]], mm(8.0), &TableOptions::default())
            .expect("render");
        let widths: Vec<Length> = canvas
            .cells()
            .iter()
            .take(3)
            .filter_map(|op| match op {
                Op::Cell { width, .. } => Some(*width),
                _ => None,
            })
            .collect();
        assert_eq!(widths, vec![mm(60.0), mm(66.0), mm(60.0)]);
        assert_eq!(layout.grid.map(|g| g.rect.width), Some(mm(186.0)));
    }

    #[test]
    fn outer_grid_wraps_header_and_rows() {
        let mut canvas = ScriptedCanvas::new(40.0);
        let layout = TableLayoutEngine::new()
            .render_table(&mut canvas, &statement_columns(), &rows(3), mm(6.5), &TableOptions::default())
            .expect("render");
        let grid = layout.grid.expect("grid");
        assert_eq!(grid.rect.height, mm(26.0));
        assert_eq!(grid.rect.width, mm(186.0));
        assert_eq!(grid.rect.x, mm(12.0));
        assert_eq!(grid.rect.y, mm(40.0));
        assert_eq!(grid.body_rows, 3);

        let tail: Vec<&Op> = canvas.ops.iter().rev().take(3).collect();
        assert_eq!(tail[0], &Op::StrokeWidth(DrawStyle::default().stroke_width));
        assert_eq!(tail[1], &Op::Rect(mm(12.0), mm(40.0), mm(186.0), mm(26.0)));
        assert_eq!(tail[2], &Op::StrokeWidth(mm(0.7)));
    }

    #[test]
    fn threshold_follows_row_height_plus_slack() {
        let canvas = ScriptedCanvas::new(250.0);
        let engine = TableLayoutEngine::new();
        assert_eq!(engine.break_threshold(&canvas, mm(6.5)), mm(277.0));
        let engine = engine.with_break_slack(mm(2.0));
        assert_eq!(engine.break_threshold(&canvas, mm(8.0)), mm(275.0));
    }

    #[test]
    fn overflow_from_250_breaks_before_the_fifth_row() {
        // Body rows start at 256.5 and the threshold is 297 - 12 - 8 = 277.
        let mut canvas = ScriptedCanvas::new(250.0);
        let layout = TableLayoutEngine::new()
            .render_table(&mut canvas, &statement_columns(), &rows(6), mm(6.5), &TableOptions::default())
            .expect("render");
        assert_eq!(layout.page_breaks, 1);
        assert_eq!(layout.header_replays, 1);
        assert_eq!(layout.break_rows, vec![4]);
        assert_eq!(layout.rows_on_last_page, 2);

        let page_break = canvas.ops.iter().position(|op| *op == Op::NewPage).expect("break");
        // Header replay comes right after the break, before row 4.
        let replay: Vec<&Op> = canvas.ops[page_break + 1..page_break + 5].iter().collect();
        for (op, column) in replay.iter().zip(statement_columns()) {
            assert!(matches!(op, Op::Cell { text, fill: true, align: TextAlign::Center, .. } if *text == column.header));
        }
        let next_cell = canvas.ops[page_break + 5..]
            .iter()
            .find(|op| matches!(op, Op::Cell { .. }));
        assert!(matches!(next_cell, Some(Op::Cell { text, .. }) if text == "line 4"));
    }

    #[test]
    fn outer_grid_covers_only_the_last_page_segment() {
        let mut canvas = ScriptedCanvas::new(250.0);
        let layout = TableLayoutEngine::new()
            .render_table(&mut canvas, &statement_columns(), &rows(6), mm(6.5), &TableOptions::default())
            .expect("render");
        let grid = layout.grid.expect("grid");
        assert_eq!(grid.body_rows, 2);
        assert_eq!(grid.rect.y, mm(12.0));
        assert_eq!(grid.rect.height, mm(19.5));
    }

    #[test]
    fn header_replays_match_page_breaks_over_many_pages() {
        let mut canvas = statement_canvas();
        let layout = TableLayoutEngine::new()
            .render_table(&mut canvas, &statement_columns(), &rows(120), mm(6.5), &TableOptions::default())
            .expect("render");
        let doc = canvas.finish();
        assert!(layout.page_breaks >= 2);
        assert_eq!(layout.header_replays, layout.page_breaks);
        assert_eq!(layout.break_rows.len(), layout.page_breaks);
        assert_eq!(doc.pages.len(), layout.page_breaks + 1);
        for page in &doc.pages {
            assert_eq!(header_markers(page), 1);
            assert_eq!(texts(page)[..4], ["Item", "Period", "kWh", "Amount"]);
        }
        let body_rows: usize = doc
            .pages
            .iter()
            .map(|p| texts(p).iter().filter(|t| t.starts_with("line ")).count())
            .sum();
        assert_eq!(body_rows, 120);
    }

    #[test]
    fn rows_never_cross_the_bottom_margin() {
        let mut canvas = statement_canvas();
        TableLayoutEngine::new()
            .render_table(&mut canvas, &statement_columns(), &rows(90), mm(6.5), &TableOptions::default())
            .expect("render");
        let doc = canvas.finish();
        for page in &doc.pages {
            for cmd in &page.commands {
                if let Command::StrokeRect { y, height, .. } = cmd {
                    assert!(*y + *height <= mm(285.0));
                }
            }
        }
    }

    #[test]
    fn mismatched_row_fails_without_drawing_it() {
        let mut canvas = ScriptedCanvas::new(20.0);
        let mut body = rows(3);
        body[1].pop();
        let err = TableLayoutEngine::new()
            .render_table(&mut canvas, &statement_columns(), &body, mm(6.5), &TableOptions::default())
            .expect_err("row 1 is short");
        match err {
            LayoutError::SchemaMismatch { row, expected, found } => {
                assert_eq!((row, expected, found), (1, 4, 3));
            }
            other => panic!("unexpected error {other:?}"),
        }
        // Header and row 0 only.
        assert_eq!(canvas.cells().len(), 8);
        assert!(!canvas.ops.iter().any(|op| matches!(op, Op::Rect(..))));
        assert_eq!(canvas.style, DrawStyle::default());
    }

    #[test]
    fn row_with_extra_cell_fails_without_drawing_it() {
        let mut canvas = ScriptedCanvas::new(20.0);
        let mut body = rows(3);
        body[2].push("surplus".to_string());
        let err = TableLayoutEngine::new()
            .render_table(&mut canvas, &statement_columns(), &body, mm(6.5), &TableOptions::default())
            .expect_err("row 2 is long");
        match err {
            LayoutError::SchemaMismatch { row, expected, found } => {
                assert_eq!((row, expected, found), (2, 4, 5));
            }
            other => panic!("unexpected error {other:?}"),
        }
        // Header, row 0 and row 1.
        assert_eq!(canvas.cells().len(), 12);
        assert!(!canvas.ops.iter().any(|op| matches!(
            op,
            Op::Cell { text, .. } if text == "line 2" || text == "surplus"
        )));
    }

    #[test]
    fn header_starting_below_threshold_moves_to_next_page() {
        let mut canvas = statement_canvas();
        canvas.set_xy(mm(12.0), mm(281.0));
        let columns = vec![ColumnSpec::new("A").width(40.0), ColumnSpec::new("B").width(40.0)];
        let body = [["a", "b"], ["c", "d"], ["e", "f"]];
        let layout = TableLayoutEngine::new()
            .render_table(&mut canvas, &columns, &body, mm(6.5), &TableOptions::default())
            .expect("render");
        assert_eq!(layout.page_breaks, 1);
        assert_eq!(layout.header_replays, 0);
        assert!(layout.break_rows.is_empty());
        assert_eq!(layout.rows_on_last_page, 3);

        let doc = canvas.finish();
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(header_markers(&doc.pages[0]), 0);
        assert!(texts(&doc.pages[0]).is_empty());
        assert_eq!(header_markers(&doc.pages[1]), 1);
        assert_eq!(texts(&doc.pages[1]), ["A", "B", "a", "b", "c", "d", "e", "f"]);
        let grid = layout.grid.expect("grid");
        assert_eq!(grid.rect.y, mm(12.0));
        assert_eq!(grid.rect.height, mm(26.0));
    }

    #[test]
    fn scripted_header_break_is_counted_once() {
        let mut canvas = ScriptedCanvas::new(281.0);
        let layout = TableLayoutEngine::new()
            .render_table(&mut canvas, &statement_columns(), &rows(2), mm(6.5), &TableOptions::default())
            .expect("render");
        assert_eq!(canvas.ops.first(), Some(&Op::NewPage));
        assert_eq!(canvas.ops.iter().filter(|op| **op == Op::NewPage).count(), 1);
        assert_eq!(layout.page_breaks, 1);
        assert_eq!(layout.header_replays, 0);
        assert_eq!(layout.rows_drawn, 2);
    }

    #[test]
    fn mismatched_row_does_not_trigger_a_page_break() {
        // Header fits at 275; the first body row would start at 281.5.
        let mut canvas = ScriptedCanvas::new(275.0);
        let err = TableLayoutEngine::new()
            .render_table(&mut canvas, &statement_columns(), &[vec!["only one"]], mm(6.5), &TableOptions::default())
            .expect_err("short row");
        assert!(matches!(err, LayoutError::SchemaMismatch { row: 0, .. }));
        assert!(!canvas.ops.contains(&Op::NewPage));
    }

    #[test]
    fn invalid_geometry_is_rejected_up_front() {
        let engine = TableLayoutEngine::new();
        let options = TableOptions::default();

        let mut canvas = ScriptedCanvas::new(20.0);
        let err = engine
            .render_table(&mut canvas, &statement_columns(), &rows(1), Length::ZERO, &options)
            .expect_err("zero row height");
        assert!(matches!(err, LayoutError::InvalidGeometry(_)));

        let columns = vec![ColumnSpec::new("A").width(0.0), ColumnSpec::new("B").width(20.0)];
        let err = engine
            .render_table(&mut canvas, &columns, &[["a", "b"]], mm(6.5), &options)
            .expect_err("zero width");
        assert!(matches!(err, LayoutError::InvalidGeometry(_)));

        let err = engine
            .render_table(&mut canvas, &[], &Vec::<Vec<String>>::new(), mm(6.5), &options)
            .expect_err("no columns");
        assert!(matches!(err, LayoutError::InvalidGeometry(_)));

        let columns = vec![ColumnSpec::new("A").width(186.0), ColumnSpec::new("B")];
        let err = engine
            .render_table(&mut canvas, &columns, &[["a", "b"]], mm(6.5), &options)
            .expect_err("no room left");
        assert!(matches!(err, LayoutError::InvalidGeometry(_)));

        assert!(canvas.ops.is_empty());
    }

    #[test]
    fn identical_inputs_record_identical_commands() {
        let render = || {
            let mut canvas = statement_canvas();
            TableLayoutEngine::new()
                .render_table(&mut canvas, &statement_columns(), &rows(70), mm(6.5), &TableOptions::default())
                .expect("render");
            canvas.finish()
        };
        assert_eq!(render(), render());
    }

    #[test]
    fn header_style_is_scoped() {
        let mut canvas = statement_canvas();
        canvas.set_text_color(Color::rgb8(10, 20, 30));
        let before = canvas.style();
        let options = TableOptions {
            header_font_size: Some(11.0),
            body_font_size: Some(10.0),
            ..TableOptions::default()
        };
        TableLayoutEngine::new()
            .render_table(&mut canvas, &statement_columns(), &rows(2), mm(6.5), &options)
            .expect("render");
        assert_eq!(canvas.style(), before);

        let doc = canvas.finish();
        let sizes: Vec<f32> = doc.pages[0]
            .commands
            .iter()
            .filter_map(|cmd| match cmd {
                Command::SetFontSize(size) => Some(*size),
                _ => None,
            })
            .collect();
        assert_eq!(sizes, vec![11.0, 10.0]);
    }

    #[test]
    fn table_starting_mid_page_keeps_its_left_edge() {
        let mut canvas = statement_canvas();
        canvas.set_xy(mm(30.0), mm(270.0));
        let columns = vec![ColumnSpec::new("A").width(40.0), ColumnSpec::new("B").width(40.0)];
        let body: Vec<[&str; 2]> = vec![["a", "b"]; 4];
        let layout = TableLayoutEngine::new()
            .render_table(&mut canvas, &columns, &body, mm(6.5), &TableOptions::default())
            .expect("render");
        assert_eq!(layout.page_breaks, 1);
        let doc = canvas.finish();
        let lefts: Vec<Length> = doc
            .pages
            .iter()
            .flat_map(|p| p.commands.iter())
            .filter_map(|cmd| match cmd {
                Command::DrawRect { x, .. } => Some(*x),
                _ => None,
            })
            .collect();
        assert_eq!(lefts, vec![mm(30.0), mm(70.0), mm(30.0), mm(70.0)]);
        assert_eq!(layout.grid.map(|g| g.rect.x), Some(mm(30.0)));
    }

    #[test]
    fn table_spec_loads_from_json() {
        let spec = TableSpec::from_json_str(
            r#"{
                "columns": [
                    {"header": "GROUP PD", "width": 40},
                    {"header": "KWH (UT)", "width": 30, "align": "R"},
                    {"header": "AMOUNT", "align": "right"}
                ],
                "row_height": 6.5,
                "options": {"draw_outer_grid": false, "header_fill": {"r": 0.7, "g": 0.87, "b": 0.9}}
            }"#,
        )
        .expect("parse");
        assert_eq!(spec.columns[0].width, Some(mm(40.0)));
        assert_eq!(spec.columns[0].align, None);
        assert_eq!(spec.columns[1].align, Some(TextAlign::Right));
        assert_eq!(spec.columns[2].align, Some(TextAlign::Right));
        assert_eq!(spec.row_height, mm(6.5));
        assert!(!spec.options.draw_outer_grid);
        assert_eq!(spec.options.header_text_color, TableOptions::default().header_text_color);

        let mut canvas = ScriptedCanvas::new(20.0);
        let layout = TableLayoutEngine::new()
            .render_spec(&mut canvas, &spec, &[["K1PD01", "3000.00", "40000.00"]])
            .expect("render");
        assert_eq!(layout.rows_drawn, 1);
        assert!(layout.grid.is_none());

        assert!(matches!(
            TableSpec::from_json_str("{\"columns\": 3}"),
            Err(LayoutError::Json(_))
        ));
    }

    #[test]
    fn debug_logger_records_breaks() {
        let path = std::env::temp_dir().join(format!(
            "billgrid_table_{}_{}.jsonl",
            std::process::id(),
            line!()
        ));
        let logger = Arc::new(DebugLogger::new(&path).expect("log"));
        let mut canvas = ScriptedCanvas::new(250.0);
        TableLayoutEngine::new()
            .with_debug_logger(Some(logger.clone()))
            .render_table(&mut canvas, &statement_columns(), &rows(6), mm(6.5), &TableOptions::default())
            .expect("render");
        logger.flush();
        let text = std::fs::read_to_string(&path).expect("read");
        let kinds: Vec<String> = text
            .lines()
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).expect("json");
                value["type"].as_str().unwrap_or_default().to_string()
            })
            .collect();
        assert_eq!(kinds, vec!["table.begin", "table.page_break", "table.end"]);
        let _ = std::fs::remove_file(&path);
    }
}
