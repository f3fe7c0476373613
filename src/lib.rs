mod blocks;
mod canvas;
mod debug;
mod doc_context;
mod error;
mod geometry;
mod metrics;
mod page_template;
mod pdf;
mod table;
mod types;

pub use blocks::{RowCell, SignatureBox, draw_row, section_title, signature_box};
pub use canvas::{
    Canvas, CanvasSettings, CellBorder, Command, Document, DrawStyle, Page, PageCanvas, TextAlign,
};
pub use debug::DebugLogger;
pub use doc_context::DocContext;
pub use error::{LayoutError, Result};
pub use geometry::PageGeometry;
pub use metrics::{DocumentMetrics, PageMetrics};
pub use page_template::{OnPageCallback, PageTemplate};
pub use pdf::{PdfOptions, document_to_pdf, document_to_pdf_with_metrics};
pub use table::{
    ColumnSpec, GridRegion, META_TABLE_GRID, META_TABLE_HEADER, TableLayout, TableLayoutEngine,
    TableOptions, TableSpec,
};
pub use types::{Color, Length, Margins, Rect, Size, Unit};

use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEBUG_LOG_ENV: &str = "BILLGRID_DEBUG_LOG";

/// Configured statement renderer: hands out fresh canvases, lays out tables and
/// serializes finished documents.
pub struct Billgrid {
    template: PageTemplate,
    settings: CanvasSettings,
    engine: TableLayoutEngine,
    pdf_options: PdfOptions,
    debug: Option<Arc<DebugLogger>>,
}

#[derive(Clone)]
pub struct BillgridBuilder {
    template_name: String,
    page_size: Size,
    margins: Margins,
    unit: Unit,
    auto_page_break: bool,
    style: DrawStyle,
    cell_padding: Length,
    break_slack: Length,
    outer_grid_width: Length,
    pdf_options: PdfOptions,
    debug_path: Option<PathBuf>,
    page_header: Option<OnPageCallback>,
    page_footer: Option<OnPageCallback>,
}

impl Default for BillgridBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BillgridBuilder {
    /// A4 portrait in millimetres with 12mm margins and a light grey 0.3mm rule.
    pub fn new() -> Self {
        Self {
            template_name: "statement".to_string(),
            page_size: Size::a4(),
            margins: Margins::all(12.0),
            unit: Unit::Mm,
            auto_page_break: true,
            style: DrawStyle {
                stroke_color: Color::rgb8(154, 160, 166),
                stroke_width: Length::from_f32(0.3),
                ..DrawStyle::default()
            },
            cell_padding: Length::from_f32(1.0),
            break_slack: Length::from_f32(1.5),
            outer_grid_width: Length::from_f32(0.7),
            pdf_options: PdfOptions::default(),
            debug_path: None,
            page_header: None,
            page_footer: None,
        }
    }

    /// Like [`BillgridBuilder::new`], with the debug log path taken from
    /// `BILLGRID_DEBUG_LOG` when it is set and not blank.
    pub fn from_env() -> Self {
        let builder = Self::new();
        match std::env::var(DEBUG_LOG_ENV) {
            Ok(path) if !path.trim().is_empty() => builder.debug_log(path.trim()),
            _ => builder,
        }
    }

    pub fn template_name(mut self, name: impl Into<String>) -> Self {
        self.template_name = name.into();
        self
    }

    pub fn page_size(mut self, size: Size) -> Self {
        self.page_size = size;
        self
    }

    pub fn margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }

    pub fn margin_all(mut self, value: f32) -> Self {
        self.margins = Margins::all(value);
        self
    }

    /// Unit of every length handed to the canvas. Page size and margins are read in
    /// the same unit.
    pub fn unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    pub fn auto_page_break(mut self, enabled: bool) -> Self {
        self.auto_page_break = enabled;
        self
    }

    pub fn style(mut self, style: DrawStyle) -> Self {
        self.style = style;
        self
    }

    pub fn font_size(mut self, size: f32) -> Self {
        self.style.font_size = size;
        self
    }

    pub fn stroke_color(mut self, color: Color) -> Self {
        self.style.stroke_color = color;
        self
    }

    pub fn stroke_width(mut self, width: f32) -> Self {
        self.style.stroke_width = Length::from_f32(width);
        self
    }

    pub fn cell_padding(mut self, padding: f32) -> Self {
        self.cell_padding = Length::from_f32(padding);
        self
    }

    pub fn break_slack(mut self, slack: f32) -> Self {
        self.break_slack = Length::from_f32(slack);
        self
    }

    pub fn outer_grid_width(mut self, width: f32) -> Self {
        self.outer_grid_width = Length::from_f32(width);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.pdf_options.title = Some(title.into());
        self
    }

    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn page_header<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut Canvas, &DocContext) + Send + Sync + 'static,
    {
        self.page_header = Some(Arc::new(callback));
        self
    }

    pub fn page_footer<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut Canvas, &DocContext) + Send + Sync + 'static,
    {
        self.page_footer = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> Result<Billgrid> {
        validate_geometry(self.page_size, self.margins)?;
        if !self.style.font_size.is_finite() || self.style.font_size <= 0.0 {
            return Err(LayoutError::InvalidConfiguration(format!(
                "font size must be positive, got {}",
                self.style.font_size
            )));
        }
        if self.style.stroke_width < Length::ZERO {
            return Err(LayoutError::InvalidConfiguration(
                "stroke width must not be negative".to_string(),
            ));
        }
        if self.cell_padding < Length::ZERO {
            return Err(LayoutError::InvalidConfiguration(
                "cell padding must not be negative".to_string(),
            ));
        }
        if self.break_slack < Length::ZERO {
            return Err(LayoutError::InvalidConfiguration(
                "break slack must not be negative".to_string(),
            ));
        }
        if !self.outer_grid_width.is_positive() {
            return Err(LayoutError::InvalidConfiguration(
                "outer grid width must be positive".to_string(),
            ));
        }

        let debug = match self.debug_path {
            Some(path) => Some(Arc::new(DebugLogger::new(path)?)),
            None => None,
        };
        let template = PageTemplate::new(self.template_name, self.page_size, self.margins)
            .with_callbacks(self.page_header, self.page_footer);
        let settings = CanvasSettings {
            unit: self.unit,
            style: self.style,
            cell_padding: self.cell_padding,
            auto_page_break: self.auto_page_break,
        };
        let engine = TableLayoutEngine::new()
            .with_break_slack(self.break_slack)
            .with_outer_grid_width(self.outer_grid_width)
            .with_debug_logger(debug.clone());

        Ok(Billgrid {
            template,
            settings,
            engine,
            pdf_options: self.pdf_options,
            debug,
        })
    }
}

fn validate_geometry(page_size: Size, margins: Margins) -> Result<()> {
    if !page_size.width.is_positive() || !page_size.height.is_positive() {
        return Err(LayoutError::InvalidConfiguration(format!(
            "page size must be positive, got {}x{}",
            page_size.width.to_f32(),
            page_size.height.to_f32()
        )));
    }
    let sides = [margins.top, margins.right, margins.bottom, margins.left];
    if sides.iter().any(|side| *side < Length::ZERO) {
        return Err(LayoutError::InvalidConfiguration(
            "margins must not be negative".to_string(),
        ));
    }
    if !(page_size.width - margins.left - margins.right).is_positive()
        || !(page_size.height - margins.top - margins.bottom).is_positive()
    {
        return Err(LayoutError::InvalidConfiguration(
            "margins leave no room for content".to_string(),
        ));
    }
    Ok(())
}

impl Billgrid {
    pub fn builder() -> BillgridBuilder {
        BillgridBuilder::new()
    }

    /// Fresh recording canvas for one document. No page is open until something is
    /// drawn or [`Canvas::new_page`] is called.
    pub fn canvas(&self) -> Canvas {
        Canvas::new(self.template.clone(), self.settings)
    }

    pub fn template(&self) -> &PageTemplate {
        &self.template
    }

    pub fn table_engine(&self) -> &TableLayoutEngine {
        &self.engine
    }

    pub fn debug_logger(&self) -> Option<&Arc<DebugLogger>> {
        self.debug.as_ref()
    }

    pub fn render_table<R, S>(
        &self,
        canvas: &mut Canvas,
        columns: &[ColumnSpec],
        rows: &[R],
        row_height: f32,
        options: &TableOptions,
    ) -> Result<TableLayout>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        self.engine
            .render_table(canvas, columns, rows, Length::from_f32(row_height), options)
    }

    /// Fails with [`LayoutError::InvalidConfiguration`] when nothing was drawn, since
    /// a PDF needs at least one page.
    pub fn render_pdf(&self, document: &Document) -> Result<Vec<u8>> {
        ensure_pages(document)?;
        Ok(document_to_pdf(document, &self.pdf_options)?)
    }

    pub fn render_pdf_with_metrics(&self, document: &Document) -> Result<(Vec<u8>, DocumentMetrics)> {
        ensure_pages(document)?;
        let mut metrics = DocumentMetrics::default();
        let bytes = document_to_pdf_with_metrics(document, &self.pdf_options, Some(&mut metrics))?;
        Ok((bytes, metrics))
    }

    /// Serializes `document` to `path` and returns what was written. The debug log,
    /// when configured, gets a `pdf.write` event and its summary line.
    pub fn write_pdf(&self, document: &Document, path: impl AsRef<Path>) -> Result<DocumentMetrics> {
        let path = path.as_ref();
        let (bytes, metrics) = self.render_pdf_with_metrics(document)?;
        std::fs::write(path, &bytes)?;
        tracing::debug!(
            path = %path.display(),
            pages = metrics.pages.len(),
            bytes = metrics.total_bytes,
            "pdf written"
        );
        if let Some(debug) = &self.debug {
            debug.log_event(
                "pdf.write",
                json!({
                    "path": path.display().to_string(),
                    "pages": metrics.pages.len(),
                    "bytes": metrics.total_bytes,
                    "replaced_chars": metrics.replaced_chars,
                }),
            );
            debug.emit_summary(&self.template.name);
            debug.flush();
        }
        Ok(metrics)
    }
}

fn ensure_pages(document: &Document) -> Result<()> {
    if document.pages.is_empty() {
        return Err(LayoutError::InvalidConfiguration(
            "document has no pages".to_string(),
        ));
    }
    Ok(())
}
