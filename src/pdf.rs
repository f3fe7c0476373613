use crate::canvas::{Command, Document, Page};
use crate::metrics::{DocumentMetrics, PageMetrics};
use crate::types::{Color, Length};
use std::io;

#[derive(Debug, Clone)]
pub struct PdfOptions {
    pub title: Option<String>,
    pub producer: String,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            title: None,
            producer: "billgrid".to_string(),
        }
    }
}

const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;
const FONT_ID: usize = 3;
const INFO_ID: usize = 4;
const FIRST_PAGE_ID: usize = 5;

pub fn document_to_pdf(document: &Document, options: &PdfOptions) -> io::Result<Vec<u8>> {
    document_to_pdf_with_metrics(document, options, None)
}

/// Serializes a recorded document as PDF 1.7 with one base-14 Helvetica font.
///
/// Every page gets a page object followed by its content stream. Document units are
/// scaled to points and the y axis is flipped so that recorded coordinates can stay
/// top-down.
pub fn document_to_pdf_with_metrics(
    document: &Document,
    options: &PdfOptions,
    mut metrics: Option<&mut DocumentMetrics>,
) -> io::Result<Vec<u8>> {
    if document.pages.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "document has no pages",
        ));
    }
    let scale = Scale {
        points_per_unit: document.unit.points_per_unit() as f64,
        page_height: document.page_size.height,
    };
    let width = scale.len(document.page_size.width);
    let height = scale.len(document.page_size.height);

    let mut objects: Vec<String> = Vec::with_capacity(FIRST_PAGE_ID - 1 + document.pages.len() * 2);
    let kids = (0..document.pages.len())
        .map(|index| format!("{} 0 R", FIRST_PAGE_ID + index * 2))
        .collect::<Vec<_>>()
        .join(" ");
    objects.push(format!("<< /Type /Catalog /Pages {} 0 R >>", PAGES_ID));
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids,
        document.pages.len()
    ));
    objects.push(
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    );
    objects.push(info_object(options));

    let mut replaced_total = 0usize;
    for (index, page) in document.pages.iter().enumerate() {
        let rendered = render_page(page, &scale);
        replaced_total += rendered.replaced;
        let page_id = FIRST_PAGE_ID + index * 2;
        objects.push(format!(
            "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources << /Font << /F1 {} 0 R >> >> /Contents {} 0 R >>",
            PAGES_ID,
            width,
            height,
            FONT_ID,
            page_id + 1
        ));
        if let Some(metrics) = metrics.as_deref_mut() {
            metrics.pages.push(PageMetrics {
                page_number: index + 1,
                command_count: page.commands.len(),
                text_count: page
                    .commands
                    .iter()
                    .filter(|cmd| matches!(cmd, Command::DrawString { .. }))
                    .count(),
                content_bytes: rendered.content.len(),
            });
        }
        objects.push(stream_object(&rendered.content));
    }

    if replaced_total > 0 {
        tracing::warn!(
            replaced = replaced_total,
            "characters outside WinAnsi were replaced with '?'"
        );
    }

    let bytes = build_pdf(&objects);
    if let Some(metrics) = metrics.as_deref_mut() {
        metrics.total_bytes = bytes.len();
        metrics.replaced_chars = replaced_total;
    }
    Ok(bytes)
}

struct Scale {
    points_per_unit: f64,
    page_height: Length,
}

impl Scale {
    fn len(&self, value: Length) -> String {
        let milli = (value.to_milli_i64() as f64 * self.points_per_unit).round() as i64;
        format_milli(milli)
    }

    fn y(&self, value: Length) -> String {
        self.len(self.page_height - value)
    }
}

struct RenderedPage {
    content: String,
    replaced: usize,
}

fn render_page(page: &Page, scale: &Scale) -> RenderedPage {
    let mut out = String::new();
    let mut replaced = 0usize;
    let mut font_size = 12.0f32;

    for cmd in &page.commands {
        match cmd {
            Command::Meta { .. } => {}
            Command::SetFillColor(color) => {
                out.push_str(&format!("{} rg\n", color_components(*color)));
            }
            Command::SetStrokeColor(color) => {
                out.push_str(&format!("{} RG\n", color_components(*color)));
            }
            Command::SetLineWidth(width) => {
                out.push_str(&format!("{} w\n", scale.len(*width)));
            }
            Command::SetFontSize(size) => font_size = *size,
            Command::MoveTo { x, y } => {
                out.push_str(&format!("{} {} m\n", scale.len(*x), scale.y(*y)));
            }
            Command::LineTo { x, y } => {
                out.push_str(&format!("{} {} l\n", scale.len(*x), scale.y(*y)));
            }
            Command::Stroke => out.push_str("S\n"),
            Command::DrawString { x, y, text } => {
                let encoded = encode_winansi(text);
                replaced += encoded.replaced;
                out.push_str("BT\n");
                out.push_str(&format!("/F1 {} Tf\n", fmt(font_size)));
                out.push_str(&format!("{} {} Td\n", scale.len(*x), scale.y(*y)));
                out.push_str(&format!("({}) Tj\n", encoded.text));
                out.push_str("ET\n");
            }
            Command::DrawRect {
                x,
                y,
                width,
                height,
            } => {
                out.push_str(&format!(
                    "{} {} {} {} re\nf\n",
                    scale.len(*x),
                    scale.y(*y + *height),
                    scale.len(*width),
                    scale.len(*height)
                ));
            }
            Command::StrokeRect {
                x,
                y,
                width,
                height,
            } => {
                out.push_str(&format!(
                    "{} {} {} {} re\nS\n",
                    scale.len(*x),
                    scale.y(*y + *height),
                    scale.len(*width),
                    scale.len(*height)
                ));
            }
        }
    }

    RenderedPage {
        content: out,
        replaced,
    }
}

fn info_object(options: &PdfOptions) -> String {
    let mut entries: Vec<String> = Vec::new();
    if let Some(title) = options.title.as_deref() {
        entries.push(format!("/Title ({})", encode_winansi(title).text));
    }
    entries.push(format!("/Producer ({})", encode_winansi(&options.producer).text));
    format!("<< {} >>", entries.join(" "))
}

fn stream_object(content: &str) -> String {
    format!(
        "<< /Length {} >>\nstream\n{}\nendstream",
        content.len(),
        content
    )
}

fn build_pdf(objects: &[String]) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(b"%PDF-1.7\n");
    out.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

    let mut offsets = Vec::with_capacity(objects.len());
    for (index, obj) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
        out.extend_from_slice(obj.as_bytes());
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF",
            objects.len() + 1,
            CATALOG_ID,
            INFO_ID,
            xref_start
        )
        .as_bytes(),
    );
    out
}

struct WinAnsiEncoded {
    text: String,
    replaced: usize,
}

// Escaped PDF string body in WinAnsi; anything it cannot hold becomes '?'.
fn encode_winansi(input: &str) -> WinAnsiEncoded {
    let mut text = String::with_capacity(input.len());
    let mut replaced = 0usize;
    for ch in input.chars() {
        match ch {
            '\\' => text.push_str("\\\\"),
            '(' => text.push_str("\\("),
            ')' => text.push_str("\\)"),
            '\n' | '\r' | '\t' => text.push(' '),
            ' '..='~' => text.push(ch),
            _ => match winansi_byte(ch) {
                Some(byte) => text.push_str(&format!("\\{:03o}", byte)),
                None => {
                    replaced += 1;
                    text.push('?');
                }
            },
        }
    }
    WinAnsiEncoded { text, replaced }
}

fn winansi_byte(ch: char) -> Option<u8> {
    let byte = match ch {
        '\u{20AC}' => 0x80,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{A0}'..='\u{FF}' => ch as u32 as u8,
        _ => return None,
    };
    Some(byte)
}

fn color_components(color: Color) -> String {
    format!(
        "{} {} {}",
        fmt(clamp_unit(color.r)),
        fmt(clamp_unit(color.g)),
        fmt(clamp_unit(color.b))
    )
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

fn fmt(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    format_milli((value as f64 * 1000.0).round() as i64)
}

fn format_milli(milli: i64) -> String {
    if milli == 0 {
        return "0".to_string();
    }
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.abs();
    let int_part = abs / 1000;
    let frac_part = abs % 1000;
    if frac_part == 0 {
        format!("{}{}", sign, int_part)
    } else {
        let mut s = format!("{}{}.{:03}", sign, int_part, frac_part);
        while s.ends_with('0') {
            s.pop();
        }
        s
    }
}
