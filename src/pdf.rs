use crate::canvas::{Command, Document, Page};
use crate::error::RouteError;
use crate::font::PdfFont;
use crate::layout::{self, CARD_META_KEY, DEFAULT_FONT_SIZE, LayoutOptions};
use crate::metrics::{DocumentMetrics, HashingWriter, PageMetrics};
use crate::types::{Pt, Size};
use crate::waypoint::Waypoint;
use std::collections::BTreeSet;
use std::io::{self, Write};

const PDF_HEADER: &[u8] = b"%PDF-1.7\n";
const PDF_BINARY_COMMENT: &[u8] = b"%\xE2\xE3\xCF\xD3\n";
const PDF_CATALOG_ID: usize = 1;
const PDF_PAGES_ID: usize = 2;
const FONT_RESOURCE: &str = "F1";

pub fn page_object_id(index: usize) -> usize {
    3 + 2 * index
}

pub fn content_object_id(index: usize) -> usize {
    4 + 2 * index
}

// The font follows the last page's content stream.
pub fn font_object_id(page_count: usize) -> usize {
    3 + 2 * page_count
}

#[derive(Debug, Clone)]
enum PdfObject {
    Catalog,
    Pages { kids: Vec<usize> },
    Page { content_id: usize, font_id: usize },
    ContentStream(String),
    Font(String),
}

impl PdfObject {
    fn body(&self, page_size: Size) -> String {
        match self {
            PdfObject::Catalog => {
                format!("<< /Type /Catalog /Pages {} 0 R >>", PDF_PAGES_ID)
            }
            PdfObject::Pages { kids } => {
                let refs = kids
                    .iter()
                    .map(|id| format!("{} 0 R", id))
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("<< /Type /Pages /Kids [{}] /Count {} >>", refs, kids.len())
            }
            PdfObject::Page {
                content_id,
                font_id,
            } => format!(
                "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources << /Font << /{} {} 0 R >> >> /Contents {} 0 R >>",
                PDF_PAGES_ID,
                fmt_pt(page_size.width),
                fmt_pt(page_size.height),
                FONT_RESOURCE,
                font_id,
                content_id
            ),
            PdfObject::ContentStream(content) => stream_object(content),
            PdfObject::Font(body) => body.clone(),
        }
    }
}

// Index 0 holds object 1.
struct PdfArena {
    objects: Vec<PdfObject>,
}

impl PdfArena {
    fn build(document: &Document, font: &dyn PdfFont, used: &BTreeSet<char>) -> Self {
        let page_count = document.pages.len();
        let font_id = font_object_id(page_count);
        let mut objects = Vec::with_capacity(2 + page_count * 2 + 1);
        objects.push(PdfObject::Catalog);
        objects.push(PdfObject::Pages {
            kids: (0..page_count).map(page_object_id).collect(),
        });
        for (index, page) in document.pages.iter().enumerate() {
            objects.push(PdfObject::Page {
                content_id: content_object_id(index),
                font_id,
            });
            objects.push(PdfObject::ContentStream(render_page(page, font)));
        }
        for body in font.font_objects(font_id, used) {
            objects.push(PdfObject::Font(body));
        }
        Self { objects }
    }

    fn render(&self, page_size: Size) -> Vec<String> {
        self.objects
            .iter()
            .map(|object| object.body(page_size))
            .collect()
    }
}

pub fn encode_waypoints(
    waypoints: &[Waypoint],
    font: &dyn PdfFont,
    options: &LayoutOptions,
) -> Result<Vec<u8>, RouteError> {
    let mut out = Vec::new();
    encode_waypoints_to_writer(waypoints, font, options, &mut out)?;
    Ok(out)
}

pub fn encode_waypoints_to_writer<W: Write>(
    waypoints: &[Waypoint],
    font: &dyn PdfFont,
    options: &LayoutOptions,
    writer: &mut W,
) -> Result<DocumentMetrics, RouteError> {
    let document = layout::layout_document(waypoints, font, options)?;
    document_to_pdf_to_writer(&document, font, writer)
}

pub fn document_to_pdf(document: &Document, font: &dyn PdfFont) -> Result<Vec<u8>, RouteError> {
    document_to_pdf_with_metrics(document, font).map(|(bytes, _)| bytes)
}

pub fn document_to_pdf_with_metrics(
    document: &Document,
    font: &dyn PdfFont,
) -> Result<(Vec<u8>, DocumentMetrics), RouteError> {
    let mut out = Vec::new();
    let metrics = document_to_pdf_to_writer(document, font, &mut out)?;
    Ok((out, metrics))
}

// Bodies are rendered up front so every offset is known before writing.
pub fn document_to_pdf_to_writer<W: Write>(
    document: &Document,
    font: &dyn PdfFont,
    writer: &mut W,
) -> Result<DocumentMetrics, RouteError> {
    if document.pages.is_empty() {
        return Err(RouteError::EmptyRoute);
    }
    let used = used_chars(document);
    if let Some(ch) = used.iter().find(|ch| !font.supports(**ch)) {
        return Err(RouteError::Font(format!(
            "{} cannot encode {:?}",
            font.name(),
            ch
        )));
    }
    let arena = PdfArena::build(document, font, &used);
    let bodies = arena.render(document.page_size);
    let (offsets, xref_start) = compute_offsets(&bodies);

    let mut hashing = HashingWriter::new(writer);
    let mut offset = 0usize;
    write_bytes(&mut hashing, PDF_HEADER, &mut offset)?;
    write_bytes(&mut hashing, PDF_BINARY_COMMENT, &mut offset)?;
    for (index, body) in bodies.iter().enumerate() {
        debug_assert_eq!(offset, offsets[index]);
        write_pdf_object(&mut hashing, &mut offset, index + 1, body)?;
    }
    debug_assert_eq!(offset, xref_start);
    write_str(&mut hashing, &xref_table(&offsets), &mut offset)?;
    write_str(&mut hashing, &trailer(bodies.len(), xref_start), &mut offset)?;
    hashing.flush()?;
    let (total_bytes, sha256) = hashing.finish();

    let pages = document
        .pages
        .iter()
        .enumerate()
        .map(|(index, page)| PageMetrics {
            page_number: index + 1,
            card_count: page.meta_values(CARD_META_KEY).count(),
            command_count: page.commands.len(),
            content_bytes: match &arena.objects[content_object_id(index) - 1] {
                PdfObject::ContentStream(content) => content.len(),
                _ => 0,
            },
        })
        .collect();

    Ok(DocumentMetrics {
        pages,
        object_count: bodies.len(),
        total_bytes,
        sha256,
    })
}

fn compute_offsets(bodies: &[String]) -> (Vec<usize>, usize) {
    let mut offset = PDF_HEADER.len() + PDF_BINARY_COMMENT.len();
    let mut offsets = Vec::with_capacity(bodies.len());
    for (index, body) in bodies.iter().enumerate() {
        offsets.push(offset);
        offset += object_header(index + 1).len() + body.len() + OBJECT_FOOTER.len();
    }
    (offsets, offset)
}

const OBJECT_FOOTER: &str = "\nendobj\n";

fn object_header(obj_id: usize) -> String {
    format!("{} 0 obj\n", obj_id)
}

fn xref_table(offsets: &[usize]) -> String {
    let mut out = format!("xref\n0 {}\n", offsets.len() + 1);
    out.push_str("0000000000 65535 f \n");
    for offset in offsets {
        out.push_str(&format!("{:010} 00000 n \n", offset));
    }
    out
}

fn trailer(object_count: usize, xref_start: usize) -> String {
    format!(
        "trailer\n<< /Size {} /Root {} 0 R >>\nstartxref\n{}\n%%EOF",
        object_count + 1,
        PDF_CATALOG_ID,
        xref_start
    )
}

fn write_pdf_object<W: Write>(
    writer: &mut W,
    offset: &mut usize,
    obj_id: usize,
    body: &str,
) -> io::Result<()> {
    write_str(writer, &object_header(obj_id), offset)?;
    write_bytes(writer, body.as_bytes(), offset)?;
    write_str(writer, OBJECT_FOOTER, offset)?;
    Ok(())
}

fn write_bytes<W: Write>(writer: &mut W, data: &[u8], offset: &mut usize) -> io::Result<()> {
    writer.write_all(data)?;
    *offset += data.len();
    Ok(())
}

fn write_str<W: Write>(writer: &mut W, data: &str, offset: &mut usize) -> io::Result<()> {
    write_bytes(writer, data.as_bytes(), offset)
}

fn render_page(page: &Page, font: &dyn PdfFont) -> String {
    let mut ops: Vec<String> = Vec::new();
    let mut font_size = Pt::from_f32(DEFAULT_FONT_SIZE);
    for command in &page.commands {
        match command {
            Command::Meta { .. } => {}
            Command::SetLineWidth(width) => ops.push(format!("{} w", fmt_pt(*width))),
            Command::SetFontSize(size) => font_size = *size,
            Command::MoveTo { x, y } => ops.push(format!("{} {} m", fmt_pt(*x), fmt_pt(*y))),
            Command::LineTo { x, y } => ops.push(format!("{} {} l", fmt_pt(*x), fmt_pt(*y))),
            Command::Stroke => ops.push("S".to_string()),
            Command::StrokeRect {
                x,
                y,
                width,
                height,
            } => ops.push(format!(
                "{} {} {} {} re S",
                fmt_pt(*x),
                fmt_pt(*y),
                fmt_pt(*width),
                fmt_pt(*height)
            )),
            Command::DrawString { x, y, text } => ops.push(format!(
                "BT /{} {} Tf {} {} Td {} Tj ET",
                FONT_RESOURCE,
                fmt_pt(font_size),
                fmt_pt(*x),
                fmt_pt(*y),
                font.encode_text(text)
            )),
        }
    }
    ops.join("\n")
}

fn used_chars(document: &Document) -> BTreeSet<char> {
    document
        .pages
        .iter()
        .flat_map(|page| page.strings())
        .flat_map(str::chars)
        .collect()
}

pub(crate) fn stream_object(content: &str) -> String {
    stream_with_entries("", content)
}

// `entries` is spliced into the stream dictionary after /Length.
pub(crate) fn stream_with_entries(entries: &str, content: &str) -> String {
    format!(
        "<< /Length {}{} >>\nstream\n{}\nendstream",
        content.len(),
        entries,
        content
    )
}

// 64 hex digits per line; the caller appends the `>` terminator.
pub(crate) fn ascii_hex_encode(data: &[u8]) -> String {
    data.chunks(32)
        .map(|row| row.iter().map(|b| format!("{b:02X}")).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

fn fmt_pt(value: Pt) -> String {
    let milli = value.milli();
    let sign = if milli < 0 { "-" } else { "" };
    let whole = milli.unsigned_abs() / 1000;
    let frac = milli.unsigned_abs() % 1000;
    if frac == 0 {
        return format!("{sign}{whole}");
    }
    let digits = format!("{frac:03}");
    format!("{sign}{whole}.{}", digits.trim_end_matches('0'))
}
