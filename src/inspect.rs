use lopdf::Document as LoDocument;
use lopdf::content::Content;
use std::fmt;
use std::path::Path;

#[derive(Debug)]
pub enum InspectError {
    Io(std::io::Error),
    Parse(lopdf::Error),
    Encrypted,
    NoPages,
}

impl fmt::Display for InspectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InspectError::Io(err) => write!(f, "cannot read route document: {}", err),
            InspectError::Parse(err) => write!(f, "route document does not parse: {}", err),
            InspectError::Encrypted => write!(f, "route document is encrypted"),
            InspectError::NoPages => write!(f, "route document has no pages"),
        }
    }
}

impl std::error::Error for InspectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InspectError::Io(err) => Some(err),
            InspectError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageReport {
    pub content_bytes: usize,
    pub text_shows: usize,
    pub strokes: usize,
}

// What an independent parser sees in an exported route document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectReport {
    pub version: String,
    pub object_count: usize,
    pub encrypted: bool,
    pub pages: Vec<PageReport>,
}

impl InspectReport {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn ensure_printable(&self) -> Result<(), InspectError> {
        if self.encrypted {
            Err(InspectError::Encrypted)
        } else if self.pages.is_empty() {
            Err(InspectError::NoPages)
        } else {
            Ok(())
        }
    }
}

pub fn inspect_pdf(bytes: &[u8]) -> Result<InspectReport, InspectError> {
    let pdf = LoDocument::load_mem(bytes).map_err(InspectError::Parse)?;
    let pages = pdf
        .get_pages()
        .into_values()
        .map(|page_id| -> Result<PageReport, InspectError> {
            let raw = pdf.get_page_content(page_id).map_err(InspectError::Parse)?;
            let content = Content::decode(&raw).map_err(InspectError::Parse)?;
            let count = |op: &str| content.operations.iter().filter(|o| o.operator == op).count();
            Ok(PageReport {
                content_bytes: raw.len(),
                text_shows: count("Tj"),
                strokes: count("S"),
            })
        })
        .collect::<Result<Vec<_>, InspectError>>()?;

    Ok(InspectReport {
        version: pdf.version.clone(),
        object_count: pdf.objects.len(),
        encrypted: pdf.is_encrypted(),
        pages,
    })
}

pub fn inspect_pdf_file(path: impl AsRef<Path>) -> Result<InspectReport, InspectError> {
    let bytes = std::fs::read(path).map_err(InspectError::Io)?;
    inspect_pdf(&bytes)
}
