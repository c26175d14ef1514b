use crate::types::{Pt, Size};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // Card marker for metrics and tests; produces no output.
    Meta { key: String, value: String },
    SetLineWidth(Pt),
    SetFontSize(Pt),
    MoveTo { x: Pt, y: Pt },
    LineTo { x: Pt, y: Pt },
    Stroke,
    DrawString { x: Pt, y: Pt, text: String },
    StrokeRect { x: Pt, y: Pt, width: Pt, height: Pt },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub commands: Vec<Command>,
}

impl Page {
    pub fn meta_values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.commands.iter().filter_map(move |command| match command {
            Command::Meta { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn strings(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|command| match command {
            Command::DrawString { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub page_size: Size,
    pub pages: Vec<Page>,
}

// Collects card drawing page by page. Line width and font size are only
// recorded when they change; both reset at every page break.
pub struct Canvas {
    page_size: Size,
    done: Vec<Page>,
    page: Page,
    line_width: Option<Pt>,
    font_size: Option<Pt>,
}

impl Canvas {
    pub fn new(page_size: Size) -> Self {
        Self {
            page_size,
            done: Vec::new(),
            page: Page::default(),
            line_width: None,
            font_size: None,
        }
    }

    fn push(&mut self, command: Command) {
        self.page.commands.push(command);
    }

    pub fn meta(&mut self, key: &str, value: impl Into<String>) {
        self.push(Command::Meta {
            key: key.to_string(),
            value: value.into(),
        });
    }

    pub fn set_line_width(&mut self, width: Pt) {
        let width = width.max(Pt::ZERO);
        if self.line_width.replace(width) != Some(width) {
            self.push(Command::SetLineWidth(width));
        }
    }

    pub fn set_font_size(&mut self, size: Pt) {
        if self.font_size.replace(size) != Some(size) {
            self.push(Command::SetFontSize(size));
        }
    }

    pub fn line(&mut self, x1: Pt, y1: Pt, x2: Pt, y2: Pt) {
        self.push(Command::MoveTo { x: x1, y: y1 });
        self.push(Command::LineTo { x: x2, y: y2 });
        self.push(Command::Stroke);
    }

    pub fn draw_string(&mut self, x: Pt, y: Pt, text: impl Into<String>) {
        let text = text.into();
        self.push(Command::DrawString { x, y, text });
    }

    pub fn stroke_rect(&mut self, x: Pt, y: Pt, width: Pt, height: Pt) {
        self.push(Command::StrokeRect {
            x,
            y,
            width,
            height,
        });
    }

    pub fn show_page(&mut self) {
        self.done.push(std::mem::take(&mut self.page));
        self.line_width = None;
        self.font_size = None;
    }

    pub fn finish(mut self) -> Document {
        if self.done.is_empty() || !self.page.commands.is_empty() {
            self.show_page();
        }
        Document {
            page_size: self.page_size,
            pages: self.done,
        }
    }
}
