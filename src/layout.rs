use crate::canvas::{Canvas, Document};
use crate::error::RouteError;
use crate::font::FontFace;
use crate::route::NO_NEXT_POINT;
use crate::types::{Pt, Rect, Size};
use crate::waypoint::Waypoint;

pub const CARDS_PER_PAGE: usize = 8;
pub const GRID_COLUMNS: usize = 2;
pub const GRID_ROWS: usize = 4;
pub const ROWS_PER_CARD: usize = 4;
pub const MIN_FONT_SIZE: f32 = 6.0;
pub const DEFAULT_FONT_SIZE: f32 = 12.0;

const BORDER_WIDTH: f32 = 2.0;
const DIVIDER_WIDTH: f32 = 0.5;
const CLOSING_RULE_WIDTH: f32 = 2.0;
const CELL_PADDING: f32 = 5.0;
const SHRINK_STEP_MILLI: i64 = 100;

pub const CARD_META_KEY: &str = "card";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    pub page_size: Size,
    pub font_size: Pt,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            page_size: Size::a4(),
            font_size: Pt::from_f32(DEFAULT_FONT_SIZE),
        }
    }
}

pub fn page_count(waypoints: usize) -> usize {
    waypoints.div_ceil(CARDS_PER_PAGE)
}

// Slots run row-major from the top-left corner.
pub fn card_rect(slot: usize, page_size: Size) -> Rect {
    let col = slot % GRID_COLUMNS;
    let row = slot / GRID_COLUMNS;
    let width = page_size.width / GRID_COLUMNS as i32;
    let height = page_size.height / GRID_ROWS as i32;
    Rect {
        x: width * col as i32,
        y: page_size.height - height * (row as i32 + 1),
        width,
        height,
    }
}

pub fn card_rows(waypoints: &[Waypoint], index: usize) -> Result<Vec<String>, RouteError> {
    let Some(waypoint) = waypoints.get(index) else {
        return Ok(Vec::new());
    };
    let mut rows = vec![
        format!("Taškas: {}", waypoint.label.display_name()),
        format!("Koordinatės: {}", waypoint.grid_string()?),
        format!("Raidė: {}", waypoint.tag),
    ];
    if !waypoint.label.is_finish() {
        let next = match waypoints.get(index + 1) {
            Some(next) => next.grid_string()?,
            None => NO_NEXT_POINT.to_string(),
        };
        rows.push(format!("Sekančio taško koordinatės: {}", next));
    }
    Ok(rows)
}

pub fn layout_document<F: FontFace + ?Sized>(
    waypoints: &[Waypoint],
    font: &F,
    options: &LayoutOptions,
) -> Result<Document, RouteError> {
    if waypoints.is_empty() {
        return Err(RouteError::EmptyRoute);
    }
    let mut canvas = Canvas::new(options.page_size);
    for (page_index, chunk) in waypoints.chunks(CARDS_PER_PAGE).enumerate() {
        if page_index > 0 {
            canvas.show_page();
        }
        for (slot, waypoint) in chunk.iter().enumerate() {
            let index = page_index * CARDS_PER_PAGE + slot;
            let rows = card_rows(waypoints, index)?;
            let rect = card_rect(slot, options.page_size);
            canvas.meta(CARD_META_KEY, waypoint.label.display_name());
            draw_card(&mut canvas, rect, &rows, waypoint.label.is_finish(), font, options);
        }
    }
    Ok(canvas.finish())
}

fn draw_card<F: FontFace + ?Sized>(
    canvas: &mut Canvas,
    rect: Rect,
    rows: &[String],
    is_finish: bool,
    font: &F,
    options: &LayoutOptions,
) {
    let top = rect.y + rect.height;
    let band = rect.height / ROWS_PER_CARD as i32;
    let right = rect.x + rect.width;

    canvas.set_line_width(Pt::from_f32(BORDER_WIDTH));
    canvas.stroke_rect(rect.x, rect.y, rect.width, rect.height);

    canvas.set_line_width(Pt::from_f32(DIVIDER_WIDTH));
    for boundary in 1..ROWS_PER_CARD {
        let y = top - band * boundary as i32;
        if is_finish && boundary == ROWS_PER_CARD - 1 {
            canvas.set_line_width(Pt::from_f32(CLOSING_RULE_WIDTH));
        }
        canvas.line(rect.x, y, right, y);
    }

    let available = rect.width - Pt::from_f32(CELL_PADDING) * 2;
    for (row, text) in rows.iter().enumerate() {
        let size = fit_font_size(font, text, options.font_size, available);
        let width = font.measure(text, size);
        let cap = font.cap_height(size);
        let band_bottom = top - band * (row as i32 + 1);
        let x = rect.x + (rect.width - width) / 2;
        let y = band_bottom + (band - cap) / 2;
        canvas.set_font_size(size);
        canvas.draw_string(x, y, text.as_str());
    }
}

// Never below MIN_FONT_SIZE, even if the text still overflows there.
pub fn fit_font_size<F: FontFace + ?Sized>(
    font: &F,
    text: &str,
    preferred: Pt,
    available: Pt,
) -> Pt {
    let min = Pt::from_f32(MIN_FONT_SIZE);
    let mut size = preferred.max(min);
    let width = font.measure(text, size);
    if width <= available {
        return size;
    }
    if width > Pt::ZERO && available > Pt::ZERO {
        let num = i32::try_from(available.milli()).unwrap_or(i32::MAX);
        let den = i32::try_from(width.milli()).unwrap_or(i32::MAX);
        size = size.mul_ratio(num, den).max(min);
    }
    let step = Pt::from_milli(SHRINK_STEP_MILLI);
    while size > min && font.measure(text, size) > available {
        size = (size - step).max(min);
    }
    size
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Command, Page};
    use crate::font::StandardFont;
    use crate::route::RouteState;

    fn route(count: usize) -> RouteState {
        let mut route = RouteState::with_seed(42);
        for i in 0..count {
            route
                .append(55.0 + i as f64 * 0.01, 24.0 + i as f64 * 0.01)
                .unwrap();
        }
        route
    }

    // (thin strokes, thick strokes, strings) per card, in page order.
    fn card_stats(page: &Page) -> Vec<(usize, usize, usize)> {
        let mut stats = Vec::new();
        let mut width = Pt::from_i32(1);
        for command in &page.commands {
            match command {
                Command::Meta { key, .. } if key == CARD_META_KEY => stats.push((0, 0, 0)),
                Command::SetLineWidth(w) => width = *w,
                Command::Stroke => {
                    if let Some(last) = stats.last_mut() {
                        if width == Pt::from_f32(DIVIDER_WIDTH) {
                            last.0 += 1;
                        } else {
                            last.1 += 1;
                        }
                    }
                }
                Command::DrawString { .. } => {
                    if let Some(last) = stats.last_mut() {
                        last.2 += 1;
                    }
                }
                _ => {}
            }
        }
        stats
    }

    #[test]
    fn nine_waypoints_make_two_pages() {
        let route = route(9);
        let doc =
            layout_document(route.waypoints(), &StandardFont::helvetica(), &LayoutOptions::default())
                .unwrap();
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(doc.pages[0].meta_values(CARD_META_KEY).count(), 8);
        let second: Vec<&str> = doc.pages[1].meta_values(CARD_META_KEY).collect();
        assert_eq!(second, vec!["Finisas"]);
        assert_eq!(page_count(9), 2);
        assert_eq!(page_count(8), 1);
        assert_eq!(page_count(0), 0);
    }

    #[test]
    fn finish_card_has_three_rows_and_closing_rule() {
        let route = route(3);
        let doc =
            layout_document(route.waypoints(), &StandardFont::helvetica(), &LayoutOptions::default())
                .unwrap();
        let stats = card_stats(&doc.pages[0]);
        assert_eq!(stats, vec![(3, 0, 4), (3, 0, 4), (2, 1, 3)]);
    }

    #[test]
    fn single_waypoint_is_start_with_na_successor() {
        let route = route(1);
        let rows = card_rows(route.waypoints(), 0).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], "Taškas: Startas");
        assert_eq!(rows[3], "Sekančio taško koordinatės: N/A");
    }

    #[test]
    fn successor_row_crosses_page_boundary() {
        let route = route(10);
        let rows = card_rows(route.waypoints(), 7).unwrap();
        let next = route.waypoints()[8].grid_string().unwrap();
        assert_eq!(rows[3], format!("Sekančio taško koordinatės: {}", next));
        assert_eq!(rows[0], "Taškas: 7");
    }

    #[test]
    fn empty_route_is_rejected() {
        let err = layout_document(&[], &StandardFont::helvetica(), &LayoutOptions::default())
            .unwrap_err();
        assert!(matches!(err, RouteError::EmptyRoute));
    }

    #[test]
    fn cells_tile_the_page_from_top_left() {
        let page = Size::a4();
        let first = card_rect(0, page);
        assert_eq!(first.x, Pt::ZERO);
        assert_eq!(first.y + first.height, page.height);
        let second = card_rect(1, page);
        assert_eq!(second.x, first.width);
        assert_eq!(second.y, first.y);
        let last = card_rect(7, page);
        assert!(last.y.milli().abs() <= 2);
        assert_eq!(last.x, first.width);
    }

    #[test]
    fn text_is_centered_in_cell() {
        let route = route(2);
        let font = StandardFont::helvetica();
        let options = LayoutOptions::default();
        let doc = layout_document(route.waypoints(), &font, &options).unwrap();
        let rect = card_rect(0, options.page_size);
        let Some(Command::DrawString { x, text, .. }) = doc.pages[0]
            .commands
            .iter()
            .find(|c| matches!(c, Command::DrawString { .. }))
        else {
            panic!("no text drawn");
        };
        let width = font.measure(text, options.font_size);
        let left = *x - rect.x;
        let right = rect.x + rect.width - (*x + width);
        assert!((left - right).milli().abs() <= 2);
    }

    #[test]
    fn long_rows_shrink_but_not_below_minimum() {
        let font = StandardFont::helvetica();
        let preferred = Pt::from_i32(12);
        let available = Pt::from_i32(150);
        let text = "Sekančio taško koordinatės: 1234 5678";
        let size = fit_font_size(&font, text, preferred, available);
        assert!(size < preferred);
        assert!(font.measure(text, size) <= available);
        assert!(size >= Pt::from_f32(MIN_FONT_SIZE));

        let tiny = fit_font_size(&font, text, preferred, Pt::from_i32(10));
        assert_eq!(tiny, Pt::from_f32(MIN_FONT_SIZE));
        assert_eq!(fit_font_size(&font, "A", preferred, available), preferred);
    }
}
