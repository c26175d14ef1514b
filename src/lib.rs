mod canvas;
mod debug;
mod error;
mod font;
mod geodesy;
mod history;
mod inspect;
mod layout;
mod metrics;
mod pdf;
mod route;
mod types;
mod waypoint;

pub use canvas::{Canvas, Command, Document, Page};
pub use debug::DebugLogger;
pub use error::RouteError;
pub use font::{FontFace, PdfFont, StandardFont, TrueTypeFont};
pub use geodesy::{
    DEFAULT_CENTER, EARTH_RADIUS_M, Projected, format_coordinates, geo_to_screen,
    haversine_distance_m, is_valid_coordinate, route_length_m, screen_to_geo,
    to_full_projected_label, to_grid_string, to_projected, to_short_projected_label, utm_zone,
};
pub use history::{Applied, Command as HistoryCommand, CommandHistory, CommandKind, DEFAULT_HISTORY_DEPTH};
pub use inspect::{InspectError, InspectReport, PageReport, inspect_pdf, inspect_pdf_file};
pub use layout::{
    CARDS_PER_PAGE, DEFAULT_FONT_SIZE, LayoutOptions, MIN_FONT_SIZE, card_rect, card_rows,
    fit_font_size, layout_document, page_count,
};
pub use metrics::{DocumentMetrics, PageMetrics, sha256_hex};
pub use pdf::{
    content_object_id, document_to_pdf, document_to_pdf_to_writer, document_to_pdf_with_metrics,
    encode_waypoints, encode_waypoints_to_writer, font_object_id, page_object_id,
};
pub use route::{HOVER_RADIUS_PX, NO_NEXT_POINT, RouteState, Snapshot, ZOOM_STEP, relabel};
pub use types::{LatLon, Pt, Rect, ScreenPoint, Size, Viewport};
pub use waypoint::{Label, TagSource, Waypoint, WaypointId};

use serde_json::json;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const MIN_PAGE_SIDE: f32 = 72.0;
const DEFAULT_VIEWPORT: (f64, f64) = (800.0, 600.0);
const DEFAULT_ZOOM: f64 = 1.0;

// Editing session over one route. Share it behind a Mutex; encode the
// result of export_snapshot() outside the lock.
pub struct RouteMaker {
    route: RouteState,
    history: CommandHistory,
    font: Arc<dyn PdfFont>,
    layout: LayoutOptions,
    debug: Option<Arc<DebugLogger>>,
}

impl RouteMaker {
    pub fn builder() -> RouteMakerBuilder {
        RouteMakerBuilder::new()
    }

    pub fn route(&self) -> &RouteState {
        &self.route
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        self.route.waypoints()
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn font(&self) -> &dyn PdfFont {
        self.font.as_ref()
    }

    pub fn layout_options(&self) -> &LayoutOptions {
        &self.layout
    }

    pub fn append(&mut self, latitude: f64, longitude: f64) -> Result<WaypointId, RouteError> {
        let applied = self.history.execute(
            &mut self.route,
            CommandKind::Append {
                latitude,
                longitude,
            },
        )?;
        let Applied::Appended(id) = applied else {
            return Err(RouteError::InvalidConfiguration(
                "append did not produce a waypoint".to_string(),
            ));
        };
        if let Some(debug) = &self.debug {
            let index = self.route.position_of(id).unwrap_or(0);
            let tag = self.route.waypoints().get(index).map(|wp| wp.tag.to_string());
            debug.log_event(
                "route.append",
                json!({
                    "id": id.0,
                    "index": index,
                    "latitude": latitude,
                    "longitude": longitude,
                    "tag": tag,
                }),
            );
        }
        Ok(id)
    }

    pub fn append_at_screen(&mut self, x: f64, y: f64) -> Result<WaypointId, RouteError> {
        let position = screen_to_geo(ScreenPoint::new(x, y), self.route.viewport())?;
        self.append(position.latitude, position.longitude)
    }

    pub fn clear(&mut self) {
        let removed = self.route.len();
        if self.history.execute(&mut self.route, CommandKind::Clear).is_ok() {
            self.log("route.clear", json!({ "removed": removed }));
        }
    }

    pub fn invert(&mut self) {
        if self.history.execute(&mut self.route, CommandKind::Invert).is_ok() {
            self.log("route.invert", json!({ "len": self.route.len() }));
        }
    }

    pub fn undo(&mut self) -> bool {
        let undone = self.history.undo(&mut self.route);
        self.log(
            "history.undo",
            json!({ "applied": undone, "len": self.route.len() }),
        );
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.history.redo(&mut self.route);
        self.log(
            "history.redo",
            json!({ "applied": redone, "len": self.route.len() }),
        );
        redone
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn reset_history(&mut self) {
        self.history.clear();
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) -> Result<(), RouteError> {
        let current = *self.route.viewport();
        self.route
            .set_viewport(Viewport::new(width, height, current.center, current.zoom))
    }

    pub fn recenter(&mut self, latitude: f64, longitude: f64) -> Result<(), RouteError> {
        let center = geodesy::validate(latitude, longitude)?;
        let current = *self.route.viewport();
        self.route
            .set_viewport(Viewport::new(current.width, current.height, center, current.zoom))
    }

    pub fn zoom_in(&mut self) {
        self.route.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.route.zoom_out();
    }

    pub fn waypoint_at(&self, x: f64, y: f64) -> Option<&Waypoint> {
        self.route.waypoint_at(x, y)
    }

    pub fn export_snapshot(&self) -> Snapshot {
        self.route.snapshot()
    }

    pub fn export_to_buffer(&self) -> Result<Vec<u8>, RouteError> {
        let mut out = Vec::new();
        self.export_to_writer(&mut out)?;
        Ok(out)
    }

    pub fn export_to_writer<W: Write>(&self, writer: &mut W) -> Result<DocumentMetrics, RouteError> {
        let snapshot = self.export_snapshot();
        self.log_export_waypoints(&snapshot);
        let metrics =
            encode_waypoints_to_writer(&snapshot, self.font.as_ref(), &self.layout, writer)?;
        self.log(
            "export.done",
            json!({
                "pages": metrics.page_count(),
                "objects": metrics.object_count,
                "bytes": metrics.total_bytes,
                "sha256": metrics.sha256,
            }),
        );
        Ok(metrics)
    }

    // The document is staged next to `path` and renamed over it only once
    // complete; on failure an existing file at `path` is left as it was.
    pub fn export_to_file(&self, path: impl AsRef<Path>) -> Result<DocumentMetrics, RouteError> {
        if self.route.is_empty() {
            return Err(RouteError::EmptyRoute);
        }
        let path = path.as_ref();
        let staging = staging_path(path);
        let result = self
            .write_staged(&staging)
            .and_then(|metrics| fs::rename(&staging, path).map(|_| metrics).map_err(RouteError::from));
        if result.is_err() {
            let _ = fs::remove_file(&staging);
        }
        result
    }

    fn write_staged(&self, staging: &Path) -> Result<DocumentMetrics, RouteError> {
        let mut writer = BufWriter::new(File::create(staging)?);
        let metrics = self.export_to_writer(&mut writer)?;
        writer.into_inner().map_err(|err| err.into_error())?.sync_all()?;
        Ok(metrics)
    }

    pub fn flush_debug_log(&self) {
        if let Some(debug) = &self.debug {
            debug.emit_summary("routemaker");
            debug.flush();
        }
    }

    fn log_export_waypoints(&self, snapshot: &[Waypoint]) {
        let Some(debug) = &self.debug else {
            return;
        };
        for (index, wp) in snapshot.iter().enumerate() {
            debug.log_event(
                "export.waypoint",
                json!({
                    "index": index,
                    "label": wp.label.display_name(),
                    "projected": wp.full_projected_label().ok(),
                    "coordinates": format_coordinates(wp.latitude(), wp.longitude()),
                    "tag": wp.tag.to_string(),
                }),
            );
        }
    }

    fn log(&self, event: &str, fields: serde_json::Value) {
        if let Some(debug) = &self.debug {
            debug.log_event(event, fields);
        }
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.partial", std::process::id()))
}

enum FontSource {
    Standard,
    File(PathBuf),
    Bytes(Vec<u8>),
    Provided(Arc<dyn PdfFont>),
}

pub struct RouteMakerBuilder {
    page_size: Size,
    font_size: f32,
    font: FontSource,
    viewport: (f64, f64),
    center: LatLon,
    zoom: f64,
    tag_seed: Option<u64>,
    history_depth: usize,
    debug_path: Option<PathBuf>,
}

impl Default for RouteMakerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteMakerBuilder {
    pub fn new() -> Self {
        Self {
            page_size: Size::a4(),
            font_size: DEFAULT_FONT_SIZE,
            font: FontSource::Standard,
            viewport: DEFAULT_VIEWPORT,
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            tag_seed: None,
            history_depth: DEFAULT_HISTORY_DEPTH,
            debug_path: None,
        }
    }

    pub fn page_size(mut self, size: Size) -> Self {
        self.page_size = size;
        self
    }

    pub fn font_size(mut self, size: f32) -> Self {
        self.font_size = size;
        self
    }

    // TrueType/OpenType file embedded in every export.
    pub fn font_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.font = FontSource::File(path.into());
        self
    }

    pub fn font_bytes(mut self, data: Vec<u8>) -> Self {
        self.font = FontSource::Bytes(data);
        self
    }

    pub fn font_provider(mut self, font: Arc<dyn PdfFont>) -> Self {
        self.font = FontSource::Provided(font);
        self
    }

    pub fn viewport(mut self, width: f64, height: f64) -> Self {
        self.viewport = (width, height);
        self
    }

    pub fn center(mut self, latitude: f64, longitude: f64) -> Self {
        self.center = LatLon::new(latitude, longitude);
        self
    }

    pub fn zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }

    // Fixed seed makes tag letters, and therefore exports, reproducible.
    pub fn tag_seed(mut self, seed: u64) -> Self {
        self.tag_seed = Some(seed);
        self
    }

    pub fn history_depth(mut self, depth: usize) -> Self {
        self.history_depth = depth;
        self
    }

    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<RouteMaker, RouteError> {
        if !self.font_size.is_finite() || self.font_size < MIN_FONT_SIZE {
            return Err(RouteError::InvalidConfiguration(format!(
                "font_size must be at least {MIN_FONT_SIZE}"
            )));
        }
        if !self.zoom.is_finite() || self.zoom <= 0.0 {
            return Err(RouteError::InvalidConfiguration(
                "zoom must be > 0".to_string(),
            ));
        }
        let (width, height) = self.viewport;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(RouteError::InvalidConfiguration(
                "viewport must have a positive width and height".to_string(),
            ));
        }
        if self.history_depth == 0 {
            return Err(RouteError::InvalidConfiguration(
                "history_depth must be >= 1".to_string(),
            ));
        }
        let min_side = Pt::from_f32(MIN_PAGE_SIDE);
        if self.page_size.width < min_side || self.page_size.height < min_side {
            return Err(RouteError::InvalidConfiguration(format!(
                "page_size must be at least {MIN_PAGE_SIDE}x{MIN_PAGE_SIDE} pt"
            )));
        }
        let center = geodesy::validate(self.center.latitude, self.center.longitude)?;

        let font: Arc<dyn PdfFont> = match self.font {
            FontSource::Standard => Arc::new(StandardFont::helvetica()),
            FontSource::File(path) => Arc::new(TrueTypeFont::from_file(path)?),
            FontSource::Bytes(data) => Arc::new(TrueTypeFont::from_bytes(data, None)?),
            FontSource::Provided(font) => font,
        };
        let debug = if let Some(path) = self.debug_path {
            Some(Arc::new(DebugLogger::new(path)?))
        } else {
            None
        };
        let tags = match self.tag_seed {
            Some(seed) => TagSource::seeded(seed),
            None => TagSource::from_entropy(),
        };

        Ok(RouteMaker {
            route: RouteState::new(Viewport::new(width, height, center, self.zoom), tags),
            history: CommandHistory::new(self.history_depth),
            font,
            layout: LayoutOptions {
                page_size: self.page_size,
                font_size: Pt::from_f32(self.font_size),
            },
            debug,
        })
    }
}
