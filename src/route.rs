use crate::error::RouteError;
use crate::geodesy::{self, DEFAULT_CENTER};
use crate::types::{LatLon, ScreenPoint, Viewport};
use crate::waypoint::{Label, TagSource, Waypoint, WaypointId};

pub const ZOOM_STEP: f64 = 1.5;
pub const HOVER_RADIUS_PX: f64 = 15.0;
pub const NO_NEXT_POINT: &str = "N/A";

// Successors are not stored; they follow from order.
pub type Snapshot = Vec<Waypoint>;

// After every change: first is Start, last is Finish (unless it is also
// first), and index i in between is Ordinal(i).
#[derive(Debug, Clone)]
pub struct RouteState {
    waypoints: Vec<Waypoint>,
    viewport: Viewport,
    tags: TagSource,
    next_id: u64,
}

impl RouteState {
    pub fn new(viewport: Viewport, tags: TagSource) -> Self {
        Self {
            waypoints: Vec::new(),
            viewport,
            tags,
            next_id: 1,
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(
            Viewport::new(800.0, 600.0, DEFAULT_CENTER, 1.0),
            TagSource::seeded(seed),
        )
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn labels(&self) -> Vec<Label> {
        self.waypoints.iter().map(|wp| wp.label).collect()
    }

    pub fn position_of(&self, id: WaypointId) -> Option<usize> {
        self.waypoints.iter().position(|wp| wp.id == id)
    }

    pub fn append(&mut self, latitude: f64, longitude: f64) -> Result<WaypointId, RouteError> {
        let position = geodesy::validate(latitude, longitude)?;
        let id = WaypointId(self.next_id);
        self.next_id += 1;
        let tag = self.tags.next_tag();
        self.waypoints.push(Waypoint {
            id,
            position,
            label: Label::Start,
            tag,
            screen: None,
        });
        self.refresh();
        Ok(id)
    }

    pub fn append_at_screen(&mut self, x: f64, y: f64) -> Result<WaypointId, RouteError> {
        let position = geodesy::screen_to_geo(ScreenPoint::new(x, y), &self.viewport)?;
        self.append(position.latitude, position.longitude)
    }

    pub fn clear(&mut self) {
        self.waypoints.clear();
    }

    pub fn invert(&mut self) {
        if self.waypoints.len() < 2 {
            return;
        }
        self.waypoints.reverse();
        self.refresh();
    }

    pub fn snapshot(&self) -> Snapshot {
        self.waypoints.clone()
    }

    pub fn restore(&mut self, snapshot: &[Waypoint]) {
        self.waypoints = snapshot.to_vec();
        if let Some(max_id) = self.waypoints.iter().map(|wp| wp.id.0).max() {
            self.next_id = self.next_id.max(max_id + 1);
        }
        self.refresh();
    }

    pub fn successor(&self, index: usize) -> Option<usize> {
        let next = index + 1;
        if next < self.waypoints.len() {
            Some(next)
        } else {
            None
        }
    }

    pub fn next_point_coordinates(&self, index: usize) -> Result<String, RouteError> {
        match self.successor(index) {
            Some(next) => self.waypoints[next].grid_string(),
            None => Ok(NO_NEXT_POINT.to_string()),
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<(), RouteError> {
        geodesy::screen_to_geo(
            ScreenPoint::new(viewport.width / 2.0, viewport.height / 2.0),
            &viewport,
        )?;
        self.viewport = viewport;
        self.reproject();
        Ok(())
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom *= ZOOM_STEP;
        self.reproject();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom /= ZOOM_STEP;
        self.reproject();
    }

    pub fn waypoint_at(&self, x: f64, y: f64) -> Option<&Waypoint> {
        let cursor = ScreenPoint::new(x, y);
        self.waypoints.iter().find(|wp| {
            wp.screen
                .map(|p| p.distance_to(cursor) <= HOVER_RADIUS_PX)
                .unwrap_or(false)
        })
    }

    pub fn summary(&self, index: usize) -> Result<Vec<String>, RouteError> {
        let Some(wp) = self.waypoints.get(index) else {
            return Ok(Vec::new());
        };
        Ok(vec![
            format!("Taškas: {}", wp.label.display_name()),
            format!("Koordinatės: {}", wp.grid_string()?),
            format!("Raidė: {}", wp.tag),
            format!(
                "Sekančio taško koordinatės: {}",
                self.next_point_coordinates(index)?
            ),
        ])
    }

    pub fn total_distance_m(&self) -> Result<f64, RouteError> {
        let points: Vec<LatLon> = self.waypoints.iter().map(|wp| wp.position).collect();
        geodesy::route_length_m(&points)
    }

    fn refresh(&mut self) {
        relabel(&mut self.waypoints);
        self.reproject();
    }

    fn reproject(&mut self) {
        let viewport = self.viewport;
        for wp in &mut self.waypoints {
            wp.screen =
                geodesy::geo_to_screen(wp.position.latitude, wp.position.longitude, &viewport).ok();
        }
    }
}

pub fn relabel(waypoints: &mut [Waypoint]) {
    let last = waypoints.len().saturating_sub(1);
    for (index, wp) in waypoints.iter_mut().enumerate() {
        wp.label = if index == 0 {
            Label::Start
        } else if index == last {
            Label::Finish
        } else {
            Label::Ordinal(index)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_label_invariants(route: &RouteState) {
        let labels = route.labels();
        match labels.len() {
            0 => {}
            1 => assert_eq!(labels[0], Label::Start),
            n => {
                assert_eq!(labels[0], Label::Start);
                assert_eq!(labels[n - 1], Label::Finish);
                for (i, label) in labels.iter().enumerate().take(n - 1).skip(1) {
                    assert_eq!(*label, Label::Ordinal(i));
                }
            }
        }
        for i in 0..route.len() {
            let expected = if i + 1 < route.len() { Some(i + 1) } else { None };
            assert_eq!(route.successor(i), expected);
        }
    }

    #[test]
    fn labels_hold_after_every_append() {
        let mut route = RouteState::with_seed(1);
        for i in 0..12 {
            route
                .append(55.0 + i as f64 * 0.01, 24.0 + i as f64 * 0.01)
                .unwrap();
            assert_label_invariants(&route);
        }
    }

    #[test]
    fn third_point_renumbers_previous_finish() {
        let mut route = RouteState::with_seed(1);
        route.append(55.0, 24.0).unwrap();
        route.append(55.1, 24.1).unwrap();
        assert_eq!(route.labels(), vec![Label::Start, Label::Finish]);
        route.append(55.2, 24.2).unwrap();
        assert_eq!(
            route.labels(),
            vec![Label::Start, Label::Ordinal(1), Label::Finish]
        );
    }

    #[test]
    fn double_invert_restores_order_and_labels() {
        let mut route = RouteState::with_seed(3);
        for i in 0..5 {
            route.append(54.0 + i as f64 * 0.1, 23.0).unwrap();
        }
        let before = route.snapshot();
        route.invert();
        assert_eq!(route.waypoints()[0].id, before[4].id);
        assert_eq!(route.waypoints()[0].label, Label::Start);
        assert_eq!(route.waypoints()[4].label, Label::Finish);
        assert_label_invariants(&route);
        route.invert();
        assert_eq!(route.snapshot(), before);
    }

    #[test]
    fn invert_below_two_points_is_noop() {
        let mut route = RouteState::with_seed(3);
        route.invert();
        assert!(route.is_empty());
        route.append(55.0, 24.0).unwrap();
        let before = route.snapshot();
        route.invert();
        assert_eq!(route.snapshot(), before);
    }

    #[test]
    fn invalid_append_leaves_state_untouched() {
        let mut route = RouteState::with_seed(9);
        route.append(55.0, 24.0).unwrap();
        route.append(55.1, 24.1).unwrap();
        let before = route.snapshot();
        assert!(matches!(
            route.append(91.0, 24.0),
            Err(RouteError::InvalidCoordinate { .. })
        ));
        assert!(route.append(f64::NAN, 24.0).is_err());
        assert_eq!(route.snapshot(), before);
    }

    #[test]
    fn tags_are_stable_across_relabeling() {
        let mut route = RouteState::with_seed(11);
        route.append(55.0, 24.0).unwrap();
        let tag = route.waypoints()[0].tag;
        route.append(55.1, 24.1).unwrap();
        route.append(55.2, 24.2).unwrap();
        route.invert();
        assert_eq!(route.waypoints()[2].tag, tag);
    }

    #[test]
    fn restore_rebuilds_labels_and_keeps_ids_unique() {
        let mut route = RouteState::with_seed(5);
        route.append(55.0, 24.0).unwrap();
        route.append(55.1, 24.1).unwrap();
        let mut snapshot = route.snapshot();
        snapshot[1].label = Label::Ordinal(7);
        snapshot[0].screen = None;
        route.clear();
        route.restore(&snapshot);
        assert_eq!(route.labels(), vec![Label::Start, Label::Finish]);
        assert!(route.waypoints()[0].screen.is_some());
        let id = route.append(55.2, 24.2).unwrap();
        assert!(route.waypoints()[..2].iter().all(|wp| wp.id != id));
    }

    #[test]
    fn next_point_coordinates_use_successor() {
        let mut route = RouteState::with_seed(2);
        route.append(55.0, 24.0).unwrap();
        route.append(55.1, 24.1).unwrap();
        assert_eq!(
            route.next_point_coordinates(0).unwrap(),
            geodesy::to_grid_string(55.1, 24.1).unwrap()
        );
        assert_eq!(route.next_point_coordinates(1).unwrap(), NO_NEXT_POINT);
    }

    #[test]
    fn screen_taps_round_trip_through_projection() {
        let mut route = RouteState::with_seed(4);
        route.append_at_screen(420.0, 280.0).unwrap();
        let screen = route.waypoints()[0].screen.unwrap();
        assert!((screen.x - 420.0).abs() <= 1.0);
        assert!((screen.y - 280.0).abs() <= 1.0);
        assert_eq!(route.waypoint_at(425.0, 285.0).map(|wp| wp.id), Some(route.waypoints()[0].id));
        assert!(route.waypoint_at(500.0, 500.0).is_none());
    }

    #[test]
    fn zoom_reprojects_points() {
        let mut route = RouteState::with_seed(4);
        route.append_at_screen(500.0, 300.0).unwrap();
        route.zoom_in();
        let x = route.waypoints()[0].screen.unwrap().x;
        assert!((x - 550.0).abs() < 1e-6, "{x}");
        route.zoom_out();
        let x = route.waypoints()[0].screen.unwrap().x;
        assert!((x - 500.0).abs() < 1e-6, "{x}");
    }

    #[test]
    fn summary_lists_four_lines() {
        let mut route = RouteState::with_seed(4);
        route.append(55.0, 24.0).unwrap();
        let lines = route.summary(0).unwrap();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Taškas: Startas");
        assert_eq!(lines[3], "Sekančio taško koordinatės: N/A");
        assert!(route.summary(5).unwrap().is_empty());
    }

    #[test]
    fn distance_follows_route_order() {
        let mut route = RouteState::with_seed(4);
        assert_eq!(route.total_distance_m().unwrap(), 0.0);
        route.append(0.0, 0.0).unwrap();
        route.append(0.0, 1.0).unwrap();
        let d = route.total_distance_m().unwrap();
        assert!((d - 111_194.93).abs() < 1.0);
    }
}
