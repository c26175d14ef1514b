use crate::error::RouteError;
use crate::geodesy;
use crate::types::{LatLon, ScreenPoint};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;

const ALPHABET: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaypointId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Start,
    Finish,
    Ordinal(usize),
}

impl Label {
    // Map marker.
    pub fn marker(&self) -> String {
        match self {
            Label::Start => "S".to_string(),
            Label::Finish => "F".to_string(),
            Label::Ordinal(n) => n.to_string(),
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Label::Start => "Startas".to_string(),
            Label::Finish => "Finisas".to_string(),
            Label::Ordinal(n) => n.to_string(),
        }
    }

    pub fn is_finish(&self) -> bool {
        matches!(self, Label::Finish)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.marker())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub id: WaypointId,
    pub position: LatLon,
    pub label: Label,
    pub tag: char,
    // Derived from the route viewport.
    pub screen: Option<ScreenPoint>,
}

impl Waypoint {
    pub fn latitude(&self) -> f64 {
        self.position.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.position.longitude
    }

    pub fn grid_string(&self) -> Result<String, RouteError> {
        geodesy::to_grid_string(self.position.latitude, self.position.longitude)
    }

    pub fn full_projected_label(&self) -> Result<String, RouteError> {
        geodesy::to_full_projected_label(self.position.latitude, self.position.longitude)
    }
}

impl fmt::Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WayPoint[{}] at ({:.6}, {:.6}) letter: {}",
            self.label, self.position.latitude, self.position.longitude, self.tag
        )
    }
}

#[derive(Debug, Clone)]
pub struct TagSource {
    rng: StdRng,
}

impl TagSource {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self::seeded(rand::random::<u64>())
    }

    pub fn next_tag(&mut self) -> char {
        let index = self.rng.random_range(0..ALPHABET.len());
        ALPHABET[index] as char
    }
}
