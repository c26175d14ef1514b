use fixed::types::I32F32;

// Page-space length. Every value is quantized to a thousandth of a point, so
// arithmetic and the numbers written into content streams agree exactly.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Pt(I32F32);

impl Pt {
    pub const ZERO: Pt = Pt(I32F32::from_bits(0));

    pub fn from_milli(milli: i64) -> Pt {
        Pt(I32F32::saturating_from_num(milli) / 1000)
    }

    pub fn from_i32(points: i32) -> Pt {
        Pt::from_milli(i64::from(points) * 1000)
    }

    pub fn from_f32(points: f32) -> Pt {
        if !points.is_finite() {
            return Pt::ZERO;
        }
        Pt::from_milli((f64::from(points) * 1000.0).round() as i64)
    }

    pub fn milli(self) -> i64 {
        self.0.saturating_mul_int(1000).round().to_num::<i64>()
    }

    pub fn max(self, other: Pt) -> Pt {
        if other > self { other } else { self }
    }

    // self * num / denom, rounded half away from zero.
    pub fn mul_ratio(self, num: i32, denom: i32) -> Pt {
        Pt::from_milli(div_half_away(self.milli() * i64::from(num), i64::from(denom)))
    }
}

fn div_half_away(num: i64, denom: i64) -> i64 {
    if denom == 0 {
        return 0;
    }
    let quotient = (num.abs() + denom.abs() / 2) / denom.abs();
    if (num < 0) != (denom < 0) {
        -quotient
    } else {
        quotient
    }
}

impl std::ops::Add for Pt {
    type Output = Pt;
    fn add(self, rhs: Pt) -> Pt {
        Pt::from_milli(self.milli() + rhs.milli())
    }
}

impl std::ops::Sub for Pt {
    type Output = Pt;
    fn sub(self, rhs: Pt) -> Pt {
        Pt::from_milli(self.milli() - rhs.milli())
    }
}

impl std::ops::Mul<i32> for Pt {
    type Output = Pt;
    fn mul(self, rhs: i32) -> Pt {
        Pt::from_milli(self.milli() * i64::from(rhs))
    }
}

impl std::ops::Div<i32> for Pt {
    type Output = Pt;
    fn div(self, rhs: i32) -> Pt {
        Pt::from_milli(div_half_away(self.milli(), i64::from(rhs)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: Pt,
    pub height: Pt,
}

impl Size {
    pub fn a4() -> Self {
        Self {
            width: Pt::from_milli(595_280),
            height: Pt::from_milli(841_890),
        }
    }

    pub fn from_mm(width_mm: f32, height_mm: f32) -> Self {
        let to_pt = |mm: f32| Pt::from_f32(mm * 72.0 / 25.4);
        Self {
            width: to_pt(width_mm),
            height: to_pt(height_mm),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: Pt,
    pub y: Pt,
    pub width: Pt,
    pub height: Pt,
}

// Signed decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLon {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

// Canvas pixels, y grows downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: ScreenPoint) -> f64 {
        libm::hypot(self.x - other.x, self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub center: LatLon,
    pub zoom: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64, center: LatLon, zoom: f64) -> Self {
        Self {
            width,
            height,
            center,
            zoom,
        }
    }
}
