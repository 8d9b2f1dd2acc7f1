// hr-core/src/units.rs

use uom::si::f64::{Area as UomArea, Length as UomLength, Ratio as UomRatio};

// Public canonical unit types (SI, f64)
pub type Area = UomArea;
pub type Length = UomLength;
pub type Ratio = UomRatio;

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn mm(v: f64) -> Length {
    use uom::si::length::millimeter;
    Length::new::<millimeter>(v)
}

/// Read a length back as millimeters.
#[inline]
pub fn in_mm(v: Length) -> f64 {
    use uom::si::length::millimeter;
    v.get::<millimeter>()
}

/// Read an area back as square meters.
#[inline]
pub fn in_m2(v: Area) -> f64 {
    use uom::si::area::square_meter;
    v.get::<square_meter>()
}

/// Read a ratio back as a plain number.
#[inline]
pub fn in_ratio(v: Ratio) -> f64 {
    use uom::si::ratio::ratio;
    v.get::<ratio>()
}

/// Length unit of the coordinates stored on ports and elements.
///
/// Building models are usually exported in millimeters, but nothing forces
/// that, so geometric criteria convert through this first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LengthUnit {
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "mm"))]
    Millimeter,
    #[cfg_attr(feature = "serde", serde(rename = "m"))]
    Meter,
}

impl LengthUnit {
    /// Convert a raw model coordinate difference into a typed length.
    pub fn length(self, v: f64) -> Length {
        match self {
            LengthUnit::Millimeter => mm(v),
            LengthUnit::Meter => m(v),
        }
    }
}

pub mod constants {
    /// Standard gravity in m/s².
    pub const G0_MPS2: f64 = 9.806_65;

    /// Density of water in kg/m³ used for hydraulic power estimates.
    pub const RHO_WATER: f64 = 1000.0;
}
