//! Typed element attributes with a resolution state.
//!
//! Every attribute slot is either still unknown, resolved to a value, or
//! known to be unavailable after all sources have been asked. Units are
//! fixed per attribute (see [`Attr::unit`]).

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attr {
    /// Pipe length in m.
    Length,
    /// Nominal diameter in mm.
    Diameter,
    /// Length-weighted diameter of the pipes around an aggregate in mm.
    DiameterStrand,
    /// Thermal or electrical rated power in kW.
    RatedPower,
    /// Pump delivery height in m.
    RatedHeight,
    /// Volume flow in m³/h.
    RatedVolumeFlow,
    /// Hydraulic pump power in kW.
    RatedPumpPower,
    /// Heated floor area in m².
    HeatingArea,
    XSpacing,
    YSpacing,
    ConsumerCount,
    HasPump,
    Description,
}

impl Attr {
    pub const ALL: [Attr; 13] = [
        Attr::Length,
        Attr::Diameter,
        Attr::DiameterStrand,
        Attr::RatedPower,
        Attr::RatedHeight,
        Attr::RatedVolumeFlow,
        Attr::RatedPumpPower,
        Attr::HeatingArea,
        Attr::XSpacing,
        Attr::YSpacing,
        Attr::ConsumerCount,
        Attr::HasPump,
        Attr::Description,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Attr::Length => "length",
            Attr::Diameter => "diameter",
            Attr::DiameterStrand => "diameter_strand",
            Attr::RatedPower => "rated_power",
            Attr::RatedHeight => "rated_height",
            Attr::RatedVolumeFlow => "rated_volume_flow",
            Attr::RatedPumpPower => "rated_pump_power",
            Attr::HeatingArea => "heating_area",
            Attr::XSpacing => "x_spacing",
            Attr::YSpacing => "y_spacing",
            Attr::ConsumerCount => "consumer_count",
            Attr::HasPump => "has_pump",
            Attr::Description => "description",
        }
    }

    pub fn unit(self) -> Option<&'static str> {
        match self {
            Attr::Length | Attr::RatedHeight => Some("m"),
            Attr::Diameter | Attr::DiameterStrand | Attr::XSpacing | Attr::YSpacing => Some("mm"),
            Attr::RatedPower | Attr::RatedPumpPower => Some("kW"),
            Attr::RatedVolumeFlow => Some("m3/h"),
            Attr::HeatingArea => Some("m2"),
            Attr::ConsumerCount | Attr::HasPump | Attr::Description => None,
        }
    }
}

impl std::fmt::Display for Attr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

impl AttrValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttrValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            AttrValue::Flag(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Number(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Flag(v)
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Text(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum AttributeState {
    #[default]
    Unknown,
    Available(AttrValue),
    Unavailable,
}

impl AttributeState {
    pub fn value(&self) -> Option<&AttrValue> {
        match self {
            AttributeState::Available(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, AttributeState::Unknown)
    }
}

static UNKNOWN: AttributeState = AttributeState::Unknown;

/// Attribute record of one element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    slots: BTreeMap<Attr, AttributeState>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, attr: Attr) -> &AttributeState {
        self.slots.get(&attr).unwrap_or(&UNKNOWN)
    }

    pub fn set(&mut self, attr: Attr, value: impl Into<AttrValue>) {
        self.slots
            .insert(attr, AttributeState::Available(value.into()));
    }

    /// Store an optional number, marking the slot unavailable for `None`.
    pub fn set_opt(&mut self, attr: Attr, value: Option<f64>) {
        match value {
            Some(v) => self.set(attr, v),
            None => self.mark_unavailable(attr),
        }
    }

    pub fn set_state(&mut self, attr: Attr, state: AttributeState) {
        self.slots.insert(attr, state);
    }

    pub fn mark_unavailable(&mut self, attr: Attr) {
        self.slots.insert(attr, AttributeState::Unavailable);
    }

    pub fn number(&self, attr: Attr) -> Option<f64> {
        self.state(attr).value().and_then(AttrValue::as_number)
    }

    pub fn flag(&self, attr: Attr) -> Option<bool> {
        self.state(attr).value().and_then(AttrValue::as_flag)
    }

    pub fn text(&self, attr: Attr) -> Option<&str> {
        self.state(attr).value().and_then(AttrValue::as_text)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Attr, &AttributeState)> {
        self.slots.iter().map(|(a, s)| (*a, s))
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_default_to_unknown() {
        let mut attrs = Attributes::new();
        assert!(attrs.state(Attr::Length).is_unknown());
        attrs.set(Attr::Length, 2.5);
        assert_eq!(attrs.number(Attr::Length), Some(2.5));
        attrs.set_opt(Attr::Diameter, None);
        assert_eq!(attrs.state(Attr::Diameter), &AttributeState::Unavailable);
        assert_eq!(attrs.number(Attr::Diameter), None);
    }

    #[test]
    fn typed_accessors_do_not_coerce() {
        let mut attrs = Attributes::new();
        attrs.set(Attr::HasPump, true);
        attrs.set(Attr::Description, "2 x Heater");
        assert_eq!(attrs.flag(Attr::HasPump), Some(true));
        assert_eq!(attrs.number(Attr::HasPump), None);
        assert_eq!(attrs.text(Attr::Description), Some("2 x Heater"));
    }

    #[test]
    fn every_attr_has_a_distinct_name() {
        let mut names: Vec<_> = Attr::ALL.iter().map(|a| a.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Attr::ALL.len());
    }
}
