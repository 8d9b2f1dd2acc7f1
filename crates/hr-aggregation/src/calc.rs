//! Derived attributes of aggregates.
//!
//! Each aggregate kind computes all of its attributes in one pass over its
//! members and returns a small record; the record is written to the
//! aggregate in a single batch. Members missing a required value are
//! skipped with a warning.

use std::collections::BTreeMap;

use hr_core::{ElementId, meaningful};
use hr_graph::types::{PIPE_LIKE, PUMP, SPACE_HEATER, is_one_of};
use hr_graph::{Attr, Attributes, Element, Model, hydraulic_power_kw};

use crate::kind::AggregateKind;

fn members<'m>(model: &'m Model, ids: &[ElementId]) -> impl Iterator<Item = &'m Element> + 'm {
    let ids = ids.to_vec();
    ids.into_iter().filter_map(move |id| model.element(id).ok())
}

fn warn_missing(aggregate: &str, element: &Element, attr: Attr) {
    tracing::warn!(
        aggregate,
        element = %element.name,
        %attr,
        "ignored {} in aggregation, missing {}",
        element.ifc_type,
        attr
    );
}

fn value(aggregate: &str, element: &Element, attr: Attr) -> Option<f64> {
    let v = meaningful(element.number(attr));
    if v.is_none() {
        warn_missing(aggregate, element, attr);
    }
    v
}

pub(crate) fn is_pipe_like(e: &Element) -> bool {
    is_one_of(&e.ifc_type, PIPE_LIKE)
        || e.is_type(AggregateKind::PipeStrand.tag())
        || e.is_type(AggregateKind::AggregatedPipeFitting.tag())
}

pub(crate) fn is_pump_like(e: &Element) -> bool {
    e.is_type(PUMP) || e.is_type(AggregateKind::ParallelPump.tag())
}

pub(crate) fn is_heater_like(e: &Element) -> bool {
    e.is_type(SPACE_HEATER) || e.is_type(AggregateKind::ParallelSpaceHeater.tag())
}

/// Σl and Σ(d·l) over members that carry both.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Strand {
    length: f64,
    weighted: f64,
}

impl Strand {
    fn add(&mut self, aggregate: &str, e: &Element) {
        let (Some(l), Some(d)) = (value(aggregate, e, Attr::Length), diameter_of(e)) else {
            if meaningful(e.number(Attr::Length)).is_some() {
                warn_missing(aggregate, e, Attr::Diameter);
            }
            return;
        };
        self.length += l;
        self.weighted += d * l;
    }

    fn length(&self) -> Option<f64> {
        (self.length > 0.0).then_some(self.length)
    }

    fn diameter(&self) -> Option<f64> {
        (self.length > 0.0).then(|| self.weighted / self.length)
    }
}

/// Strand aggregates expose their weighted diameter as `diameter`, parallel
/// groups as `diameter_strand`.
fn diameter_of(e: &Element) -> Option<f64> {
    meaningful(e.number(Attr::Diameter)).or_else(|| meaningful(e.number(Attr::DiameterStrand)))
}

/// Square root of Σd².
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Quadrature(f64);

impl Quadrature {
    fn add(&mut self, d: f64) {
        self.0 += d * d;
    }

    fn value(self) -> Option<f64> {
        (self.0 > 0.0).then(|| self.0.sqrt())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StrandRecord {
    pub length: Option<f64>,
    pub diameter: Option<f64>,
}

impl StrandRecord {
    pub fn compute(model: &Model, aggregate: &str, ids: &[ElementId]) -> Self {
        let mut strand = Strand::default();
        for e in members(model, ids) {
            strand.add(aggregate, e);
        }
        Self {
            length: strand.length(),
            diameter: strand.diameter(),
        }
    }

    pub fn to_attributes(self) -> Attributes {
        let mut a = Attributes::new();
        a.set_opt(Attr::Length, self.length);
        a.set_opt(Attr::Diameter, self.diameter);
        a
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UnderfloorRecord {
    pub length: Option<f64>,
    pub diameter: Option<f64>,
    pub heating_area: Option<f64>,
    pub x_spacing: Option<f64>,
    pub y_spacing: Option<f64>,
}

impl UnderfloorRecord {
    /// Taken over from the values the matcher measured.
    pub fn from_meta(values: &BTreeMap<Attr, f64>) -> Self {
        let get = |a: Attr| values.get(&a).copied();
        Self {
            length: get(Attr::Length),
            diameter: get(Attr::Diameter),
            heating_area: get(Attr::HeatingArea),
            x_spacing: get(Attr::XSpacing),
            y_spacing: get(Attr::YSpacing),
        }
    }

    pub fn to_attributes(self) -> Attributes {
        let mut a = Attributes::new();
        a.set_opt(Attr::Length, self.length);
        a.set_opt(Attr::Diameter, self.diameter);
        a.set_opt(Attr::HeatingArea, self.heating_area);
        a.set_opt(Attr::XSpacing, self.x_spacing);
        a.set_opt(Attr::YSpacing, self.y_spacing);
        a
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParallelPumpRecord {
    pub rated_power: Option<f64>,
    pub rated_height: Option<f64>,
    pub rated_volume_flow: Option<f64>,
    pub diameter: Option<f64>,
    pub length: Option<f64>,
    pub diameter_strand: Option<f64>,
}

impl ParallelPumpRecord {
    pub fn compute(model: &Model, aggregate: &str, ids: &[ElementId]) -> Self {
        let mut power = None::<f64>;
        let mut flow = None::<f64>;
        let mut height = None::<f64>;
        let mut diameter = Quadrature::default();
        let mut strand = Strand::default();
        for e in members(model, ids) {
            if is_pump_like(e) {
                if let Some(p) = value(aggregate, e, Attr::RatedPower) {
                    *power.get_or_insert(0.0) += p;
                }
                if let Some(v) = value(aggregate, e, Attr::RatedVolumeFlow) {
                    *flow.get_or_insert(0.0) += v;
                }
                if let Some(h) = value(aggregate, e, Attr::RatedHeight) {
                    height = Some(height.map_or(h, |m| m.min(h)));
                }
                if let Some(d) = meaningful(e.number(Attr::Diameter)) {
                    diameter.add(d);
                }
            } else {
                strand.add(aggregate, e);
            }
        }
        Self {
            rated_power: power,
            rated_height: height,
            rated_volume_flow: flow,
            diameter: diameter.value(),
            length: strand.length(),
            diameter_strand: strand.diameter(),
        }
    }

    pub fn to_attributes(self) -> Attributes {
        let mut a = Attributes::new();
        a.set_opt(Attr::RatedPower, self.rated_power);
        a.set_opt(Attr::RatedHeight, self.rated_height);
        a.set_opt(Attr::RatedVolumeFlow, self.rated_volume_flow);
        a.set_opt(Attr::Diameter, self.diameter);
        a.set_opt(Attr::Length, self.length);
        a.set_opt(Attr::DiameterStrand, self.diameter_strand);
        a
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpaceHeaterRecord {
    pub rated_power: Option<f64>,
    pub diameter: Option<f64>,
    pub length: Option<f64>,
    pub diameter_strand: Option<f64>,
}

impl SpaceHeaterRecord {
    pub fn compute(model: &Model, aggregate: &str, ids: &[ElementId]) -> Self {
        let mut power = None::<f64>;
        let mut diameter = Quadrature::default();
        let mut strand = Strand::default();
        for e in members(model, ids) {
            if is_heater_like(e) {
                if let Some(p) = value(aggregate, e, Attr::RatedPower) {
                    *power.get_or_insert(0.0) += p;
                }
                if let Some(d) = meaningful(e.number(Attr::Diameter)) {
                    diameter.add(d);
                }
            } else if is_pipe_like(e) {
                strand.add(aggregate, e);
            }
        }
        Self {
            rated_power: power,
            diameter: diameter.value(),
            length: strand.length(),
            diameter_strand: strand.diameter(),
        }
    }

    pub fn to_attributes(self) -> Attributes {
        let mut a = Attributes::new();
        a.set_opt(Attr::RatedPower, self.rated_power);
        a.set_opt(Attr::Diameter, self.diameter);
        a.set_opt(Attr::Length, self.length);
        a.set_opt(Attr::DiameterStrand, self.diameter_strand);
        a
    }
}

/// `"2 x IfcSpaceHeater, 1 x UnderfloorHeating"`, types in first-seen order.
pub fn describe<'a>(types: impl IntoIterator<Item = &'a str>) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for t in types {
        match counts.iter_mut().find(|(k, _)| *k == t) {
            Some((_, n)) => *n += 1,
            None => counts.push((t, 1)),
        }
    }
    counts
        .iter()
        .map(|(t, n)| format!("{n} x {t}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsumerRecord {
    pub has_pump: bool,
    pub rated_power: Option<f64>,
    pub rated_pump_power: Option<f64>,
    pub rated_height: Option<f64>,
    pub rated_volume_flow: Option<f64>,
    pub description: String,
}

impl ConsumerRecord {
    /// `consumers` selects the members that count as heat consumers.
    pub fn compute(
        model: &Model,
        aggregate: &str,
        ids: &[ElementId],
        consumers: &[&str],
    ) -> Self {
        let mut record = Self::default();
        let mut pump_power = None::<f64>;
        let mut flow = Some(0.0);
        let mut pumps = 0usize;
        let mut consumer_types = Vec::new();
        for e in members(model, ids) {
            if is_one_of(&e.ifc_type, consumers) {
                consumer_types.push(e.ifc_type.as_str());
                if let Some(p) = value(aggregate, e, Attr::RatedPower) {
                    *record.rated_power.get_or_insert(0.0) += p;
                }
            } else if is_pump_like(e) {
                pumps += 1;
                let v = meaningful(e.number(Attr::RatedVolumeFlow));
                let h = meaningful(e.number(Attr::RatedHeight));
                flow = match (flow, v) {
                    (Some(total), Some(v)) => Some(total + v),
                    _ => None,
                };
                if let Some(h) = h {
                    record.rated_height = Some(record.rated_height.map_or(h, |m| m.min(h)));
                }
                let power = meaningful(e.number(Attr::RatedPumpPower))
                    .or_else(|| v.zip(h).map(|(v, h)| hydraulic_power_kw(v, h)));
                match power {
                    Some(p) => *pump_power.get_or_insert(0.0) += p,
                    None => warn_missing(aggregate, e, Attr::RatedPumpPower),
                }
            }
        }
        record.has_pump = pumps > 0;
        record.rated_pump_power = pump_power;
        record.rated_volume_flow = if pumps > 0 { flow } else { None };
        record.description = describe(consumer_types);
        record
    }

    pub fn to_attributes(&self) -> Attributes {
        let mut a = Attributes::new();
        a.set(Attr::HasPump, self.has_pump);
        a.set_opt(Attr::RatedPower, self.rated_power);
        a.set_opt(Attr::RatedPumpPower, self.rated_pump_power);
        a.set_opt(Attr::RatedHeight, self.rated_height);
        a.set_opt(Attr::RatedVolumeFlow, self.rated_volume_flow);
        a.set(Attr::Description, self.description.as_str());
        a
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistributorRecord {
    pub rated_power: Option<f64>,
    pub consumer_count: usize,
    pub description: String,
}

impl DistributorRecord {
    pub fn compute(
        model: &Model,
        aggregate: &str,
        ids: &[ElementId],
        consumers: &[&str],
    ) -> Self {
        let mut record = Self::default();
        let mut types = Vec::new();
        for e in members(model, ids) {
            if !is_one_of(&e.ifc_type, consumers) {
                continue;
            }
            record.consumer_count += 1;
            types.push(e.ifc_type.as_str());
            if let Some(p) = value(aggregate, e, Attr::RatedPower) {
                *record.rated_power.get_or_insert(0.0) += p;
            }
        }
        record.description = describe(types);
        record
    }

    pub fn to_attributes(&self) -> Attributes {
        let mut a = Attributes::new();
        a.set_opt(Attr::RatedPower, self.rated_power);
        a.set(Attr::ConsumerCount, self.consumer_count as f64);
        a.set(Attr::Description, self.description.as_str());
        a
    }
}
