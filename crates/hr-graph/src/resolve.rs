//! Attribute resolution from raw element properties.
//!
//! A [`ResolverChain`] asks its resolvers in order; the first one that
//! produces a meaningful value wins. When every resolver declines, the
//! slot is marked unavailable so later passes do not ask again.

use std::collections::BTreeMap;

use hr_core::constants::{G0_MPS2, RHO_WATER};
use hr_core::meaningful;

use crate::attribute::{Attr, AttrValue, AttributeState};
use crate::model::Element;

pub trait AttributeResolver {
    fn name(&self) -> &'static str;

    fn resolve(&self, element: &Element, attr: Attr) -> Option<AttrValue>;
}

/// Exact property names per attribute.
#[derive(Debug, Clone)]
pub struct PropertyResolver {
    names: BTreeMap<Attr, Vec<String>>,
}

impl PropertyResolver {
    pub fn new() -> Self {
        Self {
            names: BTreeMap::new(),
        }
    }

    pub fn with(mut self, attr: Attr, names: &[&str]) -> Self {
        self.names
            .entry(attr)
            .or_default()
            .extend(names.iter().map(|n| (*n).to_owned()));
        self
    }
}

impl Default for PropertyResolver {
    fn default() -> Self {
        Self::new()
            .with(Attr::Length, &["Length", "NominalLength"])
            .with(Attr::Diameter, &["NominalDiameter", "InnerDiameter", "Diameter"])
            .with(Attr::RatedPower, &["NominalPower", "RatedPower"])
            .with(Attr::RatedHeight, &["NominalHeight", "RatedHeight"])
            .with(Attr::RatedVolumeFlow, &["NominalFlowRate", "RatedVolumeFlow"])
    }
}

impl AttributeResolver for PropertyResolver {
    fn name(&self) -> &'static str {
        "property"
    }

    fn resolve(&self, element: &Element, attr: Attr) -> Option<AttrValue> {
        self.names
            .get(&attr)?
            .iter()
            .find_map(|n| meaningful(element.properties.get(n).copied()))
            .map(AttrValue::Number)
    }
}

/// Case-insensitive substring match on property names.
#[derive(Debug, Clone)]
pub struct PatternResolver {
    patterns: BTreeMap<Attr, Vec<String>>,
}

impl PatternResolver {
    pub fn new() -> Self {
        Self {
            patterns: BTreeMap::new(),
        }
    }

    pub fn with(mut self, attr: Attr, patterns: &[&str]) -> Self {
        self.patterns
            .entry(attr)
            .or_default()
            .extend(patterns.iter().map(|p| p.to_lowercase()));
        self
    }
}

impl Default for PatternResolver {
    fn default() -> Self {
        Self::new()
            .with(Attr::Length, &["length", "länge"])
            .with(Attr::Diameter, &["diameter", "durchmesser"])
            .with(Attr::RatedPower, &["power", "leistung"])
    }
}

impl AttributeResolver for PatternResolver {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn resolve(&self, element: &Element, attr: Attr) -> Option<AttrValue> {
        let patterns = self.patterns.get(&attr)?;
        patterns
            .iter()
            .find_map(|pat| {
                element
                    .properties
                    .iter()
                    .filter(|(k, _)| k.to_lowercase().contains(pat.as_str()))
                    .find_map(|(_, v)| meaningful(Some(*v)))
            })
            .map(AttrValue::Number)
    }
}

pub type ResolveFn = fn(&Element) -> Option<AttrValue>;

/// Derive an attribute from other, already resolved attributes.
#[derive(Debug, Clone, Default)]
pub struct FunctionResolver {
    functions: BTreeMap<Attr, ResolveFn>,
}

impl FunctionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, attr: Attr, f: ResolveFn) -> Self {
        self.functions.insert(attr, f);
        self
    }

    /// Pump power from volume flow and delivery height.
    pub fn hydraulic() -> Self {
        Self::new().with(Attr::RatedPumpPower, hydraulic_power)
    }
}

impl AttributeResolver for FunctionResolver {
    fn name(&self) -> &'static str {
        "function"
    }

    fn resolve(&self, element: &Element, attr: Attr) -> Option<AttrValue> {
        self.functions.get(&attr).and_then(|f| f(element))
    }
}

/// ρ·g·V̇·H in kW with V̇ in m³/h and H in m.
pub fn hydraulic_power_kw(volume_flow_m3h: f64, height_m: f64) -> f64 {
    RHO_WATER * G0_MPS2 * (volume_flow_m3h / 3600.0) * height_m / 1000.0
}

fn hydraulic_power(element: &Element) -> Option<AttrValue> {
    let flow = meaningful(element.number(Attr::RatedVolumeFlow))?;
    let height = meaningful(element.number(Attr::RatedHeight))?;
    Some(AttrValue::Number(hydraulic_power_kw(flow, height)))
}

/// Fixed fallback values.
#[derive(Debug, Clone, Default)]
pub struct DefaultResolver {
    defaults: BTreeMap<Attr, AttrValue>,
}

impl DefaultResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, attr: Attr, value: impl Into<AttrValue>) -> Self {
        self.defaults.insert(attr, value.into());
        self
    }
}

impl AttributeResolver for DefaultResolver {
    fn name(&self) -> &'static str {
        "default"
    }

    fn resolve(&self, _element: &Element, attr: Attr) -> Option<AttrValue> {
        self.defaults.get(&attr).cloned()
    }
}

#[derive(Default)]
pub struct ResolverChain {
    resolvers: Vec<Box<dyn AttributeResolver>>,
}

impl ResolverChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, resolver: impl AttributeResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// Property names, then name patterns, then derived values.
    pub fn standard() -> Self {
        Self::new()
            .push(PropertyResolver::default())
            .push(PatternResolver::default())
            .push(FunctionResolver::hydraulic())
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Resolve one attribute. Values already available are kept.
    pub fn resolve(&self, element: &Element, attr: Attr) -> AttributeState {
        if let AttributeState::Available(v) = element.attributes.state(attr) {
            return AttributeState::Available(v.clone());
        }
        for r in &self.resolvers {
            match r.resolve(element, attr) {
                Some(AttrValue::Number(v)) if meaningful(Some(v)).is_none() => continue,
                Some(value) => {
                    tracing::trace!(element = %element.id, %attr, source = r.name(), "resolved");
                    return AttributeState::Available(value);
                }
                None => {}
            }
        }
        AttributeState::Unavailable
    }
}
