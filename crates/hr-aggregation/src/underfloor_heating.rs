//! Pipe strands laid out as an underfloor heating loop.
//!
//! A strand counts as underfloor heating when it is long (many elements),
//! flat, meanders with a typical pipe pitch, and covers a floor area whose
//! pipe density is plausible for a heating register.

use hr_core::{
    Area, ElementId, Length, LengthUnit, in_m2, in_mm, in_ratio, m, mm, meaningful,
};
use hr_graph::{Attr, ElementGraph, HvacGraph};
use nalgebra::Point3;

use crate::aggregate::{Aggregate, AggregatePlan, Match, MatchMeta, build_aggregate};
use crate::calc::UnderfloorRecord;
use crate::error::AggregationResult;
use crate::kind::AggregateKind;
use crate::pipe_strand::{chains, edge_ports_of_strait};
use crate::traits::Matcher;

const MIN_ELEMENTS: usize = 20;
/// Share of ports that must lie in the dominant plane.
const PLANE_SHARE: f64 = 0.8;
/// Coordinate tolerance in model units.
const ALIGN_TOL: f64 = 1.0;
const MIN_AREA_M2: f64 = 1.0;
const SPACING_MM: (f64, f64) = (90.0, 210.0);
const DENSITY: (f64, f64) = (0.01, 0.09);

#[derive(Debug, Clone, Copy, Default)]
pub struct UnderfloorHeating {
    /// Unit of the port and element coordinates.
    pub length_unit: LengthUnit,
}

impl UnderfloorHeating {
    pub fn new(length_unit: LengthUnit) -> Self {
        Self { length_unit }
    }

    /// Measured values when `nodes` pass every criterion, `None` otherwise.
    pub fn check_conditions(&self, graph: &HvacGraph, nodes: &[ElementId]) -> Option<MatchMeta> {
        if nodes.len() < MIN_ELEMENTS {
            return None;
        }
        let model = graph.model();

        let mut element_ports: Vec<(ElementId, Vec<Point3<f64>>)> = Vec::with_capacity(nodes.len());
        for &n in nodes {
            let mut positions = Vec::new();
            for &p in graph.contracted_ports(n) {
                let Some(pos) = model.port(p).ok().and_then(|p| p.position()) else {
                    tracing::debug!(element = %n, "port without position, not underfloor heating");
                    return None;
                };
                positions.push(pos);
            }
            element_ports.push((n, positions));
        }

        let zs: Vec<f64> = element_ports
            .iter()
            .flat_map(|(_, ps)| ps.iter().map(|p| p.z))
            .collect();
        let (z0, share) = dominant_plane(&zs)?;
        if share < PLANE_SHARE {
            return None;
        }

        let mut bounds = Bounds::default();
        let mut x_oriented = 0usize;
        let mut y_oriented = 0usize;
        for (n, ports) in &element_ports {
            if ports.is_empty() || ports.iter().any(|p| (p.z - z0).abs() >= ALIGN_TOL) {
                continue;
            }
            if let Some(pos) = model.element_position(*n) {
                bounds.add(pos);
            }
            if let [a, b] = ports.as_slice() {
                if (a.x - b.x).abs() < ALIGN_TOL {
                    y_oriented += 1;
                }
                if (a.y - b.y).abs() < ALIGN_TOL {
                    x_oriented += 1;
                }
            }
        }
        let (dx, dy) = bounds.span()?;

        let unit = self.length_unit;
        let heating_area: Area = unit.length(dx) * unit.length(dy);
        if in_m2(heating_area) < MIN_AREA_M2 {
            return None;
        }

        let spacing = |span: f64, count: usize| -> Option<f64> {
            (count > 1).then(|| in_mm(unit.length(span / (count - 1) as f64)))
        };
        let x_spacing = spacing(dx, y_oriented);
        let y_spacing = spacing(dy, x_oriented);
        let in_range = |s: Option<f64>| s.is_some_and(|s| (SPACING_MM.0..=SPACING_MM.1).contains(&s));
        if !in_range(x_spacing) && !in_range(y_spacing) {
            return None;
        }

        let mut total = 0.0;
        let mut d2l = 0.0;
        for &n in nodes {
            let Ok(e) = model.element(n) else { continue };
            let (Some(l), Some(d)) = (
                meaningful(e.number(Attr::Length)),
                meaningful(e.number(Attr::Diameter)),
            ) else {
                tracing::debug!(element = %e.name, "no length or diameter, skipped in density check");
                continue;
            };
            total += l;
            d2l += d * d * l;
        }
        if total <= 0.0 {
            return None;
        }
        let avg_diameter = (d2l / total).sqrt();
        let total_length: Length = m(total);
        let density = in_ratio(total_length * mm(avg_diameter) / heating_area);
        if !(density > DENSITY.0 && density < DENSITY.1) {
            return None;
        }

        let mut meta = MatchMeta::default()
            .with_value(Attr::Length, total)
            .with_value(Attr::Diameter, avg_diameter)
            .with_value(Attr::HeatingArea, in_m2(heating_area));
        if let Some(s) = x_spacing {
            meta = meta.with_value(Attr::XSpacing, s);
        }
        if let Some(s) = y_spacing {
            meta = meta.with_value(Attr::YSpacing, s);
        }
        Some(meta)
    }
}

/// Most populated z-plane and the share of coordinates within tolerance.
fn dominant_plane(zs: &[f64]) -> Option<(f64, f64)> {
    let mut best: Option<(f64, usize)> = None;
    for &z in zs {
        let count = zs.iter().filter(|o| (*o - z).abs() < ALIGN_TOL).count();
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((z, count));
        }
    }
    best.map(|(z, c)| (z, c as f64 / zs.len() as f64))
}

#[derive(Debug, Default)]
struct Bounds {
    min: Option<(f64, f64)>,
    max: Option<(f64, f64)>,
}

impl Bounds {
    fn add(&mut self, p: Point3<f64>) {
        self.min = Some(self.min.map_or((p.x, p.y), |(x, y)| (x.min(p.x), y.min(p.y))));
        self.max = Some(self.max.map_or((p.x, p.y), |(x, y)| (x.max(p.x), y.max(p.y))));
    }

    fn span(&self) -> Option<(f64, f64)> {
        let (min, max) = (self.min?, self.max?);
        Some((max.0 - min.0, max.1 - min.1))
    }
}

impl Matcher for UnderfloorHeating {
    fn kind(&self) -> AggregateKind {
        AggregateKind::UnderfloorHeating
    }

    fn find_matches(&self, graph: &ElementGraph<'_>) -> Vec<Match> {
        let found: Vec<Match> = chains(graph, true)
            .into_iter()
            .filter_map(|c| {
                let meta = self.check_conditions(graph.graph(), &c)?;
                Some(Match::new(AggregateKind::UnderfloorHeating, c).with_meta(meta))
            })
            .collect();
        tracing::info!(matches = found.len(), "underfloor heatings found");
        found
    }

    fn build(
        &self,
        graph: &mut HvacGraph,
        name: &str,
        found: &Match,
    ) -> AggregationResult<Vec<Aggregate>> {
        let edge = edge_ports_of_strait(&graph.element_graph().subgraph(found.nodes.iter().copied()))?;
        let plan = AggregatePlan {
            kind: AggregateKind::UnderfloorHeating,
            name: name.to_owned(),
            members: found.nodes.clone(),
            port_groups: edge.into_iter().map(|p| vec![p]).collect(),
            record: UnderfloorRecord::from_meta(&found.meta.values).to_attributes(),
        };
        Ok(vec![build_aggregate(graph, plan)?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hr_graph::NetworkBuilder;

    #[test]
    fn dominant_plane_share() {
        let (z, share) = dominant_plane(&[0.0, 0.2, 0.5, 100.0]).unwrap();
        assert_eq!(z, 0.0);
        assert_eq!(share, 0.75);
        assert!(dominant_plane(&[]).is_none());
    }

    #[test]
    fn short_strand_is_rejected_early() {
        let mut b = NetworkBuilder::new();
        let ids: Vec<_> = (0..5)
            .map(|i| b.add_element(format!("p{i}"), "IfcPipeSegment"))
            .collect();
        let g = b.build().unwrap();
        assert!(UnderfloorHeating::default().check_conditions(&g, &ids).is_none());
    }
}
