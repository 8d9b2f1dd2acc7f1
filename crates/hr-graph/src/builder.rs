//! Incremental network builder.

use hr_core::{ElementId, PortId};
use nalgebra::Point3;

use crate::attribute::{Attr, AttrValue};
use crate::error::{GraphError, GraphResult};
use crate::graph::HvacGraph;
use crate::model::{FlowDirection, Model};

/// Builder for assembling a network of elements and port connections.
///
/// Connections are only recorded here; `build()` applies them, validates the
/// model and contracts it into an [`HvacGraph`]. The first rejected flow
/// direction is reported by `build()` as well.
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    model: Model,
    connections: Vec<(PortId, PortId)>,
    error: Option<GraphError>,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_element(&mut self, name: impl Into<String>, ifc_type: impl Into<String>) -> ElementId {
        self.model.add_element(name, ifc_type)
    }

    pub fn add_element_with_guid(
        &mut self,
        guid: impl Into<String>,
        name: impl Into<String>,
        ifc_type: impl Into<String>,
    ) -> GraphResult<ElementId> {
        self.model.add_element_with_guid(guid, name, ifc_type)
    }

    pub fn add_port(&mut self, element: ElementId) -> PortId {
        self.model.push_port(element, None)
    }

    pub fn add_port_at(&mut self, element: ElementId, position: Point3<f64>) -> PortId {
        self.model.push_port(element, Some(position))
    }

    pub fn connect(&mut self, a: PortId, b: PortId) {
        self.connections.push((a, b));
    }

    pub fn set_attribute(&mut self, element: ElementId, attr: Attr, value: impl Into<AttrValue>) {
        if let Ok(e) = self.model.element_mut(element) {
            e.attributes.set(attr, value);
        }
    }

    pub fn set_property(&mut self, element: ElementId, name: impl Into<String>, value: f64) {
        if let Ok(e) = self.model.element_mut(element) {
            e.properties.insert(name.into(), value);
        }
    }

    pub fn set_position(&mut self, element: ElementId, position: Point3<f64>) {
        if let Ok(e) = self.model.element_mut(element) {
            e.position = Some(position);
        }
    }

    pub fn set_flow_direction(&mut self, port: PortId, direction: FlowDirection, master: bool) {
        if let Err(e) = self.model.set_flow_direction(port, direction, master) {
            self.error.get_or_insert(e);
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Apply connections, validate and contract.
    pub fn build(mut self) -> GraphResult<HvacGraph> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        for (a, b) in std::mem::take(&mut self.connections) {
            self.model.connect(a, b)?;
        }
        HvacGraph::from_model(self.model)
    }
}
