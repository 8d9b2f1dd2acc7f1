//! Element/port arena.
//!
//! The model owns every element and port ever created, including the ones
//! absorbed into aggregates. Nothing is deleted from the arena; absorbed or
//! removed items only lose their guid registration and their place in the
//! [`HvacGraph`](crate::HvacGraph) contraction, so provenance stays intact.

use std::collections::{BTreeMap, HashMap};

use hr_core::{ElementId, Id, PortId};
use nalgebra::Point3;
use uuid::Uuid;

use crate::attribute::{Attr, AttrValue, Attributes};
use crate::error::{GraphError, GraphResult};

/// Flow direction seen from the port's own element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowDirection {
    /// Medium enters the element.
    Into,
    /// Medium leaves the element.
    OutOf,
    Undirected,
    #[default]
    Unknown,
}

impl FlowDirection {
    pub fn inverse(self) -> Self {
        match self {
            FlowDirection::Into => FlowDirection::OutOf,
            FlowDirection::OutOf => FlowDirection::Into,
            other => other,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Port {
    pub id: PortId,
    pub guid: String,
    pub(crate) parent: ElementId,
    pub(crate) aggregated_parent: Option<ElementId>,
    pub(crate) connection: Option<PortId>,
    pub(crate) flow_direction: FlowDirection,
    pub(crate) flow_master: bool,
    pub(crate) position: Option<Point3<f64>>,
    pub(crate) originals: Vec<PortId>,
}

impl Port {
    /// Element that created this port.
    pub fn parent(&self) -> ElementId {
        self.parent
    }

    /// Aggregate whose port replaced this one, if any.
    pub fn aggregated_parent(&self) -> Option<ElementId> {
        self.aggregated_parent
    }

    pub fn connection(&self) -> Option<PortId> {
        self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn flow_direction(&self) -> FlowDirection {
        self.flow_direction
    }

    pub fn is_flow_master(&self) -> bool {
        self.flow_master
    }

    pub fn position(&self) -> Option<Point3<f64>> {
        self.position
    }

    /// Ports this aggregation port stands in for. Empty for ordinary ports.
    pub fn originals(&self) -> &[PortId] {
        &self.originals
    }

    pub fn is_aggregation_port(&self) -> bool {
        !self.originals.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Element {
    pub id: ElementId,
    pub guid: String,
    pub name: String,
    pub ifc_type: String,
    pub attributes: Attributes,
    /// Raw named values as exported by the authoring tool.
    pub properties: BTreeMap<String, f64>,
    pub(crate) ports: Vec<PortId>,
    pub(crate) aggregation: Option<ElementId>,
    pub(crate) members: Vec<ElementId>,
    pub(crate) position: Option<Point3<f64>>,
}

impl Element {
    pub fn ports(&self) -> &[PortId] {
        &self.ports
    }

    /// Aggregate this element was absorbed into.
    pub fn aggregation(&self) -> Option<ElementId> {
        self.aggregation
    }

    pub fn members(&self) -> &[ElementId] {
        &self.members
    }

    pub fn is_aggregate(&self) -> bool {
        !self.members.is_empty()
    }

    pub fn is_type(&self, ifc_type: &str) -> bool {
        self.ifc_type == ifc_type
    }

    pub fn number(&self, attr: Attr) -> Option<f64> {
        self.attributes.number(attr)
    }

    /// Every unordered pair of the element's own ports.
    pub fn inner_connections(&self) -> Vec<(PortId, PortId)> {
        let mut out = Vec::new();
        for (i, &a) in self.ports.iter().enumerate() {
            for &b in &self.ports[i + 1..] {
                out.push((a, b));
            }
        }
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct Model {
    elements: Vec<Element>,
    ports: Vec<Port>,
    element_guids: HashMap<String, ElementId>,
    port_guids: HashMap<String, PortId>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element with a freshly generated guid.
    pub fn add_element(&mut self, name: impl Into<String>, ifc_type: impl Into<String>) -> ElementId {
        let guid = Uuid::new_v4().to_string();
        self.push_element(guid, name.into(), ifc_type.into())
    }

    pub fn add_element_with_guid(
        &mut self,
        guid: impl Into<String>,
        name: impl Into<String>,
        ifc_type: impl Into<String>,
    ) -> GraphResult<ElementId> {
        let guid = guid.into();
        if self.element_guids.contains_key(&guid) {
            return Err(GraphError::DuplicateGuid { guid });
        }
        Ok(self.push_element(guid, name.into(), ifc_type.into()))
    }

    fn push_element(&mut self, guid: String, name: String, ifc_type: String) -> ElementId {
        let id = Id::from_index(self.elements.len() as u32);
        self.element_guids.insert(guid.clone(), id);
        self.elements.push(Element {
            id,
            guid,
            name,
            ifc_type,
            attributes: Attributes::new(),
            properties: BTreeMap::new(),
            ports: Vec::new(),
            aggregation: None,
            members: Vec::new(),
            position: None,
        });
        id
    }

    /// Add a port to an existing element.
    pub fn add_port(
        &mut self,
        parent: ElementId,
        position: Option<Point3<f64>>,
    ) -> GraphResult<PortId> {
        self.element(parent)?;
        Ok(self.push_port(parent, position))
    }

    /// Push a port without checking the parent; the builder validates later.
    pub(crate) fn push_port(&mut self, parent: ElementId, position: Option<Point3<f64>>) -> PortId {
        let id = Id::from_index(self.ports.len() as u32);
        let guid = Uuid::new_v4().to_string();
        self.port_guids.insert(guid.clone(), id);
        self.ports.push(Port {
            id,
            guid,
            parent,
            aggregated_parent: None,
            connection: None,
            flow_direction: FlowDirection::Unknown,
            flow_master: false,
            position,
            originals: Vec::new(),
        });
        if let Some(element) = self.elements.get_mut(parent.slot()) {
            element.ports.push(id);
        }
        id
    }

    /// Create an aggregate element over `members`.
    ///
    /// Members must exist and must not belong to another aggregate yet. They
    /// are only marked as absorbed once the aggregate is merged. The
    /// aggregate's position is the centroid of the members' positions.
    pub fn add_aggregate(
        &mut self,
        guid: String,
        name: impl Into<String>,
        ifc_type: impl Into<String>,
        members: &[ElementId],
    ) -> GraphResult<ElementId> {
        if self.element_guids.contains_key(&guid) {
            return Err(GraphError::DuplicateGuid { guid });
        }
        for &m in members {
            if let Some(aggregate) = self.element(m)?.aggregation {
                return Err(GraphError::AlreadyAggregated {
                    element: m,
                    aggregate,
                });
            }
        }
        let position = centroid(members.iter().filter_map(|&m| self.element_position(m)));
        let id = self.push_element(guid, name.into(), ifc_type.into());
        let element = &mut self.elements[id.slot()];
        element.members = members.to_vec();
        element.position = position;
        Ok(id)
    }

    /// Create a port on `parent` that stands in for `originals`.
    ///
    /// The flow direction is taken over when all originals agree on it.
    pub fn add_aggregation_port(
        &mut self,
        parent: ElementId,
        originals: &[PortId],
    ) -> GraphResult<PortId> {
        self.element(parent)?;
        let mut direction = None;
        for &o in originals {
            let d = self.port(o)?.flow_direction;
            direction = match direction {
                None => Some(d),
                Some(prev) if prev == d => Some(d),
                Some(_) => Some(FlowDirection::Unknown),
            };
        }
        let position = centroid(originals.iter().filter_map(|&o| self.ports[o.slot()].position));
        let id = self.push_port(parent, position);
        let port = &mut self.ports[id.slot()];
        port.originals = originals.to_vec();
        port.flow_direction = direction.unwrap_or_default();
        Ok(id)
    }

    pub fn element(&self, id: ElementId) -> GraphResult<&Element> {
        self.elements
            .get(id.slot())
            .ok_or(GraphError::UnknownElement { element: id })
    }

    pub fn element_mut(&mut self, id: ElementId) -> GraphResult<&mut Element> {
        self.elements
            .get_mut(id.slot())
            .ok_or(GraphError::UnknownElement { element: id })
    }

    pub fn port(&self, id: PortId) -> GraphResult<&Port> {
        self.ports
            .get(id.slot())
            .ok_or(GraphError::UnknownPort { port: id })
    }

    pub(crate) fn port_mut(&mut self, id: PortId) -> GraphResult<&mut Port> {
        self.ports
            .get_mut(id.slot())
            .ok_or(GraphError::UnknownPort { port: id })
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn element_by_guid(&self, guid: &str) -> Option<ElementId> {
        self.element_guids.get(guid).copied()
    }

    pub fn port_by_guid(&self, guid: &str) -> Option<PortId> {
        self.port_guids.get(guid).copied()
    }

    pub fn set_attribute(
        &mut self,
        element: ElementId,
        attr: Attr,
        value: impl Into<AttrValue>,
    ) -> GraphResult<()> {
        self.element_mut(element)?.attributes.set(attr, value);
        Ok(())
    }

    pub fn set_position(&mut self, element: ElementId, position: Point3<f64>) -> GraphResult<()> {
        self.element_mut(element)?.position = Some(position);
        Ok(())
    }

    /// Explicit position, or the centroid of the element's port positions.
    pub fn element_position(&self, id: ElementId) -> Option<Point3<f64>> {
        let element = self.elements.get(id.slot())?;
        element.position.or_else(|| {
            centroid(
                element
                    .ports
                    .iter()
                    .filter_map(|p| self.ports.get(p.slot()).and_then(|p| p.position)),
            )
        })
    }

    pub fn set_flow_direction(
        &mut self,
        port: PortId,
        direction: FlowDirection,
        master: bool,
    ) -> GraphResult<()> {
        let p = self.port_mut(port)?;
        if p.flow_master && p.flow_direction != direction {
            return Err(GraphError::FlowDirectionLocked { port });
        }
        p.flow_direction = direction;
        p.flow_master = p.flow_master || master;
        Ok(())
    }

    /// Connect two ports. Connecting an already connected pair again is a no-op.
    ///
    /// When exactly one side is the flow master the other side takes the
    /// inverse direction.
    pub fn connect(&mut self, a: PortId, b: PortId) -> GraphResult<()> {
        let pa = self.port(a)?.clone();
        let pb = self.port(b)?.clone();
        if a == b || pa.parent == pb.parent {
            return Err(GraphError::InconsistentContraction {
                port: b,
                element: pa.parent,
            });
        }
        if pa.connection == Some(b) && pb.connection == Some(a) {
            return Ok(());
        }
        if let Some(peer) = pa.connection {
            return Err(GraphError::AlreadyConnected {
                port: a,
                peer,
                requested: b,
            });
        }
        if let Some(peer) = pb.connection {
            return Err(GraphError::AlreadyConnected {
                port: b,
                peer,
                requested: a,
            });
        }
        if !flow_compatible(&pa, &pb) {
            return Err(GraphError::FlowMasterConflict { port: a, peer: b });
        }
        match (pa.flow_master, pb.flow_master) {
            (true, true) => {}
            (true, false) => self.ports[b.slot()].flow_direction = pa.flow_direction.inverse(),
            (false, true) => self.ports[a.slot()].flow_direction = pb.flow_direction.inverse(),
            (false, false) => {}
        }
        self.ports[a.slot()].connection = Some(b);
        self.ports[b.slot()].connection = Some(a);
        Ok(())
    }

    /// Disconnect a port from its peer, returning the former peer.
    pub fn disconnect(&mut self, port: PortId) -> GraphResult<Option<PortId>> {
        let peer = self.port_mut(port)?.connection.take();
        if let Some(peer) = peer {
            if let Some(p) = self.ports.get_mut(peer.slot()) {
                if p.connection == Some(port) {
                    p.connection = None;
                }
            }
        }
        Ok(peer)
    }

    pub(crate) fn set_aggregated_parent(&mut self, port: PortId, parent: ElementId) -> GraphResult<()> {
        self.port_mut(port)?.aggregated_parent = Some(parent);
        Ok(())
    }

    /// Drop the guid registration of an element and its ports.
    pub(crate) fn retire(&mut self, element: ElementId) {
        let Some(e) = self.elements.get(element.slot()) else {
            return;
        };
        if self.element_guids.get(&e.guid) == Some(&element) {
            self.element_guids.remove(&e.guid);
        }
        let ports = e.ports.clone();
        for p in ports {
            self.retire_port_guid(p);
        }
    }

    pub(crate) fn retire_port_guid(&mut self, port: PortId) {
        if let Some(p) = self.ports.get(port.slot()) {
            if self.port_guids.get(&p.guid) == Some(&port) {
                self.port_guids.remove(&p.guid);
            }
        }
    }

    pub(crate) fn is_registered(&self, element: ElementId) -> bool {
        self.elements
            .get(element.slot())
            .is_some_and(|e| self.element_guids.get(&e.guid) == Some(&element))
    }

    /// Parents of the ports connected to `element`'s own ports.
    pub fn neighbors(&self, element: ElementId) -> Vec<ElementId> {
        let Some(e) = self.elements.get(element.slot()) else {
            return Vec::new();
        };
        let mut out: Vec<ElementId> = e
            .ports
            .iter()
            .filter_map(|p| self.ports.get(p.slot())?.connection)
            .filter_map(|q| self.ports.get(q.slot()).map(|q| q.parent))
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// Non-aggregate elements an aggregate was built from, in member order.
    pub fn leaf_members(&self, aggregate: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![aggregate];
        while let Some(id) = stack.pop() {
            match self.elements.get(id.slot()) {
                Some(e) if e.is_aggregate() => stack.extend(e.members.iter().rev()),
                Some(_) => out.push(id),
                None => {}
            }
        }
        out
    }
}

/// Two flow masters may only meet when their directions fit together.
pub(crate) fn flow_compatible(a: &Port, b: &Port) -> bool {
    !(a.flow_master && b.flow_master) || a.flow_direction == b.flow_direction.inverse()
}

pub(crate) fn centroid(points: impl Iterator<Item = Point3<f64>>) -> Option<Point3<f64>> {
    let mut sum = nalgebra::Vector3::zeros();
    let mut n = 0usize;
    for p in points {
        sum += p.coords;
        n += 1;
    }
    (n > 0).then(|| Point3::from(sum / n as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_pipes() -> (Model, PortId, PortId) {
        let mut model = Model::new();
        let a = model.add_element("a", "IfcPipeSegment");
        let b = model.add_element("b", "IfcPipeSegment");
        let pa = model.add_port(a, None).unwrap();
        let pb = model.add_port(b, None).unwrap();
        (model, pa, pb)
    }

    #[test]
    fn connect_is_symmetric_and_idempotent() {
        let (mut model, pa, pb) = two_pipes();
        model.connect(pa, pb).unwrap();
        model.connect(pb, pa).unwrap();
        assert_eq!(model.port(pa).unwrap().connection(), Some(pb));
        assert_eq!(model.port(pb).unwrap().connection(), Some(pa));

        let a = model.port(pa).unwrap().parent();
        let b = model.port(pb).unwrap().parent();
        assert_eq!(model.neighbors(a), vec![b]);

        assert_eq!(model.disconnect(pa).unwrap(), Some(pb));
        assert!(!model.port(pb).unwrap().is_connected());
    }

    #[test]
    fn connect_rejects_busy_port() {
        let (mut model, pa, pb) = two_pipes();
        let c = model.add_element("c", "IfcPipeSegment");
        let pc = model.add_port(c, None).unwrap();
        model.connect(pa, pb).unwrap();
        let err = model.connect(pc, pa).unwrap_err();
        assert!(matches!(err, GraphError::AlreadyConnected { port, .. } if port == pa));
    }

    #[test]
    fn flow_master_sets_peer_direction() {
        let (mut model, pa, pb) = two_pipes();
        model
            .set_flow_direction(pa, FlowDirection::OutOf, true)
            .unwrap();
        model.connect(pa, pb).unwrap();
        assert_eq!(model.port(pb).unwrap().flow_direction(), FlowDirection::Into);

        let (mut model, pa, pb) = two_pipes();
        model.set_flow_direction(pa, FlowDirection::Into, true).unwrap();
        model.set_flow_direction(pb, FlowDirection::Into, true).unwrap();
        assert!(matches!(
            model.connect(pa, pb),
            Err(GraphError::FlowMasterConflict { .. })
        ));
        assert!(!model.port(pa).unwrap().is_connected());
        assert_eq!(
            model.set_flow_direction(pa, FlowDirection::OutOf, false),
            Err(GraphError::FlowDirectionLocked { port: pa })
        );
        assert!(model.neighbors(model.port(pa).unwrap().parent()).is_empty());
    }

    #[test]
    fn opposed_flow_masters_connect() {
        let (mut model, pa, pb) = two_pipes();
        model.set_flow_direction(pa, FlowDirection::OutOf, true).unwrap();
        model.set_flow_direction(pb, FlowDirection::Into, true).unwrap();
        model.connect(pa, pb).unwrap();
        assert_eq!(model.port(pa).unwrap().connection(), Some(pb));
        assert_eq!(model.port(pa).unwrap().flow_direction(), FlowDirection::OutOf);
        assert_eq!(model.port(pb).unwrap().flow_direction(), FlowDirection::Into);
    }

    #[test]
    fn retire_drops_element_and_port_guids() {
        let (mut model, pa, _) = two_pipes();
        let a = model.port(pa).unwrap().parent();
        let guid = model.element(a).unwrap().guid.clone();
        let port_guid = model.port(pa).unwrap().guid.clone();
        model.retire(a);
        assert!(model.element_by_guid(&guid).is_none());
        assert!(model.port_by_guid(&port_guid).is_none());
        assert!(!model.is_registered(a));
        assert!(model.element(a).is_ok());
    }

    #[test]
    fn duplicate_guid_rejected() {
        let mut model = Model::new();
        model.add_element_with_guid("g1", "a", "IfcPump").unwrap();
        let err = model.add_element_with_guid("g1", "b", "IfcPump").unwrap_err();
        assert_eq!(err, GraphError::DuplicateGuid { guid: "g1".into() });
    }

    #[test]
    fn aggregate_takes_member_centroid() {
        let mut model = Model::new();
        let a = model.add_element("a", "IfcPipeSegment");
        let b = model.add_element("b", "IfcPipeSegment");
        model.set_position(a, Point3::new(0.0, 0.0, 0.0)).unwrap();
        model.set_position(b, Point3::new(2.0, 4.0, 0.0)).unwrap();
        let agg = model
            .add_aggregate("agg".into(), "strand", "PipeStrand", &[a, b])
            .unwrap();
        assert_eq!(model.element_position(agg), Some(Point3::new(1.0, 2.0, 0.0)));
        assert_eq!(model.leaf_members(agg), vec![a, b]);
        // not absorbed before a merge
        assert_eq!(model.element(a).unwrap().aggregation(), None);
    }

    #[test]
    fn absorbed_member_cannot_join_another_aggregate() {
        let mut model = Model::new();
        let a = model.add_element("a", "IfcPipeSegment");
        let agg = model
            .add_aggregate("agg".into(), "strand", "PipeStrand", &[a])
            .unwrap();
        model.element_mut(a).unwrap().aggregation = Some(agg);
        let err = model
            .add_aggregate("agg2".into(), "strand", "PipeStrand", &[a])
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::AlreadyAggregated {
                element: a,
                aggregate: agg
            }
        );
    }

    #[test]
    fn aggregation_port_inherits_common_direction() {
        let mut model = Model::new();
        let a = model.add_element("a", "IfcPump");
        let p1 = model.add_port(a, Some(Point3::new(0.0, 0.0, 0.0))).unwrap();
        let p2 = model.add_port(a, Some(Point3::new(2.0, 0.0, 0.0))).unwrap();
        model.set_flow_direction(p1, FlowDirection::Into, false).unwrap();
        model.set_flow_direction(p2, FlowDirection::Into, false).unwrap();
        let agg = model
            .add_aggregate("agg".into(), "pp", "ParallelPump", &[a])
            .unwrap();
        let ap = model.add_aggregation_port(agg, &[p1, p2]).unwrap();
        let port = model.port(ap).unwrap();
        assert!(port.is_aggregation_port());
        assert_eq!(port.flow_direction(), FlowDirection::Into);
        assert_eq!(port.position(), Some(Point3::new(1.0, 0.0, 0.0)));
    }
}
