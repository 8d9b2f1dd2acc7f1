//! Graph-specific error types.

use hr_core::{ElementId, HrError, PortId};

pub type GraphResult<T> = Result<T, GraphError>;

/// Model, contraction and merge errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A port is already connected to a different peer.
    AlreadyConnected {
        port: PortId,
        peer: PortId,
        requested: PortId,
    },

    /// A boundary port that needs a replacement link has no connection.
    DanglingPort { port: PortId },

    /// An element id that is not part of the model.
    UnknownElement { element: ElementId },

    /// A port id that is not part of the model.
    UnknownPort { port: PortId },

    /// The element exists but is not a node of the graph (absorbed or removed).
    NotLive { element: ElementId },

    /// A port listed by an element does not point back at it, or a
    /// connection is not symmetric.
    InconsistentContraction { port: PortId, element: ElementId },

    /// Both ends of a connection are flow masters and their directions
    /// do not fit together.
    FlowMasterConflict { port: PortId, peer: PortId },

    /// A flow master port refuses a different direction.
    FlowDirectionLocked { port: PortId },

    /// A globally unique identifier was registered twice.
    DuplicateGuid { guid: String },

    /// An inner connection passed to a merge touches an element outside it.
    ForeignInnerConnection { a: PortId, b: PortId },

    /// An element was already absorbed into another aggregate.
    AlreadyAggregated {
        element: ElementId,
        aggregate: ElementId,
    },

    /// A mapped port whose peer is interior to the same merge.
    InteriorMapping { port: PortId, peer: PortId },
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::AlreadyConnected {
                port,
                peer,
                requested,
            } => write!(
                f,
                "Port {} is already connected to {} (requested {})",
                port, peer, requested
            ),
            GraphError::DanglingPort { port } => {
                write!(f, "Boundary port {} has no connection to replace", port)
            }
            GraphError::UnknownElement { element } => {
                write!(f, "Element {} does not exist", element)
            }
            GraphError::UnknownPort { port } => write!(f, "Port {} does not exist", port),
            GraphError::NotLive { element } => {
                write!(f, "Element {} is not a node of the graph", element)
            }
            GraphError::InconsistentContraction { port, element } => write!(
                f,
                "Port {} and element {} disagree about their relation",
                port, element
            ),
            GraphError::FlowMasterConflict { port, peer } => {
                write!(f, "Flow master ports {} and {} have conflicting directions", port, peer)
            }
            GraphError::FlowDirectionLocked { port } => {
                write!(f, "Flow direction of port {} is locked", port)
            }
            GraphError::DuplicateGuid { guid } => write!(f, "Guid '{}' is already in use", guid),
            GraphError::ForeignInnerConnection { a, b } => write!(
                f,
                "Inner connection {}-{} leaves the merged elements",
                a, b
            ),
            GraphError::AlreadyAggregated { element, aggregate } => write!(
                f,
                "Element {} already belongs to aggregate {}",
                element, aggregate
            ),
            GraphError::InteriorMapping { port, peer } => write!(
                f,
                "Port {} is mapped to a replacement but its peer {} is removed without one",
                port, peer
            ),
        }
    }
}

impl std::error::Error for GraphError {}

impl From<GraphError> for HrError {
    fn from(err: GraphError) -> Self {
        HrError::Invariant {
            what: err.to_string(),
        }
    }
}
