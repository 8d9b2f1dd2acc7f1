//! Model validation logic.

use std::collections::HashSet;

use crate::error::{GraphError, GraphResult};
use crate::model::Model;

/// Validate that elements and ports agree about ownership and that every
/// connection is symmetric.
pub(crate) fn validate_model(model: &Model) -> GraphResult<()> {
    for element in model.elements() {
        let mut seen = HashSet::new();
        for &p in element.ports() {
            let port = model.port(p)?;
            if port.parent() != element.id || !seen.insert(p) {
                return Err(GraphError::InconsistentContraction {
                    port: p,
                    element: element.id,
                });
            }
        }
        for &m in element.members() {
            model.element(m)?;
        }
    }

    for port in model.ports() {
        let parent = model
            .element(port.parent())
            .map_err(|_| GraphError::UnknownElement {
                element: port.parent(),
            })?;
        if !parent.ports().contains(&port.id) {
            return Err(GraphError::InconsistentContraction {
                port: port.id,
                element: parent.id,
            });
        }
        if let Some(peer) = port.connection() {
            let other = model.port(peer)?;
            if other.connection() != Some(port.id) {
                return Err(GraphError::InconsistentContraction {
                    port: peer,
                    element: other.parent(),
                });
            }
        }
    }
    Ok(())
}
