//! Type tags of the building elements the reduction knows about.
//!
//! Elements carry their IFC entity name verbatim; the matchers only ever
//! compare against these constants.

pub const PIPE_SEGMENT: &str = "IfcPipeSegment";
pub const PIPE_FITTING: &str = "IfcPipeFitting";
pub const PUMP: &str = "IfcPump";
pub const VALVE: &str = "IfcValve";
pub const SPACE_HEATER: &str = "IfcSpaceHeater";
pub const BOILER: &str = "IfcBoiler";
pub const CHILLER: &str = "IfcChiller";
pub const COOLING_TOWER: &str = "IfcCoolingTower";
pub const HEAT_PUMP: &str = "IfcHeatPump";
pub const STORAGE: &str = "IfcTank";
pub const DISTRIBUTOR: &str = "IfcDistributionChamberElement";
pub const AIR_TERMINAL: &str = "IfcAirTerminal";
pub const FLOW_METER: &str = "IfcFlowMeter";

/// Elements that only convey water and may be swallowed by a strand.
pub const PIPE_LIKE: &[&str] = &[PIPE_SEGMENT, PIPE_FITTING];

/// Elements that produce heat or cold.
pub const GENERATORS: &[&str] = &[BOILER, CHILLER, COOLING_TOWER, HEAT_PUMP];

pub fn is_one_of(ifc_type: &str, set: &[&str]) -> bool {
    set.iter().any(|t| *t == ifc_type)
}
