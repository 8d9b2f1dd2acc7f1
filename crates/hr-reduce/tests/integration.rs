//! Full reduction runs over small heating networks.

use std::collections::BTreeSet;

use hr_aggregation::AggregateKind;
use hr_core::ElementId;
use hr_graph::types::DISTRIBUTOR;
use hr_graph::{
    Attr, AttributeState, FlowDirection, HvacGraph, NetworkBuilder, ResolverChain,
    hydraulic_power_kw,
};
use hr_reduce::{KeepAll, Lod, ReduceError, Reducer, ReductionSettings, reduce};
use proptest::prelude::*;

fn link(b: &mut NetworkBuilder, x: ElementId, y: ElementId) {
    let px = b.add_port(x);
    let py = b.add_port(y);
    b.connect(px, py);
}

fn pipe(b: &mut NetworkBuilder, name: &str, length: f64, diameter: f64) -> ElementId {
    let id = b.add_element(name, "IfcPipeSegment");
    b.set_attribute(id, Attr::Length, length);
    b.set_attribute(id, Attr::Diameter, diameter);
    id
}

fn run(b: &mut NetworkBuilder, ids: &[ElementId]) {
    for w in ids.windows(2) {
        link(b, w[0], w[1]);
    }
}

/// boiler - p1 - p2 - pump - p3 - p4 - ts
/// ts - a1 - a2 - rad1 - a3 - a4 - tr
/// ts - b1 - rad2 - b2 - tr
/// tr - r1 - r2 - boiler
fn heating_circuit() -> (HvacGraph, Vec<ElementId>) {
    let mut b = NetworkBuilder::new();
    let boiler = b.add_element("boiler", "IfcBoiler");
    let p1 = pipe(&mut b, "p1", 5.0, 40.0);
    let p2 = pipe(&mut b, "p2", 3.0, 40.0);
    let pump = b.add_element("pump", "IfcPump");
    let p3 = pipe(&mut b, "p3", 2.0, 15.0);
    let p4 = pipe(&mut b, "p4", 1.0, 15.0);
    let ts = b.add_element("ts", "IfcPipeFitting");
    let a1 = pipe(&mut b, "a1", 1.0, 15.0);
    let a2 = pipe(&mut b, "a2", 1.0, 15.0);
    let rad1 = b.add_element("rad1", "IfcSpaceHeater");
    let a3 = pipe(&mut b, "a3", 1.0, 15.0);
    let a4 = pipe(&mut b, "a4", 1.0, 15.0);
    let b1 = pipe(&mut b, "b1", 1.5, 15.0);
    let rad2 = b.add_element("rad2", "IfcSpaceHeater");
    let b2 = pipe(&mut b, "b2", 1.5, 15.0);
    let tr = b.add_element("tr", "IfcPipeFitting");
    let r1 = pipe(&mut b, "r1", 4.0, 40.0);
    let r2 = pipe(&mut b, "r2", 4.0, 40.0);
    for rad in [rad1, rad2] {
        b.set_attribute(rad, Attr::RatedPower, 1.2);
    }
    run(&mut b, &[boiler, p1, p2, pump, p3, p4, ts]);
    run(&mut b, &[ts, a1, a2, rad1, a3, a4, tr]);
    run(&mut b, &[ts, b1, rad2, b2, tr]);
    run(&mut b, &[tr, r1, r2, boiler]);
    (b.build().unwrap(), vec![boiler, pump])
}

#[test]
fn heating_circuit_reduces_to_a_ring_of_six() {
    let (mut g, ids) = heating_circuit();
    let report = reduce(&mut g, &ReductionSettings::default()).unwrap();

    assert_eq!(report.nodes_before, 18);
    assert_eq!(report.nodes_after, 6);
    assert_eq!(report.count(AggregateKind::PipeStrand), 5);
    assert_eq!(report.count(AggregateKind::ParallelSpaceHeater), 1);
    assert_eq!(report.count(AggregateKind::Consumer), 0);
    assert_eq!(report.remaining_cycles, 1);
    assert!(report.failures.is_empty());

    let psh = report
        .aggregates
        .iter()
        .find(|a| a.kind == AggregateKind::ParallelSpaceHeater)
        .unwrap();
    assert_eq!(psh.name, "ParallelSpaceHeater 1");
    assert_eq!(psh.ports, 2);

    // boiler and pump survive and sit on the ring
    for id in ids {
        assert!(g.contains(id));
        assert_eq!(g.neighbors(id).len(), 2);
    }
}

#[test]
fn parallel_heaters_collect_their_power() {
    let (mut g, _) = heating_circuit();
    reduce(&mut g, &ReductionSettings::default()).unwrap();
    let psh = g
        .node_ids()
        .find(|&n| g.element(n).is_ok_and(|e| e.ifc_type == "ParallelSpaceHeater"))
        .unwrap();
    let e = g.element(psh).unwrap();
    assert_eq!(e.number(Attr::RatedPower), Some(2.4));
}

#[test]
fn no_element_is_absorbed_twice() {
    let (mut g, _) = heating_circuit();
    let report = reduce(&mut g, &ReductionSettings::default()).unwrap();

    let aggregates: Vec<_> = g
        .model()
        .elements()
        .iter()
        .filter(|e| e.is_aggregate())
        .collect();
    assert_eq!(aggregates.len(), report.aggregates.len());

    let mut seen = BTreeSet::new();
    for agg in &aggregates {
        for &m in agg.members() {
            assert!(seen.insert(m), "{m} absorbed twice");
            let member = g.model().element(m).unwrap();
            assert_eq!(member.aggregation(), Some(agg.id));
        }
    }
    // each mapped port belongs to exactly one aggregate
    let mut ports = BTreeSet::new();
    for mapping in report.replacement_mappings().values() {
        for p in mapping.keys() {
            assert!(ports.insert(*p));
        }
    }
}

#[test]
fn low_pipes_leave_radiators_between_tees() {
    let (mut g, ids) = heating_circuit();
    let settings = ReductionSettings {
        pipes: Lod::Low,
        ..ReductionSettings::default()
    };
    let report = reduce(&mut g, &settings).unwrap();

    assert_eq!(report.removed_pipes, 12);
    assert_eq!(report.count(AggregateKind::PipeStrand), 0);
    assert_eq!(report.count(AggregateKind::ParallelSpaceHeater), 1);
    assert_eq!(report.nodes_after, 3);
    assert!(g.neighbors(ids[0]).contains(&ids[1]));
}

/// boiler (flow master) - pipe - pump (flow master)
fn mastered_pipe(pump_side: FlowDirection) -> (HvacGraph, [ElementId; 3]) {
    let mut b = NetworkBuilder::new();
    let boiler = b.add_element("boiler", "IfcBoiler");
    let pipe = pipe(&mut b, "r", 2.0, 25.0);
    let pump = b.add_element("pump", "IfcPump");
    let out = b.add_port(boiler);
    let (r0, r1) = (b.add_port(pipe), b.add_port(pipe));
    let inlet = b.add_port(pump);
    b.connect(out, r0);
    b.connect(r1, inlet);
    b.set_flow_direction(out, FlowDirection::OutOf, true);
    b.set_flow_direction(inlet, pump_side, true);
    (b.build().unwrap(), [boiler, pipe, pump])
}

#[test]
fn low_pipes_join_flow_masters_facing_each_other() {
    let (mut g, [boiler, pipe, pump]) = mastered_pipe(FlowDirection::Into);
    let settings = ReductionSettings {
        pipes: Lod::Low,
        ..ReductionSettings::default()
    };
    let report = reduce(&mut g, &settings).unwrap();
    assert_eq!(report.removed_pipes, 1);
    assert_eq!(report.nodes_after, 2);
    assert!(!g.contains(pipe));
    assert_eq!(g.neighbors(boiler), BTreeSet::from([pump]));
}

#[test]
fn conflicting_flow_masters_abort_without_partial_merge() {
    let (mut g, [boiler, pipe, pump]) = mastered_pipe(FlowDirection::OutOf);
    let settings = ReductionSettings {
        pipes: Lod::Low,
        ..ReductionSettings::default()
    };
    let err = reduce(&mut g, &settings).unwrap_err();
    assert!(matches!(err, ReduceError::Graph(_)));
    assert!(g.contains(pipe));
    assert_eq!(g.neighbors(pipe), BTreeSet::from([boiler, pump]));
}

#[test]
fn resolver_chain_fills_attributes_before_matching() {
    // pump - r1 - r2 - boiler, values only in raw properties
    let mut b = NetworkBuilder::new();
    let pump = b.add_element("pump", "IfcPump");
    b.set_property(pump, "NominalFlowRate", 3.6);
    b.set_property(pump, "NominalHeight", 10.0);
    let r1 = b.add_element("r1", "IfcPipeSegment");
    b.set_property(r1, "Length", 2.0);
    b.set_property(r1, "NominalDiameter", 20.0);
    let r2 = b.add_element("r2", "IfcPipeSegment");
    b.set_property(r2, "Rohrlänge", 3.0);
    b.set_attribute(r2, Attr::Diameter, 20.0);
    let boiler = b.add_element("boiler", "IfcBoiler");
    run(&mut b, &[pump, r1, r2, boiler]);
    let graph = b.build().unwrap();

    let mut plain = graph.clone();
    reduce(&mut plain, &ReductionSettings::default()).unwrap();
    let strand = plain.neighbors(pump).into_iter().next().unwrap();
    assert_eq!(plain.element(strand).unwrap().number(Attr::Length), None);

    let mut g = graph;
    let report = Reducer::new(ReductionSettings::default())
        .with_resolvers(ResolverChain::standard())
        .reduce(&mut g)
        .unwrap();
    assert_eq!(report.count(AggregateKind::PipeStrand), 1);

    let strand = g.neighbors(pump).into_iter().next().unwrap();
    let strand = g.element(strand).unwrap();
    assert_eq!(strand.number(Attr::Length), Some(5.0));
    assert_eq!(strand.number(Attr::Diameter), Some(20.0));

    let pump = g.element(pump).unwrap();
    assert_eq!(pump.number(Attr::RatedVolumeFlow), Some(3.6));
    let power = pump.number(Attr::RatedPumpPower).unwrap();
    assert!((power - hydraulic_power_kw(3.6, 10.0)).abs() < 1e-12);
    assert_eq!(
        pump.attributes.state(Attr::HeatingArea),
        &AttributeState::Unavailable
    );
    assert_eq!(
        g.element(boiler).unwrap().attributes.state(Attr::RatedPumpPower),
        &AttributeState::Unavailable
    );
}

#[test]
fn consumer_circuits_and_module_behind_distributor() {
    // d feeds two heater loops with their own pumps; the boiler sits on a
    // separate loop through d.
    let mut b = NetworkBuilder::new();
    let d = b.add_element("d", DISTRIBUTOR);
    let boiler = b.add_element("boiler", "IfcBoiler");
    run(&mut b, &[d, boiler, d]);
    for i in 0..2 {
        let pump = b.add_element(&format!("pump{i}"), "IfcPump");
        b.set_attribute(pump, Attr::RatedVolumeFlow, 1.0);
        b.set_attribute(pump, Attr::RatedHeight, 2.0);
        let heater = b.add_element(&format!("heater{i}"), "IfcSpaceHeater");
        b.set_attribute(heater, Attr::RatedPower, 3.0);
        run(&mut b, &[d, pump, heater, d]);
    }
    let mut g = b.build().unwrap();

    let report = reduce(&mut g, &ReductionSettings::default()).unwrap();
    assert_eq!(report.count(AggregateKind::Consumer), 2);
    assert_eq!(report.count(AggregateKind::ConsumerHeatingDistributorModule), 1);
    assert_eq!(report.nodes_after, 2);

    let module = g
        .node_ids()
        .find(|&n| g.element(n).is_ok_and(|e| e.ifc_type == "ConsumerHeatingDistributorModule"))
        .unwrap();
    let e = g.element(module).unwrap();
    assert_eq!(e.number(Attr::RatedPower), Some(6.0));
    assert_eq!(e.number(Attr::ConsumerCount), Some(2.0));
    assert_eq!(g.neighbors(module), BTreeSet::from([boiler]));
}

#[test]
fn dead_end_branch_is_cut_before_matching() {
    // pump - r1 - t - r2 - heater, with a capped stub t - s1 - s2
    let mut b = NetworkBuilder::new();
    let pump = b.add_element("pump", "IfcPump");
    let r1 = pipe(&mut b, "r1", 1.0, 20.0);
    let t = b.add_element("t", "IfcPipeFitting");
    let r2 = pipe(&mut b, "r2", 2.0, 20.0);
    let heater = b.add_element("heater", "IfcSpaceHeater");
    let s1 = pipe(&mut b, "s1", 0.5, 20.0);
    let s2 = pipe(&mut b, "s2", 0.5, 20.0);
    run(&mut b, &[pump, r1, t, r2, heater]);
    run(&mut b, &[t, s1, s2]);
    b.add_port(s2);
    let graph = b.build().unwrap();

    let settings = ReductionSettings {
        detect_dead_ends: true,
        ..ReductionSettings::default()
    };

    let mut kept = graph.clone();
    let report = Reducer::new(settings.clone())
        .with_dead_end_resolver(KeepAll)
        .reduce(&mut kept)
        .unwrap();
    assert_eq!(report.dead_ends_found, 1);
    assert_eq!(report.dead_ends_removed, 0);
    assert!(kept.contains(t));

    let mut cut = graph;
    let report = reduce(&mut cut, &settings).unwrap();
    assert_eq!(report.dead_ends_removed, 1);
    // r1 - t - r2 is now one plain run
    assert_eq!(report.count(AggregateKind::PipeStrand), 1);
    assert_eq!(report.nodes_after, 3);
    assert!(!cut.contains(s1) && !cut.contains(s2) && !cut.contains(t));
}

#[test]
fn report_serializes_without_mappings() {
    let (mut g, _) = heating_circuit();
    let report = reduce(&mut g, &ReductionSettings::default()).unwrap();
    let json = report.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["nodes_after"], 6);
    assert_eq!(value["per_kind"]["PipeStrand"], 5);
    assert_eq!(value["aggregates"].as_array().map(Vec::len), Some(6));
    assert!(value.get("replacement_mappings").is_none());
}

#[test]
fn settings_file_round_trip() {
    let dir = std::env::temp_dir().join(format!("hr-reduce-settings-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("settings.yaml");

    let settings = ReductionSettings {
        pipes: Lod::Low,
        detect_dead_ends: true,
        ..ReductionSettings::default()
    };
    hr_reduce::save_yaml(&path, &settings).unwrap();
    assert_eq!(hr_reduce::load_yaml(&path).unwrap(), settings);

    std::fs::write(&path, "space_heaters: low\n").unwrap();
    assert!(hr_reduce::load_yaml(&path).is_err());
    std::fs::remove_dir_all(&dir).unwrap();
}

proptest! {
    #[test]
    fn pipes_between_two_pumps_become_one_strand(
        lengths in prop::collection::vec(0.1f64..10.0, 2..12),
    ) {
        let mut b = NetworkBuilder::new();
        let first = b.add_element("first", "IfcPump");
        let mut ids = vec![first];
        for (i, &l) in lengths.iter().enumerate() {
            ids.push(pipe(&mut b, &format!("r{i}"), l, 25.0));
        }
        let last = b.add_element("last", "IfcBoiler");
        ids.push(last);
        run(&mut b, &ids);
        let mut g = b.build().unwrap();

        let report = reduce(&mut g, &ReductionSettings::default()).unwrap();
        prop_assert_eq!(report.count(AggregateKind::PipeStrand), 1);
        prop_assert_eq!(g.node_count(), 3);
        let strand = g
            .neighbors(first)
            .into_iter()
            .next()
            .unwrap();
        let total: f64 = lengths.iter().sum();
        let length = g.element(strand).unwrap().number(Attr::Length).unwrap();
        prop_assert!((length - total).abs() < 1e-9);
        prop_assert!(g.neighbors(strand).contains(&last));
    }
}
