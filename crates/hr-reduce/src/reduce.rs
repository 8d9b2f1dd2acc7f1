//! The reduction driver: runs the matchers in a fixed order and merges what
//! they find.

use hr_aggregation::{
    AggregateKind, AggregatedPipeFitting, AggregationError, Consumer,
    ConsumerHeatingDistributorModule, Matcher, ParallelPump, ParallelSpaceHeater, PipeStrand,
    UnderfloorHeating, empty_mapping, merge_aggregates,
};
use hr_graph::types::PIPE_LIKE;
use hr_graph::{Attr, HvacGraph, ResolverChain};

use crate::dead_ends::{self, DeadEndResolver, RemoveAll};
use crate::error::{ReduceError, ReduceResult};
use crate::report::{PassFailure, ReductionReport};
use crate::settings::{Lod, ReductionSettings};

/// Upper bound on repeated parallel-pump passes.
const MAX_PUMP_PASSES: usize = 16;

#[derive(Debug, Clone, Copy, Default)]
struct PassOutcome {
    applied: usize,
    failed: bool,
}

pub struct Reducer {
    settings: ReductionSettings,
    resolvers: Option<ResolverChain>,
    dead_ends: Box<dyn DeadEndResolver>,
}

impl Reducer {
    pub fn new(settings: ReductionSettings) -> Self {
        Self {
            settings,
            resolvers: None,
            dead_ends: Box::new(RemoveAll),
        }
    }

    /// Fill unknown attributes through `chain` before matching.
    pub fn with_resolvers(mut self, chain: ResolverChain) -> Self {
        self.resolvers = Some(chain);
        self
    }

    pub fn with_dead_end_resolver(mut self, resolver: impl DeadEndResolver + 'static) -> Self {
        self.dead_ends = Box::new(resolver);
        self
    }

    pub fn settings(&self) -> &ReductionSettings {
        &self.settings
    }

    /// Reduce `graph` in place.
    ///
    /// Pass order: attribute resolution, dead ends, parallel pumps (repeated
    /// until nothing changes), fittings, underfloor heating, pipes, parallel
    /// space heaters, consumers, distributor modules. A match that cannot be
    /// built ends its pass and is listed in the report; graph errors abort
    /// the run.
    pub fn reduce(&self, graph: &mut HvacGraph) -> ReduceResult<ReductionReport> {
        self.settings.validate()?;
        let mut report = ReductionReport::new(graph.node_count());
        tracing::info!(nodes = report.nodes_before, "reducing elements by applying aggregations");

        if let Some(chain) = &self.resolvers {
            let resolved = graph.resolve_attributes(chain, &Attr::ALL);
            tracing::debug!(resolved, "attributes resolved");
        }

        if self.settings.detect_dead_ends {
            let open = dead_ends::identify(graph);
            report.dead_ends_found = open.len();
            let plans = dead_ends::plan(graph, &open)?;
            report.dead_ends_removed = dead_ends::apply(graph, &plans, self.dead_ends.as_ref())?;
        }

        if self.settings.pumps == Lod::Medium {
            for _ in 0..MAX_PUMP_PASSES {
                let outcome = run_pass(graph, &ParallelPump::new(), &mut report)?;
                if outcome.applied == 0 || outcome.failed {
                    break;
                }
            }
        }

        if self.settings.fittings == Lod::Medium {
            run_pass(graph, &AggregatedPipeFitting::new(), &mut report)?;
        }

        if self.settings.underfloor_heating == Lod::Medium {
            let matcher = UnderfloorHeating::new(self.settings.length_unit);
            run_pass(graph, &matcher, &mut report)?;
        }

        match self.settings.pipes {
            Lod::Medium => {
                run_pass(graph, &PipeStrand::new(), &mut report)?;
            }
            Lod::Low => remove_pipes(graph, &mut report)?,
            Lod::Ignore | Lod::Full => {}
        }

        if self.settings.space_heaters == Lod::Medium {
            run_pass(graph, &ParallelSpaceHeater::new(), &mut report)?;
        }
        if self.settings.consumers == Lod::Medium {
            run_pass(graph, &Consumer::new(), &mut report)?;
        }
        if self.settings.distributor_modules == Lod::Medium {
            run_pass(graph, &ConsumerHeatingDistributorModule::new(), &mut report)?;
        }

        report.nodes_after = graph.node_count();
        report.remaining_cycles = graph.element_graph().get_cycles().len();
        for (kind, count) in &report.per_kind {
            tracing::info!(kind = %kind, count, "aggregates applied");
        }
        tracing::info!(
            before = report.nodes_before,
            after = report.nodes_after,
            removed_pipes = report.removed_pipes,
            cycles = report.remaining_cycles,
            "reduction done"
        );
        Ok(report)
    }
}

/// Reduce with `settings`, without attribute resolution. Detected dead
/// ends are all removed.
pub fn reduce(graph: &mut HvacGraph, settings: &ReductionSettings) -> ReduceResult<ReductionReport> {
    Reducer::new(settings.clone()).reduce(graph)
}

fn run_pass(
    graph: &mut HvacGraph,
    matcher: &dyn Matcher,
    report: &mut ReductionReport,
) -> ReduceResult<PassOutcome> {
    let kind = matcher.kind();
    let found = matcher.find_matches(&graph.element_graph());
    let mut outcome = PassOutcome::default();

    for m in &found {
        if !m.is_live(graph) {
            tracing::debug!(kind = %kind, "match overlaps an earlier aggregate, skipped");
            continue;
        }
        let name = format!("{} {}", kind, report.count(kind) + 1);
        let aggregates = match matcher.build(graph, &name, m) {
            Ok(aggregates) => aggregates,
            Err(AggregationError::Graph(e)) => return Err(ReduceError::Graph(e)),
            Err(e) => {
                tracing::warn!(aggregate = %name, error = %e, "aggregation failed, pass stopped");
                report.failures.push(PassFailure {
                    kind,
                    name,
                    error: e.to_string(),
                });
                outcome.failed = true;
                break;
            }
        };
        merge_aggregates(graph, &aggregates)?;
        for agg in &aggregates {
            report.record(agg);
        }
        outcome.applied += 1;
    }

    tracing::info!(kind = %kind, applied = outcome.applied, found = found.len(), "pass finished");
    Ok(outcome)
}

/// Delete plain pipe runs and join their neighbours directly.
fn remove_pipes(graph: &mut HvacGraph, report: &mut ReductionReport) -> ReduceResult<()> {
    let chains = graph.element_graph().get_type_chains(PIPE_LIKE, true);
    for chain in &chains {
        if !chain.iter().all(|&n| graph.contains(n)) {
            continue;
        }
        let Some((mapping, inner)) = empty_mapping(graph, chain) else {
            continue;
        };
        let outcome = graph.merge(&mapping, &inner)?;
        report.removed_pipes += outcome.removed.len();
    }
    tracing::info!(removed = report.removed_pipes, "pipes removed");
    Ok(())
}
