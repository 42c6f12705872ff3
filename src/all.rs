//! Wiring all the steps into one flow and one set of data verbs.
use crate::flow::FlowGraph;
use crate::staging::Registry;
use crate::steps::{
    fancyplot, invert, mapped_invert, mapped_raw, mapped_sum, plot, raw, sum, Fancyplot,
    Invert, MappedInvert, MappedRaw, MappedSum, Plot, Raw, Step, StepContext, Sum,
};
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, warn};

/// A fixed set of steps plus the flow graph over their upstream lists.
pub struct All {
    steps: Vec<Box<dyn Step>>,
}

impl All {
    /// The pipeline `run` executes: generate, invert, reduce, then both
    /// charts. `mapped` swaps in the worker-pool chain and repoints the
    /// chart steps at its reducer.
    pub fn flow(mapped: bool) -> Self {
        let steps: Vec<Box<dyn Step>> = if mapped {
            vec![
                Box::new(MappedRaw::new()),
                Box::new(MappedInvert::new()),
                Box::new(MappedSum::new()),
                Box::new(Plot::with_upstream(mapped_sum::NAME)),
                Box::new(Fancyplot::with_upstream(mapped_sum::NAME)),
            ]
        } else {
            vec![
                Box::new(Raw::new()),
                Box::new(Invert::new()),
                Box::new(Sum::new()),
                Box::new(Plot::new()),
                Box::new(Fancyplot::new()),
            ]
        };
        All { steps }
    }

    /// Every step there is, for the data-management verbs.
    pub fn every_step() -> Self {
        All {
            steps: vec![
                Box::new(Raw::new()),
                Box::new(Invert::new()),
                Box::new(Sum::new()),
                Box::new(Plot::new()),
                Box::new(Fancyplot::new()),
                Box::new(MappedRaw::new()),
                Box::new(MappedInvert::new()),
                Box::new(MappedSum::new()),
            ],
        }
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Run every step in dependency order, handing each the direct outputs
    /// of the upstreams that ran in this flow.
    pub fn run(
        &self,
        ctx: &StepContext,
        clean_first: bool,
    ) -> Result<BTreeMap<String, Vec<PathBuf>>> {
        let graph =
            FlowGraph::from_steps(self.steps.iter().map(|s| (s.name(), s.upstream())))?;
        let order = graph.order()?;
        if clean_first {
            for step in &self.steps {
                step.clean(ctx)?;
            }
        }
        let mut outputs: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for name in order {
            let step = self
                .steps
                .iter()
                .find(|s| s.name() == name)
                .ok_or_else(|| anyhow!("flow ordered unknown step `{name}`"))?;
            let handed: Vec<PathBuf> = step
                .upstream()
                .iter()
                .filter_map(|upstream| outputs.get(upstream))
                .flat_map(|paths| paths.iter().cloned())
                .collect();
            let ran_upstream = step
                .upstream()
                .iter()
                .any(|upstream| outputs.contains_key(upstream));
            let inputs = if ran_upstream { Some(handed) } else { None };
            let produced = step.run(ctx, inputs)?;
            info!(step = %name, artifacts = produced.len(), "step finished");
            outputs.insert(name, produced);
        }
        Ok(outputs)
    }

    /// Publish every step's staging into the registry. Steps that never ran
    /// have nothing staged and publish nothing.
    pub fn push(&self, ctx: &StepContext, registry: &Registry) -> Result<Vec<PathBuf>> {
        let mut published = Vec::new();
        for step in &self.steps {
            published.extend(step.push(ctx, registry)?);
        }
        Ok(published)
    }

    /// Materialize registry copies into staging, skipping steps that were
    /// never pushed. Single-step checkouts via `--step` stay strict.
    pub fn checkout(&self, ctx: &StepContext, registry: &Registry) -> Result<Vec<PathBuf>> {
        let mut restored = Vec::new();
        for step in &self.steps {
            if !registry.step_dir(step.name()).exists() {
                warn!(step = step.name(), "no registry data, skipping checkout");
                continue;
            }
            restored.extend(step.checkout(ctx, registry)?);
        }
        Ok(restored)
    }

    /// Check out what each step needs to run solo, with the same leniency
    /// as [`All::checkout`].
    pub fn pull(&self, ctx: &StepContext, registry: &Registry) -> Result<Vec<PathBuf>> {
        let mut fetched = Vec::new();
        for step in &self.steps {
            for upstream in step.upstream() {
                if !registry.step_dir(upstream).exists() {
                    warn!(step = step.name(), upstream = %upstream, "no registry data, skipping pull");
                    continue;
                }
                fetched.extend(
                    crate::staging::checkout_step(&ctx.staging, registry, upstream)?,
                );
            }
        }
        Ok(fetched)
    }

    /// Delete every step's staging directory.
    pub fn clean(&self, ctx: &StepContext) -> Result<()> {
        for step in &self.steps {
            step.clean(ctx)?;
        }
        Ok(())
    }
}

/// Construct a single step by name, accepting both the flow spelling and
/// the hyphenated CLI spelling.
pub fn step_by_name(name: &str) -> Result<Box<dyn Step>> {
    match name.replace('-', "").as_str() {
        raw::NAME => Ok(Box::new(Raw::new())),
        invert::NAME => Ok(Box::new(Invert::new())),
        sum::NAME => Ok(Box::new(Sum::new())),
        plot::NAME => Ok(Box::new(Plot::new())),
        fancyplot::NAME => Ok(Box::new(Fancyplot::new())),
        mapped_raw::NAME => Ok(Box::new(MappedRaw::new())),
        mapped_invert::NAME => Ok(Box::new(MappedInvert::new())),
        mapped_sum::NAME => Ok(Box::new(MappedSum::new())),
        _ => Err(anyhow!(
            "unknown step `{name}` (expected one of: raw, invert, sum, plot, fancyplot, \
             mapped-raw, mapped-invert, mapped-sum)"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::testing;

    #[test]
    fn the_basic_flow_produces_every_artifact() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let ctx = testing::context(dir.path());

        let outputs = All::flow(false).run(&ctx, false).expect("run flow");

        assert_eq!(outputs.len(), 5);
        assert_eq!(outputs[raw::NAME].len(), 3);
        assert_eq!(outputs[invert::NAME].len(), 3);
        assert_eq!(outputs[sum::NAME].len(), 3);
        assert_eq!(outputs[plot::NAME].len(), 1);
        assert!(outputs[plot::NAME][0].exists());
        assert!(outputs[fancyplot::NAME][0].exists());
    }

    #[test]
    fn the_mapped_flow_feeds_the_charts_from_mappedsum() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let ctx = testing::context(dir.path());

        let outputs = All::flow(true).run(&ctx, false).expect("run mapped flow");

        assert_eq!(outputs[mapped_sum::NAME].len(), 3);
        // No plain `sum` manifest exists, so the charts must have been fed
        // directly from the mapped reducer's outputs.
        assert!(!ctx.staging.manifest_path(sum::NAME).exists());
        assert!(outputs[plot::NAME][0].exists());
        assert!(outputs[fancyplot::NAME][0].exists());
    }

    #[test]
    fn clean_first_wipes_stale_staging() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let ctx = testing::context(dir.path());
        let stale = ctx.staging.step_dir(raw::NAME).join("stale.txt");
        std::fs::create_dir_all(stale.parent().expect("parent")).expect("create dir");
        std::fs::write(&stale, "old").expect("write stale file");

        All::flow(false).run(&ctx, true).expect("run flow");

        assert!(!stale.exists());
        assert!(ctx.staging.manifest_path(raw::NAME).exists());
    }

    #[test]
    fn steps_resolve_by_either_spelling() {
        assert_eq!(step_by_name("mapped-raw").expect("step").name(), mapped_raw::NAME);
        assert_eq!(step_by_name("mappedraw").expect("step").name(), mapped_raw::NAME);
        assert_eq!(step_by_name("raw").expect("step").name(), raw::NAME);
        let err = step_by_name("upload").expect_err("unknown step");
        assert!(err.to_string().contains("unknown step"));
    }
}
