//! Phase driver: create, mutate, await quiescence, measure.

use crate::component::{ComponentRuntime, Element, MountPoint, PropValue, ReflectConfig};
use crate::core::dom::Document;
use crate::core::timing::{EntryType, Performance, PerformanceEntry};
use crate::fixtures::{define_components, Datasets, X_APP};
use crate::tracker::{CompletionRegistry, MonitorUpdate, QuiescenceTracker, SettleReport};
use crate::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, info};

/// Query parameter selecting a single phase.
pub const BENCHMARK_PARAM: &str = "benchmark";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Render,
    Update,
    UpdateReflect,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Render, Phase::Update, Phase::UpdateReflect];

    pub fn name(self) -> &'static str {
        match self {
            Phase::Render => "render",
            Phase::Update => "update",
            Phase::UpdateReflect => "update-reflect",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Optional single-phase selection. Unset or empty selects every phase; a
/// value naming no phase selects none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseFilter(Option<String>);

impl PhaseFilter {
    pub fn all() -> Self {
        Self(None)
    }

    pub fn only(name: impl Into<String>) -> Self {
        Self(Some(name.into()))
    }

    /// Reads the `benchmark` parameter out of a query string. Accepts a bare
    /// `a=b&c=d` string, one with a leading `?`, or a full URL.
    pub fn from_query(query: &str) -> Self {
        let query = match query.split_once('?') {
            Some((_, rest)) => rest,
            None => query,
        };
        let query = query.split('#').next().unwrap_or_default();
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == BENCHMARK_PARAM)
            .map(|(_, value)| Self::only(value.into_owned()))
            .unwrap_or_default()
    }

    pub fn selects(&self, phase: Phase) -> bool {
        match self.0.as_deref() {
            None | Some("") => true,
            Some(name) => name == phase.name(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub filter: PhaseFilter,
    /// Records per dataset.
    pub list_len: usize,
    /// List assignments per update phase.
    pub update_count: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            filter: PhaseFilter::all(),
            list_len: 250,
            update_count: 6,
        }
    }
}

/// Outcome of one phase, kept for callers that want more than the measure.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseRun {
    pub phase: Phase,
    pub measure: PerformanceEntry,
    pub settles: Vec<SettleReport>,
}

/// Owns the runtime, the monitored registry, the timing store and the
/// fixture datasets for one benchmark session.
pub struct BenchmarkDriver {
    config: BenchConfig,
    runtime: Rc<ComponentRuntime>,
    tracker: QuiescenceTracker,
    performance: Performance,
    datasets: Datasets,
    mount: MountPoint,
}

impl BenchmarkDriver {
    pub fn new(config: BenchConfig) -> Result<Self> {
        // The second dataset is generated at twice the list length.
        if config.list_len.checked_mul(2).is_none() {
            return Err(BenchError::Config(format!(
                "list length {} is too large",
                config.list_len
            )));
        }
        let registry = CompletionRegistry::new();
        let hooks = Rc::new(MonitorUpdate::new(registry.clone()));
        let runtime = ComponentRuntime::new(Arc::new(Document::new()), hooks, ReflectConfig::new());
        let datasets = Datasets::generate(config.list_len);
        define_components(&runtime, &datasets)?;
        let mount = MountPoint::new(runtime.clone())?;

        Ok(Self {
            config,
            runtime,
            tracker: QuiescenceTracker::new(registry),
            performance: Performance::new(),
            datasets,
            mount,
        })
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn runtime(&self) -> &Rc<ComponentRuntime> {
        &self.runtime
    }

    pub fn tracker(&self) -> &QuiescenceTracker {
        &self.tracker
    }

    pub fn performance(&self) -> &Performance {
        &self.performance
    }

    pub fn datasets(&self) -> &Datasets {
        &self.datasets
    }

    pub fn mount(&self) -> &MountPoint {
        &self.mount
    }

    /// Runs every selected phase in order and returns the measures recorded
    /// by this run. Entries from earlier runs are cleared first. The first
    /// error aborts the remaining phases.
    pub async fn run(&self) -> Result<Vec<PerformanceEntry>> {
        self.performance.clear();
        for phase in Phase::ALL {
            if !self.config.filter.selects(phase) {
                debug!("skipping phase '{}'", phase);
                continue;
            }
            self.run_phase(phase).await?;
        }
        Ok(self.performance.entries_by_type(EntryType::Measure))
    }

    pub async fn run_phase(&self, phase: Phase) -> Result<PhaseRun> {
        info!("running phase '{}'", phase);
        let run = match phase {
            Phase::Render => self.render().await?,
            Phase::Update | Phase::UpdateReflect => self.update(phase).await?,
        };
        self.unmount()?;
        info!("phase '{}' took {:.3}ms", phase, run.measure.duration);
        Ok(run)
    }

    async fn render(&self) -> Result<PhaseRun> {
        let name = Phase::Render.name();
        self.performance.mark(name);
        self.mount.create(X_APP)?;
        let settle = self.tracker.settle().await?;
        let measure = self.performance.measure(name, name)?;
        Ok(PhaseRun {
            phase: Phase::Render,
            measure,
            settles: vec![settle],
        })
    }

    /// The first assignment hands the list its current dataset, so the
    /// initial render is what the first wait picks up.
    async fn update(&self, phase: Phase) -> Result<PhaseRun> {
        let name = phase.name();
        let root = self.mount.create(X_APP)?;
        self.performance.mark(name);
        let settles = {
            let _reflect = (phase == Phase::UpdateReflect).then(|| self.runtime.reflect().enable_scoped());
            self.swap_lists(&root).await?
        };
        let measure = self.performance.measure(name, name)?;
        Ok(PhaseRun {
            phase,
            measure,
            settles,
        })
    }

    async fn swap_lists(&self, root: &Element) -> Result<Vec<SettleReport>> {
        let mut settles = Vec::with_capacity(self.config.update_count);
        for i in 0..self.config.update_count {
            let list = self.datasets.for_iteration(i).clone();
            root.set_property("items", PropValue::List(list))?;
            settles.push(self.tracker.settle().await?);
        }
        Ok(settles)
    }

    /// JSON report: the measures plus the document's mutation statistics.
    pub fn report(&self, measures: &[PerformanceEntry]) -> serde_json::Value {
        serde_json::json!({
            "measures": measures,
            "document": self.runtime.document().get_performance_metrics(),
        })
    }

    fn unmount(&self) -> Result<()> {
        self.mount.clear()?;
        debug!(
            "tree unmounted; {} completions pending, {} nodes left",
            self.tracker.pending(),
            self.runtime.document().node_count()
        );
        Ok(())
    }
}
