//! Dependency policy - decides when a cell must recompute
//!
//! Every cell owns exactly one policy. The policy holds the ordered list of
//! upstream cells, the freshness rule and the clock value of the last
//! satisfied request.

use std::fmt;

use crate::{CellId, Time, DEFAULT_PERIOD};

/// Rule deciding whether a cached value is stale
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FreshnessRule {
    /// Stale whenever the requested clock differs from the last satisfied one
    #[default]
    ClockDriven,
    /// Stale while the externally toggled ready flag is raised
    FlagDriven,
    /// Computed once, then never stale (constants, parameters)
    AlwaysFresh,
}

/// Default policy settings applied to new cells
#[derive(Clone, Debug)]
pub struct PolicyConfig {
    /// Freshness rule
    pub rule: FreshnessRule,
    /// Refresh every dependency even when the cell itself would short-circuit
    pub require_all_fresh: bool,
    /// Minimum spacing between satisfied requests
    pub period: Time,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig {
            rule: FreshnessRule::ClockDriven,
            require_all_fresh: false,
            period: DEFAULT_PERIOD,
        }
    }
}

impl PolicyConfig {
    /// Settings for constant or parameter cells
    pub fn constant() -> Self {
        PolicyConfig {
            rule: FreshnessRule::AlwaysFresh,
            ..PolicyConfig::default()
        }
    }

    /// Settings for cells driven by an external event flag
    pub fn event() -> Self {
        PolicyConfig {
            rule: FreshnessRule::FlagDriven,
            ..PolicyConfig::default()
        }
    }
}

/// Per-cell dependency and freshness policy
#[derive(Clone, Debug)]
pub struct DependencyPolicy {
    /// Upstream cells, in declaration order. Non-owning.
    dependencies: Vec<CellId>,
    rule: FreshnessRule,
    /// Kept for interface compatibility; dependencies are always refreshed
    /// when the owning cell is stale.
    require_all_fresh: bool,
    /// Not enforced by `is_stale`
    period: Time,
    ready: bool,
    last_satisfied: Option<Time>,
}

impl DependencyPolicy {
    pub fn new() -> Self {
        Self::with_config(&PolicyConfig::default())
    }

    pub fn with_rule(rule: FreshnessRule) -> Self {
        DependencyPolicy {
            rule,
            ..Self::new()
        }
    }

    pub fn with_config(config: &PolicyConfig) -> Self {
        DependencyPolicy {
            dependencies: Vec::new(),
            rule: config.rule,
            require_all_fresh: config.require_all_fresh,
            period: config.period,
            ready: false,
            last_satisfied: None,
        }
    }

    /// Append a dependency. Returns false if it was already present.
    ///
    /// No cycle check happens here; a cycle surfaces at refresh time.
    pub fn add_dependency(&mut self, cell: CellId) -> bool {
        if self.depends_on(cell) {
            return false;
        }
        self.dependencies.push(cell);
        true
    }

    /// Remove a dependency by identity. Returns false if it was absent.
    pub fn remove_dependency(&mut self, cell: CellId) -> bool {
        match self.dependencies.iter().position(|dep| *dep == cell) {
            Some(pos) => {
                self.dependencies.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn clear_dependencies(&mut self) {
        self.dependencies.clear();
    }

    pub fn dependencies(&self) -> &[CellId] {
        &self.dependencies
    }

    pub fn depends_on(&self, cell: CellId) -> bool {
        self.dependencies.contains(&cell)
    }

    /// Whether a request for `time` must recompute the owning cell
    pub fn is_stale(&self, time: Time) -> bool {
        match self.rule {
            FreshnessRule::ClockDriven => self.last_satisfied != Some(time),
            FreshnessRule::FlagDriven => self.ready,
            FreshnessRule::AlwaysFresh => self.last_satisfied.is_none(),
        }
    }

    /// Record a completed recompute for `time`.
    ///
    /// Must only be called after dependencies refreshed and the compute
    /// function succeeded, so a failed recompute stays stale for a retry.
    pub fn mark_satisfied(&mut self, time: Time) {
        self.last_satisfied = Some(time);
    }

    pub fn last_satisfied(&self) -> Option<Time> {
        self.last_satisfied
    }

    pub fn rule(&self) -> FreshnessRule {
        self.rule
    }

    pub fn set_rule(&mut self, rule: FreshnessRule) {
        self.rule = rule;
    }

    /// Raise or lower the ready flag. Never reset by the policy itself.
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn period(&self) -> Time {
        self.period
    }

    pub fn set_period(&mut self, period: Time) {
        self.period = period;
    }

    pub fn require_all_fresh(&self) -> bool {
        self.require_all_fresh
    }

    pub fn set_require_all_fresh(&mut self, require: bool) {
        self.require_all_fresh = require;
    }

    /// Freshness state as shown in the diagnostic tree
    pub fn status(&self) -> PolicyStatus<'_> {
        PolicyStatus(self)
    }
}

impl Default for DependencyPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Display adapter for the freshness part of a tree line
pub struct PolicyStatus<'a>(&'a DependencyPolicy);

impl fmt::Display for PolicyStatus<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let policy = self.0;
        match policy.rule {
            FreshnessRule::AlwaysFresh => write!(f, "A"),
            FreshnessRule::FlagDriven => {
                write!(f, "ready={}", if policy.ready { "TRUE" } else { "FALSE" })
            }
            FreshnessRule::ClockDriven => write!(
                f,
                "t={} (/{}) ",
                policy.last_satisfied.unwrap_or_default(),
                policy.period
            ),
        }
    }
}
