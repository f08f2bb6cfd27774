use crate::error::{MusubiError, Result};
use crate::io;
use crate::paths;
use crate::types::BudgetPeriod;
use chrono::{DateTime, Datelike, Duration, Local, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

/// USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    pub input: f64,
    pub output: f64,
}

impl ModelPrice {
    pub const fn new(input: f64, output: f64) -> Self {
        Self { input, output }
    }

    pub const ZERO: ModelPrice = ModelPrice::new(0.0, 0.0);
}

/// Price lookup: exact model name, then the model's base name with trailing
/// version segments stripped, then a per-provider default, finally zero.
#[derive(Debug, Clone)]
pub struct PriceTable {
    models: HashMap<String, ModelPrice>,
    providers: HashMap<String, ModelPrice>,
}

impl Default for PriceTable {
    fn default() -> Self {
        let models = HashMap::from([
            ("gpt-4o".to_string(), ModelPrice::new(2.50, 10.00)),
            ("gpt-4o-mini".to_string(), ModelPrice::new(0.15, 0.60)),
            ("gpt-4.1".to_string(), ModelPrice::new(2.00, 8.00)),
            ("o3-mini".to_string(), ModelPrice::new(1.10, 4.40)),
            ("claude-3-5-sonnet".to_string(), ModelPrice::new(3.00, 15.00)),
            ("claude-3-5-haiku".to_string(), ModelPrice::new(0.80, 4.00)),
            ("gemini-1.5-pro".to_string(), ModelPrice::new(1.25, 5.00)),
            ("gemini-1.5-flash".to_string(), ModelPrice::new(0.075, 0.30)),
        ]);
        let providers = HashMap::from([
            ("openai".to_string(), ModelPrice::new(2.50, 10.00)),
            ("anthropic".to_string(), ModelPrice::new(3.00, 15.00)),
            ("google".to_string(), ModelPrice::new(1.25, 5.00)),
        ]);
        Self { models, providers }
    }
}

impl PriceTable {
    pub fn empty() -> Self {
        Self {
            models: HashMap::new(),
            providers: HashMap::new(),
        }
    }

    /// Replace one model's pricing. Overrides land whole-entry.
    pub fn set_model(&mut self, model: impl Into<String>, price: ModelPrice) {
        self.models.insert(model.into(), price);
    }

    pub fn set_provider(&mut self, provider: impl Into<String>, price: ModelPrice) {
        self.providers.insert(provider.into(), price);
    }

    pub fn lookup(&self, provider: &str, model: &str) -> ModelPrice {
        if let Some(p) = self.models.get(model) {
            return *p;
        }
        // Strip trailing '-' segments: gpt-4o-2024-08-06 falls back to gpt-4o.
        let mut base = model;
        while let Some(idx) = base.rfind('-') {
            base = &base[..idx];
            if let Some(p) = self.models.get(base) {
                return *p;
            }
        }
        if let Some(p) = self.providers.get(provider) {
            return *p;
        }
        ModelPrice::ZERO
    }

    pub fn cost(&self, provider: &str, model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        let price = self.lookup(provider, model);
        (input_tokens as f64 / 1_000_000.0) * price.input
            + (output_tokens as f64 / 1_000_000.0) * price.output
    }
}

// ---------------------------------------------------------------------------
// Records and totals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub timestamp: DateTime<Local>,
    pub provider: String,
    pub model: String,
    pub operation: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
    pub requests: u64,
}

impl Totals {
    fn add(&mut self, record: &UsageRecord) {
        self.input_tokens += record.input_tokens;
        self.output_tokens += record.output_tokens;
        self.cost += record.cost;
        self.requests += 1;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub totals: Totals,
    pub by_provider: BTreeMap<String, Totals>,
    pub by_model: BTreeMap<String, Totals>,
    pub by_operation: BTreeMap<String, Totals>,
}

// ---------------------------------------------------------------------------
// Period window
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodState {
    pub period_start: DateTime<Local>,
    pub period: BudgetPeriod,
    pub totals: Totals,
}

impl PeriodState {
    fn fresh(period: BudgetPeriod, now: DateTime<Local>) -> Self {
        Self {
            period_start: window_start(period, now),
            period,
            totals: Totals::default(),
        }
    }
}

/// Start of the window containing `now`: local midnight for daily, the most
/// recent Sunday midnight for weekly, the first of the month for monthly.
pub fn window_start(period: BudgetPeriod, now: DateTime<Local>) -> DateTime<Local> {
    let date = now.date_naive();
    let start = match period {
        BudgetPeriod::Daily => date,
        BudgetPeriod::Weekly => {
            date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
        }
        BudgetPeriod::Monthly => date.with_day(1).unwrap_or(date),
    };
    Local
        .from_local_datetime(&start.and_time(NaiveTime::MIN))
        .earliest()
        .unwrap_or(now)
}

// ---------------------------------------------------------------------------
// Budget
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Budget {
    pub limit: f64,
    pub period: BudgetPeriod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BudgetEvent {
    BudgetWarning,
    BudgetExceeded,
}

impl BudgetEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            BudgetEvent::BudgetWarning => "budget-warning",
            BudgetEvent::BudgetExceeded => "budget-exceeded",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BudgetStatus {
    pub spent: f64,
    pub limit: f64,
    pub period: BudgetPeriod,
}

type BudgetListener = Box<dyn FnMut(BudgetEvent, &BudgetStatus)>;

// ---------------------------------------------------------------------------
// CostTracker
// ---------------------------------------------------------------------------

/// Language-model usage ledger. Session state is in-memory and explicit:
/// `new` loads persisted period totals and the configured budget, `record`
/// persists the period file, `save_session` snapshots the session summary,
/// `reset_session` clears the in-memory ledger.
pub struct CostTracker {
    root: PathBuf,
    prices: PriceTable,
    session: Vec<UsageRecord>,
    period: PeriodState,
    budget: Option<Budget>,
    listeners: Vec<BudgetListener>,
}

impl CostTracker {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_prices(root, PriceTable::default())
    }

    pub fn with_prices(root: impl Into<PathBuf>, prices: PriceTable) -> Result<Self> {
        let root = root.into();
        let now = Local::now();
        let budget = load_budget(&root)?;
        let period_kind = budget.map(|b| b.period).unwrap_or(BudgetPeriod::Daily);
        let period = load_period(&root, period_kind, now)?;
        Ok(Self {
            root,
            prices,
            session: Vec::new(),
            period,
            budget,
            listeners: Vec::new(),
        })
    }

    pub fn prices_mut(&mut self) -> &mut PriceTable {
        &mut self.prices
    }

    pub fn session(&self) -> &[UsageRecord] {
        &self.session
    }

    pub fn period(&self) -> &PeriodState {
        &self.period
    }

    pub fn budget(&self) -> Option<Budget> {
        self.budget
    }

    /// Register a budget event listener. Events are level-triggered: every
    /// record that leaves the period aggregate above a threshold fires one
    /// event, exceeded taking precedence over warning.
    pub fn on_budget_event(&mut self, listener: impl FnMut(BudgetEvent, &BudgetStatus) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // -----------------------------------------------------------------------
    // Recording
    // -----------------------------------------------------------------------

    pub fn record(
        &mut self,
        provider: &str,
        model: &str,
        operation: &str,
        input_tokens: u64,
        output_tokens: u64,
        metadata: BTreeMap<String, String>,
    ) -> Result<UsageRecord> {
        let now = Local::now();
        self.roll_window(now);

        let cost = self.prices.cost(provider, model, input_tokens, output_tokens);
        let record = UsageRecord {
            timestamp: now,
            provider: provider.to_string(),
            model: model.to_string(),
            operation: operation.to_string(),
            input_tokens,
            output_tokens,
            cost,
            metadata,
        };

        self.period.totals.add(&record);
        self.session.push(record.clone());
        self.save_period()?;
        self.fire_budget_events();
        tracing::debug!(provider, model, operation, cost, "recorded usage");
        Ok(record)
    }

    /// Start a new period ledger when the clock has left the stored window.
    fn roll_window(&mut self, now: DateTime<Local>) {
        if window_start(self.period.period, now) != self.period.period_start {
            self.period = PeriodState::fresh(self.period.period, now);
        }
    }

    fn fire_budget_events(&mut self) {
        let Some(budget) = self.budget else { return };
        if budget.limit <= 0.0 {
            return;
        }
        let status = BudgetStatus {
            spent: self.period.totals.cost,
            limit: budget.limit,
            period: budget.period,
        };
        // Strictly above threshold: landing exactly on a boundary is silent
        // (80%) or still a warning (100%).
        let event = if status.spent > budget.limit {
            Some(BudgetEvent::BudgetExceeded)
        } else if status.spent > 0.8 * budget.limit {
            Some(BudgetEvent::BudgetWarning)
        } else {
            None
        };
        if let Some(event) = event {
            tracing::warn!(
                event = event.as_str(),
                spent = status.spent,
                limit = status.limit,
                "budget threshold crossed"
            );
            for listener in &mut self.listeners {
                listener(event, &status);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Summaries
    // -----------------------------------------------------------------------

    /// Deterministic rollup of the current session ledger.
    pub fn summary(&self) -> SessionSummary {
        let mut summary = SessionSummary {
            totals: Totals::default(),
            by_provider: BTreeMap::new(),
            by_model: BTreeMap::new(),
            by_operation: BTreeMap::new(),
        };
        for record in &self.session {
            summary.totals.add(record);
            summary
                .by_provider
                .entry(record.provider.clone())
                .or_default()
                .add(record);
            summary
                .by_model
                .entry(record.model.clone())
                .or_default()
                .add(record);
            summary
                .by_operation
                .entry(record.operation.clone())
                .or_default()
                .add(record);
        }
        summary
    }

    // -----------------------------------------------------------------------
    // Budget configuration
    // -----------------------------------------------------------------------

    pub fn set_budget(&mut self, limit: f64, period: BudgetPeriod) -> Result<()> {
        let budget = Budget { limit, period };
        self.budget = Some(budget);
        if self.period.period != period {
            self.period = load_period(&self.root, period, Local::now())?;
        }
        let json = serde_json::to_vec_pretty(&budget)?;
        io::atomic_write(&paths::budget_file(&self.root), &json)
    }

    pub fn clear_budget(&mut self) -> Result<()> {
        self.budget = None;
        let path = paths::budget_file(&self.root);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    fn save_period(&self) -> Result<()> {
        let path = paths::period_file(&self.root, self.period.period.as_str());
        let json = serde_json::to_vec_pretty(&self.period)?;
        io::atomic_write(&path, &json)
    }

    /// Snapshot the session summary to `session-<iso-ts>.json` and return
    /// the written path.
    pub fn save_session(&self) -> Result<PathBuf> {
        let stamp = Local::now().format("%Y-%m-%dT%H-%M-%S");
        let path = paths::costs_dir(&self.root).join(format!("session-{stamp}.json"));
        let json = serde_json::to_vec_pretty(&self.summary())?;
        io::atomic_write(&path, &json)?;
        Ok(path)
    }

    pub fn reset_session(&mut self) {
        self.session.clear();
    }
}

fn load_budget(root: &Path) -> Result<Option<Budget>> {
    match io::read_opt(&paths::budget_file(root))? {
        Some(json) => Ok(Some(
            serde_json::from_str(&json).map_err(MusubiError::Json)?,
        )),
        None => Ok(None),
    }
}

/// Load the persisted period ledger, keeping it only when its stored start
/// still falls within the current window.
fn load_period(root: &Path, period: BudgetPeriod, now: DateTime<Local>) -> Result<PeriodState> {
    let path = paths::period_file(root, period.as_str());
    if let Some(json) = io::read_opt(&path)? {
        if let Ok(state) = serde_json::from_str::<PeriodState>(&json) {
            if state.period == period && state.period_start == window_start(period, now) {
                return Ok(state);
            }
        }
    }
    Ok(PeriodState::fresh(period, now))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn tracker(dir: &TempDir) -> CostTracker {
        CostTracker::new(dir.path()).unwrap()
    }

    #[test]
    fn known_model_pricing() {
        let dir = TempDir::new().unwrap();
        let mut t = tracker(&dir);
        let record = t
            .record("openai", "gpt-4o", "chat", 1_000_000, 500_000, BTreeMap::new())
            .unwrap();
        assert!((record.cost - 7.50).abs() < 1e-9);
        assert!((t.summary().totals.cost - 7.50).abs() < 1e-9);
        assert_eq!(t.summary().totals.requests, 1);
    }

    #[test]
    fn price_fallback_chain() {
        let table = PriceTable::default();
        assert_eq!(
            table.lookup("openai", "gpt-4o-2024-08-06"),
            ModelPrice::new(2.50, 10.00)
        );
        assert_eq!(
            table.lookup("anthropic", "unknown-model"),
            ModelPrice::new(3.00, 15.00)
        );
        assert_eq!(table.lookup("nobody", "mystery"), ModelPrice::ZERO);
    }

    #[test]
    fn cost_is_linear_in_tokens() {
        let table = PriceTable::default();
        let a = table.cost("openai", "gpt-4o", 123_456, 7_890);
        let b = table.cost("openai", "gpt-4o", 1_000, 2_000);
        let sum = table.cost("openai", "gpt-4o", 124_456, 9_890);
        assert!((a + b - sum).abs() < 1e-9);
    }

    #[test]
    fn summary_breaks_down_by_provider_model_operation() {
        let dir = TempDir::new().unwrap();
        let mut t = tracker(&dir);
        t.record("openai", "gpt-4o", "chat", 1000, 1000, BTreeMap::new())
            .unwrap();
        t.record("openai", "gpt-4o-mini", "embed", 1000, 0, BTreeMap::new())
            .unwrap();
        t.record("anthropic", "claude-3-5-haiku", "chat", 1000, 1000, BTreeMap::new())
            .unwrap();
        let summary = t.summary();
        assert_eq!(summary.totals.requests, 3);
        assert_eq!(summary.by_provider["openai"].requests, 2);
        assert_eq!(summary.by_model["gpt-4o"].requests, 1);
        assert_eq!(summary.by_operation["chat"].requests, 2);
    }

    #[test]
    fn budget_events_are_level_triggered() {
        let dir = TempDir::new().unwrap();
        let mut t = CostTracker::with_prices(dir.path(), {
            let mut p = PriceTable::empty();
            p.set_model("m", ModelPrice::new(1.0, 0.0));
            p
        })
        .unwrap();
        t.set_budget(10.0, BudgetPeriod::Daily).unwrap();

        let events: Rc<RefCell<Vec<(BudgetEvent, f64)>>> = Rc::default();
        let sink = Rc::clone(&events);
        t.on_budget_event(move |event, status| sink.borrow_mut().push((event, status.spent)));

        // Each record costs limit/10.
        for _ in 0..11 {
            t.record("p", "m", "chat", 1_000_000, 0, BTreeMap::new()).unwrap();
        }
        let events = events.borrow();
        // Records 1..=8 leave the aggregate at or below 80%: silent. The
        // record landing exactly on the limit is a warning, not an exceed.
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], (BudgetEvent::BudgetWarning, 9.0));
        assert_eq!(events[1], (BudgetEvent::BudgetWarning, 10.0));
        assert_eq!(events[2], (BudgetEvent::BudgetExceeded, 11.0));
    }

    #[test]
    fn recording_continues_past_the_limit() {
        let dir = TempDir::new().unwrap();
        let mut t = CostTracker::with_prices(dir.path(), {
            let mut p = PriceTable::empty();
            p.set_model("m", ModelPrice::new(100.0, 0.0));
            p
        })
        .unwrap();
        t.set_budget(1.0, BudgetPeriod::Daily).unwrap();
        for _ in 0..3 {
            t.record("p", "m", "chat", 1_000_000, 0, BTreeMap::new()).unwrap();
        }
        assert_eq!(t.summary().totals.requests, 3);
    }

    #[test]
    fn period_totals_survive_restart() {
        let dir = TempDir::new().unwrap();
        {
            let mut t = tracker(&dir);
            t.record("openai", "gpt-4o", "chat", 1_000_000, 0, BTreeMap::new())
                .unwrap();
        }
        let t = tracker(&dir);
        assert_eq!(t.period().totals.requests, 1);
        assert!((t.period().totals.cost - 2.50).abs() < 1e-9);
        // Session ledger is per-process.
        assert!(t.session().is_empty());
    }

    #[test]
    fn stale_period_file_is_discarded() {
        let dir = TempDir::new().unwrap();
        let stale = PeriodState {
            period_start: Local::now() - Duration::days(3),
            period: BudgetPeriod::Daily,
            totals: Totals {
                input_tokens: 1,
                output_tokens: 1,
                cost: 9.0,
                requests: 1,
            },
        };
        io::atomic_write(
            &paths::period_file(dir.path(), "daily"),
            &serde_json::to_vec(&stale).unwrap(),
        )
        .unwrap();
        let t = tracker(&dir);
        assert_eq!(t.period().totals.requests, 0);
    }

    #[test]
    fn period_file_uses_documented_schema() {
        let dir = TempDir::new().unwrap();
        let mut t = tracker(&dir);
        t.record("openai", "gpt-4o", "chat", 10, 20, BTreeMap::new())
            .unwrap();
        let json = std::fs::read_to_string(paths::period_file(dir.path(), "daily")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("periodStart").is_some());
        assert_eq!(value["period"], "daily");
        assert_eq!(value["totals"]["inputTokens"], 10);
        assert_eq!(value["totals"]["outputTokens"], 20);
        assert_eq!(value["totals"]["requests"], 1);
    }

    #[test]
    fn budget_persists_across_restart() {
        let dir = TempDir::new().unwrap();
        {
            let mut t = tracker(&dir);
            t.set_budget(25.0, BudgetPeriod::Weekly).unwrap();
        }
        let t = tracker(&dir);
        let budget = t.budget().unwrap();
        assert!((budget.limit - 25.0).abs() < 1e-9);
        assert_eq!(budget.period, BudgetPeriod::Weekly);
    }

    #[test]
    fn save_session_writes_summary_snapshot() {
        let dir = TempDir::new().unwrap();
        let mut t = tracker(&dir);
        t.record("openai", "gpt-4o", "chat", 100, 100, BTreeMap::new())
            .unwrap();
        let path = t.save_session().unwrap();
        assert!(path.starts_with(paths::costs_dir(dir.path())));
        let json = std::fs::read_to_string(path).unwrap();
        let summary: SessionSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(summary.totals.requests, 1);
    }

    #[test]
    fn reset_clears_session_but_not_period() {
        let dir = TempDir::new().unwrap();
        let mut t = tracker(&dir);
        t.record("openai", "gpt-4o", "chat", 100, 100, BTreeMap::new())
            .unwrap();
        t.reset_session();
        assert!(t.session().is_empty());
        assert_eq!(t.period().totals.requests, 1);
    }

    #[test]
    fn window_starts_at_local_midnight() {
        let now = Local::now();
        let daily = window_start(BudgetPeriod::Daily, now);
        assert_eq!(daily.time(), NaiveTime::MIN);
        assert_eq!(daily.date_naive(), now.date_naive());

        let weekly = window_start(BudgetPeriod::Weekly, now);
        assert_eq!(weekly.weekday(), chrono::Weekday::Sun);
        assert!(weekly <= now);

        let monthly = window_start(BudgetPeriod::Monthly, now);
        assert_eq!(monthly.day(), 1);
    }
}
