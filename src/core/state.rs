//! Per-metric baselines carried from one round to the next.

/// What a metric remembers between rounds.
///
/// `prior` is `None` until the metric has been read once, and again after a
/// round in which it was absent or the whole poll failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterState {
    pub prior: Option<i128>,
}

impl CounterState {
    pub const EMPTY: CounterState = CounterState { prior: None };

    pub fn with_prior(value: i128) -> Self {
        Self { prior: Some(value) }
    }

    pub fn has_baseline(&self) -> bool {
        self.prior.is_some()
    }
}

/// One `CounterState` per catalog position, owned by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterStateStore {
    states: Vec<CounterState>,
}

impl CounterStateStore {
    /// Allocates `len` empty states.
    pub fn new(len: usize) -> Self {
        Self {
            states: vec![CounterState::EMPTY; len],
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// # Panics
    ///
    /// Panics if `index` is outside the catalog.
    pub fn get(&self, index: usize) -> CounterState {
        self.states[index]
    }

    /// # Panics
    ///
    /// Panics if `index` is outside the catalog.
    pub fn set(&mut self, index: usize, state: CounterState) {
        self.states[index] = state;
    }

    /// Forgets every baseline, e.g. after a round whose poll failed.
    pub fn reset_all(&mut self) {
        self.states.fill(CounterState::EMPTY);
    }

    pub fn iter(&self) -> impl Iterator<Item = &CounterState> {
        self.states.iter()
    }
}
