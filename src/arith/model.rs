//! Adaptive frequency models.
//!
//! The decoder only sees the [`FrequencyModel`] trait. [`ContextManager`] is
//! the model U3D streams are written against: one adaptive histogram per
//! dynamic context plus the static byte and uniform tables.

use super::context::{Context, ContextKind, STATIC_FULL};

/// Upper bound on any context's total frequency.
///
/// After renormalization the interval spans more than `0x4000` codes, so a
/// total at or below this value always leaves every symbol a non-empty
/// sub-interval.
pub const MAX_TOTAL_FREQUENCY: u32 = 0x4000;

/// Default total at which a dynamic histogram is halved.
pub const DEFAULT_RESCALE_THRESHOLD: u32 = 0x1FFF;

/// Default, and largest allowed, symbol tracked by a dynamic histogram.
///
/// Histograms are dense, so this bounds their memory at a few tens of KiB
/// per context whatever value a stream escapes.
pub const DEFAULT_MAX_SYMBOL: u32 = 0x3FFF;

/// Escape symbol of dynamic contexts.
pub const ESCAPE_SYMBOL: u32 = 0;

/// Cumulative-frequency model queried by the decoder.
///
/// Implementations must keep every context's table a contiguous partition of
/// `[0, total)`, including right after [`add_symbol`](Self::add_symbol).
pub trait FrequencyModel {
    /// Sum of all symbol frequencies in `context`.
    fn total_frequency(&self, context: Context) -> u32;

    /// The symbol whose range `[cum, cum + freq)` contains `cumulative`.
    fn symbol_for_cumulative_frequency(&self, context: Context, cumulative: u32) -> u32;

    /// Sum of the frequencies of all symbols below `symbol`.
    fn cumulative_frequency(&self, context: Context, symbol: u32) -> u32;

    fn frequency(&self, context: Context, symbol: u32) -> u32;

    /// Record an occurrence of `symbol`.
    fn add_symbol(&mut self, context: Context, symbol: u32);
}

impl<M: FrequencyModel + ?Sized> FrequencyModel for &mut M {
    fn total_frequency(&self, context: Context) -> u32 {
        (**self).total_frequency(context)
    }

    fn symbol_for_cumulative_frequency(&self, context: Context, cumulative: u32) -> u32 {
        (**self).symbol_for_cumulative_frequency(context, cumulative)
    }

    fn cumulative_frequency(&self, context: Context, symbol: u32) -> u32 {
        (**self).cumulative_frequency(context, symbol)
    }

    fn frequency(&self, context: Context, symbol: u32) -> u32 {
        (**self).frequency(context, symbol)
    }

    fn add_symbol(&mut self, context: Context, symbol: u32) {
        (**self).add_symbol(context, symbol);
    }
}

/// Options for [`ContextManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelConfig {
    /// Halve a dynamic histogram once its total reaches this value.
    /// Clamped to [`MAX_TOTAL_FREQUENCY`]. `None` disables rescaling and
    /// freezes a histogram when it reaches the cap.
    pub rescale_threshold: Option<u32>,
    /// Largest symbol a dynamic histogram tracks. Larger symbols are never
    /// added and stay escape-coded. Clamped to [`DEFAULT_MAX_SYMBOL`].
    pub max_symbol: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            rescale_threshold: Some(DEFAULT_RESCALE_THRESHOLD),
            max_symbol: DEFAULT_MAX_SYMBOL,
        }
    }
}

impl ModelConfig {
    /// Total at which a histogram stops growing as-is.
    fn limit(&self) -> u32 {
        self.rescale_threshold
            .map_or(MAX_TOTAL_FREQUENCY, |t| t.clamp(2, MAX_TOTAL_FREQUENCY))
    }

    /// Largest symbol a histogram may grow to hold.
    fn symbol_limit(&self) -> u32 {
        self.max_symbol.min(DEFAULT_MAX_SYMBOL)
    }
}

/// Adaptive histogram for one dynamic context.
///
/// An untouched histogram holds only the escape symbol with count 1; the
/// vectors are allocated on first update.
#[derive(Debug, Clone, Default)]
struct Histogram {
    counts: Vec<u32>,
    /// `cumulative[i]` is the sum of `counts[..i]`; one entry longer than
    /// `counts`.
    cumulative: Vec<u32>,
}

impl Histogram {
    fn total(&self) -> u32 {
        self.cumulative.last().copied().unwrap_or(1)
    }

    fn frequency(&self, symbol: u32) -> u32 {
        if self.counts.is_empty() {
            return u32::from(symbol == ESCAPE_SYMBOL);
        }
        self.counts.get(symbol as usize).copied().unwrap_or(0)
    }

    fn cumulative_frequency(&self, symbol: u32) -> u32 {
        if self.counts.is_empty() {
            return if symbol == ESCAPE_SYMBOL { 0 } else { 1 };
        }
        match self.cumulative.get(symbol as usize) {
            Some(&c) => c,
            None => self.total(),
        }
    }

    fn symbol_for(&self, cumulative: u32) -> u32 {
        if self.counts.is_empty() {
            return ESCAPE_SYMBOL;
        }
        // Last entry with cumulative[i] <= cf; zero-count symbols share their
        // successor's start and are skipped.
        let idx = self.cumulative.partition_point(|&c| c <= cumulative);
        (idx.saturating_sub(1)).min(self.counts.len() - 1) as u32
    }

    /// Returns whether the histogram was halved first.
    fn add(&mut self, symbol: u32, config: &ModelConfig) -> bool {
        if self.counts.is_empty() {
            self.counts.push(1);
            self.cumulative.extend_from_slice(&[0, 1]);
        }

        let mut rescaled = false;
        if self.total() >= config.limit() {
            if config.rescale_threshold.is_none() {
                return false;
            }
            self.halve();
            rescaled = true;
        }

        let idx = symbol as usize;
        if idx >= self.counts.len() {
            let total = self.total();
            self.counts.resize(idx + 1, 0);
            self.cumulative.resize(idx + 2, total);
        }
        self.counts[idx] += 1;
        for c in &mut self.cumulative[idx + 1..] {
            *c += 1;
        }
        rescaled
    }

    fn halve(&mut self) {
        for count in &mut self.counts {
            *count >>= 1;
        }
        self.counts[0] += 1;
        let mut acc = 0;
        for (i, &count) in self.counts.iter().enumerate() {
            self.cumulative[i] = acc;
            acc += count;
        }
        self.cumulative[self.counts.len()] = acc;
    }
}

/// Context-selected model: dynamic histograms plus static tables.
#[derive(Debug, Clone)]
pub struct ContextManager {
    config: ModelConfig,
    histograms: Vec<Histogram>,
}

impl ContextManager {
    pub fn new() -> Self {
        Self::with_config(ModelConfig::default())
    }

    pub fn with_config(config: ModelConfig) -> Self {
        Self {
            config,
            histograms: vec![Histogram::default(); STATIC_FULL as usize],
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Forget everything learned, returning all dynamic contexts to the
    /// escape-only state.
    pub fn reset(&mut self) {
        for histogram in &mut self.histograms {
            *histogram = Histogram::default();
        }
    }

    /// Whether `symbol` has a non-zero count in `context`.
    pub fn contains(&self, context: Context, symbol: u32) -> bool {
        self.frequency(context, symbol) > 0
    }

    fn histogram(&self, index: u32) -> &Histogram {
        &self.histograms[index as usize]
    }
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new()
    }
}

impl FrequencyModel for ContextManager {
    fn total_frequency(&self, context: Context) -> u32 {
        match context.kind() {
            ContextKind::Byte => 256,
            ContextKind::Dynamic(i) => self.histogram(i).total(),
            ContextKind::Uniform(n) => n,
            ContextKind::Unsupported => 0,
        }
    }

    fn symbol_for_cumulative_frequency(&self, context: Context, cumulative: u32) -> u32 {
        match context.kind() {
            ContextKind::Dynamic(i) => self.histogram(i).symbol_for(cumulative),
            ContextKind::Byte | ContextKind::Uniform(_) => cumulative + 1,
            ContextKind::Unsupported => 0,
        }
    }

    fn cumulative_frequency(&self, context: Context, symbol: u32) -> u32 {
        match context.kind() {
            ContextKind::Dynamic(i) => self.histogram(i).cumulative_frequency(symbol),
            ContextKind::Byte | ContextKind::Uniform(_) => symbol.saturating_sub(1),
            ContextKind::Unsupported => 0,
        }
    }

    fn frequency(&self, context: Context, symbol: u32) -> u32 {
        let total = match context.kind() {
            ContextKind::Dynamic(i) => return self.histogram(i).frequency(symbol),
            ContextKind::Byte => 256,
            ContextKind::Uniform(n) => n,
            ContextKind::Unsupported => return 0,
        };
        u32::from((1..=total).contains(&symbol))
    }

    fn add_symbol(&mut self, context: Context, symbol: u32) {
        let ContextKind::Dynamic(index) = context.kind() else {
            return;
        };
        if symbol > self.config.symbol_limit() {
            tracing::trace!(%context, symbol, "symbol above max_symbol left escape-coded");
            return;
        }
        let config = self.config;
        let histogram = &mut self.histograms[index as usize];
        if histogram.add(symbol, &config) {
            tracing::debug!(%context, total = histogram.total(), "rescaled histogram");
        }
    }
}
