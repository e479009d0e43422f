use crate::symbol::Symbol;
use fnv::FnvHashMap;
use parking_lot::RwLock;
use std::collections::VecDeque;

/// Number of reference last prices retained per symbol.
pub const HISTORY_CAPACITY: usize = 60;

/// Bounded per-symbol ring of recent reference last prices, oldest first.
///
/// Buffers are created lazily on first append and never removed. Consumers only read the
/// symbols of the current universe, so buffers of dropped symbols go unreferenced.
#[derive(Debug)]
pub struct HistoryStore {
    capacity: usize,
    buffers: RwLock<FnvHashMap<Symbol, VecDeque<f64>>>,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            buffers: RwLock::new(FnvHashMap::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a price, evicting the oldest sample once the buffer exceeds capacity.
    ///
    /// Non-finite and non-positive prices are ignored and `false` is returned.
    pub fn append(&self, symbol: &Symbol, price: f64) -> bool {
        if !price.is_finite() || price <= 0.0 {
            return false;
        }

        let mut buffers = self.buffers.write();
        let buffer = buffers
            .entry(symbol.clone())
            .or_insert_with(|| VecDeque::with_capacity(self.capacity + 1));

        buffer.push_back(price);
        while buffer.len() > self.capacity {
            buffer.pop_front();
        }
        true
    }

    /// Chronological copy of the symbol's buffer, empty if nothing was appended yet.
    pub fn read(&self, symbol: &str) -> Vec<f64> {
        self.buffers
            .read()
            .get(symbol)
            .map(|buffer| buffer.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, symbol: &str) -> usize {
        self.buffers.read().get(symbol).map_or(0, VecDeque::len)
    }
}
