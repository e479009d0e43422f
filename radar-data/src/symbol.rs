use derive_more::Display;
use serde::{Deserialize, Deserializer, Serialize};
use smol_str::SmolStr;
use std::borrow::Borrow;

/// Quote currency every tracked pair is denominated in.
pub const QUOTE_ASSET: &str = "USDT";

/// Leveraged token markers excluded from the universe (eg/ `BTCUPUSDT`).
pub const LEVERAGED_TOKEN_MARKERS: [&str; 2] = ["UPUSDT", "DOWNUSDT"];

/// Canonical uppercase concatenated ticker, eg/ `BTCUSDT`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Serialize)]
pub struct Symbol(SmolStr);

impl Symbol {
    /// Construct a new [`Self`], normalising to uppercase.
    pub fn new<S: AsRef<str>>(symbol: S) -> Self {
        let symbol = symbol.as_ref();
        if symbol.bytes().any(|byte| byte.is_ascii_lowercase()) {
            Self(SmolStr::new(symbol.to_ascii_uppercase()))
        } else {
            Self(SmolStr::new(symbol))
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Base asset if this is a [`QUOTE_ASSET`] pair, eg/ `BTC` for `BTCUSDT`.
    pub fn base(&self) -> Option<&str> {
        self.as_str()
            .strip_suffix(QUOTE_ASSET)
            .filter(|base| !base.is_empty())
    }

    /// Determine if this pair may be admitted to the tracked universe.
    pub fn is_tracked_pair(&self) -> bool {
        self.base().is_some()
            && !LEVERAGED_TOKEN_MARKERS
                .iter()
                .any(|marker| self.as_str().contains(marker))
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        SmolStr::deserialize(deserializer).map(Symbol::new)
    }
}
