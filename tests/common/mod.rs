#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;

use mirrorbot::market::{Market, MarketData};
use mirrorbot::models::{DecisionRecord, MarginMode};
use mirrorbot::venues::{LeaderFill, LeaderPositionMeta, LeaderState, LeaderVenue, VenueError};

// ---------------------------------------------------------------------------
// ScriptedVenue
// ---------------------------------------------------------------------------

/// One poll cycle's worth of venue responses.
#[derive(Clone)]
pub struct PollStep {
    pub fills: Vec<LeaderFill>,
    pub state: LeaderState,
}

/// Venue stub that replays a scripted sequence of poll responses. Once the
/// script runs out, the last step repeats, which makes idempotence easy to
/// assert.
pub struct ScriptedVenue {
    identifier: String,
    script: Mutex<VecDeque<PollStep>>,
    last: Mutex<Option<PollStep>>,
}

impl ScriptedVenue {
    pub fn new(steps: Vec<PollStep>) -> Self {
        Self {
            identifier: "leader-under-test".into(),
            script: Mutex::new(steps.into()),
            last: Mutex::new(None),
        }
    }

    fn current(&self) -> PollStep {
        let mut script = self.script.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        if let Some(step) = script.pop_front() {
            *last = Some(step.clone());
        }
        last.clone().expect("scripted venue has no steps")
    }
}

#[async_trait]
impl LeaderVenue for ScriptedVenue {
    fn venue(&self) -> &'static str {
        "scripted"
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn validate(&self) -> Result<(), VenueError> {
        Ok(())
    }

    async fn fetch_fills(&self) -> Result<Vec<LeaderFill>, VenueError> {
        Ok(self.current().fills)
    }

    async fn fetch_state(&self) -> Result<LeaderState, VenueError> {
        // fetch_fills already advanced the script for this cycle
        let last = self.last.lock().unwrap();
        Ok(last.clone().expect("fetch_fills must run first").state)
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn fill(symbol: &str, price: Decimal, time: i64, cursor: i64) -> LeaderFill {
    LeaderFill {
        symbol: symbol.into(),
        price,
        time,
        id: cursor.to_string(),
        cursor,
    }
}

pub fn position(size: Decimal, leverage: u32, margin_mode: Option<MarginMode>) -> LeaderPositionMeta {
    LeaderPositionMeta {
        size,
        leverage,
        margin_mode,
    }
}

pub fn state(equity: Decimal, positions: Vec<(&str, LeaderPositionMeta)>) -> LeaderState {
    LeaderState {
        equity,
        positions: positions
            .into_iter()
            .map(|(symbol, meta)| (symbol.to_string(), meta))
            .collect(),
    }
}

pub fn step(fills: Vec<LeaderFill>, state: LeaderState) -> PollStep {
    PollStep { fills, state }
}

// ---------------------------------------------------------------------------
// StaticMarketData
// ---------------------------------------------------------------------------

/// Market-data stub backed by a fixed symbol -> price map. Unknown symbols
/// report "no price".
pub struct StaticMarketData {
    prices: HashMap<String, Decimal>,
}

impl StaticMarketData {
    pub fn empty() -> Self {
        Self {
            prices: HashMap::new(),
        }
    }

    pub fn with_price(mut self, symbol: &str, price: Decimal) -> Self {
        self.prices.insert(symbol.into(), price);
        self
    }
}

#[async_trait]
impl MarketData for StaticMarketData {
    async fn get(&self, symbol: &str) -> anyhow::Result<Market> {
        match self.prices.get(symbol) {
            Some(price) => Ok(Market {
                symbol: symbol.into(),
                current_price: *price,
            }),
            None => anyhow::bail!("no market data for {symbol}"),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

/// Decision sink that stores every record for assertions.
#[derive(Default)]
pub struct RecordingSink {
    records: Mutex<Vec<DecisionRecord>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DecisionRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl mirrorbot::execution::DecisionSink for RecordingSink {
    async fn record(&self, decision: &DecisionRecord) {
        self.records.lock().unwrap().push(decision.clone());
    }
}
