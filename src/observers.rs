use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

use crate::config::{ProviderConfig, DEFAULT_HTTP_TIMEOUT, DEFAULT_POLL_INTERVAL};
use crate::market::MarketData;
use crate::models::{Signal, SignalAction};
use crate::venues::{HyperliquidClient, LeaderState, LeaderVenue, OkxClient, VenueError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ObserverError {
    #[error(transparent)]
    Venue(#[from] VenueError),

    #[error("{0} equity invalid")]
    EquityInvalid(&'static str),

    #[error("signal channel closed")]
    ChannelClosed,
}

// ---------------------------------------------------------------------------
// SignalSource
// ---------------------------------------------------------------------------

/// A long-running source of leader signals. Runs until the stop signal is
/// delivered (or its sender dropped), then exits without emitting further
/// signals.
#[async_trait]
pub trait SignalSource: Send {
    async fn run(
        &mut self,
        stop: oneshot::Receiver<()>,
        out: mpsc::Sender<Signal>,
    ) -> anyhow::Result<()>;
}

impl std::fmt::Debug for dyn SignalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<dyn SignalSource>")
    }
}

/// Construct a signal source from a typed descriptor. Applies the default
/// HTTP timeout and poll interval; fails on an unrecognized source type.
/// The market-data handle is the read-only price fallback consulted when a
/// symbol has no fill price yet.
pub fn new_signal_source(
    cfg: ProviderConfig,
    market_data: Arc<dyn MarketData>,
) -> anyhow::Result<Box<dyn SignalSource>> {
    let http = match cfg.http_client {
        Some(client) => client,
        None => reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()?,
    };
    let poll_interval = cfg
        .poll_interval
        .filter(|d| !d.is_zero())
        .unwrap_or(DEFAULT_POLL_INTERVAL);

    match cfg.source_type.as_str() {
        "hyperliquid_wallet" | "hyperliquid" => Ok(Box::new(Observer::new(
            HyperliquidClient::new(http, cfg.identifier),
            market_data,
            poll_interval,
        ))),
        "okx_wallet" | "okx" => Ok(Box::new(Observer::new(
            OkxClient::new(http, cfg.identifier),
            market_data,
            poll_interval,
        ))),
        _ => anyhow::bail!("unsupported signal source type"),
    }
}

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

/// Polls one leader venue and turns position changes into normalized
/// signals.
///
/// The positions snapshot is the source of truth for direction and
/// magnitude; fills only feed the price cache. The first completed cycle
/// initializes the snapshot without emitting, so a restart never replays
/// the leader's standing positions as fresh opens.
pub struct Observer<V: LeaderVenue> {
    venue: V,
    market_data: Arc<dyn MarketData>,
    poll_interval: std::time::Duration,
    fill_cursor: i64,
    initialized: bool,
    /// symbol -> signed size; absent key means zero.
    positions: HashMap<String, Decimal>,
    /// symbol -> last seen fill price.
    prices: HashMap<String, Decimal>,
}

impl<V: LeaderVenue> Observer<V> {
    pub fn new(
        venue: V,
        market_data: Arc<dyn MarketData>,
        poll_interval: std::time::Duration,
    ) -> Self {
        Self {
            venue,
            market_data,
            poll_interval,
            fill_cursor: 0,
            initialized: false,
            positions: HashMap::new(),
            prices: HashMap::new(),
        }
    }

    /// Run a single poll cycle: fetch, ingest fills, diff positions, sweep
    /// disappeared symbols. Errors leave the snapshot unadvanced and are
    /// retried by the caller on the next tick.
    pub async fn poll_once(&mut self, out: &mpsc::Sender<Signal>) -> Result<(), ObserverError> {
        let started = Instant::now();

        let fills = self.venue.fetch_fills().await?;
        let state = self.venue.fetch_state().await?;
        if state.equity <= Decimal::ZERO {
            return Err(ObserverError::EquityInvalid(self.venue.venue()));
        }

        self.ingest_fills(fills);

        if !self.initialized {
            for (symbol, meta) in &state.positions {
                self.positions.insert(symbol.clone(), meta.size);
            }
            self.initialized = true;
            tracing::info!(
                venue = self.venue.venue(),
                leader = self.venue.identifier(),
                positions = self.positions.len(),
                "position snapshot initialized"
            );
            metrics::histogram!("observer_poll_seconds").record(started.elapsed().as_secs_f64());
            return Ok(());
        }

        let now = Utc::now();
        self.diff_positions(&state, now, out).await?;
        self.sweep_disappeared(&state, now, out).await?;

        metrics::histogram!("observer_poll_seconds").record(started.elapsed().as_secs_f64());
        Ok(())
    }

    /// Sort fills by time, tie-broken on the numeric cursor, and fold
    /// everything past the high-water mark into the price cache. Fills
    /// with no usable symbol or price still advance the cursor.
    fn ingest_fills(&mut self, mut fills: Vec<crate::venues::LeaderFill>) {
        fills.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.cursor.cmp(&b.cursor)));

        let mut max_cursor = self.fill_cursor;
        for fill in fills {
            if fill.cursor <= self.fill_cursor {
                continue;
            }
            if !fill.symbol.is_empty() && fill.price > Decimal::ZERO {
                self.prices.insert(fill.symbol.clone(), fill.price);
            }
            if fill.cursor > max_cursor {
                max_cursor = fill.cursor;
            }
        }
        self.fill_cursor = max_cursor;
    }

    async fn diff_positions(
        &mut self,
        state: &LeaderState,
        now: DateTime<Utc>,
        out: &mpsc::Sender<Signal>,
    ) -> Result<(), ObserverError> {
        for (symbol, meta) in &state.positions {
            let prev = self.positions.get(symbol).copied().unwrap_or_default();
            let delta = meta.size - prev;
            if delta == Decimal::ZERO {
                continue;
            }

            let Some(price) = self.resolve_price(symbol).await else {
                // keep the stale snapshot entry so the change is re-detected
                // next cycle, once a price reference exists
                tracing::debug!(
                    venue = self.venue.venue(),
                    symbol = %symbol,
                    "no price reference, deferring position diff"
                );
                continue;
            };

            let flipped = (prev > Decimal::ZERO && meta.size < Decimal::ZERO)
                || (prev < Decimal::ZERO && meta.size > Decimal::ZERO);
            if flipped {
                let close_action = if prev > Decimal::ZERO {
                    SignalAction::CloseLong
                } else {
                    SignalAction::CloseShort
                };
                let open_action = if meta.size > Decimal::ZERO {
                    SignalAction::OpenLong
                } else {
                    SignalAction::OpenShort
                };

                self.emit(
                    out,
                    Signal {
                        symbol: symbol.clone(),
                        action: close_action,
                        notional_usd: prev.abs() * price,
                        price,
                        leader_equity: state.equity,
                        leader_leverage: meta.leverage,
                        margin_mode: meta.margin_mode,
                        timestamp: now,
                        delta_size: -prev,
                        leader_pos_before: prev,
                        leader_pos_after: Decimal::ZERO,
                    },
                )
                .await?;
                self.emit(
                    out,
                    Signal {
                        symbol: symbol.clone(),
                        action: open_action,
                        notional_usd: meta.size.abs() * price,
                        price,
                        leader_equity: state.equity,
                        leader_leverage: meta.leverage,
                        margin_mode: meta.margin_mode,
                        timestamp: now,
                        delta_size: meta.size,
                        leader_pos_before: Decimal::ZERO,
                        leader_pos_after: meta.size,
                    },
                )
                .await?;
                self.positions.insert(symbol.clone(), meta.size);
                continue;
            }

            // brand-new position: an absent snapshot entry is a zero
            // position, so this is an open, not an add
            if prev == Decimal::ZERO {
                let action = if meta.size > Decimal::ZERO {
                    SignalAction::OpenLong
                } else {
                    SignalAction::OpenShort
                };
                self.emit(
                    out,
                    Signal {
                        symbol: symbol.clone(),
                        action,
                        notional_usd: meta.size.abs() * price,
                        price,
                        leader_equity: state.equity,
                        leader_leverage: meta.leverage,
                        margin_mode: meta.margin_mode,
                        timestamp: now,
                        delta_size: meta.size,
                        leader_pos_before: Decimal::ZERO,
                        leader_pos_after: meta.size,
                    },
                )
                .await?;
                self.positions.insert(symbol.clone(), meta.size);
                continue;
            }

            let Some(action) = classify_delta(prev, meta.size) else {
                self.positions.insert(symbol.clone(), meta.size);
                continue;
            };
            self.emit(
                out,
                Signal {
                    symbol: symbol.clone(),
                    action,
                    notional_usd: delta.abs() * price,
                    price,
                    leader_equity: state.equity,
                    leader_leverage: meta.leverage,
                    margin_mode: meta.margin_mode,
                    timestamp: now,
                    delta_size: delta,
                    leader_pos_before: prev,
                    leader_pos_after: meta.size,
                },
            )
            .await?;
            self.positions.insert(symbol.clone(), meta.size);
        }
        Ok(())
    }

    /// Snapshot symbols missing from the fetched positions closed out
    /// entirely. Emit a full close when a price can be found; either way
    /// the snapshot entry is evicted, so a price-less disappearance cannot
    /// linger forever.
    async fn sweep_disappeared(
        &mut self,
        state: &LeaderState,
        now: DateTime<Utc>,
        out: &mpsc::Sender<Signal>,
    ) -> Result<(), ObserverError> {
        let gone: Vec<(String, Decimal)> = self
            .positions
            .iter()
            .filter(|(symbol, _)| !state.positions.contains_key(*symbol))
            .map(|(symbol, size)| (symbol.clone(), *size))
            .collect();

        for (symbol, prev) in gone {
            if prev == Decimal::ZERO {
                self.positions.remove(&symbol);
                continue;
            }

            let Some(price) = self.resolve_price(&symbol).await else {
                tracing::warn!(
                    venue = self.venue.venue(),
                    symbol = %symbol,
                    "position disappeared with no price reference, dropping"
                );
                self.positions.remove(&symbol);
                continue;
            };

            let action = if prev > Decimal::ZERO {
                SignalAction::CloseLong
            } else {
                SignalAction::CloseShort
            };
            self.emit(
                out,
                Signal {
                    symbol: symbol.clone(),
                    action,
                    notional_usd: prev.abs() * price,
                    price,
                    leader_equity: state.equity,
                    leader_leverage: 0,
                    margin_mode: None,
                    timestamp: now,
                    delta_size: -prev,
                    leader_pos_before: prev,
                    leader_pos_after: Decimal::ZERO,
                },
            )
            .await?;
            self.positions.remove(&symbol);
        }
        Ok(())
    }

    /// Prefer the fill-price cache; fall back to the external market-data
    /// cache, memoizing a usable answer.
    async fn resolve_price(&mut self, symbol: &str) -> Option<Decimal> {
        if let Some(price) = self.prices.get(symbol) {
            if *price > Decimal::ZERO {
                return Some(*price);
            }
        }
        match self.market_data.get(symbol).await {
            Ok(market) if market.current_price > Decimal::ZERO => {
                self.prices
                    .insert(symbol.to_string(), market.current_price);
                Some(market.current_price)
            }
            _ => None,
        }
    }

    async fn emit(&self, out: &mpsc::Sender<Signal>, signal: Signal) -> Result<(), ObserverError> {
        tracing::info!(
            venue = self.venue.venue(),
            leader = self.venue.identifier(),
            symbol = %signal.symbol,
            action = %signal.action,
            notional = %signal.notional_usd,
            delta = %signal.delta_size,
            "leader position change"
        );
        out.send(signal)
            .await
            .map_err(|_| ObserverError::ChannelClosed)?;
        metrics::counter!("signals_emitted_total").increment(1);
        Ok(())
    }
}

#[async_trait]
impl<V: LeaderVenue> SignalSource for Observer<V> {
    async fn run(
        &mut self,
        mut stop: oneshot::Receiver<()>,
        out: mpsc::Sender<Signal>,
    ) -> anyhow::Result<()> {
        self.venue.validate()?;
        tracing::info!(
            venue = self.venue.venue(),
            leader = self.venue.identifier(),
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "observer started"
        );

        // first cycle runs immediately; ticks then pace the rest, with a
        // slow cycle pushing back the next tick rather than bunching
        let start = tokio::time::Instant::now() + self.poll_interval;
        let mut ticker = tokio::time::interval_at(start, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            match self.poll_once(&out).await {
                Ok(()) => {}
                Err(ObserverError::ChannelClosed) => {
                    tracing::warn!(
                        venue = self.venue.venue(),
                        "signal channel closed, observer exiting"
                    );
                    return Ok(());
                }
                Err(e) => {
                    metrics::counter!("observer_poll_errors_total").increment(1);
                    tracing::warn!(
                        venue = self.venue.venue(),
                        leader = self.venue.identifier(),
                        error = %e,
                        "poll cycle failed"
                    );
                }
            }

            tokio::select! {
                _ = &mut stop => {
                    tracing::info!(
                        venue = self.venue.venue(),
                        leader = self.venue.identifier(),
                        "observer stopped"
                    );
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }
        }
    }
}

/// Classify a same-direction position change by where it lands relative to
/// zero: moving toward long grows a long or shrinks a short, moving toward
/// short does the opposite. Flips and brand-new positions (`prev == 0`)
/// are handled by the caller before this runs.
pub fn classify_delta(prev: Decimal, curr: Decimal) -> Option<SignalAction> {
    if curr > prev {
        if curr > Decimal::ZERO {
            Some(SignalAction::AddLong)
        } else {
            Some(SignalAction::ReduceShort)
        }
    } else if curr < prev {
        if curr < Decimal::ZERO {
            Some(SignalAction::AddShort)
        } else {
            Some(SignalAction::ReduceLong)
        }
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
