use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::CopyTradingConfig;
use crate::models::{
    DecisionOutcome, DecisionRecord, OrderRequest, OrderSide, Signal, SkipReason,
};

use super::{DecisionSink, FollowerExecutor};

/// One translated signal: the full decision record, plus the order to
/// place when the decision was to size one.
#[derive(Debug, Clone)]
pub struct SizingOutcome {
    pub decision: DecisionRecord,
    pub order: Option<OrderRequest>,
}

/// Translate one leader signal into a sized follower order.
///
/// Open/add signals are sized by fair margin share: the leader's margin
/// for this change, as a fraction of leader equity, applied to follower
/// equity (scaled by the configured ratio) and re-levered. Reduce/close
/// signals shrink the follower's own position by the same fraction the
/// leader shrank theirs; a leader position reaching zero closes the
/// follower position entirely.
pub fn translate_signal(
    signal: &Signal,
    follower_equity: Decimal,
    follower_position: Decimal,
    config: &CopyTradingConfig,
) -> SizingOutcome {
    let leverage = Decimal::from(signal.leader_leverage.max(1));
    let leader_margin = signal.notional_usd / leverage;
    let proportion = if signal.leader_equity > Decimal::ZERO {
        leader_margin / signal.leader_equity
    } else {
        Decimal::ZERO
    };

    let mut decision = DecisionRecord {
        id: Uuid::new_v4(),
        symbol: signal.symbol.clone(),
        action: signal.action,
        outcome: DecisionOutcome::Sized,
        leader_equity: signal.leader_equity,
        leader_notional: signal.notional_usd,
        leader_margin,
        leader_price: signal.price,
        follower_equity,
        follower_notional: Decimal::ZERO,
        follower_margin: Decimal::ZERO,
        copy_ratio: config.follow_ratio,
        proportion,
        min_triggered: false,
        max_triggered: false,
        close_fraction: None,
        created_at: Utc::now(),
    };

    let skip = |mut decision: DecisionRecord, reason: SkipReason| {
        decision.outcome = DecisionOutcome::Skipped(reason);
        SizingOutcome {
            decision,
            order: None,
        }
    };

    // flag gating
    if signal.action.is_open() && !config.follow_open {
        return skip(decision, SkipReason::OpenNotFollowed);
    }
    if signal.action.is_add() && !config.follow_add {
        return skip(decision, SkipReason::AddNotFollowed);
    }
    if (signal.action.is_reduce() || signal.action.is_close()) && !config.follow_reduce {
        return skip(decision, SkipReason::ReduceNotFollowed);
    }

    let target_leverage = config.sync_leverage.then(|| signal.leader_leverage.max(1));
    let target_margin_mode = if config.sync_margin_mode {
        signal.margin_mode
    } else {
        None
    };

    if signal.action.increases_exposure() {
        let base = proportion * follower_equity * config.follow_ratio / Decimal::ONE_HUNDRED;
        let mut notional = base * leverage;

        if config.min_amount > Decimal::ZERO && notional < config.min_amount {
            notional = config.min_amount;
            decision.min_triggered = true;
        }
        if config.max_amount > Decimal::ZERO && notional > config.max_amount {
            notional = config.max_amount;
            decision.max_triggered = true;
        }

        if notional <= Decimal::ZERO {
            return skip(decision, SkipReason::ZeroNotional);
        }

        decision.follower_notional = notional;
        decision.follower_margin = notional / leverage;

        let order = OrderRequest {
            symbol: signal.symbol.clone(),
            side: OrderSide::for_action(signal.action),
            reduce_only: false,
            notional_usd: notional,
            price: signal.price,
            leverage: target_leverage,
            margin_mode: target_margin_mode,
            close_fraction: None,
        };
        return SizingOutcome {
            decision,
            order: Some(order),
        };
    }

    // reduce / close: proportional to the follower's own position
    if follower_position == Decimal::ZERO {
        return skip(decision, SkipReason::NoFollowerPosition);
    }

    let fraction = if signal.leader_pos_after == Decimal::ZERO
        || signal.leader_pos_before == Decimal::ZERO
    {
        Decimal::ONE
    } else {
        (signal.delta_size.abs() / signal.leader_pos_before.abs()).min(Decimal::ONE)
    };
    let close_size = (follower_position * fraction).abs();
    let notional = close_size * signal.price;

    decision.close_fraction = Some(fraction);
    decision.follower_notional = notional;
    decision.follower_margin = notional / leverage;

    let order = OrderRequest {
        symbol: signal.symbol.clone(),
        side: OrderSide::for_action(signal.action),
        reduce_only: true,
        notional_usd: notional,
        price: signal.price,
        leverage: target_leverage,
        margin_mode: target_margin_mode,
        close_fraction: Some(fraction),
    };
    SizingOutcome {
        decision,
        order: Some(order),
    }
}

/// Drain the signal channel, translating and executing each signal in
/// arrival order. A single consumer task serializes decisions per
/// follower, so no follower-side locking is needed. Runs until the
/// channel closes; while `pause_flag` is set, signals are skipped.
pub async fn run_translator(
    mut rx: mpsc::Receiver<Signal>,
    executor: Arc<dyn FollowerExecutor>,
    config: CopyTradingConfig,
    sink: Option<Arc<dyn DecisionSink>>,
    pause_flag: Arc<AtomicBool>,
) {
    let config = config.normalized();
    tracing::info!(
        ratio = %config.follow_ratio,
        min = %config.min_amount,
        max = %config.max_amount,
        "sizing translator started"
    );

    while let Some(signal) = rx.recv().await {
        if pause_flag.load(Ordering::Relaxed) {
            tracing::info!(
                symbol = %signal.symbol,
                action = %signal.action,
                "translator paused, skipping signal"
            );
            continue;
        }

        if let Err(e) = process_signal(&signal, executor.as_ref(), &config, sink.as_deref()).await {
            tracing::error!(
                error = %e,
                symbol = %signal.symbol,
                action = %signal.action,
                "signal translation failed"
            );
        }
    }

    tracing::warn!("signal channel closed, translator shutting down");
}

async fn process_signal(
    signal: &Signal,
    executor: &dyn FollowerExecutor,
    config: &CopyTradingConfig,
    sink: Option<&dyn DecisionSink>,
) -> anyhow::Result<()> {
    let follower_equity = executor.equity().await?;
    if follower_equity <= Decimal::ZERO {
        anyhow::bail!("follower equity invalid");
    }

    let follower_position = if signal.action.increases_exposure() {
        Decimal::ZERO
    } else {
        executor.position_size(&signal.symbol).await?
    };

    let outcome = translate_signal(signal, follower_equity, follower_position, config);

    tracing::info!(
        symbol = %outcome.decision.symbol,
        action = %outcome.decision.action,
        outcome = %outcome.decision.outcome,
        follower_notional = %outcome.decision.follower_notional,
        min_triggered = outcome.decision.min_triggered,
        max_triggered = outcome.decision.max_triggered,
        "sizing decision"
    );
    if let Some(sink) = sink {
        sink.record(&outcome.decision).await;
    }

    match outcome.order {
        Some(request) => {
            metrics::counter!("orders_sized_total").increment(1);
            match executor.execute_order(&request).await {
                Ok(report) => {
                    tracing::info!(
                        symbol = %request.symbol,
                        side = %request.side,
                        filled_notional = %report.filled_notional,
                        order_id = ?report.order_id,
                        "follower order executed"
                    );
                }
                Err(e) => {
                    metrics::counter!("orders_failed_total").increment(1);
                    tracing::error!(
                        error = %e,
                        symbol = %request.symbol,
                        side = %request.side,
                        "follower order failed"
                    );
                }
            }
        }
        None => {
            metrics::counter!("signals_skipped_total").increment(1);
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MarginMode, SignalAction};
    use rust_decimal_macros::dec;

    fn open_signal(notional: Decimal, leverage: u32, leader_equity: Decimal) -> Signal {
        Signal {
            symbol: "BTCUSDT".into(),
            action: SignalAction::OpenLong,
            notional_usd: notional,
            price: dec!(60000),
            leader_equity,
            leader_leverage: leverage,
            margin_mode: Some(MarginMode::Cross),
            timestamp: Utc::now(),
            delta_size: dec!(0.3),
            leader_pos_before: Decimal::ZERO,
            leader_pos_after: dec!(0.3),
        }
    }

    #[test]
    fn test_open_sized_by_margin_share() {
        // leader margin 1800, proportion 0.018, follower 5000 at ratio 100
        // re-levered x10 -> 900
        let signal = open_signal(dec!(18000), 10, dec!(100000));
        let config = CopyTradingConfig {
            min_amount: dec!(10),
            ..CopyTradingConfig::default()
        };

        let outcome = translate_signal(&signal, dec!(5000), Decimal::ZERO, &config);
        let order = outcome.order.expect("order expected");

        assert_eq!(order.notional_usd, dec!(900));
        assert_eq!(order.side, OrderSide::Buy);
        assert!(!order.reduce_only);
        assert_eq!(order.leverage, Some(10));
        assert_eq!(order.margin_mode, Some(MarginMode::Cross));
        assert_eq!(outcome.decision.leader_margin, dec!(1800));
        assert_eq!(outcome.decision.proportion, dec!(0.018));
        assert!(!outcome.decision.min_triggered);
        assert!(!outcome.decision.max_triggered);
    }

    #[test]
    fn test_min_amount_floor() {
        // computed 0.018 * 100 * 10 = 18, raised to the 50 floor
        let signal = open_signal(dec!(18000), 10, dec!(100000));
        let config = CopyTradingConfig {
            min_amount: dec!(50),
            ..CopyTradingConfig::default()
        };

        let outcome = translate_signal(&signal, dec!(100), Decimal::ZERO, &config);
        let order = outcome.order.expect("order expected");

        assert_eq!(order.notional_usd, dec!(50));
        assert!(outcome.decision.min_triggered);
        assert!(!outcome.decision.max_triggered);
    }

    #[test]
    fn test_max_amount_cap() {
        let signal = open_signal(dec!(18000), 10, dec!(100000));
        let config = CopyTradingConfig {
            max_amount: dec!(500),
            ..CopyTradingConfig::default()
        };

        let outcome = translate_signal(&signal, dec!(5000), Decimal::ZERO, &config);
        let order = outcome.order.expect("order expected");

        assert_eq!(order.notional_usd, dec!(500));
        assert!(outcome.decision.max_triggered);
    }

    #[test]
    fn test_follow_ratio_scales_base() {
        let signal = open_signal(dec!(18000), 10, dec!(100000));
        let config = CopyTradingConfig {
            follow_ratio: dec!(50),
            ..CopyTradingConfig::default()
        };

        let outcome = translate_signal(&signal, dec!(5000), Decimal::ZERO, &config);
        assert_eq!(outcome.order.expect("order expected").notional_usd, dec!(450));
    }

    #[test]
    fn test_open_gated_by_flag() {
        let signal = open_signal(dec!(18000), 10, dec!(100000));
        let config = CopyTradingConfig {
            follow_open: false,
            ..CopyTradingConfig::default()
        };

        let outcome = translate_signal(&signal, dec!(5000), Decimal::ZERO, &config);
        assert!(outcome.order.is_none());
        assert_eq!(
            outcome.decision.outcome,
            DecisionOutcome::Skipped(SkipReason::OpenNotFollowed)
        );
    }

    #[test]
    fn test_leverage_floor_and_no_sync() {
        let mut signal = open_signal(dec!(18000), 0, dec!(100000));
        signal.leader_leverage = 0;
        let config = CopyTradingConfig {
            sync_leverage: false,
            sync_margin_mode: false,
            ..CopyTradingConfig::default()
        };

        let outcome = translate_signal(&signal, dec!(5000), Decimal::ZERO, &config);
        let order = outcome.order.expect("order expected");
        // leverage <= 0 is treated as 1 in the margin math
        assert_eq!(outcome.decision.leader_margin, dec!(18000));
        assert_eq!(order.leverage, None);
        assert_eq!(order.margin_mode, None);
    }

    #[test]
    fn test_reduce_proportional_to_follower_position() {
        let signal = Signal {
            symbol: "BTCUSDT".into(),
            action: SignalAction::ReduceLong,
            notional_usd: dec!(24000),
            price: dec!(60000),
            leader_equity: dec!(100000),
            leader_leverage: 10,
            margin_mode: Some(MarginMode::Cross),
            timestamp: Utc::now(),
            delta_size: dec!(-0.4),
            leader_pos_before: dec!(1.0),
            leader_pos_after: dec!(0.6),
        };

        let outcome = translate_signal(
            &signal,
            dec!(5000),
            dec!(0.5),
            &CopyTradingConfig::default(),
        );
        let order = outcome.order.expect("order expected");

        assert_eq!(order.close_fraction, Some(dec!(0.4)));
        assert!(order.reduce_only);
        assert_eq!(order.side, OrderSide::Sell);
        // 0.5 * 0.4 = 0.2 contracts at 60000
        assert_eq!(order.notional_usd, dec!(12000.0));
    }

    #[test]
    fn test_full_close_ignores_magnitude() {
        let signal = Signal {
            symbol: "ETHUSDT".into(),
            action: SignalAction::CloseShort,
            notional_usd: dec!(6000),
            price: dec!(3000),
            leader_equity: dec!(100000),
            leader_leverage: 0,
            margin_mode: None,
            timestamp: Utc::now(),
            delta_size: dec!(2),
            leader_pos_before: dec!(-2),
            leader_pos_after: Decimal::ZERO,
        };

        let outcome = translate_signal(
            &signal,
            dec!(5000),
            dec!(-0.7),
            &CopyTradingConfig::default(),
        );
        let order = outcome.order.expect("order expected");

        assert_eq!(order.close_fraction, Some(Decimal::ONE));
        assert_eq!(order.side, OrderSide::Buy);
        assert_eq!(order.notional_usd, dec!(2100));
    }

    #[test]
    fn test_reduce_without_follower_position_skips() {
        let signal = Signal {
            symbol: "BTCUSDT".into(),
            action: SignalAction::ReduceLong,
            notional_usd: dec!(6000),
            price: dec!(60000),
            leader_equity: dec!(100000),
            leader_leverage: 10,
            margin_mode: None,
            timestamp: Utc::now(),
            delta_size: dec!(-0.1),
            leader_pos_before: dec!(0.5),
            leader_pos_after: dec!(0.4),
        };

        let outcome = translate_signal(
            &signal,
            dec!(5000),
            Decimal::ZERO,
            &CopyTradingConfig::default(),
        );
        assert!(outcome.order.is_none());
        assert_eq!(
            outcome.decision.outcome,
            DecisionOutcome::Skipped(SkipReason::NoFollowerPosition)
        );
    }
}
