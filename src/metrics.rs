/// Pre-register pipeline metrics so they appear before the first
/// increment. Installing an exporter is left to the embedding program;
/// without one the macros are no-ops.
pub fn register_metrics() {
    metrics::counter!("signals_emitted_total").absolute(0);
    metrics::counter!("observer_poll_errors_total").absolute(0);
    metrics::counter!("orders_sized_total").absolute(0);
    metrics::counter!("orders_failed_total").absolute(0);
    metrics::counter!("signals_skipped_total").absolute(0);

    metrics::histogram!("observer_poll_seconds").record(0.0);
}
