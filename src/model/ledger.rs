// src/model/ledger.rs

use std::collections::VecDeque;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::ConsumptionOrder;

/// Number of trailing days kept for the consumption and stockout windows.
pub const HISTORY_WINDOW_DAYS: usize = 30;

/// One received lot on the shelf. A batch with quantity 0 is removed
/// immediately; it is never observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Batch {
    pub quantity: u32,
    pub arrival_date: NaiveDate,
    pub expiry_date: NaiveDate,
}

/// An order in transit. Converted into a batch exactly once, on arrival day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PendingOrder {
    pub quantity: u32,
    pub order_date: NaiveDate,
    pub arrival_date: NaiveDate,
}

/// What `consume` did with today's demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeOutcome {
    pub used_units: u32,
    pub stockout: bool,
}

/// Owns the on-hand batches and pending orders for one SKU/location, plus
/// the bounded trailing windows the ordering policy reads.
///
/// Mutated exactly once per simulated day, in the fixed phase order
/// consume -> decide-order -> receive -> expire.
#[derive(Debug)]
pub struct BatchLedger {
    consumption_order: ConsumptionOrder,
    batches: Vec<Batch>,
    pending: Vec<PendingOrder>,
    recent_consumption: VecDeque<u32>,
    recent_stockouts: VecDeque<bool>,
}

impl BatchLedger {
    pub fn new(consumption_order: ConsumptionOrder) -> Self {
        Self {
            consumption_order,
            batches: Vec::new(),
            pending: Vec::new(),
            recent_consumption: VecDeque::with_capacity(HISTORY_WINDOW_DAYS),
            recent_stockouts: VecDeque::with_capacity(HISTORY_WINDOW_DAYS),
        }
    }

    /// Seeds initial stock as a single already-on-shelf batch.
    pub fn seed_initial_stock(&mut self, quantity: u32, arrival: NaiveDate, expiry: NaiveDate) {
        if quantity > 0 {
            self.batches.push(Batch {
                quantity,
                arrival_date: arrival,
                expiry_date: expiry,
            });
        }
    }

    pub fn on_hand(&self) -> u32 {
        self.batches.iter().map(|b| b.quantity).sum()
    }

    /// Units on hand in batches that survive past `today`.
    pub fn non_expired(&self, today: NaiveDate) -> u32 {
        self.batches
            .iter()
            .filter(|b| b.expiry_date > today)
            .map(|b| b.quantity)
            .sum()
    }

    pub fn pending_units(&self) -> u32 {
        self.pending.iter().map(|o| o.quantity).sum()
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// Removes up to `demand_units` from batches in the configured priority
    /// order. Under-fulfilment is the defined behavior, not an error: the
    /// shortfall is flagged as a stockout and the day moves on.
    pub fn consume(&mut self, demand_units: u32) -> ConsumeOutcome {
        match self.consumption_order {
            // FIFO: arrival order. Batches are already kept in arrival order.
            ConsumptionOrder::Fifo => {}
            // FEFO: earliest expiry first. Stable sort keeps arrival order
            // as the tie-break between equal expiries.
            ConsumptionOrder::Fefo => self.batches.sort_by_key(|b| b.expiry_date),
        }

        let mut remaining = demand_units;
        for batch in &mut self.batches {
            if remaining == 0 {
                break;
            }
            let taken = remaining.min(batch.quantity);
            batch.quantity -= taken;
            remaining -= taken;
        }
        self.batches.retain(|b| b.quantity > 0);

        let used_units = demand_units - remaining;
        let stockout = remaining > 0;
        self.push_window(used_units, stockout);
        ConsumeOutcome {
            used_units,
            stockout,
        }
    }

    /// Converts every pending order due on or before `today` into a fresh
    /// batch expiring `effective_shelf_life_days` after arrival. Returns the
    /// total received quantity.
    pub fn receive_due_orders(&mut self, today: NaiveDate, effective_shelf_life_days: u32) -> u32 {
        let mut received = 0;
        let mut still_pending = Vec::with_capacity(self.pending.len());
        for order in self.pending.drain(..) {
            if order.arrival_date <= today {
                received += order.quantity;
                self.batches.push(Batch {
                    quantity: order.quantity,
                    arrival_date: today,
                    expiry_date: today + chrono::Days::new(u64::from(effective_shelf_life_days)),
                });
            } else {
                still_pending.push(order);
            }
        }
        self.pending = still_pending;
        received
    }

    /// Removes every batch whose expiry date has been reached, returning the
    /// expired quantity. Runs after `consume` so same-day usage is credited
    /// before a same-day expiry.
    pub fn expire(&mut self, today: NaiveDate) -> u32 {
        let mut expired = 0;
        self.batches.retain(|b| {
            if b.expiry_date <= today {
                expired += b.quantity;
                false
            } else {
                true
            }
        });
        expired
    }

    pub fn place_order(&mut self, order: PendingOrder) {
        debug_assert!(order.quantity > 0);
        debug_assert!(order.arrival_date >= order.order_date);
        self.pending.push(order);
    }

    fn push_window(&mut self, used: u32, stockout: bool) {
        if self.recent_consumption.len() == HISTORY_WINDOW_DAYS {
            self.recent_consumption.pop_front();
        }
        self.recent_consumption.push_back(used);
        if self.recent_stockouts.len() == HISTORY_WINDOW_DAYS {
            self.recent_stockouts.pop_front();
        }
        self.recent_stockouts.push_back(stockout);
    }

    /// Mean daily usage over the trailing window (or the last `days` of it).
    pub fn recent_avg_daily_usage(&self, days: usize) -> f64 {
        let n = days.min(self.recent_consumption.len());
        if n == 0 {
            return 0.0;
        }
        let total: u32 = self.recent_consumption.iter().rev().take(n).sum();
        f64::from(total) / n as f64
    }

    /// High percentile of trailing daily usage, for reorder-point sizing.
    pub fn recent_usage_percentile(&self, pct: f64) -> f64 {
        if self.recent_consumption.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<u32> = self.recent_consumption.iter().copied().collect();
        sorted.sort_unstable();
        let rank = (pct.clamp(0.0, 1.0) * (sorted.len() - 1) as f64).round() as usize;
        f64::from(sorted[rank])
    }

    /// Fraction of trailing days flagged as stockouts.
    pub fn trailing_stockout_rate(&self) -> f64 {
        if self.recent_stockouts.is_empty() {
            return 0.0;
        }
        let hits = self.recent_stockouts.iter().filter(|&&s| s).count();
        hits as f64 / self.recent_stockouts.len() as f64
    }

    pub fn stockout_window_len(&self) -> usize {
        self.recent_stockouts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + chrono::Days::new(u64::from(n))
    }

    fn ledger_with_batches(order: ConsumptionOrder, batches: &[(u32, u32, u32)]) -> BatchLedger {
        let mut ledger = BatchLedger::new(order);
        for &(qty, arrived, expires) in batches {
            ledger.batches.push(Batch {
                quantity: qty,
                arrival_date: day(arrived),
                expiry_date: day(expires),
            });
        }
        ledger
    }

    #[test]
    fn fefo_exhausts_earliest_expiry_first() {
        // Batch 1 expires before batch 2 but arrived later.
        let mut ledger =
            ledger_with_batches(ConsumptionOrder::Fefo, &[(7, 0, 40), (5, 2, 10)]);
        let outcome = ledger.consume(5 + 3);
        assert_eq!(outcome.used_units, 8);
        assert!(!outcome.stockout);
        // Earliest expiry (q=5) fully gone, exactly 3 drawn from the other.
        assert_eq!(ledger.batches().len(), 1);
        assert_eq!(ledger.batches()[0].quantity, 4);
        assert_eq!(ledger.batches()[0].expiry_date, day(40));
    }

    #[test]
    fn fifo_follows_arrival_order_regardless_of_expiry() {
        let mut ledger =
            ledger_with_batches(ConsumptionOrder::Fifo, &[(7, 0, 40), (5, 2, 10)]);
        ledger.consume(8);
        // Oldest arrival (q=7) fully gone even though it expires later.
        assert_eq!(ledger.batches().len(), 1);
        assert_eq!(ledger.batches()[0].quantity, 4);
        assert_eq!(ledger.batches()[0].expiry_date, day(10));
    }

    #[test]
    fn shortfall_is_a_stockout_not_an_error() {
        let mut ledger = ledger_with_batches(ConsumptionOrder::Fifo, &[(3, 0, 40)]);
        let outcome = ledger.consume(10);
        assert_eq!(outcome.used_units, 3);
        assert!(outcome.stockout);
        assert_eq!(ledger.on_hand(), 0);
    }

    #[test]
    fn batch_expiring_today_can_still_be_consumed_today() {
        // Tie-break: consume runs before expire within the day.
        let mut ledger = ledger_with_batches(ConsumptionOrder::Fefo, &[(10, 0, 5)]);
        let outcome = ledger.consume(4);
        assert_eq!(outcome.used_units, 4);
        let expired = ledger.expire(day(5));
        assert_eq!(expired, 6);
        assert_eq!(ledger.on_hand(), 0);
    }

    #[test]
    fn expire_removes_all_batches_at_or_past_expiry() {
        let mut ledger =
            ledger_with_batches(ConsumptionOrder::Fifo, &[(4, 0, 3), (6, 0, 5), (9, 0, 8)]);
        assert_eq!(ledger.expire(day(5)), 10);
        assert_eq!(ledger.on_hand(), 9);
        assert_eq!(ledger.non_expired(day(5)), 9);
    }

    #[test]
    fn receive_converts_due_orders_with_derived_expiry() {
        let mut ledger = BatchLedger::new(ConsumptionOrder::Fifo);
        ledger.place_order(PendingOrder {
            quantity: 20,
            order_date: day(0),
            arrival_date: day(3),
        });
        ledger.place_order(PendingOrder {
            quantity: 15,
            order_date: day(0),
            arrival_date: day(9),
        });
        assert_eq!(ledger.receive_due_orders(day(2), 30), 0);
        assert_eq!(ledger.receive_due_orders(day(3), 30), 20);
        assert_eq!(ledger.pending_units(), 15);
        assert_eq!(ledger.batches()[0].expiry_date, day(33));
    }

    #[test]
    fn trailing_windows_are_bounded() {
        let mut ledger = ledger_with_batches(ConsumptionOrder::Fifo, &[(100_000, 0, 9999)]);
        for _ in 0..100 {
            ledger.consume(5);
        }
        assert_eq!(ledger.stockout_window_len(), HISTORY_WINDOW_DAYS);
        assert!((ledger.recent_avg_daily_usage(7) - 5.0).abs() < f64::EPSILON);
        assert_eq!(ledger.trailing_stockout_rate(), 0.0);
    }

    #[test]
    fn usage_percentile_reads_the_sorted_window() {
        let mut ledger = ledger_with_batches(ConsumptionOrder::Fifo, &[(100_000, 0, 9999)]);
        for d in 1..=20u32 {
            ledger.consume(d);
        }
        assert_eq!(ledger.recent_usage_percentile(1.0), 20.0);
        assert!(ledger.recent_usage_percentile(0.5) >= 10.0);
    }
}
