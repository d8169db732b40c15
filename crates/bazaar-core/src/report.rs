//! # Profit Reporting
//!
//! A read-only fold over order summaries, bucketed into four windows.
//!
//! ## Windows
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  All bounds are local midnights in `now`'s timezone, half-open [a, b).  │
//! │                                                                         │
//! │  today       [today 00:00,            ∞)                                │
//! │  last_week   [prev Monday 00:00,      this Monday 00:00)                │
//! │  last_month  [1st of prev month 00:00, 1st of this month 00:00)         │
//! │  all_time    everything                                                 │
//! │                                                                         │
//! │  Windows overlap: an order can count in several at once.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Attribution
//! ```text
//! paid           → realProfit += profit
//! pending        → expectedProfit += profit
//! partiallyPaid  → realProfit += profit × paid/total
//!                  expectedProfit += the rest
//! ```

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Order, OrderStatus};

// =============================================================================
// Input
// =============================================================================

/// The fields of an order the report needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: String,
    pub total: Money,
    pub amount_paid: Money,
    pub profit: Money,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl OrderSummary {
    pub fn status(&self) -> OrderStatus {
        OrderStatus::derive(self.total, self.amount_paid, self.paid_at.is_some())
    }
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.clone(),
            total: order.total,
            amount_paid: order.amount_paid,
            profit: order.profit,
            created_at: order.created_at,
            paid_at: order.paid_at,
        }
    }
}

// =============================================================================
// Output
// =============================================================================

/// Rollup for one window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProfitStats {
    pub real_profit: Money,
    pub expected_profit: Money,
    pub paid_orders_total: Money,
    pub paid_orders_count: i64,
    pub pending_orders_total: Money,
    pub pending_orders_count: i64,
    pub partial_orders_total: Money,
    pub partial_paid_amount: Money,
    pub partial_orders_count: i64,
    pub total_all_orders: i64,
    pub total_all_orders_value: Money,
    pub total_received_amount: Money,
    pub total_pending_amount: Money,
}

impl ProfitStats {
    fn record(&mut self, order: &OrderSummary) {
        match order.status() {
            OrderStatus::Paid => {
                self.real_profit += order.profit;
                self.paid_orders_total += order.total;
                self.paid_orders_count += 1;
            }
            OrderStatus::Pending => {
                self.expected_profit += order.profit;
                self.pending_orders_total += order.total;
                self.pending_orders_count += 1;
            }
            OrderStatus::PartiallyPaid => {
                let realized = order.profit.split_by_ratio(order.amount_paid, order.total);
                self.real_profit += realized;
                self.expected_profit += order.profit - realized;
                self.partial_orders_total += order.total;
                self.partial_paid_amount += order.amount_paid;
                self.partial_orders_count += 1;
            }
        }

        self.total_all_orders =
            self.paid_orders_count + self.pending_orders_count + self.partial_orders_count;
        self.total_all_orders_value =
            self.paid_orders_total + self.pending_orders_total + self.partial_orders_total;
        self.total_received_amount = self.paid_orders_total + self.partial_paid_amount;
        self.total_pending_amount =
            self.pending_orders_total + (self.partial_orders_total - self.partial_paid_amount);
    }
}

/// The four windows of the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProfitReport {
    pub today: ProfitStats,
    pub last_week: ProfitStats,
    pub last_month: ProfitStats,
    pub all_time: ProfitStats,
}

// =============================================================================
// Windows
// =============================================================================

/// Half-open window bounds, converted to UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindows {
    pub today_start: DateTime<Utc>,
    pub last_week_start: DateTime<Utc>,
    pub this_week_start: DateTime<Utc>,
    pub last_month_start: DateTime<Utc>,
    pub this_month_start: DateTime<Utc>,
}

fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    // DST gaps can skip midnight; fall back to reading it as UTC
    tz.from_local_datetime(&midnight)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight))
        .with_timezone(&Utc)
}

impl ReportWindows {
    /// Computes the bounds in `now`'s timezone.
    pub fn at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();

        let this_monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
        let last_monday = this_monday - Duration::days(7);

        let this_month = today.with_day(1).unwrap_or(today);
        let last_month = this_month
            .pred_opt()
            .and_then(|d| d.with_day(1))
            .unwrap_or(this_month);

        Self {
            today_start: local_midnight(&tz, today),
            last_week_start: local_midnight(&tz, last_monday),
            this_week_start: local_midnight(&tz, this_monday),
            last_month_start: local_midnight(&tz, last_month),
            this_month_start: local_midnight(&tz, this_month),
        }
    }

    pub fn in_today(&self, at: DateTime<Utc>) -> bool {
        at >= self.today_start
    }

    pub fn in_last_week(&self, at: DateTime<Utc>) -> bool {
        at >= self.last_week_start && at < self.this_week_start
    }

    pub fn in_last_month(&self, at: DateTime<Utc>) -> bool {
        at >= self.last_month_start && at < self.this_month_start
    }
}

// =============================================================================
// Fold
// =============================================================================

/// Builds the profit report for `now`.
///
/// Orders are bucketed by creation time. Source data is not modified.
///
/// ## Example
/// ```rust
/// use chrono::Utc;
/// use bazaar_core::money::Money;
/// use bazaar_core::report::{profit_report, OrderSummary};
///
/// let now = Utc::now();
/// let orders = vec![OrderSummary {
///     id: "o-1".into(),
///     total: Money::from_cents(10000),
///     amount_paid: Money::from_cents(3000),
///     profit: Money::from_cents(4000),
///     created_at: now,
///     paid_at: None,
/// }];
///
/// let report = profit_report(&orders, &now);
/// assert_eq!(report.today.real_profit.cents(), 1200);
/// assert_eq!(report.today.expected_profit.cents(), 2800);
/// ```
pub fn profit_report<Tz: TimeZone>(orders: &[OrderSummary], now: &DateTime<Tz>) -> ProfitReport {
    let windows = ReportWindows::at(now);
    let mut report = ProfitReport::default();

    for order in orders {
        if windows.in_today(order.created_at) {
            report.today.record(order);
        }
        if windows.in_last_week(order.created_at) {
            report.last_week.record(order);
        }
        if windows.in_last_month(order.created_at) {
            report.last_month.record(order);
        }
        report.all_time.record(order);
    }

    report
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn summary(total: i64, paid: i64, profit: i64, created_at: DateTime<Utc>) -> OrderSummary {
        OrderSummary {
            id: format!("o-{total}-{paid}"),
            total: Money::from_cents(total),
            amount_paid: Money::from_cents(paid),
            profit: Money::from_cents(profit),
            created_at,
            paid_at: (total == paid && paid > 0).then_some(created_at),
        }
    }

    #[test]
    fn test_partial_order_splits_profit_by_paid_ratio() {
        let now = at("2024-05-15T12:00:00Z");
        let report = profit_report(&[summary(10000, 3000, 4000, now)], &now);
        let s = &report.all_time;

        assert_eq!(s.real_profit.cents(), 1200);
        assert_eq!(s.expected_profit.cents(), 2800);
        assert_eq!(s.partial_orders_count, 1);
        assert_eq!(s.partial_paid_amount.cents(), 3000);
        assert_eq!(s.total_received_amount.cents(), 3000);
        assert_eq!(s.total_pending_amount.cents(), 7000);
    }

    #[test]
    fn test_status_buckets_and_derived_totals() {
        let now = at("2024-05-15T12:00:00Z");
        let orders = [
            summary(10000, 10000, 4000, now),
            summary(5000, 0, 1000, now),
            summary(8000, 2000, 2000, now),
        ];
        let s = profit_report(&orders, &now).all_time;

        assert_eq!(s.paid_orders_count, 1);
        assert_eq!(s.pending_orders_count, 1);
        assert_eq!(s.partial_orders_count, 1);
        assert_eq!(s.total_all_orders, 3);
        assert_eq!(s.total_all_orders_value.cents(), 23000);
        assert_eq!(s.real_profit.cents(), 4000 + 500);
        assert_eq!(s.expected_profit.cents(), 1000 + 1500);
        assert_eq!(s.total_received_amount.cents(), 12000);
        assert_eq!(s.total_pending_amount.cents(), 5000 + 6000);
    }

    #[test]
    fn test_zero_total_pending_order_has_no_ratio() {
        let now = at("2024-05-15T12:00:00Z");
        let s = profit_report(&[summary(0, 0, 0, now)], &now).all_time;
        assert_eq!(s.pending_orders_count, 1);
        assert_eq!(s.real_profit, Money::zero());
    }

    #[test]
    fn test_windows_are_half_open_calendar_periods() {
        // Wednesday
        let now = at("2024-05-15T12:00:00Z");
        let w = ReportWindows::at(&now);

        assert_eq!(w.today_start, at("2024-05-15T00:00:00Z"));
        assert_eq!(w.this_week_start, at("2024-05-13T00:00:00Z"));
        assert_eq!(w.last_week_start, at("2024-05-06T00:00:00Z"));
        assert_eq!(w.this_month_start, at("2024-05-01T00:00:00Z"));
        assert_eq!(w.last_month_start, at("2024-04-01T00:00:00Z"));

        assert!(w.in_last_week(at("2024-05-12T23:59:59Z")));
        assert!(!w.in_last_week(at("2024-05-13T00:00:00Z")));
        assert!(w.in_last_month(at("2024-04-30T23:59:59Z")));
        assert!(!w.in_last_month(at("2024-05-01T00:00:00Z")));
    }

    #[test]
    fn test_sunday_belongs_to_the_week_that_started_monday() {
        let now = at("2024-05-19T18:00:00Z");
        let w = ReportWindows::at(&now);
        assert_eq!(w.this_week_start, at("2024-05-13T00:00:00Z"));
        assert_eq!(w.last_week_start, at("2024-05-06T00:00:00Z"));
    }

    #[test]
    fn test_january_rolls_back_to_december() {
        let now = at("2024-01-10T08:00:00Z");
        let w = ReportWindows::at(&now);
        assert_eq!(w.last_month_start, at("2023-12-01T00:00:00Z"));
    }

    #[test]
    fn test_today_uses_local_midnight() {
        let beirut = FixedOffset::east_opt(3 * 3600).unwrap();
        let now = at("2024-05-15T01:00:00Z").with_timezone(&beirut);
        let w = ReportWindows::at(&now);

        // 04:00 local on the 15th, so today starts at 21:00 UTC on the 14th
        assert_eq!(w.today_start, at("2024-05-14T21:00:00Z"));

        let orders = [
            summary(1000, 0, 100, at("2024-05-14T22:00:00Z")),
            summary(1000, 0, 100, at("2024-05-14T20:00:00Z")),
        ];
        let report = profit_report(&orders, &now);
        assert_eq!(report.today.pending_orders_count, 1);
        assert_eq!(report.all_time.pending_orders_count, 2);
    }

    #[test]
    fn test_order_counts_in_overlapping_windows() {
        // First Wednesday of May: last week falls in April
        let now = at("2024-05-01T12:00:00Z");
        let created = at("2024-04-24T09:00:00Z");
        let report = profit_report(&[summary(2000, 2000, 500, created)], &now);

        assert_eq!(report.last_week.paid_orders_count, 1);
        assert_eq!(report.last_month.paid_orders_count, 1);
        assert_eq!(report.all_time.paid_orders_count, 1);
        assert_eq!(report.today.paid_orders_count, 0);
    }
}
