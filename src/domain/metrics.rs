//! Performance summary over a run's total-value curve.

use super::result::{PeriodRecord, ResultSeries};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub final_value: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: i64,
    pub periods: usize,
    pub rebalance_count: usize,
}

impl Metrics {
    pub fn compute(results: &ResultSeries, initial_cash: f64, risk_free_rate: f64) -> Self {
        let records = results.records();

        let final_value = records
            .last()
            .map(|r| r.total_value)
            .unwrap_or(initial_cash);

        let total_return = if initial_cash > 0.0 {
            (final_value - initial_cash) / initial_cash
        } else {
            0.0
        };

        let years = records.len() as f64 / TRADING_DAYS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return.is_finite() && total_return > -1.0
        {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(records);

        let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(records, daily_rf);

        Metrics {
            final_value,
            total_return,
            annualized_return,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
            periods: records.len(),
            rebalance_count: results.rebalance_count(),
        }
    }
}

fn compute_drawdown(records: &[PeriodRecord]) -> (f64, i64) {
    let Some(first) = records.first() else {
        return (0.0, 0);
    };

    let mut peak = first.total_value;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0i64;
    let mut current_dd_duration = 0i64;

    for record in records {
        if record.total_value > peak {
            peak = record.total_value;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - record.total_value) / peak;
            max_dd = max_dd.max(dd);
            if dd > 0.0 {
                current_dd_duration += 1;
                max_dd_duration = max_dd_duration.max(current_dd_duration);
            }
        }
    }

    (max_dd, max_dd_duration)
}

fn compute_risk_adjusted(records: &[PeriodRecord], daily_rf: f64) -> (f64, f64) {
    if records.len() < 2 {
        return (0.0, 0.0);
    }

    let returns: Vec<f64> = records
        .windows(2)
        .map(|w| {
            let prev = w[0].total_value;
            let curr = w[1].total_value;
            if prev > 0.0 { (curr - prev) / prev } else { 0.0 }
        })
        .collect();

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;

    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    let excess_return = mean - daily_rf;

    let sharpe = if stddev > 0.0 {
        (excess_return / stddev) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let downside: f64 = returns
        .iter()
        .filter(|&&r| r < daily_rf)
        .map(|&r| (r - daily_rf).powi(2))
        .sum();
    let downside_stddev = (downside / n).sqrt();

    let sortino = if downside_stddev > 0.0 {
        (excess_return / downside_stddev) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    (sharpe, sortino)
}
