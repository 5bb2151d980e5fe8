use std::collections::BTreeMap;

use super::types::{
    ChartData, ChartSeries, LedgerEntry, MonthStamp, ProjectionRequest, SavingsCategory,
};

fn category_index(category: SavingsCategory) -> usize {
    match category {
        SavingsCategory::Etf => 0,
        SavingsCategory::Stock => 1,
        SavingsCategory::SavingsAccount => 2,
    }
}

fn monthly_rate(annual_rate: f64) -> f64 {
    (1.0 + annual_rate).powf(1.0 / 12.0) - 1.0
}

fn format_rate(annual_rate: f64) -> String {
    let percent = annual_rate * 100.0;
    if (percent - percent.round()).abs() < 1e-9 {
        format!("{}", percent.round() as i64)
    } else {
        format!("{percent}")
    }
}

struct HistoricalLedger {
    axis: Vec<MonthStamp>,
    cumulative: [Vec<f64>; 3],
    balances: [f64; 3],
    seen: [bool; 3],
}

fn accumulate(ledger: &[LedgerEntry]) -> HistoricalLedger {
    let mut totals: BTreeMap<MonthStamp, [f64; 3]> = BTreeMap::new();
    let mut seen = [false; 3];
    for entry in ledger {
        let idx = category_index(entry.category);
        totals.entry(entry.stamp()).or_insert([0.0; 3])[idx] += entry.amount;
        seen[idx] = true;
    }

    let axis: Vec<MonthStamp> = totals.keys().copied().collect();
    let mut cumulative: [Vec<f64>; 3] = Default::default();
    let mut balances = [0.0; 3];
    for bucket in totals.values() {
        for idx in 0..3 {
            balances[idx] += bucket[idx];
            cumulative[idx].push(balances[idx]);
        }
    }

    HistoricalLedger {
        axis,
        cumulative,
        balances,
        seen,
    }
}

fn compound_forward(balance: f64, annual_rate: f64, horizon_months: u32) -> Vec<f64> {
    let growth = 1.0 + monthly_rate(annual_rate);
    let mut value = balance;
    (0..horizon_months)
        .map(|_| {
            value *= growth;
            value.round()
        })
        .collect()
}

pub fn project(request: &ProjectionRequest) -> ChartData {
    let history = accumulate(request.ledger);
    if history.axis.is_empty() {
        return ChartData::default();
    }

    let history_len = history.axis.len();
    let horizon = request.horizon_months as usize;

    // The ledger may hold entries booked past as_of; the future axis always
    // starts after the last represented month so the two never overlap.
    let last_history = history.axis[history_len - 1];
    let mut stamp = last_history.max(request.as_of).next();
    let mut future = Vec::with_capacity(horizon);
    for _ in 0..horizon {
        future.push(stamp);
        stamp = stamp.next();
    }

    let labels = history
        .axis
        .iter()
        .chain(future.iter())
        .map(|stamp| stamp.label())
        .collect();

    let mut datasets = Vec::new();
    for category in SavingsCategory::ALL {
        let idx = category_index(category);
        if !history.seen[idx] {
            continue;
        }

        let historical: Vec<Option<f64>> = history.cumulative[idx].iter().copied().map(Some).collect();
        let balance = history.balances[idx];

        if category.is_investment() {
            let mut data = historical;
            data.resize(history_len + horizon, None);
            datasets.push(ChartSeries {
                label: category.label().to_string(),
                data,
            });

            if balance > 0.0 {
                for &rate in request.assumptions.investment_rates(category) {
                    let mut data = vec![None; history_len];
                    data.extend(
                        compound_forward(balance, rate, request.horizon_months)
                            .into_iter()
                            .map(Some),
                    );
                    datasets.push(ChartSeries {
                        label: format!("{} ({}% projected)", category.label(), format_rate(rate)),
                        data,
                    });
                }
            }
        } else {
            // Savings Account draws one continuous line across the join.
            let mut data = historical;
            if balance > 0.0 {
                data.extend(
                    compound_forward(
                        balance,
                        request.assumptions.savings_account_rate,
                        request.horizon_months,
                    )
                    .into_iter()
                    .map(Some),
                );
            } else {
                data.resize(history_len + horizon, None);
            }
            datasets.push(ChartSeries {
                label: category.label().to_string(),
                data,
            });
        }
    }

    ChartData { labels, datasets }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{GrowthAssumptions, Month};
    use proptest::prelude::{prop_assert, proptest};

    fn entry(amount: f64, category: SavingsCategory, month: Month, year: i32) -> LedgerEntry {
        LedgerEntry {
            amount,
            category,
            month,
            year,
            description: String::new(),
        }
    }

    fn request<'a>(
        ledger: &'a [LedgerEntry],
        as_of: MonthStamp,
        horizon_months: u32,
        assumptions: GrowthAssumptions,
    ) -> ProjectionRequest<'a> {
        ProjectionRequest {
            ledger,
            as_of,
            horizon_months,
            assumptions,
        }
    }

    fn find<'a>(chart: &'a ChartData, label: &str) -> &'a ChartSeries {
        chart
            .datasets
            .iter()
            .find(|series| series.label == label)
            .unwrap_or_else(|| panic!("missing series {label:?}"))
    }

    #[test]
    fn empty_ledger_yields_empty_chart() {
        let chart = project(&request(
            &[],
            MonthStamp::new(2024, Month::January),
            240,
            GrowthAssumptions::default(),
        ));
        assert_eq!(chart, ChartData::default());
    }

    #[test]
    fn buckets_sort_by_year_then_month_not_by_name() {
        let ledger = vec![
            entry(100.0, SavingsCategory::Etf, Month::April, 2024),
            entry(100.0, SavingsCategory::Etf, Month::December, 2023),
            entry(100.0, SavingsCategory::Etf, Month::January, 2024),
        ];
        let chart = project(&request(
            &ledger,
            MonthStamp::new(2024, Month::April),
            0,
            GrowthAssumptions::default(),
        ));
        assert_eq!(chart.labels, vec!["Dec 2023", "Jan 2024", "Apr 2024"]);
        assert_eq!(
            find(&chart, "ETFs").data,
            vec![Some(100.0), Some(200.0), Some(300.0)]
        );
    }

    #[test]
    fn cumulative_series_carries_forward_on_quiet_months() {
        let ledger = vec![
            entry(1000.0, SavingsCategory::Etf, Month::January, 2024),
            entry(500.0, SavingsCategory::Stock, Month::February, 2024),
            entry(250.0, SavingsCategory::Etf, Month::March, 2024),
        ];
        let chart = project(&request(
            &ledger,
            MonthStamp::new(2024, Month::March),
            0,
            GrowthAssumptions::default(),
        ));
        assert_eq!(
            find(&chart, "ETFs").data,
            vec![Some(1000.0), Some(1000.0), Some(1250.0)]
        );
        assert_eq!(
            find(&chart, "Stocks").data,
            vec![Some(0.0), Some(500.0), Some(500.0)]
        );
    }

    #[test]
    fn one_year_of_monthly_compounding_reproduces_the_annual_rate() {
        let ledger = vec![entry(1000.0, SavingsCategory::Etf, Month::January, 2024)];
        let chart = project(&request(
            &ledger,
            MonthStamp::new(2024, Month::January),
            12,
            GrowthAssumptions {
                etf_rates: vec![0.10],
                stock_rates: vec![0.10],
                savings_account_rate: 0.01,
            },
        ));

        assert_eq!(chart.labels.len(), 13);
        assert_eq!(chart.labels[0], "Jan 2024");
        assert_eq!(chart.labels[1], "Feb 2024");
        assert_eq!(chart.labels[12], "Jan 2025");

        let historical = find(&chart, "ETFs");
        assert_eq!(historical.data[0], Some(1000.0));
        assert!(historical.data[1..].iter().all(Option::is_none));

        let projected = find(&chart, "ETFs (10% projected)");
        assert_eq!(projected.data[0], None);
        let month_12 = projected.data[12].unwrap();
        assert!((month_12 - 1100.0).abs() <= 1.0, "got {month_12}");
    }

    #[test]
    fn emits_one_projection_series_per_configured_rate() {
        let ledger = vec![
            entry(1000.0, SavingsCategory::Etf, Month::January, 2024),
            entry(400.0, SavingsCategory::Stock, Month::January, 2024),
        ];
        let chart = project(&request(
            &ledger,
            MonthStamp::new(2024, Month::January),
            6,
            GrowthAssumptions::default(),
        ));

        let labels: Vec<&str> = chart.datasets.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "ETFs",
                "ETFs (5% projected)",
                "ETFs (7% projected)",
                "ETFs (10% projected)",
                "Stocks",
                "Stocks (5% projected)",
                "Stocks (7% projected)",
                "Stocks (10% projected)",
            ]
        );
        for series in &chart.datasets {
            assert_eq!(series.data.len(), chart.labels.len());
        }
    }

    #[test]
    fn investment_categories_use_their_own_rate_sets() {
        let ledger = vec![
            entry(1000.0, SavingsCategory::Etf, Month::January, 2024),
            entry(1000.0, SavingsCategory::Stock, Month::January, 2024),
        ];
        let chart = project(&request(
            &ledger,
            MonthStamp::new(2024, Month::January),
            6,
            GrowthAssumptions {
                etf_rates: vec![0.05, 0.07],
                stock_rates: vec![0.10],
                savings_account_rate: 0.01,
            },
        ));

        let labels: Vec<&str> = chart.datasets.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "ETFs",
                "ETFs (5% projected)",
                "ETFs (7% projected)",
                "Stocks",
                "Stocks (10% projected)",
            ]
        );
    }

    #[test]
    fn zero_balance_investment_categories_produce_no_projection() {
        let ledger = vec![
            entry(0.0, SavingsCategory::Stock, Month::January, 2024),
            entry(200.0, SavingsCategory::SavingsAccount, Month::January, 2024),
        ];
        let chart = project(&request(
            &ledger,
            MonthStamp::new(2024, Month::January),
            6,
            GrowthAssumptions::default(),
        ));

        let labels: Vec<&str> = chart.datasets.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Stocks", "Savings Account"]);
        // flat-zero history is kept, but no projection line is drawn for it
        assert_eq!(find(&chart, "Stocks").data[0], Some(0.0));
        assert!(find(&chart, "Stocks").data[1..].iter().all(Option::is_none));
    }

    #[test]
    fn savings_account_line_is_continuous_across_the_join() {
        let ledger = vec![entry(
            500.0,
            SavingsCategory::SavingsAccount,
            Month::March,
            2024,
        )];
        let chart = project(&request(
            &ledger,
            MonthStamp::new(2024, Month::March),
            3,
            GrowthAssumptions::default(),
        ));

        assert_eq!(chart.datasets.len(), 1);
        let series = find(&chart, "Savings Account");
        assert_eq!(series.data.len(), 4);
        assert!(series.data.iter().all(Option::is_some));
        assert_eq!(series.data[0], Some(500.0));
        // 500 * 1.01^(1/12) = 500.41 rounds back down
        assert_eq!(series.data[1], Some(500.0));
        // 500 * 1.01^(3/12) = 501.25
        assert_eq!(series.data[3], Some(501.0));
    }

    #[test]
    fn projection_starts_the_month_after_as_of() {
        let ledger = vec![entry(100.0, SavingsCategory::Etf, Month::January, 2024)];
        let chart = project(&request(
            &ledger,
            MonthStamp::new(2024, Month::June),
            2,
            GrowthAssumptions {
                etf_rates: vec![0.05],
                stock_rates: vec![0.05],
                savings_account_rate: 0.01,
            },
        ));
        assert_eq!(chart.labels, vec!["Jan 2024", "Jul 2024", "Aug 2024"]);
    }

    #[test]
    fn future_axis_starts_after_entries_booked_past_as_of() {
        let ledger = vec![entry(100.0, SavingsCategory::Etf, Month::December, 2024)];
        let chart = project(&request(
            &ledger,
            MonthStamp::new(2024, Month::January),
            2,
            GrowthAssumptions {
                etf_rates: vec![0.05],
                stock_rates: vec![0.05],
                savings_account_rate: 0.01,
            },
        ));
        assert_eq!(chart.labels, vec!["Dec 2024", "Jan 2025", "Feb 2025"]);
    }

    #[test]
    fn projected_values_are_rounded_to_whole_units() {
        let ledger = vec![entry(1000.0, SavingsCategory::Etf, Month::January, 2024)];
        let chart = project(&request(
            &ledger,
            MonthStamp::new(2024, Month::January),
            24,
            GrowthAssumptions {
                etf_rates: vec![0.07],
                stock_rates: vec![0.07],
                savings_account_rate: 0.01,
            },
        ));
        let projected = find(&chart, "ETFs (7% projected)");
        for value in projected.data.iter().flatten() {
            assert_eq!(value.fract(), 0.0);
        }
    }

    #[test]
    fn monthly_rate_compounds_to_the_annual_rate() {
        for annual in [0.01, 0.05, 0.07, 0.10] {
            let compounded = (1.0 + monthly_rate(annual)).powi(12) - 1.0;
            assert!((compounded - annual).abs() < 1e-12);
        }
    }

    proptest! {
        #[test]
        fn historical_series_are_non_decreasing(
            amounts in proptest::collection::vec(0.0f64..10_000.0, 1..40),
        ) {
            let ledger: Vec<LedgerEntry> = amounts
                .iter()
                .enumerate()
                .map(|(i, &amount)| {
                    let category = SavingsCategory::ALL[i % 3];
                    let month = Month::ALL[(i * 5) % 12];
                    let year = 2020 + (i % 4) as i32;
                    entry(amount, category, month, year)
                })
                .collect();
            let chart = project(&request(
                &ledger,
                MonthStamp::new(2030, Month::January),
                0,
                GrowthAssumptions::default(),
            ));
            for series in &chart.datasets {
                let values: Vec<f64> = series.data.iter().flatten().copied().collect();
                prop_assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));
            }
        }

        #[test]
        fn twelve_projected_months_match_the_annual_rate(
            balance in 1.0f64..1_000_000.0,
            rate_percent in 1u32..=20,
        ) {
            let rate = f64::from(rate_percent) / 100.0;
            let ledger = vec![entry(balance, SavingsCategory::Stock, Month::January, 2024)];
            let chart = project(&request(
                &ledger,
                MonthStamp::new(2024, Month::January),
                12,
                GrowthAssumptions {
                    etf_rates: vec![rate],
                    stock_rates: vec![rate],
                    savings_account_rate: 0.01,
                },
            ));
            let label = format!("Stocks ({}% projected)", rate_percent);
            let series = chart
                .datasets
                .iter()
                .find(|s| s.label == label)
                .expect("projection series");
            let month_12 = series.data[12].expect("value at month 12");
            prop_assert!((month_12 - balance * (1.0 + rate)).abs() <= 1.0);
        }
    }
}
