use super::types::{
    AllocationRequest, BookingTarget, CategoryShares, LedgerEntry, MonthStamp, PlanError,
    SavingsCategory,
};

pub const PERCENT_SUM_TOLERANCE: f64 = 0.01;

// Rebalances the three linked percentages after one of them changes, keeping
// the total at exactly 100. The two untouched categories split the remainder
// in proportion to their prior values; the second of them (in canonical
// category order) absorbs any rounding drift.
pub fn normalize_percentages(
    current: CategoryShares,
    changed: SavingsCategory,
    new_value: f64,
) -> CategoryShares {
    let new_value = new_value.clamp(0.0, 100.0);
    let remaining = 100.0 - new_value;

    let mut others = SavingsCategory::ALL
        .into_iter()
        .filter(|category| *category != changed);
    let first = others.next().unwrap_or(SavingsCategory::Etf);
    let second = others.next().unwrap_or(SavingsCategory::Stock);

    let prior_sum = current.get(first) + current.get(second);
    let first_value = if prior_sum > 0.0 {
        (remaining * current.get(first) / prior_sum).round()
    } else {
        (remaining / 2.0).floor()
    };

    let mut updated = current;
    updated.set(changed, new_value);
    updated.set(first, first_value);
    updated.set(second, remaining - first_value);
    updated
}

pub fn plan(request: &AllocationRequest) -> Result<Vec<LedgerEntry>, PlanError> {
    if !request.contribution_amount.is_finite() || request.contribution_amount <= 0.0 {
        return Err(PlanError::MissingOrInvalidAmount);
    }

    let shares = request.shares;
    let sum = shares.sum();
    let any_negative = SavingsCategory::ALL
        .into_iter()
        .any(|category| !shares.get(category).is_finite() || shares.get(category) < 0.0);
    if any_negative || (sum - 100.0).abs() > PERCENT_SUM_TOLERANCE {
        return Err(PlanError::PercentageSumMismatch { sum });
    }

    let (start, months) = match request.target {
        BookingTarget::Single { month, year } => (MonthStamp::new(year, month), 1),
        BookingTarget::Spread {
            start_month,
            start_year,
            months,
        } => {
            if !(1..=12).contains(&months) {
                return Err(PlanError::InvalidMonthCount(months));
            }
            (MonthStamp::new(start_year, start_month), months)
        }
    };

    let monthly_amount = request.contribution_amount / f64::from(months);
    let description = request.description.clone().unwrap_or_default();

    let mut entries = Vec::new();
    let mut stamp = start;
    for _ in 0..months {
        for category in SavingsCategory::ALL {
            let percentage = shares.get(category);
            if percentage > 0.0 {
                entries.push(LedgerEntry {
                    amount: monthly_amount * percentage / 100.0,
                    category,
                    month: stamp.month,
                    year: stamp.year,
                    description: description.clone(),
                });
            }
        }
        stamp = stamp.next();
    }

    if entries.is_empty() {
        return Err(PlanError::NoEntriesToCreate);
    }

    Ok(entries)
}
