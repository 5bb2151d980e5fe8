use chrono::Datelike;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum SavingsCategory {
    #[serde(rename = "ETFs")]
    Etf,
    #[serde(rename = "Stocks")]
    Stock,
    #[serde(rename = "Savings Account")]
    SavingsAccount,
}

impl SavingsCategory {
    pub const ALL: [SavingsCategory; 3] = [
        SavingsCategory::Etf,
        SavingsCategory::Stock,
        SavingsCategory::SavingsAccount,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SavingsCategory::Etf => "ETFs",
            SavingsCategory::Stock => "Stocks",
            SavingsCategory::SavingsAccount => "Savings Account",
        }
    }

    pub fn from_label(label: &str) -> Option<SavingsCategory> {
        SavingsCategory::ALL
            .into_iter()
            .find(|category| category.label() == label)
    }

    pub fn is_investment(self) -> bool {
        !matches!(self, SavingsCategory::SavingsAccount)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unrecognized month name: {0:?}")]
pub struct MonthParseError(pub String);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    pub fn from_name(name: &str) -> Result<Month, MonthParseError> {
        Month::ALL
            .into_iter()
            .find(|month| month.name() == name)
            .ok_or_else(|| MonthParseError(name.to_string()))
    }

    pub fn from_index(index: u32) -> Option<Month> {
        Month::ALL.get(index.checked_sub(1)? as usize).copied()
    }

    pub fn index(self) -> u32 {
        self as u32 + 1
    }

    pub fn name(self) -> &'static str {
        match self {
            Month::January => "January",
            Month::February => "February",
            Month::March => "March",
            Month::April => "April",
            Month::May => "May",
            Month::June => "June",
            Month::July => "July",
            Month::August => "August",
            Month::September => "September",
            Month::October => "October",
            Month::November => "November",
            Month::December => "December",
        }
    }

    pub fn abbrev(self) -> &'static str {
        &self.name()[..3]
    }
}

// Comparable (year, month) bucket; field order makes the derived ordering
// chronological rather than lexicographic on month names.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MonthStamp {
    pub year: i32,
    pub month: Month,
}

impl MonthStamp {
    pub fn new(year: i32, month: Month) -> MonthStamp {
        MonthStamp { year, month }
    }

    pub fn current() -> MonthStamp {
        let now = chrono::Local::now();
        MonthStamp {
            year: now.year(),
            month: Month::from_index(now.month()).unwrap_or(Month::January),
        }
    }

    pub fn next(self) -> MonthStamp {
        match self.month {
            Month::December => MonthStamp {
                year: self.year + 1,
                month: Month::January,
            },
            _ => MonthStamp {
                year: self.year,
                month: Month::from_index(self.month.index() + 1).unwrap_or(Month::January),
            },
        }
    }

    pub fn label(self) -> String {
        format!("{} {}", self.month.abbrev(), self.year)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub amount: f64,
    pub category: SavingsCategory,
    pub month: Month,
    pub year: i32,
    #[serde(default)]
    pub description: String,
}

impl LedgerEntry {
    pub fn stamp(&self) -> MonthStamp {
        MonthStamp::new(self.year, self.month)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryShares {
    pub etf: f64,
    pub stock: f64,
    pub savings_account: f64,
}

impl CategoryShares {
    pub fn new(etf: f64, stock: f64, savings_account: f64) -> CategoryShares {
        CategoryShares {
            etf,
            stock,
            savings_account,
        }
    }

    pub fn get(&self, category: SavingsCategory) -> f64 {
        match category {
            SavingsCategory::Etf => self.etf,
            SavingsCategory::Stock => self.stock,
            SavingsCategory::SavingsAccount => self.savings_account,
        }
    }

    pub fn set(&mut self, category: SavingsCategory, value: f64) {
        match category {
            SavingsCategory::Etf => self.etf = value,
            SavingsCategory::Stock => self.stock = value,
            SavingsCategory::SavingsAccount => self.savings_account = value,
        }
    }

    pub fn sum(&self) -> f64 {
        self.etf + self.stock + self.savings_account
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum BookingTarget {
    Single {
        month: Month,
        year: i32,
    },
    Spread {
        start_month: Month,
        start_year: i32,
        months: u32,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct AllocationRequest {
    pub contribution_amount: f64,
    pub shares: CategoryShares,
    pub target: BookingTarget,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GrowthAssumptions {
    pub etf_rates: Vec<f64>,
    pub stock_rates: Vec<f64>,
    pub savings_account_rate: f64,
}

impl GrowthAssumptions {
    // Savings Account grows at the single conservative rate, never the
    // per-rate fan of the investment categories.
    pub fn investment_rates(&self, category: SavingsCategory) -> &[f64] {
        match category {
            SavingsCategory::Etf => &self.etf_rates,
            SavingsCategory::Stock => &self.stock_rates,
            SavingsCategory::SavingsAccount => &[],
        }
    }
}

impl Default for GrowthAssumptions {
    fn default() -> GrowthAssumptions {
        GrowthAssumptions {
            etf_rates: vec![0.05, 0.07, 0.10],
            stock_rates: vec![0.05, 0.07, 0.10],
            savings_account_rate: 0.01,
        }
    }
}

pub const DEFAULT_HORIZON_MONTHS: u32 = 240;

#[derive(Clone, Debug)]
pub struct ProjectionRequest<'a> {
    pub ledger: &'a [LedgerEntry],
    pub as_of: MonthStamp,
    pub horizon_months: u32,
    pub assumptions: GrowthAssumptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub label: String,
    pub data: Vec<Option<f64>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartSeries>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanError {
    #[error("contribution amount must be a positive number")]
    MissingOrInvalidAmount,
    #[error("a percentage is required for every savings category")]
    MissingPercentages,
    #[error("category percentages must sum to 100, got {sum}")]
    PercentageSumMismatch { sum: f64 },
    #[error("month must be one of the twelve calendar month names")]
    InvalidMonth,
    #[error("year is required")]
    MissingYear,
    #[error("month count must be between 1 and 12, got {0}")]
    InvalidMonthCount(u32),
    #[error("no ledger entries to create: every percentage is zero")]
    NoEntriesToCreate,
}

impl From<MonthParseError> for PlanError {
    fn from(_: MonthParseError) -> PlanError {
        PlanError::InvalidMonth
    }
}
