use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::core::{LedgerEntry, Month};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryRecord {
    pub id: u64,
    pub amount: f64,
    pub month: Month,
    pub year: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRecord {
    pub id: u64,
    pub amount: f64,
    pub description: String,
    pub month: Month,
    pub year: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsRecord {
    pub id: u64,
    #[serde(flatten)]
    pub entry: LedgerEntry,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistRecord {
    pub id: u64,
    pub ticker: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    pub total_salaries: f64,
    pub total_expenses: f64,
    pub balance: f64,
}

#[derive(Debug, Default)]
struct Tables {
    salaries: Vec<SalaryRecord>,
    expenses: Vec<ExpenseRecord>,
    savings: Vec<SavingsRecord>,
    watchlist: Vec<WatchlistRecord>,
    next_salary_id: u64,
    next_expense_id: u64,
    next_savings_id: u64,
    next_watchlist_id: u64,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_salary(&self, amount: f64, month: Month, year: i32) -> SalaryRecord {
        let mut tables = self.lock();
        tables.next_salary_id += 1;
        let record = SalaryRecord {
            id: tables.next_salary_id,
            amount,
            month,
            year,
        };
        tables.salaries.push(record.clone());
        record
    }

    pub fn salaries(&self) -> Vec<SalaryRecord> {
        let mut records = self.lock().salaries.clone();
        records.reverse();
        records
    }

    pub fn delete_salary(&self, id: u64) -> bool {
        let mut tables = self.lock();
        let before = tables.salaries.len();
        tables.salaries.retain(|record| record.id != id);
        tables.salaries.len() != before
    }

    pub fn add_expense(
        &self,
        amount: f64,
        description: String,
        month: Month,
        year: i32,
    ) -> ExpenseRecord {
        let mut tables = self.lock();
        tables.next_expense_id += 1;
        let record = ExpenseRecord {
            id: tables.next_expense_id,
            amount,
            description,
            month,
            year,
        };
        tables.expenses.push(record.clone());
        record
    }

    pub fn expenses(&self) -> Vec<ExpenseRecord> {
        let mut records = self.lock().expenses.clone();
        records.reverse();
        records
    }

    pub fn delete_expense(&self, id: u64) -> bool {
        let mut tables = self.lock();
        let before = tables.expenses.len();
        tables.expenses.retain(|record| record.id != id);
        tables.expenses.len() != before
    }

    // The whole batch lands under one lock acquisition, so a multi-entry
    // allocation is recorded all-or-nothing.
    pub fn append_entries(&self, entries: Vec<LedgerEntry>) -> Vec<SavingsRecord> {
        let mut tables = self.lock();
        entries
            .into_iter()
            .map(|entry| {
                tables.next_savings_id += 1;
                let record = SavingsRecord {
                    id: tables.next_savings_id,
                    entry,
                };
                tables.savings.push(record.clone());
                record
            })
            .collect()
    }

    pub fn add_savings(&self, entry: LedgerEntry) -> SavingsRecord {
        let mut records = self.append_entries(vec![entry]);
        records.remove(0)
    }

    pub fn savings(&self) -> Vec<SavingsRecord> {
        let mut records = self.lock().savings.clone();
        records.reverse();
        records
    }

    pub fn all_savings_entries(&self) -> Vec<LedgerEntry> {
        self.lock()
            .savings
            .iter()
            .map(|record| record.entry.clone())
            .collect()
    }

    pub fn delete_savings(&self, id: u64) -> bool {
        let mut tables = self.lock();
        let before = tables.savings.len();
        tables.savings.retain(|record| record.id != id);
        tables.savings.len() != before
    }

    pub fn add_watch(&self, ticker: &str) -> Option<WatchlistRecord> {
        let ticker = ticker.to_uppercase();
        let mut tables = self.lock();
        if tables.watchlist.iter().any(|record| record.ticker == ticker) {
            return None;
        }
        tables.next_watchlist_id += 1;
        let record = WatchlistRecord {
            id: tables.next_watchlist_id,
            ticker,
        };
        tables.watchlist.push(record.clone());
        Some(record)
    }

    pub fn watchlist(&self) -> Vec<WatchlistRecord> {
        self.lock().watchlist.clone()
    }

    pub fn delete_watch(&self, id: u64) -> bool {
        let mut tables = self.lock();
        let before = tables.watchlist.len();
        tables.watchlist.retain(|record| record.id != id);
        tables.watchlist.len() != before
    }

    pub fn budget_summary(&self) -> BudgetSummary {
        let tables = self.lock();
        let total_salaries: f64 = tables.salaries.iter().map(|record| record.amount).sum();
        let total_expenses: f64 = tables.expenses.iter().map(|record| record.amount).sum();
        BudgetSummary {
            total_salaries,
            total_expenses,
            balance: total_salaries - total_expenses,
        }
    }
}
