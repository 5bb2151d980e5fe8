use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::info;

use crate::core::{
    AllocationRequest, BookingTarget, CategoryShares, DEFAULT_HORIZON_MONTHS, GrowthAssumptions,
    LedgerEntry, Month, MonthStamp, PERCENT_SUM_TOLERANCE, PlanError, ProjectionRequest,
    SavingsCategory, plan, project,
};
use crate::quotes::{AlphaVantage, QuoteError, QuoteService};
use crate::store::MemoryStore;

#[derive(Clone)]
struct AppState {
    store: Arc<MemoryStore>,
    quotes: Option<Arc<QuoteService<AlphaVantage>>>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: &'static str,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn quote_error_response(err: QuoteError) -> Response {
    let status = match err {
        QuoteError::InvalidTicker => StatusCode::NOT_FOUND,
        QuoteError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        QuoteError::RequestFailed => StatusCode::BAD_GATEWAY,
    };
    error_response(status, &err.to_string())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SalaryPayload {
    amount: Option<f64>,
    month: Option<String>,
    year: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ExpensePayload {
    amount: Option<f64>,
    description: Option<String>,
    month: Option<String>,
    year: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SavingsPayload {
    amount: Option<f64>,
    description: Option<String>,
    category: Option<String>,
    month: Option<String>,
    year: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AllocatePayload {
    amount: Option<f64>,
    percentages: Option<HashMap<SavingsCategory, f64>>,
    month: Option<String>,
    year: Option<i32>,
    start_month: Option<String>,
    start_year: Option<i32>,
    month_count: Option<u32>,
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectionQuery {
    horizon_months: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WatchPayload {
    ticker: Option<String>,
}

fn build_allocation_request(payload: AllocatePayload) -> Result<AllocationRequest, PlanError> {
    let contribution_amount = payload.amount.ok_or(PlanError::MissingOrInvalidAmount)?;
    let percentages = payload.percentages.ok_or(PlanError::MissingPercentages)?;

    let mut shares = CategoryShares::default();
    for category in SavingsCategory::ALL {
        let value = *percentages
            .get(&category)
            .ok_or(PlanError::MissingPercentages)?;
        shares.set(category, value);
    }

    // Same order the planner reports in: the sum mismatch wins over a bad
    // month so the caller sees one consistent message either way.
    let sum = shares.sum();
    if (sum - 100.0).abs() > PERCENT_SUM_TOLERANCE {
        return Err(PlanError::PercentageSumMismatch { sum });
    }

    let target = if let Some(months) = payload.month_count {
        let name = payload.start_month.ok_or(PlanError::InvalidMonth)?;
        let start_month = Month::from_name(&name)?;
        let start_year = payload.start_year.ok_or(PlanError::MissingYear)?;
        BookingTarget::Spread {
            start_month,
            start_year,
            months,
        }
    } else {
        let name = payload.month.ok_or(PlanError::InvalidMonth)?;
        let month = Month::from_name(&name)?;
        let year = payload.year.ok_or(PlanError::MissingYear)?;
        BookingTarget::Single { month, year }
    };

    Ok(AllocationRequest {
        contribution_amount,
        shares,
        target,
        description: payload.description,
    })
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/salaries", get(list_salaries).post(create_salary))
        .route("/api/salaries/:id", delete(delete_salary))
        .route("/api/expenses", get(list_expenses).post(create_expense))
        .route("/api/expenses/:id", delete(delete_expense))
        .route("/api/budget-summary", get(budget_summary))
        .route("/api/savings", get(list_savings).post(create_savings))
        .route("/api/savings/:id", delete(delete_savings))
        .route("/api/savings/allocate", post(allocate_savings))
        .route("/api/savings/projection", get(savings_projection))
        .route("/api/stocks", get(list_stocks).post(create_stock))
        .route("/api/stocks/:id", delete(delete_stock))
        .route("/api/stocks/:ticker/quote", get(stock_quote))
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(addr: SocketAddr, api_key: Option<String>) -> std::io::Result<()> {
    let state = AppState {
        store: Arc::new(MemoryStore::new()),
        quotes: api_key.map(|key| Arc::new(QuoteService::new(AlphaVantage::new(key)))),
    };
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "budget API listening");
    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn list_salaries(State(state): State<AppState>) -> Response {
    Json(state.store.salaries()).into_response()
}

async fn create_salary(
    State(state): State<AppState>,
    Json(payload): Json<SalaryPayload>,
) -> Response {
    let Some(amount) = payload.amount.filter(|a| a.is_finite() && *a > 0.0) else {
        return error_response(StatusCode::BAD_REQUEST, "amount must be a positive number");
    };
    let Some(name) = payload.month else {
        return error_response(StatusCode::BAD_REQUEST, "amount, month, and year are required");
    };
    let month = match Month::from_name(&name) {
        Ok(month) => month,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, &err.to_string()),
    };
    let Some(year) = payload.year else {
        return error_response(StatusCode::BAD_REQUEST, "amount, month, and year are required");
    };
    Json(state.store.add_salary(amount, month, year)).into_response()
}

async fn delete_salary(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    if state.store.delete_salary(id) {
        Json(MessageResponse {
            message: "Salary deleted successfully",
        })
        .into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, "Salary not found")
    }
}

async fn list_expenses(State(state): State<AppState>) -> Response {
    Json(state.store.expenses()).into_response()
}

async fn create_expense(
    State(state): State<AppState>,
    Json(payload): Json<ExpensePayload>,
) -> Response {
    let Some(amount) = payload.amount.filter(|a| a.is_finite() && *a > 0.0) else {
        return error_response(StatusCode::BAD_REQUEST, "amount must be a positive number");
    };
    let Some(name) = payload.month else {
        return error_response(StatusCode::BAD_REQUEST, "amount, month, and year are required");
    };
    let month = match Month::from_name(&name) {
        Ok(month) => month,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, &err.to_string()),
    };
    let Some(year) = payload.year else {
        return error_response(StatusCode::BAD_REQUEST, "amount, month, and year are required");
    };
    let record = state
        .store
        .add_expense(amount, payload.description.unwrap_or_default(), month, year);
    Json(record).into_response()
}

async fn delete_expense(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    if state.store.delete_expense(id) {
        Json(MessageResponse {
            message: "Expense deleted successfully",
        })
        .into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, "Expense not found")
    }
}

async fn budget_summary(State(state): State<AppState>) -> Response {
    Json(state.store.budget_summary()).into_response()
}

async fn list_savings(State(state): State<AppState>) -> Response {
    Json(state.store.savings()).into_response()
}

async fn create_savings(
    State(state): State<AppState>,
    Json(payload): Json<SavingsPayload>,
) -> Response {
    let Some(amount) = payload.amount.filter(|a| a.is_finite() && *a >= 0.0) else {
        return error_response(StatusCode::BAD_REQUEST, "amount must be a non-negative number");
    };
    let Some(label) = payload.category else {
        return error_response(StatusCode::BAD_REQUEST, "category is required");
    };
    let Some(category) = SavingsCategory::from_label(&label) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "category must be one of ETFs, Stocks, or Savings Account",
        );
    };
    let Some(name) = payload.month else {
        return error_response(StatusCode::BAD_REQUEST, "month and year are required");
    };
    let month = match Month::from_name(&name) {
        Ok(month) => month,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, &err.to_string()),
    };
    let Some(year) = payload.year else {
        return error_response(StatusCode::BAD_REQUEST, "month and year are required");
    };

    let record = state.store.add_savings(LedgerEntry {
        amount,
        category,
        month,
        year,
        description: payload.description.unwrap_or_default(),
    });
    Json(record).into_response()
}

async fn delete_savings(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    if state.store.delete_savings(id) {
        Json(MessageResponse {
            message: "Savings entry deleted successfully",
        })
        .into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, "Savings entry not found")
    }
}

async fn allocate_savings(
    State(state): State<AppState>,
    Json(payload): Json<AllocatePayload>,
) -> Response {
    let request = match build_allocation_request(payload) {
        Ok(request) => request,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, &err.to_string()),
    };
    let entries = match plan(&request) {
        Ok(entries) => entries,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, &err.to_string()),
    };
    let records = state.store.append_entries(entries);
    info!(count = records.len(), "allocation booked");
    Json(records).into_response()
}

async fn savings_projection(
    State(state): State<AppState>,
    Query(query): Query<ProjectionQuery>,
) -> Response {
    let ledger = state.store.all_savings_entries();
    let chart = project(&ProjectionRequest {
        ledger: &ledger,
        as_of: MonthStamp::current(),
        horizon_months: query.horizon_months.unwrap_or(DEFAULT_HORIZON_MONTHS),
        assumptions: GrowthAssumptions::default(),
    });
    Json(chart).into_response()
}

async fn list_stocks(State(state): State<AppState>) -> Response {
    Json(state.store.watchlist()).into_response()
}

async fn create_stock(
    State(state): State<AppState>,
    Json(payload): Json<WatchPayload>,
) -> Response {
    let Some(ticker) = payload
        .ticker
        .map(|ticker| ticker.trim().to_uppercase())
        .filter(|ticker| !ticker.is_empty())
    else {
        return error_response(StatusCode::BAD_REQUEST, "ticker is required");
    };

    if let Some(quotes) = &state.quotes {
        match quotes.validate_ticker(&ticker).await {
            Ok(true) => {}
            Ok(false) => return error_response(StatusCode::NOT_FOUND, "ticker symbol not found"),
            Err(err) => return quote_error_response(err),
        }
    }

    match state.store.add_watch(&ticker) {
        Some(record) => Json(record).into_response(),
        None => error_response(StatusCode::CONFLICT, "ticker is already on the watchlist"),
    }
}

async fn delete_stock(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    if state.store.delete_watch(id) {
        Json(MessageResponse {
            message: "Ticker removed from watchlist",
        })
        .into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, "Watchlist entry not found")
    }
}

async fn stock_quote(State(state): State<AppState>, Path(ticker): Path<String>) -> Response {
    let Some(quotes) = &state.quotes else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "quote provider is not configured",
        );
    };
    match quotes.stock_data(&ticker).await {
        Ok(data) => Json(data).into_response(),
        Err(err) => quote_error_response(err),
    }
}
