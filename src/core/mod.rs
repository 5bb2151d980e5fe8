mod planner;
mod projector;
mod types;

pub use planner::{PERCENT_SUM_TOLERANCE, normalize_percentages, plan};
pub use projector::project;
pub use types::{
    AllocationRequest, BookingTarget, CategoryShares, ChartData, ChartSeries,
    DEFAULT_HORIZON_MONTHS, GrowthAssumptions, LedgerEntry, Month, MonthParseError, MonthStamp,
    PlanError, ProjectionRequest, SavingsCategory,
};
