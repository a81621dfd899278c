mod engine;
mod report;
mod types;

pub use engine::{
    MAX_MONTHS, calculate_strategy, monthly_rate, normalize_debt, run_monthly_trace,
    select_extra_target,
};
pub use report::{
    build_warning_map, display_name, format_months, payoff_schedule, portfolio_totals,
    run_full_calculation, validate_debts,
};
pub use types::{
    ChartPoint, Debt, FullCalculation, MonthlyTraceRow, OutcomeDifference, PayoffPlan,
    PayoffSummary, PortfolioTotals, ScheduleEntry, SimulationResult, Strategy,
    StrategyComparison, StrategyOutcome, Warning, WorkingDebt,
};
