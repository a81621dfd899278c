use log::debug;

use super::types::{ChartPoint, Debt, MonthlyTraceRow, SimulationResult, Strategy, WorkingDebt};

pub const MAX_MONTHS: u32 = 360;

const MIN_PAYMENT_INTEREST_MARGIN: f64 = 1.1;
const RUNAWAY_BALANCE_MULTIPLE: f64 = 10.0;
const CHART_TARGET_POINTS: u32 = 20;

#[derive(Debug, Clone, Copy)]
struct ExtraPaymentOutcome {
    applied: f64,
    target_id: Option<u64>,
}

pub fn monthly_rate(annual_rate_percent: f64) -> f64 {
    annual_rate_percent / 100.0 / 12.0
}

// Lifted once from the starting balance and kept for the whole run.
pub fn normalize_debt(debt: &Debt) -> Debt {
    let monthly_interest = debt.balance * monthly_rate(debt.rate);
    Debt {
        min_payment: debt
            .min_payment
            .max(monthly_interest * MIN_PAYMENT_INTEREST_MARGIN),
        ..debt.clone()
    }
}

pub fn calculate_strategy(debts: &[Debt], strategy: Strategy, extra_payment: f64) -> SimulationResult {
    simulate_payoff(debts, strategy, extra_payment, None)
}

pub fn run_monthly_trace(
    debts: &[Debt],
    strategy: Strategy,
    extra_payment: f64,
) -> Vec<MonthlyTraceRow> {
    let mut trace = Vec::with_capacity(MAX_MONTHS as usize);
    simulate_payoff(debts, strategy, extra_payment, Some(&mut trace));
    trace
}

fn simulate_payoff(
    debts: &[Debt],
    strategy: Strategy,
    extra_payment: f64,
    mut trace: Option<&mut Vec<MonthlyTraceRow>>,
) -> SimulationResult {
    let mut working_debts = debts.iter().map(start_working_debt).collect::<Vec<_>>();
    let balance_cap = total_balance_of(&working_debts, |d| d.original_balance)
        * RUNAWAY_BALANCE_MULTIPLE;

    let mut chart_data = Vec::new();
    let mut month = 0_u32;
    let mut total_interest = 0.0;

    while working_debts.iter().any(WorkingDebt::is_active) && month < MAX_MONTHS {
        if total_balance_of(&working_debts, |d| d.current_balance) > balance_cap {
            debug!("balances passed {balance_cap:.2} after {month} months; stopping run");
            break;
        }
        month += 1;

        let interest_charged = apply_minimum_payments(&mut working_debts, &mut total_interest);
        let extra = apply_extra_payment(&mut working_debts, strategy, extra_payment);
        mark_paid_off(&mut working_debts, month);

        let all_paid_off = !working_debts.iter().any(WorkingDebt::is_active);
        if should_sample_month(month, all_paid_off) {
            chart_data.push(chart_point(month, &working_debts));
        }

        if let Some(trace) = trace.as_mut() {
            trace.push(MonthlyTraceRow {
                month,
                interest_charged,
                extra_applied: extra.applied,
                extra_target_id: extra.target_id,
                total_balance: total_balance_of(&working_debts, |d| d.current_balance),
                cumulative_interest: total_interest,
                balances: working_debts.iter().map(|d| d.current_balance).collect(),
            });
        }
    }

    if working_debts.iter().any(WorkingDebt::is_active) {
        debug!(
            "{strategy:?} run ended at month {month} with {:.2} still owed",
            total_balance_of(&working_debts, |d| d.current_balance)
        );
    }

    SimulationResult {
        total_months: month,
        total_interest,
        working_debts,
        chart_data,
    }
}

fn start_working_debt(debt: &Debt) -> WorkingDebt {
    let normalized = normalize_debt(debt);
    WorkingDebt {
        id: normalized.id,
        name: normalized.name,
        balance: normalized.balance,
        rate: normalized.rate,
        min_payment: normalized.min_payment,
        original_balance: normalized.balance,
        current_balance: normalized.balance,
        individual_interest: 0.0,
        month_paid_off: None,
    }
}

fn total_balance_of(debts: &[WorkingDebt], balance: impl Fn(&WorkingDebt) -> f64) -> f64 {
    debts.iter().map(balance).sum()
}

fn apply_minimum_payments(debts: &mut [WorkingDebt], total_interest: &mut f64) -> f64 {
    let mut charged = 0.0;
    for debt in debts.iter_mut().filter(|d| d.is_active()) {
        let monthly_interest = debt.current_balance * monthly_rate(debt.rate);
        let payment = debt
            .min_payment
            .min(debt.current_balance + monthly_interest);
        let principal = (payment - monthly_interest).max(0.0);

        debt.current_balance = (debt.current_balance - principal).max(0.0);
        debt.individual_interest += monthly_interest;
        *total_interest += monthly_interest;
        charged += monthly_interest;
    }
    charged
}

// Ties go to the earliest debt in input order.
pub fn select_extra_target(debts: &[WorkingDebt], strategy: Strategy) -> Option<usize> {
    let active = debts
        .iter()
        .enumerate()
        .filter(|(_, d)| d.is_active())
        .map(|(idx, _)| idx);

    match strategy {
        Strategy::Snowball => active.reduce(|best, idx| {
            if debts[idx].current_balance < debts[best].current_balance {
                idx
            } else {
                best
            }
        }),
        Strategy::Avalanche => active.reduce(|best, idx| {
            if debts[idx].rate > debts[best].rate {
                idx
            } else {
                best
            }
        }),
    }
}

fn apply_extra_payment(
    debts: &mut [WorkingDebt],
    strategy: Strategy,
    extra_payment: f64,
) -> ExtraPaymentOutcome {
    let none = ExtraPaymentOutcome {
        applied: 0.0,
        target_id: None,
    };
    if extra_payment.is_nan() || extra_payment <= 0.0 {
        return none;
    }
    let Some(idx) = select_extra_target(debts, strategy) else {
        return none;
    };

    let target = &mut debts[idx];
    let applied = extra_payment.min(target.current_balance);
    target.current_balance -= applied;
    ExtraPaymentOutcome {
        applied,
        target_id: Some(target.id),
    }
}

fn mark_paid_off(debts: &mut [WorkingDebt], month: u32) {
    for debt in debts
        .iter_mut()
        .filter(|d| d.current_balance == 0.0 && d.month_paid_off.is_none())
    {
        debt.month_paid_off = Some(month);
    }
}

fn should_sample_month(month: u32, all_paid_off: bool) -> bool {
    month == 1 || month % month.div_ceil(CHART_TARGET_POINTS) == 0 || all_paid_off
}

fn chart_point(month: u32, debts: &[WorkingDebt]) -> ChartPoint {
    let mut point = ChartPoint::new(month);
    for debt in debts {
        point.push(&debt.name, debt.current_balance);
    }
    point
}
