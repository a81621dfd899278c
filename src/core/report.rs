use std::collections::HashMap;

use super::engine::{calculate_strategy, monthly_rate};
use super::types::{
    Debt, FullCalculation, OutcomeDifference, PayoffSummary, PortfolioTotals, ScheduleEntry,
    SimulationResult, Strategy, StrategyComparison, StrategyOutcome, Warning,
};

const SUGGESTED_MIN_MARGIN: f64 = 1.01;
const UNNAMED_DEBT: &str = "Unnamed Debt";

pub fn validate_debts(debts: &[Debt]) -> Vec<Warning> {
    debts
        .iter()
        .filter(|d| d.balance > 0.0 && d.rate > 0.0 && d.min_payment > 0.0)
        .filter_map(|d| {
            let monthly_interest = d.balance * monthly_rate(d.rate);
            if d.min_payment > monthly_interest {
                return None;
            }
            Some(Warning {
                debt_id: d.id,
                debt_name: display_name(&d.name).to_string(),
                message: format!(
                    "Minimum payment (${}) doesn't cover monthly interest (${}). This debt will grow forever.",
                    d.min_payment,
                    monthly_interest.round()
                ),
                monthly_interest: monthly_interest.round(),
                required_min: (monthly_interest * SUGGESTED_MIN_MARGIN).ceil(),
            })
        })
        .collect()
}

pub fn build_warning_map(warnings: &[Warning]) -> HashMap<u64, Warning> {
    warnings
        .iter()
        .map(|w| (w.debt_id, w.clone()))
        .collect()
}

pub fn portfolio_totals(debts: &[Debt]) -> PortfolioTotals {
    let total_debt = debts.iter().map(|d| d.balance).sum();
    let average_rate = if debts.is_empty() {
        0.0
    } else {
        debts.iter().map(|d| d.rate).sum::<f64>() / debts.len() as f64
    };
    PortfolioTotals {
        total_debt,
        average_rate,
        monthly_minimum: debts.iter().map(|d| d.min_payment).sum(),
    }
}

pub fn run_full_calculation(
    debts: &[Debt],
    strategy: Strategy,
    extra_payment: f64,
) -> Option<FullCalculation> {
    let valid_debts = debts
        .iter()
        .filter(|d| d.balance > 0.0 && d.min_payment > 0.0)
        .cloned()
        .collect::<Vec<_>>();
    if valid_debts.is_empty() {
        return None;
    }

    let current = calculate_strategy(&valid_debts, strategy, extra_payment);
    let snowball = calculate_strategy(&valid_debts, Strategy::Snowball, extra_payment);
    let avalanche = calculate_strategy(&valid_debts, Strategy::Avalanche, extra_payment);
    let minimum_only = calculate_strategy(&valid_debts, Strategy::Snowball, 0.0);

    let monthly_payment =
        valid_debts.iter().map(|d| d.min_payment).sum::<f64>() + extra_payment.max(0.0);
    let starting_balance = valid_debts.iter().map(|d| d.balance).sum::<f64>();

    let results = PayoffSummary {
        strategy,
        total_months: current.total_months,
        total_interest: current.total_interest,
        monthly_payment,
        total_paid: starting_balance + current.total_interest,
        schedule: payoff_schedule(&current, strategy),
        chart_data: current.chart_data,
        minimum_only_months: minimum_only.total_months,
        minimum_only_interest: minimum_only.total_interest,
        interest_saved: minimum_only.total_interest - current.total_interest,
        months_saved: i64::from(minimum_only.total_months) - i64::from(current.total_months),
    };

    Some(FullCalculation {
        results,
        comparison: compare_strategies(&snowball, &avalanche),
    })
}

pub fn payoff_schedule(result: &SimulationResult, strategy: Strategy) -> Vec<ScheduleEntry> {
    let mut ordered = result.working_debts.iter().collect::<Vec<_>>();
    match strategy {
        Strategy::Snowball => ordered.sort_by_key(|d| d.month_paid_off.unwrap_or(u32::MAX)),
        Strategy::Avalanche => ordered.sort_by(|a, b| b.rate.total_cmp(&a.rate)),
    }

    ordered
        .into_iter()
        .enumerate()
        .map(|(idx, debt)| ScheduleEntry {
            order: idx + 1,
            id: debt.id,
            name: debt.name.clone(),
            original_balance: debt.original_balance,
            rate: debt.rate,
            paid_off_month: debt.month_paid_off.unwrap_or(result.total_months),
            interest_paid: debt.individual_interest.round(),
        })
        .collect()
}

fn compare_strategies(snowball: &SimulationResult, avalanche: &SimulationResult) -> StrategyComparison {
    StrategyComparison {
        snowball: StrategyOutcome {
            months: snowball.total_months,
            interest: snowball.total_interest,
        },
        avalanche: StrategyOutcome {
            months: avalanche.total_months,
            interest: avalanche.total_interest,
        },
        difference: OutcomeDifference {
            months: i64::from(snowball.total_months) - i64::from(avalanche.total_months),
            interest: snowball.total_interest - avalanche.total_interest,
        },
    }
}

pub fn display_name(name: &str) -> &str {
    if name.trim().is_empty() {
        UNNAMED_DEBT
    } else {
        name
    }
}

pub fn format_months(months: u32) -> String {
    if months >= 600 {
        return "50+ years".to_string();
    }
    if months < 12 {
        let plural = if months == 1 { "" } else { "s" };
        return format!("{months} month{plural}");
    }
    let years = months / 12;
    let rest = months % 12;
    if rest > 0 {
        format!("{years}y {rest}m")
    } else {
        let plural = if years == 1 { "" } else { "s" };
        format!("{years} year{plural}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn debt(id: u64, name: &str, balance: f64, rate: f64, min_payment: f64) -> Debt {
        Debt {
            id,
            name: name.to_string(),
            balance,
            rate,
            min_payment,
        }
    }

    fn reference_debts() -> Vec<Debt> {
        vec![
            debt(1, "Credit Card", 8_000.0, 22.99, 240.0),
            debt(2, "Car Loan", 3_000.0, 4.5, 300.0),
            debt(3, "Personal Loan", 5_000.0, 12.99, 150.0),
            debt(4, "Student Loan", 15_000.0, 6.5, 165.0),
        ]
    }

    #[test]
    fn validate_flags_minimum_below_interest_with_suggestion() {
        let debts = vec![
            debt(1, "Huge", 500_000.0, 25.0, 100.0),
            debt(2, "Fine", 1_000.0, 18.0, 50.0),
        ];
        let warnings = validate_debts(&debts);

        assert_eq!(warnings.len(), 1);
        let warning = &warnings[0];
        assert_eq!(warning.debt_id, 1);
        assert_eq!(warning.debt_name, "Huge");
        assert_approx(warning.monthly_interest, 10_417.0);
        // 10,416.67 * 1.01 = 10,520.83
        assert_approx(warning.required_min, 10_521.0);
        assert_eq!(
            warning.message,
            "Minimum payment ($100) doesn't cover monthly interest ($10417). This debt will grow forever."
        );
    }

    #[test]
    fn validate_names_unnamed_debts() {
        let warnings = validate_debts(&[debt(3, "  ", 12_000.0, 12.0, 119.0)]);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].debt_name, "Unnamed Debt");
        assert_approx(warnings[0].required_min, 122.0);
    }

    #[test]
    fn validate_skips_incomplete_debts() {
        let debts = vec![
            debt(1, "No balance", 0.0, 20.0, 10.0),
            debt(2, "No rate", 5_000.0, 0.0, 1.0),
            debt(3, "No minimum", 5_000.0, 20.0, 0.0),
        ];
        assert!(validate_debts(&debts).is_empty());
    }

    #[test]
    fn warning_map_is_keyed_by_debt_id() {
        let debts = vec![
            debt(10, "A", 100_000.0, 20.0, 10.0),
            debt(20, "B", 1_000.0, 5.0, 100.0),
            debt(30, "C", 50_000.0, 30.0, 20.0),
        ];
        let map = build_warning_map(&validate_debts(&debts));
        assert_eq!(map.len(), 2);
        assert_eq!(map[&10].debt_name, "A");
        assert_eq!(map[&30].debt_name, "C");
        assert!(!map.contains_key(&20));
    }

    #[test]
    fn full_calculation_returns_none_without_valid_debts() {
        assert!(run_full_calculation(&[], Strategy::Snowball, 200.0).is_none());

        let unusable = vec![debt(1, "Empty", 0.0, 10.0, 50.0), debt(2, "No min", 900.0, 10.0, 0.0)];
        assert!(run_full_calculation(&unusable, Strategy::Avalanche, 200.0).is_none());
    }

    #[test]
    fn full_calculation_derives_savings_from_minimum_only_baseline() {
        let debts = reference_debts();
        let full = run_full_calculation(&debts, Strategy::Snowball, 200.0).expect("valid debts");
        let current = calculate_strategy(&debts, Strategy::Snowball, 200.0);
        let minimum_only = calculate_strategy(&debts, Strategy::Snowball, 0.0);

        let results = &full.results;
        assert_eq!(results.strategy, Strategy::Snowball);
        assert_eq!(results.total_months, current.total_months);
        assert_approx(results.total_interest, current.total_interest);
        assert_eq!(results.minimum_only_months, minimum_only.total_months);
        assert_approx(results.minimum_only_interest, minimum_only.total_interest);
        assert_approx(
            results.interest_saved,
            minimum_only.total_interest - current.total_interest,
        );
        assert_eq!(
            results.months_saved,
            minimum_only.total_months as i64 - current.total_months as i64
        );
        assert!(results.interest_saved > 0.0);
        assert!(results.months_saved > 0);

        assert_approx(results.monthly_payment, 240.0 + 300.0 + 150.0 + 165.0 + 200.0);
        assert_approx(results.total_paid, 31_000.0 + current.total_interest);
        assert_eq!(results.chart_data.len(), current.chart_data.len());
    }

    #[test]
    fn full_calculation_comparison_runs_both_strategies() {
        let debts = reference_debts();
        let full = run_full_calculation(&debts, Strategy::Avalanche, 200.0).expect("valid debts");
        let snowball = calculate_strategy(&debts, Strategy::Snowball, 200.0);
        let avalanche = calculate_strategy(&debts, Strategy::Avalanche, 200.0);

        let comparison = full.comparison;
        assert_eq!(comparison.snowball.months, snowball.total_months);
        assert_eq!(comparison.avalanche.months, avalanche.total_months);
        assert_approx(comparison.snowball.interest, snowball.total_interest);
        assert_approx(comparison.avalanche.interest, avalanche.total_interest);
        assert_approx(
            comparison.difference.interest,
            snowball.total_interest - avalanche.total_interest,
        );
        assert!(comparison.difference.interest >= 0.0);
        assert!(comparison.difference.months >= 0);
    }

    #[test]
    fn full_calculation_ignores_debts_without_balance_or_minimum() {
        let mut debts = reference_debts();
        debts.push(debt(5, "Closed", 0.0, 19.0, 25.0));
        debts.push(debt(6, "No min", 2_000.0, 9.0, 0.0));

        let full = run_full_calculation(&debts, Strategy::Snowball, 200.0).expect("valid debts");
        assert_eq!(full.results.schedule.len(), 4);
        assert!(full.results.schedule.iter().all(|entry| entry.id <= 4));
    }

    #[test]
    fn snowball_schedule_orders_by_payoff_month() {
        let full = run_full_calculation(&reference_debts(), Strategy::Snowball, 200.0)
            .expect("valid debts");
        let schedule = &full.results.schedule;

        assert_eq!(schedule[0].name, "Car Loan");
        for (idx, entry) in schedule.iter().enumerate() {
            assert_eq!(entry.order, idx + 1);
        }
        for pair in schedule.windows(2) {
            assert!(pair[0].paid_off_month <= pair[1].paid_off_month);
        }
    }

    #[test]
    fn avalanche_schedule_orders_by_rate() {
        let full = run_full_calculation(&reference_debts(), Strategy::Avalanche, 200.0)
            .expect("valid debts");
        let names = full
            .results
            .schedule
            .iter()
            .map(|entry| entry.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec!["Credit Card", "Personal Loan", "Student Loan", "Car Loan"]
        );
        assert_approx(full.results.schedule[0].original_balance, 8_000.0);
        assert_approx(full.results.schedule[0].rate, 22.99);
    }

    #[test]
    fn schedule_falls_back_to_total_months_when_never_paid_off() {
        let debts = vec![
            debt(1, "Slow", 500_000.0, 0.0, 100.0),
            debt(2, "Quick", 1_000.0, 0.0, 500.0),
        ];
        let full = run_full_calculation(&debts, Strategy::Snowball, 0.0).expect("valid debts");
        let schedule = &full.results.schedule;

        assert_eq!(schedule[0].name, "Quick");
        assert_eq!(schedule[0].paid_off_month, 2);
        assert_eq!(schedule[1].name, "Slow");
        assert_eq!(schedule[1].paid_off_month, full.results.total_months);
        assert_eq!(full.results.total_months, 360);
    }

    #[test]
    fn schedule_interest_is_rounded_per_debt() {
        let debts = reference_debts();
        let current = calculate_strategy(&debts, Strategy::Avalanche, 200.0);
        let schedule = payoff_schedule(&current, Strategy::Avalanche);

        for entry in &schedule {
            let working = current
                .working_debts
                .iter()
                .find(|d| d.id == entry.id)
                .expect("entry comes from a working debt");
            assert_eq!(entry.interest_paid, working.individual_interest.round());
            assert_eq!(entry.interest_paid.fract(), 0.0);
        }
        let total: f64 = schedule.iter().map(|entry| entry.interest_paid).sum();
        assert!((total - current.total_interest).abs() <= 0.5 * schedule.len() as f64);
    }

    #[test]
    fn portfolio_totals_cover_all_debts() {
        let totals = portfolio_totals(&reference_debts());
        assert_approx(totals.total_debt, 31_000.0);
        assert_approx(totals.average_rate, (22.99 + 4.5 + 12.99 + 6.5) / 4.0);
        assert_approx(totals.monthly_minimum, 855.0);

        let empty = portfolio_totals(&[]);
        assert_approx(empty.average_rate, 0.0);
    }

    #[test]
    fn format_months_reads_naturally() {
        assert_eq!(format_months(1), "1 month");
        assert_eq!(format_months(7), "7 months");
        assert_eq!(format_months(12), "1 year");
        assert_eq!(format_months(24), "2 years");
        assert_eq!(format_months(40), "3y 4m");
        assert_eq!(format_months(600), "50+ years");
    }
}
