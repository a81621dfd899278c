use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Snowball,
    Avalanche,
}

impl Strategy {
    pub fn label(self) -> &'static str {
        match self {
            Strategy::Snowball => "Snowball (Lowest balance first)",
            Strategy::Avalanche => "Avalanche (Highest rate first)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Debt {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    pub balance: f64,
    pub rate: f64,
    pub min_payment: f64,
}

#[derive(Debug, Clone)]
pub struct PayoffPlan {
    pub debts: Vec<Debt>,
    pub strategy: Strategy,
    pub extra_payment: f64,
}

// min_payment is the normalized minimum; current_balance never increases.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingDebt {
    pub id: u64,
    pub name: String,
    pub balance: f64,
    pub rate: f64,
    pub min_payment: f64,
    pub original_balance: f64,
    pub current_balance: f64,
    pub individual_interest: f64,
    pub month_paid_off: Option<u32>,
}

impl WorkingDebt {
    pub fn is_active(&self) -> bool {
        self.current_balance > 0.0
    }
}

// Serializes flat: {"month":"M3","Credit Card":7712,"Car Loan":2415}
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub month: String,
    pub balances: Vec<(String, i64)>,
}

impl ChartPoint {
    pub fn new(month: u32) -> Self {
        Self {
            month: format!("M{month}"),
            balances: Vec::new(),
        }
    }

    // Later debts sharing a name overwrite the earlier value in place.
    pub fn push(&mut self, name: &str, balance: f64) {
        let rounded = balance.round() as i64;
        match self.balances.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = rounded,
            None => self.balances.push((name.to_string(), rounded)),
        }
    }

    pub fn balance(&self, name: &str) -> Option<i64> {
        self.balances
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, balance)| *balance)
    }
}

impl Serialize for ChartPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.balances.len() + 1))?;
        map.serialize_entry("month", &self.month)?;
        for (name, balance) in &self.balances {
            if name == "month" {
                continue;
            }
            map.serialize_entry(name, balance)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub total_months: u32,
    pub total_interest: f64,
    pub working_debts: Vec<WorkingDebt>,
    pub chart_data: Vec<ChartPoint>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTraceRow {
    pub month: u32,
    pub interest_charged: f64,
    pub extra_applied: f64,
    pub extra_target_id: Option<u64>,
    pub total_balance: f64,
    pub cumulative_interest: f64,
    pub balances: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub debt_id: u64,
    pub debt_name: String,
    pub message: String,
    pub monthly_interest: f64,
    pub required_min: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub order: usize,
    pub id: u64,
    pub name: String,
    pub original_balance: f64,
    pub rate: f64,
    pub paid_off_month: u32,
    pub interest_paid: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoffSummary {
    pub strategy: Strategy,
    pub total_months: u32,
    pub total_interest: f64,
    pub monthly_payment: f64,
    pub total_paid: f64,
    pub chart_data: Vec<ChartPoint>,
    pub schedule: Vec<ScheduleEntry>,
    pub minimum_only_months: u32,
    pub minimum_only_interest: f64,
    pub interest_saved: f64,
    pub months_saved: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyOutcome {
    pub months: u32,
    pub interest: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeDifference {
    pub months: i64,
    pub interest: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyComparison {
    pub snowball: StrategyOutcome,
    pub avalanche: StrategyOutcome,
    pub difference: OutcomeDifference,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullCalculation {
    pub results: PayoffSummary,
    pub comparison: StrategyComparison,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioTotals {
    pub total_debt: f64,
    pub average_rate: f64,
    pub monthly_minimum: f64,
}
