//! Pure aggregate views over lead snapshots and numeric inputs. Ratios with
//! a zero denominator come back as `None`; callers check before display
//! instead of letting Infinity/NaN leak into the UI.

use crate::models::{Lead, PipelineStage};

fn money(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

pub fn pipeline_total(leads: &[Lead]) -> f64 {
    leads.iter().map(|lead| money(lead.value)).sum()
}

pub fn stage_total(leads: &[Lead], stage: PipelineStage) -> f64 {
    leads
        .iter()
        .filter(|lead| lead.status == stage)
        .map(|lead| money(lead.value))
        .sum()
}

pub fn closed_total(leads: &[Lead]) -> f64 {
    stage_total(leads, PipelineStage::Closed)
}

/// Raw progress percentage; may exceed 100 and the caller clamps for display.
pub fn goal_progress_percent(closed_total: f64, monthly_goal: f64) -> Option<f64> {
    if monthly_goal <= 0.0 || !monthly_goal.is_finite() {
        return None;
    }
    Some((money(closed_total) / monthly_goal) * 100.0)
}

pub fn net_profit(revenue: f64, cost: f64, tax_rate_percent: f64, fee_rate_percent: f64) -> f64 {
    let revenue = money(revenue);
    revenue
        - money(cost)
        - revenue * money(tax_rate_percent) / 100.0
        - revenue * money(fee_rate_percent) / 100.0
}

pub fn roi(net_profit: f64, cost: f64) -> Option<f64> {
    if cost == 0.0 || !cost.is_finite() {
        return None;
    }
    let ratio = (money(net_profit) / cost) * 100.0;
    ratio.is_finite().then_some(ratio)
}

pub fn roas(revenue: f64, cost: f64) -> Option<f64> {
    if cost == 0.0 || !cost.is_finite() {
        return None;
    }
    let ratio = money(revenue) / cost;
    ratio.is_finite().then_some(ratio)
}
