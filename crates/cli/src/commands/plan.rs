//! Offline preview of a redirection plan

use crate::output::{self, OutputFormat};
use anyhow::{bail, Result};
use fleet_lib::planner::{effective_shares, plan_uniform, plan_weighted};
use fleet_lib::RedirectionRule;
use serde::Serialize;
use tabled::Tabled;

#[derive(Debug, Tabled, Serialize)]
pub struct PlanRow {
    #[tabled(rename = "ORDER")]
    pub order: usize,
    #[tabled(rename = "DESTINATION")]
    pub destination: String,
    #[tabled(rename = "PROBABILITY")]
    pub probability: String,
    #[tabled(rename = "SHARE")]
    pub share: String,
}

/// Destinations named `replica-NN` for previewing a fleet of `n`
pub fn placeholder_destinations(n: usize) -> Vec<String> {
    let width = n.saturating_sub(1).checked_ilog10().map_or(1, |d| d as usize + 1).max(2);
    (0..n)
        .map(|i| format!("replica-{:0width$}", i, width = width))
        .collect()
}

pub fn build_plan(destinations: &[String], weights: Option<&[f64]>) -> Result<Vec<PlanRow>> {
    let rules: Vec<RedirectionRule> = match weights {
        Some(weights) => {
            if weights.len() != destinations.len() {
                bail!(
                    "{} weights given for {} destinations",
                    weights.len(),
                    destinations.len()
                );
            }
            let weighted: Vec<(&str, f64)> = destinations
                .iter()
                .map(String::as_str)
                .zip(weights.iter().copied())
                .collect();
            plan_weighted(&weighted)?
        }
        None => plan_uniform(destinations)?,
    };

    let shares = effective_shares(&rules);
    Ok(rules
        .into_iter()
        .zip(shares)
        .enumerate()
        .map(|(order, (rule, share))| PlanRow {
            order,
            probability: rule.probability_arg().unwrap_or_else(|| "-".to_string()),
            destination: rule.destination,
            share: output::format_share(share),
        })
        .collect())
}

pub fn show_plan(destinations: &[String], weights: Option<&[f64]>, format: OutputFormat) -> Result<()> {
    let rows = build_plan(destinations, weights)?;
    output::print_table(&rows, format);
    Ok(())
}
