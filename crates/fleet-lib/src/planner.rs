//! Cascading-probability rule planning
//!
//! The packet filter evaluates rules in order and applies the first match.
//! Each rule can only say "with probability p, redirect; otherwise fall
//! through". To give destination `i` a share `w_i / W` of all traffic, the
//! rule for `i` must match with probability `w_i / (w_i + ... + w_{n-1})`:
//! the share it must claim divided by the mass still unclaimed when traffic
//! reaches it. For a uniform split this is `1 / (n - i)`.
//!
//! The last rule would always get probability 1, so it is emitted without a
//! probability at all. Residual floating-point error then has nowhere to leak.

use crate::error::PlanningError;
use crate::models::{FleetResult, RedirectionRule};

/// Plan a uniform split across every replica of `fleet`, in fleet order
pub fn plan(fleet: &FleetResult) -> Result<Vec<RedirectionRule>, PlanningError> {
    let destinations: Vec<String> = fleet.iter().map(|r| r.destination()).collect();
    plan_uniform(&destinations)
}

/// Plan a uniform split across `destinations`, in the given order
pub fn plan_uniform<S: AsRef<str>>(destinations: &[S]) -> Result<Vec<RedirectionRule>, PlanningError> {
    let n = destinations.len();
    if n < 2 {
        return Err(PlanningError::TooFewDestinations(n));
    }

    Ok(destinations
        .iter()
        .enumerate()
        .map(|(i, dest)| {
            if i == n - 1 {
                RedirectionRule::unconditional(dest.as_ref())
            } else {
                RedirectionRule::conditional(1.0 / (n - i) as f64, dest.as_ref())
            }
        })
        .collect())
}

/// Plan a weighted split; `weighted` pairs each destination with its weight
pub fn plan_weighted<S: AsRef<str>>(
    weighted: &[(S, f64)],
) -> Result<Vec<RedirectionRule>, PlanningError> {
    let n = weighted.len();
    if n < 2 {
        return Err(PlanningError::TooFewDestinations(n));
    }

    if let Some((index, &(_, weight))) = weighted
        .iter()
        .enumerate()
        .find(|(_, (_, w))| !w.is_finite() || *w <= 0.0)
    {
        return Err(PlanningError::InvalidWeight { index, weight });
    }

    // Suffix sums: remaining[i] = w_i + ... + w_{n-1}
    let mut remaining = vec![0.0; n];
    let mut acc = 0.0;
    for i in (0..n).rev() {
        acc += weighted[i].1;
        remaining[i] = acc;
    }

    Ok(weighted
        .iter()
        .enumerate()
        .map(|(i, (dest, weight))| {
            if i == n - 1 {
                RedirectionRule::unconditional(dest.as_ref())
            } else {
                RedirectionRule::conditional(weight / remaining[i], dest.as_ref())
            }
        })
        .collect())
}

/// Unconditional share of traffic each rule receives under first-match-wins
pub fn effective_shares(rules: &[RedirectionRule]) -> Vec<f64> {
    let mut reaching = 1.0;
    rules
        .iter()
        .map(|rule| {
            let p = rule.probability.unwrap_or(1.0);
            let share = reaching * p;
            reaching *= 1.0 - p;
            share
        })
        .collect()
}
