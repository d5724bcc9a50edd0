//! Post-solve verification.
//!
//! Recomputes the model's defining identities from solved values alone,
//! independent of the rows handed to the solver, and records every
//! violation in a [`Diagnostics`] report.

use super::problem::{BenchmarkVariant, ExtensionProblem};
use super::solution::{ExtensionSolution, YearValues};
use super::vars::CostType;
use circap_core::{Diagnostics, SiteTech, Year, YearPosition};

/// `|a - b| <= tol · max(1, |a|, |b|)`
pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol * 1f64.max(a.abs()).max(b.abs())
}

fn approx_le(a: f64, b: f64, tol: f64) -> bool {
    a <= b + tol * 1f64.max(a.abs()).max(b.abs())
}

struct Checker<'a> {
    diag: Diagnostics,
    tol: f64,
    entity: &'a str,
}

impl Checker<'_> {
    fn eq(&mut self, category: &str, lhs: f64, rhs: f64) {
        self.diag.count_check();
        if !approx_eq(lhs, rhs, self.tol) {
            self.diag.add_error_with_entity(
                category,
                &format!("{:.6} != {:.6}", lhs, rhs),
                self.entity,
            );
        }
    }

    fn le(&mut self, category: &str, lhs: f64, rhs: f64) {
        self.diag.count_check();
        if !approx_le(lhs, rhs, self.tol) {
            self.diag.add_error_with_entity(
                category,
                &format!("{:.6} > {:.6}", lhs, rhs),
                self.entity,
            );
        }
    }
}

/// Check continuity, channel decomposition, stock bounds, step exclusivity,
/// price monotonicity, scrap recursion, the benchmark and cost aggregates.
pub fn verify_solution(
    problem: &ExtensionProblem,
    solution: &ExtensionSolution,
    tolerance: f64,
) -> Diagnostics {
    let data = &problem.data;
    let policy = &problem.policy;
    let mut report = Diagnostics::new();

    for site in data.site_techs() {
        let Ok(params) = data.params(site) else {
            report.add_error("lookup", &format!("no attributes for {}", site));
            continue;
        };
        for year in data.years() {
            let entity = format!("{} {}", year, site);
            let mut check = Checker {
                diag: Diagnostics::new(),
                tol: tolerance,
                entity: &entity,
            };
            let Some(v) = solution.value(year, site) else {
                check.diag.add_error_with_entity("lookup", "no solved values", &entity);
                report.merge(check.diag);
                continue;
            };
            let prev = previous(solution, year, site, data.y0);

            let prev_cap = prev.map_or(params.initial_capacity, |p| p.capacity_ext);
            check.eq(
                "continuity",
                v.capacity_ext,
                prev_cap + v.capacity_new - v.decommissioned,
            );
            check.eq(
                "composition",
                v.capacity_new,
                v.imported + v.stockout + v.primary + v.secondary,
            );

            check.le("stock", -v.stockpile, 0.0);
            check.le(
                "stock",
                v.stock_imported,
                policy.max_stock_in_share * v.imported,
            );

            let active: f64 = v.step_active.iter().sum();
            check.le("step_exclusivity", active, 1.0);

            let position = YearPosition::classify(year, data.y0, policy.epoch_year);
            match position {
                YearPosition::AbsoluteStart => {}
                YearPosition::WindowStart => {
                    check.le("monotonicity", params.price_reduction_init, v.price_reduction)
                }
                YearPosition::Interior => {
                    if let Some(p) = prev {
                        check.le("monotonicity", p.price_reduction, v.price_reduction);
                    }
                }
            }

            let prev_scrap = prev.map_or(params.initial_scrap_total, |p| p.scrap_total);
            check.eq(
                "scrap_recursion",
                v.scrap_total,
                prev_scrap + v.scrap_dec - v.scrap_rec,
            );

            if let Some(rule) = policy.benchmark {
                let domestic = match rule.variant {
                    BenchmarkVariant::NetStock => {
                        v.primary + v.secondary + v.stockout - v.stock_imported
                    }
                    BenchmarkVariant::DomesticOnly => v.primary + v.secondary,
                };
                check.le("benchmark", rule.share * v.capacity_new, domestic);
            }
            report.merge(check.diag);
        }
    }

    let entity = "window".to_string();
    let mut check = Checker {
        diag: Diagnostics::new(),
        tol: tolerance,
        entity: &entity,
    };
    for cost_type in CostType::ALL {
        let yearly: f64 = solution
            .years
            .values()
            .map(|v| match cost_type {
                CostType::Import => v.cost_import,
                CostType::Storage => v.cost_storage,
                CostType::Primary => v.cost_primary,
                CostType::Secondary => v.cost_secondary,
            })
            .sum();
        let aggregate = solution.costs_new.get(&cost_type).copied().unwrap_or(0.0);
        check.eq("costs", yearly, aggregate);
    }
    report.merge(check.diag);
    report
}

fn previous<'a>(
    solution: &'a ExtensionSolution,
    year: Year,
    site: &SiteTech,
    y0: Year,
) -> Option<&'a YearValues> {
    if year == y0 {
        None
    } else {
        solution.value(year - 1, site)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approx_eq_is_relative_for_large_values() {
        assert!(approx_eq(1e8, 1e8 + 1.0, 1e-6));
        assert!(!approx_eq(1.0, 1.1, 1e-6));
        assert!(approx_eq(0.0, 1e-9, 1e-6));
    }

    #[test]
    fn test_approx_le_tolerates_noise() {
        assert!(approx_le(1.0 + 1e-9, 1.0, 1e-6));
        assert!(!approx_le(1.1, 1.0, 1e-6));
    }
}
