//! Channel cost rules.
//!
//! Each channel cost exists twice: as a yearly variable per (location, tech)
//! and as a window aggregate that enters the objective. The aggregate rows
//! tie the two together so reporting and objective cannot drift apart.

use super::{Row, Rule, RuleContext, RuleFamily, RuleKind};
use crate::extension::error::ModelResult;
use crate::extension::vars::{CostType, YearVars};
use circap_core::{SiteTech, Year};
use good_lp::{Expression, Variable};

pub(crate) const RULES: &[Rule] = &[
    Rule {
        name: "import_cost",
        family: RuleFamily::YearlyCosts,
        kind: RuleKind::Yearly(import_cost),
    },
    Rule {
        name: "storage_cost",
        family: RuleFamily::YearlyCosts,
        kind: RuleKind::Yearly(storage_cost),
    },
    Rule {
        name: "primary_cost",
        family: RuleFamily::YearlyCosts,
        kind: RuleKind::Yearly(primary_cost),
    },
    Rule {
        name: "secondary_cost",
        family: RuleFamily::YearlyCosts,
        kind: RuleKind::Yearly(secondary_cost),
    },
    Rule {
        name: "costs_new",
        family: RuleFamily::CostAggregate,
        kind: RuleKind::Aggregate(cost_aggregates),
    },
];

/// Import cost on fresh and stocked imports, logistics into stock, anti-dumping surcharge.
fn import_cost(ctx: &RuleContext<'_>, year: Year, site: &SiteTech) -> ModelResult<Option<Row>> {
    let v = ctx.at(year, site)?;
    let unit = ctx.yearly(year, site)?.import_cost;
    let logistic = ctx.params(site)?.logistic_cost;
    Ok(Some(Row::eq(
        v.cost_import,
        unit * (v.imported + v.stock_imported) + logistic * v.stock_imported + v.anti_dumping,
    )))
}

fn storage_cost(ctx: &RuleContext<'_>, year: Year, site: &SiteTech) -> ModelResult<Option<Row>> {
    let v = ctx.at(year, site)?;
    let unit = ctx.params(site)?.storage_cost;
    Ok(Some(Row::eq(v.cost_storage, unit * v.stockpile)))
}

fn primary_cost(ctx: &RuleContext<'_>, year: Year, site: &SiteTech) -> ModelResult<Option<Row>> {
    let v = ctx.at(year, site)?;
    let unit = ctx.yearly(year, site)?.manufacturing_cost;
    Ok(Some(Row::eq(v.cost_primary, unit * v.primary)))
}

/// `(remanufacturing - PR) · Secondary + scrap cost`, with `PR · Secondary`
/// expanded as `Σ_n P[n] · Z[y,n]`.
fn secondary_cost(ctx: &RuleContext<'_>, year: Year, site: &SiteTech) -> ModelResult<Option<Row>> {
    let v = ctx.at(year, site)?;
    let unit = ctx.yearly(year, site)?.remanufacturing_cost;
    let curve = ctx.data.curve_for(&site.tech);
    let mut cost = unit * v.secondary + v.cost_scrap;
    for (step, flags) in curve.steps.iter().zip(&v.steps) {
        cost -= step.price_reduction * flags.product;
    }
    Ok(Some(Row::eq(v.cost_secondary, cost)))
}

fn yearly_cost_var(v: &YearVars, cost_type: CostType) -> Variable {
    match cost_type {
        CostType::Import => v.cost_import,
        CostType::Storage => v.cost_storage,
        CostType::Primary => v.cost_primary,
        CostType::Secondary => v.cost_secondary,
    }
}

/// `costs_new[type] = Σ_{y, loc, tech} yearly cost`
fn cost_aggregates(ctx: &RuleContext<'_>) -> ModelResult<Vec<(String, Row)>> {
    let mut rows = Vec::with_capacity(CostType::ALL.len());
    for cost_type in CostType::ALL {
        let mut total = Expression::from(0.0);
        for year in ctx.data.years() {
            for site in ctx.data.site_techs() {
                total += yearly_cost_var(ctx.at(year, site)?, cost_type);
            }
        }
        rows.push((
            cost_type.as_str().to_string(),
            Row::eq(ctx.vars.cost_new(cost_type)?, total),
        ));
    }
    Ok(rows)
}
