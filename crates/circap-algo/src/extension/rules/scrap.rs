//! Decommissioning and scrap mass balance.

use super::{Row, Rule, RuleContext, RuleFamily, RuleKind};
use crate::extension::error::ModelResult;
use crate::extension::problem::DecommissionFloor;
use circap_core::{SiteTech, Year, YearPosition};
use good_lp::Expression;

pub(crate) const RULES: &[Rule] = &[
    Rule {
        name: "decommissioning",
        family: RuleFamily::Decommissioning,
        kind: RuleKind::Yearly(decommissioning),
    },
    Rule {
        name: "scrap_from_decommissioning",
        family: RuleFamily::ScrapBalance,
        kind: RuleKind::Yearly(scrap_from_decommissioning),
    },
    Rule {
        name: "scrap_recovered",
        family: RuleFamily::ScrapBalance,
        kind: RuleKind::Yearly(scrap_recovered),
    },
    Rule {
        name: "scrap_total",
        family: RuleFamily::ScrapBalance,
        kind: RuleKind::Yearly(scrap_total),
    },
    Rule {
        name: "scrap_cost",
        family: RuleFamily::ScrapCost,
        kind: RuleKind::Yearly(scrap_cost),
    },
    Rule {
        name: "recycling_growth",
        family: RuleFamily::RecyclingGrowth,
        kind: RuleKind::Yearly(recycling_growth),
    },
];

/// In-window cohorts retire after their lifetime; before that the
/// pre-horizon fleet retires at the configured floor.
fn decommissioning(ctx: &RuleContext<'_>, year: Year, site: &SiteTech) -> ModelResult<Option<Row>> {
    let v = ctx.at(year, site)?;
    let p = ctx.params(site)?;
    if let Some(cohort_year) = year.checked_sub(p.lifetime).filter(|&c| c >= ctx.data.y0) {
        let cohort = ctx.at(cohort_year, site)?;
        return Ok(Some(Row::eq(v.decommissioned, cohort.capacity_new)));
    }
    let floor = match ctx.policy.decommission_floor {
        DecommissionFloor::Flat => Expression::from(p.decommission_start),
        DecommissionFloor::Proportional { multiplier } => {
            p.decommission_start + multiplier * v.capacity_new
        }
    };
    Ok(Some(Row::eq(v.decommissioned, floor)))
}

fn scrap_from_decommissioning(
    ctx: &RuleContext<'_>,
    year: Year,
    site: &SiteTech,
) -> ModelResult<Option<Row>> {
    let v = ctx.at(year, site)?;
    let f_scrap = ctx.params(site)?.scrap;
    Ok(Some(Row::eq(v.scrap_dec, f_scrap * v.decommissioned)))
}

/// Scrap drawn back into secondary manufacturing.
fn scrap_recovered(ctx: &RuleContext<'_>, year: Year, site: &SiteTech) -> ModelResult<Option<Row>> {
    let v = ctx.at(year, site)?;
    let ratio = ctx.params(site)?.scrap_recovery_ratio();
    Ok(Some(Row::eq(v.scrap_rec, ratio * v.secondary)))
}

/// `Total[y] = Total[y-1] + ScrapDec[y] - ScrapRec[y]`, seeded at `y0`.
fn scrap_total(ctx: &RuleContext<'_>, year: Year, site: &SiteTech) -> ModelResult<Option<Row>> {
    let v = ctx.at(year, site)?;
    let seed = ctx.params(site)?.initial_scrap_total;
    let prev = ctx.previous_or_seed(year, site, seed, |p| p.scrap_total)?;
    Ok(Some(Row::eq(v.scrap_total, prev + v.scrap_dec - v.scrap_rec)))
}

fn scrap_cost(ctx: &RuleContext<'_>, year: Year, site: &SiteTech) -> ModelResult<Option<Row>> {
    let v = ctx.at(year, site)?;
    let unit = ctx.yearly(year, site)?.recycling_cost;
    Ok(Some(Row::eq(v.cost_scrap, unit * v.scrap_rec)))
}

/// Recovered scrap grows by at most `ir_recycling` per year.
fn recycling_growth(
    ctx: &RuleContext<'_>,
    year: Year,
    site: &SiteTech,
) -> ModelResult<Option<Row>> {
    if !ctx.policy.recycling_growth_limit || ctx.position(year) != YearPosition::Interior {
        return Ok(None);
    }
    let v = ctx.at(year, site)?;
    let prev = ctx.at(year - 1, site)?;
    let rate = ctx.params(site)?.ir_recycling;
    Ok(Some(Row::le(
        v.scrap_rec - prev.scrap_rec,
        rate * prev.scrap_rec,
    )))
}
