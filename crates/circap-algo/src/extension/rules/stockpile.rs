//! Capacity flow and stockpile rules.

use super::{Row, Rule, RuleContext, RuleFamily, RuleKind};
use crate::extension::error::ModelResult;
use circap_core::{SiteTech, Year};
use good_lp::Expression;

pub(crate) const RULES: &[Rule] = &[
    Rule {
        name: "capacity_continuity",
        family: RuleFamily::Continuity,
        kind: RuleKind::Yearly(capacity_continuity),
    },
    Rule {
        name: "channel_composition",
        family: RuleFamily::Composition,
        kind: RuleKind::Yearly(channel_composition),
    },
    Rule {
        name: "stock_balance",
        family: RuleFamily::StockBalance,
        kind: RuleKind::Yearly(stock_balance),
    },
    Rule {
        name: "anti_dumping",
        family: RuleFamily::AntiDumping,
        kind: RuleKind::Yearly(anti_dumping),
    },
    Rule {
        name: "new_capacity_limit",
        family: RuleFamily::NewCapacityLimit,
        kind: RuleKind::Yearly(new_capacity_limit),
    },
    Rule {
        name: "primary_ramp",
        family: RuleFamily::PrimaryRamp,
        kind: RuleKind::Yearly(primary_ramp),
    },
    Rule {
        name: "secondary_ramp",
        family: RuleFamily::SecondaryRamp,
        kind: RuleKind::Yearly(secondary_ramp),
    },
    Rule {
        name: "domestic_content",
        family: RuleFamily::DomesticContent,
        kind: RuleKind::Yearly(domestic_content),
    },
    Rule {
        name: "primary_ramp_down",
        family: RuleFamily::PrimaryRampDown,
        kind: RuleKind::Yearly(primary_ramp_down),
    },
    Rule {
        name: "secondary_ramp_down",
        family: RuleFamily::SecondaryRampDown,
        kind: RuleKind::Yearly(secondary_ramp_down),
    },
    Rule {
        name: "max_into_stock",
        family: RuleFamily::MaxIntoStock,
        kind: RuleKind::Yearly(max_into_stock),
    },
];

/// `Ext[y] = Ext[y-1] + New[y] - Dec[y]`, seeded with the initial capacity.
fn capacity_continuity(
    ctx: &RuleContext<'_>,
    year: Year,
    site: &SiteTech,
) -> ModelResult<Option<Row>> {
    let v = ctx.at(year, site)?;
    let seed = ctx.params(site)?.initial_capacity;
    let prev = ctx.previous_or_seed(year, site, seed, |p| p.capacity_ext)?;
    Ok(Some(Row::eq(
        v.capacity_ext,
        prev + v.capacity_new - v.decommissioned,
    )))
}

fn channel_composition(
    ctx: &RuleContext<'_>,
    year: Year,
    site: &SiteTech,
) -> ModelResult<Option<Row>> {
    let v = ctx.at(year, site)?;
    Ok(Some(Row::eq(
        v.capacity_new,
        v.imported + v.stockout + v.primary + v.secondary,
    )))
}

/// `Stock[y] = Stock[y-1] + StockImported[y] - Stockout[y]`
fn stock_balance(ctx: &RuleContext<'_>, year: Year, site: &SiteTech) -> ModelResult<Option<Row>> {
    let v = ctx.at(year, site)?;
    let seed = ctx.params(site)?.initial_stockpile;
    let prev = ctx.previous_or_seed(year, site, seed, |p| p.stockpile)?;
    Ok(Some(Row::eq(
        v.stockpile,
        prev + v.stock_imported - v.stockout,
    )))
}

fn anti_dumping(ctx: &RuleContext<'_>, year: Year, site: &SiteTech) -> ModelResult<Option<Row>> {
    let v = ctx.at(year, site)?;
    let index = ctx.params(site)?.anti_dumping_index;
    Ok(Some(Row::eq(
        v.anti_dumping,
        index * (v.imported + v.stock_imported),
    )))
}

/// New capacity stays below the installable ceiling, optionally widened by
/// last year's decommissioned volume.
fn new_capacity_limit(
    ctx: &RuleContext<'_>,
    year: Year,
    site: &SiteTech,
) -> ModelResult<Option<Row>> {
    let v = ctx.at(year, site)?;
    let mut ceiling = Expression::from(ctx.yearly(year, site)?.installable_capacity);
    if ctx.policy.reuse_headroom {
        let seed = ctx.params(site)?.decommission_start;
        ceiling += ctx.previous_or_seed(year, site, seed, |p| p.decommissioned)?;
    }
    Ok(Some(Row::le(v.capacity_new, ceiling)))
}

fn primary_ramp(ctx: &RuleContext<'_>, year: Year, site: &SiteTech) -> ModelResult<Option<Row>> {
    let p = ctx.params(site)?;
    let Some(prev) = ctx.predecessor(year, site, p.last_primary_cap, |v| v.primary)? else {
        return Ok(None);
    };
    let v = ctx.at(year, site)?;
    Ok(Some(Row::le(
        v.primary - prev.clone(),
        p.dq_primary + p.ir_primary * prev,
    )))
}

fn secondary_ramp(ctx: &RuleContext<'_>, year: Year, site: &SiteTech) -> ModelResult<Option<Row>> {
    let p = ctx.params(site)?;
    let Some(prev) = ctx.predecessor(year, site, p.last_secondary_cap, |v| v.secondary)? else {
        return Ok(None);
    };
    let v = ctx.at(year, site)?;
    Ok(Some(Row::le(
        v.secondary - prev.clone(),
        p.dq_secondary + p.ir_secondary * prev,
    )))
}

/// Secondary production is capped at a share of extended capacity.
fn domestic_content(
    ctx: &RuleContext<'_>,
    year: Year,
    site: &SiteTech,
) -> ModelResult<Option<Row>> {
    let v = ctx.at(year, site)?;
    let dcr = ctx.yearly(year, site)?.dcr;
    Ok(Some(Row::le(v.secondary, dcr * v.capacity_ext)))
}

fn primary_ramp_down(
    ctx: &RuleContext<'_>,
    year: Year,
    site: &SiteTech,
) -> ModelResult<Option<Row>> {
    let p = ctx.params(site)?;
    let Some(prev) = ctx.predecessor(year, site, p.last_primary_cap, |v| v.primary)? else {
        return Ok(None);
    };
    let v = ctx.at(year, site)?;
    Ok(Some(Row::ge(v.primary, p.dr_primary * prev)))
}

fn secondary_ramp_down(
    ctx: &RuleContext<'_>,
    year: Year,
    site: &SiteTech,
) -> ModelResult<Option<Row>> {
    let p = ctx.params(site)?;
    let Some(prev) = ctx.predecessor(year, site, p.last_secondary_cap, |v| v.secondary)? else {
        return Ok(None);
    };
    let v = ctx.at(year, site)?;
    Ok(Some(Row::ge(v.secondary, p.dr_secondary * prev)))
}

fn max_into_stock(ctx: &RuleContext<'_>, year: Year, site: &SiteTech) -> ModelResult<Option<Row>> {
    let v = ctx.at(year, site)?;
    Ok(Some(Row::le(
        v.stock_imported,
        ctx.policy.max_stock_in_share * v.imported,
    )))
}
