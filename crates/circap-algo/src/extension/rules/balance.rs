//! Energy delivered by extension capacity.
//!
//! `Balance[t,y] = Capacity[y] · lf[t,y] · hours`, once for extended capacity
//! (the term injected into the base model's electricity balance) and once
//! per supply channel for reporting.

use super::{Row, Rule, RuleContext, RuleFamily, RuleKind};
use crate::extension::error::ModelResult;
use crate::extension::vars::{BalanceVars, YearVars};
use circap_core::{SiteTech, Year};
use good_lp::Variable;

pub(crate) const RULES: &[Rule] = &[
    Rule {
        name: "balance_ext",
        family: RuleFamily::EnergyBalance,
        kind: RuleKind::PerTimestep(balance_total),
    },
    Rule {
        name: "balance_import",
        family: RuleFamily::EnergyBalance,
        kind: RuleKind::PerTimestep(balance_import),
    },
    Rule {
        name: "balance_stockout",
        family: RuleFamily::EnergyBalance,
        kind: RuleKind::PerTimestep(balance_stockout),
    },
    Rule {
        name: "balance_primary",
        family: RuleFamily::EnergyBalance,
        kind: RuleKind::PerTimestep(balance_primary),
    },
    Rule {
        name: "balance_secondary",
        family: RuleFamily::EnergyBalance,
        kind: RuleKind::PerTimestep(balance_secondary),
    },
];

fn channel_row(
    ctx: &RuleContext<'_>,
    timestep: u32,
    year: Year,
    site: &SiteTech,
    balance: fn(&BalanceVars) -> Variable,
    capacity: fn(&YearVars) -> Variable,
) -> ModelResult<Option<Row>> {
    let b = ctx.vars.balance_at(timestep, year, site)?;
    let v = ctx.at(year, site)?;
    let factor = ctx.data.load_factor(timestep, year, site) * ctx.data.hours;
    Ok(Some(Row::eq(balance(b), factor * capacity(v))))
}

fn balance_total(
    ctx: &RuleContext<'_>,
    t: u32,
    year: Year,
    site: &SiteTech,
) -> ModelResult<Option<Row>> {
    channel_row(ctx, t, year, site, |b| b.total, |v| v.capacity_ext)
}

fn balance_import(
    ctx: &RuleContext<'_>,
    t: u32,
    year: Year,
    site: &SiteTech,
) -> ModelResult<Option<Row>> {
    channel_row(ctx, t, year, site, |b| b.imported, |v| v.imported)
}

fn balance_stockout(
    ctx: &RuleContext<'_>,
    t: u32,
    year: Year,
    site: &SiteTech,
) -> ModelResult<Option<Row>> {
    channel_row(ctx, t, year, site, |b| b.stockout, |v| v.stockout)
}

fn balance_primary(
    ctx: &RuleContext<'_>,
    t: u32,
    year: Year,
    site: &SiteTech,
) -> ModelResult<Option<Row>> {
    channel_row(ctx, t, year, site, |b| b.primary, |v| v.primary)
}

fn balance_secondary(
    ctx: &RuleContext<'_>,
    t: u32,
    year: Year,
    site: &SiteTech,
) -> ModelResult<Option<Row>> {
    channel_row(ctx, t, year, site, |b| b.secondary, |v| v.secondary)
}
