//! Price-learning-curve linearization for EU-secondary manufacturing.
//!
//! One binary flag per step and year selects the active discount. The
//! optimizer picks the step; the threshold rule only gates which steps are
//! reachable given cumulative secondary capacity. The product of the flag
//! and secondary production, which prices the discount, is an auxiliary
//! variable bounded by the three big-M rows below.

use super::{Row, Rule, RuleContext, RuleFamily, RuleKind};
use crate::extension::error::ModelResult;
use circap_core::{LearningStep, SiteTech, Year};
use good_lp::Expression;

pub(crate) const RULES: &[Rule] = &[
    Rule {
        name: "price_definition",
        family: RuleFamily::PriceDefinition,
        kind: RuleKind::Yearly(price_definition),
    },
    Rule {
        name: "step_exclusivity",
        family: RuleFamily::StepExclusivity,
        kind: RuleKind::Yearly(step_exclusivity),
    },
    Rule {
        name: "price_monotonicity",
        family: RuleFamily::PriceMonotonicity,
        kind: RuleKind::Yearly(price_monotonicity),
    },
    Rule {
        name: "secondary_cumulative",
        family: RuleFamily::SecondaryCumulative,
        kind: RuleKind::Yearly(secondary_cumulative),
    },
    Rule {
        name: "step_threshold",
        family: RuleFamily::StepThreshold,
        kind: RuleKind::Yearly(step_threshold),
    },
    Rule {
        name: "product_upper",
        family: RuleFamily::ProductBounds,
        kind: RuleKind::PerStep(product_upper),
    },
    Rule {
        name: "product_tracking",
        family: RuleFamily::ProductBounds,
        kind: RuleKind::PerStep(product_tracking),
    },
    Rule {
        name: "product_lower",
        family: RuleFamily::ProductBounds,
        kind: RuleKind::PerStep(product_lower),
    },
];

/// `PR[y] = Σ_n P[n] · BD[y,n]`
fn price_definition(
    ctx: &RuleContext<'_>,
    year: Year,
    site: &SiteTech,
) -> ModelResult<Option<Row>> {
    let v = ctx.at(year, site)?;
    let curve = ctx.data.curve_for(&site.tech);
    let mut discount = Expression::from(0.0);
    for (step, flags) in curve.steps.iter().zip(&v.steps) {
        discount += step.price_reduction * flags.active;
    }
    Ok(Some(Row::eq(v.price_reduction, discount)))
}

fn step_exclusivity(
    ctx: &RuleContext<'_>,
    year: Year,
    site: &SiteTech,
) -> ModelResult<Option<Row>> {
    let v = ctx.at(year, site)?;
    let mut active = Expression::from(0.0);
    for flags in &v.steps {
        active += flags.active;
    }
    Ok(Some(Row::le(active, 1.0)))
}

fn price_monotonicity(
    ctx: &RuleContext<'_>,
    year: Year,
    site: &SiteTech,
) -> ModelResult<Option<Row>> {
    let seed = ctx.params(site)?.price_reduction_init;
    let Some(prev) = ctx.predecessor(year, site, seed, |v| v.price_reduction)? else {
        return Ok(None);
    };
    Ok(Some(Row::ge(ctx.at(year, site)?.price_reduction, prev)))
}

/// `Cum[y] = carried cumulative + Σ_{y0..=y} Secondary`, as a recurrence.
fn secondary_cumulative(
    ctx: &RuleContext<'_>,
    year: Year,
    site: &SiteTech,
) -> ModelResult<Option<Row>> {
    let v = ctx.at(year, site)?;
    let seed = ctx.params(site)?.initial_secondary_cap;
    let prev = ctx.previous_or_seed(year, site, seed, |p| p.secondary_cumulative)?;
    Ok(Some(Row::eq(v.secondary_cumulative, prev + v.secondary)))
}

/// `Σ_n threshold[n] · BD[y,n] <= Cum[y]`
fn step_threshold(ctx: &RuleContext<'_>, year: Year, site: &SiteTech) -> ModelResult<Option<Row>> {
    let v = ctx.at(year, site)?;
    let curve = ctx.data.curve_for(&site.tech);
    let mut required = Expression::from(0.0);
    for (step, flags) in curve.steps.iter().zip(&v.steps) {
        required += step.capacity_threshold * flags.active;
    }
    Ok(Some(Row::le(required, v.secondary_cumulative)))
}

/// Big-M of the product rows. Without reuse headroom `Secondary[y]` never
/// exceeds the installable ceiling, which then replaces the configured constant.
fn product_bound(ctx: &RuleContext<'_>, year: Year, site: &SiteTech) -> ModelResult<f64> {
    let big_m = ctx.policy.big_m;
    if ctx.policy.reuse_headroom {
        return Ok(big_m);
    }
    Ok(big_m.min(ctx.yearly(year, site)?.installable_capacity.max(0.0)))
}

/// `Z[y,n] <= M · BD[y,n]`
fn product_upper(
    ctx: &RuleContext<'_>,
    year: Year,
    site: &SiteTech,
    i: usize,
    _step: &LearningStep,
) -> ModelResult<Option<Row>> {
    let s = ctx.vars.step(year, site, i)?;
    Ok(Some(Row::le(s.product, product_bound(ctx, year, site)? * s.active)))
}

/// `Z[y,n] <= Secondary[y]`
fn product_tracking(
    ctx: &RuleContext<'_>,
    year: Year,
    site: &SiteTech,
    i: usize,
    _step: &LearningStep,
) -> ModelResult<Option<Row>> {
    let s = ctx.vars.step(year, site, i)?;
    Ok(Some(Row::le(s.product, ctx.at(year, site)?.secondary)))
}

/// `Z[y,n] >= Secondary[y] - M · (1 - BD[y,n])`
fn product_lower(
    ctx: &RuleContext<'_>,
    year: Year,
    site: &SiteTech,
    i: usize,
    _step: &LearningStep,
) -> ModelResult<Option<Row>> {
    let s = ctx.vars.step(year, site, i)?;
    let big_m = product_bound(ctx, year, site)?;
    Ok(Some(Row::ge(
        s.product,
        Expression::from(ctx.at(year, site)?.secondary) - big_m + big_m * s.active,
    )))
}
