//! Scenario and policy rules. Each one is switched by [`PolicyConfig`].
//!
//! [`PolicyConfig`]: crate::extension::PolicyConfig

use super::{Row, Rule, RuleContext, RuleFamily, RuleKind};
use crate::extension::error::ModelResult;
use crate::extension::problem::BenchmarkVariant;
use circap_core::{SiteTech, Year};
use good_lp::Expression;

pub(crate) const RULES: &[Rule] = &[
    Rule {
        name: "domestic_benchmark",
        family: RuleFamily::Benchmark,
        kind: RuleKind::Yearly(domestic_benchmark),
    },
    Rule {
        name: "minimum_stock",
        family: RuleFamily::MinimumStock,
        kind: RuleKind::Yearly(minimum_stock),
    },
    Rule {
        name: "cumulative_cap",
        family: RuleFamily::CumulativeCap,
        kind: RuleKind::Aggregate(cumulative_caps),
    },
];

/// Non-import channels supply at least `share` of new capacity.
fn domestic_benchmark(
    ctx: &RuleContext<'_>,
    year: Year,
    site: &SiteTech,
) -> ModelResult<Option<Row>> {
    let Some(rule) = ctx.policy.benchmark else {
        return Ok(None);
    };
    let v = ctx.at(year, site)?;
    let domestic = match rule.variant {
        BenchmarkVariant::NetStock => v.primary + v.secondary + v.stockout - v.stock_imported,
        BenchmarkVariant::DomesticOnly => v.primary + v.secondary,
    };
    Ok(Some(Row::ge(domestic, rule.share * v.capacity_new)))
}

fn minimum_stock(ctx: &RuleContext<'_>, year: Year, site: &SiteTech) -> ModelResult<Option<Row>> {
    if !ctx.policy.minimum_stock {
        return Ok(None);
    }
    let v = ctx.at(year, site)?;
    let level = ctx.yearly(year, site)?.stock_level;
    Ok(Some(Row::ge(v.stockpile, level)))
}

/// New capacity of a technology installed in-window up to a milestone year.
fn cumulative_caps(ctx: &RuleContext<'_>) -> ModelResult<Vec<(String, Row)>> {
    let mut rows = Vec::new();
    for cap in &ctx.policy.cumulative_caps {
        if cap.through_year < ctx.data.y0 {
            continue;
        }
        let last = cap.through_year.min(ctx.data.y_end);
        for site in ctx.data.site_techs().filter(|s| s.tech == cap.tech) {
            let mut installed = Expression::from(0.0);
            for year in ctx.data.y0..=last {
                installed += ctx.at(year, site)?.capacity_new;
            }
            rows.push((
                format!("{},{}", cap.through_year, site),
                Row::le(installed, cap.cap),
            ));
        }
    }
    Ok(rows)
}
