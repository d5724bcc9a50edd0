//! Constraint registry
//!
//! Every rule is a plain function from the build context and an index tuple
//! to an optional [`Row`]. `None` means the rule does not apply at that
//! index (for example a predecessor-year rule in the absolute start year).
//! All rules are listed once in [`registry`] and turned into rows in a
//! single pass by [`assemble`].
//!
//! Rules are grouped into [`RuleFamily`]s. Families are the unit of the
//! infeasibility deletion filter: a family can be left out of a build to
//! test whether the remaining model becomes feasible.

mod balance;
mod costs;
mod learning;
mod scenario;
mod scrap;
mod stockpile;

use super::error::ModelResult;
use super::problem::PolicyConfig;
use super::vars::{ExtensionVars, YearVars};
use circap_core::{
    ExtensionData, LearningStep, SiteTech, TechParams, Year, YearPosition, YearlyParams,
};
use good_lp::{constraint, Constraint, Expression, Solution};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

/// Groups of rules that are switched on and off together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleFamily {
    Continuity,
    Composition,
    StockBalance,
    AntiDumping,
    NewCapacityLimit,
    PrimaryRamp,
    SecondaryRamp,
    DomesticContent,
    PrimaryRampDown,
    SecondaryRampDown,
    MaxIntoStock,
    PriceDefinition,
    StepExclusivity,
    PriceMonotonicity,
    SecondaryCumulative,
    StepThreshold,
    ProductBounds,
    Decommissioning,
    ScrapBalance,
    ScrapCost,
    RecyclingGrowth,
    YearlyCosts,
    CostAggregate,
    EnergyBalance,
    Benchmark,
    CumulativeCap,
    MinimumStock,
    /// Rows contributed by the base energy model
    Base,
}

impl RuleFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleFamily::Continuity => "continuity",
            RuleFamily::Composition => "composition",
            RuleFamily::StockBalance => "stock_balance",
            RuleFamily::AntiDumping => "anti_dumping",
            RuleFamily::NewCapacityLimit => "new_capacity_limit",
            RuleFamily::PrimaryRamp => "primary_ramp",
            RuleFamily::SecondaryRamp => "secondary_ramp",
            RuleFamily::DomesticContent => "domestic_content",
            RuleFamily::PrimaryRampDown => "primary_ramp_down",
            RuleFamily::SecondaryRampDown => "secondary_ramp_down",
            RuleFamily::MaxIntoStock => "max_into_stock",
            RuleFamily::PriceDefinition => "price_definition",
            RuleFamily::StepExclusivity => "step_exclusivity",
            RuleFamily::PriceMonotonicity => "price_monotonicity",
            RuleFamily::SecondaryCumulative => "secondary_cumulative",
            RuleFamily::StepThreshold => "step_threshold",
            RuleFamily::ProductBounds => "product_bounds",
            RuleFamily::Decommissioning => "decommissioning",
            RuleFamily::ScrapBalance => "scrap_balance",
            RuleFamily::ScrapCost => "scrap_cost",
            RuleFamily::RecyclingGrowth => "recycling_growth",
            RuleFamily::YearlyCosts => "yearly_costs",
            RuleFamily::CostAggregate => "cost_aggregate",
            RuleFamily::EnergyBalance => "energy_balance",
            RuleFamily::Benchmark => "benchmark",
            RuleFamily::CumulativeCap => "cumulative_cap",
            RuleFamily::MinimumStock => "minimum_stock",
            RuleFamily::Base => "base",
        }
    }
}

impl fmt::Display for RuleFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Le,
    Ge,
}

/// `lhs (==|<=|>=) rhs`
#[derive(Debug, Clone)]
pub struct Row {
    pub lhs: Expression,
    pub relation: Relation,
    pub rhs: Expression,
}

impl Row {
    pub fn eq(lhs: impl Into<Expression>, rhs: impl Into<Expression>) -> Self {
        Self::new(lhs, Relation::Eq, rhs)
    }

    pub fn le(lhs: impl Into<Expression>, rhs: impl Into<Expression>) -> Self {
        Self::new(lhs, Relation::Le, rhs)
    }

    pub fn ge(lhs: impl Into<Expression>, rhs: impl Into<Expression>) -> Self {
        Self::new(lhs, Relation::Ge, rhs)
    }

    fn new(lhs: impl Into<Expression>, relation: Relation, rhs: impl Into<Expression>) -> Self {
        Self {
            lhs: lhs.into(),
            relation,
            rhs: rhs.into(),
        }
    }

    pub fn to_constraint(&self) -> Constraint {
        let lhs = self.lhs.clone();
        let rhs = self.rhs.clone();
        match self.relation {
            Relation::Eq => constraint!(lhs == rhs),
            Relation::Le => constraint!(lhs <= rhs),
            Relation::Ge => constraint!(lhs >= rhs),
        }
    }

    /// Amount by which the row is violated under `solution` (0 when satisfied).
    pub fn violation(&self, solution: &impl Solution) -> f64 {
        let diff = self.lhs.eval_with(solution) - self.rhs.eval_with(solution);
        match self.relation {
            Relation::Eq => diff.abs(),
            Relation::Le => diff.max(0.0),
            Relation::Ge => (-diff).max(0.0),
        }
    }
}

/// A row tagged with the rule and index that produced it.
#[derive(Debug, Clone)]
pub struct NamedRow {
    pub family: RuleFamily,
    pub name: String,
    pub row: Row,
}

pub(crate) type YearlyRule = fn(&RuleContext<'_>, Year, &SiteTech) -> ModelResult<Option<Row>>;
pub(crate) type StepRule =
    fn(&RuleContext<'_>, Year, &SiteTech, usize, &LearningStep) -> ModelResult<Option<Row>>;
pub(crate) type TimestepRule =
    fn(&RuleContext<'_>, u32, Year, &SiteTech) -> ModelResult<Option<Row>>;
pub(crate) type AggregateRule = fn(&RuleContext<'_>) -> ModelResult<Vec<(String, Row)>>;

/// Index space a rule ranges over.
#[derive(Clone, Copy)]
pub(crate) enum RuleKind {
    /// (year, location, tech)
    Yearly(YearlyRule),
    /// (year, location, tech, learning step)
    PerStep(StepRule),
    /// (timestep, year, location, tech)
    PerTimestep(TimestepRule),
    /// Whole window; the rule names its own rows
    Aggregate(AggregateRule),
}

pub(crate) struct Rule {
    pub name: &'static str,
    pub family: RuleFamily,
    pub kind: RuleKind,
}

/// Everything a rule may read while building rows.
pub struct RuleContext<'a> {
    pub data: &'a ExtensionData,
    pub policy: &'a PolicyConfig,
    pub vars: &'a ExtensionVars,
}

impl<'a> RuleContext<'a> {
    pub fn position(&self, year: Year) -> YearPosition {
        YearPosition::classify(year, self.data.y0, self.policy.epoch_year)
    }

    /// First year of the window: the predecessor is a seed parameter.
    pub fn is_seeded(&self, year: Year) -> bool {
        year == self.data.y0
    }

    pub fn at(&self, year: Year, site: &SiteTech) -> ModelResult<&'a YearVars> {
        self.vars.at(year, site)
    }

    pub fn params(&self, site: &SiteTech) -> ModelResult<&'a TechParams> {
        Ok(self.data.params(site)?)
    }

    pub fn yearly(&self, year: Year, site: &SiteTech) -> ModelResult<&'a YearlyParams> {
        Ok(self.data.yearly(year, site)?)
    }

    /// Predecessor of a yearly quantity: the in-window variable for interior
    /// years, `seed` at the window start, nothing at the absolute start.
    pub fn predecessor(
        &self,
        year: Year,
        site: &SiteTech,
        seed: f64,
        pick: fn(&YearVars) -> good_lp::Variable,
    ) -> ModelResult<Option<Expression>> {
        Ok(match self.position(year) {
            YearPosition::AbsoluteStart => None,
            YearPosition::WindowStart => Some(Expression::from(seed)),
            YearPosition::Interior => Some(pick(self.at(year - 1, site)?).into()),
        })
    }

    /// Like [`predecessor`](Self::predecessor) but only distinguishes the
    /// seeded first year from later ones.
    pub fn previous_or_seed(
        &self,
        year: Year,
        site: &SiteTech,
        seed: f64,
        pick: fn(&YearVars) -> good_lp::Variable,
    ) -> ModelResult<Expression> {
        if self.is_seeded(year) {
            Ok(Expression::from(seed))
        } else {
            Ok(pick(self.at(year - 1, site)?).into())
        }
    }
}

fn registry() -> impl Iterator<Item = &'static Rule> {
    stockpile::RULES
        .iter()
        .chain(learning::RULES.iter())
        .chain(scrap::RULES.iter())
        .chain(costs::RULES.iter())
        .chain(balance::RULES.iter())
        .chain(scenario::RULES.iter())
}

/// Every family the registry can emit rows for.
pub fn registered_families() -> BTreeSet<RuleFamily> {
    registry().map(|r| r.family).collect()
}

/// Build all rows of the window, skipping `disabled` families.
pub fn assemble(
    ctx: &RuleContext<'_>,
    disabled: &BTreeSet<RuleFamily>,
) -> ModelResult<Vec<NamedRow>> {
    let mut rows = Vec::new();
    let mut per_family: BTreeMap<RuleFamily, usize> = BTreeMap::new();
    let sites: Vec<&SiteTech> = ctx.data.site_techs().collect();

    for rule in registry() {
        if disabled.contains(&rule.family) {
            continue;
        }
        let before = rows.len();
        let mut push = |index: String, row: Option<Row>| {
            if let Some(row) = row {
                rows.push(NamedRow {
                    family: rule.family,
                    name: format!("{}[{}]", rule.name, index),
                    row,
                });
            }
        };

        match rule.kind {
            RuleKind::Yearly(f) => {
                for year in ctx.data.years() {
                    for site in &sites {
                        push(format!("{},{}", year, site), f(ctx, year, site)?);
                    }
                }
            }
            RuleKind::PerStep(f) => {
                for year in ctx.data.years() {
                    for site in &sites {
                        let curve = ctx.data.curve_for(&site.tech);
                        for (i, step) in curve.steps.iter().enumerate() {
                            push(
                                format!("{},{},{}", year, site, step.step),
                                f(ctx, year, site, i, step)?,
                            );
                        }
                    }
                }
            }
            RuleKind::PerTimestep(f) => {
                for &t in &ctx.data.timesteps {
                    for year in ctx.data.years() {
                        for site in &sites {
                            push(format!("{},{},{}", t, year, site), f(ctx, t, year, site)?);
                        }
                    }
                }
            }
            RuleKind::Aggregate(f) => {
                for (index, row) in f(ctx)? {
                    push(index, Some(row));
                }
            }
        }
        *per_family.entry(rule.family).or_default() += rows.len() - before;
    }

    for (family, count) in &per_family {
        debug!(family = %family, rows = count, "registered constraint rows");
    }
    Ok(rows)
}
