use crate::engine::Observation;
use crate::error::Result;
use crate::schema::{Asset, CategoryAggregate, Holding, Keyed, ReturnRecord};
use crate::utils::{DateKey, DatedRecord};

/// One entry of an authoritative total series.
#[derive(Debug, Clone, PartialEq)]
pub struct TotalObservation {
    pub date_key: DateKey,
    pub value: Option<f64>,
}

impl TotalObservation {
    pub fn new(date_key: DateKey, value: Option<f64>) -> Self {
        Self { date_key, value }
    }
}

/// A dated record that carries the number shown in a pivot cell.
pub trait Observable: DatedRecord {
    fn observed_value(&self) -> Option<f64>;
}

impl Observable for Holding {
    fn observed_value(&self) -> Option<f64> {
        self.value
    }
}

impl Observable for ReturnRecord {
    fn observed_value(&self) -> Option<f64> {
        self.return_percentage
    }
}

fn observe<R: Observable>(entity_id: &str, records: &[R], out: &mut Vec<Observation>) -> Result<()> {
    for record in records {
        out.push(Observation::new(
            entity_id,
            record.date_key()?,
            record.observed_value(),
        ));
    }
    Ok(())
}

fn observe_assets<R, F>(categories: &Keyed<Vec<Asset>>, records: F) -> Result<Vec<Observation>>
where
    R: Observable,
    F: Fn(&Asset) -> &[R],
{
    let mut observations = Vec::new();
    for (_, assets) in categories.iter() {
        for asset in assets {
            observe(&asset.id, records(asset), &mut observations)?;
        }
    }
    Ok(observations)
}

fn observe_categories<R, F>(
    categories: &Keyed<CategoryAggregate>,
    records: F,
) -> Result<Vec<Observation>>
where
    R: Observable,
    F: Fn(&CategoryAggregate) -> &[R],
{
    let mut observations = Vec::new();
    for (category, aggregate) in categories.iter() {
        observe(category, records(aggregate), &mut observations)?;
    }
    Ok(observations)
}

fn observe_totals<R: Observable>(records: &[R]) -> Result<Vec<TotalObservation>> {
    records
        .iter()
        .map(|r| Ok(TotalObservation::new(r.date_key()?, r.observed_value())))
        .collect()
}

/// `(asset id, date, value)` for every holding, in category then asset order.
pub fn holding_observations(categories: &Keyed<Vec<Asset>>) -> Result<Vec<Observation>> {
    observe_assets(categories, |asset| asset.holdings.as_slice())
}

/// `(asset id, start date, return percentage)` for every return record.
pub fn asset_return_observations(categories: &Keyed<Vec<Asset>>) -> Result<Vec<Observation>> {
    observe_assets(categories, |asset| asset.returns_by_date_range.as_slice())
}

pub fn category_holding_observations(
    categories: &Keyed<CategoryAggregate>,
) -> Result<Vec<Observation>> {
    observe_categories(categories, |aggregate| aggregate.holdings.as_slice())
}

pub fn category_return_observations(
    categories: &Keyed<CategoryAggregate>,
) -> Result<Vec<Observation>> {
    observe_categories(categories, |aggregate| {
        aggregate.returns_by_date_range.as_slice()
    })
}

pub fn total_holding_observations(totals: &[Holding]) -> Result<Vec<TotalObservation>> {
    observe_totals(totals)
}

pub fn total_return_observations(totals: &[ReturnRecord]) -> Result<Vec<TotalObservation>> {
    observe_totals(totals)
}
