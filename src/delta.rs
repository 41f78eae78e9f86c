use crate::engine::{Cell, PivotRow, PivotTable, TOTAL_COLUMN};
use crate::schema::Keyed;

/// Row-over-row differences share the shape of the table they come from.
pub type DeltaTable = PivotTable;

/// Subtracts each row from the one before it, column by column and for the
/// total. The first row has no baseline and is all sentinels; a sentinel on
/// either side of a subtraction yields a sentinel.
pub fn delta(table: &PivotTable) -> DeltaTable {
    let columns = table.columns().to_vec();

    let rows = table
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let previous = i.checked_sub(1).map(|p| &table.rows()[p]);
            let difference = |column: &str| match previous {
                Some(prev) => row.get(column).minus(&prev.get(column)),
                None => Cell::Missing,
            };

            let cells: Keyed<Cell> = columns
                .iter()
                .map(|column| (column.clone(), difference(column)))
                .collect();
            PivotRow::new(row.date, cells, difference(TOTAL_COLUMN))
        })
        .collect();

    PivotTable::new(columns, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Observation, PivotBuilder};
    use crate::utils::DateKey;
    use chrono::NaiveDate;

    fn day(d: u32) -> DateKey {
        DateKey::Day(NaiveDate::from_ymd_opt(2024, 1, d).unwrap())
    }

    fn table() -> PivotTable {
        PivotBuilder::default().build(vec![
            Observation::new("A", day(1), Some(100.0)),
            Observation::new("B", day(1), Some(50.0)),
            Observation::new("A", day(8), Some(120.0)),
            Observation::new("A", day(15), Some(90.0)),
            Observation::new("B", day(15), Some(55.0)),
        ])
    }

    #[test]
    fn test_first_row_is_all_sentinels() {
        let deltas = delta(&table());
        let first = &deltas.rows()[0];
        assert_eq!(first.date, day(1));
        assert_eq!(first.get("A"), Cell::Missing);
        assert_eq!(first.get("B"), Cell::Missing);
        assert_eq!(first.total, Cell::Missing);
    }

    #[test]
    fn test_numeric_pairs_subtract() {
        let deltas = delta(&table());
        assert_eq!(deltas.columns(), table().columns());
        assert_eq!(deltas.rows()[1].get("A"), Cell::Value(20.0));
        assert_eq!(deltas.rows()[1].total, Cell::Value(-30.0));
        assert_eq!(deltas.rows()[2].get("A"), Cell::Value(-30.0));
        assert_eq!(deltas.rows()[2].total, Cell::Value(25.0));
    }

    #[test]
    fn test_sentinel_operand_propagates() {
        let deltas = delta(&table());
        // B is missing on the 8th, so neither neighbour can be differenced
        assert_eq!(deltas.rows()[1].get("B"), Cell::Missing);
        assert_eq!(deltas.rows()[2].get("B"), Cell::Missing);

        for row in deltas.rows() {
            for column in deltas.columns() {
                let cell = row.get(column);
                if let Cell::Value(_) = cell {
                    let source = table();
                    let idx = source.rows().iter().position(|r| r.date == row.date).unwrap();
                    assert!(idx > 0);
                    assert!(!source.rows()[idx].get(column).is_missing());
                    assert!(!source.rows()[idx - 1].get(column).is_missing());
                }
            }
        }
    }

    #[test]
    fn test_empty_table() {
        let deltas = delta(&PivotTable::default());
        assert!(deltas.is_empty());
    }
}
