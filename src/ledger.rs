//! Stock ledger: the clamp rules for inventory cells.
//!
//! Every operation returns a whole updated [`Design`] so the caller can
//! persist it with a single upsert. Re-applying the same write is harmless.

use tracing::debug;

use crate::domain::{clamp_count, Category, Design, Size};
use crate::error::LedgerError;

/// Result of a ledger operation on one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct StockChange {
    pub design: Design,
    pub category: Category,
    pub size: Size,
    pub previous: u32,
    pub count: u32,
}

/// Reduces a cell by `amount`, stopping at zero.
pub fn decrement(
    design: &Design,
    category: Category,
    size: Size,
    amount: u32,
) -> Result<StockChange, LedgerError> {
    let previous = current(design, category, size)?;
    let count = previous.saturating_sub(amount);
    debug!(design_id = %design.id, %category, %size, previous, count, "Decrementing stock");
    Ok(write(design, category, size, previous, count))
}

/// Overwrites a cell; negative values are stored as zero.
pub fn set_value(
    design: &Design,
    category: Category,
    size: Size,
    value: i64,
) -> Result<StockChange, LedgerError> {
    let previous = current(design, category, size)?;
    let count = clamp_count(value);
    Ok(write(design, category, size, previous, count))
}

fn current(design: &Design, category: Category, size: Size) -> Result<u32, LedgerError> {
    design
        .inventory
        .get(category, size)
        .ok_or(LedgerError::SizeOutOfRange { category, size })
}

fn write(design: &Design, category: Category, size: Size, previous: u32, count: u32) -> StockChange {
    let mut updated = design.clone();
    // category/size were validated by `current`
    updated.inventory.set(category, size, count);
    StockChange {
        design: updated,
        category,
        size,
        previous,
        count,
    }
}

/// Catalog-wide stock figures for the staff dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockSummary {
    pub designs: usize,
    pub total_units: u64,
    /// Cells holding exactly one unit.
    pub low_stock_cells: usize,
}

pub fn summarize(designs: &[Design]) -> StockSummary {
    designs.iter().fold(
        StockSummary {
            designs: designs.len(),
            ..Default::default()
        },
        |mut summary, design| {
            for (_, _, count) in design.inventory.cells() {
                summary.total_units += u64::from(count);
                if count > 0 && count < 2 {
                    summary.low_stock_cells += 1;
                }
            }
            summary
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{seed_catalog, AdultSize, KidsSize};
    use assert_matches::assert_matches;

    fn design() -> Design {
        seed_catalog().remove(0)
    }

    #[test]
    fn decrement_matches_clamped_subtraction() {
        let design = design();
        for (category, size, count) in design.inventory.cells() {
            for amount in [0, 1, 2, 5, 50] {
                let change = decrement(&design, category, size, amount).unwrap();
                let expected = (i64::from(count) - i64::from(amount)).max(0) as u32;
                assert_eq!(change.count, expected);
                assert_eq!(change.design.inventory.get(category, size), Some(expected));
            }
        }
    }

    #[test]
    fn decrement_leaves_other_cells_alone() {
        let design = design();
        let size = Size::Adult(AdultSize::Xxl);
        let change = decrement(&design, Category::Men, size, 1).unwrap();

        assert_eq!(change.previous, 9);
        assert_eq!(change.count, 8);
        assert_eq!(change.design.inventory.boys, design.inventory.boys);
        assert_eq!(change.design.inventory.men.get(AdultSize::ThreeXl), 3);
    }

    #[test]
    fn set_value_ignores_negative_stock() {
        let design = design();
        let size = Size::Kids(KidsSize::Age4To5);
        let change = set_value(&design, Category::Boys, size, -7).unwrap();
        assert_eq!(change.count, 0);

        let change = set_value(&design, Category::Boys, size, 12).unwrap();
        assert_eq!(change.design.inventory.boys.get(KidsSize::Age4To5), 12);
    }

    #[test]
    fn mismatched_size_is_rejected() {
        let result = decrement(&design(), Category::Women, Size::Kids(KidsSize::Age0To1), 1);
        assert_matches!(result, Err(LedgerError::SizeOutOfRange { category: Category::Women, .. }));
    }

    #[test]
    fn summary_counts_units_and_single_unit_cells() {
        let summary = summarize(&seed_catalog());
        assert_eq!(summary.designs, 1);
        // men 12, boys 41, girls 24
        assert_eq!(summary.total_units, 77);
        // boys 7-8 is the only cell with exactly one unit
        assert_eq!(summary.low_stock_cells, 1);
    }
}
