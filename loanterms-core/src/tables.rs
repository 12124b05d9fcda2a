use crate::analysis::layout::{RawAnalyzeResult, RawBoundingRegion, RawTable, RawTableCell};
use crate::types::{BoundingRegion, Point, Table, TableCell};

/// Normalizes provider tables into the canonical model.
///
/// Cell order is whatever the provider reported; no re-sorting happens here.
pub struct TableExtractor;

impl Default for TableExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TableExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, raw: &RawAnalyzeResult) -> Vec<Table> {
        raw.tables.iter().map(Self::convert_table).collect()
    }

    fn convert_table(raw_table: &RawTable) -> Table {
        Table {
            row_count: raw_table.row_count,
            column_count: raw_table.column_count,
            bounding_regions: Self::convert_regions(&raw_table.bounding_regions),
            cells: raw_table.cells.iter().map(Self::convert_cell).collect(),
        }
    }

    fn convert_cell(raw_cell: &RawTableCell) -> TableCell {
        TableCell {
            row_index: raw_cell.row_index,
            column_index: raw_cell.column_index,
            content: raw_cell.content.clone(),
            bounding_regions: Self::convert_regions(&raw_cell.bounding_regions),
        }
    }

    fn convert_regions(regions: &[RawBoundingRegion]) -> Vec<BoundingRegion> {
        regions
            .iter()
            .map(|region| BoundingRegion {
                page_number: region.page_number,
                polygon: Point::polygon_from_flat(&region.polygon),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(row: u32, column: u32, content: &str) -> RawTableCell {
        RawTableCell {
            row_index: row,
            column_index: column,
            content: content.to_string(),
            bounding_regions: vec![],
        }
    }

    #[test]
    fn test_no_tables_yields_empty_sequence() {
        assert!(TableExtractor::new().extract(&RawAnalyzeResult::default()).is_empty());
    }

    #[test]
    fn test_cells_keep_provider_order() {
        let raw = RawAnalyzeResult {
            tables: vec![RawTable {
                row_count: 2,
                column_count: 2,
                bounding_regions: vec![],
                cells: vec![cell(1, 1, "d"), cell(0, 0, "a"), cell(1, 0, "c"), cell(0, 1, "b")],
            }],
            ..Default::default()
        };
        let tables = TableExtractor::new().extract(&raw);
        let order: Vec<_> = tables[0].cells.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(order, vec!["d", "a", "c", "b"]);
        assert_eq!(tables[0].row_count, 2);
        assert_eq!(tables[0].column_count, 2);
    }

    #[test]
    fn test_bounding_regions_map_to_page_and_polygon() {
        let mut first = cell(0, 0, "Rate");
        first.bounding_regions = vec![RawBoundingRegion {
            page_number: 3,
            polygon: vec![1.0, 1.0, 2.0, 1.0],
        }];
        let raw = RawAnalyzeResult {
            tables: vec![RawTable {
                row_count: 1,
                column_count: 1,
                bounding_regions: vec![RawBoundingRegion {
                    page_number: 3,
                    polygon: vec![0.0, 0.0, 5.0, 0.0, 5.0, 5.0, 0.0, 5.0],
                }],
                cells: vec![first],
            }],
            ..Default::default()
        };

        let table = &TableExtractor::new().extract(&raw)[0];
        assert_eq!(table.bounding_regions[0].page_number, 3);
        assert_eq!(table.bounding_regions[0].polygon.len(), 4);
        assert_eq!(
            table.cells[0].bounding_regions[0].polygon,
            vec![Point(1.0, 1.0), Point(2.0, 1.0)]
        );
    }

    #[test]
    fn test_cell_without_regions_gets_empty_sequence() {
        let raw = RawAnalyzeResult {
            tables: vec![RawTable {
                row_count: 1,
                column_count: 1,
                bounding_regions: vec![],
                cells: vec![cell(0, 0, "x")],
            }],
            ..Default::default()
        };
        let table = &TableExtractor::new().extract(&raw)[0];
        assert!(table.bounding_regions.is_empty());
        assert!(table.cells[0].bounding_regions.is_empty());
    }
}
