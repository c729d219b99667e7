use bulksms_core::types::Context;
use bulksms_core::{BulkSmsError, BulkSmsResult, Recipient};
use serde_json::Value;

/// A fully materialised worksheet. Row 0 is the header row; cells are
/// anchored at column A so column indices match what the user sees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sheet {
    rows: Vec<Vec<Option<String>>>,
    width: usize,
}

impl Sheet {
    pub fn new(rows: Vec<Vec<Option<String>>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        Self { rows, width }
    }

    /// Convenience for building sheets from string literals; empty strings become empty cells.
    pub fn from_strings<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| {
                        let cell = cell.as_ref();
                        (!cell.is_empty()).then(|| cell.to_string())
                    })
                    .collect()
            })
            .collect();
        Self::new(rows)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn row(&self, index: usize) -> Option<&[Option<String>]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Header names from row 1. Empty header cells come back as `""`.
    pub fn header(&self) -> Vec<String> {
        let mut header: Vec<String> = self
            .row(0)
            .unwrap_or_default()
            .iter()
            .map(|cell| cell.clone().unwrap_or_default())
            .collect();
        header.resize(self.width, String::new());
        header
    }

    /// Scan rows 2..N and yield the `column` cell of each row as an address.
    ///
    /// Rows whose target cell is empty are skipped. The remaining cells of a
    /// row are exposed as the recipient's context, keyed by header name.
    pub fn extract_column(&self, column: usize) -> BulkSmsResult<Vec<Recipient>> {
        // No data rows means an empty batch, whatever the index.
        if self.row_count() <= 1 {
            return Ok(Vec::new());
        }
        if column >= self.width {
            return Err(BulkSmsError::InvalidColumn {
                column,
                width: self.width,
            });
        }

        let header = self.header();
        let recipients = self
            .rows
            .iter()
            .skip(1)
            .filter_map(|row| {
                let address = row.get(column)?.as_deref()?.trim();
                if address.is_empty() {
                    return None;
                }
                Some(Recipient::with_context(address, row_context(&header, row)))
            })
            .collect();
        Ok(recipients)
    }
}

fn row_context(header: &[String], row: &[Option<String>]) -> Context {
    let mut context = Context::new();
    for (name, cell) in header.iter().zip(row.iter()) {
        if name.is_empty() {
            continue;
        }
        let value = cell.clone().map(Value::String).unwrap_or(Value::Null);
        context.insert(name.clone(), value);
    }
    context
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_skips_empty_cells() {
        let sheet = Sheet::from_strings([["phone"], ["+1"], [""], ["+2"]]);
        let addresses: Vec<String> = sheet
            .extract_column(0)
            .unwrap()
            .into_iter()
            .map(|r| r.address)
            .collect();
        assert_eq!(addresses, vec!["+1", "+2"]);
    }

    #[test]
    fn test_extract_preserves_order_and_builds_context() {
        let sheet = Sheet::from_strings(vec![
            vec!["name", "phone", ""],
            vec!["Alice", "+15550001", "x"],
            vec!["Bob", "+15550002", ""],
        ]);
        let recipients = sheet.extract_column(1).unwrap();
        assert_eq!(recipients.len(), 2);
        assert_eq!(recipients[0].address, "+15550001");
        assert_eq!(recipients[0].context.get("name"), Some(&json!("Alice")));
        assert_eq!(recipients[1].address, "+15550002");
        // Unnamed header columns stay out of the context.
        assert_eq!(recipients[0].context.len(), 2);
    }

    #[test]
    fn test_short_rows_are_skipped() {
        let sheet = Sheet::from_strings(vec![vec!["a", "phone"], vec!["x"], vec!["y", "+3"]]);
        let recipients = sheet.extract_column(1).unwrap();
        assert_eq!(recipients.len(), 1);
        assert_eq!(recipients[0].address, "+3");
    }

    #[test]
    fn test_out_of_range_column() {
        let sheet = Sheet::from_strings([["phone"], ["+1"]]);
        let err = sheet.extract_column(3).unwrap_err();
        assert!(matches!(err, BulkSmsError::InvalidColumn { column: 3, width: 1 }));
    }

    #[test]
    fn test_header_pads_to_width() {
        let sheet = Sheet::from_strings(vec![vec!["phone"], vec!["+1", "note"]]);
        assert_eq!(sheet.header(), vec!["phone".to_string(), String::new()]);
    }

    #[test]
    fn test_header_only_sheet_yields_nothing() {
        let sheet = Sheet::from_strings([["phone"]]);
        assert!(sheet.extract_column(0).unwrap().is_empty());
    }

    #[test]
    fn test_empty_sheet_yields_nothing() {
        assert!(Sheet::default().extract_column(0).unwrap().is_empty());
        assert!(Sheet::from_strings([["phone"]]).extract_column(4).unwrap().is_empty());
    }
}
