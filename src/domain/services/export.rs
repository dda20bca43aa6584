//! Tabular export of variant trees
//!
//! Rows come straight from [`breakdown`], so an exported sheet always matches
//! the on-screen breakdown and the dashboard total.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::domain::aggregates::variant::Variant;
use crate::domain::services::aggregator::breakdown;
use crate::domain::value_objects::Money;

pub const EXPORT_COLUMNS: [&str; 5] = ["Variant", "SKU", "Quantity", "Min Qty", "Value"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    pub path: String,
    pub sku: Option<String>,
    pub quantity: u32,
    pub minimum_quantity: Option<u32>,
    /// `unit price × quantity`, when the product has a price.
    pub value: Option<Money>,
}

pub fn export_rows(variants: &[Variant], unit_price: Option<&Money>) -> Vec<ExportRow> {
    breakdown(variants)
        .into_iter()
        .map(|row| ExportRow {
            value: unit_price.map(|price| price.multiply(row.quantity)),
            path: row.path,
            sku: row.sku,
            quantity: row.quantity,
            minimum_quantity: row.minimum_quantity,
        })
        .collect()
}

/// A titled sheet of export rows with its totals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportTable {
    pub title: String,
    pub rows: Vec<ExportRow>,
    pub total_quantity: u64,
    pub total_value: Option<Money>,
}

impl ExportTable {
    pub fn new(title: impl Into<String>, variants: &[Variant], unit_price: Option<&Money>) -> Self {
        let rows = export_rows(variants, unit_price);
        let total_quantity = rows.iter().map(|r| u64::from(r.quantity)).sum();
        let total_value = unit_price.map(|price| {
            let amount = rows.iter().filter_map(|r| r.value.as_ref()).map(Money::amount).sum::<Decimal>();
            Money::new(amount, price.currency())
        });
        Self { title: title.into(), rows, total_quantity, total_value }
    }

    /// CSV with a header row and a trailing total row.
    pub fn render_csv(&self) -> String {
        let mut out = String::new();
        push_record(&mut out, EXPORT_COLUMNS.iter().map(|c| c.to_string()));
        for row in &self.rows {
            push_record(&mut out, [
                row.path.clone(),
                row.sku.clone().unwrap_or_default(),
                row.quantity.to_string(),
                row.minimum_quantity.map(|m| m.to_string()).unwrap_or_default(),
                row.value.as_ref().map(Money::to_string).unwrap_or_default(),
            ]);
        }
        push_record(&mut out, [
            "Total".to_string(),
            String::new(),
            self.total_quantity.to_string(),
            String::new(),
            self.total_value.as_ref().map(Money::to_string).unwrap_or_default(),
        ]);
        out
    }
}

fn push_record(out: &mut String, fields: impl IntoIterator<Item = String>) {
    let line: Vec<String> = fields.into_iter().map(|f| escape(&f)).collect();
    out.push_str(&line.join(","));
    out.push_str("\r\n");
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::variant::VariantValue;

    fn tree() -> Vec<Variant> {
        vec![Variant::new("Color", vec![
            VariantValue::branch("Red", vec![Variant::new("Size", vec![
                VariantValue::leaf("S", 2).with_sku("RED-S").with_minimum(1),
                VariantValue::leaf("M", 4),
            ])]),
            VariantValue::leaf("Blue, Navy", 3),
        ])]
    }

    #[test]
    fn test_rows_match_breakdown() {
        let rows = export_rows(&tree(), Some(&Money::from_minor(250, "USD")));
        let paths: Vec<_> = rows.iter().map(|r| r.path.as_str()).collect();
        let expected: Vec<_> = breakdown(&tree()).into_iter().map(|r| r.path).collect();
        assert_eq!(paths, expected);
        assert_eq!(rows[1].value, Some(Money::from_minor(1000, "USD")));
    }

    #[test]
    fn test_table_totals_and_csv() {
        let table = ExportTable::new("Tee", &tree(), Some(&Money::from_minor(250, "USD")));
        assert_eq!(table.total_quantity, 9);
        assert_eq!(table.total_value, Some(Money::from_minor(2250, "USD")));
        let csv = table.render_csv();
        let lines: Vec<_> = csv.split("\r\n").collect();
        assert_eq!(lines[0], "Variant,SKU,Quantity,Min Qty,Value");
        assert_eq!(lines[1], "Color: Red → Size: S,RED-S,2,1,5.00 USD");
        assert_eq!(lines[3], "\"Color: Blue, Navy\",,3,,7.50 USD");
        assert_eq!(lines[4], "Total,,9,,22.50 USD");
    }

    #[test]
    fn test_unpriced_export() {
        let table = ExportTable::new("Tee", &tree(), None);
        assert!(table.rows.iter().all(|r| r.value.is_none()));
        assert!(table.render_csv().ends_with("Total,,9,,\r\n"));
    }
}
