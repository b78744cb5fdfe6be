//! Product catalog
//!
//! Read-only mapping from product code to display name and unit price.
//! Prices are snapshotted into cart lines at insertion time, so a later
//! catalog change never alters an open cart.

use std::collections::HashMap;

/// One sellable product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub code: String,
    pub name: String,
    pub unit_price_cents: u64,
}

/// Read-only product registry, keyed by upper-cased code
pub struct Catalog {
    items: HashMap<String, CatalogItem>,
}

impl Catalog {
    pub fn from_items(items: impl IntoIterator<Item = CatalogItem>) -> Self {
        let items = items
            .into_iter()
            .map(|item| (item.code.to_uppercase(), item))
            .collect();
        Self { items }
    }

    /// The stock catalog served when no external source is configured
    pub fn with_defaults() -> Self {
        Self::from_items([
            item("A12", "Café de la casa 500g", 1500),
            item("B05", "Chocolate de mesa", 1800),
            item("C07", "Panela orgánica x3", 950),
            item("D21", "Miel de abejas 300ml", 2200),
            item("E02", "Aromática de frutas", 700),
        ])
    }

    /// Case-insensitive lookup. Codes are normalized upper-case on both
    /// sides; no side effects.
    pub fn lookup(&self, code: &str) -> Option<&CatalogItem> {
        self.items.get(&code.to_uppercase())
    }

    /// All entries in stable code order, for menu rendering
    pub fn listing(&self) -> Vec<&CatalogItem> {
        let mut entries: Vec<&CatalogItem> = self.items.values().collect();
        entries.sort_by(|a, b| a.code.cmp(&b.code));
        entries
    }
}

fn item(code: &str, name: &str, unit_price_cents: u64) -> CatalogItem {
    CatalogItem {
        code: code.to_string(),
        name: name.to_string(),
        unit_price_cents,
    }
}

/// Render integer cents as "$12.34"
pub fn format_cents(cents: u64) -> String {
    format!("${}.{:02}", cents / 100, cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let catalog = Catalog::with_defaults();
        let upper = catalog.lookup("A12").expect("A12 present");
        let lower = catalog.lookup("a12").expect("a12 present");
        assert_eq!(upper, lower);
        assert_eq!(upper.unit_price_cents, 1500);
    }

    #[test]
    fn unknown_code_is_none() {
        let catalog = Catalog::with_defaults();
        assert!(catalog.lookup("Z99").is_none());
    }

    #[test]
    fn listing_is_sorted_by_code() {
        let catalog = Catalog::with_defaults();
        let codes: Vec<&str> = catalog.listing().iter().map(|i| i.code.as_str()).collect();
        let mut sorted = codes.clone();
        sorted.sort_unstable();
        assert_eq!(codes, sorted);
    }

    #[test]
    fn formats_cents_with_two_decimals() {
        assert_eq!(format_cents(4800), "$48.00");
        assert_eq!(format_cents(950), "$9.50");
        assert_eq!(format_cents(7), "$0.07");
    }
}
