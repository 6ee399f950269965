use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopledger_core::{DomainError, DomainResult, Entity, Money, ProductId};

/// Default low-stock threshold for new catalog entries.
pub const DEFAULT_MIN_STOCK: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Fruits,
    Vegetables,
    Groceries,
    Dairy,
    Meat,
    Beverages,
    Other,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Fruits => "fruits",
            Category::Vegetables => "vegetables",
            Category::Groceries => "groceries",
            Category::Dairy => "dairy",
            Category::Meat => "meat",
            Category::Beverages => "beverages",
            Category::Other => "other",
        }
    }
}

impl core::str::FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fruits" => Ok(Category::Fruits),
            "vegetables" => Ok(Category::Vegetables),
            "groceries" => Ok(Category::Groceries),
            "dairy" => Ok(Category::Dairy),
            "meat" => Ok(Category::Meat),
            "beverages" => Ok(Category::Beverages),
            "other" => Ok(Category::Other),
            other => Err(DomainError::validation(format!("unknown category '{other}'"))),
        }
    }
}

/// Unit of measure a product is sold and stocked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Kg,
    G,
    L,
    Ml,
    Unit,
    Pack,
}

impl Unit {
    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Kg => "kg",
            Unit::G => "g",
            Unit::L => "l",
            Unit::Ml => "ml",
            Unit::Unit => "unit",
            Unit::Pack => "pack",
        }
    }
}

impl core::str::FromStr for Unit {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kg" => Ok(Unit::Kg),
            "g" => Ok(Unit::G),
            "l" => Ok(Unit::L),
            "ml" => Ok(Unit::Ml),
            "unit" => Ok(Unit::Unit),
            "pack" => Ok(Unit::Pack),
            other => Err(DomainError::validation(format!("unknown unit '{other}'"))),
        }
    }
}

/// Catalog entry.
///
/// Identity is immutable; price, cost and threshold are managed by catalog
/// maintenance. Products are never hard-deleted while lots or sale history
/// reference them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub category: Category,
    pub barcode: Option<String>,
    pub unit: Unit,
    pub price: Money,
    pub cost: Option<Money>,
    /// Total stock at or below this level raises a low-stock alert.
    pub min_stock: i64,
    pub is_perishable: bool,
    pub created_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Input for creating a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: Category,
    #[serde(default)]
    pub barcode: Option<String>,
    pub unit: Unit,
    pub price: Money,
    #[serde(default)]
    pub cost: Option<Money>,
    #[serde(default)]
    pub min_stock: Option<i64>,
    #[serde(default)]
    pub is_perishable: bool,
}

impl NewProduct {
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.price.is_negative() {
            return Err(DomainError::validation("price cannot be negative"));
        }
        if self.cost.is_some_and(Money::is_negative) {
            return Err(DomainError::validation("cost cannot be negative"));
        }
        if self.min_stock.is_some_and(|m| m < 0) {
            return Err(DomainError::validation("min_stock cannot be negative"));
        }
        Ok(())
    }

    /// Validate and materialise the product row.
    pub fn into_product(self, id: ProductId, created_at: DateTime<Utc>) -> DomainResult<Product> {
        self.validate()?;
        Ok(Product {
            id,
            name: self.name.trim().to_string(),
            description: self.description,
            category: self.category,
            barcode: self.barcode,
            unit: self.unit,
            price: self.price,
            cost: self.cost,
            min_stock: self.min_stock.unwrap_or(DEFAULT_MIN_STOCK),
            is_perishable: self.is_perishable,
            created_at,
        })
    }
}

/// Partial change of a catalog entry. Absent fields are left as they are.
///
/// The unit of measure is fixed once lots exist in it, so it is not part of
/// an update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub cost: Option<Money>,
    #[serde(default)]
    pub min_stock: Option<i64>,
    #[serde(default)]
    pub is_perishable: Option<bool>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl Product {
    /// Apply `update`, leaving the product untouched when any field is invalid.
    pub fn apply(&mut self, update: ProductUpdate) -> DomainResult<()> {
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name cannot be empty"));
            }
        }
        if update.price.is_some_and(Money::is_negative) {
            return Err(DomainError::validation("price cannot be negative"));
        }
        if update.cost.is_some_and(Money::is_negative) {
            return Err(DomainError::validation("cost cannot be negative"));
        }
        if update.min_stock.is_some_and(|m| m < 0) {
            return Err(DomainError::validation("min_stock cannot be negative"));
        }

        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(barcode) = update.barcode {
            self.barcode = Some(barcode);
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(cost) = update.cost {
            self.cost = Some(cost);
        }
        if let Some(min_stock) = update.min_stock {
            self.min_stock = min_stock;
        }
        if let Some(is_perishable) = update.is_perishable {
            self.is_perishable = is_perishable;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_product() -> NewProduct {
        NewProduct {
            name: " Manzana roja ".to_string(),
            description: None,
            category: Category::Fruits,
            barcode: None,
            unit: Unit::Kg,
            price: Money::from_cents(4500),
            cost: Some(Money::from_cents(3000)),
            min_stock: None,
            is_perishable: true,
        }
    }

    #[test]
    fn into_product_applies_default_threshold_and_trims_name() {
        let p = new_product()
            .into_product(ProductId::new(), Utc::now())
            .unwrap();
        assert_eq!(p.min_stock, DEFAULT_MIN_STOCK);
        assert_eq!(p.name, "Manzana roja");
    }

    #[test]
    fn negative_price_is_rejected() {
        let mut np = new_product();
        np.price = Money::from_cents(-1);
        match np.validate().unwrap_err() {
            DomainError::Validation(msg) if msg.contains("price") => {}
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn category_and_unit_parse_case_insensitively() {
        assert_eq!("Dairy".parse::<Category>().unwrap(), Category::Dairy);
        assert_eq!("ML".parse::<Unit>().unwrap(), Unit::Ml);
        assert!("bulk".parse::<Unit>().is_err());
    }

    #[test]
    fn update_changes_only_given_fields_and_is_all_or_nothing() {
        let mut p = new_product().into_product(ProductId::new(), Utc::now()).unwrap();
        let before = p.clone();

        let bad = ProductUpdate {
            price: Some(Money::from_cents(5000)),
            min_stock: Some(-1),
            ..ProductUpdate::default()
        };
        assert!(p.apply(bad).is_err());
        assert_eq!(p, before);

        p.apply(ProductUpdate {
            price: Some(Money::from_cents(5200)),
            min_stock: Some(4),
            ..ProductUpdate::default()
        })
        .unwrap();
        assert_eq!(p.price, Money::from_cents(5200));
        assert_eq!(p.min_stock, 4);
        assert_eq!(p.name, before.name);
        assert_eq!(p.cost, before.cost);
        assert!(ProductUpdate::default().is_empty());
    }
}
