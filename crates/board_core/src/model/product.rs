//! Catalog product model.

use super::{require_text, ProductId, ValidationError};
use serde::{Deserialize, Serialize};

pub const NAME_MAX_CHARS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Food,
    Fashion,
    Electronic,
}

impl Category {
    pub(crate) fn as_db(self) -> &'static str {
        match self {
            Self::Food => "FOOD",
            Self::Fashion => "FASHION",
            Self::Electronic => "ELECTRONIC",
        }
    }

    pub(crate) fn parse_db(value: &str) -> Option<Self> {
        match value {
            "FOOD" => Some(Self::Food),
            "FASHION" => Some(Self::Fashion),
            "ELECTRONIC" => Some(Self::Electronic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// Unique across the catalog.
    pub name: String,
    pub price: i64,
    pub category: Option<Category>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Product {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.name, self.price)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: i64,
    pub category: Option<Category>,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, price: i64, category: Option<Category>) -> Self {
        Self {
            name: name.into(),
            price,
            category,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.name, self.price)
    }
}

fn validate_fields(name: &str, price: i64) -> Result<(), ValidationError> {
    require_text("name", name, 1, NAME_MAX_CHARS)?;
    if price < 0 {
        return Err(ValidationError::Negative {
            field: "price",
            value: price,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Category, NewProduct};

    #[test]
    fn category_db_values_roundtrip() {
        for category in [Category::Food, Category::Fashion, Category::Electronic] {
            assert_eq!(Category::parse_db(category.as_db()), Some(category));
        }
        assert_eq!(Category::parse_db("food"), None);
    }

    #[test]
    fn negative_price_is_rejected() {
        assert!(NewProduct::new("pencil", -1, None).validate().is_err());
        assert!(NewProduct::new("pencil", 0, None).validate().is_ok());
    }
}
