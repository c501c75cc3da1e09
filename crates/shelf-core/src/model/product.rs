use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A stored product.
///
/// `category` is a denormalized copy of the referenced category's name. The
/// store rewrites it on every product write and on category rename; any
/// caller-supplied value is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Canonical digit form.
    pub gtin: String,
    pub category_id: String,
    pub category: String,
    pub price: Decimal,
    pub stock: i64,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a product. Also the shape of a fully merged update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub gtin: String,
    pub category_id: String,
    pub price: Decimal,
    pub stock: i64,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Partial update. `None` keeps the stored value; `image_url: Some("")`
/// clears the image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub gtin: Option<String>,
    pub category_id: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i64>,
    pub image_url: Option<String>,
}

impl ProductPatch {
    /// Merge onto a stored product, producing the full candidate record that
    /// gets revalidated before it is written.
    #[must_use]
    pub fn merge_onto(self, current: &Product) -> NewProduct {
        NewProduct {
            name: self.name.unwrap_or_else(|| current.name.clone()),
            description: self
                .description
                .unwrap_or_else(|| current.description.clone()),
            gtin: self.gtin.unwrap_or_else(|| current.gtin.clone()),
            category_id: self
                .category_id
                .unwrap_or_else(|| current.category_id.clone()),
            price: self.price.unwrap_or(current.price),
            stock: self.stock.unwrap_or(current.stock),
            image_url: self.image_url.or_else(|| current.image_url.clone()),
        }
    }

    /// True when the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.gtin.is_none()
            && self.category_id.is_none()
            && self.price.is_none()
            && self.stock.is_none()
            && self.image_url.is_none()
    }
}

impl Product {
    /// Stock value (`price × stock`) of this product, saturating at
    /// [`Decimal::MAX`].
    #[must_use]
    pub fn stock_value(&self) -> Decimal {
        self.price.saturating_mul(Decimal::from(self.stock))
    }
}
