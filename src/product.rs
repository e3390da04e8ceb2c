/// Column order of the exported catalog; matches the field order of [`Product`].
pub const PRODUCT_FIELDS: [&str; 5] = ["title", "description", "price", "rating", "num_of_reviews"];

/// One product card, built once from a single listing element.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub rating: u32,
    pub num_of_reviews: u32,
}

pub fn product_header() -> Vec<String> {
    PRODUCT_FIELDS.iter().map(|f| f.to_string()).collect()
}
