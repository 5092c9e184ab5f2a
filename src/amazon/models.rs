//! Data models for scraped Amazon search results.

use serde::{Deserialize, Serialize};

/// Placeholder for any field that could not be extracted.
pub const NOT_AVAILABLE: &str = "N/A";

/// One product card from a search results page.
///
/// Every field is always populated. Values that could not be extracted hold
/// [`NOT_AVAILABLE`] instead of being omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Product title
    pub title: String,
    /// Raw price text, e.g. "$29.99"
    pub price: String,
    /// Amazon Standard Identification Number
    pub asin: String,
    /// Raw rating text, e.g. "4.5 out of 5 stars"
    pub rating: String,
    /// Raw review count text, e.g. "1,234"
    pub reviews: String,
    /// Absolute image URL
    pub image_url: String,
    /// Absolute product page URL
    pub product_url: String,
}

impl ProductRecord {
    fn is_missing(value: &str) -> bool {
        value == NOT_AVAILABLE
    }

    /// Number of fields that fell back to the placeholder.
    pub fn missing_fields(&self) -> usize {
        [
            &self.title,
            &self.price,
            &self.asin,
            &self.rating,
            &self.reviews,
            &self.image_url,
            &self.product_url,
        ]
        .into_iter()
        .filter(|v| Self::is_missing(v))
        .count()
    }

    /// True when nothing at all was extracted.
    pub fn is_empty(&self) -> bool {
        self.missing_fields() == 7
    }
}

impl Default for ProductRecord {
    fn default() -> Self {
        let na = || NOT_AVAILABLE.to_string();
        Self {
            title: na(),
            price: na(),
            asin: na(),
            rating: na(),
            reviews: na(),
            image_url: na(),
            product_url: na(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_record() -> ProductRecord {
        ProductRecord {
            title: "Test Headphones".to_string(),
            price: "$29.99".to_string(),
            asin: "B0TEST1234".to_string(),
            rating: "4.5 out of 5 stars".to_string(),
            reviews: "1,234".to_string(),
            image_url: "https://m.media-amazon.com/images/I/test.jpg".to_string(),
            product_url: "https://www.amazon.com/dp/B0TEST1234".to_string(),
        }
    }

    #[test]
    fn test_default_is_all_placeholders() {
        let record = ProductRecord::default();
        assert_eq!(record.title, "N/A");
        assert_eq!(record.product_url, "N/A");
        assert_eq!(record.missing_fields(), 7);
        assert!(record.is_empty());
    }

    #[test]
    fn test_missing_fields() {
        let mut record = make_test_record();
        assert_eq!(record.missing_fields(), 0);

        record.price = NOT_AVAILABLE.to_string();
        record.reviews = NOT_AVAILABLE.to_string();
        assert_eq!(record.missing_fields(), 2);
        assert!(!record.is_empty());
    }

    #[test]
    fn test_serialized_field_names() {
        let value = serde_json::to_value(ProductRecord::default()).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 7);
        for key in ["title", "price", "asin", "rating", "reviews", "image_url", "product_url"] {
            assert_eq!(object.get(key).and_then(|v| v.as_str()), Some("N/A"), "field {key}");
        }
    }

    #[test]
    fn test_record_serde() {
        let record = make_test_record();
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("B0TEST1234"));
        assert!(json.contains("4.5 out of 5 stars"));

        let parsed: ProductRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }
}
