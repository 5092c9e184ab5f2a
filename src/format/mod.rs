//! Output formatting for scraped records (JSON, table, CSV).

use crate::amazon::ProductRecord;
use crate::config::OutputFormat;

const CSV_COLUMNS: [&str; 7] =
    ["title", "price", "asin", "rating", "reviews", "image_url", "product_url"];

/// Formats records for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a list of records.
    pub fn format_records(&self, records: &[ProductRecord]) -> String {
        if records.is_empty() {
            return match self.format {
                OutputFormat::Json => "[]".to_string(),
                OutputFormat::Csv => CSV_COLUMNS.join(","),
                OutputFormat::Table => "No products found.".to_string(),
            };
        }

        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(records).unwrap_or_else(|_| "[]".to_string())
            }
            OutputFormat::Table => self.table(records),
            OutputFormat::Csv => self.csv(records),
        }
    }

    // Table formatting

    fn table(&self, records: &[ProductRecord]) -> String {
        let asin_width = 10;
        let price_width = 10;
        let rating_width = 6;
        let reviews_width = 9;
        let title_width = 50;

        let mut lines = Vec::new();

        lines.push(format!(
            "{:<asin_width$}  {:<price_width$}  {:<rating_width$}  {:<reviews_width$}  {}",
            "ASIN", "Price", "Rating", "Reviews", "Title"
        ));
        lines.push(format!(
            "{:-<asin_width$}  {:-<price_width$}  {:-<rating_width$}  {:-<reviews_width$}  {:-<title_width$}",
            "", "", "", "", ""
        ));

        for record in records {
            // "4.5 out of 5 stars" -> "4.5"
            let stars = record.rating.split_whitespace().next().unwrap_or(&record.rating);

            lines.push(format!(
                "{:<asin_width$}  {:>price_width$}  {:>rating_width$}  {:>reviews_width$}  {}",
                record.asin,
                record.price,
                stars,
                record.reviews,
                truncate(&record.title, title_width)
            ));
        }

        lines.push(String::new());
        lines.push(format!("Total: {} products", records.len()));

        lines.join("\n")
    }

    // CSV formatting

    fn csv(&self, records: &[ProductRecord]) -> String {
        let mut lines = vec![CSV_COLUMNS.join(",")];

        for record in records {
            let row = [
                &record.title,
                &record.price,
                &record.asin,
                &record.rating,
                &record.reviews,
                &record.image_url,
                &record.product_url,
            ]
            .map(|field| csv_escape(field));
            lines.push(row.join(","));
        }

        lines.join("\n")
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let kept: String = text.chars().take(width - 3).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
