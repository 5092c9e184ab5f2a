//! HTML parser for Amazon search result pages.
//!
//! Every field is described by an ordered list of extractors. Each extractor
//! is a plain function over a product card that returns `Some` when it found
//! a usable value; the first hit wins and a miss on all of them yields "N/A".

use crate::amazon::error::ExtractionError;
use crate::amazon::models::{ProductRecord, NOT_AVAILABLE};
use crate::amazon::selectors;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, trace, warn};
use url::Url;

/// A single locator for one field of a product card.
pub type Extractor = fn(&ElementRef) -> Option<String>;

/// Title locators, in priority order.
pub const TITLE: &[Extractor] = &[title_heading, title_text, title_legacy];

/// Price locators, in priority order.
pub const PRICE: &[Extractor] = &[price_offscreen, price_whole];

/// ASIN locators.
pub const ASIN: &[Extractor] = &[asin_attr];

/// Rating locators, in priority order.
pub const RATING: &[Extractor] = &[rating_alt, rating_icon];

/// Review count locators, in priority order.
pub const REVIEWS: &[Extractor] = &[review_count, review_link];

/// Image locators. Values are raw `src` attributes.
pub const IMAGE: &[Extractor] = &[image_src, image_container_src];

/// Product link locators. Values are raw `href` attributes.
pub const PRODUCT_URL: &[Extractor] = &[product_link_href, title_link_href];

/// Runs extractors in order and returns the first value found.
pub fn first_match(element: &ElementRef, extractors: &[Extractor]) -> Option<String> {
    extractors.iter().find_map(|extract| extract(element))
}

fn title_heading(e: &ElementRef) -> Option<String> {
    text_of(e, &selectors::TITLE_HEADING)
}

fn title_text(e: &ElementRef) -> Option<String> {
    text_of(e, &selectors::TITLE_TEXT)
}

fn title_legacy(e: &ElementRef) -> Option<String> {
    text_of(e, &selectors::TITLE_LEGACY)
}

fn price_offscreen(e: &ElementRef) -> Option<String> {
    text_of(e, &selectors::PRICE_OFFSCREEN)
}

fn price_whole(e: &ElementRef) -> Option<String> {
    text_of(e, &selectors::PRICE_WHOLE)
}

fn asin_attr(e: &ElementRef) -> Option<String> {
    non_empty(e.value().attr(selectors::ASIN_ATTR))
}

fn rating_alt(e: &ElementRef) -> Option<String> {
    text_of(e, &selectors::RATING_ALT)
}

fn rating_icon(e: &ElementRef) -> Option<String> {
    text_of(e, &selectors::RATING_ICON)
}

// Review counts are always numeric; anything else is a stray label.
fn review_count(e: &ElementRef) -> Option<String> {
    text_of(e, &selectors::REVIEW_COUNT).filter(|t| has_digit(t))
}

fn review_link(e: &ElementRef) -> Option<String> {
    text_of(e, &selectors::REVIEW_LINK).filter(|t| has_digit(t))
}

fn image_src(e: &ElementRef) -> Option<String> {
    attr_of(e, &selectors::IMAGE, "src")
}

fn image_container_src(e: &ElementRef) -> Option<String> {
    attr_of(e, &selectors::IMAGE_CONTAINER, "src")
}

fn product_link_href(e: &ElementRef) -> Option<String> {
    attr_of(e, &selectors::PRODUCT_LINK, "href")
}

fn title_link_href(e: &ElementRef) -> Option<String> {
    attr_of(e, &selectors::TITLE_LINK, "href")
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

/// Text of the first match with non-blank content.
fn text_of(element: &ElementRef, selector: &Selector) -> Option<String> {
    element.select(selector).find_map(|e| {
        let text = e.text().collect::<String>();
        non_empty(Some(text.as_str()))
    })
}

fn attr_of(element: &ElementRef, selector: &Selector, attr: &str) -> Option<String> {
    element.select(selector).find_map(|e| non_empty(e.value().attr(attr)))
}

fn has_digit(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}

/// Parser for Amazon search result pages.
pub struct Parser {
    base_url: Url,
}

impl Parser {
    /// Creates a parser that resolves relative links against `base_url`.
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    /// Parses a search results page into records, in page order.
    ///
    /// Never fails: a page without product cards yields an empty list, and
    /// cards that cannot be turned into a record are logged and skipped.
    pub fn parse_search(&self, html: &str) -> Vec<ProductRecord> {
        let document = Html::parse_document(html);
        let containers = Self::find_containers(&document);
        debug!("Found {} product containers", containers.len());

        let mut records = Vec::with_capacity(containers.len());
        for (index, element) in containers.into_iter().enumerate() {
            match self.parse_product_card(index, element) {
                Ok(record) => {
                    trace!("Parsed product {}: {} - {}", index + 1, record.asin, record.title);
                    records.push(record);
                }
                Err(e) => {
                    warn!("Skipping product card: {}", e);
                }
            }
        }

        debug!("Parsed {} products", records.len());
        records
    }

    /// Returns the cards matched by the first container selector with any
    /// match. Matches from different selectors are never combined.
    fn find_containers(document: &Html) -> Vec<ElementRef<'_>> {
        for selector in selectors::CONTAINERS.iter() {
            let found: Vec<_> = document.select(selector).collect();
            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }

    /// Extracts one record from a product card.
    fn parse_product_card(
        &self,
        index: usize,
        element: ElementRef,
    ) -> Result<ProductRecord, ExtractionError> {
        let image_url = first_match(&element, IMAGE).and_then(|src| self.resolve(&src));
        let product_url = first_match(&element, PRODUCT_URL).and_then(|href| self.resolve(&href));

        let record = ProductRecord {
            title: or_placeholder(first_match(&element, TITLE)),
            price: or_placeholder(first_match(&element, PRICE)),
            asin: or_placeholder(first_match(&element, ASIN)),
            rating: or_placeholder(first_match(&element, RATING)),
            reviews: or_placeholder(first_match(&element, REVIEWS)),
            image_url: or_placeholder(image_url),
            product_url: or_placeholder(product_url),
        };

        if record.is_empty() {
            return Err(ExtractionError::Empty { index });
        }
        Ok(record)
    }

    /// Resolves a possibly relative link against the site base URL.
    fn resolve(&self, link: &str) -> Option<String> {
        match self.base_url.join(link) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                debug!("Could not resolve link {:?}: {}", link, e);
                None
            }
        }
    }
}

fn or_placeholder(value: Option<String>) -> String {
    value.unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Returns the first bot-detection indicator found in `body`, if any.
pub fn detect_block(body: &str) -> Option<&'static str> {
    let lowered = body.to_lowercase();
    selectors::BLOCK_INDICATORS.iter().copied().find(|indicator| lowered.contains(*indicator))
}
