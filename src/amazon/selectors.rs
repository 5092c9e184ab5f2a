//! CSS selectors for Amazon search result pages.
//!
//! This file contains all CSS selectors used for parsing search pages.
//! Update this file when Amazon changes their HTML structure.
//!
//! **Update process**: When parsing fails, capture HTML sample,
//! update selectors, and add test fixture.

use scraper::Selector;
use std::sync::LazyLock;

fn parse(pattern: &str) -> Selector {
    Selector::parse(pattern).unwrap_or_else(|e| panic!("invalid selector {pattern:?}: {e}"))
}

/// Product card containers, most specific first. Only the first selector
/// with any match is used.
pub static CONTAINERS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        "div[data-component-type='s-search-result']",
        "div.s-result-item",
        "div.sg-col-4-of-12",
    ]
    .into_iter()
    .map(parse)
    .collect()
});

/// ASIN attribute on result card.
pub static ASIN_ATTR: &str = "data-asin";

/// Title heading.
pub static TITLE_HEADING: LazyLock<Selector> = LazyLock::new(|| parse("h2"));

/// Title span used by grid layouts.
pub static TITLE_TEXT: LazyLock<Selector> = LazyLock::new(|| parse("span.a-text-normal"));

/// Title in legacy card layouts.
pub static TITLE_LEGACY: LazyLock<Selector> = LazyLock::new(|| parse("h5"));

/// Full price text, e.g. "$29.99".
pub static PRICE_OFFSCREEN: LazyLock<Selector> = LazyLock::new(|| parse("span.a-offscreen"));

/// Whole price (dollars/euros part).
pub static PRICE_WHOLE: LazyLock<Selector> = LazyLock::new(|| parse("span.a-price-whole"));

/// Star rating alt text.
pub static RATING_ALT: LazyLock<Selector> = LazyLock::new(|| parse("span.a-icon-alt"));

/// Star icon (text content used when there is no alt span).
pub static RATING_ICON: LazyLock<Selector> = LazyLock::new(|| parse("i.a-icon-star"));

/// Review count link text.
///
/// Do not add a bare `span.a-size-base` fallback: it also matches brand
/// lines and delivery text.
pub static REVIEW_COUNT: LazyLock<Selector> =
    LazyLock::new(|| parse("span.a-size-base.s-underline-text"));

/// Review count inside the link to the reviews section.
pub static REVIEW_LINK: LazyLock<Selector> =
    LazyLock::new(|| parse("a[href*='customerReviews'] span"));

/// Product image.
pub static IMAGE: LazyLock<Selector> = LazyLock::new(|| parse("img.s-image"));

/// Image inside the thumbnail container.
pub static IMAGE_CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| parse(".s-product-image-container img"));

/// Link wrapping the product image.
pub static PRODUCT_LINK: LazyLock<Selector> =
    LazyLock::new(|| parse("a.a-link-normal.s-no-outline"));

/// Title link for URL extraction.
pub static TITLE_LINK: LazyLock<Selector> = LazyLock::new(|| parse("h2 a.a-link-normal"));

/// Case-insensitive body substrings that mark a bot-detection page.
pub const BLOCK_INDICATORS: &[&str] = &["captcha", "robot check", "verify you're a human"];

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_selectors_compile() {
        // Force evaluation of all lazy selectors to ensure they compile
        assert_eq!(CONTAINERS.len(), 3);
        let _ = &*TITLE_HEADING;
        let _ = &*TITLE_TEXT;
        let _ = &*TITLE_LEGACY;
        let _ = &*PRICE_OFFSCREEN;
        let _ = &*PRICE_WHOLE;
        let _ = &*RATING_ALT;
        let _ = &*RATING_ICON;
        let _ = &*REVIEW_COUNT;
        let _ = &*REVIEW_LINK;
        let _ = &*IMAGE;
        let _ = &*IMAGE_CONTAINER;
        let _ = &*PRODUCT_LINK;
        let _ = &*TITLE_LINK;
    }

    #[test]
    fn test_basic_selector_matching() {
        let html = Html::parse_document(
            r#"<div data-component-type="s-search-result" data-asin="B123">
                <h2><a class="a-link-normal" href="/dp/B123"><span>Test Product</span></a></h2>
            </div>"#,
        );

        let results: Vec<_> = html.select(&CONTAINERS[0]).collect();
        assert_eq!(results.len(), 1);

        let asin = results[0].value().attr(ASIN_ATTR);
        assert_eq!(asin, Some("B123"));
    }

    #[test]
    fn test_product_link_requires_both_classes() {
        let html = Html::parse_document(
            r#"<div>
                <a class="a-link-normal" href="/other">Other</a>
                <a class="a-link-normal s-no-outline" href="/dp/B123">Main</a>
            </div>"#,
        );

        let link = html.select(&PRODUCT_LINK).next().unwrap();
        assert_eq!(link.value().attr("href"), Some("/dp/B123"));
    }
}
