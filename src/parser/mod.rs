pub mod flatten;

use scraper::{Html, Selector};

use crate::error::FetchError;

/// Container holding the rendered article text.
pub const BODY_SELECTOR: &str = "div.note-common-styles__textnote-body";

/// Raw article page → flattened body text with inline link/image markers.
pub fn normalize(html: &str) -> Option<String> {
    let selector = Selector::parse(BODY_SELECTOR).ok()?;
    let document = Html::parse_document(html);
    let body = document.select(&selector).next()?;
    Some(flatten::flatten(body))
}

/// Same as [`normalize`] but reports the missing body as a typed error.
pub fn normalize_article(url: &str, html: &str) -> Result<String, FetchError> {
    normalize(html).ok_or_else(|| FetchError::MissingBody {
        url: url.to_string(),
    })
}
