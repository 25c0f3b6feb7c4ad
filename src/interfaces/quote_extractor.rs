use crate::error::Result;

/// Pulls quote values out of a scraped HTML document.
///
/// The markup belongs to a third party and changes without notice; swapping
/// the matching strategy means providing another implementation.
pub trait QuoteExtractor: Send + Sync {
    /// Last traded price. Absence is an error.
    fn extract_price(&self, html: &str) -> Result<f64>;

    /// Previous close, if the page exposes one.
    fn extract_previous_close(&self, html: &str) -> Option<f64>;
}
