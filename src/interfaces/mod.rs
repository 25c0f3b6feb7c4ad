pub mod market_data;
pub mod quote_extractor;

pub use market_data::MarketDataSource;
pub use quote_extractor::QuoteExtractor;
