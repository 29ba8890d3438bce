pub mod account;
pub mod asset_metadata;
pub mod market_data;

pub use account::ExchangeAccountReadTool;
pub use asset_metadata::{AssetIntelligenceClient, AssetMetadataTool, HttpAssetIntelligenceClient};
pub use market_data::MarketDataLookupTool;
