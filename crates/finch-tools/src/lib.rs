pub mod agents;
pub mod clients;
pub mod delegate;
pub mod filings;
pub mod market;
pub mod news;
pub mod portfolio;

pub use agents::CompanyDataAgent;
pub use delegate::DelegateTool;
pub use filings::FilingsTool;
pub use market::{HistoricalDataTool, StockPriceTool};
pub use news::NewsTool;
pub use portfolio::PortfolioTool;
