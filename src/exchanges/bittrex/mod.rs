pub mod builder;
pub mod connector;
pub mod dispatcher;
pub mod session;
pub mod signer;
pub mod types;

// Re-export main types for easier importing
pub use builder::{build_connector, build_connector_with_hooks, DefaultConnector};
pub use connector::BittrexConnector;
pub use session::{ConnectionState, SessionConfig, SessionHooks, SessionResult, StreamingSession};
pub use signer::BittrexSigner;
pub use types::{
    Balance, Candle, Currency, DepositAddress, DepositRecord, Market, MarketHistoryEntry,
    MarketSummary, OpenOrder, Order, OrderBook, OrderBookEntry, OrderHistoryEntry, OrderPlaced,
    Ticker, WithdrawalRecord,
};
