use crate::core::errors::ExchangeError;
use crate::core::kernel::RestClient;
use crate::exchanges::bittrex::types::{
    Candle, Currency, Market, MarketHistoryEntry, MarketSummary, OrderBook, Ticker,
};

/// Public market-data endpoints (no credentials required).
pub struct MarketData<R: RestClient> {
    pub rest: R,
    base_url_v2: String,
}

impl<R: RestClient> MarketData<R> {
    pub fn new(rest: R, base_url_v2: String) -> Self {
        Self { rest, base_url_v2 }
    }

    /// All open and available markets.
    pub async fn get_markets(&self) -> Result<Vec<Market>, ExchangeError> {
        self.rest.get_json("/public/getmarkets", &[], false).await
    }

    /// All supported currencies with withdrawal fees.
    pub async fn get_currencies(&self) -> Result<Vec<Currency>, ExchangeError> {
        self.rest
            .get_json("/public/getcurrencies", &[], false)
            .await
    }

    /// Current bid/ask/last for a market.
    pub async fn get_ticker(&self, market: &str) -> Result<Ticker, ExchangeError> {
        self.rest
            .get_json("/public/getticker", &[("market", market)], false)
            .await
    }

    /// 24-hour summaries for every market.
    pub async fn get_market_summaries(&self) -> Result<Vec<MarketSummary>, ExchangeError> {
        self.rest
            .get_json("/public/getmarketsummaries", &[], false)
            .await
    }

    /// 24-hour summary for one market. The exchange answers with a
    /// one-element array.
    pub async fn get_market_summary(
        &self,
        market: &str,
    ) -> Result<Vec<MarketSummary>, ExchangeError> {
        self.rest
            .get_json("/public/getmarketsummary", &[("market", market)], false)
            .await
    }

    /// Both sides of the order book for a market.
    pub async fn get_order_book(&self, market: &str) -> Result<OrderBook, ExchangeError> {
        self.rest
            .get_json(
                "/public/getorderbook",
                &[("market", market), ("type", "both")],
                false,
            )
            .await
    }

    /// Latest trades for a market.
    pub async fn get_market_history(
        &self,
        market: &str,
    ) -> Result<Vec<MarketHistoryEntry>, ExchangeError> {
        self.rest
            .get_json("/public/getmarkethistory", &[("market", market)], false)
            .await
    }

    /// Historical candles. This endpoint lives on the v2.0 API.
    ///
    /// `tick_interval` is one of `oneMin`, `fiveMin`, `thirtyMin`, `hour`,
    /// `day`.
    pub async fn get_candles(
        &self,
        market: &str,
        tick_interval: &str,
    ) -> Result<Vec<Candle>, ExchangeError> {
        let url = format!("{}/pub/market/GetTicks", self.base_url_v2);
        self.rest
            .get_url_json(
                &url,
                &[("marketName", market), ("tickInterval", tick_interval)],
                false,
            )
            .await
    }
}
