use crate::core::errors::ExchangeError;
use crate::core::kernel::RestClient;
use crate::exchanges::bittrex::types::{OpenOrder, OrderPlaced};
use rust_decimal::Decimal;

/// Order placement and cancellation (signed `/market/*` endpoints).
pub struct Trading<R: RestClient> {
    pub rest: R,
}

impl<R: RestClient> Trading<R> {
    pub fn new(rest: R) -> Self {
        Self { rest }
    }

    /// Place a limit buy order.
    pub async fn buy_limit(
        &self,
        market: &str,
        quantity: Decimal,
        rate: Decimal,
    ) -> Result<OrderPlaced, ExchangeError> {
        let quantity = quantity.to_string();
        let rate = rate.to_string();
        self.rest
            .get_json(
                "/market/buylimit",
                &[("market", market), ("quantity", &quantity), ("rate", &rate)],
                true,
            )
            .await
    }

    /// Place a market buy order.
    pub async fn buy_market(
        &self,
        market: &str,
        quantity: Decimal,
    ) -> Result<OrderPlaced, ExchangeError> {
        let quantity = quantity.to_string();
        self.rest
            .get_json(
                "/market/buymarket",
                &[("market", market), ("quantity", &quantity)],
                true,
            )
            .await
    }

    /// Place a limit sell order.
    pub async fn sell_limit(
        &self,
        market: &str,
        quantity: Decimal,
        rate: Decimal,
    ) -> Result<OrderPlaced, ExchangeError> {
        let quantity = quantity.to_string();
        let rate = rate.to_string();
        self.rest
            .get_json(
                "/market/selllimit",
                &[("market", market), ("quantity", &quantity), ("rate", &rate)],
                true,
            )
            .await
    }

    /// Place a market sell order.
    pub async fn sell_market(
        &self,
        market: &str,
        quantity: Decimal,
    ) -> Result<OrderPlaced, ExchangeError> {
        let quantity = quantity.to_string();
        self.rest
            .get_json(
                "/market/sellmarket",
                &[("market", market), ("quantity", &quantity)],
                true,
            )
            .await
    }

    /// Cancel an open order by uuid. The exchange returns no payload.
    pub async fn cancel(&self, order_uuid: &str) -> Result<(), ExchangeError> {
        self.rest
            .get("/market/cancel", &[("uuid", order_uuid)], true)
            .await
            .map(|_| ())
    }

    /// Open orders, optionally restricted to one market.
    pub async fn get_open_orders(
        &self,
        market: Option<&str>,
    ) -> Result<Vec<OpenOrder>, ExchangeError> {
        let params: Vec<(&str, &str)> = market.map(|m| ("market", m)).into_iter().collect();
        self.rest
            .get_json("/market/getopenorders", &params, true)
            .await
    }
}
