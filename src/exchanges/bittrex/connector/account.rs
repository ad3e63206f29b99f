use crate::core::errors::ExchangeError;
use crate::core::kernel::RestClient;
use crate::exchanges::bittrex::types::{
    Balance, DepositAddress, DepositRecord, Order, OrderHistoryEntry, OrderPlaced,
    WithdrawalRecord,
};
use rust_decimal::Decimal;

/// Account queries and withdrawals (signed `/account/*` endpoints).
pub struct Account<R: RestClient> {
    pub rest: R,
}

impl<R: RestClient> Account<R> {
    pub fn new(rest: R) -> Self {
        Self { rest }
    }

    /// Balances for every currency in the account.
    pub async fn get_balances(&self) -> Result<Vec<Balance>, ExchangeError> {
        self.rest.get_json("/account/getbalances", &[], true).await
    }

    /// Balance for one currency.
    pub async fn get_balance(&self, currency: &str) -> Result<Balance, ExchangeError> {
        self.rest
            .get_json("/account/getbalance", &[("currency", currency)], true)
            .await
    }

    /// Withdrawal history, optionally filtered by currency.
    pub async fn get_withdrawal_history(
        &self,
        currency: Option<&str>,
    ) -> Result<Vec<WithdrawalRecord>, ExchangeError> {
        let params: Vec<(&str, &str)> = currency.map(|c| ("currency", c)).into_iter().collect();
        self.rest
            .get_json("/account/getwithdrawalhistory", &params, true)
            .await
    }

    /// Deposit address for a currency; generated on first request.
    pub async fn get_deposit_address(
        &self,
        currency: &str,
    ) -> Result<DepositAddress, ExchangeError> {
        self.rest
            .get_json("/account/getdepositaddress", &[("currency", currency)], true)
            .await
    }

    /// Deposit history, optionally filtered by currency.
    pub async fn get_deposit_history(
        &self,
        currency: Option<&str>,
    ) -> Result<Vec<DepositRecord>, ExchangeError> {
        let params: Vec<(&str, &str)> = currency.map(|c| ("currency", c)).into_iter().collect();
        self.rest
            .get_json("/account/getdeposithistory", &params, true)
            .await
    }

    /// Closed-order history, optionally restricted to one market.
    pub async fn get_order_history(
        &self,
        market: Option<&str>,
    ) -> Result<Vec<OrderHistoryEntry>, ExchangeError> {
        let params: Vec<(&str, &str)> = market.map(|m| ("market", m)).into_iter().collect();
        self.rest
            .get_json("/account/getorderhistory", &params, true)
            .await
    }

    /// Full detail for a single order.
    pub async fn get_order(&self, order_uuid: &str) -> Result<Order, ExchangeError> {
        self.rest
            .get_json("/account/getorder", &[("uuid", order_uuid)], true)
            .await
    }

    /// Withdraw funds. `payment_id` is the memo/tag some chains require.
    pub async fn withdraw(
        &self,
        currency: &str,
        quantity: Decimal,
        address: &str,
        payment_id: Option<&str>,
    ) -> Result<OrderPlaced, ExchangeError> {
        let quantity = quantity.to_string();
        let mut params = vec![
            ("currency", currency),
            ("quantity", quantity.as_str()),
            ("address", address),
        ];
        if let Some(payment_id) = payment_id {
            params.push(("paymentid", payment_id));
        }
        self.rest.get_json("/account/withdraw", &params, true).await
    }
}
