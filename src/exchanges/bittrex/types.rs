use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A tradeable market pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Market {
    pub market_currency: String,
    pub base_currency: String,
    #[serde(default)]
    pub market_currency_long: Option<String>,
    #[serde(default)]
    pub base_currency_long: Option<String>,
    pub min_trade_size: Decimal,
    pub market_name: String,
    pub is_active: bool,
    #[serde(default)]
    pub created: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Currency {
    pub currency: String,
    #[serde(default)]
    pub currency_long: Option<String>,
    #[serde(default)]
    pub min_confirmation: Option<u32>,
    pub tx_fee: Decimal,
    pub is_active: bool,
    #[serde(default)]
    pub coin_type: Option<String>,
    #[serde(default)]
    pub base_address: Option<String>,
}

/// Best bid/ask and last trade price for one market.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Ticker {
    pub bid: Decimal,
    pub ask: Decimal,
    pub last: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MarketSummary {
    pub market_name: String,
    #[serde(default)]
    pub high: Option<Decimal>,
    #[serde(default)]
    pub low: Option<Decimal>,
    #[serde(default)]
    pub volume: Option<Decimal>,
    #[serde(default)]
    pub last: Option<Decimal>,
    #[serde(default)]
    pub base_volume: Option<Decimal>,
    #[serde(default)]
    pub time_stamp: Option<String>,
    #[serde(default)]
    pub bid: Option<Decimal>,
    #[serde(default)]
    pub ask: Option<Decimal>,
    #[serde(default)]
    pub open_buy_orders: Option<u32>,
    #[serde(default)]
    pub open_sell_orders: Option<u32>,
    #[serde(default)]
    pub prev_day: Option<Decimal>,
    #[serde(default)]
    pub created: Option<String>,
}

/// One price level of an order book side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderBookEntry {
    pub quantity: Decimal,
    pub rate: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBook {
    #[serde(default)]
    pub buy: Vec<OrderBookEntry>,
    #[serde(default)]
    pub sell: Vec<OrderBookEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MarketHistoryEntry {
    pub id: u64,
    pub time_stamp: String,
    pub quantity: Decimal,
    pub price: Decimal,
    #[serde(default)]
    pub total: Option<Decimal>,
    #[serde(default)]
    pub fill_type: Option<String>,
    #[serde(default)]
    pub order_type: Option<String>,
}

/// One v2.0 candle. The wire format abbreviates field names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    #[serde(rename = "O")]
    pub open: Decimal,
    #[serde(rename = "H")]
    pub high: Decimal,
    #[serde(rename = "L")]
    pub low: Decimal,
    #[serde(rename = "C")]
    pub close: Decimal,
    #[serde(rename = "V")]
    pub volume: Decimal,
    #[serde(rename = "T")]
    pub time_stamp: String,
    #[serde(rename = "BV")]
    pub base_volume: Decimal,
}

/// Acknowledgement for a placed or withdrawn order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlaced {
    #[serde(rename = "uuid")]
    pub uuid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Balance {
    pub currency: String,
    #[serde(default)]
    pub balance: Option<Decimal>,
    #[serde(default)]
    pub available: Option<Decimal>,
    #[serde(default)]
    pub pending: Option<Decimal>,
    #[serde(default)]
    pub crypto_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OpenOrder {
    #[serde(default)]
    pub uuid: Option<String>,
    pub order_uuid: String,
    pub exchange: String,
    pub order_type: String,
    pub quantity: Decimal,
    pub quantity_remaining: Decimal,
    #[serde(default)]
    pub limit: Option<Decimal>,
    #[serde(default)]
    pub commission_paid: Option<Decimal>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub price_per_unit: Option<Decimal>,
    #[serde(default)]
    pub opened: Option<String>,
    #[serde(default)]
    pub closed: Option<String>,
    #[serde(default)]
    pub cancel_initiated: Option<bool>,
    #[serde(default)]
    pub immediate_or_cancel: Option<bool>,
    #[serde(default)]
    pub is_conditional: Option<bool>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub condition_target: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderHistoryEntry {
    pub order_uuid: String,
    pub exchange: String,
    #[serde(default)]
    pub time_stamp: Option<String>,
    pub order_type: String,
    #[serde(default)]
    pub limit: Option<Decimal>,
    pub quantity: Decimal,
    pub quantity_remaining: Decimal,
    #[serde(default)]
    pub commission: Option<Decimal>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub price_per_unit: Option<Decimal>,
    #[serde(default)]
    pub immediate_or_cancel: Option<bool>,
    #[serde(default)]
    pub is_conditional: Option<bool>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub condition_target: Option<Decimal>,
}

/// Full order detail from `/account/getorder`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Order {
    #[serde(default)]
    pub account_id: Option<String>,
    pub order_uuid: String,
    pub exchange: String,
    #[serde(rename = "Type")]
    pub order_type: String,
    pub quantity: Decimal,
    pub quantity_remaining: Decimal,
    #[serde(default)]
    pub limit: Option<Decimal>,
    #[serde(default)]
    pub reserved: Option<Decimal>,
    #[serde(default)]
    pub reserve_remaining: Option<Decimal>,
    #[serde(default)]
    pub commission_paid: Option<Decimal>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub price_per_unit: Option<Decimal>,
    #[serde(default)]
    pub opened: Option<String>,
    #[serde(default)]
    pub closed: Option<String>,
    #[serde(default)]
    pub is_open: Option<bool>,
    #[serde(default)]
    pub cancel_initiated: Option<bool>,
    #[serde(default)]
    pub immediate_or_cancel: Option<bool>,
    #[serde(default)]
    pub is_conditional: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WithdrawalRecord {
    pub payment_uuid: String,
    pub currency: String,
    pub amount: Decimal,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub opened: Option<String>,
    #[serde(default)]
    pub authorized: Option<bool>,
    #[serde(default)]
    pub pending_payment: Option<bool>,
    #[serde(default)]
    pub tx_cost: Option<Decimal>,
    #[serde(default)]
    pub tx_id: Option<String>,
    #[serde(default)]
    pub canceled: Option<bool>,
    #[serde(default)]
    pub invalid_address: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DepositRecord {
    pub id: u64,
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub confirmations: Option<u32>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub tx_id: Option<String>,
    #[serde(default)]
    pub crypto_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DepositAddress {
    pub currency: String,
    #[serde(default)]
    pub address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_deserializes_from_v1_payload() {
        let json = r#"{
            "MarketCurrency": "LTC",
            "BaseCurrency": "BTC",
            "MarketCurrencyLong": "Litecoin",
            "BaseCurrencyLong": "Bitcoin",
            "MinTradeSize": 0.01,
            "MarketName": "BTC-LTC",
            "IsActive": true,
            "Created": "2014-02-13T00:00:00"
        }"#;
        let market: Market = serde_json::from_str(json).unwrap();
        assert_eq!(market.market_name, "BTC-LTC");
        assert!(market.is_active);
    }

    #[test]
    fn order_book_sides_are_lowercase_on_the_wire() {
        let json = r#"{"buy":[{"Quantity":12.37,"Rate":0.02525}],"sell":[]}"#;
        let book: OrderBook = serde_json::from_str(json).unwrap();
        assert_eq!(book.buy.len(), 1);
        assert!(book.sell.is_empty());
    }

    #[test]
    fn order_placed_uses_lowercase_uuid() {
        let placed: OrderPlaced =
            serde_json::from_str(r#"{"uuid":"614c34e4-8d71-11e3-94b5-425861b86ab6"}"#).unwrap();
        assert!(placed.uuid.starts_with("614c34e4"));
    }
}
