pub mod core;
pub mod exchanges;

pub use core::{config::BittrexConfig, config::BittrexConfigPatch, errors::ExchangeError, types::*};
pub use exchanges::bittrex::{
    build_connector, build_connector_with_hooks, BittrexConnector, ConnectionState,
    DefaultConnector, SessionHooks,
};
