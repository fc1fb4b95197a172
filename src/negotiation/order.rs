//! Orders published by a maker and the criteria a taker matches them against

use crate::asset::parse_nominal;
use crate::config::{OrderAssetConfig, OrderConfig};

use serde::{Deserialize, Serialize};

/// One side of an order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAsset {
    #[serde(default)]
    pub ledger: String,
    #[serde(default)]
    pub asset: String,
    #[serde(default)]
    pub nominal_amount: String,
}

impl From<&OrderAssetConfig> for OrderAsset {
    fn from(config: &OrderAssetConfig) -> Self {
        Self {
            ledger: config.ledger.clone(),
            asset: config.asset.clone(),
            nominal_amount: config.nominal_amount.clone(),
        }
    }
}

/// Maker trade terms
///
/// `bid` is what the maker gives, `ask` what it wants in return. The taker
/// funds the alpha leg with the ask asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(default)]
    pub id: String,
    /// Unix timestamp (seconds) after which the order must not be taken
    #[serde(default)]
    pub valid_until: u64,
    #[serde(default)]
    pub bid: OrderAsset,
    #[serde(default)]
    pub ask: OrderAsset,
}

impl Order {
    pub fn new(bid: OrderAsset, ask: OrderAsset, valid_until: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            valid_until,
            bid,
            ask,
        }
    }

    pub fn from_config(config: &OrderConfig, now: u64) -> Self {
        Self::new(
            OrderAsset::from(&config.bid),
            OrderAsset::from(&config.ask),
            now + config.valid_for_secs,
        )
    }

    pub fn trading_pair(&self) -> String {
        trading_pair(
            &self.ask.ledger,
            &self.ask.asset,
            &self.bid.ledger,
            &self.bid.asset,
        )
    }

    pub fn is_expired(&self, now: u64) -> bool {
        self.valid_until <= now
    }
}

/// Order book key: `<askLedger>-<askAsset>-<bidLedger>-<bidAsset>`
pub fn trading_pair(ask_ledger: &str, ask_asset: &str, bid_ledger: &str, bid_asset: &str) -> String {
    format!("{}-{}-{}-{}", ask_ledger, ask_asset, bid_ledger, bid_asset).to_lowercase()
}

fn is_asset_valid(asset: &OrderAsset) -> bool {
    !asset.ledger.is_empty()
        && !asset.asset.is_empty()
        && parse_nominal(&asset.nominal_amount).is_some()
}

/// Structural check: id and both sides present, both amounts numeric
pub fn is_order_valid(order: &Order) -> bool {
    !order.id.is_empty() && is_asset_valid(&order.bid) && is_asset_valid(&order.ask)
}

/// What a taker is willing to trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriteriaAsset {
    pub ledger: String,
    pub asset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_nominal_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_nominal_amount: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingCriteria {
    pub bid: CriteriaAsset,
    pub ask: CriteriaAsset,
    /// Lowest acceptable bid/ask ratio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rate: Option<f64>,
}

impl MatchingCriteria {
    pub fn trading_pair(&self) -> String {
        trading_pair(
            &self.ask.ledger,
            &self.ask.asset,
            &self.bid.ledger,
            &self.bid.asset,
        )
    }
}

fn asset_matches(criteria: &CriteriaAsset, asset: &OrderAsset) -> bool {
    if !criteria.ledger.eq_ignore_ascii_case(&asset.ledger)
        || !criteria.asset.eq_ignore_ascii_case(&asset.asset)
    {
        return false;
    }

    let Some(amount) = parse_nominal(&asset.nominal_amount) else {
        return false;
    };

    let within_min = match criteria.min_nominal_amount.as_deref().map(parse_nominal) {
        None => true,
        Some(Some(min)) => amount >= min,
        Some(None) => false,
    };
    let within_max = match criteria.max_nominal_amount.as_deref().map(parse_nominal) {
        None => true,
        Some(Some(max)) => amount <= max,
        Some(None) => false,
    };

    within_min && within_max
}

/// Ledgers, assets, amount bounds and minimum rate all satisfied
pub fn order_matches_criteria(order: &Order, criteria: &MatchingCriteria) -> bool {
    if !asset_matches(&criteria.bid, &order.bid) || !asset_matches(&criteria.ask, &order.ask) {
        return false;
    }

    match criteria.min_rate {
        None => true,
        Some(min_rate) => {
            let (Some(bid), Some(ask)) = (
                parse_nominal(&order.bid.nominal_amount),
                parse_nominal(&order.ask.nominal_amount),
            ) else {
                return false;
            };
            ask > 0.0 && bid / ask >= min_rate
        }
    }
}
