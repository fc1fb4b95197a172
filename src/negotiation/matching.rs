//! Consistency between a swap and the order it claims to fill

use super::execution_params::NetworkParams;
use super::order::{Order, OrderAsset};
use crate::asset::{parse_wei, TokenRegistry};
use crate::cnd::types::{AssetSpec, LedgerSpec, SwapParameters};

use tracing::debug;

fn side_matches(ledger: &LedgerSpec, asset: &AssetSpec, side: &OrderAsset, tokens: &TokenRegistry) -> bool {
    if !ledger.name().eq_ignore_ascii_case(&side.ledger) {
        debug!("Ledger {} does not match order ledger {}", ledger.name(), side.ledger);
        return false;
    }

    let Some(expected) = tokens.resolve(&side.ledger, &side.asset) else {
        debug!("Order asset {}/{} is unknown", side.ledger, side.asset);
        return false;
    };

    if expected.swap_name() != asset.name {
        debug!("Asset {} does not match order asset {}", asset.name, side.asset);
        return false;
    }

    let contracts_match = match (expected.token_contract(), asset.token_contract.as_deref()) {
        (Some(expected), Some(actual)) => expected.eq_ignore_ascii_case(actual),
        (None, None) => true,
        _ => false,
    };
    if !contracts_match {
        debug!("Token contract of {} does not match order", asset.name);
        return false;
    }

    match (expected.to_base_units(&side.nominal_amount), parse_wei(&asset.quantity)) {
        (Ok(expected), Ok(actual)) if expected == actual => true,
        (expected, actual) => {
            debug!(
                "Quantity {:?} does not match order amount {:?}",
                actual.ok(),
                expected.ok()
            );
            false
        }
    }
}

/// A swap fills an order when its alpha side is the order's ask and its beta
/// side the order's bid, with quantities equal in base units
pub fn swap_order_match(parameters: &SwapParameters, order: &Order, tokens: &TokenRegistry) -> bool {
    side_matches(&parameters.alpha_ledger, &parameters.alpha_asset, &order.ask, tokens)
        && side_matches(&parameters.beta_ledger, &parameters.beta_asset, &order.bid, tokens)
}

/// Both ledgers of the swap run on the networks the maker advertised
pub fn swap_networks_match(parameters: &SwapParameters, networks: &NetworkParams) -> bool {
    networks.spec_for(parameters.alpha_ledger.name()) == Some(parameters.alpha_ledger)
        && networks.spec_for(parameters.beta_ledger.name()) == Some(parameters.beta_ledger)
}
