//! Resolution of action fields from the wallet registry

use crate::error::{SdkResult, WalletError};
use crate::siren::Field;
use crate::wallet::Wallets;

use serde_json::{json, Map, Value};
use tracing::debug;

/// Fill every field with a preset value or a value from the matching wallet
///
/// Fields nobody can answer are left out; the daemon rejects the action if
/// one of them was required.
pub async fn resolve_fields(fields: &[Field], wallets: &Wallets) -> SdkResult<Map<String, Value>> {
    let mut values = Map::new();

    for field in fields {
        if let Some(value) = &field.value {
            values.insert(field.name.clone(), value.clone());
            continue;
        }

        match resolve_field(field, wallets).await? {
            Some(value) => {
                values.insert(field.name.clone(), value);
            }
            None => debug!("Leaving field {} ({:?}) unresolved", field.name, field.class),
        }
    }

    Ok(values)
}

async fn resolve_field(field: &Field, wallets: &Wallets) -> SdkResult<Option<Value>> {
    if field.has_classes(&["bitcoin", "address"]) {
        let Ok(wallet) = wallets.bitcoin() else {
            return Ok(None);
        };
        let address = wallet
            .get_address()
            .await
            .map_err(|e| WalletError::new("bitcoin-get-address", json!({}), e))?;
        return Ok(Some(Value::String(address)));
    }

    if field.has_classes(&["bitcoin", "feePerWU"]) {
        let Ok(wallet) = wallets.bitcoin() else {
            return Ok(None);
        };
        let fee = wallet
            .get_fee()
            .await
            .map_err(|e| WalletError::new("bitcoin-get-fee", json!({}), e))?;
        return Ok(Some(Value::String(fee)));
    }

    if field.has_classes(&["ethereum", "address"]) {
        let Ok(wallet) = wallets.ethereum() else {
            return Ok(None);
        };
        let account = wallet
            .get_account()
            .await
            .map_err(|e| WalletError::new("ethereum-get-account", json!({}), e))?;
        return Ok(Some(Value::String(account)));
    }

    Ok(None)
}
