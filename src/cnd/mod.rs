//! Transport contract to the swap daemon
//!
//! The daemon owns the swap state machines. This client only reads swap
//! entities and executes the actions they advertise.

pub mod http;
pub mod types;

pub use http::HttpCnd;
pub use types::{
    AssetSpec, CndInfo, LedgerSpec, Peer, SwapParameters, SwapProperties, SwapRequest,
};

use crate::error::SdkResult;
use crate::siren::{Action, Entity};

use async_trait::async_trait;

/// Path under which the daemon exposes swaps
pub const SWAPS_PATH: &str = "/swaps";
pub const RFC003_SWAPS_PATH: &str = "/swaps/rfc003";

#[async_trait]
pub trait Cnd: Send + Sync {
    /// Identity and listen addresses of the daemon
    async fn info(&self) -> SdkResult<CndInfo>;

    /// Fetch an entity; `SdkError::NotFound` if the daemon does not know it
    async fn fetch(&self, href: &str) -> SdkResult<Entity>;

    /// Execute an action with resolved field values, returning its response body
    async fn execute_action(
        &self,
        action: &Action,
        fields: &serde_json::Map<String, serde_json::Value>,
    ) -> SdkResult<Option<serde_json::Value>>;

    /// Create a swap and return its href
    async fn post_swap(&self, request: &SwapRequest) -> SdkResult<String>;

    /// All swaps known to the daemon
    async fn get_swaps(&self) -> SdkResult<Vec<Entity>>;
}

#[cfg(test)]
pub(crate) mod testing;
