use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{network::ChainId, query::Closest};

/// Etherscan returns this message text (not an error status) when asked for a
/// block number past the chain head.
const TOO_FAR_IN_FUTURE: &str = "too far in the future";

/// Client for the Etherscan-family `getblocknobytime` lookup. One remote call
/// replaces the whole interpolation search for a single timestamp.
pub struct EtherscanClient {
    url: Url,
    api_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct EtherscanResponse {
    status: String,
    message: String,
    result: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorerBlockNumber {
    Number(u64),
    /// The requested timestamp is past the chain head; callers should fall
    /// back to the latest block.
    TooFarInFuture,
}

impl EtherscanResponse {
    // The sentinel check must run before the numeric parse: the sentinel
    // arrives in the same `result` field as block numbers do.
    fn into_block_number(self) -> crate::Result<ExplorerBlockNumber> {
        if self.result.contains(TOO_FAR_IN_FUTURE) {
            return Ok(ExplorerBlockNumber::TooFarInFuture);
        }
        self.result
            .parse()
            .map(ExplorerBlockNumber::Number)
            .map_err(|_| crate::Error::UnexpectedExplorerResponse(self.result))
    }
}

impl EtherscanClient {
    pub fn new(chain_id: ChainId, api_key: &str) -> crate::Result<Self> {
        let url = chain_id.explorer_api_url();
        url.parse()
            .map_err(|e| crate::Error::UrlParsingFailed(url.to_string(), e))
            .map(|url| Self {
                url,
                api_key: api_key.to_string(),
            })
    }

    pub async fn get_block_number_by_timestamp(
        &self,
        timestamp: i64,
        closest: Closest,
    ) -> crate::Result<ExplorerBlockNumber> {
        let client = Client::new();
        let timestamp = timestamp.to_string();
        let response: EtherscanResponse = client
            .get(self.url.clone())
            .query(&[
                ("module", "block"),
                ("action", "getblocknobytime"),
                ("timestamp", timestamp.as_str()),
                ("closest", closest.as_str()),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        tracing::debug!(status = %response.status, result = %response.result, "explorer lookup");

        response.into_block_number()
    }
}
