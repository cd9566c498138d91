use alloy::providers::{Provider, ProviderBuilder};
use async_trait::async_trait;

use crate::block::Block;

/// The ledger-reader capability the search runs against. Callers construct
/// and inject it, the core never inspects the transport behind it.
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Current chain height.
    async fn latest_block_number(&self) -> crate::Result<u64>;

    /// Fetch a block by number. `Ok(None)` means the chain has no such block.
    async fn block_by_number(&self, number: u64) -> crate::Result<Option<Block>>;
}

/// [`BlockSource`] over any alloy provider.
pub struct RpcBlockSource<P> {
    provider: P,
}

impl<P: Provider> RpcBlockSource<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

/// Connect a [`RpcBlockSource`] to an HTTP RPC endpoint.
pub fn connect_http(rpc_url: &str) -> crate::Result<RpcBlockSource<impl Provider>> {
    rpc_url
        .parse()
        .map_err(|e| crate::Error::UrlParsingFailed(rpc_url.to_string(), e))
        .map(|rpc_url| RpcBlockSource::new(ProviderBuilder::new().connect_http(rpc_url)))
}

#[async_trait]
impl<T: BlockSource + ?Sized> BlockSource for std::sync::Arc<T> {
    async fn latest_block_number(&self) -> crate::Result<u64> {
        (**self).latest_block_number().await
    }

    async fn block_by_number(&self, number: u64) -> crate::Result<Option<Block>> {
        (**self).block_by_number(number).await
    }
}

#[async_trait]
impl<P: Provider> BlockSource for RpcBlockSource<P> {
    async fn latest_block_number(&self) -> crate::Result<u64> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn block_by_number(&self, number: u64) -> crate::Result<Option<Block>> {
        let block = self.provider.get_block_by_number(number.into()).await?;
        Ok(block.map(Block::from))
    }
}
