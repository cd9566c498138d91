use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Chains with a public Etherscan-family explorer API.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChainId {
    Ethereum = 1,
    Optimism = 10,
    Bsc = 56,
    BscTestnet = 97,
    Polygon = 137,
    Base = 8453,
    Arbitrum = 42161,
    Sepolia = 11155111,
}

impl ChainId {
    pub fn id(&self) -> u64 {
        *self as u64
    }

    pub fn explorer_api_url(&self) -> &'static str {
        match self {
            ChainId::Ethereum => "https://api.etherscan.io/api",
            ChainId::Optimism => "https://api-optimistic.etherscan.io/api",
            ChainId::Bsc => "https://api.bscscan.com/api",
            ChainId::BscTestnet => "https://api-testnet.bscscan.com/api",
            ChainId::Polygon => "https://api.polygonscan.com/api",
            ChainId::Base => "https://api.basescan.org/api",
            ChainId::Arbitrum => "https://api.arbiscan.io/api",
            ChainId::Sepolia => "https://api-sepolia.etherscan.io/api",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ChainId::Ethereum => "Ethereum",
            ChainId::Optimism => "Optimism",
            ChainId::Bsc => "BSC",
            ChainId::BscTestnet => "BSC Testnet",
            ChainId::Polygon => "Polygon",
            ChainId::Base => "Base",
            ChainId::Arbitrum => "Arbitrum",
            ChainId::Sepolia => "Sepolia",
        }
    }
}

impl TryFrom<u64> for ChainId {
    type Error = crate::Error;

    fn try_from(chain_id: u64) -> crate::Result<Self> {
        match chain_id {
            1 => Ok(ChainId::Ethereum),
            10 => Ok(ChainId::Optimism),
            56 => Ok(ChainId::Bsc),
            97 => Ok(ChainId::BscTestnet),
            137 => Ok(ChainId::Polygon),
            8453 => Ok(ChainId::Base),
            42161 => Ok(ChainId::Arbitrum),
            11155111 => Ok(ChainId::Sepolia),
            _ => Err(crate::Error::ExplorerNotSupported(chain_id)),
        }
    }
}

impl Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (chain_id: {})", self.name(), self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_id_round_trip() {
        for chain_id in [1u64, 10, 56, 97, 137, 8453, 42161, 11155111] {
            let chain = ChainId::try_from(chain_id).unwrap();
            assert_eq!(chain.id(), chain_id);
        }
    }

    #[test]
    fn unknown_chain_id_is_rejected() {
        let result = ChainId::try_from(250);
        assert!(matches!(result, Err(crate::Error::ExplorerNotSupported(250))));
    }

    #[test]
    fn explorer_urls_are_api_endpoints() {
        let chain = ChainId::try_from(42161).unwrap();
        assert_eq!(chain.explorer_api_url(), "https://api.arbiscan.io/api");
        assert_eq!(chain.to_string(), "Arbitrum (chain_id: 42161)");
    }
}
