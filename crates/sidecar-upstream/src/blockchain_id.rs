use std::fmt;

/// Selects which adapter/parser pair a sidecar process serves (§6
/// `node_blockchain`). The upstream sidecar modeled this as an open-ended
/// registry keyed by name; `Other` preserves that extensibility without a
/// central enum edit for every new chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockchainId {
    Bitcoin,
    Ethereum,
    Polygon,
    Avalanche,
    Other(String),
}

impl BlockchainId {
    /// The KV-key and config namespace segment, e.g. `"ethereum"`.
    pub fn name(&self) -> &str {
        match self {
            BlockchainId::Bitcoin => "bitcoin",
            BlockchainId::Ethereum => "ethereum",
            BlockchainId::Polygon => "polygon",
            BlockchainId::Avalanche => "avalanche",
            BlockchainId::Other(name) => name,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "bitcoin" => BlockchainId::Bitcoin,
            "ethereum" => BlockchainId::Ethereum,
            "polygon" => BlockchainId::Polygon,
            "avalanche" => BlockchainId::Avalanche,
            _ => BlockchainId::Other(name.to_string()),
        }
    }
}

impl fmt::Display for BlockchainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_is_case_insensitive() {
        assert_eq!(BlockchainId::from_name("Ethereum"), BlockchainId::Ethereum);
        assert_eq!(BlockchainId::from_name("BITCOIN"), BlockchainId::Bitcoin);
    }

    #[test]
    fn unknown_name_falls_back_to_other() {
        assert_eq!(BlockchainId::from_name("solana"), BlockchainId::Other("solana".to_string()));
        assert_eq!(BlockchainId::from_name("solana").name(), "solana");
    }
}
