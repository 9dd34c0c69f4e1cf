use crate::model::OptionChain;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Market-data collaborator that hands out option chain snapshots.
#[async_trait]
pub trait ChainSource: Send + Sync {
    async fn option_chain(&self, symbol: &str) -> Result<OptionChain>;
}

/// Reads `<root>/<SYMBOL>.json` files saved from the broker's chain endpoint.
#[derive(Debug, Clone)]
pub struct ChainDirectory {
    root: PathBuf,
}

impl ChainDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.root
            .join(format!("{}.json", symbol.trim().to_ascii_uppercase()))
    }
}

#[async_trait]
impl ChainSource for ChainDirectory {
    async fn option_chain(&self, symbol: &str) -> Result<OptionChain> {
        let path = self.path_for(symbol);
        debug!(target: "client", symbol, path = %path.display(), "loading chain snapshot");
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read chain {}", path.display()))?;
        let mut chain: OptionChain = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse chain {}", path.display()))?;
        if chain.symbol.is_none() {
            chain.symbol = Some(symbol.to_ascii_uppercase());
        }
        Ok(chain)
    }
}
