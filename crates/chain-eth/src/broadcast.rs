use tracing::{info, warn};

use crate::error::EthError;
use crate::rpc::EthRpcClient;
use crate::transaction::SignedTransaction;

/// Submits signed transactions to one EVM network. No retries.
#[derive(Clone)]
pub struct EvmBroadcaster {
    rpc: EthRpcClient,
    chain_id: u64,
}

impl EvmBroadcaster {
    pub fn new(rpc: EthRpcClient, chain_id: u64) -> Self {
        Self { rpc, chain_id }
    }

    /// Sends the raw transaction and returns the hash reported by the node.
    pub async fn broadcast(&self, signed: &SignedTransaction) -> Result<String, EthError> {
        let hash = match self.rpc.send_raw_transaction(&signed.raw_tx).await {
            Ok(hash) => hash,
            Err(e) => {
                warn!(
                    chain_id = self.chain_id,
                    local_hash = %signed.tx_hash,
                    error = %e,
                    "broadcast rejected"
                );
                return Err(e);
            }
        };

        if !hash.eq_ignore_ascii_case(&signed.tx_hash) {
            warn!(
                chain_id = self.chain_id,
                node_hash = %hash,
                local_hash = %signed.tx_hash,
                "node returned a different transaction hash"
            );
        }

        info!(chain_id = self.chain_id, tx_hash = %hash, "transaction broadcast");
        Ok(hash)
    }
}
