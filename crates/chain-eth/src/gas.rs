//! Gas price recommendation.
//!
//! Pure recommendation math lives in free functions so it can be checked
//! without a node; [`GasPriceEngine`] feeds it from an [`EthRpcClient`] and
//! applies the fallback policy when the node misbehaves.

use alloy_primitives::U256;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::EthError;
use crate::rpc::EthRpcClient;
use crate::units::GWEI;

/// Legacy gas price used when `eth_gasPrice` fails or is malformed.
pub const FALLBACK_GAS_PRICE: u128 = 20 * GWEI;

/// Priority fee used when `eth_maxPriorityFeePerGas` fails or is malformed.
pub const FALLBACK_PRIORITY_FEE: u128 = 2 * GWEI;

/// Floor applied to the network legacy gas price before the 10% bump.
pub const MIN_LEGACY_GAS_PRICE: u128 = GWEI;

/// Floor for the recommended EIP-1559 priority fee (1.5 Gwei).
pub const MIN_PRIORITY_FEE: u128 = 1_500_000_000;

pub const NATIVE_TRANSFER_GAS_LIMIT: u64 = 21_000;
pub const ERC20_TRANSFER_GAS_LIMIT: u64 = 65_000;
pub const SWAP_GAS_LIMIT: u64 = 200_000;

/// A fee setting for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GasPrice {
    Legacy {
        gas_price: u128,
    },
    Eip1559 {
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    },
}

impl GasPrice {
    /// The price to put in a legacy envelope. For EIP-1559 this is `maxFee`.
    pub fn legacy_gas_price(&self) -> u128 {
        match *self {
            GasPrice::Legacy { gas_price } => gas_price,
            GasPrice::Eip1559 {
                max_fee_per_gas, ..
            } => max_fee_per_gas,
        }
    }

    /// Multiplies every fee field by `num / den`, rounding down. No floor is
    /// applied; see [`GasPrice::floored`].
    pub fn scaled(&self, num: u128, den: u128) -> GasPrice {
        let scale = |v: u128| v.saturating_mul(num) / den;
        match *self {
            GasPrice::Legacy { gas_price } => GasPrice::Legacy {
                gas_price: scale(gas_price),
            },
            GasPrice::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => GasPrice::Eip1559 {
                max_fee_per_gas: scale(max_fee_per_gas),
                max_priority_fee_per_gas: scale(max_priority_fee_per_gas),
            },
        }
    }

    /// Raises the legacy price to 1 Gwei and the priority fee to 1.5 Gwei.
    /// `maxFee` never ends up below the priority fee.
    pub fn floored(&self) -> GasPrice {
        match *self {
            GasPrice::Legacy { gas_price } => GasPrice::Legacy {
                gas_price: gas_price.max(MIN_LEGACY_GAS_PRICE),
            },
            GasPrice::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => {
                let priority = max_priority_fee_per_gas.max(MIN_PRIORITY_FEE);
                GasPrice::Eip1559 {
                    max_fee_per_gas: max_fee_per_gas.max(priority),
                    max_priority_fee_per_gas: priority,
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GasWarning {
    TooLow,
    TooHigh,
    Optimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GasPriceEstimate {
    pub recommended: GasPrice,
    pub warning: GasWarning,
    pub estimated_wait_time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GasTier {
    Slow,
    Standard,
    Fast,
}

impl GasTier {
    fn multiplier(self) -> (u128, u128) {
        match self {
            GasTier::Slow => (9, 10),
            GasTier::Standard => (1, 1),
            GasTier::Fast => (6, 5),
        }
    }

    fn warning(self) -> GasWarning {
        match self {
            GasTier::Slow => GasWarning::TooLow,
            GasTier::Standard => GasWarning::Optimal,
            GasTier::Fast => GasWarning::TooHigh,
        }
    }

    fn wait_time(self) -> &'static str {
        match self {
            GasTier::Slow => "~5min",
            GasTier::Standard => "~1min",
            GasTier::Fast => "~15s",
        }
    }
}

/// Compares a chosen price to the raw network value: under 90% is too low,
/// over 150% is too high.
pub fn classify(chosen: u128, network: u128) -> GasWarning {
    if chosen.saturating_mul(10) < network.saturating_mul(9) {
        GasWarning::TooLow
    } else if chosen.saturating_mul(2) > network.saturating_mul(3) {
        GasWarning::TooHigh
    } else {
        GasWarning::Optimal
    }
}

/// Legacy recommendation: `max(network, 1 Gwei) * 1.1`, rounded up.
pub fn recommend_legacy(network_gas_price: u128) -> GasPriceEstimate {
    let floored = network_gas_price.max(MIN_LEGACY_GAS_PRICE);
    let recommended = floored.saturating_mul(11).div_ceil(10);

    let wait = if recommended >= 20 * GWEI {
        "~30s"
    } else if recommended >= 10 * GWEI {
        "~1min"
    } else if recommended >= 5 * GWEI {
        "~2min"
    } else {
        "~5+min"
    };

    GasPriceEstimate {
        recommended: GasPrice::Legacy {
            gas_price: recommended,
        },
        warning: classify(recommended, network_gas_price),
        estimated_wait_time: wait.to_string(),
    }
}

/// EIP-1559 recommendation from the latest base fee and the node's tip suggestion.
///
/// `priority = max(network, 1.5 Gwei)` and
/// `maxFee = max(2 * base + network, base + priority)`.
pub fn recommend_eip1559(base_fee: u128, network_priority_fee: u128) -> GasPriceEstimate {
    let priority = network_priority_fee.max(MIN_PRIORITY_FEE);
    let doubled = base_fee.saturating_mul(2).saturating_add(network_priority_fee);
    let max_fee = doubled.max(base_fee.saturating_add(priority));

    let wait = if priority >= 3 * GWEI {
        "~30s"
    } else if priority >= 2 * GWEI {
        "~1min"
    } else if priority >= GWEI {
        "~2min"
    } else {
        "~5+min"
    };

    GasPriceEstimate {
        recommended: GasPrice::Eip1559 {
            max_fee_per_gas: max_fee,
            max_priority_fee_per_gas: priority,
        },
        warning: classify(priority, network_priority_fee),
        estimated_wait_time: wait.to_string(),
    }
}

/// Derives a tiered estimate from a standard one. Every fee field is scaled,
/// then the legacy and priority-fee floors are re-applied.
pub fn tiered(standard: &GasPriceEstimate, tier: GasTier) -> GasPriceEstimate {
    let (num, den) = tier.multiplier();
    GasPriceEstimate {
        recommended: standard.recommended.scaled(num, den).floored(),
        warning: tier.warning(),
        estimated_wait_time: tier.wait_time().to_string(),
    }
}

/// `gasPrice * gasLimit` in wei, using the legacy-equivalent price.
pub fn fee_cost_wei(gas_price: &GasPrice, gas_limit: u64) -> U256 {
    U256::from(gas_price.legacy_gas_price()) * U256::from(gas_limit)
}

/// Reads fee inputs from a node and turns them into recommendations.
///
/// Fee reads never fail: malformed answers and transport errors fall back
/// to fixed defaults, logged at `warn`.
#[derive(Clone)]
pub struct GasPriceEngine {
    rpc: EthRpcClient,
}

impl GasPriceEngine {
    pub fn new(rpc: EthRpcClient) -> Self {
        Self { rpc }
    }

    pub async fn network_gas_price(&self) -> u128 {
        match self.rpc.gas_price().await {
            Ok(price) => price,
            Err(e) => {
                warn!(
                    error = %e,
                    fallback = FALLBACK_GAS_PRICE,
                    "eth_gasPrice unavailable, using fallback"
                );
                FALLBACK_GAS_PRICE
            }
        }
    }

    pub async fn network_priority_fee(&self) -> u128 {
        match self.rpc.max_priority_fee().await {
            Ok(fee) => fee,
            Err(e) => {
                warn!(
                    error = %e,
                    fallback = FALLBACK_PRIORITY_FEE,
                    "eth_maxPriorityFeePerGas unavailable, using fallback"
                );
                FALLBACK_PRIORITY_FEE
            }
        }
    }

    /// Latest base fee, or 0 when the block has none or the read fails.
    pub async fn base_fee(&self) -> u128 {
        match self.rpc.latest_base_fee().await {
            Ok(Some(fee)) => fee,
            Ok(None) => {
                warn!("latest block has no baseFeePerGas, treating base fee as unknown");
                0
            }
            Err(e) => {
                warn!(error = %e, "base fee unavailable, treating as unknown");
                0
            }
        }
    }

    /// Standard-tier estimate for a network.
    pub async fn estimate(&self, supports_eip1559: bool) -> GasPriceEstimate {
        let estimate = if supports_eip1559 {
            let base_fee = self.base_fee().await;
            let priority = self.network_priority_fee().await;
            recommend_eip1559(base_fee, priority)
        } else {
            recommend_legacy(self.network_gas_price().await)
        };

        debug!(recommended = ?estimate.recommended, warning = ?estimate.warning, "gas estimate");
        estimate
    }

    pub async fn estimate_tier(&self, supports_eip1559: bool, tier: GasTier) -> GasPriceEstimate {
        tiered(&self.estimate(supports_eip1559).await, tier)
    }

    /// Slow, standard and fast estimates from a single set of node reads.
    pub async fn estimate_all_tiers(&self, supports_eip1559: bool) -> [GasPriceEstimate; 3] {
        let standard = self.estimate(supports_eip1559).await;
        [
            tiered(&standard, GasTier::Slow),
            tiered(&standard, GasTier::Standard),
            tiered(&standard, GasTier::Fast),
        ]
    }
}

impl From<EthRpcClient> for GasPriceEngine {
    fn from(rpc: EthRpcClient) -> Self {
        Self::new(rpc)
    }
}

/// Rejects a zero gas limit before anything is signed.
pub fn check_gas_limit(gas_limit: u64) -> Result<u64, EthError> {
    if gas_limit == 0 {
        return Err(EthError::TransactionBuildError("gas limit must be positive".into()));
    }
    Ok(gas_limit)
}
