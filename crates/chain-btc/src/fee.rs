use serde::{Deserialize, Serialize};

/// Estimated virtual size of a P2WPKH input (in vbytes).
pub const P2WPKH_INPUT_VBYTES: u64 = 68;

/// Estimated virtual size of any output (in vbytes).
pub const OUTPUT_VBYTES: u64 = 31;

/// Fixed transaction overhead (in vbytes): version, locktime, counts.
pub const TX_OVERHEAD_VBYTES: u64 = 10;

/// Outputs below this value are dropped into the fee rather than created.
pub const DUST_THRESHOLD_SAT: u64 = 546;

/// `(10 + 68 * inputs + 31 * outputs) * rate`, saturating.
pub fn estimate_fee(num_inputs: usize, num_outputs: usize, fee_rate_sat_vbyte: u64) -> u64 {
    let vsize = TX_OVERHEAD_VBYTES
        .saturating_add((num_inputs as u64).saturating_mul(P2WPKH_INPUT_VBYTES))
        .saturating_add((num_outputs as u64).saturating_mul(OUTPUT_VBYTES));
    vsize.saturating_mul(fee_rate_sat_vbyte)
}

/// Confirmation targets offered by `/v1/fees/recommended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeTier {
    Fastest,
    HalfHour,
    Hour,
    Economy,
    Minimum,
}

/// Recommended fee rates in sat/vB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeRecommendation {
    pub fastest_fee: u64,
    pub half_hour_fee: u64,
    pub hour_fee: u64,
    pub economy_fee: u64,
    pub minimum_fee: u64,
}

impl FeeRecommendation {
    /// Static rates used when the fee endpoint is unreachable.
    pub const FALLBACK: FeeRecommendation = FeeRecommendation {
        fastest_fee: 10,
        half_hour_fee: 8,
        hour_fee: 6,
        economy_fee: 3,
        minimum_fee: 1,
    };

    pub fn rate(&self, tier: FeeTier) -> u64 {
        match tier {
            FeeTier::Fastest => self.fastest_fee,
            FeeTier::HalfHour => self.half_hour_fee,
            FeeTier::Hour => self.hour_fee,
            FeeTier::Economy => self.economy_fee,
            FeeTier::Minimum => self.minimum_fee,
        }
    }
}

impl Default for FeeRecommendation {
    fn default() -> Self {
        Self::FALLBACK
    }
}
