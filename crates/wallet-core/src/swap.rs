//! Single-hop swap quotes and Uniswap-V2 router calls.
//!
//! Quotes come from a price ratio, not from pool reserves, so
//! `price_impact` is a fixed placeholder. Amounts are `rust_decimal` values
//! in human units until the router call converts them to base units.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use chain_eth::abi::{encode_function_call, AbiParam};
use chain_eth::address::{parse_address, private_key_to_address};
use chain_eth::gas::{GasPrice, SWAP_GAS_LIMIT};
use chain_eth::units::parse_units;
use chain_eth::U256;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::WalletError;
use crate::evm_service::{EvmService, SendReceipt};
use crate::hd_derivation::DerivedKey;

/// Placeholder address standing for the chain's native coin in quote paths.
pub const NATIVE_TOKEN_ADDRESS: &str = "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE";

/// `swapExactETHForTokens(uint256,address[],address,uint256)`
pub const SWAP_EXACT_ETH_FOR_TOKENS: [u8; 4] = [0x7f, 0xf3, 0x6a, 0xb5];
/// `swapExactTokensForETH(uint256,uint256,address[],address,uint256)`
pub const SWAP_EXACT_TOKENS_FOR_ETH: [u8; 4] = [0x18, 0xcb, 0xaf, 0xe5];
/// `swapExactTokensForTokens(uint256,uint256,address[],address,uint256)`
pub const SWAP_EXACT_TOKENS_FOR_TOKENS: [u8; 4] = [0x38, 0xed, 0x17, 0x39];

pub const SWAP_DEADLINE_SECS: u64 = 20 * 60;
pub const NATIVE_SWAP_GAS_ESTIMATE: u64 = 150_000;

/// 0.3 (percent).
pub const PRICE_IMPACT_PLACEHOLDER: Decimal = Decimal::from_parts(3, 0, 0, false, 1);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub chain_id: u64,
    pub symbol: String,
    pub decimals: u8,
    /// Contract address; `None` for the native coin.
    #[serde(default)]
    pub address: Option<String>,
}

impl Token {
    pub fn native(chain_id: u64, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            chain_id,
            symbol: symbol.into(),
            decimals,
            address: None,
        }
    }

    pub fn erc20(
        chain_id: u64,
        symbol: impl Into<String>,
        address: impl Into<String>,
        decimals: u8,
    ) -> Self {
        Self {
            chain_id,
            symbol: symbol.into(),
            decimals,
            address: Some(address.into()),
        }
    }

    pub fn is_native(&self) -> bool {
        self.address.is_none()
    }

    /// Contract address, or [`NATIVE_TOKEN_ADDRESS`] for the native coin.
    pub fn path_address(&self) -> &str {
        self.address.as_deref().unwrap_or(NATIVE_TOKEN_ADDRESS)
    }

    fn same_asset(&self, other: &Token) -> bool {
        self.chain_id == other.chain_id
            && self.path_address().eq_ignore_ascii_case(other.path_address())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapQuote {
    pub token_in: Token,
    pub token_out: Token,
    pub amount_in: Decimal,
    pub amount_out: Decimal,
    pub amount_out_min: Decimal,
    pub path: Vec<String>,
    /// Percent.
    pub price_impact: Decimal,
    pub gas_estimate: u64,
    pub slippage_percent: Decimal,
}

/// Which router entry point a quote maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapKind {
    ExactNativeForTokens,
    ExactTokensForNative,
    ExactTokensForTokens,
}

impl SwapKind {
    pub fn for_quote(quote: &SwapQuote) -> Self {
        if quote.token_in.is_native() {
            SwapKind::ExactNativeForTokens
        } else if quote.token_out.is_native() {
            SwapKind::ExactTokensForNative
        } else {
            SwapKind::ExactTokensForTokens
        }
    }

    pub fn selector(self) -> [u8; 4] {
        match self {
            SwapKind::ExactNativeForTokens => SWAP_EXACT_ETH_FOR_TOKENS,
            SwapKind::ExactTokensForNative => SWAP_EXACT_TOKENS_FOR_ETH,
            SwapKind::ExactTokensForTokens => SWAP_EXACT_TOKENS_FOR_TOKENS,
        }
    }
}

/// USD prices for quoting. Caching and provider choice live outside.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn usd_price(&self, token: &Token) -> Option<Decimal>;
}

/// Fixed price table keyed by chain and symbol.
#[derive(Debug, Clone, Default)]
pub struct StaticPrices {
    prices: HashMap<(u64, String), Decimal>,
}

impl StaticPrices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, chain_id: u64, symbol: &str, usd: Decimal) -> Self {
        self.prices
            .insert((chain_id, symbol.to_ascii_uppercase()), usd);
        self
    }
}

#[async_trait]
impl PriceSource for StaticPrices {
    async fn usd_price(&self, token: &Token) -> Option<Decimal> {
        self.prices
            .get(&(token.chain_id, token.symbol.to_ascii_uppercase()))
            .copied()
    }
}

/// Price-ratio quote.
///
/// `rate = price_in / price_out`, or 1 when either price is missing or
/// zero. `amount_out_min = amount_out * (1 - slippage / 100)`. Outputs are
/// truncated to the output token's decimals.
pub fn quote(
    token_in: &Token,
    token_out: &Token,
    amount_in: Decimal,
    slippage_percent: Decimal,
    price_in: Option<Decimal>,
    price_out: Option<Decimal>,
) -> Result<SwapQuote, WalletError> {
    if token_in.chain_id != token_out.chain_id {
        return Err(WalletError::InvalidTokenPair(format!(
            "{} on chain {} and {} on chain {}",
            token_in.symbol, token_in.chain_id, token_out.symbol, token_out.chain_id
        )));
    }
    if token_in.same_asset(token_out) {
        return Err(WalletError::InvalidTokenPair(format!(
            "{} swapped for itself",
            token_in.symbol
        )));
    }
    if slippage_percent.is_sign_negative() || slippage_percent >= Decimal::ONE_HUNDRED {
        return Err(WalletError::InvalidAmount(format!(
            "slippage {slippage_percent}% outside [0, 100)"
        )));
    }

    let amount_in =
        amount_in.round_dp_with_strategy(u32::from(token_in.decimals), RoundingStrategy::ToZero);
    if amount_in <= Decimal::ZERO {
        return Err(WalletError::InvalidAmount(
            "swap amount must be positive".into(),
        ));
    }

    let rate = match (price_in, price_out) {
        (Some(p_in), Some(p_out)) if !p_in.is_zero() && !p_out.is_zero() => p_in
            .checked_div(p_out)
            .ok_or_else(|| WalletError::InvalidAmount("price ratio overflow".into()))?,
        _ => Decimal::ONE,
    };

    let out_dp = u32::from(token_out.decimals);
    let amount_out = amount_in
        .checked_mul(rate)
        .ok_or_else(|| WalletError::InvalidAmount("quote overflow".into()))?
        .round_dp_with_strategy(out_dp, RoundingStrategy::ToZero);
    if amount_out.is_zero() {
        return Err(WalletError::InsufficientLiquidity(format!(
            "{} {} -> {}",
            amount_in, token_in.symbol, token_out.symbol
        )));
    }

    let keep = Decimal::ONE - slippage_percent / Decimal::ONE_HUNDRED;
    let amount_out_min = amount_out
        .checked_mul(keep)
        .ok_or_else(|| WalletError::InvalidAmount("quote overflow".into()))?
        .round_dp_with_strategy(out_dp, RoundingStrategy::ToZero);

    let gas_estimate = if token_in.is_native() || token_out.is_native() {
        NATIVE_SWAP_GAS_ESTIMATE
    } else {
        SWAP_GAS_LIMIT
    };

    Ok(SwapQuote {
        token_in: token_in.clone(),
        token_out: token_out.clone(),
        amount_in,
        amount_out,
        amount_out_min,
        path: vec![
            token_in.path_address().to_string(),
            token_out.path_address().to_string(),
        ],
        price_impact: PRICE_IMPACT_PLACEHOLDER,
        gas_estimate,
        slippage_percent,
    })
}

/// Quote path with the native placeholder replaced by the wrapped token.
pub fn router_path(
    quote: &SwapQuote,
    wrapped_native: Option<&str>,
) -> Result<Vec<[u8; 20]>, WalletError> {
    [&quote.token_in, &quote.token_out]
        .into_iter()
        .map(|token| match &token.address {
            Some(address) => Ok(parse_address(address)?),
            None => {
                let wrapped = wrapped_native.ok_or_else(|| {
                    WalletError::UnsupportedChain(format!(
                        "no wrapped native token configured for chain {}",
                        token.chain_id
                    ))
                })?;
                Ok(parse_address(wrapped)?)
            }
        })
        .collect()
}

/// Router calldata and the native value to attach.
pub fn encode_swap_call(
    kind: SwapKind,
    amount_in: U256,
    amount_out_min: U256,
    path: &[[u8; 20]],
    recipient: [u8; 20],
    deadline: u64,
) -> (Vec<u8>, U256) {
    let path = AbiParam::AddressArray(path.to_vec());
    let to = AbiParam::Address(recipient);
    let deadline = AbiParam::Uint256(U256::from(deadline));

    match kind {
        SwapKind::ExactNativeForTokens => (
            encode_function_call(
                kind.selector(),
                &[AbiParam::Uint256(amount_out_min), path, to, deadline],
            ),
            amount_in,
        ),
        SwapKind::ExactTokensForNative | SwapKind::ExactTokensForTokens => (
            encode_function_call(
                kind.selector(),
                &[
                    AbiParam::Uint256(amount_in),
                    AbiParam::Uint256(amount_out_min),
                    path,
                    to,
                    deadline,
                ],
            ),
            U256::ZERO,
        ),
    }
}

/// Quotes against a [`PriceSource`] and executes through an [`EvmService`].
#[derive(Clone)]
pub struct SwapQuoteEngine {
    prices: Arc<dyn PriceSource>,
}

impl SwapQuoteEngine {
    pub fn new(prices: Arc<dyn PriceSource>) -> Self {
        Self { prices }
    }

    pub async fn get_quote(
        &self,
        token_in: &Token,
        token_out: &Token,
        amount_in: Decimal,
        slippage_percent: Decimal,
    ) -> Result<SwapQuote, WalletError> {
        let (price_in, price_out) = tokio::join!(
            self.prices.usd_price(token_in),
            self.prices.usd_price(token_out)
        );
        debug!(
            ?price_in,
            ?price_out,
            from = %token_in.symbol,
            to = %token_out.symbol,
            "swap prices"
        );
        quote(
            token_in,
            token_out,
            amount_in,
            slippage_percent,
            price_in,
            price_out,
        )
    }

    /// Sends the router call for `quote` from `key`'s account.
    ///
    /// The ERC-20 allowance of the router is not read first; a missing
    /// approval makes the router call revert on chain.
    pub async fn execute_swap(
        &self,
        evm: &EvmService,
        key: &DerivedKey,
        quote: &SwapQuote,
        gas_price: Option<GasPrice>,
    ) -> Result<SendReceipt, WalletError> {
        let network = evm.network();
        if network.chain_id != quote.token_in.chain_id {
            return Err(WalletError::UnsupportedChain(format!(
                "quote for chain {} sent to chain {}",
                quote.token_in.chain_id, network.chain_id
            )));
        }
        let router = network.router_address.as_deref().ok_or_else(|| {
            WalletError::UnsupportedChain(format!(
                "no swap router configured for chain {}",
                network.chain_id
            ))
        })?;
        let path = router_path(quote, network.wrapped_native.as_deref())?;

        let owner = private_key_to_address(key.private_key())?;
        skip_allowance_check(&quote.token_in, &owner, router);

        let kind = SwapKind::for_quote(quote);
        let amount_in = parse_units(&quote.amount_in.to_string(), quote.token_in.decimals)?;
        let amount_out_min =
            parse_units(&quote.amount_out_min.to_string(), quote.token_out.decimals)?;
        let deadline = unix_now()? + SWAP_DEADLINE_SECS;

        let (data, value) = encode_swap_call(
            kind,
            amount_in,
            amount_out_min,
            &path,
            parse_address(&owner)?,
            deadline,
        );
        debug!(?kind, %router, deadline, "executing swap");

        evm.send_contract_call(key, router, value, data, quote.gas_estimate, gas_price)
            .await
    }
}

fn skip_allowance_check(token_in: &Token, owner: &str, router: &str) {
    if !token_in.is_native() {
        warn!(
            token = %token_in.path_address(),
            %owner,
            %router,
            "allowance check not implemented, router approval assumed"
        );
    }
}

fn unix_now() -> Result<u64, WalletError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| WalletError::Config(format!("system clock before epoch: {e}")))
}
