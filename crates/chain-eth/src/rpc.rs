//! JSON-RPC 2.0 plumbing for EVM nodes.
//!
//! [`RpcTransport`] is the seam: the HTTP implementation talks to a real
//! node, tests script responses in memory. [`EthRpcClient`] layers the typed
//! `eth_*` methods the wallet needs on top of any transport.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::EthError;

/// The `error` member of a JSON-RPC response.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RpcErrorObject {
    #[serde(default)]
    pub code: i64,
    pub message: String,
}

/// A JSON-RPC response envelope. Exactly one of the members is normally set.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

impl RpcResponse {
    pub fn ok(result: Value) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(RpcErrorObject {
                code: -32000,
                message: message.into(),
            }),
        }
    }
}

/// Sends one JSON-RPC request and returns the raw envelope.
///
/// `Err` is reserved for transport failures (connection, TLS, non-JSON body);
/// node-side errors come back inside [`RpcResponse::error`].
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn call(&self, method: &str, params: Value) -> Result<RpcResponse, EthError>;
}

/// [`RpcTransport`] over HTTP POST using reqwest.
pub struct HttpRpcTransport {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpRpcTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RpcTransport for HttpRpcTransport {
    async fn call(&self, method: &str, params: Value) -> Result<RpcResponse, EthError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(method, id, url = %self.url, "sending JSON-RPC request");

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EthError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| EthError::Network(e.to_string()))?;

        match serde_json::from_str::<RpcResponse>(&text) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => {
                Err(EthError::Network(format!("HTTP {status}: {text}")))
            }
            Err(e) => Err(EthError::Protocol(format!("invalid JSON-RPC response: {e}"))),
        }
    }
}

/// Typed `eth_*` calls over a shared transport.
#[derive(Clone)]
pub struct EthRpcClient {
    transport: Arc<dyn RpcTransport>,
}

impl EthRpcClient {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    /// Convenience constructor for an HTTP endpoint.
    pub fn http(url: impl Into<String>) -> Self {
        Self::new(Arc::new(HttpRpcTransport::new(url)))
    }

    /// Performs a call and unwraps the envelope: `error.message` becomes
    /// [`EthError::Network`], a missing `result` becomes [`EthError::Protocol`].
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, EthError> {
        let response = self.transport.call(method, params).await?;
        if let Some(err) = response.error {
            return Err(EthError::Network(err.message));
        }
        response
            .result
            .ok_or_else(|| EthError::Protocol(format!("{method}: response has no result")))
    }

    /// `eth_getTransactionCount(address, "latest")`.
    pub async fn transaction_count(&self, address: &str) -> Result<u64, EthError> {
        let result = self
            .request("eth_getTransactionCount", json!([address, "latest"]))
            .await?;
        let count = parse_quantity(&result)?;
        u64::try_from(count).map_err(|_| EthError::Protocol(format!("nonce {count} exceeds u64")))
    }

    /// `eth_gasPrice`, in wei.
    pub async fn gas_price(&self) -> Result<u128, EthError> {
        let result = self.request("eth_gasPrice", json!([])).await?;
        parse_quantity(&result)
    }

    /// `baseFeePerGas` of the latest block; `None` on pre-London chains.
    pub async fn latest_base_fee(&self) -> Result<Option<u128>, EthError> {
        let block = self
            .request("eth_getBlockByNumber", json!(["latest", false]))
            .await?;
        match block.get("baseFeePerGas") {
            None | Some(Value::Null) => Ok(None),
            Some(fee) => parse_quantity(fee).map(Some),
        }
    }

    /// `eth_maxPriorityFeePerGas`, in wei.
    pub async fn max_priority_fee(&self) -> Result<u128, EthError> {
        let result = self.request("eth_maxPriorityFeePerGas", json!([])).await?;
        parse_quantity(&result)
    }

    /// `eth_call` against the latest block, returning the raw return data.
    pub async fn call(&self, to: &str, data: &[u8]) -> Result<Vec<u8>, EthError> {
        let params = json!([{ "to": to, "data": format!("0x{}", hex::encode(data)) }, "latest"]);
        let result = self.request("eth_call", params).await?;
        let text = result
            .as_str()
            .ok_or_else(|| EthError::Protocol("eth_call result is not a string".into()))?;
        let stripped = text
            .strip_prefix("0x")
            .ok_or_else(|| EthError::Protocol(format!("eth_call result '{text}' lacks 0x")))?;
        hex::decode(stripped).map_err(|e| EthError::Protocol(format!("eth_call result: {e}")))
    }

    /// `eth_sendRawTransaction(["0x" + hex])`, returning the tx hash.
    ///
    /// A node error maps to [`EthError::Network`] with the node's message; a
    /// response with no usable hash maps to [`EthError::FailedToSendTransaction`].
    pub async fn send_raw_transaction(&self, raw_tx: &[u8]) -> Result<String, EthError> {
        let raw_hex = format!("0x{}", hex::encode(raw_tx));
        let response = self
            .transport
            .call("eth_sendRawTransaction", json!([raw_hex]))
            .await?;

        if let Some(err) = response.error {
            return Err(EthError::Network(err.message));
        }

        match response.result {
            Some(Value::String(hash)) if !hash.is_empty() => Ok(hash),
            _ => Err(EthError::FailedToSendTransaction),
        }
    }
}

/// Parses a `0x`-prefixed hex quantity such as `"0x4a817c800"`.
pub fn parse_quantity(value: &Value) -> Result<u128, EthError> {
    let text = value
        .as_str()
        .ok_or_else(|| EthError::Protocol(format!("expected hex quantity, got {value}")))?;
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .ok_or_else(|| EthError::Protocol(format!("quantity '{text}' lacks 0x prefix")))?;
    if digits.is_empty() {
        return Err(EthError::Protocol("empty hex quantity".into()));
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| EthError::Protocol(format!("quantity '{text}': {e}")))
}
