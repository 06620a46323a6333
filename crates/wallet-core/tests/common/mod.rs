//! In-memory EVM node, in-memory Esplora and a tiny HTTP mock for
//! integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chain_btc::balance::AddressStats;
use chain_btc::esplora::{EsploraApi, TxSummary};
use chain_btc::fee::FeeRecommendation;
use chain_btc::utxo::Utxo;
use chain_btc::BtcError;
use chain_eth::rpc::{RpcResponse, RpcTransport};
use chain_eth::transaction::{decode_signed_legacy, recover_legacy_sender, tx_hash};
use chain_eth::EthError;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const PHRASE: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

pub const GWEI: u128 = 1_000_000_000;

/// How the node answers `eth_sendRawTransaction`.
#[derive(Debug, Clone)]
pub enum SendBehavior {
    Accept,
    Reject(String),
    NoResult,
}

/// EVM node that tracks nonces per sender.
///
/// A legacy transaction whose nonce differs from the sender's count is
/// rejected with "nonce too low", the way a real node refuses a reused
/// nonce. `eth_getTransactionCount` yields before answering so concurrent
/// callers interleave.
pub struct FakeNode {
    nonces: Mutex<HashMap<String, u64>>,
    sent: Mutex<Vec<Vec<u8>>>,
    calls: Mutex<Vec<String>>,
    send_behavior: Mutex<SendBehavior>,
    pub gas_price: u128,
    pub base_fee: u128,
    pub priority_fee: u128,
    pub call_result: Mutex<Vec<u8>>,
}

impl FakeNode {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            nonces: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            send_behavior: Mutex::new(SendBehavior::Accept),
            gas_price: 10 * GWEI,
            base_fee: 20 * GWEI,
            priority_fee: GWEI,
            call_result: Mutex::new(vec![0u8; 32]),
        })
    }

    pub fn set_nonce(&self, address: &str, nonce: u64) {
        self.nonces
            .lock()
            .unwrap()
            .insert(address.to_ascii_lowercase(), nonce);
    }

    pub fn nonce_of(&self, address: &str) -> u64 {
        self.nonces
            .lock()
            .unwrap()
            .get(&address.to_ascii_lowercase())
            .copied()
            .unwrap_or(0)
    }

    pub fn set_send_behavior(&self, behavior: SendBehavior) {
        *self.send_behavior.lock().unwrap() = behavior;
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn accept(&self, raw: Vec<u8>) -> RpcResponse {
        if raw.first() == Some(&0x02) {
            let hash = tx_hash(&raw);
            self.sent.lock().unwrap().push(raw);
            return RpcResponse::ok(json!(hash));
        }

        let decoded = match decode_signed_legacy(&raw) {
            Ok(decoded) => decoded,
            Err(e) => return RpcResponse::err(format!("rlp: {e}")),
        };
        let sender = match recover_legacy_sender(&raw) {
            Ok(sender) => sender,
            Err(e) => return RpcResponse::err(format!("invalid sender: {e}")),
        };

        let mut nonces = self.nonces.lock().unwrap();
        let expected = nonces.entry(sender).or_insert(0);
        if decoded.tx.nonce != *expected {
            return RpcResponse::err("nonce too low");
        }
        *expected += 1;
        drop(nonces);

        let hash = tx_hash(&raw);
        self.sent.lock().unwrap().push(raw);
        RpcResponse::ok(json!(hash))
    }
}

fn quantity(value: u128) -> Value {
    json!(format!("0x{value:x}"))
}

#[async_trait]
impl RpcTransport for FakeNode {
    async fn call(&self, method: &str, params: Value) -> Result<RpcResponse, EthError> {
        self.calls.lock().unwrap().push(method.to_string());

        let response = match method {
            "eth_getTransactionCount" => {
                let address = params[0].as_str().unwrap_or_default().to_string();
                let count = self.nonce_of(&address);
                for _ in 0..4 {
                    tokio::task::yield_now().await;
                }
                quantity(u128::from(count))
            }
            "eth_gasPrice" => quantity(self.gas_price),
            "eth_maxPriorityFeePerGas" => quantity(self.priority_fee),
            "eth_getBlockByNumber" => json!({ "baseFeePerGas": format!("0x{:x}", self.base_fee) }),
            "eth_call" => json!(format!("0x{}", hex::encode(&*self.call_result.lock().unwrap()))),
            "eth_sendRawTransaction" => {
                let behavior = self.send_behavior.lock().unwrap().clone();
                return Ok(match behavior {
                    SendBehavior::Reject(message) => RpcResponse::err(message),
                    SendBehavior::NoResult => RpcResponse::default(),
                    SendBehavior::Accept => {
                        let raw_hex = params[0].as_str().unwrap_or_default();
                        match hex::decode(raw_hex.trim_start_matches("0x")) {
                            Ok(raw) => self.accept(raw),
                            Err(e) => RpcResponse::err(format!("hex: {e}")),
                        }
                    }
                });
            }
            other => return Ok(RpcResponse::err(format!("method {other} not found"))),
        };
        Ok(RpcResponse::ok(response))
    }
}

/// Esplora backend with canned UTXOs and fee rates.
#[derive(Default)]
pub struct FakeEsplora {
    pub utxos: Mutex<HashMap<String, Vec<Utxo>>>,
    pub stats: Mutex<HashMap<String, AddressStats>>,
    /// `None` makes the fee endpoint fail.
    pub fees: Option<FeeRecommendation>,
    pub txid: String,
    pub broadcasts: Mutex<Vec<String>>,
    pub requests: Mutex<Vec<String>>,
}

impl FakeEsplora {
    pub fn new(txid: &str) -> Self {
        Self {
            txid: txid.to_string(),
            ..Self::default()
        }
    }

    pub fn with_utxos(self, address: &str, utxos: Vec<Utxo>) -> Self {
        self.utxos.lock().unwrap().insert(address.to_string(), utxos);
        self
    }

    pub fn with_fees(mut self, fees: FeeRecommendation) -> Self {
        self.fees = Some(fees);
        self
    }

    fn record(&self, request: String) {
        self.requests.lock().unwrap().push(request);
    }
}

#[async_trait]
impl EsploraApi for FakeEsplora {
    async fn address_stats(&self, address: &str) -> Result<AddressStats, BtcError> {
        self.record(format!("stats {address}"));
        Ok(self
            .stats
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_default())
    }

    async fn utxos(&self, address: &str) -> Result<Vec<Utxo>, BtcError> {
        self.record(format!("utxo {address}"));
        Ok(self
            .utxos
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_default())
    }

    async fn transactions(&self, address: &str) -> Result<Vec<TxSummary>, BtcError> {
        self.record(format!("txs {address}"));
        Ok(Vec::new())
    }

    async fn broadcast(&self, raw_tx_hex: &str) -> Result<String, BtcError> {
        self.record("broadcast".to_string());
        self.broadcasts.lock().unwrap().push(raw_tx_hex.to_string());
        Ok(self.txid.clone())
    }

    async fn recommended_fees(&self) -> Result<FeeRecommendation, BtcError> {
        self.record("fees".to_string());
        self.fees
            .ok_or_else(|| BtcError::Network("fee API down".into()))
    }
}

pub fn confirmed_utxo(txid_byte: u8, vout: u32, value_sat: u64) -> Utxo {
    Utxo {
        txid: hex::encode([txid_byte; 32]),
        vout,
        value_sat,
        confirmed: true,
    }
}

/// One canned HTTP answer.
#[derive(Debug, Clone)]
pub struct Route {
    pub method: &'static str,
    pub path: String,
    pub status: u16,
    pub body: String,
}

impl Route {
    pub fn get(path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: "GET",
            path: path.into(),
            status: 200,
            body: body.into(),
        }
    }

    pub fn post(path: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            method: "POST",
            path: path.into(),
            status,
            body: body.into(),
        }
    }
}

/// A request the mock server saw: method, path and body.
pub type Seen = (String, String, String);

/// Starts an HTTP/1.1 server on an ephemeral port that answers by
/// `(method, path)`. Returns the base URL and the request log.
pub async fn start_http_mock(routes: Vec<Route>) -> (String, Arc<Mutex<Vec<Seen>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let routes = Arc::new(routes);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let log = seen.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let routes = routes.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let Some((method, path, body)) = read_request(&mut socket).await else {
                    return;
                };
                log.lock()
                    .unwrap()
                    .push((method.clone(), path.clone(), body));

                let (status, body) = routes
                    .iter()
                    .find(|r| r.method == method && r.path == path)
                    .map(|r| (r.status, r.body.clone()))
                    .unwrap_or((404, "not found".to_string()));
                let reason = match status {
                    200 => "OK",
                    400 => "Bad Request",
                    404 => "Not Found",
                    500 => "Internal Server Error",
                    _ => "Unknown",
                };
                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{addr}"), seen)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<(String, String, String)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut request_line = head.lines().next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
    Some((method, path, body))
}
