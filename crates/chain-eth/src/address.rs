use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::{EncodedPoint, PublicKey};
use sha3::{Digest, Keccak256};

use crate::error::EthError;

/// Derives a lowercase `0x`-prefixed Ethereum address from an uncompressed
/// secp256k1 public key (65 bytes, starting with 0x04).
///
/// The address is the last 20 bytes of Keccak-256 over the 64-byte key
/// (without the 0x04 prefix). Use [`checksum_address`] for the EIP-55 form.
pub fn pubkey_to_eth_address(uncompressed_pubkey: &[u8; 65]) -> Result<String, EthError> {
    if uncompressed_pubkey[0] != 0x04 {
        return Err(EthError::InvalidPublicKey(
            "uncompressed key must start with 0x04".into(),
        ));
    }

    let hash = Keccak256::digest(&uncompressed_pubkey[1..]);
    Ok(format!("0x{}", hex::encode(&hash[12..])))
}

/// Derives the address for a compressed secp256k1 public key (33 bytes).
///
/// The key is decompressed via k256 first, since the address hash is always
/// taken over the uncompressed coordinates.
pub fn pubkey_bytes_to_eth_address(pubkey_33_bytes: &[u8; 33]) -> Result<String, EthError> {
    let encoded = EncodedPoint::from_bytes(pubkey_33_bytes).map_err(|e| {
        EthError::InvalidPublicKey(format!("invalid compressed key encoding: {e}"))
    })?;

    let pubkey: Option<PublicKey> = PublicKey::from_encoded_point(&encoded).into();
    let pubkey = pubkey.ok_or_else(|| {
        EthError::InvalidPublicKey("point is not on the secp256k1 curve".into())
    })?;

    let uncompressed = pubkey.to_encoded_point(false);
    let key_65: [u8; 65] = uncompressed
        .as_bytes()
        .try_into()
        .map_err(|_| EthError::InvalidPublicKey("unexpected uncompressed length".into()))?;

    pubkey_to_eth_address(&key_65)
}

/// Derives the lowercase address controlled by a raw 32-byte private key.
pub fn private_key_to_address(private_key: &[u8; 32]) -> Result<String, EthError> {
    let signing_key = SigningKey::from_bytes(private_key.into())
        .map_err(|e| EthError::InvalidPrivateKey(e.to_string()))?;

    let uncompressed = signing_key.verifying_key().to_encoded_point(false);
    let key_65: [u8; 65] = uncompressed
        .as_bytes()
        .try_into()
        .map_err(|_| EthError::InvalidPublicKey("unexpected uncompressed length".into()))?;

    pubkey_to_eth_address(&key_65)
}

/// Parses a strict `0x` + 40 hex character address into its 20 bytes.
///
/// Case is not checked here; callers that accept user input should run
/// [`validate_address`] first when they want EIP-55 enforcement.
pub fn parse_address(address: &str) -> Result<[u8; 20], EthError> {
    let hex_str = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| EthError::InvalidAddress("address must start with 0x".into()))?;

    if hex_str.len() != 40 {
        return Err(EthError::InvalidAddress(format!(
            "expected 40 hex characters, got {}",
            hex_str.len()
        )));
    }

    let bytes = hex::decode(hex_str)
        .map_err(|e| EthError::InvalidAddress(format!("invalid hex: {e}")))?;

    let mut addr = [0u8; 20];
    addr.copy_from_slice(&bytes);
    Ok(addr)
}

/// Validates an Ethereum address string.
///
/// Checks that the address has the correct format (0x + 40 hex characters).
/// If the address contains mixed case, the EIP-55 checksum is verified and
/// `Ok(false)` is returned on mismatch.
pub fn validate_address(address: &str) -> Result<bool, EthError> {
    let hex_part = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| EthError::InvalidAddress("address must start with 0x".into()))?;

    if hex_part.len() != 40 {
        return Err(EthError::InvalidAddress(format!(
            "expected 40 hex characters, got {}",
            hex_part.len()
        )));
    }

    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(EthError::InvalidAddress(
            "address contains non-hex characters".into(),
        ));
    }

    let is_all_lower = hex_part.chars().all(|c| !c.is_ascii_uppercase());
    let is_all_upper = hex_part.chars().all(|c| !c.is_ascii_lowercase());

    if is_all_lower || is_all_upper {
        return Ok(true);
    }

    let checksummed = checksum_address(&format!("0x{}", hex_part.to_lowercase()))?;
    Ok(checksummed[2..] == *hex_part)
}

/// Applies EIP-55 mixed-case checksum encoding to an Ethereum address.
pub fn checksum_address(address: &str) -> Result<String, EthError> {
    let raw = parse_address(address)?;
    let hex_part = hex::encode(raw);

    // EIP-55: hash the lowercase hex address (without 0x).
    let hash = Keccak256::digest(hex_part.as_bytes());

    let mut checksummed = String::with_capacity(42);
    checksummed.push_str("0x");

    for (i, c) in hex_part.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            checksummed.push(c.to_ascii_uppercase());
        } else {
            checksummed.push(c);
        }
    }

    Ok(checksummed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_one() -> [u8; 32] {
        let mut privkey = [0u8; 32];
        privkey[31] = 1;
        privkey
    }

    #[test]
    fn eip55_checksum_known_addresses() {
        // Test vectors from EIP-55.
        let cases = [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ];

        for expected in &cases {
            let lower = expected.to_lowercase();
            let result = checksum_address(&lower).unwrap();
            assert_eq!(&result, expected, "checksum mismatch for {}", expected);
        }
    }

    #[test]
    fn validate_checksummed_and_single_case_addresses() {
        assert!(validate_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap());
        assert!(validate_address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap());
        assert!(validate_address("0x5AAEB6053F3E94C9B9A09F33669435E7EF1BEAED").unwrap());
    }

    #[test]
    fn validate_bad_checksum_returns_false() {
        let addr = "0x5AAEB6053F3E94C9b9A09f33669435E7Ef1BeAed";
        assert!(!validate_address(addr).unwrap());
    }

    #[test]
    fn validate_malformed_addresses_error() {
        assert!(validate_address("0x5aAeb6053F").is_err());
        assert!(validate_address("5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").is_err());
        assert!(validate_address("0xGGGGb6053F3E94C9b9A09f33669435E7Ef1BeAed").is_err());
    }

    #[test]
    fn private_key_one_known_address() {
        let address = private_key_to_address(&key_one()).unwrap();
        assert_eq!(address, "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf");
        assert_eq!(
            checksum_address(&address).unwrap(),
            "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"
        );
    }

    #[test]
    fn compressed_and_uncompressed_agree() {
        let secret = k256::SecretKey::from_bytes((&key_one()).into()).unwrap();
        let pubkey = secret.public_key();

        let compressed: [u8; 33] = pubkey
            .to_encoded_point(true)
            .as_bytes()
            .try_into()
            .unwrap();
        let uncompressed: [u8; 65] = pubkey
            .to_encoded_point(false)
            .as_bytes()
            .try_into()
            .unwrap();

        assert_eq!(
            pubkey_bytes_to_eth_address(&compressed).unwrap(),
            pubkey_to_eth_address(&uncompressed).unwrap()
        );
    }

    #[test]
    fn zero_private_key_is_rejected() {
        assert!(matches!(
            private_key_to_address(&[0u8; 32]),
            Err(EthError::InvalidPrivateKey(_))
        ));
    }

    #[test]
    fn invalid_uncompressed_prefix_errors() {
        let mut key = [0u8; 65];
        key[0] = 0x03;
        assert!(pubkey_to_eth_address(&key).is_err());
    }

    #[test]
    fn parse_address_roundtrips_bytes() {
        let bytes = parse_address("0x0000000000000000000000000000000000000001").unwrap();
        let mut expected = [0u8; 20];
        expected[19] = 1;
        assert_eq!(bytes, expected);
    }

    #[test]
    fn parse_address_rejects_bad_input() {
        assert!(parse_address("0xdead").is_err());
        assert!(parse_address("dead000000000000000000000000000000000000").is_err());
        assert!(parse_address("0xzz00000000000000000000000000000000000000").is_err());
    }
}
