use sha2::{Digest, Sha256};

use crate::utils::errors::ParseError;

/// Length of the checksum CB58 appends before base58 encoding.
pub const CB58_CHECKSUM_LEN: usize = 4;

pub struct CryptoUtils;

impl CryptoUtils {
    /// SHA-256 digest. Validation IDs and warp message IDs are both derived with it.
    pub fn content_hash(bytes: &[u8]) -> [u8; 32] {
        Sha256::digest(bytes).into()
    }

    /// Encodes `bytes` as CB58: base58 over the bytes followed by the last four bytes of their
    /// SHA-256 digest.
    pub fn cb58_encode(bytes: &[u8]) -> String {
        let checksum = Self::content_hash(bytes);
        let mut input = Vec::with_capacity(bytes.len() + CB58_CHECKSUM_LEN);
        input.extend_from_slice(bytes);
        input.extend_from_slice(&checksum[32 - CB58_CHECKSUM_LEN..]);

        bs58::encode(input).into_string()
    }

    /// Decodes a CB58 string, verifying and stripping the trailing checksum.
    pub fn cb58_decode(encoded: &str) -> Result<Vec<u8>, ParseError> {
        let mut decoded = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| ParseError::InvalidEncoding(format!("base58: {}", e)))?;

        if decoded.len() < CB58_CHECKSUM_LEN {
            return Err(ParseError::InvalidLength {
                field: "cb58",
                expected: CB58_CHECKSUM_LEN,
                actual: decoded.len(),
            });
        }

        let checksum = decoded.split_off(decoded.len() - CB58_CHECKSUM_LEN);
        let expected = Self::content_hash(&decoded);
        if checksum[..] != expected[32 - CB58_CHECKSUM_LEN..] {
            return Err(ParseError::Checksum);
        }

        Ok(decoded)
    }

    /// The platform API's `hex` encoding: `0x`-prefixed hex with the same 4-byte checksum as
    /// CB58.
    pub fn checksummed_hex(bytes: &[u8]) -> String {
        let checksum = Self::content_hash(bytes);
        format!(
            "0x{}{}",
            hex::encode(bytes),
            hex::encode(&checksum[32 - CB58_CHECKSUM_LEN..])
        )
    }
}
