//! Binary layouts of warp messages, addressed calls, the validator registration payloads and the
//! access-list predicate encoding.
//!
//! Everything here is pure: no I/O, no allocation beyond the returned values, and every length
//! prefix is bounds-checked before it is trusted. All integers are big-endian; length prefixes
//! are `u32`.

use crate::models::ids::{Id, ValidationId, ID_LEN};
use crate::models::warp::{
    AccessList, AccessListItem, AddressedCall, BitSetSignature, L1ValidatorRegistrationMessage,
    PChainOwner, RegisterL1ValidatorMessage, SignedWarpMessage, UnsignedWarpMessage,
    ADDRESSED_CALL_TYPE_ID, BIT_SET_SIGNATURE_TYPE_ID, CODEC_VERSION,
    L1_VALIDATOR_REGISTRATION_TYPE_ID, REGISTER_L1_VALIDATOR_TYPE_ID, SHORT_ID_LEN,
    WARP_PRECOMPILE_ADDRESS,
};
use crate::utils::errors::ParseError;

/// Appended to warp predicates before padding, so padding can be told apart from content.
pub const PREDICATE_DELIMITER: u8 = 0xff;
const STORAGE_KEY_LEN: usize = 32;

/// Bounds-checked cursor over a byte slice.
struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn take(&mut self, field: &'static str, needed: usize) -> Result<&'a [u8], ParseError> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(ParseError::Truncated {
                field,
                needed,
                remaining,
            });
        }
        let slice = &self.bytes[self.offset..self.offset + needed];
        self.offset += needed;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], ParseError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(field, N)?);
        Ok(out)
    }

    fn u8(&mut self, field: &'static str) -> Result<u8, ParseError> {
        Ok(self.array::<1>(field)?[0])
    }

    fn u16(&mut self, field: &'static str) -> Result<u16, ParseError> {
        Ok(u16::from_be_bytes(self.array(field)?))
    }

    fn u32(&mut self, field: &'static str) -> Result<u32, ParseError> {
        Ok(u32::from_be_bytes(self.array(field)?))
    }

    fn u64(&mut self, field: &'static str) -> Result<u64, ParseError> {
        Ok(u64::from_be_bytes(self.array(field)?))
    }

    fn len_prefixed(&mut self, field: &'static str) -> Result<&'a [u8], ParseError> {
        let len = self.u32(field)? as usize;
        self.take(field, len)
    }

    fn codec(&mut self) -> Result<u16, ParseError> {
        let codec_id = self.u16("codec id")?;
        if codec_id != CODEC_VERSION {
            return Err(ParseError::UnknownCodec(codec_id));
        }
        Ok(codec_id)
    }

    fn type_id(&mut self, context: &'static str, expected: u32) -> Result<u32, ParseError> {
        let type_id = self.u32("type id")?;
        if type_id != expected {
            return Err(ParseError::UnknownTypeId { context, type_id });
        }
        Ok(type_id)
    }

    fn finish(self) -> Result<(), ParseError> {
        match self.remaining() {
            0 => Ok(()),
            extra => Err(ParseError::TrailingBytes(extra)),
        }
    }
}

fn put_len_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}

fn read_warp_message(reader: &mut Reader<'_>) -> Result<UnsignedWarpMessage, ParseError> {
    let codec_id = reader.codec()?;
    let network_id = reader.u32("network id")?;
    let source_chain_id = Id(reader.array::<ID_LEN>("source chain id")?);
    let addressed_call = parse_addressed_call(reader.len_prefixed("addressed call")?)?;

    Ok(UnsignedWarpMessage {
        codec_id,
        network_id,
        source_chain_id,
        addressed_call,
    })
}

/// Parses an unsigned warp message, including its addressed call.
pub fn parse_warp_message(bytes: &[u8]) -> Result<UnsignedWarpMessage, ParseError> {
    let mut reader = Reader::new(bytes);
    let message = read_warp_message(&mut reader)?;
    reader.finish()?;
    Ok(message)
}

pub fn pack_warp_message(message: &UnsignedWarpMessage) -> Vec<u8> {
    let addressed_call = pack_addressed_call(&message.addressed_call);
    let mut out = Vec::with_capacity(2 + 4 + ID_LEN + 4 + addressed_call.len());
    out.extend_from_slice(&message.codec_id.to_be_bytes());
    out.extend_from_slice(&message.network_id.to_be_bytes());
    out.extend_from_slice(message.source_chain_id.as_bytes());
    put_len_prefixed(&mut out, &addressed_call);
    out
}

/// Returns the raw addressed-call bytes carried by an unsigned warp message.
pub fn extract_warp_payload(bytes: &[u8]) -> Result<&[u8], ParseError> {
    let mut reader = Reader::new(bytes);
    reader.codec()?;
    reader.take("warp header", 4 + ID_LEN)?;
    let payload = reader.len_prefixed("addressed call")?;
    reader.finish()?;
    Ok(payload)
}

pub fn parse_addressed_call(bytes: &[u8]) -> Result<AddressedCall, ParseError> {
    let mut reader = Reader::new(bytes);
    let codec_id = reader.codec()?;
    let type_id = reader.type_id("addressed call", ADDRESSED_CALL_TYPE_ID)?;
    let source_address = reader.len_prefixed("source address")?.to_vec();
    let payload = reader.len_prefixed("payload")?.to_vec();
    reader.finish()?;

    Ok(AddressedCall {
        codec_id,
        type_id,
        source_address,
        payload,
    })
}

pub fn pack_addressed_call(call: &AddressedCall) -> Vec<u8> {
    let mut out =
        Vec::with_capacity(2 + 4 + 4 + call.source_address.len() + 4 + call.payload.len());
    out.extend_from_slice(&call.codec_id.to_be_bytes());
    out.extend_from_slice(&call.type_id.to_be_bytes());
    put_len_prefixed(&mut out, &call.source_address);
    put_len_prefixed(&mut out, &call.payload);
    out
}

/// Skips the source address of an encoded addressed call and returns its payload.
pub fn extract_addressed_call_payload(bytes: &[u8]) -> Result<&[u8], ParseError> {
    let mut reader = Reader::new(bytes);
    reader.codec()?;
    reader.u32("type id")?;
    reader.len_prefixed("source address")?;
    let payload = reader.len_prefixed("payload")?;
    reader.finish()?;
    Ok(payload)
}

fn read_owner(reader: &mut Reader<'_>, field: &'static str) -> Result<PChainOwner, ParseError> {
    let threshold = reader.u32(field)?;
    let count = reader.u32(field)? as usize;
    let needed = count.checked_mul(SHORT_ID_LEN).ok_or(ParseError::Truncated {
        field,
        needed: usize::MAX,
        remaining: reader.remaining(),
    })?;
    let addresses = reader
        .take(field, needed)?
        .chunks_exact(SHORT_ID_LEN)
        .map(|chunk| {
            let mut address = [0u8; SHORT_ID_LEN];
            address.copy_from_slice(chunk);
            address
        })
        .collect();

    Ok(PChainOwner {
        threshold,
        addresses,
    })
}

fn put_owner(out: &mut Vec<u8>, owner: &PChainOwner) {
    out.extend_from_slice(&owner.threshold.to_be_bytes());
    out.extend_from_slice(&(owner.addresses.len() as u32).to_be_bytes());
    for address in &owner.addresses {
        out.extend_from_slice(address);
    }
}

pub fn unpack_register_l1_validator_payload(
    bytes: &[u8],
) -> Result<RegisterL1ValidatorMessage, ParseError> {
    let mut reader = Reader::new(bytes);
    reader.codec()?;
    reader.type_id("register L1 validator", REGISTER_L1_VALIDATOR_TYPE_ID)?;

    let message = RegisterL1ValidatorMessage {
        subnet_id: Id(reader.array::<ID_LEN>("subnet id")?),
        node_id: reader.len_prefixed("node id")?.to_vec(),
        bls_public_key: reader.array("bls public key")?,
        registration_expiry: reader.u64("registration expiry")?,
        remaining_balance_owner: read_owner(&mut reader, "remaining balance owner")?,
        disable_owner: read_owner(&mut reader, "disable owner")?,
        weight: reader.u64("weight")?,
    };
    reader.finish()?;

    Ok(message)
}

pub fn pack_register_l1_validator_payload(message: &RegisterL1ValidatorMessage) -> Vec<u8> {
    let mut out = Vec::with_capacity(256);
    out.extend_from_slice(&CODEC_VERSION.to_be_bytes());
    out.extend_from_slice(&REGISTER_L1_VALIDATOR_TYPE_ID.to_be_bytes());
    out.extend_from_slice(message.subnet_id.as_bytes());
    put_len_prefixed(&mut out, &message.node_id);
    out.extend_from_slice(&message.bls_public_key);
    out.extend_from_slice(&message.registration_expiry.to_be_bytes());
    put_owner(&mut out, &message.remaining_balance_owner);
    put_owner(&mut out, &message.disable_owner);
    out.extend_from_slice(&message.weight.to_be_bytes());
    out
}

pub fn unpack_l1_validator_registration_payload(
    bytes: &[u8],
) -> Result<L1ValidatorRegistrationMessage, ParseError> {
    let mut reader = Reader::new(bytes);
    reader.codec()?;
    reader.type_id("L1 validator registration", L1_VALIDATOR_REGISTRATION_TYPE_ID)?;
    let validation_id = ValidationId(reader.array::<ID_LEN>("validation id")?);
    let registered = match reader.u8("registered")? {
        0 => false,
        1 => true,
        other => return Err(ParseError::InvalidBool(other)),
    };
    reader.finish()?;

    Ok(L1ValidatorRegistrationMessage {
        validation_id,
        registered,
    })
}

pub fn pack_l1_validator_registration_payload(message: &L1ValidatorRegistrationMessage) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 4 + ID_LEN + 1);
    out.extend_from_slice(&CODEC_VERSION.to_be_bytes());
    out.extend_from_slice(&L1_VALIDATOR_REGISTRATION_TYPE_ID.to_be_bytes());
    out.extend_from_slice(message.validation_id.as_bytes());
    out.push(message.registered as u8);
    out
}

/// Builds the unsigned warp message acknowledging `validation_id`, as sent by `source_chain_id`
/// (the P-Chain) on `network_id`. The source address is empty.
pub fn pack_l1_validator_registration(
    validation_id: ValidationId,
    registered: bool,
    network_id: u32,
    source_chain_id: Id,
) -> Vec<u8> {
    let payload = L1ValidatorRegistrationMessage {
        validation_id,
        registered,
    }
    .to_bytes();

    UnsignedWarpMessage::new(network_id, source_chain_id, AddressedCall::new(Vec::new(), payload))
        .to_bytes()
}

pub fn parse_signed_warp_message(bytes: &[u8]) -> Result<SignedWarpMessage, ParseError> {
    let mut reader = Reader::new(bytes);
    let unsigned = read_warp_message(&mut reader)?;
    reader.type_id("signature", BIT_SET_SIGNATURE_TYPE_ID)?;
    let signers = reader.len_prefixed("signers")?.to_vec();
    let signature = reader.array("bls signature")?;
    reader.finish()?;

    Ok(SignedWarpMessage {
        unsigned,
        signature: BitSetSignature { signers, signature },
    })
}

/// The unsigned message inside `bytes`, which may be a signed or an unsigned warp message.
/// P-Chain transactions carry the signed form.
pub fn parse_carried_warp_message(bytes: &[u8]) -> Result<UnsignedWarpMessage, ParseError> {
    match parse_signed_warp_message(bytes) {
        Ok(signed) => Ok(signed.unsigned),
        Err(signed_err) => parse_warp_message(bytes).map_err(|unsigned_err| match unsigned_err {
            ParseError::TrailingBytes(_) => signed_err,
            other => other,
        }),
    }
}

pub fn pack_signed_warp_message(message: &SignedWarpMessage) -> Vec<u8> {
    let mut out = pack_warp_message(&message.unsigned);
    out.extend_from_slice(&BIT_SET_SIGNATURE_TYPE_ID.to_be_bytes());
    put_len_prefixed(&mut out, &message.signature.signers);
    out.extend_from_slice(&message.signature.signature);
    out
}

/// Encodes a signed warp message as the warp precompile's access-list predicate: the bytes,
/// then [`PREDICATE_DELIMITER`], zero-padded to whole 32-byte storage keys.
pub fn pack_into_access_list(signed_message: &[u8]) -> AccessList {
    let mut predicate = Vec::with_capacity(signed_message.len() + STORAGE_KEY_LEN);
    predicate.extend_from_slice(signed_message);
    predicate.push(PREDICATE_DELIMITER);
    let padded_len = (predicate.len() + STORAGE_KEY_LEN - 1) / STORAGE_KEY_LEN * STORAGE_KEY_LEN;
    predicate.resize(padded_len, 0);

    let storage_keys = predicate
        .chunks_exact(STORAGE_KEY_LEN)
        .map(|chunk| {
            let mut key = [0u8; STORAGE_KEY_LEN];
            key.copy_from_slice(chunk);
            key
        })
        .collect();

    vec![AccessListItem {
        address: WARP_PRECOMPILE_ADDRESS,
        storage_keys,
    }]
}

/// Inverse of [`pack_into_access_list`].
pub fn unpack_access_list(access_list: &[AccessListItem]) -> Result<Vec<u8>, ParseError> {
    let item = access_list
        .iter()
        .find(|item| item.address == WARP_PRECOMPILE_ADDRESS)
        .ok_or(ParseError::InvalidPredicate("no warp precompile entry"))?;

    let mut predicate: Vec<u8> = item.storage_keys.iter().flatten().copied().collect();
    let content_len = predicate
        .iter()
        .rposition(|b| *b != 0)
        .ok_or(ParseError::InvalidPredicate("empty predicate"))?;
    if predicate[content_len] != PREDICATE_DELIMITER {
        return Err(ParseError::InvalidPredicate("missing delimiter"));
    }
    if predicate.len() - content_len > STORAGE_KEY_LEN {
        return Err(ParseError::InvalidPredicate("excess padding"));
    }
    predicate.truncate(content_len);
    Ok(predicate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_call() -> AddressedCall {
        AddressedCall::new(vec![0xaa; 20], vec![1, 2, 3])
    }

    #[test]
    fn test_addressed_call_layout() {
        let bytes = pack_addressed_call(&sample_call());
        // codec | type | srcLen | src | payloadLen | payload
        assert_eq!(bytes.len(), 2 + 4 + 4 + 20 + 4 + 3);
        assert_eq!(&bytes[0..2], &[0, 0]);
        assert_eq!(&bytes[2..6], &[0, 0, 0, 1]);
        assert_eq!(&bytes[6..10], &[0, 0, 0, 20]);
        assert_eq!(extract_addressed_call_payload(&bytes).unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_reader_rejects_oversized_length_prefix() {
        let mut bytes = pack_addressed_call(&sample_call());
        // Claim a 1000-byte source address.
        bytes[6..10].copy_from_slice(&1000u32.to_be_bytes());
        assert!(matches!(
            extract_addressed_call_payload(&bytes),
            Err(ParseError::Truncated {
                field: "source address",
                ..
            })
        ));
    }

    #[test]
    fn test_owner_count_overflow_is_truncation() {
        let mut bytes = vec![0, 0, 0, 0, 0, 1];
        bytes.extend_from_slice(&[0u8; 32]);
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&[0u8; 48]);
        bytes.extend_from_slice(&0u64.to_be_bytes());
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(&u32::MAX.to_be_bytes());

        assert!(matches!(
            unpack_register_l1_validator_payload(&bytes),
            Err(ParseError::Truncated { .. })
        ));
    }

    #[test]
    fn test_predicate_exact_multiple_has_no_padding() {
        let message = vec![0x11; 31];
        let list = pack_into_access_list(&message);
        assert_eq!(list[0].storage_keys.len(), 1);
        assert_eq!(list[0].storage_keys[0][31], PREDICATE_DELIMITER);
        assert_eq!(unpack_access_list(&list).unwrap(), message);
    }
}
