use l1_validator_registry::models::ids::{Id, ValidationId};
use l1_validator_registry::models::warp::{
    AddressedCall, BitSetSignature, L1ValidatorRegistrationMessage, PChainOwner,
    RegisterL1ValidatorMessage, SignedWarpMessage, UnsignedWarpMessage, WARP_PRECOMPILE_ADDRESS,
};
use l1_validator_registry::utils::errors::ParseError;
use l1_validator_registry::utils::warp_codec::*;

const SUBNET_ID: &str = "2W9boARgCWL25z6pMFNtkCfNA5v28VGg9PmBgUJfuKndEdhrvw";
const P_CHAIN_ID: &str = "11111111111111111111111111111111LpoYY";

fn validation_id_one() -> ValidationId {
    let mut bytes = [0u8; 32];
    bytes[31] = 1;
    ValidationId(bytes)
}

fn sample_registration() -> RegisterL1ValidatorMessage {
    RegisterL1ValidatorMessage {
        subnet_id: SUBNET_ID.parse().unwrap(),
        node_id: hex::decode("de31b4d8b22991d51aa6aa1fc733f23a851a8c94").unwrap(),
        bls_public_key: [0x8a; 48],
        registration_expiry: 1_735_689_600,
        remaining_balance_owner: PChainOwner::single([0x11; 20]),
        disable_owner: PChainOwner {
            threshold: 2,
            addresses: vec![[0x22; 20], [0x33; 20]],
        },
        weight: 20,
    }
}

fn sample_warp_message(payload: Vec<u8>) -> UnsignedWarpMessage {
    UnsignedWarpMessage::new(
        1337,
        Id([0x42; 32]),
        AddressedCall::new(vec![0x0f; 20], payload),
    )
}

#[test]
fn test_acknowledgment_is_deterministic() {
    let p_chain_id: Id = P_CHAIN_ID.parse().unwrap();

    let first = pack_l1_validator_registration(validation_id_one(), true, 1337, p_chain_id);
    let second = pack_l1_validator_registration(validation_id_one(), true, 1337, p_chain_id);
    assert_eq!(first, second);

    // 42-byte warp header, 14-byte addressed-call header, 39-byte payload.
    assert_eq!(first.len(), 95);
    assert_eq!(&first[0..2], &[0, 0]);
    assert_eq!(&first[2..6], &1337u32.to_be_bytes());
    assert_eq!(&first[6..38], &[0u8; 32]);
    assert_eq!(&first[38..42], &53u32.to_be_bytes());

    let payload = &first[56..];
    assert_eq!(payload.len(), 39);
    assert_eq!(&payload[0..6], &[0, 0, 0, 0, 0, 2]);
    assert_eq!(&payload[6..38], validation_id_one().as_bytes());
    assert_eq!(payload[38], 1);
}

#[test]
fn test_acknowledgment_parses_back() {
    let bytes = pack_l1_validator_registration(validation_id_one(), false, 5, Id::ZERO);
    let message = parse_warp_message(&bytes).unwrap();

    assert_eq!(message.network_id, 5);
    assert_eq!(message.source_chain_id, Id::ZERO);
    assert!(message.addressed_call.source_address.is_empty());
    assert_eq!(
        unpack_l1_validator_registration_payload(&message.addressed_call.payload).unwrap(),
        L1ValidatorRegistrationMessage {
            validation_id: validation_id_one(),
            registered: false,
        }
    );
}

#[test]
fn test_registration_payload_round_trip() {
    let message = sample_registration();
    let bytes = pack_register_l1_validator_payload(&message);

    assert_eq!(unpack_register_l1_validator_payload(&bytes).unwrap(), message);
    assert_eq!(message.validation_id(), ValidationId::of_payload(&bytes));
}

#[test]
fn test_registration_payload_field_order() {
    let bytes = pack_register_l1_validator_payload(&sample_registration());

    // codec | type | subnet | node id len | node id | bls | expiry | owners... | weight
    assert_eq!(&bytes[2..6], &1u32.to_be_bytes());
    assert_eq!(&bytes[38..42], &20u32.to_be_bytes());
    assert_eq!(&bytes[62..110], &[0x8a; 48][..]);
    assert_eq!(&bytes[110..118], &1_735_689_600u64.to_be_bytes());
    assert_eq!(&bytes[bytes.len() - 8..], &20u64.to_be_bytes());
}

#[test]
fn test_truncated_payload_is_rejected_at_every_length() {
    let bytes = pack_register_l1_validator_payload(&sample_registration());

    for len in 0..bytes.len() {
        assert!(
            matches!(
                unpack_register_l1_validator_payload(&bytes[..len]),
                Err(ParseError::Truncated { .. })
            ),
            "length {} was accepted",
            len
        );
    }
}

#[test]
fn test_oversized_addressed_call_length_is_truncation() {
    let mut bytes = sample_warp_message(vec![1, 2, 3]).to_bytes();
    bytes[38..42].copy_from_slice(&u32::MAX.to_be_bytes());

    assert!(matches!(
        parse_warp_message(&bytes),
        Err(ParseError::Truncated {
            field: "addressed call",
            ..
        })
    ));
}

#[test]
fn test_unknown_codec_is_rejected() {
    let mut bytes = sample_warp_message(vec![1]).to_bytes();
    bytes[1] = 7;

    assert_eq!(parse_warp_message(&bytes), Err(ParseError::UnknownCodec(7)));
}

#[test]
fn test_hash_payload_type_is_rejected() {
    let mut call = pack_addressed_call(&AddressedCall::new(vec![], vec![9]));
    call[2..6].copy_from_slice(&0u32.to_be_bytes());

    assert!(matches!(
        parse_addressed_call(&call),
        Err(ParseError::UnknownTypeId { type_id: 0, .. })
    ));
}

#[test]
fn test_trailing_bytes_are_rejected() {
    let mut bytes = sample_warp_message(vec![1]).to_bytes();
    bytes.push(0);

    assert_eq!(parse_warp_message(&bytes), Err(ParseError::TrailingBytes(1)));
}

#[test]
fn test_invalid_registered_flag() {
    let mut payload = L1ValidatorRegistrationMessage {
        validation_id: validation_id_one(),
        registered: true,
    }
    .to_bytes();
    payload[38] = 2;

    assert_eq!(
        unpack_l1_validator_registration_payload(&payload),
        Err(ParseError::InvalidBool(2))
    );
}

#[test]
fn test_parsing_is_pure() {
    let bytes = sample_warp_message(sample_registration().to_bytes()).to_bytes();
    let copy = bytes.clone();

    let first = parse_warp_message(&bytes).unwrap();
    let second = parse_warp_message(&bytes).unwrap();

    assert_eq!(first, second);
    assert_eq!(bytes, copy);
}

#[test]
fn test_payload_extraction_walks_both_layers() {
    let registration = sample_registration().to_bytes();
    let bytes = sample_warp_message(registration.clone()).to_bytes();

    let call = extract_warp_payload(&bytes).unwrap();
    assert_eq!(extract_addressed_call_payload(call).unwrap(), &registration[..]);
}

#[test]
fn test_signed_message_round_trip() {
    let signed = SignedWarpMessage {
        unsigned: sample_warp_message(vec![5; 10]),
        signature: BitSetSignature {
            signers: vec![0b0000_0101],
            signature: [0x77; 96],
        },
    };
    let bytes = pack_signed_warp_message(&signed);
    let parsed = parse_signed_warp_message(&bytes).unwrap();

    assert_eq!(parsed, signed);
    assert_eq!(parsed.signature.signer_count(), 2);
}

#[test]
fn test_access_list_packs_and_unpacks() {
    let message = vec![0xab; 150];
    let list = pack_into_access_list(&message);

    assert_eq!(list.len(), 1);
    assert_eq!(list[0].address, WARP_PRECOMPILE_ADDRESS);
    // 150 bytes + delimiter = 151, padded to 160.
    assert_eq!(list[0].storage_keys.len(), 5);
    assert_eq!(list[0].storage_keys[4][150 - 128], 0xff);
    assert_eq!(unpack_access_list(&list).unwrap(), message);
}

#[test]
fn test_access_list_keeps_trailing_zero_bytes() {
    let message = vec![0x01, 0x00, 0x00];
    let list = pack_into_access_list(&message);

    assert_eq!(unpack_access_list(&list).unwrap(), message);
}

#[test]
fn test_access_list_without_delimiter_is_invalid() {
    let mut list = pack_into_access_list(&[0x10; 4]);
    list[0].storage_keys[0][4] = 0;

    assert!(matches!(
        unpack_access_list(&list),
        Err(ParseError::InvalidPredicate(_))
    ));
}

#[test]
fn test_carried_message_reads_signed_form() {
    let unsigned = sample_warp_message(sample_registration().to_bytes());
    let signed = pack_signed_warp_message(&SignedWarpMessage {
        unsigned: unsigned.clone(),
        signature: BitSetSignature {
            signers: vec![0b0000_0001],
            signature: [0x77; 96],
        },
    });

    assert!(matches!(
        parse_warp_message(&signed),
        Err(ParseError::TrailingBytes(_))
    ));
    assert_eq!(parse_carried_warp_message(&signed).unwrap(), unsigned);
}

#[test]
fn test_carried_message_reads_unsigned_form() {
    let unsigned = sample_warp_message(vec![1, 2, 3]);

    assert_eq!(
        parse_carried_warp_message(&unsigned.to_bytes()).unwrap(),
        unsigned
    );
}

#[test]
fn test_carried_message_rejects_bad_signature_block() {
    let mut bytes = sample_warp_message(vec![1, 2, 3]).to_bytes();
    bytes.extend_from_slice(&[0, 0, 0, 9]);

    assert!(parse_carried_warp_message(&bytes).is_err());
}
