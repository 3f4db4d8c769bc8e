use chanstore::{CodecError, MAX_HASH_LEN, decode_hashes, encode_hashes};
use proptest::prelude::*;

#[path = "generators.rs"]
mod generators;
use generators::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2000))]

    #[test]
    fn hash_list_round_trips(list in arb_hash_list()) {
        let encoded = encode_hashes(&list).unwrap();
        let expected_len: usize = list.iter().map(|h| h.len() + 1).sum();
        prop_assert_eq!(encoded.len(), expected_len);
        prop_assert_eq!(decode_hashes(&encoded).unwrap(), list);
    }

    #[test]
    fn any_oversized_element_fails_encoding(
        mut list in arb_hash_list(),
        extra in (MAX_HASH_LEN + 1)..600,
        at in any::<prop::sample::Index>(),
    ) {
        let pos = at.index(list.len() + 1);
        list.insert(pos, vec![0x5A; extra]);
        let err = encode_hashes(&list).unwrap_err();
        prop_assert_eq!(err, CodecError::HashTooLong { index: pos, len: extra });
    }

    #[test]
    fn decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        if let Ok(list) = decode_hashes(&bytes) {
            prop_assert_eq!(encode_hashes(&list).unwrap(), bytes);
        }
    }

    #[test]
    fn dropping_trailing_bytes_is_detected(list in arb_hash_list(), cut in 1_usize..64) {
        let encoded = encode_hashes(&list).unwrap();
        prop_assume!(!encoded.is_empty());
        let last_len = list.last().map_or(0, Vec::len);
        prop_assume!(last_len > 0);
        let cut = cut.min(last_len);
        let truncated = &encoded[..encoded.len() - cut];
        let is_truncated = matches!(
            decode_hashes(truncated),
            Err(CodecError::Truncated { .. })
        );
        prop_assert!(is_truncated);
    }
}
