use anyhow::Result;
use scopemap::encoding::{TokenIterator, encode_signed_vlq, encode_unsigned_vlq};

#[test]
fn unsigned_values_round_trip() -> Result<()> {
    let values = [
        0u64,
        1,
        15,
        16,
        31,
        32,
        33,
        63,
        64,
        1023,
        123_456,
        u64::from(u32::MAX),
        1 << 40,
    ];
    for &value in &values {
        let mut encoded = String::new();
        encode_unsigned_vlq(value, &mut encoded);
        let mut iter = TokenIterator::new(&encoded);
        assert_eq!(iter.next_unsigned_vlq()?, value, "value {value}");
        assert!(!iter.has_next(), "no digits may remain after {value}");
    }
    Ok(())
}

#[test]
fn signed_values_round_trip() -> Result<()> {
    let values = [0i64, 1, -1, 2, -2, 31, -32, 1024, -1024, 123_456, -123_456];
    for &value in &values {
        let mut encoded = String::new();
        encode_signed_vlq(value, &mut encoded);
        let mut iter = TokenIterator::new(&encoded);
        assert_eq!(iter.next_signed_vlq()?, value, "value {value}");
    }
    Ok(())
}

#[test]
fn zero_encodes_as_a() -> Result<()> {
    let mut encoded = String::new();
    encode_unsigned_vlq(0, &mut encoded);
    assert_eq!(encoded, "A");

    let mut iter = TokenIterator::new("A");
    assert_eq!(iter.next_unsigned_vlq()?, 0);
    Ok(())
}

#[test]
fn empty_input_fails() {
    let mut iter = TokenIterator::new("");
    let err = iter.next_unsigned_vlq().expect_err("empty input must fail");
    assert!(err.to_string().contains("end of input"), "got: {err}");
}

#[test]
fn dangling_continuation_bit_fails() {
    // 'g' decodes to digit 32, which has the continuation bit set.
    let mut iter = TokenIterator::new("g");
    let err = iter
        .next_unsigned_vlq()
        .expect_err("dangling continuation must fail");
    assert!(err.to_string().contains("end of input"), "got: {err}");
}

#[test]
fn non_alphabet_character_fails() {
    let mut iter = TokenIterator::new("!");
    let err = iter
        .next_unsigned_vlq()
        .expect_err("non-alphabet byte must fail");
    assert!(err.to_string().contains("unexpected character"), "got: {err}");

    // A comma inside a quantity is just as illegal; it only terminates a
    // VLQ that is already complete.
    let mut iter = TokenIterator::new("g,");
    assert!(iter.next_unsigned_vlq().is_err());
}

#[test]
fn vlq_ends_cleanly_at_comma() -> Result<()> {
    let mut encoded = String::new();
    encode_unsigned_vlq(7, &mut encoded);
    encoded.push(',');
    encode_unsigned_vlq(9, &mut encoded);

    let mut iter = TokenIterator::new(&encoded);
    assert_eq!(iter.next_unsigned_vlq()?, 7);
    assert_eq!(iter.peek(), Some(','));
    assert_eq!(iter.next_char(), Some(','));
    assert_eq!(iter.next_unsigned_vlq()?, 9);
    assert!(!iter.has_next());
    Ok(())
}

#[test]
fn cursor_tracks_consumed_characters() -> Result<()> {
    let mut iter = TokenIterator::new("AB");
    assert!(
        iter.current_char().is_err(),
        "current_char before the first advance must fail"
    );
    assert!(iter.has_next());
    assert_eq!(iter.peek(), Some('A'));
    assert_eq!(iter.next_char(), Some('A'));
    assert_eq!(iter.current_char()?, 'A');
    assert_eq!(iter.next_char(), Some('B'));
    assert_eq!(iter.current_char()?, 'B');
    assert!(!iter.has_next());
    assert_eq!(iter.next_char(), None);
    Ok(())
}

#[test]
fn over_long_quantities_fail() {
    // Fourteen continuation digits exceed what a u64 can hold.
    let encoded = "g".repeat(14);
    let mut iter = TokenIterator::new(&encoded);
    let err = iter.next_unsigned_vlq().expect_err("over-long VLQ must fail");
    assert!(err.to_string().contains("maximum length"), "got: {err}");
}
