//! Sentinel invariants of `PaddedBuffer` under arbitrary operation
//! sequences.

use compcache::PaddedBuffer;
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    SetSize(usize),
    SetCapacity(usize),
    Fill(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..512).prop_map(Op::SetSize),
        (0usize..512).prop_map(Op::SetCapacity),
        any::<u8>().prop_map(Op::Fill),
    ]
}

fn check_sentinels(buf: &PaddedBuffer) {
    assert_eq!(buf[-1], b'\n', "head sentinel lost");
    assert_eq!(buf[buf.size() as isize], 0, "tail sentinel lost");
    assert!(buf.size() <= buf.capacity());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn sentinels_survive_operation_sequences(
        capacity in 0usize..512,
        ops in proptest::collection::vec(op_strategy(), 0..24),
    ) {
        let mut buf = PaddedBuffer::with_capacity(capacity);
        check_sentinels(&buf);
        for op in ops {
            match op {
                Op::SetSize(s) => buf.set_size(s.min(buf.capacity())),
                Op::SetCapacity(c) => buf.set_capacity(c),
                Op::Fill(b) => {
                    // Raw writes become live only once published via set_size.
                    buf.bytes_mut().fill(b);
                    buf.set_size(buf.capacity());
                }
            }
            check_sentinels(&buf);
        }
    }

    #[test]
    fn set_size_is_idempotent(content in proptest::collection::vec(any::<u8>(), 0..512)) {
        let mut buf = PaddedBuffer::from_bytes(&content);
        buf.set_size(buf.size());
        prop_assert_eq!(buf.as_bytes(), &content[..]);
        check_sentinels(&buf);
    }

    #[test]
    fn shrink_then_grow_keeps_the_prefix(
        content in proptest::collection::vec(any::<u8>(), 1..256),
        shrink_to in 0usize..256,
    ) {
        let shrink_to = shrink_to.min(content.len());
        let mut buf = PaddedBuffer::from_bytes(&content);
        buf.set_capacity(shrink_to);
        prop_assert_eq!(buf.size(), shrink_to);
        buf.set_capacity(content.len() + 64);
        prop_assert_eq!(buf.as_bytes(), &content[..shrink_to]);
        check_sentinels(&buf);
    }
}
