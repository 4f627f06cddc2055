//! Property-based test generators using proptest.
//!
//! Provides strategies for generating payloads, segment identities and
//! writer operation sequences.

use proptest::prelude::*;
use segwal_core::{SegmentInfo, SegmentResult, SegmentWriter};

/// Strategy for generating record payloads (arbitrary bytes, possibly empty).
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}

/// Strategy for generating a batch of payloads.
pub fn payload_batch_strategy() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(payload_strategy(), 0..16)
}

/// Strategy for generating valid segment identities.
///
/// `base_index` is never 0 and the size limit stays small so tests exercise
/// preallocation without allocating much.
pub fn segment_info_strategy() -> impl Strategy<Value = SegmentInfo> {
    (1u64..u64::MAX / 2, any::<u64>(), 0u64..4, 0u32..8192).prop_map(
        |(base_index, id, codec, size_limit)| {
            SegmentInfo::new(base_index, id)
                .with_codec(codec)
                .with_size_limit(size_limit)
        },
    )
}

/// An operation on a tail segment writer.
#[derive(Debug, Clone)]
pub enum WriterOp {
    /// Append a single record
    Append(Vec<u8>),
    /// Append a batch of records
    AppendBatch(Vec<Vec<u8>>),
    /// Flush to storage
    Flush,
}

/// Strategy for generating a writer operation.
pub fn writer_op_strategy() -> impl Strategy<Value = WriterOp> {
    prop_oneof![
        6 => payload_strategy().prop_map(WriterOp::Append),
        2 => payload_batch_strategy().prop_map(WriterOp::AppendBatch),
        1 => Just(WriterOp::Flush),
    ]
}

/// Strategy for generating a sequence of writer operations.
pub fn writer_ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<WriterOp>> {
    prop::collection::vec(writer_op_strategy(), 0..max_len)
}

/// Applies `ops` to `writer`, returning the payloads in position order.
pub fn apply_ops(writer: &mut SegmentWriter, ops: &[WriterOp]) -> SegmentResult<Vec<Vec<u8>>> {
    let mut model = Vec::new();
    for op in ops {
        match op {
            WriterOp::Append(payload) => {
                let position = writer.append(payload)?;
                debug_assert_eq!(position as usize, model.len());
                model.push(payload.clone());
            }
            WriterOp::AppendBatch(batch) => {
                writer.append_batch(batch)?;
                model.extend(batch.iter().cloned());
            }
            WriterOp::Flush => writer.flush()?,
        }
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TestFiler;
    use segwal_core::{file_name, HEADER_LEN};

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn sealed_segment_matches_model(
            info in segment_info_strategy(),
            ops in writer_ops_strategy(24),
        ) {
            let filer = TestFiler::memory();
            let mut writer = filer.create(&info).unwrap();
            let model = apply_ops(&mut writer, &ops).unwrap();
            prop_assert_eq!(writer.len(), model.len() as u64);
            writer.seal().unwrap();

            let reader = filer.open(&info).unwrap();
            prop_assert_eq!(reader.len(), model.len() as u64);
            for (position, expected) in model.iter().enumerate() {
                prop_assert_eq!(&reader.get(position as u64).unwrap(), expected);
            }
        }

        #[test]
        fn recovery_after_any_cut_yields_a_prefix(
            payloads in prop::collection::vec(payload_strategy(), 1..12),
            cut in any::<prop::sample::Index>(),
        ) {
            let filer = TestFiler::memory();
            let info = SegmentInfo::new(1, 1).with_size_limit(4096);
            let mut writer = filer.create(&info).unwrap();
            writer.append_batch(&payloads).unwrap();
            writer.flush().unwrap();
            let end = writer.tail_offset() as usize;
            drop(writer);

            let len = HEADER_LEN + cut.index(end - HEADER_LEN + 1);
            let vfs = filer.mem().unwrap();
            vfs.truncate_file(filer.dir(), &file_name(&info), len as u64).unwrap();

            let writer = filer.recover_tail(&info).unwrap();
            prop_assert!(writer.tail_offset() as usize <= len);
            for position in 0..writer.len() {
                prop_assert_eq!(&writer.get(position).unwrap(), &payloads[position as usize]);
            }
        }
    }
}
