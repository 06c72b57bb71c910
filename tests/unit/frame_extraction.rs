#[cfg(test)]
mod frame_extraction_tests {
    use common::protocol::frame::MAX_FRAME_PAYLOAD;
    use common::protocol::{decode_frame, encode, BadgeType, DecodeError, FrameExtractor, IdentityRecord, QuestFlags};
    use common::utils::{ByteSource, RxRing};

    /// 测试用字节源
    struct Bytes<'a>(core::slice::Iter<'a, u8>);

    impl<'a> Bytes<'a> {
        fn new(data: &'a [u8]) -> Self {
            Self(data.iter())
        }
    }

    impl ByteSource for Bytes<'_> {
        fn next_byte(&mut self) -> Option<u8> {
            self.0.next().copied()
        }
    }

    fn sample_frame() -> [u8; 18] {
        encode(&IdentityRecord::new(0xCAFE_F00D, BadgeType::Artist, true, QuestFlags::from_bits(0x0B)))
    }

    #[test]
    fn test_noise_before_header_is_skipped() {
        let mut stream = b"\x00RO\xFFzz".to_vec();
        stream.extend_from_slice(&sample_frame());

        let mut extractor = FrameExtractor::new();
        let frame = extractor.try_next_frame(&mut Bytes::new(&stream)).unwrap();

        assert_eq!(frame.payload(), &sample_frame()[1..17]);
        assert!(!frame.is_overflowed());
        assert!(decode_frame(&frame).is_ok());
    }

    #[test]
    fn test_frame_split_across_calls() {
        let frame = sample_frame();
        let mut extractor = FrameExtractor::new();

        // 前半帧到达后暂时没有更多数据
        assert!(extractor.try_next_frame(&mut Bytes::new(&frame[..7])).is_none());
        assert!(extractor.is_mid_frame());

        let rest = extractor.try_next_frame(&mut Bytes::new(&frame[7..])).unwrap();
        assert_eq!(rest.payload(), &frame[1..17]);
        assert!(!extractor.is_mid_frame());
    }

    #[test]
    fn test_new_header_restarts_truncated_frame() {
        let mut stream = vec![b'B', 0xD1, 0xD2, 0xD3];
        stream.extend_from_slice(&sample_frame());

        let mut extractor = FrameExtractor::new();
        let frame = extractor.try_next_frame(&mut Bytes::new(&stream)).unwrap();
        assert_eq!(frame.len(), 16);
        assert_eq!(frame.payload(), &sample_frame()[1..17]);
    }

    #[test]
    fn test_back_to_back_frames() {
        let mut stream = sample_frame().to_vec();
        stream.extend_from_slice(&sample_frame());
        let mut source = Bytes::new(&stream);

        let mut extractor = FrameExtractor::new();
        assert!(extractor.try_next_frame(&mut source).is_some());
        assert!(extractor.try_next_frame(&mut source).is_some());
        assert!(extractor.try_next_frame(&mut source).is_none());
    }

    #[test]
    fn test_runaway_frame_is_capped() {
        let mut stream = vec![b'B'];
        stream.extend(core::iter::repeat(0xD7).take(MAX_FRAME_PAYLOAD + 8));
        stream.push(b'E');

        let mut extractor = FrameExtractor::new();
        let frame = extractor.try_next_frame(&mut Bytes::new(&stream)).unwrap();

        assert!(frame.is_overflowed());
        assert_eq!(frame.len(), MAX_FRAME_PAYLOAD);
        assert_eq!(decode_frame(&frame), Err(DecodeError::Overflow));
    }

    #[test]
    fn test_empty_frame_has_wrong_length() {
        let mut extractor = FrameExtractor::new();
        let frame = extractor.try_next_frame(&mut Bytes::new(b"BE")).unwrap();

        assert!(frame.is_empty());
        assert_eq!(decode_frame(&frame), Err(DecodeError::Length(0)));
    }

    #[test]
    fn test_full_ring_drops_newest_bytes() {
        let mut ring: RxRing<8> = RxRing::new();
        let (mut writer, mut reader) = ring.split();

        let accepted = (0u8..10).filter(|byte| writer.push(*byte)).count();
        assert_eq!(accepted, 7);
        assert_eq!(writer.dropped(), 3);
        assert_eq!(reader.capacity(), 7);

        // 已缓存的数据保持原顺序
        let drained: Vec<u8> = core::iter::from_fn(|| reader.pop()).collect();
        assert_eq!(drained, vec![0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_extracts_through_ring() {
        let mut ring: RxRing<64> = RxRing::new();
        let (mut writer, mut reader) = ring.split();
        for byte in sample_frame() {
            assert!(writer.push(byte));
        }

        let mut extractor = FrameExtractor::new();
        let frame = extractor.try_next_frame(&mut reader).unwrap();
        assert_eq!(frame.payload(), &sample_frame()[1..17]);
        assert!(reader.is_empty());
    }
}
