#[cfg(test)]
mod packet_codec_tests {
    use common::protocol::{decode, encode, BadgeType, DecodeError, IdentityRecord, QuestFlags};
    use common::protocol::{FRAME_LEN, NIBBLE_PAD, PAYLOAD_LEN};
    use common::quest::GROUP_ALL;

    /// 把 8 字节逻辑记录按接收格式展开为 16 字节负载
    fn nibbles(bytes: [u8; 8]) -> [u8; PAYLOAD_LEN] {
        let mut payload = [0u8; PAYLOAD_LEN];
        for (i, byte) in bytes.iter().enumerate() {
            payload[i * 2] = NIBBLE_PAD | (byte >> 4);
            payload[i * 2 + 1] = NIBBLE_PAD | (byte & 0x0F);
        }
        payload
    }

    #[test]
    fn test_every_badge_type_survives_the_air() {
        for badge_type in BadgeType::ALL {
            for magic in [false, true] {
                let sent = IdentityRecord::new(0x1234_5678, badge_type, magic, QuestFlags::from_bits(0x15));
                let frame = encode(&sent);

                // 对方收到的负载不含帧头帧尾
                let received = decode(&frame[1..FRAME_LEN - 1]).unwrap();
                assert_eq!(received.badge_type, badge_type);
                assert_eq!(received.magic, magic);
                assert_eq!(received.quest_flags, sent.quest_flags);
                // 发送端重排后唯一标识字节序颠倒
                assert_eq!(received.unique_id, 0x7856_3412);
            }
        }
    }

    #[test]
    fn test_any_nonzero_magic_byte_is_magic() {
        let record = decode(&nibbles([0, 0, 0, 0, BadgeType::Village as u8, 0x80, 0x06, 0])).unwrap();
        assert!(record.magic);
        assert_eq!(record.badge_type, BadgeType::Village);
        assert_eq!(record.quest_flags.bits(), 0x06);

        let record = decode(&nibbles([0, 0, 0, 0, BadgeType::Village as u8, 0x00, 0x06, 0])).unwrap();
        assert!(!record.magic);
    }

    #[test]
    fn test_flag_bits_above_mask_are_dropped() {
        let record = decode(&nibbles([1, 2, 3, 4, BadgeType::Human as u8, 0, 0xFF, 0])).unwrap();
        assert_eq!(record.quest_flags, QuestFlags::ALL);
        assert_eq!(record.unique_id, 0x0403_0201);
    }

    #[test]
    fn test_unknown_badge_type_rejected() {
        assert_eq!(
            decode(&nibbles([0, 0, 0, 0, 10, 0, 0, 0])),
            Err(DecodeError::UnknownBadgeType(10))
        );
        assert_eq!(
            decode(&nibbles([0, 0, 0, 0, 0xFF, 1, 0, 0])),
            Err(DecodeError::UnknownBadgeType(0xFF))
        );
    }

    #[test]
    fn test_short_payload_rejected() {
        let payload = nibbles([0; 8]);
        assert_eq!(decode(&payload[..14]), Err(DecodeError::Length(14)));
    }

    #[test]
    fn test_category_table_covers_quest_bits() {
        let mut categories = QuestFlags::NONE;
        for badge_type in BadgeType::ALL {
            if let Some(flag) = badge_type.quest_flag() {
                assert!(!categories.contains(flag), "{} 重复映射", badge_type);
                categories.insert(flag);
            }
        }
        assert_eq!(categories, QuestFlags::CATEGORIES);
    }

    #[test]
    fn test_group_buckets_cover_all_six_groups() {
        let seen = BadgeType::ALL
            .iter()
            .fold(0u8, |acc, badge_type| acc | 1 << badge_type.group_bucket());
        assert_eq!(seen, GROUP_ALL);
    }
}
