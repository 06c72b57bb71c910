#[cfg(test)]
mod badge_encounters_tests {
    use common::hal::simulator::{IndicatorEvent, SimHardware};
    use common::hal::{DisplayPattern, Glyph, Hardware, WakeSource};
    use common::protocol::{encode, BadgeType, IdentityRecord, QuestFlags};
    use common::{BadgeConfig, BadgeSession, FlagStore, IrqChannels, QuestState};

    fn peer(unique_id: u32, badge_type: BadgeType, magic: bool) -> IdentityRecord {
        IdentityRecord::new(unique_id, badge_type, magic, QuestFlags::ANY_CONTACT)
    }

    fn stored(session: &mut BadgeSession<'_, SimHardware<'_>>) -> Option<u8> {
        let store = FlagStore::locate(session.hardware().flash());
        store.read(session.hardware_mut().get_flash()).unwrap()
    }

    fn preload(hw: &mut SimHardware<'_>, flags: u8) {
        let store = FlagStore::locate(hw.get_flash());
        store.write(hw, flags).unwrap();
    }

    #[test]
    fn test_first_contact_then_magic_speaker() {
        let mut channels = IrqChannels::new();
        let (isr, main) = channels.split();
        let hw = SimHardware::new(isr);

        let mut session = BadgeSession::boot(hw, main, BadgeConfig::new(BadgeType::Human));
        assert_eq!(session.state(), QuestState::Attract);
        assert_eq!(stored(&mut session), Some(0x00));

        // 第一次接触：离开 Attract
        session.hardware_mut().inject_record(&peer(0x1111_1111, BadgeType::Vendor, false));
        let report = session.run_cycle();
        assert!(report.detected);
        assert_eq!(report.state, QuestState::D);
        assert_eq!(stored(&mut session), Some(0x01));

        // 魔法 Speaker：D -> E
        session.hardware_mut().inject_record(&peer(0x2222_2222, BadgeType::Speaker, true));
        let report = session.run_cycle();
        assert_eq!(report.state, QuestState::E);
        assert_eq!(session.flags().bits(), 0x03);
        assert_eq!(stored(&mut session), Some(0x03));

        // 对外广播的记录带上新标志
        assert_eq!(session.outgoing().quest_flags.bits(), 0x03);
        let sent = session.hardware().radio().sent_frames();
        assert_eq!(sent.last(), Some(&encode(session.outgoing())));
        assert_eq!(
            session.hardware().indicator().count(IndicatorEvent::Pattern(DisplayPattern::Glyph(Glyph::E))),
            1
        );
    }

    #[test]
    fn test_progress_survives_power_cycle() {
        let mut first = IrqChannels::new();
        let (isr, main) = first.split();
        let mut session = BadgeSession::boot(SimHardware::new(isr), main, BadgeConfig::default());

        session.hardware_mut().inject_record(&peer(1, BadgeType::Human, false));
        session.run_cycle();
        session.hardware_mut().inject_record(&peer(2, BadgeType::Village, true));
        session.run_cycle();
        assert_eq!(session.state(), QuestState::E);

        // 换一块电池：Flash 保留，RAM 清空
        let flash = std::mem::take(session.hardware_mut().flash_mut());

        let mut second = IrqChannels::new();
        let (isr, main) = second.split();
        let mut hw = SimHardware::new(isr);
        *hw.flash_mut() = flash;

        let session = BadgeSession::boot(hw, main, BadgeConfig::default());
        assert_eq!(session.state(), QuestState::E);
        assert_eq!(session.flags().bits(), 0x05);
        assert_eq!(session.outgoing().quest_flags.bits(), 0x05);
    }

    #[test]
    fn test_group_chat_completion() {
        let mut channels = IrqChannels::new();
        let (isr, main) = channels.split();
        let mut hw = SimHardware::new(isr);
        preload(&mut hw, 0x3F);

        let mut session = BadgeSession::boot(hw, main, BadgeConfig::default());
        assert_eq!(session.state(), QuestState::N);

        // 同一分组重复出现不影响进度
        let crowd = [
            BadgeType::Cfp,
            BadgeType::Artist,
            BadgeType::Goon,
            BadgeType::Speaker,
            BadgeType::Vendor,
            BadgeType::Press,
        ];
        for (i, badge_type) in crowd.iter().enumerate() {
            session.hardware_mut().inject_record(&peer(i as u32, *badge_type, false));
            assert_eq!(session.run_cycle().state, QuestState::N);
        }

        session.hardware_mut().inject_record(&peer(99, BadgeType::Village, false));
        assert_eq!(session.run_cycle().state, QuestState::Complete);
        assert_eq!(stored(&mut session), Some(0x7F));
        assert_eq!(session.hardware().indicator().count(IndicatorEvent::CompletionTone), 1);

        // 完成后只播放闪烁动画并定时休眠
        session.hardware_mut().inject_record(&peer(100, BadgeType::Goon, true));
        let report = session.run_cycle();
        assert_eq!(report.state, QuestState::Complete);
        assert_eq!(stored(&mut session), Some(0x7F));
        assert_eq!(
            session.hardware().sleeps().last(),
            Some(&WakeSource::PeriodicTimer { period_ms: 1500 })
        );
        assert_eq!(
            session.hardware().indicator().count(IndicatorEvent::Pattern(DisplayPattern::Sparkle)),
            1
        );
    }

    #[test]
    fn test_duplicate_magic_is_idempotent() {
        let mut channels = IrqChannels::new();
        let (isr, main) = channels.split();
        let mut hw = SimHardware::new(isr);
        preload(&mut hw, 0x03);

        let mut session = BadgeSession::boot(hw, main, BadgeConfig::default());
        assert_eq!(session.state(), QuestState::E);
        let programs = session.hardware().flash().program_count();
        let frames = session.hardware().radio().sent_frames().len();

        for _ in 0..3 {
            session.hardware_mut().inject_record(&peer(7, BadgeType::Speaker, true));
            assert_eq!(session.run_cycle().state, QuestState::E);
        }

        assert_eq!(session.flags().bits(), 0x03);
        assert_eq!(session.hardware().flash().program_count(), programs);
        assert_eq!(session.hardware().radio().sent_frames().len(), frames);
    }

    #[test]
    fn test_burst_only_first_packet_counts() {
        let mut channels = IrqChannels::new();
        let (isr, main) = channels.split();
        let mut hw = SimHardware::new(isr);
        preload(&mut hw, 0x01);

        let mut session = BadgeSession::boot(hw, main, BadgeConfig::default());
        session.hardware_mut().inject_record(&peer(1, BadgeType::Speaker, true));
        session.hardware_mut().inject_record(&peer(2, BadgeType::Village, true));
        session.hardware_mut().inject_record(&peer(3, BadgeType::Contest, true));

        let report = session.run_cycle();
        assert_eq!(report.discarded, 2);
        assert_eq!(report.state, QuestState::E);
        assert_eq!(session.flags().bits(), 0x03);
        assert_eq!(session.incoming().map(|record| record.badge_type), Some(BadgeType::Speaker));
    }

    #[test]
    fn test_malformed_frame_is_skipped() {
        let mut channels = IrqChannels::new();
        let (isr, main) = channels.split();
        let mut hw = SimHardware::new(isr);
        preload(&mut hw, 0x01);

        let mut session = BadgeSession::boot(hw, main, BadgeConfig::default());
        session.hardware_mut().inject_bytes(b"B\xD1\xD2E");
        session.hardware_mut().inject_record(&peer(1, BadgeType::Artist, true));

        let report = session.run_cycle();
        assert_eq!(report.decode_errors, 1);
        assert_eq!(report.state, QuestState::E);
        assert_eq!(session.flags().bits(), 0x11);
    }

    #[test]
    fn test_clear_flags_returns_to_attract() {
        let mut channels = IrqChannels::new();
        let (isr, main) = channels.split();
        let mut hw = SimHardware::new(isr);
        preload(&mut hw, 0x07);

        let mut session = BadgeSession::boot(hw, main, BadgeConfig::default());
        assert_eq!(session.state(), QuestState::F);

        session.clear_quest_flags();
        assert_eq!(session.state(), QuestState::Attract);
        assert_eq!(stored(&mut session), Some(0x00));
        assert_eq!(session.outgoing().quest_flags, QuestFlags::NONE);
    }
}
