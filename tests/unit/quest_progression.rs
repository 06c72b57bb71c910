#[cfg(test)]
mod quest_progression_tests {
    use common::protocol::{BadgeType, IdentityRecord, QuestFlags};
    use common::quest::{CycleEvent, Effect, QuestMachine, QuestState};
    use common::BadgeConfig;

    /// 按顺序收集的魔法类别
    const CATEGORY_ORDER: [BadgeType; 5] = [
        BadgeType::Speaker,
        BadgeType::Village,
        BadgeType::Contest,
        BadgeType::Artist,
        BadgeType::Goon,
    ];

    fn human() -> BadgeConfig {
        BadgeConfig::new(BadgeType::Human)
    }

    fn meet(badge_type: BadgeType, magic: bool) -> CycleEvent {
        CycleEvent::packet(IdentityRecord::new(0x0102_0304, badge_type, magic, QuestFlags::NONE))
    }

    #[test]
    fn test_boot_state_follows_category_count() {
        let expected = [
            QuestState::D,
            QuestState::E,
            QuestState::F,
            QuestState::C,
            QuestState::O,
            QuestState::N,
        ];

        for (count, state) in expected.iter().enumerate() {
            let mut flags = QuestFlags::ANY_CONTACT;
            for badge_type in &CATEGORY_ORDER[..count] {
                flags.insert(badge_type.quest_flag().unwrap());
            }

            let (machine, _) = QuestMachine::boot(Some(flags.bits()), &human());
            assert_eq!(machine.state(), *state, "{} 个类别", count);
        }
    }

    #[test]
    fn test_boot_without_contact_attracts() {
        // 类别位存在但未接触过任何人
        let (machine, _) = QuestMachine::boot(Some(0x06), &human());
        assert_eq!(machine.state(), QuestState::Attract);
        assert_eq!(machine.flags().bits(), 0x06);
    }

    #[test]
    fn test_boot_with_group_bit_completes() {
        let (machine, effects) = QuestMachine::boot(Some(0x7F), &human());
        assert_eq!(machine.state(), QuestState::Complete);
        assert!(effects.contains(&Effect::CompletionTone));
    }

    #[test]
    fn test_rearm_clears_contact_on_boot() {
        let mut config = human();
        config.rearm_contact_on_boot = true;

        let (machine, _) = QuestMachine::boot(Some(0x07), &config);
        assert_eq!(machine.state(), QuestState::Attract);
        assert_eq!(machine.flags().bits(), 0x06);
    }

    #[test]
    fn test_full_quest_walkthrough() {
        let (mut machine, _) = QuestMachine::boot(None, &human());
        assert_eq!(machine.state(), QuestState::Attract);

        machine.handle(meet(BadgeType::Human, false));
        assert_eq!(machine.state(), QuestState::D);

        let linear = [QuestState::E, QuestState::F, QuestState::C, QuestState::O, QuestState::N];
        for (badge_type, state) in CATEGORY_ORDER.iter().zip(linear) {
            // 非魔法的同类徽章不计入
            machine.handle(meet(*badge_type, false));
            assert_ne!(machine.state(), state);

            machine.handle(meet(*badge_type, true));
            assert_eq!(machine.state(), state);
        }
        assert_eq!(machine.flags().bits(), 0x3F);
        assert_eq!(machine.group_flags(), 0);

        // 每个分组一位代表
        for badge_type in [
            BadgeType::Uber,
            BadgeType::Goon,
            BadgeType::Speaker,
            BadgeType::Vendor,
            BadgeType::Press,
        ] {
            machine.handle(meet(badge_type, false));
            assert_eq!(machine.state(), QuestState::N);
        }

        let effects = machine.handle(meet(BadgeType::Village, false));
        assert_eq!(machine.state(), QuestState::Complete);
        assert_eq!(machine.flags(), QuestFlags::ALL);
        assert!(effects.contains(&Effect::Persist(QuestFlags::ALL)));
        assert!(effects.contains(&Effect::CompletionTone));
    }

    #[test]
    fn test_magic_categories_in_any_order() {
        let (mut machine, _) = QuestMachine::boot(Some(0x01), &human());
        assert_eq!(machine.state(), QuestState::D);

        // 先收集 Goon，再收集 Speaker
        machine.handle(meet(BadgeType::Goon, true));
        assert_eq!(machine.state(), QuestState::E);
        machine.handle(meet(BadgeType::Speaker, true));
        assert_eq!(machine.state(), QuestState::F);
        assert_eq!(machine.flags().bits(), 0x23);
    }

    #[test]
    fn test_repeat_magic_does_not_advance() {
        let (mut machine, _) = QuestMachine::boot(Some(0x03), &human());
        assert_eq!(machine.state(), QuestState::E);

        let effects = machine.handle(meet(BadgeType::Speaker, true));
        assert_eq!(machine.state(), QuestState::E);
        assert_eq!(machine.flags().bits(), 0x03);
        assert!(!effects.iter().any(|effect| matches!(effect, Effect::Persist(_))));
    }

    #[test]
    fn test_magic_badge_stays_on_d() {
        let (mut machine, effects) = QuestMachine::boot(Some(0x1F), &BadgeConfig::magic(BadgeType::Speaker));
        assert_eq!(machine.state(), QuestState::D);
        assert!(effects.contains(&Effect::Persist(QuestFlags::NONE)));

        let effects = machine.handle(meet(BadgeType::Village, true));
        assert_eq!(machine.state(), QuestState::D);
        assert_eq!(machine.flags(), QuestFlags::ANY_CONTACT);
        assert!(!effects.iter().any(|effect| matches!(effect, Effect::Persist(_))));
    }

    #[test]
    fn test_step_is_pure() {
        let (machine, _) = QuestMachine::boot(Some(0x01), &human());
        let (first, first_effects) = machine.step(meet(BadgeType::Contest, true));
        let (second, second_effects) = machine.step(meet(BadgeType::Contest, true));

        assert_eq!(first, second);
        assert_eq!(first_effects, second_effects);
        assert_eq!(machine.state(), QuestState::D);
    }
}
