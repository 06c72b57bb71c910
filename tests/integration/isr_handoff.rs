#[cfg(test)]
mod isr_handoff_tests {
    use std::thread;
    use std::time::{Duration, Instant};

    use common::protocol::{decode_frame, encode, BadgeType, FrameExtractor, IdentityRecord, QuestFlags};
    use common::IrqChannels;

    const VISITORS: u32 = 60;

    #[test]
    fn test_frames_cross_from_interrupt_thread() {
        let mut channels = IrqChannels::new();
        let (mut isr, mut main) = channels.split();

        let received = crossbeam::scope(|scope| {
            // 模拟串口接收中断：逐字节写入并在每帧结束时置位 NXH_DETECT
            scope.spawn(move |_| {
                for visitor in 0..VISITORS {
                    let badge_type = BadgeType::ALL[visitor as usize % BadgeType::ALL.len()];
                    let record = IdentityRecord::new(visitor, badge_type, visitor % 2 == 0, QuestFlags::NONE);
                    for byte in encode(&record) {
                        assert!(isr.rx.push(byte));
                    }
                    isr.detect.raise();
                }
            });

            let mut extractor = FrameExtractor::new();
            let mut received = Vec::new();
            let deadline = Instant::now() + Duration::from_secs(5);

            while received.len() < VISITORS as usize && Instant::now() < deadline {
                match extractor.try_next_frame(&mut main.rx) {
                    Some(frame) => received.push(decode_frame(&frame).unwrap()),
                    None => thread::yield_now(),
                }
            }
            received
        })
        .unwrap();

        assert_eq!(received.len(), VISITORS as usize);
        for (visitor, record) in received.iter().enumerate() {
            let visitor = visitor as u32;
            assert_eq!(record.unique_id, visitor.swap_bytes());
            assert_eq!(record.badge_type, BadgeType::ALL[visitor as usize % BadgeType::ALL.len()]);
            assert_eq!(record.magic, visitor % 2 == 0);
        }

        // 所有唤醒都已发生，消费一次后清零
        assert!(main.detect.take());
        assert!(!main.detect.take());
        assert!(!main.timer.is_raised());
    }

    #[test]
    fn test_wake_latch_sees_late_signal() {
        let mut channels = IrqChannels::new();
        let (isr, mut main) = channels.split();

        assert!(!main.timer.take());

        let timer = isr.timer;
        crossbeam::scope(|scope| {
            scope.spawn(move |_| timer.raise());
        })
        .unwrap();

        assert!(main.timer.take());
        assert!(!main.timer.take());
    }
}
