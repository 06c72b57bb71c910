//! 模拟会场人群：其他徽章按固定节奏从身边经过

use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender, TryIter};

use common::{BadgeType, IdentityRecord, QuestFlags};

/// 两位访客之间的间隔
const PASSERBY_INTERVAL: Duration = Duration::from_millis(3000);
/// 每隔多少位访客出现一个魔法徽章
const MAGIC_EVERY: u32 = 4;

pub struct Crowd {
    arrivals: Receiver<IdentityRecord>,
}

impl Crowd {
    /// 启动人群线程
    pub fn spawn() -> Self {
        let (sender, arrivals) = channel::unbounded();
        thread::spawn(move || walk(sender));
        Self { arrivals }
    }

    /// 自上次调用以来到达的访客
    pub fn arrivals(&self) -> TryIter<'_, IdentityRecord> {
        self.arrivals.try_iter()
    }
}

fn walk(sender: Sender<IdentityRecord>) {
    let mut seed: u32 = 0x2F6B_1D03;
    let mut visitor: u32 = 0;

    loop {
        thread::sleep(PASSERBY_INTERVAL);

        seed = xorshift(seed);
        visitor = visitor.wrapping_add(1);

        let badge_type = BadgeType::ALL[(seed >> 8) as usize % BadgeType::ALL.len()];
        let magic = visitor % MAGIC_EVERY == 0 && badge_type != BadgeType::Human;
        let flags = QuestFlags::from_bits((seed >> 16) as u8);

        // 主线程退出后停止
        if sender.send(IdentityRecord::new(seed, badge_type, magic, flags)).is_err() {
            return;
        }
    }
}

fn xorshift(mut x: u32) -> u32 {
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    x
}
