use core::sync::atomic::{AtomicU32, Ordering};

/// 中断置位、主循环消费的唤醒标志
///
/// 中断侧只递增计数，主循环只读取计数并在本地记录已经看到的值，
/// 共享内存始终只有一个写入方。单字原子读写在 Cortex-M0+ 上也可用。
pub struct WakeFlag {
    raised: AtomicU32,
}

impl WakeFlag {
    pub const fn new() -> Self {
        Self {
            raised: AtomicU32::new(0),
        }
    }

    pub fn split(&mut self) -> (WakeSignal<'_>, WakeLatch<'_>) {
        let seen = self.raised.load(Ordering::Acquire);
        (
            WakeSignal {
                raised: &self.raised,
            },
            WakeLatch {
                raised: &self.raised,
                seen,
            },
        )
    }
}

impl Default for WakeFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// 中断侧：置位
pub struct WakeSignal<'a> {
    raised: &'a AtomicU32,
}

impl<'a> WakeSignal<'a> {
    pub fn raise(&self) {
        // 只有本句柄写入，读-改-写不会与其他写入方交错
        let next = self.raised.load(Ordering::Relaxed).wrapping_add(1);
        self.raised.store(next, Ordering::Release);
    }
}

/// 主循环侧：检查并消费
pub struct WakeLatch<'a> {
    raised: &'a AtomicU32,
    seen: u32,
}

impl<'a> WakeLatch<'a> {
    /// 上次消费之后是否被置位过
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire) != self.seen
    }

    /// 消费标志，返回上次消费之后是否被置位过
    pub fn take(&mut self) -> bool {
        let current = self.raised.load(Ordering::Acquire);
        let fired = current != self.seen;
        self.seen = current;
        fired
    }
}
