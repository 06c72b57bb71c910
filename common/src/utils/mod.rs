#[macro_use]
pub mod log;
pub mod ring_buffer;
pub mod wake_flag;

pub use ring_buffer::{ByteSource, RxReader, RxRing, RxWriter, RX_RING_SIZE};
pub use wake_flag::{WakeFlag, WakeLatch, WakeSignal};

/// 中断与主循环之间共享的全部状态
///
/// 接收环形缓冲区和两个唤醒标志。`split` 只能在独占借用下调用一次，
/// 中断侧与主循环侧各拿到一组只能单向使用的句柄。
pub struct IrqChannels {
    rx: RxRing<RX_RING_SIZE>,
    timer: WakeFlag,
    detect: WakeFlag,
}

/// 中断侧句柄：只写
pub struct IsrHandles<'a> {
    /// NFMI 串口接收中断写入端
    pub rx: RxWriter<'a, RX_RING_SIZE>,
    /// 低功耗定时器中断
    pub timer: WakeSignal<'a>,
    /// NXH_DETECT 外部中断
    pub detect: WakeSignal<'a>,
}

/// 主循环侧句柄：只读
pub struct MainHandles<'a> {
    pub rx: RxReader<'a, RX_RING_SIZE>,
    pub timer: WakeLatch<'a>,
    pub detect: WakeLatch<'a>,
}

impl IrqChannels {
    pub const fn new() -> Self {
        Self {
            rx: RxRing::new(),
            timer: WakeFlag::new(),
            detect: WakeFlag::new(),
        }
    }

    pub fn split(&mut self) -> (IsrHandles<'_>, MainHandles<'_>) {
        let (rx_writer, rx_reader) = self.rx.split();
        let (timer_signal, timer_latch) = self.timer.split();
        let (detect_signal, detect_latch) = self.detect.split();

        (
            IsrHandles {
                rx: rx_writer,
                timer: timer_signal,
                detect: detect_signal,
            },
            MainHandles {
                rx: rx_reader,
                timer: timer_latch,
                detect: detect_latch,
            },
        )
    }
}

impl Default for IrqChannels {
    fn default() -> Self {
        Self::new()
    }
}
