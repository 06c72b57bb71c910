//! KL27 设备中断向量表布局
//!
//! 向量表前 16 项由 cortex-m-rt 生成，其后 32 项设备中断按 IRQ 号排列。
//! 没有用到的中断一律指向默认处理函数。

/// KL27 设备中断数量
pub const DEVICE_VECTORS: usize = 32;

/// LPUART0 接收中断（NXH2261 串口）
pub const LPUART0_IRQ: usize = 12;
/// LPTMR0 低功耗定时器中断
pub const LPTMR0_IRQ: usize = 28;
/// PORTB/C/D/E 共用的引脚中断（NXH_DETECT）
pub const PORT_BCDE_IRQ: usize = 31;

/// 生成设备中断向量表，用到的三个中断放在各自的 IRQ 槽位
pub const fn device_vectors<T: Copy>(default: T, lpuart0: T, lptmr0: T, port_bcde: T) -> [T; DEVICE_VECTORS] {
    let mut vectors = [default; DEVICE_VECTORS];
    vectors[LPUART0_IRQ] = lpuart0;
    vectors[LPTMR0_IRQ] = lptmr0;
    vectors[PORT_BCDE_IRQ] = port_bcde;
    vectors
}
