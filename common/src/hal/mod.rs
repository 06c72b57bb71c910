#[cfg(feature = "kl27")]
pub mod kl27_nxh2261;
#[cfg(feature = "simulator")]
pub mod simulator;
pub mod vectors;

use core::fmt;

use embedded_hal::blocking::delay::DelayMs;

use crate::config::SiliconId;
use crate::protocol::FRAME_LEN;

/// NFMI 无线电接口（NXH2261）
pub trait NfmiRadio {
    type Error;

    /// 载入无线电固件并完成校准
    fn start(&mut self) -> Result<(), Self::Error>;

    /// 设置 NXH_UPDATE 引脚电平
    fn set_update_line(&mut self, high: bool) -> Result<(), Self::Error>;

    /// 通过串口发送完整的 18 字节帧
    fn send_frame(&mut self, frame: &[u8; FRAME_LEN]) -> Result<(), Self::Error>;
}

/// Flash 错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "kl27", derive(defmt::Format))]
pub enum FlashError {
    InvalidAddress,
    EraseFailed,
    ProgramFailed,
    VerifyFailed,
    ReadFailed,
}

impl fmt::Display for FlashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FlashError::InvalidAddress => "invalid address",
            FlashError::EraseFailed => "erase failed",
            FlashError::ProgramFailed => "program failed",
            FlashError::VerifyFailed => "verify failed",
            FlashError::ReadFailed => "read failed",
        };
        f.write_str(text)
    }
}

/// 片上程序 Flash
///
/// - 擦除后所有字节为 0xFF
/// - 编程只能把位从 1 变为 0，写入前必须先擦除
/// - 擦除/编程期间程序存储不可取指，调用方负责屏蔽中断
pub trait FlashInterface {
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), FlashError>;

    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), FlashError>;

    /// 擦除从 `address` 开始的 `size` 字节，必须按扇区对齐
    fn erase(&mut self, address: u32, size: u32) -> Result<(), FlashError>;

    /// 最小擦除单元
    fn block_size(&self) -> u32;

    /// 程序存储起始地址
    fn base_address(&self) -> u32;

    /// 程序存储总大小
    fn capacity(&self) -> u32;
}

/// 显示字母
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "kl27", derive(defmt::Format))]
pub enum Glyph {
    D,
    E,
    F,
    C,
    O,
    N,
}

impl Glyph {
    /// Attract 模式循环中的下一个字母
    pub fn next(self) -> Self {
        match self {
            Glyph::D => Glyph::E,
            Glyph::E => Glyph::F,
            Glyph::F => Glyph::C,
            Glyph::C => Glyph::O,
            Glyph::O => Glyph::N,
            Glyph::N => Glyph::D,
        }
    }
}

/// LED 显示图案
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "kl27", derive(defmt::Format))]
pub enum DisplayPattern {
    /// 常亮显示字母
    Glyph(Glyph),
    /// 字母呼吸灯（渐亮渐灭）
    Heartbeat(Glyph),
    /// 全部点亮
    AllOn,
    /// 任务完成后的闪烁动画
    Sparkle,
}

/// 休眠唤醒源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "kl27", derive(defmt::Format))]
pub enum WakeSource {
    /// 低功耗定时器周期唤醒
    PeriodicTimer { period_ms: u32 },
    /// NXH_DETECT 外部中断唤醒
    RadioDetect,
}

/// LED 与蜂鸣器
pub trait Indicator {
    fn set_display_pattern(&mut self, pattern: DisplayPattern);

    /// 收集到新类别时的提示音
    fn play_confirmation_tone(&mut self);

    /// 任务完成的庆祝音乐
    fn play_completion_tone(&mut self);

    fn all_leds_off(&mut self);

    /// 错误提示：蜂鸣和/或 LED 闪烁
    fn error_indicator(&mut self, use_tone: bool, use_leds: bool);
}

/// 硬件抽象层接口
pub trait Hardware: DelayMs<u32> {
    type Radio: NfmiRadio;
    type Flash: FlashInterface;
    type Indicator: Indicator;

    /// 芯片唯一标识
    fn silicon_id(&self) -> SiliconId;

    fn get_radio(&mut self) -> &mut Self::Radio;

    fn get_flash(&mut self) -> &mut Self::Flash;

    fn get_indicator(&mut self) -> &mut Self::Indicator;

    /// 屏蔽 NFMI 串口接收中断
    fn disable_radio_irq(&mut self);

    fn enable_radio_irq(&mut self);

    /// 屏蔽全部中断
    fn disable_interrupts(&mut self);

    fn enable_interrupts(&mut self);

    /// 进入低功耗模式，直到中断唤醒
    fn enter_low_power_mode(&mut self, wake: WakeSource);
}
