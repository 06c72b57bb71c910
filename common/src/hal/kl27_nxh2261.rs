//! MKL27Z64 + NXH2261 目标板实现
//!
//! 外设初始化、LP5569 LED 驱动和蜂鸣器由板级支持包（C）完成，这里通过 FFI 调用。
//! 中断服务程序只做三件事：把串口字节推入环形缓冲区、触发定时器标志、触发 NXH_DETECT 标志。

use core::cell::RefCell;

use cortex_m::interrupt::{self, Mutex};
use embedded_hal::blocking::delay::DelayMs;

use crate::config::SiliconId;
use crate::hal::vectors::{device_vectors, DEVICE_VECTORS};
use crate::hal::{
    DisplayPattern, FlashError, FlashInterface, Glyph, Hardware, Indicator, NfmiRadio, WakeSource,
};
use crate::protocol::FRAME_LEN;
use crate::utils::{IrqChannels, IsrHandles, MainHandles};

/// 程序 Flash 扇区大小
const SECTOR_SIZE: u32 = 1024;
/// 程序 Flash 容量
const FLASH_CAPACITY: u32 = 64 * 1024;
/// KL27 Flash 编程单位（长字）
const PROGRAM_UNIT: usize = 4;

extern "C" {
    fn kl_board_init();
    fn kl_read_uid(uid_mh: *mut u32, uid_ml: *mut u32, uid_l: *mut u32, sdid: *mut u32);
    fn kl_systick_delay_ms(ms: u32);

    fn kl_nxh_reset();
    fn kl_nxh_boot() -> i32;
    fn kl_nxh_update_line(high: u8);
    fn kl_uart_write_blocking(data: *const u8, len: usize) -> i32;
    fn kl_uart_read_byte() -> u8;
    fn kl_uart_rx_irq(enable: u8);

    fn kl_flash_erase_sector(address: u32) -> i32;
    fn kl_flash_program_longword(address: u32, word: u32) -> i32;

    fn kl_led_glyph(glyph: u8, heartbeat: u8);
    fn kl_led_all_on();
    fn kl_led_sparkle();
    fn kl_led_all_off();
    fn kl_tone_confirmation();
    fn kl_tone_completion();
    fn kl_error_indicator(use_tone: u8, use_leds: u8);

    fn kl_lptmr_arm(period_ms: u32);
    fn kl_lptmr_disarm();
    fn kl_lptmr_clear_flag();
    fn kl_detect_clear_flag();
    fn kl_enter_vlps();
}

/// 中断侧句柄，只由中断服务程序访问
static ISR_HANDLES: Mutex<RefCell<Option<IsrHandles<'static>>>> = Mutex::new(RefCell::new(None));

fn with_isr<F: FnOnce(&mut IsrHandles<'static>)>(f: F) {
    interrupt::free(|cs| {
        if let Some(handles) = ISR_HANDLES.borrow(cs).borrow_mut().as_mut() {
            f(handles);
        }
    });
}

#[no_mangle]
pub extern "C" fn LPUART0_IRQHandler() {
    let byte = unsafe { kl_uart_read_byte() };
    with_isr(|isr| {
        isr.rx.push(byte);
    });
}

#[no_mangle]
pub extern "C" fn LPTMR0_IRQHandler() {
    unsafe { kl_lptmr_clear_flag() };
    with_isr(|isr| isr.timer.raise());
}

#[no_mangle]
pub extern "C" fn PORTB_PORTC_PORTD_PORTE_IRQHandler() {
    unsafe { kl_detect_clear_flag() };
    with_isr(|isr| isr.detect.raise());
}

extern "C" {
    /// cortex-m-rt 提供的默认中断处理函数
    fn DefaultHandler();
}

/// 设备中断向量表，cortex-m-rt 的 `device` 特性要求由固件提供
#[link_section = ".vector_table.interrupts"]
#[no_mangle]
pub static __INTERRUPTS: [unsafe extern "C" fn(); DEVICE_VECTORS] = device_vectors::<unsafe extern "C" fn()>(
    DefaultHandler,
    LPUART0_IRQHandler,
    LPTMR0_IRQHandler,
    PORTB_PORTC_PORTD_PORTE_IRQHandler,
);

/// NXH2261 驱动
pub struct Nxh2261;

/// NXH2261 错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum Nxh2261Error {
    BootFailed(i32),
    UartFailed(i32),
}

impl NfmiRadio for Nxh2261 {
    type Error = Nxh2261Error;

    fn start(&mut self) -> Result<(), Self::Error> {
        unsafe {
            kl_nxh_reset();
            let ret = kl_nxh_boot();
            if ret == 0 {
                Ok(())
            } else {
                Err(Nxh2261Error::BootFailed(ret))
            }
        }
    }

    fn set_update_line(&mut self, high: bool) -> Result<(), Self::Error> {
        unsafe { kl_nxh_update_line(high as u8) };
        Ok(())
    }

    fn send_frame(&mut self, frame: &[u8; FRAME_LEN]) -> Result<(), Self::Error> {
        let ret = unsafe { kl_uart_write_blocking(frame.as_ptr(), frame.len()) };
        if ret == 0 {
            Ok(())
        } else {
            Err(Nxh2261Error::UartFailed(ret))
        }
    }
}

/// 片上程序 Flash（FTFA）
pub struct Kl27Flash;

impl Kl27Flash {
    fn check_range(address: u32, len: usize) -> Result<(), FlashError> {
        if address as usize + len > FLASH_CAPACITY as usize {
            return Err(FlashError::InvalidAddress);
        }
        Ok(())
    }
}

impl FlashInterface for Kl27Flash {
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        Self::check_range(address, buf.len())?;

        // 程序 Flash 从地址 0 开始直接映射
        let flash_ptr = address as usize as *const u8;
        unsafe {
            core::ptr::copy_nonoverlapping(flash_ptr, buf.as_mut_ptr(), buf.len());
        }
        Ok(())
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), FlashError> {
        Self::check_range(address, data.len())?;
        if address as usize % PROGRAM_UNIT != 0 || data.len() % PROGRAM_UNIT != 0 {
            return Err(FlashError::InvalidAddress);
        }

        for (index, chunk) in data.chunks_exact(PROGRAM_UNIT).enumerate() {
            let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            let target = address + (index * PROGRAM_UNIT) as u32;
            if unsafe { kl_flash_program_longword(target, word) } != 0 {
                return Err(FlashError::ProgramFailed);
            }
        }
        Ok(())
    }

    fn erase(&mut self, address: u32, size: u32) -> Result<(), FlashError> {
        if address % SECTOR_SIZE != 0 || size % SECTOR_SIZE != 0 {
            return Err(FlashError::InvalidAddress);
        }
        Self::check_range(address, size as usize)?;

        let mut sector = address;
        while sector < address + size {
            if unsafe { kl_flash_erase_sector(sector) } != 0 {
                return Err(FlashError::EraseFailed);
            }
            sector += SECTOR_SIZE;
        }
        Ok(())
    }

    fn block_size(&self) -> u32 {
        SECTOR_SIZE
    }

    fn base_address(&self) -> u32 {
        0
    }

    fn capacity(&self) -> u32 {
        FLASH_CAPACITY
    }
}

/// LP5569 LED 与蜂鸣器
pub struct Lp5569;

fn glyph_code(glyph: Glyph) -> u8 {
    match glyph {
        Glyph::D => b'D',
        Glyph::E => b'E',
        Glyph::F => b'F',
        Glyph::C => b'C',
        Glyph::O => b'O',
        Glyph::N => b'N',
    }
}

impl Indicator for Lp5569 {
    fn set_display_pattern(&mut self, pattern: DisplayPattern) {
        unsafe {
            match pattern {
                DisplayPattern::Glyph(glyph) => kl_led_glyph(glyph_code(glyph), 0),
                DisplayPattern::Heartbeat(glyph) => kl_led_glyph(glyph_code(glyph), 1),
                DisplayPattern::AllOn => kl_led_all_on(),
                DisplayPattern::Sparkle => kl_led_sparkle(),
            }
        }
    }

    fn play_confirmation_tone(&mut self) {
        unsafe { kl_tone_confirmation() };
    }

    fn play_completion_tone(&mut self) {
        unsafe { kl_tone_completion() };
    }

    fn all_leds_off(&mut self) {
        unsafe { kl_led_all_off() };
    }

    fn error_indicator(&mut self, use_tone: bool, use_leds: bool) {
        unsafe { kl_error_indicator(use_tone as u8, use_leds as u8) };
    }
}

/// 目标板硬件
pub struct Kl27Hardware {
    radio: Nxh2261,
    flash: Kl27Flash,
    indicator: Lp5569,
}

impl Kl27Hardware {
    /// 初始化板级外设，并把中断侧句柄交给中断服务程序
    ///
    /// 只能调用一次，再次调用返回 None。
    pub fn take() -> Option<(Self, MainHandles<'static>)> {
        let channels: &'static mut IrqChannels =
            cortex_m::singleton!(: IrqChannels = IrqChannels::new())?;
        let (isr, main) = channels.split();

        unsafe { kl_board_init() };
        interrupt::free(|cs| {
            ISR_HANDLES.borrow(cs).replace(Some(isr));
        });

        Some((
            Self {
                radio: Nxh2261,
                flash: Kl27Flash,
                indicator: Lp5569,
            },
            main,
        ))
    }
}

impl DelayMs<u32> for Kl27Hardware {
    fn delay_ms(&mut self, ms: u32) {
        unsafe { kl_systick_delay_ms(ms) };
    }
}

impl Hardware for Kl27Hardware {
    type Radio = Nxh2261;
    type Flash = Kl27Flash;
    type Indicator = Lp5569;

    fn silicon_id(&self) -> SiliconId {
        let mut id = SiliconId {
            uid_mh: 0,
            uid_ml: 0,
            uid_l: 0,
            sdid: 0,
        };
        unsafe { kl_read_uid(&mut id.uid_mh, &mut id.uid_ml, &mut id.uid_l, &mut id.sdid) };
        id
    }

    fn get_radio(&mut self) -> &mut Self::Radio {
        &mut self.radio
    }

    fn get_flash(&mut self) -> &mut Self::Flash {
        &mut self.flash
    }

    fn get_indicator(&mut self) -> &mut Self::Indicator {
        &mut self.indicator
    }

    fn disable_radio_irq(&mut self) {
        unsafe { kl_uart_rx_irq(0) };
    }

    fn enable_radio_irq(&mut self) {
        unsafe { kl_uart_rx_irq(1) };
    }

    fn disable_interrupts(&mut self) {
        interrupt::disable();
    }

    fn enable_interrupts(&mut self) {
        unsafe { interrupt::enable() };
    }

    fn enter_low_power_mode(&mut self, wake: WakeSource) {
        unsafe {
            match wake {
                WakeSource::PeriodicTimer { period_ms } => kl_lptmr_arm(period_ms),
                WakeSource::RadioDetect => kl_lptmr_disarm(),
            }
            // VLPS，任意使能的中断唤醒
            kl_enter_vlps();
        }
    }
}
