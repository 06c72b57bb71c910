use std::collections::VecDeque;
use std::thread;
use std::time::Duration;
use std::vec::Vec;

use embedded_hal::blocking::delay::DelayMs;

use crate::config::SiliconId;
use crate::hal::{
    DisplayPattern, FlashError, FlashInterface, Hardware, Indicator, NfmiRadio, WakeSource,
};
use crate::protocol::{encode, IdentityRecord, FRAME_LEN, READY_HANDSHAKE};
use crate::utils::IsrHandles;

/// 模拟器错误类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatorError {
    /// 无线电固件载入失败
    StartFailed,
    /// 串口发送失败
    UartFailed,
}

/// 模拟 NXH2261
///
/// 入站字节先进入 `inbound`，只有在串口中断开启时才由 [`SimHardware`]
/// 搬运进接收环形缓冲区。NXH_UPDATE 出现下降沿时回送 `"RO"`。
pub struct SimRadio {
    inbound: VecDeque<u8>,
    sent: Vec<[u8; FRAME_LEN]>,
    update_line: bool,
    update_pulses: u32,
    ready_response: bool,
    start_failures: u32,
    send_failures: u32,
    started: bool,
}

impl SimRadio {
    pub fn new() -> Self {
        Self {
            inbound: VecDeque::new(),
            sent: Vec::new(),
            update_line: false,
            update_pulses: 0,
            ready_response: true,
            start_failures: 0,
            send_failures: 0,
            started: false,
        }
    }

    /// 是否在 NXH_UPDATE 脉冲后回送 `"RO"`
    pub fn set_ready_response(&mut self, enabled: bool) {
        self.ready_response = enabled;
    }

    /// 接下来 `count` 次 `start` 失败
    pub fn fail_next_starts(&mut self, count: u32) {
        self.start_failures = count;
    }

    /// 接下来 `count` 次串口发送失败
    pub fn fail_next_sends(&mut self, count: u32) {
        self.send_failures = count;
    }

    pub fn sent_frames(&self) -> &[[u8; FRAME_LEN]] {
        &self.sent
    }

    pub fn update_pulses(&self) -> u32 {
        self.update_pulses
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    fn push_inbound(&mut self, data: &[u8]) {
        self.inbound.extend(data.iter().copied());
    }

    fn has_inbound(&self) -> bool {
        !self.inbound.is_empty()
    }
}

impl Default for SimRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl NfmiRadio for SimRadio {
    type Error = SimulatorError;

    fn start(&mut self) -> Result<(), Self::Error> {
        if self.start_failures > 0 {
            self.start_failures -= 1;
            return Err(SimulatorError::StartFailed);
        }
        self.started = true;
        Ok(())
    }

    fn set_update_line(&mut self, high: bool) -> Result<(), Self::Error> {
        let falling = self.update_line && !high;
        self.update_line = high;

        if falling {
            self.update_pulses += 1;
            if self.ready_response {
                self.push_inbound(&READY_HANDSHAKE);
            }
        }
        Ok(())
    }

    fn send_frame(&mut self, frame: &[u8; FRAME_LEN]) -> Result<(), Self::Error> {
        if self.send_failures > 0 {
            self.send_failures -= 1;
            return Err(SimulatorError::UartFailed);
        }
        self.sent.push(*frame);
        Ok(())
    }
}

/// 实时模式下等待 NXH_DETECT 的轮询间隔
const DETECT_POLL_MS: u32 = 50;

/// KL27 程序 Flash 扇区大小
const SECTOR_SIZE: u32 = 1024;
/// MKL27Z64 程序 Flash 容量
const FLASH_CAPACITY: u32 = 64 * 1024;

/// 模拟片上 Flash
///
/// 擦除后为 0xFF，编程只能清除位。支持注入读取/擦除/编程失败以及静默损坏
/// （编程报告成功但数据不对，用于触发写后校验失败）。
///
/// [`SimHardware`] 把全局中断状态同步过来，未屏蔽中断时的擦除和编程会被计数。
#[derive(Debug)]
pub struct SimFlash {
    storage: Vec<u8>,
    erase_counts: Vec<u32>,
    program_count: u32,
    read_failures: u32,
    erase_failures: u32,
    program_failures: u32,
    silent_corruptions: u32,
    interrupts_masked: bool,
    unmasked_operations: u32,
}

impl SimFlash {
    pub fn new() -> Self {
        Self {
            storage: vec![0xFF; FLASH_CAPACITY as usize],
            erase_counts: vec![0; (FLASH_CAPACITY / SECTOR_SIZE) as usize],
            program_count: 0,
            read_failures: 0,
            erase_failures: 0,
            program_failures: 0,
            silent_corruptions: 0,
            interrupts_masked: false,
            unmasked_operations: 0,
        }
    }

    pub fn contents(&self, address: u32, len: usize) -> &[u8] {
        &self.storage[address as usize..address as usize + len]
    }

    pub fn erase_count(&self, address: u32) -> u32 {
        self.erase_counts[(address / SECTOR_SIZE) as usize]
    }

    pub fn program_count(&self) -> u32 {
        self.program_count
    }

    pub fn fail_next_reads(&mut self, count: u32) {
        self.read_failures = count;
    }

    pub fn fail_next_erases(&mut self, count: u32) {
        self.erase_failures = count;
    }

    pub fn fail_next_programs(&mut self, count: u32) {
        self.program_failures = count;
    }

    /// 接下来 `count` 次编程写入错误数据但报告成功
    pub fn corrupt_next_programs(&mut self, count: u32) {
        self.silent_corruptions = count;
    }

    /// 中断未屏蔽时执行的擦除和编程次数
    pub fn unmasked_operations(&self) -> u32 {
        self.unmasked_operations
    }

    fn set_interrupts_masked(&mut self, masked: bool) {
        self.interrupts_masked = masked;
    }

    fn note_operation(&mut self) {
        if !self.interrupts_masked {
            self.unmasked_operations += 1;
        }
    }

    fn check_range(&self, address: u32, len: usize) -> Result<(), FlashError> {
        let end = address as usize + len;
        if end > self.storage.len() {
            return Err(FlashError::InvalidAddress);
        }
        Ok(())
    }
}

impl Default for SimFlash {
    fn default() -> Self {
        Self::new()
    }
}

impl FlashInterface for SimFlash {
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        self.check_range(address, buf.len())?;

        if self.read_failures > 0 {
            self.read_failures -= 1;
            return Err(FlashError::ReadFailed);
        }
        buf.copy_from_slice(&self.storage[address as usize..address as usize + buf.len()]);
        Ok(())
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), FlashError> {
        self.check_range(address, data.len())?;
        self.note_operation();

        if self.program_failures > 0 {
            self.program_failures -= 1;
            return Err(FlashError::ProgramFailed);
        }
        self.program_count += 1;

        let corrupt = if self.silent_corruptions > 0 {
            self.silent_corruptions -= 1;
            true
        } else {
            false
        };

        // 编程只能把位从 1 变为 0
        for (offset, byte) in data.iter().enumerate() {
            let value = if corrupt { !*byte } else { *byte };
            self.storage[address as usize + offset] &= value;
        }
        Ok(())
    }

    fn erase(&mut self, address: u32, size: u32) -> Result<(), FlashError> {
        if address % SECTOR_SIZE != 0 || size % SECTOR_SIZE != 0 {
            return Err(FlashError::InvalidAddress);
        }
        self.check_range(address, size as usize)?;
        self.note_operation();

        if self.erase_failures > 0 {
            self.erase_failures -= 1;
            return Err(FlashError::EraseFailed);
        }

        self.storage[address as usize..(address + size) as usize].fill(0xFF);
        for sector in address / SECTOR_SIZE..(address + size) / SECTOR_SIZE {
            self.erase_counts[sector as usize] += 1;
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

/// 指示器输出记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorEvent {
    Pattern(DisplayPattern),
    ConfirmationTone,
    CompletionTone,
    LedsOff,
    Error { use_tone: bool, use_leds: bool },
}

/// 记录所有输出的 LED/蜂鸣器
///
/// [`SimHardware`] 同步串口中断状态，串口中断开启时产生的输出会被计数。
#[derive(Debug, Default)]
pub struct SimIndicator {
    events: Vec<IndicatorEvent>,
    current: Option<DisplayPattern>,
    radio_masked: bool,
    unmasked_outputs: usize,
}

impl SimIndicator {
    pub fn events(&self) -> &[IndicatorEvent] {
        &self.events
    }

    /// 当前显示的图案，熄灭时为 None
    pub fn current(&self) -> Option<DisplayPattern> {
        self.current
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    pub fn count(&self, event: IndicatorEvent) -> usize {
        self.events.iter().filter(|e| **e == event).count()
    }

    /// 串口中断开启时产生的输出数
    pub fn unmasked_outputs(&self) -> usize {
        self.unmasked_outputs
    }

    fn record(&mut self, event: IndicatorEvent) {
        if !self.radio_masked {
            self.unmasked_outputs += 1;
        }
        self.events.push(event);
    }
}

impl Indicator for SimIndicator {
    fn set_display_pattern(&mut self, pattern: DisplayPattern) {
        self.current = Some(pattern);
        self.record(IndicatorEvent::Pattern(pattern));
    }

    fn play_confirmation_tone(&mut self) {
        self.record(IndicatorEvent::ConfirmationTone);
    }

    fn play_completion_tone(&mut self) {
        self.record(IndicatorEvent::CompletionTone);
    }

    fn all_leds_off(&mut self) {
        self.current = None;
        self.record(IndicatorEvent::LedsOff);
    }

    fn error_indicator(&mut self, use_tone: bool, use_leds: bool) {
        log_warn!("error indicator (tone: {}, leds: {})", use_tone, use_leds);
        self.record(IndicatorEvent::Error { use_tone, use_leds });
    }
}

/// 模拟器硬件实现
///
/// 中断侧句柄由模拟器持有：延时和休眠期间把待收字节搬进接收缓冲区，
/// 并根据唤醒源触发定时器或 NXH_DETECT 标志。
pub struct SimHardware<'a> {
    isr: IsrHandles<'a>,
    radio: SimRadio,
    flash: SimFlash,
    indicator: SimIndicator,
    silicon_id: SiliconId,
    radio_irq_enabled: bool,
    interrupts_enabled: bool,
    elapsed_ms: u64,
    sleeps: Vec<WakeSource>,
    realtime: bool,
}

impl<'a> SimHardware<'a> {
    pub fn new(isr: IsrHandles<'a>) -> Self {
        Self {
            isr,
            radio: SimRadio::new(),
            flash: SimFlash::new(),
            indicator: SimIndicator::default(),
            silicon_id: SiliconId {
                uid_mh: 0x0000_4E46,
                uid_ml: 0x4D49_0000,
                uid_l: 0x0027_0019,
                sdid: 0x2550_0000,
            },
            radio_irq_enabled: true,
            interrupts_enabled: true,
            elapsed_ms: 0,
            sleeps: Vec::new(),
            realtime: false,
        }
    }

    pub fn with_silicon_id(mut self, silicon_id: SiliconId) -> Self {
        self.silicon_id = silicon_id;
        self
    }

    /// 延时和休眠按真实时间等待
    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// 模拟另一枚徽章发来的记录
    pub fn inject_record(&mut self, record: &IdentityRecord) {
        self.radio.push_inbound(&encode(record));
    }

    pub fn inject_bytes(&mut self, data: &[u8]) {
        self.radio.push_inbound(data);
    }

    /// 串口中断开启时，把待收字节搬进接收缓冲区
    pub fn deliver_pending(&mut self) -> usize {
        if !self.radio_irq_enabled || !self.interrupts_enabled {
            return 0;
        }

        let mut delivered = 0;
        while let Some(byte) = self.radio.inbound.pop_front() {
            self.isr.rx.push(byte);
            delivered += 1;
        }
        delivered
    }

    pub fn radio(&self) -> &SimRadio {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut SimRadio {
        &mut self.radio
    }

    pub fn flash(&self) -> &SimFlash {
        &self.flash
    }

    pub fn flash_mut(&mut self) -> &mut SimFlash {
        &mut self.flash
    }

    pub fn indicator(&self) -> &SimIndicator {
        &self.indicator
    }

    pub fn indicator_mut(&mut self) -> &mut SimIndicator {
        &mut self.indicator
    }

    pub fn radio_irq_enabled(&self) -> bool {
        self.radio_irq_enabled
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.interrupts_enabled
    }

    /// 接收缓冲区满时丢弃的字节数
    pub fn dropped_bytes(&self) -> u32 {
        self.isr.rx.dropped()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// 历次休眠使用的唤醒源
    pub fn sleeps(&self) -> &[WakeSource] {
        &self.sleeps
    }

    fn pass_time(&mut self, ms: u32) {
        self.elapsed_ms += u64::from(ms);
        if self.realtime {
            thread::sleep(Duration::from_millis(u64::from(ms)));
        }
    }
}

impl DelayMs<u32> for SimHardware<'_> {
    fn delay_ms(&mut self, ms: u32) {
        self.pass_time(ms);
        self.deliver_pending();
    }
}

impl Hardware for SimHardware<'_> {
    type Radio = SimRadio;
    type Flash = SimFlash;
    type Indicator = SimIndicator;

    fn silicon_id(&self) -> SiliconId {
        self.silicon_id
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
        self.radio_irq_enabled = false;
        self.indicator.radio_masked = true;
    }

    fn enable_radio_irq(&mut self) {
        self.radio_irq_enabled = true;
        self.indicator.radio_masked = false;
    }

    fn disable_interrupts(&mut self) {
        self.interrupts_enabled = false;
        self.flash.set_interrupts_masked(true);
    }

    fn enable_interrupts(&mut self) {
        self.interrupts_enabled = true;
        self.flash.set_interrupts_masked(false);
    }

    fn enter_low_power_mode(&mut self, wake: WakeSource) {
        self.sleeps.push(wake);

        // 有待收数据时由 NXH_DETECT 唤醒，否则等定时器
        if self.radio.has_inbound() {
            self.deliver_pending();
            self.isr.detect.raise();
            return;
        }

        match wake {
            WakeSource::PeriodicTimer { period_ms } => {
                self.pass_time(period_ms);
                self.isr.timer.raise();
            }
            // 没有数据时实时模式短暂等待后返回（虚假唤醒）
            WakeSource::RadioDetect if self.realtime => self.pass_time(DETECT_POLL_MS),
            WakeSource::RadioDetect => {}
        }
    }
}
