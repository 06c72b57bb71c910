use crate::config::{BadgeConfig, HEARTBEAT_PERIOD_MS, RETRY_SETTLE_MS};
use crate::hal::{Hardware, Indicator, NfmiRadio, WakeSource};
use crate::protocol::{BadgeLink, IdentityRecord, QuestFlags};
use crate::quest::{CycleEvent, Effect, Effects, QuestMachine, QuestState};
use crate::storage::FlagStore;
use crate::utils::{MainHandles, WakeLatch};

/// 一个调度周期的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub timer_fired: bool,
    pub detected: bool,
    /// 本周期处理的数据包
    pub packet: Option<IdentityRecord>,
    /// 被丢弃的多余数据包
    pub discarded: usize,
    /// 解码失败的帧
    pub decode_errors: usize,
    /// 周期结束时的状态
    pub state: QuestState,
}

/// 徽章会话
///
/// 持有全部主循环侧状态：硬件、链路、唤醒标志、任务状态机、Flash 存储，
/// 以及本机发送记录和最近一次收到的记录。
pub struct BadgeSession<'a, H: Hardware> {
    hw: H,
    link: BadgeLink<'a>,
    timer: WakeLatch<'a>,
    detect: WakeLatch<'a>,
    quest: QuestMachine,
    store: FlagStore,
    outgoing: IdentityRecord,
    incoming: Option<IdentityRecord>,
    config: BadgeConfig,
    radio_masked: bool,
}

impl<'a, H: Hardware> BadgeSession<'a, H> {
    /// 开机流程：恢复标志、启动无线电、推送本机记录
    pub fn boot(mut hw: H, handles: MainHandles<'a>, config: BadgeConfig) -> Self {
        // 准备好之前不接收无线电数据
        hw.disable_radio_irq();

        let unique_id = hw.silicon_id().fold();
        log_info!("Unique id {}, badge type {}", unique_id, config.badge_type);

        let store = FlagStore::locate(hw.get_flash());
        let stored = store.read(hw.get_flash()).or_else(|err| {
            log_warn!("Flag store read failed ({}), retrying", err);
            store.read(hw.get_flash())
        });

        let (quest, boot_effects) = match stored {
            Ok(stored) => QuestMachine::boot(stored, &config),
            Err(err) => {
                // 保存的进度可能仍然完好，只在内存中从零开始，不写回 Flash
                log_error!("Flag store read failed: {}", err);
                hw.get_indicator().error_indicator(true, false);
                QuestMachine::boot(Some(QuestFlags::NONE.bits()), &config)
            }
        };
        let outgoing =
            IdentityRecord::new(unique_id, config.badge_type, config.magic, quest.flags());

        let mut session = Self {
            hw,
            link: BadgeLink::new(handles.rx),
            timer: handles.timer,
            detect: handles.detect,
            quest,
            store,
            outgoing,
            incoming: None,
            config,
            radio_masked: true,
        };

        session.unmask_radio();
        session.start_radio();
        session.announce();
        let nap = session.execute(&boot_effects);
        debug_assert!(nap.is_none(), "boot effects never nap");

        log_info!("Init complete, state {}", session.quest.state());
        session
    }

    /// 执行一个调度周期
    ///
    /// 休眠等待唤醒，屏蔽串口中断后取第一个数据包交给状态机，丢弃其余数据包，
    /// 执行副作用，恢复中断。
    pub fn run_cycle(&mut self) -> CycleReport {
        if let Some(wake) = self.wake_source() {
            log_debug!("Sleeping...");
            self.hw.enter_low_power_mode(wake);
            log_debug!("Awake!");
        }

        let timer_fired = self.timer.take();
        let detected = self.detect.take();

        self.mask_radio();
        let (packet, discarded, decode_errors) = self.receive();
        let effects = self.quest.handle(CycleEvent {
            packet,
            timer_fired,
        });
        let nap = self.execute(&effects);
        self.unmask_radio();

        if let Some(period_ms) = nap {
            self.hw
                .enter_low_power_mode(WakeSource::PeriodicTimer { period_ms });
            self.timer.take();
        }

        CycleReport {
            timer_fired,
            detected,
            packet,
            discarded,
            decode_errors,
            state: self.quest.state(),
        }
    }

    /// 清空任务标志并持久化
    pub fn clear_quest_flags(&mut self) {
        let effects = self.quest.clear();
        let nap = self.execute(&effects);
        debug_assert!(nap.is_none(), "clearing flags never naps");
    }

    pub fn state(&self) -> QuestState {
        self.quest.state()
    }

    pub fn flags(&self) -> QuestFlags {
        self.quest.flags()
    }

    pub fn quest(&self) -> &QuestMachine {
        &self.quest
    }

    pub fn outgoing(&self) -> &IdentityRecord {
        &self.outgoing
    }

    /// 最近一次处理的数据包
    pub fn incoming(&self) -> Option<&IdentityRecord> {
        self.incoming.as_ref()
    }

    pub fn config(&self) -> &BadgeConfig {
        &self.config
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    /// Complete 状态由副作用自行休眠
    fn wake_source(&self) -> Option<WakeSource> {
        match self.quest.state() {
            QuestState::Complete => None,
            QuestState::Attract => Some(WakeSource::PeriodicTimer {
                period_ms: HEARTBEAT_PERIOD_MS,
            }),
            _ => Some(WakeSource::RadioDetect),
        }
    }

    /// 取第一条解码成功的记录，丢弃其余帧
    fn receive(&mut self) -> (Option<IdentityRecord>, usize, usize) {
        let mut decode_errors = 0;
        let mut packet = None;

        while let Some(result) = self.link.next_record() {
            match result {
                Ok(record) => {
                    log_info!("Received {}", record);
                    packet = Some(record);
                    break;
                }
                Err(err) => {
                    log_warn!("Dropping malformed frame: {}", err);
                    decode_errors += 1;
                }
            }
        }

        let discarded = self.link.discard_pending();
        if discarded > 0 {
            log_debug!("Discarded {} extra packets", discarded);
        }

        if packet.is_some() {
            self.incoming = packet;
        }
        (packet, discarded, decode_errors)
    }

    /// 按顺序执行副作用，返回需要在恢复中断后执行的休眠
    fn execute(&mut self, effects: &Effects) -> Option<u32> {
        let mut nap = None;

        for effect in effects.iter() {
            match *effect {
                Effect::Display(pattern) => self.hw.get_indicator().set_display_pattern(pattern),
                Effect::LedsOff => self.hw.get_indicator().all_leds_off(),
                Effect::ConfirmationTone => self.hw.get_indicator().play_confirmation_tone(),
                Effect::CompletionTone => self.hw.get_indicator().play_completion_tone(),
                Effect::Pause(ms) => self.hw.delay_ms(ms),
                Effect::Persist(flags) => self.persist(flags),
                Effect::Announce => self.announce(),
                Effect::Nap(ms) => nap = Some(ms),
            }
        }
        nap
    }

    /// 写入 Flash；失败时保留内存中的值并报警
    fn persist(&mut self, flags: QuestFlags) {
        match self.store.write(&mut self.hw, flags.bits()) {
            Ok(()) => log_info!("Flags {} saved", flags),
            Err(err) => {
                log_error!("Flash write error: {}", err);
                self.hw.get_indicator().error_indicator(true, false);
            }
        }
        self.outgoing.quest_flags = flags;
    }

    /// 把本机记录推送给 NXH2261，失败重试一次
    ///
    /// 握手字节经由串口中断进入缓冲区，推送期间临时开启串口中断。
    fn announce(&mut self) {
        let was_masked = self.radio_masked;
        if was_masked {
            self.unmask_radio();
        }

        if let Err(err) = self.link.update_outgoing(&mut self.hw, &self.outgoing) {
            log_warn!("NFMI update failed ({}), retrying", err);
            if let Err(err) = self.link.update_outgoing(&mut self.hw, &self.outgoing) {
                log_error!("NFMI packet error: {}", err);
            }
        }

        if was_masked {
            self.mask_radio();
        }
    }

    /// 启动无线电，失败重试一次后以 LED 报警
    fn start_radio(&mut self) {
        if self.hw.get_radio().start().is_ok() {
            log_info!("NFMI radio ready");
            return;
        }

        log_warn!("NFMI radio start failed, retrying");
        self.hw.delay_ms(RETRY_SETTLE_MS);
        if self.hw.get_radio().start().is_err() {
            log_error!("NFMI radio start failed");
            self.hw.get_indicator().error_indicator(false, true);
        }
    }

    fn mask_radio(&mut self) {
        self.hw.disable_radio_irq();
        self.radio_masked = true;
    }

    fn unmask_radio(&mut self) {
        self.hw.enable_radio_irq();
        self.radio_masked = false;
    }
}
