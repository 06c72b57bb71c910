//! 任务状态机
//!
//! 状态机本身不接触硬件：[`QuestMachine::step`] 接收一个周期内的事件，
//! 返回新状态和需要执行的副作用列表，由会话层负责执行。

pub mod effect;

use core::fmt;

pub use effect::{Effect, Effects, MAX_EFFECTS};

use crate::config::{
    BadgeConfig, ACK_DISPLAY_MS, ADVANCE_PAUSE_MS, COMPLETION_PAUSE_MS, SPARKLE_PERIOD_MS,
};
use crate::hal::{DisplayPattern, Glyph};
use crate::protocol::{IdentityRecord, QuestFlags};
use effect::EffectList;

/// 六个分组全部见到
pub const GROUP_ALL: u8 = 0x3F;

/// 开机播放完成音乐前后的停顿
const BOOT_TUNE_LEAD_MS: u32 = 100;
const BOOT_TUNE_TAIL_MS: u32 = 500;

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "kl27", derive(defmt::Format))]
pub enum QuestState {
    /// 尚未与任何人通信，循环播放字母动画
    Attract,
    D,
    E,
    F,
    C,
    O,
    /// 群聊任务：需要见到全部六个分组
    N,
    /// 任务完成
    Complete,
}

impl QuestState {
    /// 由已收集类别数推导线性状态（0..=5 → D..N）
    pub fn linear(count: u32) -> Self {
        match count {
            0 => QuestState::D,
            1 => QuestState::E,
            2 => QuestState::F,
            3 => QuestState::C,
            4 => QuestState::O,
            _ => QuestState::N,
        }
    }

    /// 由任务标志推导状态，群聊完成位优先
    pub fn from_flags(flags: QuestFlags) -> Self {
        if flags.contains(QuestFlags::GROUP_COMPLETE) {
            QuestState::Complete
        } else {
            Self::linear(flags.category_count())
        }
    }

    /// 该状态显示的字母
    pub fn glyph(self) -> Option<Glyph> {
        match self {
            QuestState::D => Some(Glyph::D),
            QuestState::E => Some(Glyph::E),
            QuestState::F => Some(Glyph::F),
            QuestState::C => Some(Glyph::C),
            QuestState::O => Some(Glyph::O),
            QuestState::N => Some(Glyph::N),
            QuestState::Attract | QuestState::Complete => None,
        }
    }

    /// 线性状态 D..O
    pub fn is_collecting(self) -> bool {
        matches!(
            self,
            QuestState::D | QuestState::E | QuestState::F | QuestState::C | QuestState::O
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            QuestState::Attract => "Attract",
            QuestState::D => "D",
            QuestState::E => "E",
            QuestState::F => "F",
            QuestState::C => "C",
            QuestState::O => "O",
            QuestState::N => "N",
            QuestState::Complete => "Complete",
        }
    }
}

impl fmt::Display for QuestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 一个调度周期内观察到的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleEvent {
    /// 本周期处理的第一个数据包（其余已丢弃）
    pub packet: Option<IdentityRecord>,
    /// 定时器唤醒
    pub timer_fired: bool,
}

impl CycleEvent {
    pub fn packet(record: IdentityRecord) -> Self {
        Self {
            packet: Some(record),
            timer_fired: false,
        }
    }

    pub fn timer() -> Self {
        Self {
            packet: None,
            timer_fired: true,
        }
    }
}

/// 任务状态机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestMachine {
    state: QuestState,
    flags: QuestFlags,
    /// 本次上电见到的分组，不持久化
    group_flags: u8,
    /// Attract 动画下一个字母
    attract_cursor: Glyph,
    /// 本机为魔法徽章：停留在 D，不收集
    magic: bool,
}

impl QuestMachine {
    /// 根据 Flash 中的标志恢复状态
    ///
    /// `stored` 为 None 表示扇区未初始化。
    pub fn boot(stored: Option<u8>, config: &BadgeConfig) -> (Self, Effects) {
        let mut effects = EffectList::new();
        let mut machine = Self {
            state: QuestState::Attract,
            flags: QuestFlags::NONE,
            group_flags: 0,
            attract_cursor: Glyph::D,
            magic: config.magic,
        };

        if config.magic {
            // 魔法徽章不参与游戏，清空标志
            machine.state = QuestState::D;
            effects.push(Effect::Persist(QuestFlags::NONE));
            log_info!("Magic badge, flags cleared");
            return (machine, effects.finish());
        }

        match stored {
            None => {
                log_info!("Flag store uninitialized, starting fresh");
                effects.push(Effect::Persist(QuestFlags::NONE));
            }
            Some(bits) => {
                machine.flags = QuestFlags::from_bits(bits);

                if machine.flags.contains(QuestFlags::GROUP_COMPLETE) {
                    machine.state = QuestState::Complete;
                    effects
                        .push(Effect::Pause(BOOT_TUNE_LEAD_MS))
                        .push(Effect::CompletionTone)
                        .push(Effect::Pause(BOOT_TUNE_TAIL_MS));
                } else {
                    if config.rearm_contact_on_boot {
                        machine.flags.remove(QuestFlags::ANY_CONTACT);
                    }
                    if machine.flags.contains(QuestFlags::ANY_CONTACT) {
                        machine.state = QuestState::from_flags(machine.flags);
                    }
                }
            }
        }

        log_info!("Boot state {}, flags {}", machine.state, machine.flags);
        (machine, effects.finish())
    }

    pub fn state(&self) -> QuestState {
        self.state
    }

    pub fn flags(&self) -> QuestFlags {
        self.flags
    }

    pub fn group_flags(&self) -> u8 {
        self.group_flags
    }

    pub fn attract_cursor(&self) -> Glyph {
        self.attract_cursor
    }

    pub fn is_magic(&self) -> bool {
        self.magic
    }

    /// 就地处理一个周期的事件
    pub fn handle(&mut self, event: CycleEvent) -> Effects {
        let (next, effects) = self.step(event);
        *self = next;
        effects
    }

    /// 纯状态转换：`(状态, 事件) -> (新状态, 副作用)`
    pub fn step(self, event: CycleEvent) -> (Self, Effects) {
        let mut next = self;
        let mut effects = EffectList::new();

        match self.state {
            QuestState::Attract => next.attract(event, &mut effects),
            QuestState::D
            | QuestState::E
            | QuestState::F
            | QuestState::C
            | QuestState::O => next.collect(event, &mut effects),
            QuestState::N => next.group_chat(event, &mut effects),
            QuestState::Complete => next.sparkle(&mut effects),
        }

        if next.state != self.state {
            log_info!("State {} -> {} (flags {})", self.state, next.state, next.flags);
        }
        (next, effects.finish())
    }

    /// 清空任务标志，回到开机初始状态
    pub fn clear(&mut self) -> Effects {
        let mut effects = EffectList::new();

        self.flags = QuestFlags::NONE;
        self.group_flags = 0;
        self.attract_cursor = Glyph::D;
        self.state = if self.magic {
            QuestState::D
        } else {
            QuestState::Attract
        };

        effects
            .push(Effect::Persist(QuestFlags::NONE))
            .push(Effect::LedsOff)
            .push(Effect::Announce);
        log_info!("Quest flags cleared, state {}", self.state);
        effects.finish()
    }

    fn attract(&mut self, event: CycleEvent, effects: &mut EffectList) {
        let packet = match event.packet {
            Some(packet) => packet,
            None => {
                if event.timer_fired {
                    effects.push(Effect::Display(DisplayPattern::Heartbeat(self.attract_cursor)));
                    self.attract_cursor = self.attract_cursor.next();
                }
                return;
            }
        };

        log_debug!("Attract contact from {}", packet);
        self.flags.insert(QuestFlags::ANY_CONTACT);
        self.enter(QuestState::from_flags(self.flags));

        effects.push(Effect::Persist(self.flags));
        if let Some(glyph) = self.state.glyph() {
            effects.push(Effect::Display(DisplayPattern::Glyph(glyph)));
        }
        effects
            .push(Effect::ConfirmationTone)
            .push(Effect::Pause(ADVANCE_PAUSE_MS))
            .push(Effect::LedsOff)
            .push(Effect::Announce);
    }

    fn collect(&mut self, event: CycleEvent, effects: &mut EffectList) {
        let packet = match event.packet {
            Some(packet) => packet,
            None => return,
        };

        self.acknowledge(effects);
        if self.magic {
            // 魔法徽章只在内存中记录接触，不写 Flash
            self.note_contact();
            return;
        }

        let contacted = self.note_contact();
        let category = match packet.badge_type.quest_flag() {
            Some(flag) if packet.magic && !self.flags.contains(flag) => flag,
            _ => {
                if contacted {
                    effects.push(Effect::Persist(self.flags)).push(Effect::Announce);
                }
                return;
            }
        };

        self.flags.insert(category);
        self.enter(QuestState::from_flags(self.flags));
        log_info!("Collected {} from {}", packet.badge_type, packet.unique_id);

        effects.push(Effect::Pause(ADVANCE_PAUSE_MS)).push(Effect::Persist(self.flags));
        if let Some(glyph) = self.state.glyph() {
            effects.push(Effect::Display(DisplayPattern::Glyph(glyph)));
        }
        effects
            .push(Effect::ConfirmationTone)
            .push(Effect::Pause(ADVANCE_PAUSE_MS))
            .push(Effect::LedsOff)
            .push(Effect::Announce);
    }

    fn group_chat(&mut self, event: CycleEvent, effects: &mut EffectList) {
        let packet = match event.packet {
            Some(packet) => packet,
            None => return,
        };

        self.acknowledge(effects);
        let contacted = self.note_contact();

        self.group_flags |= 1 << packet.badge_type.group_bucket();
        log_debug!("Group flags {}", self.group_flags);

        if self.group_flags & GROUP_ALL != GROUP_ALL {
            if contacted {
                effects.push(Effect::Persist(self.flags)).push(Effect::Announce);
            }
            return;
        }

        self.flags.insert(QuestFlags::GROUP_COMPLETE);
        self.enter(QuestState::Complete);

        effects
            .push(Effect::LedsOff)
            .push(Effect::Pause(ADVANCE_PAUSE_MS))
            .push(Effect::Persist(self.flags))
            .push(Effect::CompletionTone)
            .push(Effect::Announce)
            .push(Effect::Pause(COMPLETION_PAUSE_MS));
    }

    fn sparkle(&mut self, effects: &mut EffectList) {
        effects
            .push(Effect::Display(DisplayPattern::Sparkle))
            .push(Effect::LedsOff)
            .push(Effect::Nap(SPARKLE_PERIOD_MS));
    }

    /// 收到数据包后短暂显示当前状态
    fn acknowledge(&self, effects: &mut EffectList) {
        let pattern = match self.state.glyph() {
            Some(_) if self.magic => DisplayPattern::AllOn,
            Some(glyph) => DisplayPattern::Glyph(glyph),
            None => return,
        };

        effects
            .push(Effect::Display(pattern))
            .push(Effect::Pause(ACK_DISPLAY_MS))
            .push(Effect::LedsOff);
    }

    /// 置位“已接触”，返回是否为新置位
    fn note_contact(&mut self) -> bool {
        if self.flags.contains(QuestFlags::ANY_CONTACT) {
            return false;
        }
        self.flags.insert(QuestFlags::ANY_CONTACT);
        true
    }

    fn enter(&mut self, state: QuestState) {
        if state == QuestState::N && self.state != QuestState::N {
            self.group_flags = 0;
        }
        self.state = state;
    }
}
