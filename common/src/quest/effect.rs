use heapless::Vec;

use crate::hal::DisplayPattern;
use crate::protocol::QuestFlags;

/// 单次状态转换最多产生的副作用数
pub const MAX_EFFECTS: usize = 12;

/// 状态机请求执行的副作用，按顺序执行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "kl27", derive(defmt::Format))]
pub enum Effect {
    Display(DisplayPattern),
    LedsOff,
    ConfirmationTone,
    CompletionTone,
    /// 忙等延时（毫秒）
    Pause(u32),
    /// 把标志写入 Flash，并更新本机发送记录
    Persist(QuestFlags),
    /// 把本机发送记录推送给 NXH2261
    Announce,
    /// 以定时器唤醒进入低功耗（毫秒）
    Nap(u32),
}

pub type Effects = Vec<Effect, MAX_EFFECTS>;

/// 构建副作用列表
///
/// 每个状态分支产生的副作用都远少于 [`MAX_EFFECTS`]，超出部分丢弃。
#[derive(Default)]
pub(crate) struct EffectList {
    effects: Effects,
}

impl EffectList {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, effect: Effect) -> &mut Self {
        if self.effects.push(effect).is_err() {
            log_warn!("Effect list full, dropping effect");
        }
        self
    }

    pub(crate) fn finish(self) -> Effects {
        self.effects
    }
}
