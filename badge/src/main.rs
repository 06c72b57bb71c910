#![cfg_attr(not(feature = "simulator"), no_std)]
#![cfg_attr(not(feature = "simulator"), no_main)]

#[cfg(feature = "simulator")]
mod crowd;

#[cfg(feature = "kl27")]
use {defmt_rtt as _, panic_probe as _};

use common::{log_info, BadgeConfig, BadgeSession, BadgeType};

/// 出厂烧录的徽章身份
const FACTORY_CONFIG: BadgeConfig = BadgeConfig::new(BadgeType::Human);

#[cfg(feature = "simulator")]
fn main() {
    // 模拟器入口
    use common::hal::simulator::SimHardware;
    use common::IrqChannels;

    let config = match config_from_args(std::env::args().skip(1)) {
        Some(config) => config,
        None => {
            eprintln!("用法: badge [徽章类型] [--magic] [--rearm]");
            std::process::exit(2);
        }
    };

    log_info!("启动 NFMI 徽章（模拟器模式）: {}", config.badge_type);

    let mut channels = IrqChannels::new();
    let (isr, main_handles) = channels.split();
    let hardware = SimHardware::new(isr).with_realtime(true);
    let crowd = crowd::Crowd::spawn();

    let mut session = BadgeSession::boot(hardware, main_handles, config);

    loop {
        // 路过的徽章由 NXH2261 收到后送入串口
        for record in crowd.arrivals() {
            session.hardware_mut().inject_record(&record);
        }

        let report = session.run_cycle();
        if let Some(packet) = report.packet {
            log_info!("收到 {} -> 状态 {} 标志 {}", packet, report.state, session.flags());
        }
        if report.discarded > 0 {
            log_info!("丢弃 {} 个多余数据包", report.discarded);
        }
    }
}

/// 解析命令行：可选的徽章类型名，以及 `--magic` / `--rearm`
#[cfg(feature = "simulator")]
fn config_from_args<I: Iterator<Item = String>>(args: I) -> Option<BadgeConfig> {
    let mut config = FACTORY_CONFIG;

    for arg in args {
        match arg.as_str() {
            "--magic" => config.magic = true,
            "--rearm" => config.rearm_contact_on_boot = true,
            name => config.badge_type = BadgeType::from_name(name)?,
        }
    }

    Some(config)
}

#[cfg(feature = "kl27")]
#[link_section = ".flash_config"]
#[used]
static FLASH_CONFIG: [u8; 16] = [
    // 后门密钥
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    // FPROT3..0：不保护任何区域
    0xFF, 0xFF, 0xFF, 0xFF,
    // FSEC 非加密，FOPT，FEPROT，FDPROT
    0xFE, 0x3D, 0xFF, 0xFF,
];

#[cfg(feature = "kl27")]
#[cortex_m_rt::entry]
fn main() -> ! {
    // KL27 目标板入口
    use common::hal::kl27_nxh2261::Kl27Hardware;

    let (hardware, main_handles) = match Kl27Hardware::take() {
        Some(parts) => parts,
        // 只会在入口被重复调用时发生
        None => loop {
            cortex_m::asm::wfi();
        },
    };

    badge_main(hardware, main_handles, FACTORY_CONFIG)
}

#[cfg(feature = "kl27")]
fn badge_main<H: common::Hardware>(
    hardware: H,
    main_handles: common::MainHandles<'static>,
    config: BadgeConfig,
) -> ! {
    let mut session = BadgeSession::boot(hardware, main_handles, config);
    log_info!("Badge booted, entering main loop");

    loop {
        session.run_cycle();
    }
}
