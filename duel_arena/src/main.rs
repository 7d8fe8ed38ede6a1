//! duel_arena — interactive entry point.

use std::time::Duration;

use clap::Parser;
use tracing::info;

use duel_arena::app::{run, run_headless, ArenaConfig};
use duel_arena::cues::CueSettings;
use duel_core::DuelConfig;

#[derive(Parser, Debug)]
#[command(name = "duel_arena", about = "Two-player finger-gun duel")]
struct Cli {
    /// Frame width in pixels
    #[arg(long, default_value_t = 640, value_parser = clap::value_parser!(u32).range(64..=4096))]
    width: u32,

    /// Frame height in pixels
    #[arg(long, default_value_t = 480, value_parser = clap::value_parser!(u32).range(64..=4096))]
    height: u32,

    /// Projectile speed, pixels per frame
    #[arg(long, default_value_t = 20.0)]
    speed: f32,

    /// Hit points per side
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=12))]
    hp: u8,

    /// Priming hold before a round starts, in milliseconds
    #[arg(long, default_value_t = 3000, value_parser = clap::value_parser!(u64).range(0..=60_000))]
    start_hold_ms: u64,

    /// Priming hold before a rematch starts, in milliseconds
    #[arg(long, default_value_t = 750, value_parser = clap::value_parser!(u64).range(0..=60_000))]
    rematch_hold_ms: u64,

    /// Pause between worker frames, in milliseconds
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(0..=1000))]
    interval_ms: u64,

    /// Mute MIDI sound cues
    #[arg(long)]
    no_audio: bool,

    /// Run N simulated frames without a window, then print the status JSON
    #[arg(long)]
    headless_frames: Option<u64>,
}

impl Cli {
    fn config(&self) -> ArenaConfig {
        ArenaConfig {
            duel: DuelConfig {
                frame_width:      self.width as f32,
                frame_height:     self.height as f32,
                projectile_speed: self.speed,
                starting_hp:      self.hp,
                start_hold:       Duration::from_millis(self.start_hold_ms),
                rematch_hold:     Duration::from_millis(self.rematch_hold_ms),
            },
            frame_interval: Duration::from_millis(self.interval_ms),
            cues: (!self.no_audio).then(CueSettings::default),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "duel_arena=info,duel_core=info".into()),
        )
        .init();

    if !cli.speed.is_finite() || cli.speed <= 0.0 {
        anyhow::bail!("--speed must be a positive number, got {}", cli.speed);
    }
    let cfg = cli.config();

    if let Some(frames) = cli.headless_frames {
        info!(frames, "duel_arena v{} headless", env!("CARGO_PKG_VERSION"));
        let status = run_headless(cfg, frames)?;
        println!("{}", status.to_json());
        return Ok(());
    }

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║           Duel Arena — Two-Player Finger-Gun Duel            ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    #[cfg(feature = "leap")]
    println!("  Mode: LeapMotion hardware");
    #[cfg(not(feature = "leap"))]
    println!("  Mode: Keyboard simulation  (use --features leap for hardware)");
    println!();
    println!("  Raise both index fingers for {:.1} s to start.", cfg.duel.start_hold.as_secs_f32());
    println!("  Opening preview window…");
    println!();

    run(cfg)?;
    Ok(())
}
