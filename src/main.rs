//! Headless runner: loads a BIOS and cartridge image, runs the emulator core
//! for a fixed number of frames, and reports basic status. This exists to
//! exercise the [`emu`] crate's consumer surface end to end; a real frontend
//! (video/audio/input) is out of scope for this binary.

use std::path::PathBuf;

use emu::gba::Gba;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

fn main() {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let bios_path: PathBuf = match args.next() {
        Some(path) => path.into(),
        None => {
            eprintln!("usage: clementine <bios.bin> <rom.gba> [frames]");
            std::process::exit(1);
        }
    };
    let rom_path: PathBuf = match args.next() {
        Some(path) => path.into(),
        None => {
            eprintln!("usage: clementine <bios.bin> <rom.gba> [frames]");
            std::process::exit(1);
        }
    };
    let frames: u64 = args
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(60);

    let bios_bytes = std::fs::read(&bios_path).expect("failed to read BIOS file");
    let bios: [u8; 0x4000] = bios_bytes
        .try_into()
        .expect("BIOS file must be exactly 16KB");
    let rom = std::fs::read(&rom_path).expect("failed to read ROM file");

    let mut gba = Gba::new(bios, &rom).expect("failed to initialize GBA");

    tracing::info!(
        title = %gba.cartridge_header.game_title,
        "loaded cartridge"
    );

    for frame in 0..frames {
        gba.run_frame();
        if frame % 60 == 0 {
            tracing::debug!(frame, "rendered frame");
        }
    }

    println!(
        "ran {} frames, fps counter = {}",
        frames,
        gba.get_fps_counter()
    );
}
