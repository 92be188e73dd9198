//! Example: Render an X/Y scope frame from synthetic or file audio.
//!
//! Plays a 3:2 Lissajous figure (or the audio file given as the first
//! argument) against a manual clock on a headless target and saves the last
//! frame as a PNG.
//!
//! Run with:
//!     cargo run --example render_synthetic [-- path/to/audio.wav]

use std::path::PathBuf;

use anyhow::Context;
use phobz_scope::{
    generate_lissajous, AudioInput, Lifecycle, ManualClock, Scope, ScopeCallbacks, ScopeConfig,
    TargetSpec, Tick,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let width = 720;
    let height = 720;
    let fps = 60.0;
    let frames = 90;

    let clock = ManualClock::new();
    let input = match std::env::args().nth(1) {
        Some(path) => AudioInput::File {
            path: PathBuf::from(path),
            clock: Box::new(clock.clone()),
        },
        None => AudioInput::Decoded {
            buffer: generate_lissajous(220.0, 330.0, 0.0, 48_000, 5.0, 0.8),
            clock: Box::new(clock.clone()),
        },
    };

    let config = ScopeConfig {
        bloom: true,
        ..Default::default()
    };
    println!("Scope settings:");
    println!("  Resolution: {}x{}", width, height);
    println!("  Samples per frame window: {}", config.samples);
    println!("  Bloom: {}\n", config.bloom);

    let scope = Scope::new(
        TargetSpec::headless(width, height),
        input,
        config,
        ScopeCallbacks::new()
            .on_ready(|| println!("Audio ready"))
            .on_error(|message| eprintln!("Scope error: {message}")),
    )
    .await?;

    while scope.lifecycle().is_loading() {
        if scope.tick() == Tick::Stopped {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
    if let Lifecycle::Failed(message) = scope.lifecycle() {
        anyhow::bail!("loading failed: {message}");
    }

    println!("Rendering {} frames...", frames);
    for frame in 0..frames {
        clock.advance(1.0 / fps);
        scope.tick();
        if frame % 30 == 0 {
            println!("  Frame {frame}: segments {:?}", scope.segment_counts());
        }
    }

    let pixels = scope.read_pixels()?;
    let output_path = PathBuf::from("scope_frame.png");
    image::save_buffer(
        &output_path,
        &pixels,
        width,
        height,
        image::ExtendedColorType::Rgba8,
    )
    .with_context(|| format!("writing {}", output_path.display()))?;

    scope.destroy();
    println!("\nDone! Output: {}", output_path.display());
    Ok(())
}
