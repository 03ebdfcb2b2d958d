use std::sync::Arc;

use prism_engine::core::{AssetConfig, GraphicsConfig, ProgramVariant};
use prism_engine::input::{InputTracker, Key, KeyState};
use prism_engine::logging::{init_logging, LoggingConfig};
use prism_engine::window::{Runtime, RuntimeConfig};

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let variant = program_variant(std::env::args().skip(1));

    let input = Arc::new(InputTracker::new());
    for key in [Key::W, Key::A, Key::S, Key::D, Key::Space] {
        input.subscribe(key, |ev| {
            if ev.state == KeyState::Pressed && !ev.repeat {
                log::debug!("key down: {}", ev.key);
            }
        });
    }
    input.subscribe(Key::Escape, |ev| {
        if ev.state.is_pressed() {
            log::info!("escape: closing after this frame");
        }
    });

    Runtime::run(
        RuntimeConfig {
            title: "prism".to_string(),
        },
        GraphicsConfig::default(),
        AssetConfig::default().with_variant(variant),
        input,
    )
}

/// `--color` draws the per-vertex color triangle instead of the textured one.
/// Other arguments are ignored.
fn program_variant(args: impl IntoIterator<Item = String>) -> ProgramVariant {
    if args.into_iter().any(|a| a == "--color") {
        ProgramVariant::Color
    } else {
        ProgramVariant::Textured
    }
}
