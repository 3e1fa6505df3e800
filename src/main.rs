//! Arcade Sim - headless demo
//!
//! Plays rounds with a scripted input at 60 Hz and logs what happened.
//!
//! Usage: `arcade-sim [tuning.json] [seconds]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use arcade_sim::Tuning;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Arcade Sim (headless) starting...");

    let mut args = std::env::args().skip(1);
    let tuning = match args.next() {
        Some(path) => match Tuning::load(&path) {
            Ok(tuning) => tuning,
            Err(err) => {
                log::error!("Could not load {path}: {err}");
                std::process::exit(1);
            }
        },
        None => Tuning::default(),
    };
    let seconds = args
        .next()
        .and_then(|s| s.parse::<f32>().ok())
        .unwrap_or(120.0);

    if let Err(err) = demo::run(tuning, seconds) {
        log::error!("{err}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is the deliverable on the web; there is no headless demo
}

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use arcade_sim::audio::LogAudio;
    use arcade_sim::platform::{Action, InputState};
    use arcade_sim::renderer::RecordingScene;
    use arcade_sim::sim::{Collaborators, FrameDriver, GamePhase, KinematicWorld, SimContext};
    use arcade_sim::{ConfigError, Tuning};
    use glam::Vec2;

    const FRAME_DT: f32 = 1.0 / 60.0;
    /// Seconds between changes of direction
    const WANDER_PERIOD: f32 = 0.6;
    /// Seconds between bomb presses
    const BOMB_PERIOD: f32 = 2.0;

    const HEADINGS: [Vec2; 5] = [Vec2::X, Vec2::Y, Vec2::NEG_X, Vec2::NEG_Y, Vec2::ZERO];

    #[derive(Debug, Default)]
    struct Summary {
        rounds: u32,
        won: u32,
        lost: u32,
        best_score: u64,
        blasts: usize,
        spawned: usize,
    }

    pub fn run(tuning: Tuning, seconds: f32) -> Result<(), ConfigError> {
        let mut ctx = SimContext::new(tuning)?;
        let mut physics = KinematicWorld::with_bounds(ctx.grid.half_extents());
        let mut scene = RecordingScene::new();
        let mut audio = LogAudio::new();
        let mut driver = FrameDriver::new();
        let mut input = InputState::new();
        let mut summary = Summary::default();

        let frames = (seconds.max(0.0) / FRAME_DT).round() as u64;
        let wander_frames = (WANDER_PERIOD / FRAME_DT).round() as u64;
        let bomb_frames = (BOMB_PERIOD / FRAME_DT).round() as u64;

        for frame in 0..frames {
            match ctx.phase {
                GamePhase::Title => input.tap(Action::Start),
                phase if phase.is_terminal() => input.tap(Action::Restart),
                _ => {
                    if frame % wander_frames == 0 {
                        let index = (frame / wander_frames) as usize % HEADINGS.len();
                        input.set_axes(HEADINGS[index]);
                    }
                    if frame % bomb_frames == 0 {
                        input.tap(Action::Fire);
                    }
                }
            }

            let mut io = Collaborators {
                physics: &mut physics,
                scene: &mut scene,
                audio: &mut audio,
            };
            let report = driver.frame(&mut ctx, &mut io, &input, FRAME_DT);
            input.end_frame();

            summary.blasts += report.blasts.len();
            summary.spawned += report.spawned;
            summary.best_score = summary.best_score.max(ctx.score);
            for t in &report.transitions {
                match t.to {
                    GamePhase::Playing => summary.rounds += 1,
                    GamePhase::Won => summary.won += 1,
                    GamePhase::Lost => summary.lost += 1,
                    GamePhase::Title => {}
                }
            }
        }

        log::info!(
            "{} frames: {} round(s), {} won, {} lost, best score {}, {} blast(s), {} spawn(s)",
            driver.frames(),
            summary.rounds,
            summary.won,
            summary.lost,
            summary.best_score,
            summary.blasts,
            summary.spawned
        );
        log::info!(
            "Final phase {:?}, {} live entities, {} scene nodes, {} audio cue(s)",
            ctx.phase,
            ctx.registry.len(),
            scene.len(),
            audio.cues()
        );
        Ok(())
    }
}
