//! Audio collaborator
//!
//! The simulation only fires cues; playback lives behind `AudioSink`.
//! Calls are fire-and-forget and never block a frame.

/// Sound cues raised by the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundEffect {
    /// Player placed a bomb
    BombPlaced,
    /// A bomb went off (one cue per chain)
    Explosion,
    /// A crate was destroyed by a blast
    CrateBreak,
    /// Enemy turret fired
    Shot,
    /// Actor took damage but survived
    Hurt,
    /// Enemy died
    EnemyDown,
    /// Player died
    PlayerDown,
    /// Pickup collected
    PickupCollect,
    /// Round won
    Victory,
    /// Round lost
    GameOver,
    /// Ambient loop while a round is in progress
    AmbientLoop,
}

/// Audio collaborator interface
pub trait AudioSink {
    fn play(&mut self, effect: SoundEffect);
    fn play_loop(&mut self, effect: SoundEffect);
    fn stop_loop(&mut self);
}

/// Sink that only logs cues
#[derive(Debug, Clone, Default)]
pub struct LogAudio {
    cues: u64,
    current_loop: Option<SoundEffect>,
}

impl LogAudio {
    pub fn new() -> Self {
        Self::default()
    }

    /// One-shot cues played so far
    pub fn cues(&self) -> u64 {
        self.cues
    }

    pub fn current_loop(&self) -> Option<SoundEffect> {
        self.current_loop
    }
}

impl AudioSink for LogAudio {
    fn play(&mut self, effect: SoundEffect) {
        self.cues += 1;
        log::trace!("audio: play {effect:?}");
    }

    fn play_loop(&mut self, effect: SoundEffect) {
        self.current_loop = Some(effect);
        log::debug!("audio: loop {effect:?}");
    }

    fn stop_loop(&mut self) {
        if let Some(effect) = self.current_loop.take() {
            log::debug!("audio: stop loop {effect:?}");
        }
    }
}

/// Sink that remembers every call, for headless harnesses and tests
#[derive(Debug, Clone, Default)]
pub struct RecordingAudio {
    pub played: Vec<SoundEffect>,
    pub current_loop: Option<SoundEffect>,
    pub loops_started: u32,
    pub loops_stopped: u32,
}

impl RecordingAudio {
    pub fn count(&self, effect: SoundEffect) -> usize {
        self.played.iter().filter(|e| **e == effect).count()
    }
}

impl AudioSink for RecordingAudio {
    fn play(&mut self, effect: SoundEffect) {
        self.played.push(effect);
    }

    fn play_loop(&mut self, effect: SoundEffect) {
        self.current_loop = Some(effect);
        self.loops_started += 1;
    }

    fn stop_loop(&mut self) {
        if self.current_loop.take().is_some() {
            self.loops_stopped += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_audio_loop_tracking() {
        let mut audio = LogAudio::new();
        audio.play(SoundEffect::Explosion);
        audio.play(SoundEffect::CrateBreak);
        audio.play_loop(SoundEffect::AmbientLoop);
        assert_eq!(audio.current_loop(), Some(SoundEffect::AmbientLoop));
        audio.stop_loop();
        assert_eq!(audio.current_loop(), None);
        assert_eq!(audio.cues(), 2);
    }

    #[test]
    fn test_recording_audio_counts_loops() {
        let mut audio = RecordingAudio::default();
        audio.play_loop(SoundEffect::AmbientLoop);
        audio.stop_loop();
        audio.stop_loop();
        audio.play(SoundEffect::Victory);
        assert_eq!((audio.loops_started, audio.loops_stopped), (1, 1));
        assert_eq!(audio.count(SoundEffect::Victory), 1);
    }
}
