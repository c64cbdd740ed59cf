/// Sound engine: procedural 8-bit style sound effects via rodio.
///
/// All clips are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile without the "sound" feature to disable audio entirely
/// (the stub SoundEngine accepts every clip and plays nothing).

use crate::error::ControlResult;
use crate::sim::bridge::SoundClip;

#[cfg(feature = "sound")]
mod inner {
    use std::collections::HashMap;
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use crate::error::{ControlError, ControlResult};
    use crate::sim::bridge::SoundClip;

    const SAMPLE_RATE: u32 = 22050;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        clips: HashMap<SoundClip, Arc<Vec<u8>>>,
    }

    impl SoundEngine {
        /// `None` when no audio output device is available.
        pub fn new() -> Option<Self> {
            let (stream, handle) = OutputStream::try_default().ok()?;

            let clips = [
                (SoundClip::Collect, gen_collect()),
                (SoundClip::Poison, gen_poison()),
                (SoundClip::Collapse, gen_collapse()),
                (SoundClip::Death, gen_death()),
                (SoundClip::DoorOpen, gen_door()),
            ]
            .into_iter()
            .map(|(clip, samples)| (clip, Arc::new(make_wav(&samples))))
            .collect();

            Some(SoundEngine { _stream: stream, handle, clips })
        }

        pub fn play(&self, clip: SoundClip) -> ControlResult<()> {
            let buf = self
                .clips
                .get(&clip)
                .ok_or_else(|| ControlError::missing_asset(format!("{:?} sound", clip)))?;
            let sink = Sink::try_new(&self.handle)
                .map_err(|e| ControlError::missing_asset(format!("{:?} sound ({e})", clip)))?;
            let src = rodio::Decoder::new(Cursor::new(buf.as_ref().clone()))
                .map_err(|e| ControlError::missing_asset(format!("{:?} sound ({e})", clip)))?;
            sink.append(src);
            sink.detach();
            Ok(())
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators — all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn samples_for(duration: f32) -> usize {
        (SAMPLE_RATE as f32 * duration) as usize
    }

    /// A run of notes, each with a fade-out envelope. `harmonic` mixes in
    /// the third harmonic for a squarer tone.
    fn notes(freqs: &[f32], note_dur: f32, harmonic: f32, volume: f32) -> Vec<f32> {
        let mut out = Vec::new();
        for &freq in freqs {
            let n = samples_for(note_dur);
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                let wave = (t * freq * TAU).sin() * (1.0 - harmonic)
                    + (t * freq * 3.0 * TAU).sin() * harmonic;
                out.push(wave * env * volume);
            }
        }
        out
    }

    /// Pickup: quick ascending arpeggio C6→E6→G6.
    fn gen_collect() -> Vec<f32> {
        notes(&[1047.0, 1319.0, 1568.0], 0.045, 0.3, 0.25)
    }

    /// Poison: a sour tritone slide downwards.
    fn gen_poison() -> Vec<f32> {
        notes(&[622.0, 440.0, 311.0], 0.08, 0.5, 0.28)
    }

    /// Tile collapse: short noise burst over a falling tone.
    fn gen_collapse() -> Vec<f32> {
        let n = samples_for(0.18);
        let mut lcg: u32 = 0x2545_F491;
        (0..n)
            .map(|i| {
                let p = i as f32 / n as f32;
                let t = i as f32 / SAMPLE_RATE as f32;
                let tone = (t * (260.0 - p * 160.0) * TAU).sin();
                lcg = lcg.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                let noise = (lcg as f32 / u32::MAX as f32) * 2.0 - 1.0;
                (tone * 0.35 + noise * 0.65) * (1.0 - p).powf(1.2) * 0.3
            })
            .collect()
    }

    /// Death: slow descending minor run with a tail fade.
    fn gen_death() -> Vec<f32> {
        let mut out = notes(&[440.0, 370.0, 311.0, 261.0], 0.12, 0.0, 0.3);
        let fade = out.len() / 4;
        let total = out.len();
        for (k, s) in out[total - fade..].iter_mut().enumerate() {
            *s *= 1.0 - k as f32 / fade as f32;
        }
        out
    }

    /// Door open: rising fanfare C5→E5→G5→C6.
    fn gen_door() -> Vec<f32> {
        let mut out = notes(&[523.0, 659.0, 784.0], 0.09, 0.2, 0.3);
        out.extend(notes(&[1047.0], 0.3, 0.2, 0.3));
        out
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder — 16-bit mono PCM
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let data_size = samples.len() as u32 * 2;
        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_size).to_le_bytes());
        buf.extend_from_slice(b"WAVEfmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&1u16.to_le_bytes()); // mono
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes()); // byte rate
        buf.extend_from_slice(&2u16.to_le_bytes()); // block align
        buf.extend_from_slice(&16u16.to_le_bytes());
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }
        buf
    }
}

// ════════════════════════════════════════════════════════════
//  Public API — compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> {
        Some(SoundEngine)
    }

    pub fn play(&self, _clip: SoundClip) -> ControlResult<()> {
        Ok(())
    }
}

/// Play through an optional engine; no engine means every clip is missing.
pub fn play_on(engine: Option<&SoundEngine>, clip: SoundClip) -> ControlResult<()> {
    match engine {
        Some(engine) => engine.play(clip),
        None => Err(crate::error::ControlError::missing_asset(format!("{:?} sound (no audio output)", clip))),
    }
}
