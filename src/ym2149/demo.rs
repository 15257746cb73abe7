//! Audible self-test sequences
//!
//! Short programs that exercise each channel, the volume range and the noise
//! generator so a listener can confirm the card is wired correctly. Timing is
//! supplied by the caller.

use std::time::Duration;

use crate::backend::SynthesisBackend;
use crate::bus::PortIo;

use super::driver::{Ym2149Driver, DEFAULT_NOISE_PERIOD, VOICE_COUNT};
use super::tables::note_to_period;

/// C major scale, C4 to C5
pub const SCALE_NOTES: [u8; 8] = [60, 62, 64, 65, 67, 69, 71, 72];

/// C major triad, one note per channel
pub const CHORD_NOTES: [u8; VOICE_COUNT] = [60, 64, 67];

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// One tone per channel, a volume sweep down and up, then a noise burst.
pub fn play_test_sequence<P, D>(drv: &mut Ym2149Driver<P>, mut delay: D)
where
    P: PortIo,
    D: FnMut(Duration),
{
    tracing::info!("channel tone check");
    for (voice, &note) in CHORD_NOTES.iter().enumerate() {
        drv.set_period(voice, note_to_period(note));
        drv.set_volume(voice, 10);
        delay(ms(500));
    }
    delay(ms(500));

    tracing::info!("volume sweep");
    for volume in (1..=15).rev().chain(0..=15) {
        for voice in 0..VOICE_COUNT {
            drv.set_volume(voice, volume);
        }
        delay(ms(100));
    }

    tracing::info!("noise generator");
    drv.enable_noise_mixer(DEFAULT_NOISE_PERIOD);
    delay(ms(1000));

    drv.enable_tone_mixer();
    drv.all_off();
}

/// C major scale on channel A.
pub fn play_scale<P, D>(drv: &mut Ym2149Driver<P>, mut delay: D)
where
    P: PortIo,
    D: FnMut(Duration),
{
    for &note in &SCALE_NOTES {
        tracing::info!(note, "scale");
        drv.set_period(0, note_to_period(note));
        drv.set_volume(0, 12);
        delay(ms(400));

        drv.set_volume(0, 0);
        delay(ms(50));
    }
}

/// C major arpeggio building up across the three channels, then a fade out.
pub fn play_arpeggio<P, D>(drv: &mut Ym2149Driver<P>, mut delay: D)
where
    P: PortIo,
    D: FnMut(Duration),
{
    for (voice, &note) in CHORD_NOTES.iter().enumerate() {
        drv.set_period(voice, note_to_period(note));
        drv.set_volume(voice, 8);
        delay(ms(100));
    }
    delay(ms(1000));

    for volume in (1..=8).rev() {
        for voice in 0..VOICE_COUNT {
            drv.set_volume(voice, volume);
        }
        delay(ms(150));
    }

    drv.all_off();
}
