//! MIDI utility functions

/// Equal-tempered frequency of a MIDI note, A4 (69) = 440 Hz.
#[inline]
pub fn note_to_hz(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

#[inline]
pub fn velocity_to_gain(velocity: u8) -> f32 {
    velocity.min(127) as f32 / 127.0
}
