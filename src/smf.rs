//! Standard MIDI File output
//!
//! Minimal byte-level SMF writer: format-0 file with one track holding a
//! tempo meta-event, a program change, and the transcribed note events
//! with variable-length delta times.

use crate::error::{PitchError, Result};
use crate::notes::{EventKind, NoteList, OFF_VELOCITY};
use log::info;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Tempo meta value: 500,000 us per quarter note = 120 BPM in 4/4.
pub const DEFAULT_TEMPO: u32 = 500_000;

fn push_u16_be(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn push_u32_be(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Appends an SMF variable-length quantity: 7 bits per byte, most
/// significant group first, high bit set on all but the last byte.
/// Any `u32` fits in at most five bytes.
pub fn write_var_len(out: &mut Vec<u8>, value: u32) {
    let mut rep = [0u8; 5];
    let mut bytes = 1;
    let mut value = value;
    rep[4] = (value & 0x7f) as u8;
    value >>= 7;
    while value > 0 {
        rep[4 - bytes] = ((value & 0x7f) as u8) | 0x80;
        bytes += 1;
        value >>= 7;
    }
    out.extend_from_slice(&rep[5 - bytes..]);
}

/// Decodes a variable-length quantity, returning the value and the number
/// of bytes consumed, or `None` when the input ends mid-quantity.
pub fn read_var_len(bytes: &[u8]) -> Option<(u32, usize)> {
    let mut value = 0u32;
    for (i, &b) in bytes.iter().enumerate() {
        value = (value << 7) | (b & 0x7f) as u32;
        if b & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

/// MThd chunk: format, track count, division.
pub fn header_chunk(out: &mut Vec<u8>, format: u16, tracks: u16, division: u16) {
    out.extend_from_slice(b"MThd");
    push_u32_be(out, 6);
    push_u16_be(out, format);
    push_u16_be(out, tracks);
    push_u16_be(out, division);
}

/// MTrk chunk header for a track body of `size` bytes.
pub fn track_head(out: &mut Vec<u8>, size: u32) {
    out.extend_from_slice(b"MTrk");
    push_u32_be(out, size);
}

/// Tempo meta-event at delta time 0.
pub fn tempo_event(out: &mut Vec<u8>, tempo: u32) {
    out.extend_from_slice(&[
        0x00,
        0xff,
        0x51,
        0x03,
        (tempo >> 16) as u8,
        (tempo >> 8) as u8,
        tempo as u8,
    ]);
}

/// Program change at delta time 0.
pub fn prog_change(out: &mut Vec<u8>, channel: u8, prog: u8) {
    out.extend_from_slice(&[0x00, 0xc0 + channel, prog]);
}

pub fn note_on(out: &mut Vec<u8>, dtime: u32, note: u8, vel: u8, channel: u8) {
    write_var_len(out, dtime);
    out.extend_from_slice(&[0x90 + channel, note, vel]);
}

pub fn note_off(out: &mut Vec<u8>, dtime: u32, note: u8, vel: u8, channel: u8) {
    write_var_len(out, dtime);
    out.extend_from_slice(&[0x80 + channel, note, vel]);
}

/// End-of-track meta-event.
pub fn track_end(out: &mut Vec<u8>) {
    out.extend_from_slice(&[0x00, 0xff, 0x2f, 0x00]);
}

/// Serializes the regulated note list as a format-0 SMF with the given
/// division (ticks per quarter note).
pub fn render(notes: &NoteList, division: u16) -> Vec<u8> {
    let mut track = Vec::new();
    tempo_event(&mut track, DEFAULT_TEMPO);
    prog_change(&mut track, 0, 0);
    let mut last_step = 0i32;
    for (i, ev) in notes.events().iter().enumerate() {
        let dtime = if i == 0 {
            0
        } else {
            (ev.step - last_step).max(0) as u32
        };
        last_step = ev.step;
        match ev.kind {
            EventKind::On => note_on(&mut track, dtime, ev.note, ev.vel, 0),
            EventKind::Off => note_off(&mut track, dtime, ev.note, OFF_VELOCITY, 0),
        }
    }
    track_end(&mut track);

    let mut out = Vec::with_capacity(track.len() + 22);
    header_chunk(&mut out, 0, 1, division);
    track_head(&mut out, track.len() as u32);
    out.extend_from_slice(&track);
    out
}

/// Writes the note list to a MIDI file, or to stdout when `path` is "-".
///
/// A short write is reported with the byte counts; no retry is attempted.
pub fn output_midi(notes: &NoteList, division: u16, path: &Path) -> Result<()> {
    let bytes = render(notes, division);
    info!(
        "writing {} events ({} bytes) to {}",
        notes.len(),
        bytes.len(),
        path.display()
    );
    if path.as_os_str() == "-" {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        let n = lock.write(&bytes)?;
        if n != bytes.len() {
            return Err(PitchError::MidiShortWrite(n, bytes.len()));
        }
        lock.flush()?;
    } else {
        let mut file = File::create(path)
            .map_err(|e| PitchError::MidiExportError(format!("{}: {}", path.display(), e)))?;
        let n = file.write(&bytes)?;
        if n != bytes.len() {
            return Err(PitchError::MidiShortWrite(n, bytes.len()));
        }
        file.flush()?;
    }
    Ok(())
}
