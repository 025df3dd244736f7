//! Note-event list and its regulation state machine
//!
//! Per-frame velocity transitions become ordered on/off events; after the
//! frame loop a series of repair passes removes orphaned events, heals
//! missing offs, and filters out short, quiet, and octave-duplicate notes.

use crate::pitch::MIDI_NOTE_COUNT;
use log::warn;

/// Velocity written for synthesized and regulated Off events.
pub const OFF_VELOCITY: u8 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Off,
    On,
}

/// One note event: frame step, kind, MIDI note, velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub step: i32,
    pub kind: EventKind,
    pub note: u8,
    pub vel: u8,
}

/// Transient per-note on-state used by the regulation passes: the step at
/// which the note last turned on and the event-list index of that On.
#[derive(Debug, Clone, Copy)]
struct OnState {
    step: i32,
    index: usize,
}

/// Ordered list of note on/off events plus running statistics.
#[derive(Debug, Clone)]
pub struct NoteList {
    events: Vec<NoteEvent>,
    minimum: i32,
    maximum: i32,
    bins: [u32; MIDI_NOTE_COUNT],
}

impl Default for NoteList {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteList {
    pub fn new() -> Self {
        NoteList {
            events: Vec::new(),
            minimum: 999,
            maximum: -1,
            bins: [0; MIDI_NOTE_COUNT],
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    /// Lowest note seen among On events (999 if none yet).
    pub fn minimum(&self) -> i32 {
        self.minimum
    }

    /// Highest note seen among On events (-1 if none yet).
    pub fn maximum(&self) -> i32 {
        self.maximum
    }

    /// Per-note On-event histogram.
    pub fn bins(&self) -> &[u32; MIDI_NOTE_COUNT] {
        &self.bins
    }

    fn count_on(&mut self, note: u8) {
        self.bins[note as usize] += 1;
        if (note as i32) > self.maximum {
            self.maximum = note as i32;
        }
        if (note as i32) < self.minimum {
            self.minimum = note as i32;
        }
    }

    pub fn append(&mut self, step: i32, kind: EventKind, note: u8, vel: u8) {
        self.events.push(NoteEvent {
            step,
            kind,
            note,
            vel,
        });
        if kind == EventKind::On {
            self.count_on(note);
        }
    }

    pub fn insert(&mut self, index: usize, step: i32, kind: EventKind, note: u8, vel: u8) {
        self.events.insert(
            index,
            NoteEvent {
                step,
                kind,
                note,
                vel,
            },
        );
        if kind == EventKind::On {
            self.count_on(note);
        }
    }

    /// Removes the event at `index`, un-counting it from the histogram when
    /// it is an On event. Min/max statistics are left as-is.
    pub fn remove_at(&mut self, index: usize) -> NoteEvent {
        let ev = self.events.remove(index);
        if ev.kind == EventKind::On {
            self.bins[ev.note as usize] -= 1;
        }
        ev
    }

    /// Shifts recorded on-indices down past a removed position so that the
    /// remaining table entries still address the right events.
    fn relink_after_remove(on_state: &mut [Option<OnState>; MIDI_NOTE_COUNT], removed: usize) {
        for slot in on_state.iter_mut().flatten() {
            if slot.index > removed {
                slot.index -= 1;
            }
        }
    }

    /// Per-frame on/off decision from the frame's velocity estimates.
    ///
    /// `on_event` persists across frames and holds, per note, the event
    /// index of the current On (or `None` when the note is off). A note
    /// turns on above `on_threshold`, off at or below `off_threshold`;
    /// a rise of at least `peak_threshold` over the recorded on-velocity
    /// re-triggers the note, while a smaller rise just overwrites the
    /// stored on-velocity.
    pub fn check(
        &mut self,
        step: i32,
        vel: &[u8; MIDI_NOTE_COUNT],
        on_event: &mut [Option<usize>; MIDI_NOTE_COUNT],
        on_threshold: i32,
        off_threshold: i32,
        peak_threshold: i32,
    ) {
        for i in 0..MIDI_NOTE_COUNT {
            let v = vel[i] as i32;
            match on_event[i] {
                None => {
                    if v > on_threshold {
                        self.append(step, EventKind::On, i as u8, vel[i]);
                        on_event[i] = Some(self.events.len() - 1);
                    }
                }
                Some(idx) => {
                    if v <= off_threshold {
                        self.append(step, EventKind::Off, i as u8, OFF_VELOCITY);
                        on_event[i] = None;
                    } else if v >= self.events[idx].vel as i32 + peak_threshold {
                        // Re-trigger at the new, louder velocity.
                        self.append(step, EventKind::Off, i as u8, OFF_VELOCITY);
                        self.append(step, EventKind::On, i as u8, vel[i]);
                        on_event[i] = Some(self.events.len() - 1);
                    } else if vel[i] > self.events[idx].vel {
                        // Retroactive max: keep the loudest velocity seen.
                        self.events[idx].vel = vel[i];
                    }
                }
            }
        }
    }

    /// Repairs the event list: orphaned Off events are dropped, an On for a
    /// note already on gets an Off inserted before it, and notes still on
    /// at the end get an Off at `last_step + 1`.
    pub fn regulate(&mut self) {
        let mut on_state: [Option<OnState>; MIDI_NOTE_COUNT] = [None; MIDI_NOTE_COUNT];
        let mut index = 0usize;
        while index < self.events.len() {
            let ev = self.events[index];
            let note = ev.note as usize;
            match ev.kind {
                EventKind::Off => {
                    if on_state[note].is_none() {
                        // Orphaned Off, no matching On before it.
                        self.remove_at(index);
                        continue;
                    }
                    on_state[note] = None;
                }
                EventKind::On => {
                    if on_state[note].is_some() {
                        self.insert(index, ev.step, EventKind::Off, ev.note, OFF_VELOCITY);
                        index += 1;
                    }
                    on_state[note] = Some(OnState {
                        step: self.events[index].step,
                        index,
                    });
                }
            }
            index += 1;
        }
        if let Some(last) = self.events.last() {
            let last_step = last.step;
            for i in 0..MIDI_NOTE_COUNT {
                if on_state[i].is_some() {
                    self.append(last_step + 1, EventKind::Off, i as u8, OFF_VELOCITY);
                }
            }
        } else {
            warn!("regulate: no note found (top/bottom range too small?)");
        }
    }

    /// Common scan for the pair-removal passes: walks the list maintaining
    /// the per-note on-state, dropping orphan Offs and healing double Ons
    /// like [`NoteList::regulate`], and removes each On/Off pair for which
    /// `remove_pair(duration, on_velocity)` holds.
    fn remove_pairs_where<F>(&mut self, mut remove_pair: F)
    where
        F: FnMut(i32, u8) -> bool,
    {
        let mut on_state: [Option<OnState>; MIDI_NOTE_COUNT] = [None; MIDI_NOTE_COUNT];
        let mut index = 0usize;
        while index < self.events.len() {
            let ev = self.events[index];
            let note = ev.note as usize;
            match ev.kind {
                EventKind::Off => {
                    let state = match on_state[note] {
                        Some(state) => state,
                        None => {
                            self.remove_at(index);
                            continue;
                        }
                    };
                    on_state[note] = None;
                    let on_vel = self.events[state.index].vel;
                    let duration = ev.step - state.step;
                    if remove_pair(duration, on_vel) {
                        self.remove_at(index);
                        self.remove_at(state.index);
                        Self::relink_after_remove(&mut on_state, state.index);
                        // Both events sat at or before `index`; the scan
                        // resumes at the element that followed the Off.
                        index -= 1;
                        continue;
                    }
                }
                EventKind::On => {
                    if on_state[note].is_some() {
                        self.insert(index, ev.step, EventKind::Off, ev.note, OFF_VELOCITY);
                        index += 1;
                    }
                    on_state[note] = Some(OnState {
                        step: self.events[index].step,
                        index,
                    });
                }
            }
            index += 1;
        }
    }

    /// Removes notes no longer than `min_duration` steps whose on-velocity
    /// is at most `min_vel`.
    pub fn remove_short_notes(&mut self, min_duration: i32, min_vel: u8) {
        self.remove_pairs_where(|duration, vel| duration <= min_duration && vel <= min_vel);
    }

    /// Removes notes at least `max_duration` steps long whose on-velocity
    /// is at most `min_vel`.
    pub fn remove_long_notes(&mut self, max_duration: i32, min_vel: u8) {
        self.remove_pairs_where(|duration, vel| duration >= max_duration && vel <= min_vel);
    }

    /// Removes notes whose on-velocity is at most `min_vel`, regardless of
    /// duration.
    pub fn remove_small_notes(&mut self, min_vel: u8) {
        self.remove_pairs_where(|_, vel| vel <= min_vel);
    }

    /// Removes octave doublings: a note turning on while the note an octave
    /// below is on with a strictly greater on-velocity is flagged, and its
    /// whole On/Off pair is dropped when the Off arrives.
    pub fn remove_octaves(&mut self) {
        let mut on_state: [Option<OnState>; MIDI_NOTE_COUNT] = [None; MIDI_NOTE_COUNT];
        let mut flag_remove = [false; MIDI_NOTE_COUNT];
        let mut index = 0usize;
        while index < self.events.len() {
            let ev = self.events[index];
            let note = ev.note as usize;
            match ev.kind {
                EventKind::Off => {
                    let state = match on_state[note] {
                        Some(state) => state,
                        None => {
                            self.remove_at(index);
                            continue;
                        }
                    };
                    on_state[note] = None;
                    if flag_remove[note] {
                        self.remove_at(index);
                        self.remove_at(state.index);
                        Self::relink_after_remove(&mut on_state, state.index);
                        index -= 1;
                        continue;
                    }
                }
                EventKind::On => {
                    if on_state[note].is_some() {
                        self.insert(index, ev.step, EventKind::Off, ev.note, OFF_VELOCITY);
                        index += 1;
                    }
                    on_state[note] = Some(OnState {
                        step: self.events[index].step,
                        index,
                    });
                    flag_remove[note] = false;
                    if note >= 12 {
                        let below = note - 12;
                        if let Some(below_state) = on_state[below] {
                            if self.events[index].vel < self.events[below_state.index].vel {
                                flag_remove[note] = true;
                            }
                        }
                    }
                }
            }
            index += 1;
        }
    }

    /// Prints the raw event list to stdout, one event per line.
    pub fn dump(&self) {
        let mut last_step = -1;
        for (i, ev) in self.events.iter().enumerate() {
            print!("[{:5}] ", i);
            if ev.step > last_step {
                print!("step {:5}: ", ev.step);
                last_step = ev.step;
            } else {
                print!("          : ");
            }
            let kind = if ev.kind == EventKind::Off { "off" } else { "on " };
            println!("{} {:3} {:3}", kind, ev.note, ev.vel);
        }
    }
}
