use serde::{Deserialize, Serialize};

/// Scale used to resolve scale positions into notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    Major,
    Minor,
    Dorian,
    Pentatonic,
    Blues,
    Chromatic,
}

impl Scale {
    /// Semitone offsets of one octave of the scale.
    pub fn intervals(self) -> &'static [i32] {
        match self {
            Self::Major => &[0, 2, 4, 5, 7, 9, 11],
            Self::Minor => &[0, 2, 3, 5, 7, 8, 10],
            Self::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            Self::Pentatonic => &[0, 2, 4, 7, 9],
            Self::Blues => &[0, 3, 5, 6, 7, 10],
            Self::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
        }
    }
}

/// What a key-setter node changes when a pulse reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyTarget {
    /// New root as a MIDI note number.
    Root(u8),
    /// New global transpose in semitones.
    Transpose(i32),
}

/// Global key state shared by every pitched node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    pub scale: Scale,
    pub root_note: u8,
    pub transpose: i32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            scale: Scale::Major,
            root_note: 60,
            transpose: 0,
        }
    }
}

impl Tuning {
    /// MIDI note for a scale position. Positions wrap into neighbouring octaves.
    pub fn note_for(&self, scale_index: i32) -> u8 {
        let intervals = self.scale.intervals();
        let len = intervals.len() as i64;
        let scale_index = i64::from(scale_index);
        let octave = scale_index.div_euclid(len);
        let degree = scale_index.rem_euclid(len) as usize;
        let note = i64::from(self.root_note)
            + i64::from(self.transpose)
            + octave * 12
            + i64::from(intervals[degree]);
        note.clamp(0, 127) as u8
    }

    /// Applies a key change. Returns `false` when already at the target.
    pub fn apply(&mut self, target: KeyTarget) -> bool {
        match target {
            KeyTarget::Root(root) if root != self.root_note => {
                self.root_note = root.min(127);
                true
            }
            KeyTarget::Transpose(transpose) if transpose != self.transpose => {
                self.transpose = transpose;
                true
            }
            _ => false,
        }
    }
}
