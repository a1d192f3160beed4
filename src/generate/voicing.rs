//! Chord-tone resolution for bass and comping rules.
//!
//! Bass tones sit in the octave starting at [`BASS_OCTAVE_BASE`] (C2) and
//! comping voicings are stacked upward from the root in the octave starting
//! at [`COMP_OCTAVE_BASE`] (C4).

use crate::chord::Chord;
use crate::patterns::{ToneSelector, Voicing};

/// MIDI note of the lowest bass root (C2).
pub const BASS_OCTAVE_BASE: i32 = 36;

/// MIDI note of the lowest comping root (C4).
pub const COMP_OCTAVE_BASE: i32 = 60;

fn clamp_note(note: i32) -> u8 {
    note.clamp(0, 127) as u8
}

/// Pitch a chord's bass line lands on: its slash bass if it has one,
/// otherwise its root.
pub fn bass_root(chord: &Chord) -> i32 {
    let pc = chord.bass.as_ref().unwrap_or(&chord.root).pitch_class();
    BASS_OCTAVE_BASE + pc as i32
}

/// Resolve a bass rule against the current chord.
///
/// `next` is the chord that follows. Walking steps and the approach tone
/// head toward the pitch its root is actually played at, so the approach
/// always sits a half step from the next bass note. A slash chord plays its
/// bass note as the root.
pub fn bass_note(chord: &Chord, next: &Chord, tone: ToneSelector) -> u8 {
    let root = BASS_OCTAVE_BASE + chord.root.pitch_class() as i32;
    let origin = bass_root(chord);
    let target = bass_root(next);
    let ascending = target >= origin;
    let approach = if ascending { target - 1 } else { target + 1 };

    let note = match tone {
        ToneSelector::Root => origin,
        ToneSelector::Third => root + chord.third() as i32,
        ToneSelector::Fifth => root + chord.fifth() as i32,
        ToneSelector::Fourth => root + 5,
        ToneSelector::Sixth => root + 9,
        ToneSelector::Approach => approach,
        ToneSelector::WalkStep(0) => origin,
        ToneSelector::WalkStep(step) => {
            let ladder = walk_ladder(chord, origin, approach, ascending);
            match ladder.get(step as usize - 1) {
                Some(note) => *note,
                None => {
                    // Past the chord tones the line moves in half steps,
                    // holding once it reaches the approach tone
                    let last = ladder.last().copied().unwrap_or(origin);
                    let room = ((approach - last).abs() - 1).max(0);
                    let extra = (step as usize - ladder.len()) as i32;
                    let direction = if ascending { 1 } else { -1 };
                    last + direction * extra.min(room)
                }
            }
        }
    };
    clamp_note(note)
}

/// Chord tones (and the ninth as a passing tone) strictly between `origin`
/// and `approach`, ordered in the direction of travel. Steps past the end of
/// the ladder are filled chromatically by [`bass_note`].
fn walk_ladder(chord: &Chord, origin: i32, approach: i32, ascending: bool) -> Vec<i32> {
    let root = BASS_OCTAVE_BASE + chord.root.pitch_class() as i32;
    let mut intervals: Vec<i32> = vec![2, chord.third() as i32, chord.fifth() as i32];
    if let Some(seventh) = chord.seventh() {
        intervals.push(seventh as i32);
    }

    let (low, high) = if ascending {
        (origin, approach)
    } else {
        (approach, origin)
    };
    let mut tones: Vec<i32> = intervals
        .iter()
        .flat_map(|i| [-12, 0, 12].map(|octave| root + i + octave))
        .filter(|p| *p > low && *p < high)
        .collect();
    tones.sort_unstable();
    tones.dedup();

    if !ascending {
        tones.reverse();
    }
    tones
}

/// Resolve a comping rule into the notes to sound together.
///
/// Tones are stacked from the root in stacking order (root, third, fifth,
/// seventh, extensions); a tone whose pitch class is already present is
/// left out.
pub fn comp_notes(chord: &Chord, voicing: Voicing) -> Vec<u8> {
    let root = COMP_OCTAVE_BASE + chord.root.pitch_class() as i32;
    let intervals: Vec<u8> = match voicing {
        Voicing::Full | Voicing::Tone(_) => chord.intervals(),
        Voicing::Triad => vec![0, chord.third(), chord.fifth()],
        Voicing::Shell => vec![0, chord.seventh().unwrap_or_else(|| chord.fifth())],
    };

    let mut notes: Vec<u8> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        let note = clamp_note(root + interval as i32);
        if !notes.iter().any(|n| n % 12 == note % 12) {
            notes.push(note);
        }
    }

    match voicing {
        Voicing::Tone(index) => vec![notes[index % notes.len()]],
        _ => notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord::parse_chord;

    fn chord(s: &str) -> Chord {
        parse_chord(s).unwrap()
    }

    #[test]
    fn test_bass_chord_tones() {
        let c7 = chord("C7");
        let f = chord("F");
        assert_eq!(bass_note(&c7, &f, ToneSelector::Root), 36);
        assert_eq!(bass_note(&c7, &f, ToneSelector::Third), 40);
        assert_eq!(bass_note(&c7, &f, ToneSelector::Fifth), 43);
        assert_eq!(bass_note(&c7, &f, ToneSelector::Fourth), 41);
        assert_eq!(bass_note(&c7, &f, ToneSelector::Sixth), 45);

        let dm = chord("Dm7b5");
        assert_eq!(bass_note(&dm, &f, ToneSelector::Third), 38 + 3);
        assert_eq!(bass_note(&dm, &f, ToneSelector::Fifth), 38 + 6);
    }

    #[test]
    fn test_slash_bass_plays_the_bass_note() {
        let c_over_g = chord("C/G");
        assert_eq!(bass_note(&c_over_g, &c_over_g, ToneSelector::Root), 43);
        assert_eq!(bass_note(&c_over_g, &c_over_g, ToneSelector::Fifth), 43);
    }

    #[test]
    fn test_walk_up_toward_next_root() {
        // C2 up to G2: ninth and third, then F#
        let c7 = chord("C7");
        let g = chord("G");
        assert_eq!(bass_note(&c7, &g, ToneSelector::WalkStep(1)), 38);
        assert_eq!(bass_note(&c7, &g, ToneSelector::WalkStep(2)), 40);
        assert_eq!(bass_note(&c7, &g, ToneSelector::Approach), 42);
        assert_eq!(bass_root(&g), 43);
    }

    #[test]
    fn test_walk_down_toward_next_root() {
        // G2 down to C2: seventh and fifth, then C#
        let g7 = chord("G7");
        let c = chord("C");
        assert_eq!(bass_note(&g7, &c, ToneSelector::WalkStep(1)), 41);
        assert_eq!(bass_note(&g7, &c, ToneSelector::WalkStep(2)), 38);
        assert_eq!(bass_note(&g7, &c, ToneSelector::WalkStep(3)), 38);
        assert_eq!(bass_note(&g7, &c, ToneSelector::Approach), 37);
    }

    #[test]
    fn test_approach_is_a_half_step_from_the_next_bass_note() {
        let names = ["C7", "F", "G7", "Bb^7", "E-7", "A7", "D-7", "C/E", "F#m7b5", "B7"];
        for from in names {
            for to in names {
                let (from, to) = (chord(from), chord(to));
                let approach = bass_note(&from, &to, ToneSelector::Approach) as i32;
                assert_eq!((approach - bass_root(&to)).abs(), 1, "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_walk_steps_stay_between_root_and_target() {
        let names = ["C7", "F", "G7", "Bb^7", "E-7", "A7", "D-7", "B7"];
        for from in names {
            for to in names {
                let (from, to) = (chord(from), chord(to));
                let origin = bass_root(&from);
                let target = bass_root(&to);
                if origin == target {
                    continue;
                }
                for step in 1..=2 {
                    let note = bass_note(&from, &to, ToneSelector::WalkStep(step)) as i32;
                    let (low, high) = (origin.min(target), origin.max(target));
                    assert!(note >= low && note <= high, "{} -> {} step {}", from, to, step);
                    assert_ne!(note, target, "{} -> {} step {}", from, to, step);
                }
            }
        }
    }

    #[test]
    fn test_short_walk_moves_chromatically() {
        // C2 up to F2 leaves room for the ninth, then D#
        let c7 = chord("C7");
        let f = chord("F");
        assert_eq!(bass_note(&c7, &f, ToneSelector::WalkStep(1)), 38);
        assert_eq!(bass_note(&c7, &f, ToneSelector::WalkStep(2)), 39);
        assert_eq!(bass_note(&c7, &f, ToneSelector::Approach), 40);

        // C2 up to D2: no room, so the walk holds the root
        let d = chord("D");
        assert_eq!(bass_note(&c7, &d, ToneSelector::WalkStep(1)), 36);
        assert_eq!(bass_note(&c7, &d, ToneSelector::WalkStep(2)), 36);
        assert_eq!(bass_note(&c7, &d, ToneSelector::Approach), 37);

        // Same root
        assert_eq!(bass_note(&c7, &c7, ToneSelector::WalkStep(1)), 36);
        assert_eq!(bass_note(&c7, &c7, ToneSelector::Approach), 35);
    }

    #[test]
    fn test_tritone_walks_up() {
        let c = chord("C");
        let fsharp = chord("F#");
        assert_eq!(bass_note(&c, &fsharp, ToneSelector::Approach), 41);
    }

    #[test]
    fn test_full_voicing() {
        assert_eq!(comp_notes(&chord("C"), Voicing::Full), vec![60, 64, 67]);
        assert_eq!(comp_notes(&chord("G7"), Voicing::Full), vec![67, 71, 74, 77]);
        assert_eq!(comp_notes(&chord("Dm9"), Voicing::Full), vec![62, 65, 69, 72, 76]);
    }

    #[test]
    fn test_voicing_omits_pitch_class_collisions() {
        // The b5 alteration replaces the fifth, so it is not stacked twice
        assert_eq!(comp_notes(&chord("C7b5"), Voicing::Full), vec![60, 64, 66, 70]);
        // 7sus4 carries an implied 7 on top of its seventh
        assert_eq!(comp_notes(&chord("C7sus4"), Voicing::Full), vec![60, 65, 67, 70]);
        // add2 doubles the suspended second
        assert_eq!(comp_notes(&chord("Csus2add2"), Voicing::Full), vec![60, 62, 67]);
    }

    #[test]
    fn test_shell_and_triad() {
        assert_eq!(comp_notes(&chord("F^7"), Voicing::Shell), vec![65, 76]);
        assert_eq!(comp_notes(&chord("F"), Voicing::Shell), vec![65, 72]);
        assert_eq!(comp_notes(&chord("A-7"), Voicing::Triad), vec![69, 72, 76]);
    }

    #[test]
    fn test_single_tone_wraps() {
        let c = chord("C");
        assert_eq!(comp_notes(&c, Voicing::Tone(0)), vec![60]);
        assert_eq!(comp_notes(&c, Voicing::Tone(2)), vec![67]);
        assert_eq!(comp_notes(&c, Voicing::Tone(3)), vec![60]);
    }
}
