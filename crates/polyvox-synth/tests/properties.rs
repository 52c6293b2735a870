//! Property-based tests for polyvox-synth.
//!
//! Tests envelope monotonicity, the polyphony cap, and note-on idempotence
//! using proptest for randomized timing and event streams.

use proptest::prelude::*;
use polyvox_synth::{AddOutcome, AdsrParams, Envelope, NoteRegistry, RenderContext};

fn envelope_params() -> impl Strategy<Value = AdsrParams> {
    (
        0.5f32..=1.0,
        0.001f32..2.0,
        0.001f32..2.0,
        0.0f32..=0.5,
        0.001f32..3.0,
    )
        .prop_map(|(attack_level, attack, decay, sustain, release)| AdsrParams {
            attack_level,
            attack,
            decay,
            sustain,
            release,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// During the attack ramp the level never decreases.
    #[test]
    fn attack_is_monotonic(params in envelope_params(), on in 0.0f64..100.0) {
        let mut env = Envelope::new(params);
        env.note_on(on);

        let mut previous = 0.0f32;
        for step in 0..=64 {
            let t = on + f64::from(params.attack) * f64::from(step) / 64.0;
            let level = env.level(t);
            prop_assert!(
                level + 1e-6 >= previous,
                "level fell from {} to {} at {}",
                previous,
                level,
                t
            );
            previous = level;
        }
    }

    /// After note-off the level never increases and reaches zero by the end
    /// of the release time.
    #[test]
    fn release_is_monotonic(
        params in envelope_params(),
        hold in 0.0f64..5.0,
    ) {
        let mut env = Envelope::new(params);
        env.note_on(0.0);
        env.note_off(hold);

        let release = f64::from(params.release);
        let mut previous = f32::INFINITY;
        for step in 0..=64 {
            let t = hold + release * f64::from(step) / 64.0;
            let level = env.level(t);
            prop_assert!(level <= previous + 1e-6);
            prop_assert!((0.0..=1.0).contains(&level));
            previous = level;
        }
        prop_assert_eq!(env.level(hold + release + 1e-3), 0.0);
        prop_assert!(!env.is_active());
        prop_assert!(env.is_released());
    }

    /// Whatever the event stream, the registry never holds more notes than
    /// its cap and every voiced note owns a distinct slot.
    #[test]
    fn registry_respects_cap(
        max_voices in 1usize..8,
        events in prop::collection::vec((0i32..24, any::<bool>(), 0.0f64..0.05), 1..200),
    ) {
        let registry = NoteRegistry::new(
            max_voices,
            AdsrParams::AMPLITUDE,
            AdsrParams::FILTER,
            RenderContext::default(),
        );

        let mut now = 0.0;
        for (key, press, dt) in events {
            now += dt;
            if press {
                registry.add_note(key, 1.0, now);
            } else {
                registry.remove_note(key, now);
            }
            registry.prune_released(now);

            prop_assert!(registry.len() <= max_voices);
            let mut voices: Vec<usize> = registry
                .keys()
                .into_iter()
                .filter_map(|k| registry.voice_of(k))
                .collect();
            let voiced = voices.len();
            voices.sort_unstable();
            voices.dedup();
            prop_assert_eq!(voices.len(), voiced, "voice slot shared between notes");
            prop_assert_eq!(registry.free_voices(), max_voices - voiced);
        }
    }

    /// Pressing a held key again changes nothing.
    #[test]
    fn repeated_note_on_is_idempotent(
        key in -20i32..100,
        repeats in 1usize..10,
        times in prop::collection::vec(0.0f64..10.0, 10),
    ) {
        let registry = NoteRegistry::new(
            4,
            AdsrParams::AMPLITUDE,
            AdsrParams::FILTER,
            RenderContext::default(),
        );
        prop_assert_eq!(registry.add_note(key, 1.0, 0.0), AddOutcome::Added { voice: Some(0) });
        for &t in times.iter().take(repeats) {
            prop_assert_eq!(registry.add_note(key, 0.5, t), AddOutcome::AlreadyHeld);
        }
        prop_assert_eq!(registry.keys(), vec![key]);
        prop_assert_eq!(registry.free_voices(), 3);
    }
}
