//! Emission timing against a virtual clock

use std::sync::Arc;

use morse_core::test_utils::output_capture::CapturingActuator;
use morse_core::test_utils::virtual_time::{run_for, step, VirtualClock, VirtualScheduler};
use morse_core::{
    pattern, Cursor, Duration, EmissionError, Emitter, EmitterState, Instant, LiveTiming, Phrase,
    PulseSymbol, TickOutcome, TimingConfig, TimingSource,
};
use rstest::rstest;

type Rig<T> = Emitter<CapturingActuator, T, VirtualScheduler>;

fn rig<T: TimingSource>(timing: T) -> (Rig<T>, CapturingActuator) {
    let clock = VirtualClock::new();
    let capture = CapturingActuator::new(clock.clone());
    let emitter = Emitter::new(capture.clone(), timing, VirtualScheduler::new(clock));
    (emitter, capture)
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn at(millis: u64) -> Instant {
    Instant::from_millis(millis)
}

/// Start and forget the unconditional "off" issued by `start`
fn start<T: TimingSource>(emitter: &mut Rig<T>, capture: &CapturingActuator, text: &str) {
    emitter.start_raw(text).expect("non-empty phrase");
    capture.clear();
}

#[test]
fn test_letter_a_pulse_train() {
    let (mut emitter, capture) = rig(TimingConfig::default());
    start(&mut emitter, &capture, "A");

    // on 0..100, gap 100, on 200..500, letter gap 500..800, loop 800..1800
    assert_eq!(run_for(&mut emitter, ms(1799)), Ok(5));

    let pulses = capture.pulses();
    assert_eq!(pulses.len(), 2);
    assert_eq!((pulses[0].start, pulses[0].duration), (at(0), ms(100)));
    assert_eq!((pulses[1].start, pulses[1].duration), (at(200), ms(300)));
    assert_eq!(capture.gaps(), vec![ms(100)]);
    assert_eq!(emitter.state(), EmitterState::LoopGap);
    assert_eq!(emitter.ticks().next_due(), Some(at(1800)));

    // re-emission of the first letter after the loop delay
    assert!(matches!(
        step(&mut emitter),
        Some(Ok(TickOutcome::Rearmed {
            state: EmitterState::Emitting { symbol: PulseSymbol::Short, active: true },
            ..
        }))
    ));
    assert!(capture.is_on());
}

#[test]
fn test_single_space_is_one_unit_before_loop() {
    let (mut emitter, capture) = rig(TimingConfig::default());
    start(&mut emitter, &capture, " ");

    match step(&mut emitter) {
        Some(Ok(TickOutcome::Rearmed { delay, state, .. })) => {
            assert_eq!(delay, ms(100));
            assert_eq!(state, EmitterState::Emitting { symbol: PulseSymbol::Gap, active: false });
        }
        other => panic!("unexpected {:?}", other),
    }
    match step(&mut emitter) {
        Some(Ok(TickOutcome::Rearmed { delay, state, .. })) => {
            assert_eq!(delay, ms(1000));
            assert_eq!(state, EmitterState::LoopGap);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(emitter.ticks().clock().now(), at(100));

    run_for(&mut emitter, ms(10_000)).unwrap();
    assert_eq!(capture.activations(), 0);
}

#[test]
fn test_word_gap_between_letters() {
    let (mut emitter, capture) = rig(TimingConfig::default());
    start(&mut emitter, &capture, "E E");

    // letter gap (3u) plus the space symbol (1u)
    run_for(&mut emitter, ms(600)).unwrap();
    assert_eq!(capture.gaps(), vec![ms(400)]);
}

#[test]
fn test_sos_decodes() {
    let unit = TimingConfig::new(2, 1);
    let (mut emitter, capture) = rig(unit);
    start(&mut emitter, &capture, "sos");

    // 30 units of code at 200 ms
    run_for(&mut emitter, ms(6000)).unwrap();
    assert_eq!(capture.to_morse_string(ms(200)), "... --- ...");

    let analysis = capture.analyze_timing(ms(200));
    assert_eq!(analysis.dot_durations.len(), 6);
    assert_eq!(analysis.dash_durations.len(), 3);
    assert!(analysis.marks_exact());
    assert!(analysis.gaps_aligned());
}

#[test]
fn test_stop_silences_pending_chain() {
    let (mut emitter, capture) = rig(TimingConfig::default());
    start(&mut emitter, &capture, "SOS");

    // stop in the middle of the second dot
    run_for(&mut emitter, ms(250)).unwrap();
    assert!(capture.is_on());
    emitter.stop();

    let activations = capture.activations();
    assert_eq!(emitter.ticks().pending(), 0);
    assert_eq!(run_for(&mut emitter, ms(20_000)), Ok(0));
    assert_eq!(capture.activations(), activations);
    assert!(!capture.is_on());
    assert_eq!(emitter.cursor(), Cursor::default());
    assert!(emitter.phrase().is_empty());
}

#[test]
fn test_restart_never_doubles_chain() {
    let (mut emitter, capture) = rig(TimingConfig::default());
    emitter.start_raw("SOS");
    emitter.start_raw("SOS");
    assert_eq!(emitter.ticks().pending(), 1);

    run_for(&mut emitter, ms(250)).unwrap();
    // user presses emit again while a mark is lit
    start(&mut emitter, &capture, "SOS");
    assert_eq!(emitter.ticks().pending(), 1);
    assert!(emitter.ticks().cancelled_total() >= 2);

    // one full cycle: 30 units of code, next mark after the loop delay
    run_for(&mut emitter, ms(3999)).unwrap();
    assert_eq!(emitter.ticks().pending(), 1);
    assert_eq!(capture.activations(), 9);
    assert_eq!(capture.deactivations(), 9);
}

#[test]
fn test_speed_change_applies_to_next_tick_only() {
    let timing = Arc::new(LiveTiming::new(TimingConfig::new(1, 1)));
    let (mut emitter, capture) = rig(timing.clone());
    start(&mut emitter, &capture, "T");

    // dash armed for 300 ms at speed 1
    step(&mut emitter).unwrap().unwrap();
    timing.set_speed("2");
    assert_eq!(emitter.ticks().next_due(), Some(at(300)));

    // dash ends as armed, the letter gap uses the new unit
    step(&mut emitter).unwrap().unwrap();
    assert_eq!(emitter.ticks().next_due(), Some(at(300 + 600)));

    step(&mut emitter).unwrap().unwrap();
    assert_eq!(emitter.ticks().next_due(), Some(at(900 + 1000)));

    run_for(&mut emitter, ms(1000 + 600)).unwrap();
    let pulses = capture.pulses();
    assert_eq!(pulses[0].duration, ms(300));
    assert_eq!(pulses[1].start, at(1900));
    assert_eq!(pulses[1].duration, ms(600));
}

#[test]
fn test_loop_resets_cursor_and_waits_loop_delay() {
    let (mut emitter, capture) = rig(TimingConfig::new(1, 3));
    start(&mut emitter, &capture, "E");

    step(&mut emitter).unwrap().unwrap();
    step(&mut emitter).unwrap().unwrap();
    assert_eq!(emitter.cursor().letter, 1);

    match step(&mut emitter) {
        Some(Ok(TickOutcome::Rearmed { delay, state, .. })) => {
            assert_eq!(state, EmitterState::LoopGap);
            assert_eq!(delay, ms(3000));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(emitter.cursor(), Cursor::default());

    run_for(&mut emitter, ms(3100)).unwrap();
    let starts: Vec<Instant> = capture.pulses().iter().map(|p| p.start).collect();
    assert_eq!(starts, vec![at(0), at(3400)]);
}

#[test]
fn test_unknown_character_halts_emission() {
    let (mut emitter, capture) = rig(TimingConfig::default());
    emitter.start(Phrase::unchecked("E*"));

    let result = run_for(&mut emitter, ms(1000));
    assert_eq!(
        result,
        Err(EmissionError::UnknownCharacter { index: 1, character: '*' })
    );
    assert!(!emitter.is_emitting());
    assert_eq!(emitter.ticks().pending(), 0);
    assert!(!capture.is_on());
}

#[test]
fn test_empty_phrase_schedules_nothing() {
    let (mut emitter, capture) = rig(TimingConfig::default());
    assert_eq!(emitter.start_raw("#$%"), None);
    assert_eq!(emitter.ticks().pending(), 0);
    assert_eq!(emitter.ticks().armed_total(), 0);
    assert_eq!(capture.activations(), 0);
}

#[rstest]
#[case('A')]
#[case('B')]
#[case('J')]
#[case('Q')]
#[case('Y')]
#[case('0')]
#[case('5')]
#[case('9')]
fn test_single_character_pattern(#[case] ch: char) {
    let (mut emitter, capture) = rig(TimingConfig::new(1, 10));
    start(&mut emitter, &capture, &ch.to_string());

    run_for(&mut emitter, ms(3000)).unwrap();
    let expected = pattern(ch).unwrap();
    assert_eq!(capture.to_morse_string(ms(100)), expected.as_str());
    assert!(capture.analyze_timing(ms(100)).marks_exact());
    assert!(capture.gaps().iter().all(|gap| *gap == ms(100)));
}

#[rstest]
#[case(1, 100)]
#[case(5, 500)]
#[case(10, 1000)]
fn test_dot_length_follows_speed(#[case] speed: u32, #[case] unit_ms: u64) {
    let (mut emitter, capture) = rig(TimingConfig::new(speed, 1));
    start(&mut emitter, &capture, "I");

    run_for(&mut emitter, ms(unit_ms * 3)).unwrap();
    let pulses = capture.pulses();
    assert_eq!(pulses.len(), 2);
    assert!(pulses.iter().all(|p| p.duration == ms(unit_ms)));
    assert_eq!(capture.gaps(), vec![ms(unit_ms)]);
}
