//! GPIO torch driven through embedded-hal mocks

use embedded_hal_mock::eh1::pin::{Mock as PinMock, State as PinState, Transaction as PinTransaction};
use morse_core::test_utils::virtual_time::{run_for, VirtualClock, VirtualScheduler};
use morse_core::{Actuator, Duration, Emitter, PinActuator, TimingConfig};

#[test]
fn test_pin_actuator_drives_levels() {
    let expectations = [
        PinTransaction::set(PinState::High),
        PinTransaction::set(PinState::Low),
    ];
    let mut torch = PinActuator::new(PinMock::new(&expectations), false);

    torch.activate().unwrap();
    torch.deactivate().unwrap();

    torch.into_inner().done();
}

#[test]
fn test_inverted_pin_actuator() {
    let expectations = [
        PinTransaction::set(PinState::Low),
        PinTransaction::set(PinState::High),
    ];
    let mut torch = PinActuator::new(PinMock::new(&expectations), true);

    torch.set(true).unwrap();
    torch.set(false).unwrap();

    torch.into_inner().done();
}

#[test]
fn test_emitter_keys_gpio_for_letter_e() {
    // start() switches off first, into_actuator() switches off last
    let expectations = [
        PinTransaction::set(PinState::Low),
        PinTransaction::set(PinState::High),
        PinTransaction::set(PinState::Low),
        PinTransaction::set(PinState::Low),
    ];
    let clock = VirtualClock::new();
    let torch = PinActuator::new(PinMock::new(&expectations), false);
    let mut emitter = Emitter::new(torch, TimingConfig::default(), VirtualScheduler::new(clock));

    emitter.start_raw("E").unwrap();
    // on at 0, off at 100, loop tick at 400
    assert_eq!(run_for(&mut emitter, Duration::from_millis(500)), Ok(3));
    assert_eq!(emitter.actuator_faults(), 0);

    emitter.into_actuator().into_inner().done();
}
