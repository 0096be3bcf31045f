//! Both nodes wired together over an in-memory link.
//!
//! The Control node's `run` loop is polled alongside each HMI operation in
//! the same task; it is dropped once the HMI side finishes and restarted
//! for the next operation.

use gatekeep_control::{ControlConfig, ControlPeripherals, ProtocolMachine};
use gatekeep_core::constants::ALARM_TICKS;
use gatekeep_hardware::{
    MemoryStore, MotorDirection, TimerConfig, VirtualDisplay,
    mock::{
        MockActuator, MockActuatorHandle, MockAlarm, MockAlarmHandle, MockKeypad,
        MockKeypadHandle, MockSensor, MockSensorHandle,
    },
    timer::{TickSourceGuard, spawn_tick_counter},
};
use gatekeep_hmi::{HmiConfig, MenuChoice, SessionController, SessionOutcome, SessionPhase};
use gatekeep_link::{Link, duplex_pair};
use std::{future::Future, time::Duration};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

type Session = SessionController<DuplexStream, MockKeypad, VirtualDisplay>;
type Control = ProtocolMachine<DuplexStream, MemoryStore, MockActuator, MockSensor, MockAlarm>;

const PASS: [u8; 5] = [1, 2, 3, 4, 5];
const WRONG: [u8; 5] = [0, 0, 0, 0, 0];

struct Appliance {
    session: Session,
    control: Control,
    keys: MockKeypadHandle,
    display: VirtualDisplay,
    store: MemoryStore,
    actuator: MockActuatorHandle,
    sensor: MockSensorHandle,
    alarm: MockAlarmHandle,
    _tick_source: TickSourceGuard,
}

/// One tick longer alarm than the Control node's, so the buzzer is off by the
/// time the keypad unlocks.
fn hmi_config() -> HmiConfig {
    HmiConfig::default().with_alarm_ticks(ALARM_TICKS + 1)
}

fn appliance() -> Appliance {
    appliance_with(hmi_config())
}

fn appliance_with(hmi_config: HmiConfig) -> Appliance {
    let (hmi_link, control_link) = duplex_pair(256);
    let (ticks, tick_source) = spawn_tick_counter(&TimerConfig::default()).unwrap();

    let (keypad, keys) = MockKeypad::new();
    let display = VirtualDisplay::new();
    let session = SessionController::new(
        hmi_link,
        keypad,
        display.clone(),
        ticks.clone(),
        hmi_config,
    )
    .unwrap();

    let store = MemoryStore::new();
    let (actuator, actuator_handle) = MockActuator::new();
    let (sensor, sensor_handle) = MockSensor::new(false);
    let (alarm, alarm_handle) = MockAlarm::new();
    let control = ProtocolMachine::new(
        control_link,
        ControlPeripherals {
            store: store.clone(),
            actuator,
            sensor,
            alarm,
        },
        ticks,
        ControlConfig::default(),
    )
    .unwrap();

    Appliance {
        session,
        control,
        keys,
        display,
        store,
        actuator: actuator_handle,
        sensor: sensor_handle,
        alarm: alarm_handle,
        _tick_source: tick_source,
    }
}

/// Poll `hmi` to completion while the Control node serves it.
async fn drive<F: Future>(control: &mut Control, hmi: F) -> F::Output {
    tokio::select! {
        output = hmi => output,
        result = control.run() => panic!("control node stopped: {result:?}"),
    }
}

async fn enrolled_appliance() -> Appliance {
    enroll(appliance()).await
}

async fn enroll(mut app: Appliance) -> Appliance {
    app.keys.enter_credential(&PASS).await.unwrap();
    app.keys.enter_credential(&PASS).await.unwrap();
    let outcome = drive(&mut app.control, app.session.enroll()).await.unwrap();
    assert_eq!(outcome, SessionOutcome::Enrolled);
    app
}

async fn open_door(app: &mut Appliance, digits: [u8; 5]) -> SessionOutcome {
    app.keys.enter_credential(&digits).await.unwrap();
    drive(&mut app.control, app.session.open_door()).await.unwrap()
}

async fn change_credential(
    app: &mut Appliance,
    old: [u8; 5],
    new: [u8; 5],
    confirmation: [u8; 5],
) -> SessionOutcome {
    app.keys.enter_credential(&old).await.unwrap();
    app.keys.enter_credential(&new).await.unwrap();
    app.keys.enter_credential(&confirmation).await.unwrap();
    drive(&mut app.control, app.session.change_credential())
        .await
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_enroll_and_open_door() {
    let mut app = enrolled_appliance().await;
    assert_eq!(app.session.phase(), SessionPhase::Operating);
    assert_eq!(app.store.snapshot(0, 5), PASS.to_vec());

    app.sensor.occupy_for(Duration::from_secs(25));
    assert_eq!(open_door(&mut app, PASS).await, SessionOutcome::DoorOpened);

    for text in ["Door Unlocking", "Wait for People", "Door Locking"] {
        assert!(app.display.has_shown(text), "{text} never shown");
    }
    assert_eq!(
        app.actuator.directions(),
        vec![
            MotorDirection::Forward,
            MotorDirection::Stop,
            MotorDirection::Reverse,
            MotorDirection::Stop
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_enrollment_repeats_after_mismatch() {
    let mut app = appliance();
    app.keys.enter_credential(&PASS).await.unwrap();
    app.keys.enter_credential(&[9, 9, 9, 9, 9]).await.unwrap();
    app.keys.enter_credential(&PASS).await.unwrap();
    app.keys.enter_credential(&PASS).await.unwrap();

    let outcome = drive(&mut app.control, app.session.enroll()).await.unwrap();

    assert_eq!(outcome, SessionOutcome::Enrolled);
    assert!(app.display.has_shown("Mismatch!!"));
    assert_eq!(app.store.snapshot(0, 5), PASS.to_vec());
}

#[tokio::test(start_paused = true)]
async fn test_three_failures_raise_alarm_once() {
    let mut app = enrolled_appliance().await;

    assert_eq!(
        open_door(&mut app, WRONG).await,
        SessionOutcome::Denied { failures: 1 }
    );
    assert_eq!(
        open_door(&mut app, WRONG).await,
        SessionOutcome::Denied { failures: 2 }
    );
    assert_eq!(open_door(&mut app, WRONG).await, SessionOutcome::LockedOut);
    assert!(app.display.has_shown("System LOCKED"));
    assert_eq!(app.session.open_failures(), 0);
    assert_eq!(app.alarm.activations(), 1);
    assert!(!app.alarm.is_active());

    assert_eq!(
        open_door(&mut app, WRONG).await,
        SessionOutcome::Denied { failures: 1 }
    );
    assert!(app.actuator.commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_keys_pressed_during_lockout_are_dropped() {
    let mut app = enrolled_appliance().await;
    open_door(&mut app, WRONG).await;
    open_door(&mut app, WRONG).await;

    app.keys.enter_credential(&WRONG).await.unwrap();
    let keys = app.keys.clone();
    let typed_while_locked = async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        keys.type_str("+12345=").await.unwrap();
    };
    let (outcome, ()) = tokio::join!(
        drive(&mut app.control, app.session.open_door()),
        typed_while_locked
    );
    assert_eq!(outcome.unwrap(), SessionOutcome::LockedOut);

    assert_eq!(
        open_door(&mut app, WRONG).await,
        SessionOutcome::Denied { failures: 1 }
    );
    assert!(app.actuator.commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_success_resets_failure_count() {
    let mut app = enrolled_appliance().await;

    open_door(&mut app, WRONG).await;
    open_door(&mut app, WRONG).await;
    assert_eq!(open_door(&mut app, PASS).await, SessionOutcome::DoorOpened);
    assert_eq!(app.session.open_failures(), 0);
    assert_eq!(
        open_door(&mut app, WRONG).await,
        SessionOutcome::Denied { failures: 1 }
    );
    assert_eq!(app.alarm.activations(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_change_credential() {
    let mut app = enrolled_appliance().await;
    let new = [5, 4, 3, 2, 1];

    assert_eq!(
        change_credential(&mut app, PASS, new, new).await,
        SessionOutcome::CredentialChanged
    );
    assert_eq!(app.store.snapshot(0, 5), new.to_vec());

    assert_eq!(
        open_door(&mut app, PASS).await,
        SessionOutcome::Denied { failures: 1 }
    );
    assert_eq!(open_door(&mut app, new).await, SessionOutcome::DoorOpened);
}

#[tokio::test(start_paused = true)]
async fn test_wrong_probe_never_changes_credential() {
    let mut app = enrolled_appliance().await;

    for expected in [
        SessionOutcome::Denied { failures: 1 },
        SessionOutcome::Denied { failures: 2 },
    ] {
        app.keys.enter_credential(&WRONG).await.unwrap();
        let outcome = drive(&mut app.control, app.session.change_credential())
            .await
            .unwrap();
        assert_eq!(outcome, expected);
    }
    assert_eq!(app.session.change_failures(), 2);
    assert_eq!(app.session.open_failures(), 0);

    app.keys.enter_credential(&WRONG).await.unwrap();
    let outcome = drive(&mut app.control, app.session.change_credential())
        .await
        .unwrap();
    assert_eq!(outcome, SessionOutcome::LockedOut);
    assert!(!app.alarm.is_active());

    assert_eq!(app.store.snapshot(0, 5), PASS.to_vec());
    assert_eq!(open_door(&mut app, PASS).await, SessionOutcome::DoorOpened);
}

#[tokio::test(start_paused = true)]
async fn test_change_confirmation_mismatch() {
    let mut app = enrolled_appliance().await;

    assert_eq!(
        change_credential(&mut app, PASS, [7, 7, 7, 7, 7], [7, 7, 7, 7, 1]).await,
        SessionOutcome::ConfirmationMismatch
    );
    assert!(app.display.has_shown("Mismatch!!"));
    assert_eq!(app.session.change_failures(), 0);
    assert_eq!(app.store.snapshot(0, 5), PASS.to_vec());
}

#[tokio::test(start_paused = true)]
async fn test_overrun_door_cycle_is_consumed_before_next_request() {
    let mut app = enroll(appliance_with(
        hmi_config().with_door_cycle_timeout_ticks(Some(12)),
    ))
    .await;

    // Unlocking takes 5 ticks, then the doorway stays busy for another 10.
    app.sensor.occupy_for(Duration::from_secs(45));
    app.keys.enter_credential(&PASS).await.unwrap();
    let outcome = drive(&mut app.control, app.session.serve(MenuChoice::OpenDoor))
        .await
        .unwrap();
    assert_eq!(outcome, SessionOutcome::LinkTimeout);
    assert!(app.display.has_shown("Link Timeout"));

    for _ in 0..2 {
        assert_eq!(open_door(&mut app, PASS).await, SessionOutcome::DoorOpened);
    }
    assert_eq!(app.actuator.directions().len(), 12);
}

#[tokio::test(start_paused = true)]
async fn test_enrollment_survives_unrecognized_reply() {
    let (hmi_io, mut control_io) = tokio::io::duplex(256);
    let (ticks, _tick_source) = spawn_tick_counter(&TimerConfig::default()).unwrap();
    let (keypad, keys) = MockKeypad::new();
    let mut session = SessionController::new(
        Link::new(hmi_io),
        keypad,
        VirtualDisplay::new(),
        ticks,
        hmi_config(),
    )
    .unwrap();
    for _ in 0..4 {
        keys.enter_credential(&PASS).await.unwrap();
    }

    let control = async {
        let mut request = [0u8; 11];
        control_io.read_exact(&mut request).await.unwrap();
        control_io.write_u8(0x42).await.unwrap();
        control_io.read_exact(&mut request).await.unwrap();
        control_io.write_u8(0xC0).await.unwrap();
        request
    };
    let (outcome, request) = tokio::join!(session.enroll(), control);

    assert_eq!(outcome.unwrap(), SessionOutcome::Enrolled);
    assert_eq!(request[0], 0xA0);
    assert_eq!(&request[1..6], &PASS);
    assert_eq!(session.phase(), SessionPhase::Operating);
}

#[tokio::test(start_paused = true)]
async fn test_silent_control_node_shows_link_timeout() {
    let mut app = appliance();
    app.keys.enter_credential(&PASS).await.unwrap();

    // Control node never runs.
    let outcome = app.session.serve(MenuChoice::OpenDoor).await.unwrap();

    assert_eq!(outcome, SessionOutcome::LinkTimeout);
    assert!(app.display.has_shown("Link Timeout"));
}

#[tokio::test(start_paused = true)]
async fn test_run_until_keypad_disconnects() {
    let Appliance {
        mut session,
        mut control,
        keys,
        display,
        actuator,
        _tick_source,
        ..
    } = appliance();

    keys.type_str("12345=12345=").await.unwrap();
    keys.type_str("7+12345=").await.unwrap();
    drop(keys);

    let err = drive(&mut control, session.run()).await.unwrap_err();

    assert!(err.is_fatal());
    assert!(display.has_shown("+ : OPEN DOOR"));
    assert!(display.has_shown("Door Locking"));
    assert_eq!(actuator.directions().len(), 4);
}
