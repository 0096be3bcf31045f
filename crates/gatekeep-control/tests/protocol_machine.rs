//! Integration tests for the Control node protocol machine.
//!
//! The HMI side is a raw byte stream, so tests can send malformed and
//! partial transmissions as well as well-formed requests.

use gatekeep_control::{
    ControlConfig, ControlPeripherals, ControlState, DoorPhase, ProtocolMachine, StepOutcome,
};
use gatekeep_core::{CandidateBuffer, Credential};
use gatekeep_hardware::{
    MemoryStore, MotorDirection, TimerConfig,
    mock::{
        MockActuator, MockActuatorHandle, MockAlarm, MockAlarmHandle, MockSensor,
        MockSensorHandle,
    },
    timer::{TickSourceGuard, spawn_tick_counter},
};
use gatekeep_link::ControlLink;
use gatekeep_protocol::{Command, Request, Response};
use rstest::rstest;
use std::time::Duration;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, DuplexStream},
    time::Instant,
};

const STORED: [u8; 5] = [1, 2, 3, 4, 5];

type Machine = ProtocolMachine<DuplexStream, MemoryStore, MockActuator, MockSensor, MockAlarm>;

struct Rig {
    machine: Machine,
    hmi: DuplexStream,
    store: MemoryStore,
    actuator: MockActuatorHandle,
    #[allow(dead_code)]
    sensor: MockSensorHandle,
    alarm: MockAlarmHandle,
    _tick_source: TickSourceGuard,
}

fn rig_with(store: MemoryStore, config: ControlConfig) -> Rig {
    let (hmi, control) = tokio::io::duplex(256);
    let (ticks, tick_source) = spawn_tick_counter(&TimerConfig::default()).unwrap();
    let (actuator, actuator_handle) = MockActuator::new();
    let (sensor, sensor_handle) = MockSensor::new(false);
    let (alarm, alarm_handle) = MockAlarm::new();

    let peripherals = ControlPeripherals {
        store: store.clone(),
        actuator,
        sensor,
        alarm,
    };
    let machine = ProtocolMachine::new(ControlLink::new(control), peripherals, ticks, config)
        .unwrap();

    Rig {
        machine,
        hmi,
        store,
        actuator: actuator_handle,
        sensor: sensor_handle,
        alarm: alarm_handle,
        _tick_source: tick_source,
    }
}

fn enrolled_rig() -> Rig {
    rig_with(MemoryStore::with_contents(0, &STORED), ControlConfig::default())
}

fn load(entry: [u8; 5], confirmation: [u8; 5]) -> Request {
    Request::Load(CandidateBuffer::from_entry_and_confirmation(
        Credential::new(entry),
        Credential::new(confirmation),
    ))
}

fn replacement(entry: [u8; 5], confirmation: [u8; 5]) -> Request {
    Request::UpdateReplacement(CandidateBuffer::from_entry_and_confirmation(
        Credential::new(entry),
        Credential::new(confirmation),
    ))
}

async fn send(io: &mut DuplexStream, request: Request) {
    let mut bytes = Vec::with_capacity(request.encoded_len());
    request.encode(&mut bytes);
    io.write_all(&bytes).await.unwrap();
}

async fn recv(io: &mut DuplexStream) -> Response {
    Response::try_from(io.read_u8().await.unwrap()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_enroll_then_verify() {
    let mut rig = rig_with(MemoryStore::new(), ControlConfig::default());

    send(&mut rig.hmi, load(STORED, STORED)).await;
    assert_eq!(rig.machine.step().await.unwrap(), StepOutcome::Loaded);
    assert_eq!(recv(&mut rig.hmi).await, Response::Correct);
    assert_eq!(rig.store.snapshot(0, 5), STORED.to_vec());

    send(&mut rig.hmi, Request::Verify(Credential::new(STORED))).await;
    let outcome = rig.machine.step().await.unwrap();
    assert!(matches!(outcome, StepOutcome::Granted(_)));
    assert_eq!(recv(&mut rig.hmi).await, Response::Correct);
}

#[rstest]
#[case::last_digit([1, 2, 3, 4, 6])]
#[case::first_digit([0, 2, 3, 4, 5])]
#[case::all_digits([9, 9, 9, 9, 9])]
#[case::swapped([2, 1, 3, 4, 5])]
#[tokio::test(start_paused = true)]
async fn test_load_mismatch_leaves_store_untouched(#[case] confirmation: [u8; 5]) {
    let mut rig = rig_with(MemoryStore::new(), ControlConfig::default());

    send(&mut rig.hmi, load(STORED, confirmation)).await;
    assert_eq!(rig.machine.step().await.unwrap(), StepOutcome::LoadMismatch);
    assert_eq!(recv(&mut rig.hmi).await, Response::Fail);
    assert_eq!(rig.store.snapshot(0, 5), vec![0xFF; 5]);
    assert!(rig.store.write_log().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_granted_verify_notifies_in_order() {
    let mut rig = enrolled_rig();

    send(&mut rig.hmi, Request::Verify(Credential::new(STORED))).await;
    let outcome = rig.machine.step().await.unwrap();

    let StepOutcome::Granted(report) = outcome else {
        panic!("expected a granted VERIFY, got {outcome:?}");
    };
    assert_eq!(
        report.phases(),
        vec![
            DoorPhase::Unlocking,
            DoorPhase::WaitEntry,
            DoorPhase::Closing,
            DoorPhase::Closed,
            DoorPhase::Idle
        ]
    );
    for expected in [
        Response::Correct,
        Response::PeopleIn,
        Response::PeopleNo,
        Response::DoorClosed,
    ] {
        assert_eq!(recv(&mut rig.hmi).await, expected);
    }
    assert_eq!(
        rig.actuator.directions(),
        vec![
            MotorDirection::Forward,
            MotorDirection::Stop,
            MotorDirection::Reverse,
            MotorDirection::Stop
        ]
    );
    assert_eq!(rig.machine.state(), ControlState::AwaitingCommand);
}

#[tokio::test(start_paused = true)]
async fn test_denied_verify_does_not_actuate() {
    let mut rig = enrolled_rig();

    send(&mut rig.hmi, Request::Verify(Credential::new([1, 2, 3, 4, 6]))).await;
    assert_eq!(rig.machine.step().await.unwrap(), StepOutcome::Denied);
    assert_eq!(recv(&mut rig.hmi).await, Response::Fail);
    assert!(rig.actuator.commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_repeated_verify_keeps_succeeding() {
    let mut rig = enrolled_rig();

    for _ in 0..3 {
        send(&mut rig.hmi, Request::Verify(Credential::new(STORED))).await;
        assert!(matches!(
            rig.machine.step().await.unwrap(),
            StepOutcome::Granted(_)
        ));
        for _ in 0..4 {
            recv(&mut rig.hmi).await;
        }
    }
    assert_eq!(rig.actuator.commands().len(), 12);
}

#[tokio::test(start_paused = true)]
async fn test_update_with_wrong_probe_keeps_credential() {
    let mut rig = enrolled_rig();

    send(&mut rig.hmi, Request::UpdateProbe(Credential::new([5, 4, 3, 2, 1]))).await;
    assert_eq!(rig.machine.step().await.unwrap(), StepOutcome::UpdateDenied);
    assert_eq!(recv(&mut rig.hmi).await, Response::Fail);

    send(&mut rig.hmi, Request::Verify(Credential::new(STORED))).await;
    assert!(matches!(
        rig.machine.step().await.unwrap(),
        StepOutcome::Granted(_)
    ));
    assert_eq!(recv(&mut rig.hmi).await, Response::Correct);
}

#[tokio::test(start_paused = true)]
async fn test_update_replaces_credential() {
    let mut rig = enrolled_rig();
    let new = [7, 7, 0, 1, 2];

    send(&mut rig.hmi, Request::UpdateProbe(Credential::new(STORED))).await;
    send(&mut rig.hmi, replacement(new, new)).await;
    assert_eq!(rig.machine.step().await.unwrap(), StepOutcome::Updated);
    assert_eq!(recv(&mut rig.hmi).await, Response::Correct);
    assert_eq!(recv(&mut rig.hmi).await, Response::Correct);
    assert_eq!(rig.store.snapshot(0, 5), new.to_vec());

    send(&mut rig.hmi, Request::Verify(Credential::new(STORED))).await;
    assert_eq!(rig.machine.step().await.unwrap(), StepOutcome::Denied);
    assert_eq!(recv(&mut rig.hmi).await, Response::Fail);
}

#[rstest]
#[case::last_digit([7, 7, 7, 7, 7], [7, 7, 7, 7, 8])]
#[case::first_digit([7, 7, 7, 7, 7], [0, 7, 7, 7, 7])]
#[case::old_as_confirmation([7, 7, 7, 7, 7], STORED)]
#[case::new_equals_old(STORED, [5, 4, 3, 2, 1])]
#[tokio::test(start_paused = true)]
async fn test_update_replacement_mismatch(#[case] entry: [u8; 5], #[case] confirmation: [u8; 5]) {
    let mut rig = enrolled_rig();

    send(&mut rig.hmi, Request::UpdateProbe(Credential::new(STORED))).await;
    send(&mut rig.hmi, replacement(entry, confirmation)).await;
    assert_eq!(rig.machine.step().await.unwrap(), StepOutcome::UpdateMismatch);
    assert_eq!(recv(&mut rig.hmi).await, Response::Correct);
    assert_eq!(recv(&mut rig.hmi).await, Response::Fail);
    assert_eq!(rig.store.snapshot(0, 5), STORED.to_vec());
    assert!(rig.store.write_log().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_update_abandoned_without_replacement() {
    let config = ControlConfig::default().with_update_entry_timeout_ms(Some(1_000));
    let mut rig = rig_with(MemoryStore::with_contents(0, &STORED), config);

    send(&mut rig.hmi, Request::UpdateProbe(Credential::new(STORED))).await;
    assert_eq!(
        rig.machine.step().await.unwrap(),
        StepOutcome::Abandoned(Command::Update)
    );
    assert_eq!(recv(&mut rig.hmi).await, Response::Correct);
    assert_eq!(rig.store.snapshot(0, 5), STORED.to_vec());
}

#[tokio::test(start_paused = true)]
async fn test_write_fault_replies_fail_and_rolls_back() {
    let mut rig = enrolled_rig();
    rig.store.fail_writes_at(0x002);

    send(&mut rig.hmi, load([8, 8, 8, 8, 8], [8, 8, 8, 8, 8])).await;
    assert_eq!(
        rig.machine.step().await.unwrap(),
        StepOutcome::StorageFault { address: 0x002 }
    );
    assert_eq!(recv(&mut rig.hmi).await, Response::Fail);
    assert_eq!(rig.store.snapshot(0, 5), STORED.to_vec());

    rig.store.clear_faults();
    send(&mut rig.hmi, Request::Verify(Credential::new(STORED))).await;
    assert!(matches!(
        rig.machine.step().await.unwrap(),
        StepOutcome::Granted(_)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_read_fault_never_grants() {
    let mut rig = enrolled_rig();
    rig.store.fail_reads(true);

    send(&mut rig.hmi, Request::Verify(Credential::new(STORED))).await;
    assert!(matches!(
        rig.machine.step().await.unwrap(),
        StepOutcome::StorageFault { .. }
    ));
    assert_eq!(recv(&mut rig.hmi).await, Response::Fail);
    assert!(rig.actuator.commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unrecognized_byte_is_discarded() {
    let mut rig = enrolled_rig();

    rig.hmi.write_all(&[0x42]).await.unwrap();
    send(&mut rig.hmi, Request::Verify(Credential::new([0, 0, 0, 0, 0]))).await;

    assert_eq!(rig.machine.step().await.unwrap(), StepOutcome::Ignored(0x42));
    assert_eq!(rig.machine.state(), ControlState::AwaitingCommand);
    assert_eq!(rig.machine.step().await.unwrap(), StepOutcome::Denied);
    assert_eq!(recv(&mut rig.hmi).await, Response::Fail);
}

#[tokio::test(start_paused = true)]
async fn test_partial_payload_is_abandoned() {
    let mut rig = enrolled_rig();

    rig.hmi.write_all(&[0xA0, 1, 2, 3]).await.unwrap();
    assert_eq!(
        rig.machine.step().await.unwrap(),
        StepOutcome::Abandoned(Command::Load)
    );
    assert!(rig.store.write_log().is_empty());

    send(&mut rig.hmi, Request::Verify(Credential::new(STORED))).await;
    assert!(matches!(
        rig.machine.step().await.unwrap(),
        StepOutcome::Granted(_)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_alarm_sounds_for_alarm_ticks() {
    let mut rig = enrolled_rig();

    send(&mut rig.hmi, Request::AlarmOn).await;
    let started = Instant::now();
    assert_eq!(rig.machine.step().await.unwrap(), StepOutcome::Alarm);

    let toggles = rig.alarm.toggles();
    assert_eq!(toggles.len(), 2);
    assert!(toggles[0].active);
    assert!(!toggles[1].active);
    let sounded = toggles[1].at - toggles[0].at;
    assert!(sounded > Duration::from_secs(57));
    assert!(sounded <= Duration::from_secs(60));
    assert!(started.elapsed() <= Duration::from_secs(60));
    assert!(!rig.alarm.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_run_returns_when_hmi_disconnects() {
    let mut rig = enrolled_rig();

    rig.hmi.write_all(&[0x42]).await.unwrap();
    drop(rig.hmi);

    rig.machine.run().await.unwrap();
    assert!(rig.store.write_log().is_empty());
}

#[test]
fn test_invalid_config_is_rejected() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let _guard = runtime.enter();

    let (_hmi, control) = tokio::io::duplex(8);
    let (ticks, _tick_source) = spawn_tick_counter(&TimerConfig::default()).unwrap();
    let (actuator, _) = MockActuator::new();
    let (sensor, _) = MockSensor::new(false);
    let (alarm, _) = MockAlarm::new();
    let peripherals = ControlPeripherals {
        store: MemoryStore::new(),
        actuator,
        sensor,
        alarm,
    };

    let config = ControlConfig::default().with_store_base_address(1023);
    assert!(ProtocolMachine::new(ControlLink::new(control), peripherals, ticks, config).is_err());
}
