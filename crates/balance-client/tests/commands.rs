//! 指令排空与遥测集成测试

mod common;

use balance_client::{ControlOutput, VehicleState};
use balance_driver::mock::MockLink;
use balance_protocol::{OperatorCommand, ProtocolError, RequestFlags};
use common::Harness;

#[test]
fn test_link_commands_applied_after_report() {
    let mut h = Harness::in_state(VehicleState::Idle);
    let mut link = MockLink::new();
    link.push_command(OperatorCommand::SetRequestFlags(RequestFlags::from_bits(
        RequestFlags::MANUAL,
    )));

    // 本周期的报告仍为空闲，指令在下一周期生效
    let first = h.step(&mut link);
    assert_eq!(first.state, VehicleState::Idle);
    assert_eq!(h.pending(), RequestFlags::MANUAL);

    let second = h.step(&mut link);
    assert_eq!(second.state, VehicleState::Manual);

    let sent: Vec<u8> = link.handle().lock().sent.iter().map(|f| f.state).collect();
    assert_eq!(sent, vec![0, 2]);
}

#[test]
fn test_malformed_and_unknown_frames_are_ignored() {
    let mut h = Harness::in_state(VehicleState::Idle);
    let mut link = MockLink::new();
    link.push_malformed(ProtocolError::UnknownTag { tag: 0x7F });
    link.push_command(OperatorCommand::SetSteerReference(0.25));
    link.push_malformed(ProtocolError::ParseError("garbage".to_string()));
    link.push_command(OperatorCommand::SetSpeed(0.8));

    let applied = h.supervisor.drain_commands(&mut link);

    assert_eq!(applied, 2);
    assert!(link.handle().lock().inbound.is_empty());
    assert_eq!(h.supervisor.references().steer_angle, 0.25);
    assert_eq!(h.supervisor.references().speed, 0.8);
    assert_eq!(h.drive.lock().speed_commands, vec![0.8]);
    assert_eq!(h.pending(), 0);
}

#[test]
fn test_non_finite_commands_are_ignored() {
    let mut h = Harness::in_state(VehicleState::Idle);
    let mut link = MockLink::new();
    link.push_command(OperatorCommand::SetSpeed(0.5));
    link.push_command(OperatorCommand::SetSteerReference(0.1));
    link.push_command(OperatorCommand::SetSpeed(f64::INFINITY));
    link.push_command(OperatorCommand::SetSteerReference(f64::NAN));

    h.supervisor.drain_commands(&mut link);

    assert_eq!(h.drive.lock().speed_commands, vec![0.5]);
    assert_eq!(h.supervisor.references().speed, 0.5);
    assert_eq!(h.supervisor.references().steer_angle, 0.1);
}

#[test]
fn test_request_flags_accumulate_across_frames() {
    let mut h = Harness::in_state(VehicleState::Idle);
    let mut link = MockLink::new();
    link.push_command(OperatorCommand::SetRequestFlags(RequestFlags::from_bits(
        RequestFlags::STOP,
    )));
    link.push_command(OperatorCommand::SetRequestFlags(RequestFlags::from_bits(0)));

    h.supervisor.drain_commands(&mut link);

    assert_eq!(h.pending(), RequestFlags::STOP);
}

#[test]
fn test_latched_stop_is_consumed_only_by_resume() {
    let mut h = Harness::in_state(VehicleState::Idle);
    h.request(RequestFlags::STOP);

    // 空闲态不消费急停请求
    assert_eq!(h.tick().state, VehicleState::Idle);
    assert_eq!(h.pending(), RequestFlags::STOP);

    // 进入辅助后锁存的请求立即生效
    h.set_speed(1.5);
    assert_eq!(h.tick().state, VehicleState::Assisted);
    assert_eq!(h.tick().state, VehicleState::EmergencyStop);
    assert_eq!(h.tick().state, VehicleState::EmergencyStop);

    h.request(RequestFlags::RESUME);
    assert_eq!(h.tick().state, VehicleState::Idle);
    assert_eq!(h.pending(), 0);
}

#[test]
fn test_steer_reference_feeds_position_hold() {
    let mut h = Harness::in_state(VehicleState::Assisted);
    h.set_speed(1.5);
    h.balance.lock().position = 0.1;
    h.supervisor
        .apply_command(OperatorCommand::SetSteerReference(0.3));

    let outcome = h.tick();

    let ControlOutput::Position(setpoint) = outcome.output else {
        panic!("Expected position output, got {:?}", outcome.output);
    };
    approx::assert_relative_eq!(setpoint, -0.2, epsilon = 1e-12);
}

#[test]
fn test_telemetry_emitted_every_tick_in_every_state() {
    for state in VehicleState::ALL {
        let mut h = Harness::in_state(state);
        h.set_lean(0.3);
        h.set_speed(2.2);
        let mut link = MockLink::new();

        let outcome = h.step(&mut link);

        let sent = link.handle().lock().sent.clone();
        assert_eq!(sent.len(), 1, "state {}", state);
        assert_eq!(sent[0], outcome.telemetry);
        assert_eq!(sent[0].lean_angle, 0.3);
        assert_eq!(sent[0].speed, 2.2);
        assert_eq!(sent[0].state, outcome.state.code());
    }
}

#[test]
fn test_telemetry_timestamp_follows_clock() {
    let mut h = Harness::in_state(VehicleState::Idle);
    let first = h.tick();
    let second = h.tick();
    approx::assert_relative_eq!(
        second.telemetry.timestamp - first.telemetry.timestamp,
        0.01,
        epsilon = 1e-9
    );
}
