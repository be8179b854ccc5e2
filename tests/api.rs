use logic_net::circuit::{Operator, Status, TerminalKind};
use logic_net::error::{Handle, NetworkError};
use logic_net::network::{GateId, Network, Source};

fn two_input(operator: Operator) -> (Network, GateId) {
    let mut netlist = Network::new("two_input".to_string());
    let a = netlist.create_terminal(TerminalKind::Input, true);
    let b = netlist.create_terminal(TerminalKind::Input, false);
    let g = netlist
        .create_gate(operator, 2, 1, "inst_0".into())
        .unwrap();
    netlist.connect_terminal(g, a).unwrap();
    netlist.connect_terminal(g, b).unwrap();
    (netlist, g)
}

#[test]
fn test_create_terminal() {
    let mut netlist = Network::new("terminals".to_string());
    let a = netlist.create_terminal(TerminalKind::Input, true);
    let y = netlist.create_terminal(TerminalKind::Output, false);

    let a = netlist.terminal(a).unwrap();
    assert!(a.is_an_input());
    assert!(a.get_value());
    assert_eq!(a.get_status(), Status::NotEvaluated);

    let y = netlist.terminal(y).unwrap();
    assert_eq!(y.get_kind(), TerminalKind::Output);
    assert_eq!(y.get_status(), Status::NotEvaluated);
}

#[test]
fn test_connect_fills_left_to_right() {
    let (netlist, g) = two_input(Operator::And);
    let inputs: Vec<_> = netlist.inputs().collect();
    let gate = netlist.gate(g).unwrap();
    assert_eq!(
        gate.inputs(),
        &[Source::Terminal(inputs[0]), Source::Terminal(inputs[1])]
    );
    assert!(gate.is_fully_connected());
}

#[test]
fn test_input_overflow() {
    let (mut netlist, g) = two_input(Operator::And);
    let c = netlist.create_input(true);
    assert_eq!(
        netlist.connect_terminal(g, c),
        Err(NetworkError::SlotOverflow {
            gate: "inst_0".to_string(),
            kind: "input",
            arity: 2
        })
    );

    let other = netlist
        .insert_gate(Operator::Not, "inv".into(), &[c.into()])
        .unwrap();
    assert!(matches!(
        netlist.connect_gate(g, other),
        Err(NetworkError::SlotOverflow { kind: "input", .. })
    ));
    // Earlier wiring is untouched
    assert_eq!(netlist.gate(g).unwrap().get_connected_inputs(), 2);
    assert!(netlist.gate(g).unwrap().drivers().next().is_none());
}

#[test]
fn test_output_overflow() {
    let (mut netlist, g) = two_input(Operator::Or);
    let y = netlist.create_output();
    let z = netlist.create_output();
    netlist.connect_terminal(g, y).unwrap();
    assert!(matches!(
        netlist.connect_terminal(g, z),
        Err(NetworkError::SlotOverflow { kind: "output", .. })
    ));
    assert_eq!(netlist.gate(g).unwrap().get_output(), y);
}

#[test]
fn test_caller_output_is_driven() {
    let (mut netlist, g) = two_input(Operator::Or);
    let y = netlist.create_output();
    netlist.connect_terminal(g, y).unwrap();
    assert!(netlist.evaluate(g).unwrap());
    let y = netlist.terminal(y).unwrap();
    assert!(y.get_value());
    assert_eq!(y.get_status(), Status::Evaluated);
}

#[test]
fn test_null_reference() {
    let (mut netlist, g) = two_input(Operator::And);
    let mut other = Network::new("other".to_string());
    let stray_terminal = {
        for _ in 0..8 {
            other.create_input(true);
        }
        other.inputs().last().unwrap()
    };
    let stray_gate = {
        let mut gate = None;
        for i in 0..4 {
            gate = Some(
                other
                    .create_gate(Operator::And, 1, 1, format!("g{i}").into())
                    .unwrap(),
            );
        }
        gate.unwrap()
    };

    assert_eq!(
        netlist.connect_terminal(g, stray_terminal),
        Err(NetworkError::NullReference(Handle::Terminal(stray_terminal)))
    );
    assert_eq!(
        netlist.connect_gate(g, stray_gate),
        Err(NetworkError::NullReference(Handle::Gate(stray_gate)))
    );
    assert_eq!(
        netlist.evaluate(stray_gate),
        Err(NetworkError::NullReference(Handle::Gate(stray_gate)))
    );
    assert_eq!(netlist.gate(g).unwrap().get_status(), Status::NotEvaluated);
}

#[test]
fn test_invalid_arity() {
    let mut netlist = Network::new("arity".to_string());
    assert!(matches!(
        netlist.create_gate(Operator::Not, 2, 1, "inv".into()),
        Err(NetworkError::InvalidArity { inputs: 2, .. })
    ));
    assert!(matches!(
        netlist.create_gate(Operator::And, 2, 0, "and".into()),
        Err(NetworkError::InvalidArity { outputs: 0, .. })
    ));
    assert_eq!(netlist.gate_count(), 0);
}

#[test]
fn test_duplicate_name() {
    let mut netlist = Network::new("names".to_string());
    netlist.create_gate(Operator::And, 2, 1, "g".into()).unwrap();
    assert_eq!(
        netlist.create_gate(Operator::Or, 2, 1, "g".into()),
        Err(NetworkError::DuplicateName("g".to_string()))
    );
    assert!(netlist.find_gate("g").is_some());
    assert!(netlist.find_gate("h").is_none());
}

#[test]
fn test_cycle_rejected() {
    let mut netlist = Network::new("cycle".to_string());
    let a = netlist.create_input(true);
    let first = netlist.create_gate(Operator::And, 2, 1, "first".into()).unwrap();
    let second = netlist
        .insert_gate(Operator::Or, "second".into(), &[first.into(), a.into()])
        .unwrap();
    netlist.connect_terminal(first, a).unwrap();
    assert_eq!(
        netlist.connect_gate(first, second),
        Err(NetworkError::CycleDetected("first".to_string()))
    );
    assert_eq!(netlist.gate(first).unwrap().inputs()[1], Source::Empty);
}

#[test]
fn test_error_messages() {
    let err = NetworkError::SlotOverflow {
        gate: "lb_1".to_string(),
        kind: "input",
        arity: 2,
    };
    assert_eq!(err.to_string(), "gate `lb_1` has no free input slot (arity 2)");
    let err = "NOR".parse::<Operator>().unwrap_err();
    assert_eq!(err.to_string(), "unknown operator `NOR`");
}

#[test]
fn test_input_values() {
    let mut netlist = Network::new("values".to_string());
    netlist.create_input(true);
    netlist.create_output();
    netlist.create_input(false);
    netlist.create_input(true);
    let values = netlist.input_values();
    assert_eq!(values.len(), 3);
    assert!(values[0]);
    assert!(!values[1]);
    assert!(values[2]);
}

#[test]
fn test_output_has_one_driver() {
    let mut netlist = Network::new("drivers".to_string());
    let a = netlist.create_input(true);
    let out = netlist.create_output();
    let inv = netlist
        .insert_gate(Operator::Not, "inv".into(), &[a.into()])
        .unwrap();
    let buf = netlist
        .insert_gate(Operator::And, "buf".into(), &[a.into()])
        .unwrap();
    assert_eq!(netlist.driver_of(out), None);

    netlist.connect_terminal(inv, out).unwrap();
    assert_eq!(netlist.driver_of(out), Some(inv));
    assert_eq!(
        netlist.connect_terminal(buf, out),
        Err(NetworkError::MultipleDrivers {
            terminal: out,
            driver: "inv".to_string()
        })
    );

    // Another gate's own output terminal is taken as well
    let internal = netlist.gate(buf).unwrap().get_output();
    assert_eq!(netlist.driver_of(internal), Some(buf));
    let spare = netlist
        .insert_gate(Operator::Or, "spare".into(), &[a.into()])
        .unwrap();
    assert_eq!(
        netlist.connect_terminal(spare, internal),
        Err(NetworkError::MultipleDrivers {
            terminal: internal,
            driver: "buf".to_string()
        })
    );

    assert!(!netlist.evaluate(inv).unwrap());
    assert!(netlist.evaluate(buf).unwrap());
    let out = netlist.terminal(out).unwrap();
    assert!(!out.get_value());
    assert_eq!(out.get_status(), Status::Evaluated);
}

#[test]
fn test_long_chain_builds() {
    let mut netlist = Network::new("chain".to_string());
    let a = netlist.create_input(true);
    let first = netlist.create_gate(Operator::And, 2, 1, "n0".into()).unwrap();
    netlist.connect_terminal(first, a).unwrap();
    let mut last = first;
    for i in 1..20_000 {
        last = netlist
            .insert_gate(Operator::Not, format!("n{i}").into(), &[last.into()])
            .unwrap();
    }
    assert_eq!(netlist.gate_count(), 20_000);
    // Closing the loop from the far end is still caught
    assert_eq!(
        netlist.connect_gate(first, last),
        Err(NetworkError::CycleDetected("n0".to_string()))
    );
    assert!(netlist.gate(first).unwrap().inputs()[1].is_empty());
}
