use gmc_runtime::{execute, Machine, ProgramImage, RuntimeErrorKind, StepOutcome};

/// `%vars Y\n[A] Y++\nif Y not 0 goto B\n` as the compiler emits it: the
/// undeclared target resolves to the trailing exit.
const TERMINATES: &str = "%vars Y\nY++\nif Y not 0 goto 2\nexit\n";

#[test]
fn test_undeclared_target_program_outputs_one() {
    let report = execute(TERMINATES, None).unwrap();
    assert_eq!(report.output, 1);
    assert_eq!(report.steps, 3);
}

#[test]
fn test_expanded_inc2_program() {
    let program = "%vars Y,X\nX++\nX++\nskip\nexit\n";
    let report = execute(program, None).unwrap();
    assert_eq!(report.state.get("X"), Some(&2));
    assert_eq!(report.output, 0);
}

#[test]
fn test_report_serializes_state_in_manifest_order() {
    let report = execute("%vars Y,B,A\n%specvar A 7\nY++\nexit\n", None).unwrap();
    let json = serde_json::to_string(&report).unwrap();
    assert_eq!(json, r#"{"output":1,"state":{"Y":1,"B":0,"A":7},"steps":2}"#);
}

#[test]
fn test_machine_can_be_driven_manually() {
    let image = ProgramImage::parse(TERMINATES).unwrap();
    let mut machine = Machine::new(&image).with_max_steps(Some(10));
    let mut trace = Vec::new();
    loop {
        trace.push(machine.pc());
        if machine.step().unwrap() == StepOutcome::Halted {
            break;
        }
    }
    assert_eq!(trace, vec![0, 1, 2]);
    assert_eq!(machine.report().output, 1);
}

#[test]
fn test_errors_carry_line_and_statement() {
    let err = execute("%vars Y\n\n; padding\nQ--\nexit\n", None).unwrap_err();
    assert_eq!(err.kind, RuntimeErrorKind::UndeclaredVariable("Q".to_string()));
    assert_eq!(err.line(), Some(4));
    assert_eq!(err.to_string(), "Error on line 4: variable `Q` is not declared by %vars\nQ--");
}
