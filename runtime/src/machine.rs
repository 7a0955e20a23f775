//! The register machine
//!
//! Fetch, decode and execute from address 0 until `exit`. Decrement is
//! clamped at zero; increment faults on overflow. Every executed
//! instruction is logged at trace level.

use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::image::{Op, ProgramImage, Registers};
use log::{debug, trace};
use parser::OUTPUT_VARIABLE;
use serde::Serialize;
use std::fmt;

/// Result of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Running,
    Halted,
}

/// What a finished run reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    /// Final value of `Y`
    pub output: u64,
    /// Final register state in manifest order
    pub state: Registers,
    /// Instructions executed, including the final `exit`
    pub steps: u64,
}

impl fmt::Display for ExecutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "out: {}", self.output)?;
        write!(f, "final state: {{")?;
        for (i, (name, value)) in self.state.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        write!(f, "}}")
    }
}

pub struct Machine<'a> {
    image: &'a ProgramImage,
    registers: Vec<u64>,
    pc: usize,
    steps: u64,
    max_steps: Option<u64>,
    halted: bool,
}

impl<'a> Machine<'a> {
    pub fn new(image: &'a ProgramImage) -> Self {
        Self {
            image,
            registers: image.registers.values().copied().collect(),
            pc: 0,
            steps: 0,
            max_steps: None,
            halted: false,
        }
    }

    /// Fault once `limit` instructions have executed without halting
    pub fn with_max_steps(mut self, limit: Option<u64>) -> Self {
        self.max_steps = limit;
        self
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Source text of the instruction about to execute
    pub fn next_instruction(&self) -> Option<&str> {
        if self.halted {
            return None;
        }
        self.image
            .instructions
            .get(self.pc)
            .map(|instruction| instruction.text.as_str())
    }

    /// Current register values in manifest order
    pub fn state(&self) -> Registers {
        self.image
            .registers
            .keys()
            .cloned()
            .zip(self.registers.iter().copied())
            .collect()
    }

    pub fn output(&self) -> u64 {
        self.image
            .registers
            .get_index_of(OUTPUT_VARIABLE)
            .and_then(|index| self.registers.get(index).copied())
            .unwrap_or_default()
    }

    /// Execute one instruction
    pub fn step(&mut self) -> Result<StepOutcome, RuntimeError> {
        if self.halted {
            return Ok(StepOutcome::Halted);
        }

        let image = self.image;
        let Some(instruction) = image.instructions.get(self.pc) else {
            let fault = RuntimeError::new(RuntimeErrorKind::Fault(format!(
                "execution ran past the last statement (pc {})",
                self.pc
            )));
            return Err(match image.instructions.last() {
                Some(last) => fault.at(image.file_id, last.line, last.text.clone()),
                None => fault,
            });
        };
        let fault = |reason: String| {
            RuntimeError::new(RuntimeErrorKind::Fault(reason)).at(
                image.file_id,
                instruction.line,
                instruction.text.clone(),
            )
        };

        if let Some(limit) = self.max_steps {
            if self.steps >= limit {
                return Err(fault(format!("step limit of {} exceeded", limit)));
            }
        }

        trace!("{}: (pc {}) {}", self.steps, self.pc, instruction.text);
        self.steps += 1;

        match instruction.op {
            Op::Increment(register) => {
                let value = &mut self.registers[register];
                *value = value.checked_add(1).ok_or_else(|| {
                    fault(format!(
                        "register `{}` overflowed",
                        image.register_name(register)
                    ))
                })?;
                self.pc += 1;
            }
            Op::Decrement(register) => {
                let value = &mut self.registers[register];
                *value = value.saturating_sub(1);
                self.pc += 1;
            }
            Op::JumpIfNonZero { register, target } => {
                if self.registers[register] != 0 {
                    self.pc = target;
                } else {
                    self.pc += 1;
                }
            }
            Op::Skip => self.pc += 1,
            Op::Exit => {
                self.halted = true;
                return Ok(StepOutcome::Halted);
            }
        }
        Ok(StepOutcome::Running)
    }

    /// Run to `exit`
    pub fn run(&mut self) -> Result<ExecutionReport, RuntimeError> {
        while self.step()? == StepOutcome::Running {}
        debug!("halted after {} step(s)", self.steps);
        Ok(self.report())
    }

    pub fn report(&self) -> ExecutionReport {
        ExecutionReport {
            output: self.output(),
            state: self.state(),
            steps: self.steps,
        }
    }
}

/// Load and run a compiled program
pub fn execute(text: &str, max_steps: Option<u64>) -> Result<ExecutionReport, RuntimeError> {
    let image = ProgramImage::parse(text)?;
    Machine::new(&image).with_max_steps(max_steps).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decrement_clamps_at_zero() {
        let report = execute("%vars Y,X\nX--\nX--\nY++\nexit\n", None).unwrap();
        assert_eq!(report.output, 1);
        assert_eq!(report.state.get("X"), Some(&0));
        assert_eq!(report.steps, 4);
    }

    #[test]
    fn test_copy_loop() {
        // Y <- X, destroying X
        let program = "%vars Y,X\n%specvar X 3\nif X not 0 goto 2\nexit\nX--\nY++\nif Y not 0 goto 0\n";
        let report = execute(program, None).unwrap();
        assert_eq!(report.output, 3);
        assert_eq!(report.state.get("X"), Some(&0));
    }

    #[test]
    fn test_step_by_step() {
        let image = ProgramImage::parse("%vars Y\nY++\nexit\n").unwrap();
        let mut machine = Machine::new(&image);
        assert_eq!(machine.next_instruction(), Some("Y++"));
        assert_eq!(machine.step().unwrap(), StepOutcome::Running);
        assert_eq!(machine.output(), 1);
        assert_eq!(machine.step().unwrap(), StepOutcome::Halted);
        assert!(machine.is_halted());
        assert_eq!(machine.next_instruction(), None);
        assert_eq!(machine.step().unwrap(), StepOutcome::Halted);
        assert_eq!(machine.steps(), 2);
    }

    #[test]
    fn test_falling_off_the_end_faults() {
        let err = execute("%vars Y\nY++\n", None).unwrap_err();
        assert_eq!(err.code(), "E0904");
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn test_step_limit() {
        let err = execute("%vars Y\nY++\nif Y not 0 goto 0\nexit\n", Some(100)).unwrap_err();
        assert_eq!(err.code(), "E0904");
        assert!(err.to_string().contains("step limit of 100 exceeded"));
    }

    #[test]
    fn test_increment_overflow_faults() {
        let program = format!("%vars Y\n%specvar Y {}\nY++\nexit\n", u64::MAX);
        let err = execute(&program, None).unwrap_err();
        assert_eq!(err.code(), "E0904");
        assert!(err.to_string().contains("overflowed"));
    }

    #[test]
    fn test_report_display() {
        let report = execute("%vars Y,X\n%specvar X 2\nY++\nexit\n", None).unwrap();
        assert_eq!(report.to_string(), "out: 1\nfinal state: {Y: 1, X: 2}");
    }
}
