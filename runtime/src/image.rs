//! Loading compiled programs
//!
//! A compiled file is an optional `%vars` manifest, further directives and
//! then one resolved statement per line. Loading checks everything the
//! interpreter relies on up front, so execution itself can only fault on
//! arithmetic, the step limit or running off the end.

use crate::error::{RuntimeError, RuntimeErrorKind};
use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use log::{debug, trace};
use parser::{
    name_token, parse_statement, preprocess, split_directives, Dialect, FileId, SourceLine,
    StatementKind, Target, OUTPUT_VARIABLE, SPECVAR_DIRECTIVE, VARS_DIRECTIVE,
};
use std::fmt;

/// Register state in manifest order
pub type Registers = IndexMap<String, u64, FxBuildHasher>;

/// A decoded instruction. Registers are referred to by manifest index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Increment(usize),
    Decrement(usize),
    JumpIfNonZero { register: usize, target: usize },
    Skip,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub op: Op,
    /// Line in the compiled file
    pub line: usize,
    pub text: String,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// A validated, ready-to-run program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramImage {
    pub file_id: FileId,
    /// Initial register values after `%specvar` directives
    pub registers: Registers,
    pub instructions: Vec<Instruction>,
}

impl ProgramImage {
    pub fn parse(text: &str) -> Result<Self, RuntimeError> {
        Self::parse_with_file(text, FileId::new(0))
    }

    /// Parse a compiled program registered in a source map under `file_id`
    pub fn parse_with_file(text: &str, file_id: FileId) -> Result<Self, RuntimeError> {
        let (header, body) = split_directives(preprocess(text));
        let mut directives = header.iter().peekable();

        // Only a leading %vars is a manifest
        let mut registers = Registers::default();
        if let Some(line) = directives.next_if(|line| is_directive(line, VARS_DIRECTIVE)) {
            declare_registers(line, file_id, &mut registers)?;
        }
        if !registers.contains_key(OUTPUT_VARIABLE) {
            registers.insert(OUTPUT_VARIABLE.to_string(), 0);
            registers.move_index(registers.len() - 1, 0);
        }

        for line in directives {
            if is_directive(line, SPECVAR_DIRECTIVE) {
                apply_specvar(line, file_id, &mut registers)?;
            } else {
                debug!("ignoring directive `{}`", line.text);
            }
        }

        if body.is_empty() {
            return Err(RuntimeError::new(RuntimeErrorKind::MalformedProgram(
                "program has no statements".to_string(),
            )));
        }

        let mut instructions = Vec::with_capacity(body.len());
        for line in &body {
            instructions.push(decode(line, file_id, &registers, body.len())?);
        }

        debug!(
            "loaded {} instruction(s) over {} register(s)",
            instructions.len(),
            registers.len()
        );
        Ok(Self {
            file_id,
            registers,
            instructions,
        })
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Register name for a manifest index
    pub fn register_name(&self, index: usize) -> &str {
        self.registers
            .get_index(index)
            .map(|(name, _)| name.as_str())
            .unwrap_or(OUTPUT_VARIABLE)
    }
}

fn is_directive(line: &SourceLine, directive: &str) -> bool {
    line.text
        .split_whitespace()
        .next()
        .is_some_and(|head| head == directive)
}

fn located(kind: RuntimeErrorKind, line: &SourceLine, file_id: FileId) -> RuntimeError {
    RuntimeError::new(kind).at(file_id, line.number, line.text.clone())
}

/// `%vars A,B,C`
fn declare_registers(
    line: &SourceLine,
    file_id: FileId,
    registers: &mut Registers,
) -> Result<(), RuntimeError> {
    let malformed = || {
        located(
            RuntimeErrorKind::MalformedProgram("%vars malformed".to_string()),
            line,
            file_id,
        )
    };
    let tokens: Vec<&str> = line.text.split_whitespace().collect();
    let [_, names] = tokens.as_slice() else {
        return Err(malformed());
    };
    for name in names.split(',') {
        let name = name_token(Dialect::Program, name).ok_or_else(malformed)?;
        registers.insert(name.to_string(), 0);
    }
    Ok(())
}

/// `%specvar V n`
fn apply_specvar(
    line: &SourceLine,
    file_id: FileId,
    registers: &mut Registers,
) -> Result<(), RuntimeError> {
    let fail = |reason: &str| {
        located(
            RuntimeErrorKind::InvalidSpecvar(reason.to_string()),
            line,
            file_id,
        )
    };
    let tokens: Vec<&str> = line.text.split_whitespace().collect();
    let [_, name, value] = tokens.as_slice() else {
        return Err(fail("has incorrect argument count"));
    };
    let slot = registers
        .get_mut(*name)
        .ok_or_else(|| fail("specifies a non-existent variable"))?;
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(fail("assigns a non-numeric value to a variable"));
    }
    *slot = value
        .parse()
        .map_err(|_| fail("assigns a value that does not fit a register"))?;
    trace!("{} <- {}", name, slot);
    Ok(())
}

fn decode(
    line: &SourceLine,
    file_id: FileId,
    registers: &Registers,
    len: usize,
) -> Result<Instruction, RuntimeError> {
    let malformed = |reason: String| located(RuntimeErrorKind::MalformedProgram(reason), line, file_id);

    let statement = parse_statement(line, file_id, Dialect::Program)
        .map_err(|err| malformed(err.kind.to_string()))?;
    if let Some(label) = &statement.label {
        return Err(malformed(format!(
            "label `[{}]` in a compiled program",
            label
        )));
    }

    let register = |name: &str| {
        registers.get_index_of(name).ok_or_else(|| {
            located(
                RuntimeErrorKind::UndeclaredVariable(name.to_string()),
                line,
                file_id,
            )
        })
    };

    let op = match &statement.kind {
        StatementKind::Increment(var) => Op::Increment(register(var)?),
        StatementKind::Decrement(var) => Op::Decrement(register(var)?),
        StatementKind::ConditionalGoto { var, target } => {
            let target = match target {
                Target::Address(index) if *index < len => *index,
                Target::Address(index) => {
                    return Err(malformed(format!(
                        "goto address {} is outside the program (0..{})",
                        index, len
                    )))
                }
                Target::Label(label) => {
                    return Err(malformed(format!("unresolved goto target `{}`", label)))
                }
            };
            Op::JumpIfNonZero {
                register: register(var)?,
                target,
            }
        }
        StatementKind::Skip => Op::Skip,
        StatementKind::Exit => Op::Exit,
        StatementKind::MacroCall { prefix, .. } => {
            return Err(malformed(format!("unmatched initial token `{}`", prefix)))
        }
    };

    Ok(Instruction {
        op,
        line: line.number,
        text: line.text.clone(),
    })
}
