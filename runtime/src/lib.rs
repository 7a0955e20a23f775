//! G Runtime Library
//!
//! Loads compiled G programs (the `.g` files written by the compiler) and
//! executes them on a register machine with natural-number registers.
//!
//! # Example
//!
//! ```
//! use gmc_runtime::execute;
//!
//! let report = execute("%vars Y,X\n%specvar X 2\nY++\nexit\n", None).unwrap();
//! assert_eq!(report.output, 1);
//! ```

pub mod error;
pub mod image;
pub mod machine;

pub use error::{RuntimeError, RuntimeErrorKind};
pub use image::{Instruction, Op, ProgramImage, Registers};
pub use machine::{execute, ExecutionReport, Machine, StepOutcome};
