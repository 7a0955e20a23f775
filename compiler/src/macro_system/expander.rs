//! Hygienic macro expansion
//!
//! One pass replaces every macro call present at the start of the pass
//! with an instance of the macro's body. Calls produced by that body are
//! left for the next pass; the pipeline re-checks the program in between.
//!
//! Per call, in order:
//!
//! 1. a fresh exit-site label is generated and a `[Lk] skip` is placed
//!    right after the inlined body; `E` inside the body targets it,
//! 2. arguments are classified left to right as known variable, known
//!    label, or new variable, and bound to `_V<n>` / `_L<n>` in encounter
//!    order,
//! 3. the body is instantiated; each distinct `_var...` / `_label...`
//!    gets one fresh program-wide name for the whole instance.

use super::errors::MacroError;
use super::registry::{MacroDefinition, MacroRepository};
use super::template::{Operand, TemplateKind, TemplateStatement};
use crate::checker::SymbolTable;
use fxhash::FxHashMap;
use log::{debug, trace};
use parser::{MacroArgs, Statement, StatementKind, Target};

pub struct MacroExpander<'a> {
    repository: &'a MacroRepository,
    annotate: bool,
}

/// Names one instance of a macro body resolves against
struct Instance<'d> {
    definition: &'d MacroDefinition,
    variables: Vec<String>,
    labels: Vec<String>,
    exit_label: String,
    temp_variables: FxHashMap<String, String>,
    temp_labels: FxHashMap<String, String>,
}

impl<'d> Instance<'d> {
    fn resolve(&mut self, operand: &Operand, symbols: &mut SymbolTable) -> String {
        match operand {
            // Formal indices were range-checked when the template was loaded
            Operand::FormalVariable(index) => self.variables[index - 1].clone(),
            Operand::FormalLabel(index) => self.labels[index - 1].clone(),
            Operand::TempVariable(placeholder) => self
                .temp_variables
                .entry(placeholder.clone())
                .or_insert_with(|| symbols.fresh_variable())
                .clone(),
            Operand::TempLabel(placeholder) => self
                .temp_labels
                .entry(placeholder.clone())
                .or_insert_with(|| symbols.fresh_label())
                .clone(),
            Operand::Exit => self.exit_label.clone(),
            Operand::Name(name) => name.clone(),
        }
    }

    fn instantiate(
        &mut self,
        template: &TemplateStatement,
        call: &Statement,
        symbols: &mut SymbolTable,
    ) -> Statement {
        let label = template
            .label
            .as_ref()
            .map(|operand| self.resolve(operand, symbols));

        let kind = match &template.kind {
            TemplateKind::Increment(var) => StatementKind::Increment(self.resolve(var, symbols)),
            TemplateKind::Decrement(var) => StatementKind::Decrement(self.resolve(var, symbols)),
            TemplateKind::ConditionalGoto { var, target } => {
                let var = self.resolve(var, symbols);
                let target = self.resolve(target, symbols);
                StatementKind::ConditionalGoto {
                    var,
                    target: Target::Label(target),
                }
            }
            TemplateKind::Skip => StatementKind::Skip,
            TemplateKind::Exit => StatementKind::Exit,
            TemplateKind::MacroCall { prefix, args } => StatementKind::MacroCall {
                prefix: prefix.clone(),
                args: args
                    .iter()
                    .map(|arg| self.resolve(arg, symbols))
                    .collect::<MacroArgs>(),
            },
        };

        Statement {
            label,
            kind,
            origin: call.origin,
            expanded_from: Some(self.definition.name.clone()),
            note: None,
        }
    }
}

impl<'a> MacroExpander<'a> {
    pub fn new(repository: &'a MacroRepository) -> Self {
        Self {
            repository,
            annotate: false,
        }
    }

    /// Add `start of macro` / `end of macro` comments to expanded code
    pub fn with_annotations(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    /// Expand every macro call currently in `program`. Returns the number
    /// of calls expanded.
    pub fn expand_pass(
        &self,
        program: &mut Vec<Statement>,
        symbols: &mut SymbolTable,
    ) -> Result<usize, MacroError> {
        let mut expanded = Vec::with_capacity(program.len());
        let mut calls = 0;

        for statement in program.drain(..) {
            let definition = match &statement.kind {
                StatementKind::MacroCall { prefix, .. } => self.repository.get(prefix),
                _ => None,
            };
            match definition {
                Some(definition) => {
                    self.expand_call(definition, statement, symbols, &mut expanded)?;
                    calls += 1;
                }
                None => expanded.push(statement),
            }
        }

        *program = expanded;
        debug!(
            "expansion pass: {} call(s) expanded, {} statement(s)",
            calls,
            program.len()
        );
        Ok(calls)
    }

    fn expand_call(
        &self,
        definition: &MacroDefinition,
        call: Statement,
        symbols: &mut SymbolTable,
        out: &mut Vec<Statement>,
    ) -> Result<(), MacroError> {
        let args: &[String] = match &call.kind {
            StatementKind::MacroCall { args, .. } => args.as_slice(),
            _ => &[],
        };

        let exit_label = symbols.fresh_label();

        let mut variables = Vec::new();
        let mut labels = Vec::new();
        for arg in args {
            if symbols.is_variable(arg) {
                variables.push(arg.clone());
            } else if symbols.is_label(arg) {
                labels.push(arg.clone());
            } else {
                symbols.declare_variable(arg);
                variables.push(arg.clone());
            }
        }

        if (variables.len(), labels.len()) != definition.arity() {
            return Err(MacroError::ArgumentCountMismatch {
                macro_name: definition.name.clone(),
                expected: definition.arity(),
                found: (variables.len(), labels.len()),
                statement: call.to_string(),
                location: call.origin,
            });
        }

        trace!(
            "expanding '{}' at {}: vars {:?} labels {:?} exit {}",
            call,
            call.origin,
            variables,
            labels,
            exit_label
        );

        let mut instance = Instance {
            definition,
            variables,
            labels,
            exit_label,
            temp_variables: FxHashMap::default(),
            temp_labels: FxHashMap::default(),
        };

        let mut body: Vec<Statement> = definition
            .body
            .iter()
            .map(|template| instance.instantiate(template, &call, symbols))
            .collect();

        // The call's own label now names the start of the inlined body
        if let Some(label) = &call.label {
            match body.first_mut() {
                Some(first) if first.label.is_none() => first.label = Some(label.clone()),
                _ => {
                    let mut entry = Statement::labeled(label.clone(), StatementKind::Skip, call.origin);
                    entry.expanded_from = Some(definition.name.clone());
                    body.insert(0, entry);
                }
            }
        }

        let mut exit_site =
            Statement::labeled(instance.exit_label, StatementKind::Skip, call.origin);
        exit_site.expanded_from = Some(definition.name.clone());

        if self.annotate {
            if let Some(first) = body.first_mut() {
                first.note = Some(format!("start of macro {} ({})", definition.name, call));
            }
            exit_site.note = Some(format!("end of macro {}", definition.name));
        }

        out.extend(body);
        out.push(exit_site);
        Ok(())
    }
}
