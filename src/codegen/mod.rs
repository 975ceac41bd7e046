//! Stack allocating code generator.
//!
//! Expressions evaluate into `%rax` with the right operand parked on the
//! stack, statements read and write fixed slots below the frame pointer.
use std::{collections::HashMap, error::Error, fmt::Display};

use log::debug;

use Instruction::*;
use Operand::*;
use Reg::*;

use crate::{
    asm::{Cond, Instruction, Operand, Reg},
    ast::{BinaryExpr, BinaryOp, Block, Expression, Function, If, Statement, WhileLoop},
};

/// Fixed amount of stack the prologue reserves for locals. At 8 bytes per
/// slot this bounds a function to 16 distinct variables; exceeding that is
/// not diagnosed.
const FRAME_SIZE: i64 = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    UndefinedVariable { name: String },
}

impl Display for CodegenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodegenError::UndefinedVariable { name } => {
                write!(f, "undefined variable '{name}'")
            }
        }
    }
}

impl Error for CodegenError {}

pub type CodegenResult<T> = Result<T, CodegenError>;

/// Generate the complete assembly text for one function.
pub fn generate(function: &Function) -> CodegenResult<String> {
    Codegen::new().generate(function)
}

/// Code generation context for a single function.
pub struct Codegen {
    instructions: Vec<Instruction>,
    variables: HashMap<String, i64>,
    stack_offset: i64,
    label_counter: usize,
}

impl Codegen {
    pub fn new() -> Self {
        Self {
            instructions: vec![],
            variables: HashMap::new(),
            stack_offset: 0,
            label_counter: 0,
        }
    }

    pub fn generate(mut self, function: &Function) -> CodegenResult<String> {
        self.emit_header(&function.name);

        // Prologue
        self.instructions.push(Pushq(Rbp));
        self.instructions.push(Movq(Register(Rsp), Register(Rbp)));
        self.instructions.push(Subq(Immediate(FRAME_SIZE), Register(Rsp)));

        self.generate_block(&function.body)?;

        // Control must never fall off the end of the function.
        self.instructions.push(Movq(Immediate(0), Register(Rax)));
        self.emit_epilogue();

        debug!(
            "generated {} instructions, {} variable slots",
            self.instructions.len(),
            self.variables.len()
        );

        let mut output = self
            .instructions
            .iter()
            .map(Instruction::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        output.push('\n');

        Ok(output)
    }

    #[cfg(target_os = "macos")]
    fn emit_header(&mut self, name: &str) {
        self.instructions.push(Directive(
            ".section __TEXT,__text,regular,pure_instructions".to_owned(),
        ));
        self.instructions.push(Directive(format!(".globl _{name}")));
        self.instructions.push(Directive(".p2align 4, 0x90".to_owned()));
        self.instructions.push(Label(format!("_{name}")));
    }

    #[cfg(not(target_os = "macos"))]
    fn emit_header(&mut self, name: &str) {
        self.instructions.push(Directive(".text".to_owned()));
        self.instructions.push(Directive(format!(".globl {name}")));
        self.instructions.push(Directive(format!(".type {name}, @function")));
        self.instructions.push(Label(name.to_owned()));
    }

    fn emit_epilogue(&mut self) {
        self.instructions.push(Movq(Register(Rbp), Register(Rsp)));
        self.instructions.push(Popq(Rbp));
        self.instructions.push(Ret);
    }

    fn next_label(&mut self) -> String {
        let label = format!(".L{}", self.label_counter);
        self.label_counter += 1;
        label
    }

    /// Slot of `name`, assigning the next free one on its first write.
    fn variable_slot(&mut self, name: &str) -> i64 {
        if let Some(&offset) = self.variables.get(name) {
            return offset;
        }

        self.stack_offset += 8;
        self.variables.insert(name.to_owned(), self.stack_offset);
        self.stack_offset
    }

    fn generate_block(&mut self, block: &Block) -> CodegenResult<()> {
        for statement in &block.statements {
            self.generate_statement(statement)?;
        }
        Ok(())
    }

    fn generate_statement(&mut self, statement: &Statement) -> CodegenResult<()> {
        match statement {
            Statement::Return(ret) => {
                self.generate_expression(&ret.expression)?;
                self.emit_epilogue();
            }
            Statement::Assignment(assignment) => {
                // The slot is assigned before the value is evaluated, so
                // `int x = x;` reads the (uninitialized) slot instead of
                // failing.
                let offset = self.variable_slot(&assignment.name);
                self.generate_expression(&assignment.value)?;
                self.instructions.push(Movq(Register(Rax), Frame(offset)));
            }
            Statement::If(if_statement) => self.generate_if(if_statement)?,
            Statement::While(while_loop) => self.generate_while(while_loop)?,
            Statement::Block(block) => self.generate_block(block)?,
        }
        Ok(())
    }

    fn generate_if(&mut self, if_statement: &If) -> CodegenResult<()> {
        let end_label = self.next_label();
        let else_label = self.next_label();

        self.generate_expression(&if_statement.condition)?;
        self.instructions.push(Cmpq(Immediate(0), Register(Rax)));

        let jump_target = if if_statement.else_branch.is_some() {
            else_label.clone()
        } else {
            end_label.clone()
        };
        self.instructions.push(Je(jump_target));

        self.generate_statement(&if_statement.then_branch)?;

        if let Some(else_branch) = &if_statement.else_branch {
            self.instructions.push(Jmp(end_label.clone()));
            self.instructions.push(Label(else_label));
            self.generate_statement(else_branch)?;
        }

        self.instructions.push(Label(end_label));
        Ok(())
    }

    fn generate_while(&mut self, while_loop: &WhileLoop) -> CodegenResult<()> {
        let start_label = self.next_label();
        let end_label = self.next_label();

        self.instructions.push(Label(start_label.clone()));
        self.generate_expression(&while_loop.condition)?;
        self.instructions.push(Cmpq(Immediate(0), Register(Rax)));
        self.instructions.push(Je(end_label.clone()));

        self.generate_statement(&while_loop.body)?;
        self.instructions.push(Jmp(start_label));
        self.instructions.push(Label(end_label));
        Ok(())
    }

    fn generate_expression(&mut self, expression: &Expression) -> CodegenResult<()> {
        match expression {
            Expression::Number(value) => {
                self.instructions
                    .push(Movq(Immediate(i64::from(*value)), Register(Rax)));
            }
            Expression::Variable(name) => {
                let Some(&offset) = self.variables.get(name) else {
                    return Err(CodegenError::UndefinedVariable { name: name.clone() });
                };
                self.instructions.push(Movq(Frame(offset), Register(Rax)));
            }
            Expression::Binary(binary) => self.generate_binary(binary)?,
        }
        Ok(())
    }

    /// Right operand first into `%rax`, parked on the stack; left operand
    /// into `%rax`; right popped into `%rcx`.
    fn generate_binary(&mut self, binary: &BinaryExpr) -> CodegenResult<()> {
        self.generate_expression(&binary.rhs)?;
        self.instructions.push(Pushq(Rax));
        self.generate_expression(&binary.lhs)?;
        self.instructions.push(Popq(Rcx));

        match binary.op {
            BinaryOp::Plus => self.instructions.push(Addq(Register(Rcx), Register(Rax))),
            BinaryOp::Minus => self.instructions.push(Subq(Register(Rcx), Register(Rax))),
            BinaryOp::Times => self.instructions.push(Imulq(Register(Rcx), Register(Rax))),
            BinaryOp::DividedBy => {
                self.instructions.push(Cqto);
                self.instructions.push(Idivq(Register(Rcx)));
            }
            BinaryOp::LessThan => self.emit_comparison(Cond::Less),
            BinaryOp::GreaterThan => self.emit_comparison(Cond::Greater),
            BinaryOp::LessOrEqual => self.emit_comparison(Cond::LessOrEqual),
            BinaryOp::GreaterOrEqual => self.emit_comparison(Cond::GreaterOrEqual),
            BinaryOp::Equal => self.emit_comparison(Cond::Equal),
            BinaryOp::NotEqual => self.emit_comparison(Cond::NotEqual),
        }
        Ok(())
    }

    /// Comparisons leave 0 or 1 in `%rax`.
    fn emit_comparison(&mut self, cond: Cond) {
        self.instructions.push(Cmpq(Register(Rcx), Register(Rax)));
        self.instructions.push(Set(cond, Al));
        self.instructions.push(Movzbq(Al, Rax));
    }
}

impl Default for Codegen {
    fn default() -> Self {
        Self::new()
    }
}
