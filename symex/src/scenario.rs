// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

// A scenario declares some types, functions, frames and variables and then runs a sequence
// of steps against a single program state. Values are written in a small expression language
// that maps directly onto the builder and store manager operations. Print and reap steps can
// carry the rendering they are expected to produce, which turns a scenario into a test.

use crate::ast::{
    BinaryOp, Expr, ExprId, ExprKind, FieldDecl, FunctionDecl, RecordDecl, StmtId, StorageClass,
    VarDecl,
};
use crate::location_context::StackFrameContext;
use crate::memory_region::RegionId;
use crate::options::{Options, OptionsError};
use crate::printer::Printer;
use crate::program_state::{ProgramState, ProgramStateManager};
use crate::svals::SVal;
use crate::symbol::SymbolId;
use crate::symbol_reaper::ExplicitLiveness;
use crate::types::{QualType, TypeKind};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed scenario: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bad scenario flags: {0}")]
    Flags(#[from] OptionsError),
    #[error("unknown type `{0}`")]
    UnknownType(String),
    #[error("unknown {kind} `{name}`")]
    UnknownName { kind: &'static str, name: String },
    #[error("unknown operator `{0}`")]
    UnknownOperator(String),
    #[error("`{0}` does not denote a region")]
    NotARegion(String),
    #[error("`{0}` does not denote a symbol")]
    NotASymbol(String),
}

#[derive(Debug, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    /// Command line options to run this scenario with, for example `--max_symbol_complexity 4`.
    #[serde(default)]
    pub flags: String,
    #[serde(default)]
    pub records: Vec<RecordDef>,
    #[serde(default)]
    pub functions: Vec<FunctionDef>,
    #[serde(default)]
    pub frames: Vec<FrameDef>,
    #[serde(default)]
    pub vars: Vec<VarDef>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
pub struct RecordDef {
    pub name: String,
    #[serde(default)]
    pub is_union: bool,
    pub size: Option<u64>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub ty: String,
}

#[derive(Debug, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    #[serde(default)]
    pub is_weak: bool,
}

#[derive(Debug, Deserialize)]
pub struct FrameDef {
    pub name: String,
    pub function: String,
    pub parent: Option<String>,
    pub call_site: Option<u32>,
    #[serde(default)]
    pub block_count: u32,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageDef {
    Local,
    Parameter,
    Global,
    SystemGlobal,
    StaticLocal,
}

#[derive(Debug, Deserialize)]
pub struct VarDef {
    pub name: String,
    pub ty: String,
    pub storage: StorageDef,
    /// The parameter index, for parameters.
    #[serde(default)]
    pub index: u32,
    pub frame: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    Bind {
        loc: ValueExpr,
        value: ValueExpr,
    },
    BindDefault {
        region: ValueExpr,
        value: ValueExpr,
    },
    BindExpr {
        expr: u32,
        frame: String,
        value: ValueExpr,
    },
    Taint {
        value: ValueExpr,
    },
    Print {
        value: ValueExpr,
        expect: Option<String>,
    },
    Depend {
        primary: ValueExpr,
        dependent: ValueExpr,
    },
    Reap {
        frame: Option<String>,
        stmt: Option<u32>,
        #[serde(default)]
        live_vars: Vec<String>,
        #[serde(default)]
        live_exprs: Vec<u32>,
        expect_dead: Option<Vec<String>>,
        expect_store: Option<Vec<String>>,
    },
}

/// The value language.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueExpr {
    Int {
        value: i64,
        ty: String,
    },
    Null,
    Unknown,
    Undef,
    /// The address of a variable.
    Var(String),
    Field {
        base: Box<ValueExpr>,
        /// Written as `Record.field`.
        field: String,
    },
    Element {
        base: Box<ValueExpr>,
        index: Box<ValueExpr>,
        ty: String,
    },
    /// The value stored at a location.
    Load {
        loc: Box<ValueExpr>,
        ty: Option<String>,
    },
    Conjure {
        ty: String,
        #[serde(default)]
        count: u32,
        expr: Option<u32>,
        frame: Option<String>,
        tag: Option<String>,
    },
    Heap {
        ty: String,
        expr: u32,
        #[serde(default)]
        count: u32,
    },
    String(String),
    Binop {
        op: String,
        lhs: Box<ValueExpr>,
        rhs: Box<ValueExpr>,
        ty: String,
    },
    Cast {
        value: Box<ValueExpr>,
        from: String,
        to: String,
    },
    Minus(Box<ValueExpr>),
    Complement(Box<ValueExpr>),
    RegionValue(Box<ValueExpr>),
    Derived {
        parent: Box<ValueExpr>,
        region: Box<ValueExpr>,
    },
    Extent(Box<ValueExpr>),
    Metadata {
        region: Box<ValueExpr>,
        ty: String,
        tag: Option<String>,
        #[serde(default)]
        count: u32,
    },
    Function(String),
    /// The value of an expression in the environment.
    Expr {
        expr: u32,
        frame: String,
    },
}

/// What running a scenario produced.
#[derive(Debug, Default, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub lines: Vec<String>,
    pub failures: usize,
}

/// Expression ids handed out to string literals start here, to stay clear of the ids
/// used by the scenario itself.
const FIRST_SYNTHETIC_EXPR: u32 = 1_000_000;

pub fn parse_binary_op(spelling: &str) -> Result<BinaryOp, ScenarioError> {
    use BinaryOp::*;
    Ok(match spelling {
        "*" => Mul,
        "/" => Div,
        "%" => Rem,
        "+" => Add,
        "-" => Sub,
        "<<" => Shl,
        ">>" => Shr,
        "<" => Lt,
        ">" => Gt,
        "<=" => Le,
        ">=" => Ge,
        "==" => Eq,
        "!=" => Ne,
        "&" => And,
        "^" => Xor,
        "|" => Or,
        "&&" => LAnd,
        "||" => LOr,
        _ => return Err(ScenarioError::UnknownOperator(spelling.to_string())),
    })
}

pub struct ScenarioRunner {
    manager: ProgramStateManager,
    state: ProgramState,
    records: HashMap<String, Rc<RecordDecl>>,
    fields: HashMap<String, Rc<FieldDecl>>,
    functions: HashMap<String, Rc<FunctionDecl>>,
    frames: HashMap<String, Rc<StackFrameContext>>,
    vars: HashMap<String, (Rc<VarDecl>, Option<Rc<StackFrameContext>>)>,
    next_decl_id: u32,
    next_expr_id: u32,
    report: ScenarioReport,
}

impl ScenarioRunner {
    pub fn new(options: &Options) -> ScenarioRunner {
        let mut manager = ProgramStateManager::new();
        manager
            .builder
            .set_max_symbol_complexity(options.max_symbol_complexity);
        let state = manager.get_initial_state();
        ScenarioRunner {
            manager,
            state,
            records: HashMap::new(),
            fields: HashMap::new(),
            functions: HashMap::new(),
            frames: HashMap::new(),
            vars: HashMap::new(),
            next_decl_id: 0,
            next_expr_id: FIRST_SYNTHETIC_EXPR,
            report: ScenarioReport::default(),
        }
    }

    pub fn state(&self) -> &ProgramState {
        &self.state
    }

    pub fn manager(&self) -> &ProgramStateManager {
        &self.manager
    }

    fn fresh_decl_id(&mut self) -> u32 {
        self.next_decl_id += 1;
        self.next_decl_id
    }

    /// Runs the scenario to completion and returns the report.
    pub fn run(mut self, scenario: &Scenario) -> Result<ScenarioReport, ScenarioError> {
        self.report.name = scenario.name.clone();
        self.declare(scenario)?;
        for step in scenario.steps.iter() {
            self.run_step(step)?;
        }
        Ok(self.report)
    }

    fn declare(&mut self, scenario: &Scenario) -> Result<(), ScenarioError> {
        for record in scenario.records.iter() {
            let id = self.fresh_decl_id();
            let decl = Rc::new(RecordDecl {
                id,
                name: Rc::from(record.name.as_str()),
                ty: QualType::record(&record.name, record.is_union, record.size),
            });
            self.records.insert(record.name.clone(), decl.clone());
            for (index, field) in record.fields.iter().enumerate() {
                let id = self.fresh_decl_id();
                let field_decl = Rc::new(FieldDecl {
                    id,
                    name: Rc::from(field.name.as_str()),
                    index: index as u32,
                    ty: self.parse_type(&field.ty)?,
                    parent: decl.clone(),
                });
                self.fields
                    .insert(format!("{}.{}", record.name, field.name), field_decl);
            }
        }
        for function in scenario.functions.iter() {
            let id = self.fresh_decl_id();
            self.functions.insert(
                function.name.clone(),
                Rc::new(FunctionDecl {
                    id,
                    name: Rc::from(function.name.as_str()),
                    is_weak: function.is_weak,
                }),
            );
        }
        for frame in scenario.frames.iter() {
            let function = self.function(&frame.function)?;
            let parent = match &frame.parent {
                Some(parent) => Some(self.frame(parent)?),
                None => None,
            };
            let context = self.manager.builder.frames.get_stack_frame(
                function,
                parent,
                frame.call_site.map(ExprId),
                frame.block_count,
            );
            self.frames.insert(frame.name.clone(), context);
        }
        for var in scenario.vars.iter() {
            let storage = match var.storage {
                StorageDef::Local => StorageClass::Local,
                StorageDef::Parameter => StorageClass::Parameter { index: var.index },
                StorageDef::Global => StorageClass::Global {
                    in_system_header: false,
                },
                StorageDef::SystemGlobal => StorageClass::Global {
                    in_system_header: true,
                },
                StorageDef::StaticLocal => StorageClass::StaticLocal,
            };
            let frame = match &var.frame {
                Some(frame) => Some(self.frame(frame)?),
                None => None,
            };
            let id = self.fresh_decl_id();
            let decl = Rc::new(VarDecl {
                id,
                name: Rc::from(var.name.as_str()),
                ty: self.parse_type(&var.ty)?,
                storage,
            });
            self.vars.insert(var.name.clone(), (decl, frame));
        }
        Ok(())
    }

    fn function(&self, name: &str) -> Result<Rc<FunctionDecl>, ScenarioError> {
        self.functions
            .get(name)
            .cloned()
            .ok_or_else(|| ScenarioError::UnknownName {
                kind: "function",
                name: name.to_string(),
            })
    }

    fn frame(&self, name: &str) -> Result<Rc<StackFrameContext>, ScenarioError> {
        self.frames
            .get(name)
            .cloned()
            .ok_or_else(|| ScenarioError::UnknownName {
                kind: "frame",
                name: name.to_string(),
            })
    }

    /// Parses the textual type syntax: primitive names, `const T`, `T*`, `T&`, `T[N]`, `T[]`,
    /// `struct S`, `union U` (declared records, or inline as `struct S:size`), `enum E`,
    /// `fn name` and `block`.
    pub fn parse_type(&self, text: &str) -> Result<QualType, ScenarioError> {
        let text = text.trim();
        let unknown = || ScenarioError::UnknownType(text.to_string());
        if let Some(rest) = text.strip_prefix("const ") {
            return Ok(self.parse_type(rest)?.with_const());
        }
        if let Some(rest) = text.strip_suffix('*') {
            return Ok(QualType::pointer_to(self.parse_type(rest)?));
        }
        if let Some(rest) = text.strip_suffix('&') {
            return Ok(TypeKind::Reference(self.parse_type(rest)?).into());
        }
        if let Some(rest) = text.strip_suffix(']') {
            let open = rest.rfind('[').ok_or_else(unknown)?;
            let length = match rest[open + 1..].trim() {
                "" => None,
                n => Some(n.parse::<u64>().map_err(|_| unknown())?),
            };
            return Ok(QualType::array_of(self.parse_type(&rest[..open])?, length));
        }
        let record = |is_union: bool, rest: &str| -> Result<QualType, ScenarioError> {
            match rest.split_once(':') {
                Some((name, size)) => {
                    let size = size.trim().parse::<u64>().map_err(|_| unknown())?;
                    Ok(QualType::record(name.trim(), is_union, Some(size)))
                }
                None => match self.records.get(rest.trim()) {
                    Some(decl) => Ok(decl.ty.clone()),
                    None => Ok(QualType::record(rest.trim(), is_union, None)),
                },
            }
        };
        if let Some(rest) = text.strip_prefix("struct ") {
            return record(false, rest);
        }
        if let Some(rest) = text.strip_prefix("union ") {
            return record(true, rest);
        }
        if let Some(name) = text.strip_prefix("enum ") {
            return Ok(TypeKind::Enum {
                name: Rc::from(name.trim()),
            }
            .into());
        }
        if let Some(name) = text.strip_prefix("fn ") {
            return Ok(TypeKind::Function {
                name: Rc::from(name.trim()),
            }
            .into());
        }
        use TypeKind::*;
        let kind = match text {
            "void" => Void,
            "bool" => Bool,
            "char" => Char,
            "i8" => I8,
            "i16" => I16,
            "i32" => I32,
            "i64" => I64,
            "i128" => I128,
            "isize" => Isize,
            "u8" => U8,
            "u16" => U16,
            "u32" => U32,
            "u64" => U64,
            "u128" => U128,
            "usize" => Usize,
            "f32" => F32,
            "f64" => F64,
            "nullptr_t" => NullPtr,
            "block" => BlockPointer,
            _ => return Err(unknown()),
        };
        Ok(kind.into())
    }

    fn region_of(&self, val: &SVal, expr: &ValueExpr) -> Result<RegionId, ScenarioError> {
        val.as_region()
            .ok_or_else(|| ScenarioError::NotARegion(format!("{:?}", expr)))
    }

    fn symbol_of(&self, val: &SVal, expr: &ValueExpr) -> Result<SymbolId, ScenarioError> {
        val.as_symbol(&self.manager.builder.regions, false)
            .ok_or_else(|| ScenarioError::NotASymbol(format!("{:?}", expr)))
    }

    fn optional_frame(
        &self,
        name: &Option<String>,
    ) -> Result<Option<Rc<StackFrameContext>>, ScenarioError> {
        match name {
            Some(name) => Ok(Some(self.frame(name)?)),
            None => Ok(None),
        }
    }

    /// Evaluates an expression of the value language against the current state.
    pub fn eval(&mut self, expr: &ValueExpr) -> Result<SVal, ScenarioError> {
        let store_manager = self.manager.store_manager();
        Ok(match expr {
            ValueExpr::Int { value, ty } => {
                let ty = self.parse_type(ty)?;
                self.manager.builder.make_int_val(i128::from(*value), &ty)
            }
            ValueExpr::Null => self.manager.builder.make_null(),
            ValueExpr::Unknown => SVal::Unknown,
            ValueExpr::Undef => SVal::Undefined,
            ValueExpr::Var(name) => {
                let (decl, frame) =
                    self.vars
                        .get(name)
                        .cloned()
                        .ok_or_else(|| ScenarioError::UnknownName {
                            kind: "variable",
                            name: name.clone(),
                        })?;
                store_manager.get_lvalue_var(&mut self.manager.builder, &decl, frame.as_ref())
            }
            ValueExpr::Field { base, field } => {
                let base = self.eval(base)?;
                let decl =
                    self.fields
                        .get(field)
                        .cloned()
                        .ok_or_else(|| ScenarioError::UnknownName {
                            kind: "field",
                            name: field.clone(),
                        })?;
                store_manager.get_lvalue_field(&mut self.manager.builder, &decl, &base)
            }
            ValueExpr::Element { base, index, ty } => {
                let base = self.eval(base)?;
                let index = self.eval(index)?;
                let ty = self.parse_type(ty)?;
                store_manager.get_lvalue_element(&mut self.manager.builder, &ty, &index, &base)
            }
            ValueExpr::Load { loc, ty } => {
                let loc = self.eval(loc)?;
                let ty = match ty {
                    Some(ty) => Some(self.parse_type(ty)?),
                    None => None,
                };
                let state = self.state.clone();
                self.manager.get_sval(&state, &loc, ty.as_ref())
            }
            ValueExpr::Conjure {
                ty,
                count,
                expr,
                frame,
                tag,
            } => {
                let ty = self.parse_type(ty)?;
                let frame = self.optional_frame(frame)?;
                self.manager.builder.conjure_symbol_val(
                    tag.as_deref(),
                    expr.map(ExprId),
                    frame.as_ref(),
                    &ty,
                    *count,
                )
            }
            ValueExpr::Heap { ty, expr, count } => {
                let ty = self.parse_type(ty)?;
                self.manager
                    .builder
                    .get_conjured_heap_symbol_val(ExprId(*expr), None, &ty, *count)
            }
            ValueExpr::String(text) => {
                let id = self.next_expr_id;
                self.next_expr_id += 1;
                let ty = QualType::array_of(QualType::char(), Some(text.len() as u64 + 1));
                let literal = Expr::new(id, ty, ExprKind::StringLiteral(Rc::from(text.as_str())));
                self.manager
                    .builder
                    .get_constant_val(&literal)
                    .unwrap_or(SVal::Unknown)
            }
            ValueExpr::Binop { op, lhs, rhs, ty } => {
                let op = parse_binary_op(op)?;
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                let ty = self.parse_type(ty)?;
                let state = self.state.clone();
                self.manager.builder.eval_bin_op(&state, op, &lhs, &rhs, &ty)
            }
            ValueExpr::Cast { value, from, to } => {
                let value = self.eval(value)?;
                let from = self.parse_type(from)?;
                let to = self.parse_type(to)?;
                self.manager.builder.eval_cast(value, &to, &from)
            }
            ValueExpr::Minus(operand) => {
                let operand = self.eval(operand)?;
                self.manager.builder.eval_minus(&operand)
            }
            ValueExpr::Complement(operand) => {
                let operand = self.eval(operand)?;
                self.manager.builder.eval_complement(&operand)
            }
            ValueExpr::RegionValue(loc) => {
                let val = self.eval(loc)?;
                let region = self.region_of(&val, loc)?;
                self.manager.builder.get_region_value_symbol_val(region)
            }
            ValueExpr::Derived { parent, region } => {
                let parent_val = self.eval(parent)?;
                let parent = self.symbol_of(&parent_val, parent)?;
                let region_val = self.eval(region)?;
                let region = self.region_of(&region_val, region)?;
                self.manager
                    .builder
                    .get_derived_region_value_symbol_val(parent, region)
            }
            ValueExpr::Extent(loc) => {
                let val = self.eval(loc)?;
                let region = self.region_of(&val, loc)?;
                self.manager.builder.get_extent_symbol_val(region)
            }
            ValueExpr::Metadata {
                region,
                ty,
                tag,
                count,
            } => {
                let region_val = self.eval(region)?;
                let region = self.region_of(&region_val, region)?;
                let ty = self.parse_type(ty)?;
                self.manager.builder.get_metadata_symbol_val(
                    tag.as_deref(),
                    region,
                    None,
                    &ty,
                    None,
                    *count,
                )
            }
            ValueExpr::Function(name) => {
                let function = self.function(name)?;
                self.manager.builder.get_function_pointer(&function)
            }
            ValueExpr::Expr { expr, frame } => {
                let frame = self.frame(frame)?;
                self.manager
                    .get_expr_sval(&self.state, ExprId(*expr), &frame)
            }
        })
    }

    fn check(&mut self, what: &str, actual: &str, expected: &Option<String>) {
        self.report.lines.push(format!("{}: {}", what, actual));
        if let Some(expected) = expected {
            if expected != actual {
                error!("{}: expected {}, got {}", what, expected, actual);
                self.report
                    .lines
                    .push(format!("  mismatch, expected: {}", expected));
                self.report.failures += 1;
            }
        }
    }

    fn check_all(&mut self, what: &str, actual: &[String], expected: &Option<Vec<String>>) {
        for line in actual.iter() {
            self.report.lines.push(format!("{}: {}", what, line));
        }
        if let Some(expected) = expected {
            if expected.as_slice() != actual {
                error!("{}: expected {:?}, got {:?}", what, expected, actual);
                self.report
                    .lines
                    .push(format!("  mismatch, expected: {:?}", expected));
                self.report.failures += 1;
            }
        }
    }

    pub fn run_step(&mut self, step: &Step) -> Result<(), ScenarioError> {
        debug!("step {:?}", step);
        match step {
            Step::Bind { loc, value } => {
                let loc = self.eval(loc)?;
                let value = self.eval(value)?;
                let state = self.state.clone();
                self.state = self.manager.bind_loc(&state, &loc, value);
            }
            Step::BindDefault { region, value } => {
                let region_val = self.eval(region)?;
                let region = self.region_of(&region_val, region)?;
                let value = self.eval(value)?;
                let state = self.state.clone();
                self.state = self.manager.bind_default(&state, region, value);
            }
            Step::BindExpr { expr, frame, value } => {
                let frame = self.frame(frame)?;
                let value = self.eval(value)?;
                self.state = self
                    .manager
                    .bind_expr(&self.state, ExprId(*expr), &frame, value);
            }
            Step::Taint { value } => {
                let value = self.eval(value)?;
                self.state = self.manager.add_taint(&self.state, &value);
            }
            Step::Print { value, expect } => {
                let value = self.eval(value)?;
                let rendered = Printer::new(
                    &self.manager.builder.regions,
                    &self.manager.builder.symbols,
                )
                .sval(&value);
                self.check("print", &rendered, expect);
            }
            Step::Depend { primary, dependent } => {
                let primary_val = self.eval(primary)?;
                let primary = self.symbol_of(&primary_val, primary)?;
                let dependent_val = self.eval(dependent)?;
                let dependent = self.symbol_of(&dependent_val, dependent)?;
                self.manager
                    .builder
                    .symbols
                    .add_symbol_dependency(primary, dependent);
            }
            Step::Reap {
                frame,
                stmt,
                live_vars,
                live_exprs,
                expect_dead,
                expect_store,
            } => {
                let frame = self.optional_frame(frame)?;
                let mut liveness = ExplicitLiveness::new();
                if let (Some(frame), Some(stmt)) = (&frame, stmt) {
                    for name in live_vars.iter() {
                        let (decl, _) =
                            self.vars
                                .get(name)
                                .ok_or_else(|| ScenarioError::UnknownName {
                                    kind: "variable",
                                    name: name.clone(),
                                })?;
                        liveness.add_live_var(frame, StmtId(*stmt), decl);
                    }
                    for expr in live_exprs.iter() {
                        liveness.add_live_expr(frame, StmtId(*stmt), ExprId(*expr));
                    }
                }
                let (state, dead) = self.manager.remove_dead_bindings(
                    &self.state,
                    frame,
                    stmt.map(StmtId),
                    &liveness,
                );
                self.state = state;
                let printer = Printer::new(
                    &self.manager.builder.regions,
                    &self.manager.builder.symbols,
                );
                let dead: Vec<String> = dead.iter().map(|s| printer.symbol(*s)).collect();
                let store_manager = self.manager.store_manager();
                let store = printer.store(store_manager.as_ref(), &self.state.store);
                self.check_all("dead", &dead, expect_dead);
                self.check_all("store", &store, expect_store);
            }
        }
        Ok(())
    }
}

pub fn parse_scenario(text: &str) -> Result<Scenario, ScenarioError> {
    Ok(serde_json::from_str(text)?)
}

/// Reads and runs the scenario in the given file. Flags recorded in the scenario are applied
/// on top of the given options.
pub fn run_file(path: &Path, options: &Options) -> Result<ScenarioReport, ScenarioError> {
    let text = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let scenario = parse_scenario(&text)?;
    let mut options = options.clone();
    if !scenario.flags.is_empty() {
        options.parse_from_str(&scenario.flags)?;
    }
    info!("running {} from {}", scenario.name, path.display());
    ScenarioRunner::new(&options).run(&scenario)
}
