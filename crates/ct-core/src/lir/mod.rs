//! Low-level IR hosting the instrumentation passes.
//!
//! The model follows LLVM's typed-pointer IR closely enough that every
//! instruction has a result register named after its id, pointers carry their
//! pointee type and globals expose linkage, alignment and `unnamed_addr`.

use serde::{Deserialize, Serialize};

pub mod pretty;
pub mod ty;
pub mod verify;

pub use ty::Ty;
pub type LirType = Ty;
pub type LirId = u32;
pub type RegisterId = u32;
pub type BasicBlockId = u32;
pub type Name = String;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LirModule {
    pub name: Name,
    #[serde(default)]
    pub functions: Vec<LirFunction>,
    #[serde(default)]
    pub globals: Vec<LirGlobal>,
    #[serde(default)]
    pub type_definitions: Vec<LirTypeDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LirFunction {
    pub name: Name,
    pub signature: LirFunctionSignature,
    #[serde(default)]
    pub basic_blocks: Vec<LirBasicBlock>,
    #[serde(default)]
    pub locals: Vec<LirLocal>,
    #[serde(default)]
    pub stack_slots: Vec<StackSlot>,
    #[serde(default)]
    pub calling_convention: CallingConvention,
    #[serde(default)]
    pub linkage: Linkage,
    #[serde(default)]
    pub attributes: Vec<FunctionAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LirFunctionSignature {
    pub params: Vec<LirType>,
    pub return_type: LirType,
    #[serde(default)]
    pub is_variadic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LirBasicBlock {
    pub id: BasicBlockId,
    #[serde(default)]
    pub label: Option<Name>,
    #[serde(default)]
    pub instructions: Vec<LirInstruction>,
    pub terminator: LirTerminator,
    #[serde(default)]
    pub predecessors: Vec<BasicBlockId>,
    #[serde(default)]
    pub successors: Vec<BasicBlockId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LirInstruction {
    pub id: LirId,
    pub kind: LirInstructionKind,
    #[serde(default)]
    pub type_hint: Option<LirType>,
    #[serde(default)]
    pub debug_info: Option<DebugInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LirInstructionKind {
    // Arithmetic operations
    Add(LirValue, LirValue),
    Sub(LirValue, LirValue),
    Mul(LirValue, LirValue),
    Div(LirValue, LirValue),
    Rem(LirValue, LirValue),

    // Bitwise operations
    And(LirValue, LirValue),
    Or(LirValue, LirValue),
    Xor(LirValue, LirValue),
    Shl(LirValue, LirValue),
    Shr(LirValue, LirValue),
    Not(LirValue),

    // Comparison operations
    Eq(LirValue, LirValue),
    Ne(LirValue, LirValue),
    Lt(LirValue, LirValue),
    Le(LirValue, LirValue),
    Gt(LirValue, LirValue),
    Ge(LirValue, LirValue),

    // Memory operations
    Load {
        address: LirValue,
        alignment: Option<u32>,
        volatile: bool,
    },
    Store {
        value: LirValue,
        address: LirValue,
        alignment: Option<u32>,
        volatile: bool,
    },
    Alloca {
        ty: LirType,
        count: Option<LirValue>,
        alignment: u32,
    },

    // Pointer operations
    GetElementPtr {
        ptr: LirValue,
        indices: Vec<LirValue>,
        inbounds: bool,
    },
    PtrToInt(LirValue, LirType),
    IntToPtr(LirValue, LirType),

    // Type conversion operations
    Trunc(LirValue, LirType),
    ZExt(LirValue, LirType),
    SExt(LirValue, LirType),
    Bitcast(LirValue, LirType),

    // Function operations
    Call {
        function: LirValue,
        args: Vec<LirValue>,
        calling_convention: CallingConvention,
        tail_call: bool,
    },

    // Control flow helpers
    Phi {
        incoming: Vec<(LirValue, BasicBlockId)>,
    },
    Select {
        condition: LirValue,
        if_true: LirValue,
        if_false: LirValue,
    },

    // Misc
    Unreachable,
    Freeze(LirValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LirTerminator {
    Return(Option<LirValue>),
    Br(BasicBlockId),
    CondBr {
        condition: LirValue,
        if_true: BasicBlockId,
        if_false: BasicBlockId,
    },
    Switch {
        value: LirValue,
        default: BasicBlockId,
        cases: Vec<(u64, BasicBlockId)>,
    },
    Unreachable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LirValue {
    // Registers/SSA values, named after the defining instruction
    Register(RegisterId),

    // Constants
    Constant(LirConstant),

    // Global references; the type is the global's content type
    Global(Name, LirType),

    // Function references
    Function(Name),

    // Parameters and named locals
    Local(u32),

    // Stack slot references
    StackSlot(u32),

    // Undefined value
    Undef(LirType),

    // Null pointer of the given pointer type
    Null(LirType),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LirConstant {
    Int(i64, LirType),
    UInt(u64, LirType),
    Float(f64, LirType),
    Bool(bool),
    /// Raw byte array, stored exactly as given (terminators included).
    Bytes(Vec<u8>),
    /// Element constants and the element type.
    Array(Vec<LirConstant>, LirType),
    Struct(Vec<LirConstant>, LirType),
    /// In-bounds constant address computation into a global: name, content
    /// type of the global and the index path.
    GlobalRef(Name, LirType, Vec<u64>),
    Null(LirType),
    Undef(LirType),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LirGlobal {
    pub name: Name,
    pub ty: LirType,
    #[serde(default)]
    pub initializer: Option<LirConstant>,
    #[serde(default)]
    pub linkage: Linkage,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub is_constant: bool,
    #[serde(default)]
    pub alignment: Option<u32>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub unnamed_addr: UnnamedAddr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LirTypeDefinition {
    pub name: Name,
    pub ty: LirType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LirLocal {
    pub id: u32,
    pub ty: LirType,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_argument: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackSlot {
    pub id: u32,
    pub size: u32,
    pub alignment: u32,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionAttribute {
    NoInline,
    AlwaysInline,
    OptimizeNone,
    NoUnwind,
    Cold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CallingConvention {
    #[default]
    C,
    Fast,
    Cold,
    PreserveMost,
    PreserveAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Linkage {
    #[default]
    External,
    AvailableExternally,
    LinkOnceAny,
    LinkOnceOdr,
    WeakAny,
    WeakOdr,
    Appending,
    Internal,
    Private,
    ExternalWeak,
    Common,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    Default,
    Hidden,
    Protected,
}

/// Whether the address of a global is significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnnamedAddr {
    #[default]
    None,
    Local,
    Global,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugInfo {
    pub file: String,
    pub line: u32,
    pub column: u32,
    #[serde(default)]
    pub scope: Option<String>,
}

// Implementation helpers
impl LirModule {
    pub fn new(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            functions: Vec::new(),
            globals: Vec::new(),
            type_definitions: Vec::new(),
        }
    }

    pub fn add_function(&mut self, function: LirFunction) {
        self.functions.push(function);
    }

    pub fn add_global(&mut self, global: LirGlobal) {
        self.globals.push(global);
    }

    pub fn get_function(&self, name: &str) -> Option<&LirFunction> {
        self.functions.iter().find(|func| func.name == name)
    }

    pub fn get_function_mut(&mut self, name: &str) -> Option<&mut LirFunction> {
        self.functions.iter_mut().find(|func| func.name == name)
    }

    pub fn get_global(&self, name: &str) -> Option<&LirGlobal> {
        self.globals.iter().find(|global| global.name == name)
    }

    pub fn get_type_definition(&self, name: &str) -> Option<&LirTypeDefinition> {
        self.type_definitions.iter().find(|def| def.name == name)
    }

    /// Canonical rendering of `ty` with a top-level [`Ty::Named`] expanded
    /// through this module's type definitions. An undefined name renders as
    /// an opaque struct.
    pub fn type_string(&self, ty: &LirType) -> String {
        match ty {
            Ty::Named(name) => match self.get_type_definition(name) {
                Some(def) => format!("%{} = type {}", name, def.ty.definition_body()),
                None => format!("%{} = type opaque", name),
            },
            _ => ty.canonical_string(),
        }
    }

    /// True when either a function or a global already uses `name`.
    pub fn has_symbol(&self, name: &str) -> bool {
        self.get_function(name).is_some() || self.get_global(name).is_some()
    }

    /// Returns `base` if unused, otherwise the first free `base.N` for N >= 1.
    pub fn unique_global_name(&self, base: &str) -> Name {
        if !self.has_symbol(base) {
            return base.to_string();
        }
        let mut suffix = 1u32;
        loop {
            let candidate = format!("{}.{}", base, suffix);
            if !self.has_symbol(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }
}

impl LirFunction {
    pub fn new(
        name: impl Into<Name>,
        signature: LirFunctionSignature,
        calling_convention: CallingConvention,
        linkage: Linkage,
    ) -> Self {
        Self {
            name: name.into(),
            signature,
            basic_blocks: Vec::new(),
            locals: Vec::new(),
            stack_slots: Vec::new(),
            calling_convention,
            linkage,
            attributes: Vec::new(),
        }
    }

    pub fn add_basic_block(&mut self, block: LirBasicBlock) {
        self.basic_blocks.push(block);
    }

    pub fn is_declaration(&self) -> bool {
        self.basic_blocks.is_empty()
    }

    pub fn add_attribute(&mut self, attribute: FunctionAttribute) {
        if !self.has_attribute(attribute) {
            self.attributes.push(attribute);
        }
    }

    pub fn has_attribute(&self, attribute: FunctionAttribute) -> bool {
        self.attributes.contains(&attribute)
    }

    pub fn function_type(&self) -> LirType {
        Ty::Function {
            return_type: Box::new(self.signature.return_type.clone()),
            param_types: self.signature.params.clone(),
            is_variadic: self.signature.is_variadic,
        }
    }

    pub fn instructions(&self) -> impl Iterator<Item = &LirInstruction> {
        self.basic_blocks
            .iter()
            .flat_map(|block| block.instructions.iter())
    }

    pub fn defining_instruction(&self, id: RegisterId) -> Option<&LirInstruction> {
        self.instructions().find(|inst| inst.id == id)
    }

    /// Smallest id that no instruction of this function uses yet.
    pub fn next_instruction_id(&self) -> LirId {
        self.instructions()
            .map(|inst| inst.id + 1)
            .max()
            .unwrap_or(0)
    }

    /// Resolves the static type of `value` as seen from inside this function.
    pub fn value_type(&self, module: &LirModule, value: &LirValue) -> Option<LirType> {
        match value {
            LirValue::Register(id) => {
                let inst = self.defining_instruction(*id)?;
                match &inst.kind {
                    LirInstructionKind::Call { function, .. } if inst.type_hint.is_none() => {
                        self.callee_return_type(module, function)
                    }
                    _ => inst.result_type(),
                }
            }
            LirValue::Constant(constant) => Some(constant.ty()),
            LirValue::Global(_, ty) => Some(Ty::ptr(ty.clone())),
            LirValue::Function(name) => module
                .get_function(name)
                .map(|func| Ty::ptr(func.function_type())),
            LirValue::Local(id) => self
                .locals
                .iter()
                .find(|local| local.id == *id)
                .map(|local| local.ty.clone()),
            LirValue::StackSlot(_) => Some(Ty::i8_ptr()),
            LirValue::Undef(ty) | LirValue::Null(ty) => Some(ty.clone()),
        }
    }

    /// Return type of whatever `callee` points to. Register callees are not
    /// chased through further calls.
    fn callee_return_type(&self, module: &LirModule, callee: &LirValue) -> Option<LirType> {
        let callee_ty = match callee {
            LirValue::Function(name) => {
                return module
                    .get_function(name)
                    .map(|func| func.signature.return_type.clone());
            }
            LirValue::Register(id) => self.defining_instruction(*id)?.result_type()?,
            other => self.value_type(module, other)?,
        };
        match callee_ty.pointee()? {
            Ty::Function { return_type, .. } => Some(return_type.as_ref().clone()),
            _ => None,
        }
    }

    /// True when `value` is produced directly by a stack allocation. Only the
    /// immediate definer is inspected.
    pub fn is_stack_allocation(&self, value: &LirValue) -> bool {
        match value {
            LirValue::StackSlot(_) => true,
            LirValue::Register(id) => matches!(
                self.defining_instruction(*id).map(|inst| &inst.kind),
                Some(LirInstructionKind::Alloca { .. })
            ),
            _ => false,
        }
    }
}

impl LirBasicBlock {
    pub fn new(id: BasicBlockId, label: Option<Name>) -> Self {
        Self {
            id,
            label,
            instructions: Vec::new(),
            terminator: LirTerminator::Unreachable,
            predecessors: Vec::new(),
            successors: Vec::new(),
        }
    }

    pub fn add_instruction(&mut self, instruction: LirInstruction) {
        self.instructions.push(instruction);
    }

    pub fn set_terminator(&mut self, terminator: LirTerminator) {
        self.terminator = terminator;
    }

    pub fn position_of(&self, id: LirId) -> Option<usize> {
        self.instructions.iter().position(|inst| inst.id == id)
    }
}

impl LirInstruction {
    pub fn new(id: LirId, kind: LirInstructionKind) -> Self {
        Self {
            id,
            kind,
            type_hint: None,
            debug_info: None,
        }
    }

    pub fn with_type(mut self, ty: LirType) -> Self {
        self.type_hint = Some(ty);
        self
    }

    pub fn with_debug_info(mut self, debug_info: DebugInfo) -> Self {
        self.debug_info = Some(debug_info);
        self
    }

    /// Type of the register this instruction defines. Conversions and
    /// allocations carry it in their operands; everything else relies on the
    /// type hint.
    pub fn result_type(&self) -> Option<LirType> {
        use LirInstructionKind::*;

        match &self.kind {
            Alloca { ty, .. } => Some(Ty::ptr(ty.clone())),
            Bitcast(_, ty)
            | Trunc(_, ty)
            | ZExt(_, ty)
            | SExt(_, ty)
            | PtrToInt(_, ty)
            | IntToPtr(_, ty) => Some(ty.clone()),
            Eq(..) | Ne(..) | Lt(..) | Le(..) | Gt(..) | Ge(..) => Some(Ty::I1),
            Store { .. } | Unreachable => Some(Ty::Void),
            _ => self.type_hint.clone(),
        }
    }
}

impl LirInstructionKind {
    /// Every value read by the instruction, in operand order.
    pub fn operands(&self) -> Vec<&LirValue> {
        use LirInstructionKind::*;

        match self {
            Add(a, b) | Sub(a, b) | Mul(a, b) | Div(a, b) | Rem(a, b) | And(a, b) | Or(a, b)
            | Xor(a, b) | Shl(a, b) | Shr(a, b) | Eq(a, b) | Ne(a, b) | Lt(a, b) | Le(a, b)
            | Gt(a, b) | Ge(a, b) => vec![a, b],
            Not(value) | Freeze(value) => vec![value],
            Load { address, .. } => vec![address],
            Store { value, address, .. } => vec![value, address],
            Alloca { count, .. } => count.iter().collect(),
            GetElementPtr { ptr, indices, .. } => {
                std::iter::once(ptr).chain(indices.iter()).collect()
            }
            PtrToInt(value, _)
            | IntToPtr(value, _)
            | Trunc(value, _)
            | ZExt(value, _)
            | SExt(value, _)
            | Bitcast(value, _) => vec![value],
            Call { function, args, .. } => std::iter::once(function).chain(args.iter()).collect(),
            Phi { incoming } => incoming.iter().map(|(value, _)| value).collect(),
            Select {
                condition,
                if_true,
                if_false,
            } => vec![condition, if_true, if_false],
            Unreachable => Vec::new(),
        }
    }
}

impl LirTerminator {
    pub fn successors(&self) -> Vec<BasicBlockId> {
        match self {
            LirTerminator::Return(_) | LirTerminator::Unreachable => Vec::new(),
            LirTerminator::Br(target) => vec![*target],
            LirTerminator::CondBr {
                if_true, if_false, ..
            } => vec![*if_true, *if_false],
            LirTerminator::Switch { default, cases, .. } => std::iter::once(*default)
                .chain(cases.iter().map(|(_, bb)| *bb))
                .collect(),
        }
    }

    pub fn operands(&self) -> Vec<&LirValue> {
        match self {
            LirTerminator::Return(value) => value.iter().collect(),
            LirTerminator::CondBr { condition, .. } => vec![condition],
            LirTerminator::Switch { value, .. } => vec![value],
            LirTerminator::Br(_) | LirTerminator::Unreachable => Vec::new(),
        }
    }
}

impl LirConstant {
    pub fn ty(&self) -> LirType {
        match self {
            LirConstant::Int(_, ty)
            | LirConstant::UInt(_, ty)
            | LirConstant::Float(_, ty)
            | LirConstant::Struct(_, ty)
            | LirConstant::Null(ty)
            | LirConstant::Undef(ty) => ty.clone(),
            LirConstant::Bool(_) => Ty::I1,
            LirConstant::Bytes(bytes) => Ty::array(Ty::I8, bytes.len() as u64),
            LirConstant::Array(elements, element_ty) => {
                Ty::array(element_ty.clone(), elements.len() as u64)
            }
            LirConstant::GlobalRef(_, content_ty, indices) => {
                Ty::ptr(indexed_type(content_ty, indices).unwrap_or_else(|| content_ty.clone()))
            }
        }
    }

    /// `getelementptr inbounds (@name, 0, 0)` into a byte array: the address of
    /// its first byte.
    pub fn first_byte_of(name: impl Into<Name>, array_ty: LirType) -> Self {
        LirConstant::GlobalRef(name.into(), array_ty, vec![0, 0])
    }
}

/// Walks a constant index path the way `getelementptr` does: the first index
/// steps over the base pointer, the rest descend into aggregates.
pub fn indexed_type(base: &LirType, indices: &[u64]) -> Option<LirType> {
    let mut current = base;
    for index in indices.iter().skip(1) {
        current = match current {
            Ty::Array(element, _) | Ty::Vector(element, _) => element,
            Ty::Struct { fields, .. } => fields.get(usize::try_from(*index).ok()?)?,
            _ => return None,
        };
    }
    Some(current.clone())
}
