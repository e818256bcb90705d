//! Method body emission
//!
//! `MethodWriter` records a symbolic instruction list. Operand stack and
//! local variable types are tracked as instructions are added, so stack
//! underflow and inconsistent control flow merges are reported at the
//! offending instruction. `GeneratedMethod::assemble` resolves constants
//! against the target class's pool and lays out the final `Code` attribute
//! together with its `StackMapTable` and `LocalVariableTable`.

use super::attribute::{
    annotations_to_bytes, Annotation, AttributeInfo, BootstrapMethods, CodeAttribute, LocalVariableEntry,
    LocalVariableTableAttribute,
};
use super::constpool::ConstantPool;
use super::defs::{attribute_names, CONSTRUCTOR_METHOD_NAME, MAX_CODE_LENGTH};
use super::descriptor::{parse_field_descriptor, MethodDescriptor};
use super::error::{BytecodeError, BytecodeResult, ConstPoolResult};
use super::flag::is_static;
use super::frame::{StackMapTable, VerificationType};
use super::handle::{BootstrapArgument, MethodHandle};
use super::opcodes::*;

/// A position in the instruction list, bound with `MethodWriter::visit_label`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(usize);

impl Label {
    pub fn id(self) -> usize {
        self.0
    }
}

/// Operand of an `ldc` instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LdcConstant {
    Int(i32),
    String(String),
    /// Class literal, given as an internal name.
    Type(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SymbolicRef {
    owner: String,
    name: String,
    descriptor: String,
    interface: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CallSite {
    name: String,
    descriptor: String,
    bootstrap: MethodHandle,
    arguments: Vec<BootstrapArgument>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Insn {
    Simple(u8),
    Var(u8, u16),
    Field(u8, SymbolicRef),
    Method { opcode: u8, member: SymbolicRef, argument_slots: u16 },
    InvokeDynamic(Box<CallSite>),
    Ldc(LdcConstant),
    Jump(u8, Label),
    Label(Label),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Frame {
    locals: Vec<VerificationType>,
    stack: Vec<VerificationType>,
}

#[derive(Debug, Clone, Default)]
struct LabelState {
    bound: bool,
    targeted: bool,
    frame: Option<Frame>,
}

#[derive(Debug, Clone)]
struct LocalVariable {
    name: String,
    descriptor: String,
    slot: u16,
    start: Label,
}

#[derive(Debug)]
pub struct MethodWriter {
    owner: String,
    access_flags: u16,
    name: String,
    descriptor: String,
    insns: Vec<Insn>,
    labels: Vec<LabelState>,
    initial_locals: Vec<VerificationType>,
    locals: Vec<VerificationType>,
    stack: Vec<VerificationType>,
    reachable: bool,
    max_stack: u16,
    max_locals: u16,
    local_variables: Vec<LocalVariable>,
    annotations: Vec<(Annotation, bool)>,
}

impl MethodWriter {
    pub fn new(owner: &str, access_flags: u16, name: &str, descriptor: &str) -> BytecodeResult<Self> {
        let parsed = parse_method(descriptor)?;
        let mut locals = Vec::new();
        if !is_static(access_flags) {
            locals.push(if name == CONSTRUCTOR_METHOD_NAME {
                VerificationType::UninitializedThis
            } else {
                VerificationType::Object(owner.to_string())
            });
        }
        for parameter in &parsed.parameters {
            locals.push(parameter.verification_type());
            if parameter.slot_size() == 2 {
                locals.push(VerificationType::Top);
            }
        }
        Ok(Self {
            owner: owner.to_string(),
            access_flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            insns: Vec::new(),
            labels: Vec::new(),
            initial_locals: locals.clone(),
            max_locals: locals.len() as u16,
            locals,
            stack: Vec::new(),
            reachable: true,
            max_stack: 0,
            local_variables: Vec::new(),
            annotations: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Attach an annotation without element values to the method.
    pub fn visit_annotation(&mut self, descriptor: &str, visible: bool) {
        self.annotations.push((Annotation::marker(descriptor), visible));
    }

    pub fn new_label(&mut self) -> Label {
        self.labels.push(LabelState::default());
        Label(self.labels.len() - 1)
    }

    /// Zero-operand instruction.
    pub fn insn(&mut self, opcode: u8) -> BytecodeResult<()> {
        self.check_reachable()?;
        match opcode {
            NOP => {}
            ACONST_NULL => self.push(VerificationType::Null),
            ICONST_M1..=ICONST_5 => self.push(VerificationType::Integer),
            POP => {
                self.pop()?;
            }
            DUP => {
                let value = self.pop()?;
                self.push(value.clone());
                self.push(value);
            }
            IRETURN..=ARETURN | ATHROW => {
                self.pop()?;
                self.end_block();
            }
            RETURN => self.end_block(),
            other => return Err(BytecodeError::UnsupportedOpcode(other)),
        }
        self.insns.push(Insn::Simple(opcode));
        Ok(())
    }

    /// Load or store of a local variable.
    pub fn var_insn(&mut self, opcode: u8, slot: u16) -> BytecodeResult<()> {
        self.check_reachable()?;
        match opcode {
            ILOAD..=ALOAD => {
                let expected = expected_local(opcode - ILOAD);
                let found = self.locals.get(slot as usize).cloned().unwrap_or(VerificationType::Top);
                if !local_matches(opcode - ILOAD, &found) {
                    return Err(BytecodeError::LocalTypeMismatch { slot, expected, found: format!("{:?}", found) });
                }
                self.push(found);
            }
            ISTORE..=ASTORE => {
                let value = self.pop()?;
                if !local_matches(opcode - ISTORE, &value) {
                    return Err(BytecodeError::LocalTypeMismatch {
                        slot,
                        expected: expected_local(opcode - ISTORE),
                        found: format!("{:?}", value),
                    });
                }
                self.set_local(slot, value);
            }
            other => return Err(BytecodeError::UnsupportedOpcode(other)),
        }
        self.insns.push(Insn::Var(opcode, slot));
        Ok(())
    }

    pub fn field_insn(&mut self, opcode: u8, owner: &str, name: &str, descriptor: &str) -> BytecodeResult<()> {
        self.check_reachable()?;
        let ty = parse_field_descriptor(descriptor)
            .map_err(|_| BytecodeError::InvalidDescriptor(descriptor.to_string()))?;
        match opcode {
            GETSTATIC => self.push(ty.verification_type()),
            PUTSTATIC => {
                self.pop()?;
            }
            GETFIELD => {
                self.pop()?;
                self.push(ty.verification_type());
            }
            PUTFIELD => {
                self.pop()?;
                self.pop()?;
            }
            other => return Err(BytecodeError::UnsupportedOpcode(other)),
        }
        self.insns.push(Insn::Field(opcode, symbolic(owner, name, descriptor, false)));
        Ok(())
    }

    /// Method invocation. `interface` selects an `InterfaceMethodref`, which
    /// `invokeinterface` always needs and `invokestatic` needs for static
    /// interface methods.
    pub fn method_insn(
        &mut self,
        opcode: u8,
        owner: &str,
        name: &str,
        descriptor: &str,
        interface: bool,
    ) -> BytecodeResult<()> {
        self.check_reachable()?;
        if !(INVOKEVIRTUAL..=INVOKEINTERFACE).contains(&opcode) {
            return Err(BytecodeError::UnsupportedOpcode(opcode));
        }
        let parsed = parse_method(descriptor)?;
        self.pop_n(parsed.parameters.len())?;
        if opcode != INVOKESTATIC {
            let receiver = self.pop()?;
            if opcode == INVOKESPECIAL && name == CONSTRUCTOR_METHOD_NAME && receiver == VerificationType::UninitializedThis {
                self.initialize_this();
            }
        }
        if let Some(ret) = &parsed.return_type {
            self.push(ret.verification_type());
        }
        self.insns.push(Insn::Method {
            opcode,
            member: symbolic(owner, name, descriptor, interface || opcode == INVOKEINTERFACE),
            argument_slots: parsed.parameter_slots(),
        });
        Ok(())
    }

    pub fn invoke_dynamic_insn(
        &mut self,
        name: &str,
        descriptor: &str,
        bootstrap: MethodHandle,
        arguments: Vec<BootstrapArgument>,
    ) -> BytecodeResult<()> {
        self.check_reachable()?;
        let parsed = parse_method(descriptor)?;
        self.pop_n(parsed.parameters.len())?;
        if let Some(ret) = &parsed.return_type {
            self.push(ret.verification_type());
        }
        self.insns.push(Insn::InvokeDynamic(Box::new(CallSite {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            bootstrap,
            arguments,
        })));
        Ok(())
    }

    pub fn ldc_insn(&mut self, constant: LdcConstant) -> BytecodeResult<()> {
        self.check_reachable()?;
        self.push(match &constant {
            LdcConstant::Int(_) => VerificationType::Integer,
            LdcConstant::String(_) => VerificationType::Object("java/lang/String".to_string()),
            LdcConstant::Type(_) => VerificationType::Object("java/lang/Class".to_string()),
        });
        self.insns.push(Insn::Ldc(constant));
        Ok(())
    }

    pub fn jump_insn(&mut self, opcode: u8, target: Label) -> BytecodeResult<()> {
        self.check_reachable()?;
        match opcode {
            IFEQ..=IFLE | IFNULL | IFNONNULL => {
                self.pop()?;
            }
            IF_ICMPEQ..=IF_ACMPNE => self.pop_n(2)?,
            GOTO => {}
            other => return Err(BytecodeError::UnsupportedOpcode(other)),
        }
        let frame = self.current_frame();
        self.merge(target, frame, true)?;
        self.insns.push(Insn::Jump(opcode, target));
        if opcode == GOTO {
            self.end_block();
        }
        Ok(())
    }

    pub fn visit_label(&mut self, label: Label) -> BytecodeResult<()> {
        let state = self.label_state(label)?;
        if state.bound {
            return Err(BytecodeError::LabelAlreadyBound(label.0));
        }
        state.bound = true;
        if self.reachable {
            let frame = self.current_frame();
            self.merge(label, frame, false)?;
        } else if let Some(frame) = self.labels[label.0].frame.clone() {
            self.locals = frame.locals;
            self.stack = frame.stack;
            self.reachable = true;
        }
        self.insns.push(Insn::Label(label));
        Ok(())
    }

    /// Declare a named local variable live from `start` to the end of the method.
    pub fn local_variable(&mut self, name: &str, descriptor: &str, slot: u16, start: Label) -> BytecodeResult<()> {
        parse_field_descriptor(descriptor).map_err(|_| BytecodeError::InvalidDescriptor(descriptor.to_string()))?;
        self.label_state(start)?;
        self.local_variables.push(LocalVariable {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            slot,
            start,
        });
        Ok(())
    }

    /// Close the body. Every path must end in a return, throw or jump.
    pub fn finish(self) -> BytecodeResult<GeneratedMethod> {
        if self.reachable {
            return Err(BytecodeError::FallsOffEnd);
        }
        for (id, state) in self.labels.iter().enumerate() {
            if state.targeted && !state.bound {
                return Err(BytecodeError::UnboundLabel(id));
            }
        }
        for variable in &self.local_variables {
            if !self.labels[variable.start.0].bound {
                return Err(BytecodeError::UnboundLabel(variable.start.0));
            }
        }
        let frames = self
            .labels
            .iter()
            .enumerate()
            .filter(|(_, state)| state.targeted)
            .filter_map(|(id, state)| state.frame.clone().map(|frame| (Label(id), frame)))
            .collect();
        log::trace!(
            "finished {}.{}{} ({} instructions, stack {}, locals {})",
            self.owner,
            self.name,
            self.descriptor,
            self.insns.len(),
            self.max_stack,
            self.max_locals
        );
        Ok(GeneratedMethod {
            access_flags: self.access_flags,
            name: self.name,
            descriptor: self.descriptor,
            insns: self.insns,
            label_count: self.labels.len(),
            frames,
            initial_locals: self.initial_locals,
            max_stack: self.max_stack,
            max_locals: self.max_locals,
            local_variables: self.local_variables,
            annotations: self.annotations,
        })
    }

    fn label_state(&mut self, label: Label) -> BytecodeResult<&mut LabelState> {
        self.labels.get_mut(label.0).ok_or(BytecodeError::UnboundLabel(label.0))
    }

    fn check_reachable(&self) -> BytecodeResult<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(BytecodeError::UnreachableCode { index: self.insns.len() })
        }
    }

    fn end_block(&mut self) {
        self.reachable = false;
        self.stack.clear();
    }

    fn push(&mut self, value: VerificationType) {
        self.stack.push(value);
        let depth: u16 = self.stack.iter().map(|v| if v.is_wide() { 2 } else { 1 }).sum();
        self.max_stack = self.max_stack.max(depth);
    }

    fn pop(&mut self) -> BytecodeResult<VerificationType> {
        self.stack.pop().ok_or(BytecodeError::StackUnderflow { index: self.insns.len() })
    }

    fn pop_n(&mut self, count: usize) -> BytecodeResult<()> {
        for _ in 0..count {
            self.pop()?;
        }
        Ok(())
    }

    fn set_local(&mut self, slot: u16, value: VerificationType) {
        let slot = slot as usize;
        let size = if value.is_wide() { 2 } else { 1 };
        if self.locals.len() < slot + size {
            self.locals.resize(slot + size, VerificationType::Top);
        }
        if slot > 0 && self.locals[slot - 1].is_wide() {
            self.locals[slot - 1] = VerificationType::Top;
        }
        self.locals[slot] = value;
        if size == 2 {
            self.locals[slot + 1] = VerificationType::Top;
        }
        self.max_locals = self.max_locals.max((slot + size) as u16);
    }

    fn initialize_this(&mut self) {
        let initialized = VerificationType::Object(self.owner.clone());
        for value in self.locals.iter_mut().chain(self.stack.iter_mut()) {
            if *value == VerificationType::UninitializedThis {
                *value = initialized.clone();
            }
        }
    }

    fn current_frame(&self) -> Frame {
        let mut locals = self.locals.clone();
        while locals.last() == Some(&VerificationType::Top) {
            locals.pop();
        }
        Frame { locals, stack: self.stack.clone() }
    }

    fn merge(&mut self, label: Label, frame: Frame, is_jump: bool) -> BytecodeResult<()> {
        let state = self.label_state(label)?;
        state.targeted |= is_jump;
        match &state.frame {
            Some(existing) if *existing != frame => Err(BytecodeError::FrameMismatch { label: label.0 }),
            Some(_) => Ok(()),
            None => {
                state.frame = Some(frame);
                Ok(())
            }
        }
    }
}

/// A finished method body, ready to be laid out against a class's pool.
#[derive(Debug, Clone)]
pub struct GeneratedMethod {
    access_flags: u16,
    name: String,
    descriptor: String,
    insns: Vec<Insn>,
    label_count: usize,
    frames: Vec<(Label, Frame)>,
    initial_locals: Vec<VerificationType>,
    max_stack: u16,
    max_locals: u16,
    local_variables: Vec<LocalVariable>,
    annotations: Vec<(Annotation, bool)>,
}

impl GeneratedMethod {
    pub fn access_flags(&self) -> u16 {
        self.access_flags
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn max_stack(&self) -> u16 {
        self.max_stack
    }

    pub fn max_locals(&self) -> u16 {
        self.max_locals
    }

    /// Encode the body into method attributes: `Code` first, then any
    /// annotation attributes. Call sites are registered in `bootstrap_methods`.
    pub fn assemble(
        &self,
        pool: &mut ConstantPool,
        bootstrap_methods: &mut BootstrapMethods,
    ) -> BytecodeResult<Vec<AttributeInfo>> {
        let operands = self.resolve_constants(pool, bootstrap_methods)?;

        let mut offsets = Vec::with_capacity(self.insns.len());
        let mut label_offsets = vec![0usize; self.label_count];
        let mut length = 0usize;
        for (insn, operand) in self.insns.iter().zip(&operands) {
            offsets.push(length);
            if let Insn::Label(label) = insn {
                label_offsets[label.0] = length;
            }
            length += encoded_size(insn, *operand);
        }
        if length > MAX_CODE_LENGTH {
            return Err(BytecodeError::CodeTooLarge { length });
        }

        let mut code = Vec::with_capacity(length);
        for ((insn, operand), offset) in self.insns.iter().zip(&operands).zip(&offsets) {
            encode(insn, *operand, *offset, &label_offsets, &mut code)?;
        }

        let mut states: Vec<(u16, Vec<VerificationType>, Vec<VerificationType>)> = Vec::new();
        let mut targets: Vec<(usize, &Frame)> =
            self.frames.iter().map(|(label, frame)| (label_offsets[label.0], frame)).collect();
        targets.sort_by_key(|(offset, _)| *offset);
        targets.dedup_by_key(|(offset, _)| *offset);
        for (offset, frame) in targets {
            if offset >= code.len() {
                return Err(BytecodeError::FallsOffEnd);
            }
            states.push((offset as u16, frame.locals.clone(), frame.stack.clone()));
        }

        let mut attribute = CodeAttribute::new(self.max_stack, self.max_locals, code);
        if !states.is_empty() {
            let table = StackMapTable::from_states(&self.initial_locals, &states);
            let info = table.to_bytes(pool)?;
            attribute.attributes.push(AttributeInfo::named(pool, attribute_names::STACK_MAP_TABLE, info)?);
        }
        if !self.local_variables.is_empty() {
            let table = self.local_variable_table(pool, &label_offsets, attribute.code.len())?;
            attribute
                .attributes
                .push(AttributeInfo::named(pool, attribute_names::LOCAL_VARIABLE_TABLE, table.to_bytes())?);
        }

        let mut attributes = vec![AttributeInfo::named(pool, attribute_names::CODE, attribute.to_bytes())?];
        for visible in [true, false] {
            let annotations: Vec<Annotation> = self
                .annotations
                .iter()
                .filter(|(_, v)| *v == visible)
                .map(|(a, _)| a.clone())
                .collect();
            if !annotations.is_empty() {
                let info = annotations_to_bytes(&annotations, pool)?;
                attributes.push(AttributeInfo::named(pool, attribute_names::annotations(visible), info)?);
            }
        }
        Ok(attributes)
    }

    fn resolve_constants(
        &self,
        pool: &mut ConstantPool,
        bootstrap_methods: &mut BootstrapMethods,
    ) -> ConstPoolResult<Vec<u16>> {
        let mut operands = Vec::with_capacity(self.insns.len());
        for insn in &self.insns {
            let index = match insn {
                Insn::Field(_, r) => pool.try_add_field_ref(&r.owner, &r.name, &r.descriptor)?,
                Insn::Method { member: r, .. } => pool.try_add_method_ref(&r.owner, &r.name, &r.descriptor, r.interface)?,
                Insn::InvokeDynamic(site) => {
                    let method_ref = site.bootstrap.to_constant(pool)?;
                    let arguments = site
                        .arguments
                        .iter()
                        .map(|argument| argument.to_constant(pool))
                        .collect::<ConstPoolResult<Vec<_>>>()?;
                    let bootstrap = bootstrap_methods.add(method_ref, arguments);
                    pool.try_add_invoke_dynamic(bootstrap, &site.name, &site.descriptor)?
                }
                Insn::Ldc(LdcConstant::Int(value)) => pool.try_add_integer(*value)?,
                Insn::Ldc(LdcConstant::String(value)) => pool.try_add_string(value)?,
                Insn::Ldc(LdcConstant::Type(name)) => pool.try_add_class(name)?,
                _ => 0,
            };
            operands.push(index);
        }
        Ok(operands)
    }

    fn local_variable_table(
        &self,
        pool: &mut ConstantPool,
        label_offsets: &[usize],
        code_length: usize,
    ) -> ConstPoolResult<LocalVariableTableAttribute> {
        let mut table = LocalVariableTableAttribute::new();
        for variable in &self.local_variables {
            let start_pc = label_offsets[variable.start.0];
            table.local_variable_table.push(LocalVariableEntry {
                start_pc: start_pc as u16,
                length: (code_length - start_pc) as u16,
                name_index: pool.try_add_utf8(&variable.name)?,
                descriptor_index: pool.try_add_utf8(&variable.descriptor)?,
                index: variable.slot,
            });
        }
        Ok(table)
    }
}

fn encoded_size(insn: &Insn, operand: u16) -> usize {
    match insn {
        Insn::Simple(_) => 1,
        Insn::Var(_, slot) if *slot <= 3 => 1,
        Insn::Var(_, slot) if *slot <= 0xff => 2,
        Insn::Var(..) => 4,
        Insn::Field(..) => 3,
        Insn::Method { opcode: INVOKEINTERFACE, .. } => 5,
        Insn::Method { .. } => 3,
        Insn::InvokeDynamic(_) => 5,
        Insn::Ldc(_) if operand <= 0xff => 2,
        Insn::Ldc(_) => 3,
        Insn::Jump(..) => 3,
        Insn::Label(_) => 0,
    }
}

fn encode(insn: &Insn, operand: u16, offset: usize, label_offsets: &[usize], code: &mut Vec<u8>) -> BytecodeResult<()> {
    match insn {
        Insn::Simple(opcode) => code.push(*opcode),
        Insn::Var(opcode, slot) => {
            if *slot <= 3 {
                let shorthand = if *opcode >= ISTORE {
                    ISTORE_0 + (opcode - ISTORE) * 4
                } else {
                    ILOAD_0 + (opcode - ILOAD) * 4
                };
                code.push(shorthand + *slot as u8);
            } else if *slot <= 0xff {
                code.push(*opcode);
                code.push(*slot as u8);
            } else {
                code.push(WIDE);
                code.push(*opcode);
                code.extend_from_slice(&slot.to_be_bytes());
            }
        }
        Insn::Field(opcode, _) => {
            code.push(*opcode);
            code.extend_from_slice(&operand.to_be_bytes());
        }
        Insn::Method { opcode, argument_slots, .. } => {
            code.push(*opcode);
            code.extend_from_slice(&operand.to_be_bytes());
            if *opcode == INVOKEINTERFACE {
                code.push((argument_slots + 1) as u8);
                code.push(0);
            }
        }
        Insn::InvokeDynamic(_) => {
            code.push(INVOKEDYNAMIC);
            code.extend_from_slice(&operand.to_be_bytes());
            code.extend_from_slice(&[0, 0]);
        }
        Insn::Ldc(_) => {
            if operand <= 0xff {
                code.push(LDC);
                code.push(operand as u8);
            } else {
                code.push(LDC_W);
                code.extend_from_slice(&operand.to_be_bytes());
            }
        }
        Insn::Jump(opcode, target) => {
            let delta = label_offsets[target.0] as i64 - offset as i64;
            let delta = i16::try_from(delta).map_err(|_| BytecodeError::BranchTooFar { offset: delta })?;
            code.push(*opcode);
            code.extend_from_slice(&delta.to_be_bytes());
        }
        Insn::Label(_) => {}
    }
    Ok(())
}

fn symbolic(owner: &str, name: &str, descriptor: &str, interface: bool) -> SymbolicRef {
    SymbolicRef {
        owner: owner.to_string(),
        name: name.to_string(),
        descriptor: descriptor.to_string(),
        interface,
    }
}

fn parse_method(descriptor: &str) -> BytecodeResult<MethodDescriptor> {
    MethodDescriptor::parse(descriptor).map_err(|_| BytecodeError::InvalidDescriptor(descriptor.to_string()))
}

/// `kind` is the offset of a typed load/store from its `int` variant.
fn expected_local(kind: u8) -> &'static str {
    match kind {
        0 => "int",
        1 => "long",
        2 => "float",
        3 => "double",
        _ => "reference",
    }
}

fn local_matches(kind: u8, value: &VerificationType) -> bool {
    match kind {
        0 => *value == VerificationType::Integer,
        1 => *value == VerificationType::Long,
        2 => *value == VerificationType::Float,
        3 => *value == VerificationType::Double,
        _ => value.is_reference(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::attribute::CodeAttribute;
    use crate::classfile::flag::access_flags::*;

    fn assemble(writer: MethodWriter) -> (ConstantPool, CodeAttribute, Vec<AttributeInfo>) {
        let method = writer.finish().unwrap();
        let mut pool = ConstantPool::new();
        let mut bootstrap = BootstrapMethods::new();
        let attributes = method.assemble(&mut pool, &mut bootstrap).unwrap();
        let code = CodeAttribute::parse(&attributes[0].info).unwrap();
        (pool, code, attributes)
    }

    #[test]
    fn constant_true_body() {
        let mut writer = MethodWriter::new("a/Event", ACC_PUBLIC, "isCancelable", "()Z").unwrap();
        writer.visit_annotation("Ljava/lang/Override;", true);
        writer.insn(ICONST_1).unwrap();
        writer.insn(IRETURN).unwrap();
        let (pool, code, attributes) = assemble(writer);
        assert_eq!(code.code, vec![ICONST_1, IRETURN]);
        assert_eq!((code.max_stack, code.max_locals), (1, 1));
        assert!(code.attributes.is_empty());
        assert_eq!(attributes[1].name(&pool).unwrap(), "RuntimeVisibleAnnotations");
    }

    #[test]
    fn diamond_records_frames_at_targets() {
        let mut writer = MethodWriter::new("a/B", ACC_PUBLIC | ACC_STATIC, "f", "(I)I").unwrap();
        let other = writer.new_label();
        let end = writer.new_label();
        writer.var_insn(ILOAD, 0).unwrap();
        writer.jump_insn(IFEQ, other).unwrap();
        writer.insn(ICONST_1).unwrap();
        writer.jump_insn(GOTO, end).unwrap();
        writer.visit_label(other).unwrap();
        writer.insn(ICONST_0).unwrap();
        writer.visit_label(end).unwrap();
        writer.insn(IRETURN).unwrap();
        let (pool, code, _) = assemble(writer);
        assert_eq!(code.code, vec![0x1a, IFEQ, 0, 7, ICONST_1, GOTO, 0, 4, ICONST_0, IRETURN]);
        assert_eq!(code.attributes.len(), 1);
        assert_eq!(code.attributes[0].name(&pool).unwrap(), "StackMapTable");
        // two frames: same at 8, same_locals_1_stack_item at 9 (delta 0)
        assert_eq!(code.attributes[0].info, vec![0, 2, 8, 64, 1]);
    }

    #[test]
    fn rejects_malformed_bodies() {
        let mut writer = MethodWriter::new("a/B", ACC_STATIC, "f", "()V").unwrap();
        assert_eq!(writer.insn(POP), Err(BytecodeError::StackUnderflow { index: 0 }));
        writer.insn(RETURN).unwrap();
        assert_eq!(writer.insn(RETURN), Err(BytecodeError::UnreachableCode { index: 1 }));

        let mut writer = MethodWriter::new("a/B", ACC_STATIC, "f", "()V").unwrap();
        let label = writer.new_label();
        writer.insn(ICONST_0).unwrap();
        writer.jump_insn(IFEQ, label).unwrap();
        writer.insn(RETURN).unwrap();
        assert_eq!(writer.finish().unwrap_err(), BytecodeError::UnboundLabel(0));

        let mut writer = MethodWriter::new("a/B", ACC_STATIC, "f", "()V").unwrap();
        let label = writer.new_label();
        writer.insn(ICONST_0).unwrap();
        writer.jump_insn(GOTO, label).unwrap();
        writer.visit_label(label).unwrap();
        assert_eq!(writer.insn(RETURN).err(), None);
        assert!(matches!(
            MethodWriter::new("a/B", ACC_STATIC, "f", "()V").unwrap().finish(),
            Err(BytecodeError::FallsOffEnd)
        ));
    }

    #[test]
    fn inconsistent_merge_is_reported() {
        let mut writer = MethodWriter::new("a/B", ACC_STATIC, "f", "()V").unwrap();
        let label = writer.new_label();
        writer.insn(ICONST_0).unwrap();
        writer.insn(ICONST_0).unwrap();
        writer.jump_insn(IFEQ, label).unwrap();
        writer.insn(POP).unwrap();
        assert_eq!(writer.visit_label(label), Err(BytecodeError::FrameMismatch { label: 0 }));
    }

    #[test]
    fn loads_check_local_types() {
        let mut writer = MethodWriter::new("a/B", ACC_STATIC, "f", "()V").unwrap();
        assert!(matches!(writer.var_insn(ALOAD, 1), Err(BytecodeError::LocalTypeMismatch { slot: 1, .. })));
        writer.insn(ICONST_1).unwrap();
        writer.var_insn(ISTORE, 300).unwrap();
        writer.var_insn(ILOAD, 300).unwrap();
        writer.insn(POP).unwrap();
        writer.insn(RETURN).unwrap();
        let (_, code, _) = assemble(writer);
        assert_eq!(code.code[1..5], [WIDE, ISTORE, 0x01, 0x2c]);
        assert_eq!(code.max_locals, 301);
    }
}
