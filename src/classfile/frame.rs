//! StackMapTable frames and their compact encoding

use super::constpool::ConstantPool;
use super::error::ConstPoolResult;

/// VerificationTypeInfo as defined in JVMS 4.7.4
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationType {
    Top,
    Integer,
    Float,
    Double,
    Long,
    Null,
    UninitializedThis,
    /// Internal class name or array descriptor.
    Object(String),
    /// Offset of the `new` instruction.
    Uninitialized(u16),
}

impl VerificationType {
    pub fn is_wide(&self) -> bool {
        matches!(self, VerificationType::Long | VerificationType::Double)
    }

    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            VerificationType::Null
                | VerificationType::UninitializedThis
                | VerificationType::Object(_)
                | VerificationType::Uninitialized(_)
        )
    }

    pub fn to_bytes(&self, pool: &mut ConstantPool) -> ConstPoolResult<Vec<u8>> {
        let mut bytes = Vec::with_capacity(3);
        match self {
            VerificationType::Top => bytes.push(0),
            VerificationType::Integer => bytes.push(1),
            VerificationType::Float => bytes.push(2),
            VerificationType::Double => bytes.push(3),
            VerificationType::Long => bytes.push(4),
            VerificationType::Null => bytes.push(5),
            VerificationType::UninitializedThis => bytes.push(6),
            VerificationType::Object(name) => {
                bytes.push(7);
                bytes.extend_from_slice(&pool.try_add_class(name)?.to_be_bytes());
            }
            VerificationType::Uninitialized(offset) => {
                bytes.push(8);
                bytes.extend_from_slice(&offset.to_be_bytes());
            }
        }
        Ok(bytes)
    }
}

/// StackMapFrame variants as defined in JVMS 4.7.4. The extended forms are
/// picked at encoding time from `offset_delta`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackMapFrame {
    Same { offset_delta: u16 },
    SameLocals1StackItem { offset_delta: u16, stack: VerificationType },
    /// Drops the last `k` locals, `k` in 1..=3.
    Chop { k: u8, offset_delta: u16 },
    /// Adds 1..=3 locals.
    Append { offset_delta: u16, locals: Vec<VerificationType> },
    Full { offset_delta: u16, locals: Vec<VerificationType>, stack: Vec<VerificationType> },
}

impl StackMapFrame {
    /// Choose the most compact frame describing `locals`/`stack` relative to
    /// the previous frame's locals. All lists are in frame form: one entry
    /// per value, trailing `Top`s removed.
    pub fn between(
        previous: &[VerificationType],
        locals: &[VerificationType],
        stack: &[VerificationType],
        offset_delta: u16,
    ) -> Self {
        let same_locals = previous == locals;
        match stack.len() {
            0 if same_locals => StackMapFrame::Same { offset_delta },
            1 if same_locals => StackMapFrame::SameLocals1StackItem { offset_delta, stack: stack[0].clone() },
            0 if locals.len() > previous.len()
                && locals.len() - previous.len() <= 3
                && locals.starts_with(previous) =>
            {
                StackMapFrame::Append { offset_delta, locals: locals[previous.len()..].to_vec() }
            }
            0 if previous.len() > locals.len()
                && previous.len() - locals.len() <= 3
                && previous.starts_with(locals) =>
            {
                StackMapFrame::Chop { k: (previous.len() - locals.len()) as u8, offset_delta }
            }
            _ => StackMapFrame::Full { offset_delta, locals: locals.to_vec(), stack: stack.to_vec() },
        }
    }

    pub fn offset_delta(&self) -> u16 {
        match self {
            StackMapFrame::Same { offset_delta }
            | StackMapFrame::SameLocals1StackItem { offset_delta, .. }
            | StackMapFrame::Chop { offset_delta, .. }
            | StackMapFrame::Append { offset_delta, .. }
            | StackMapFrame::Full { offset_delta, .. } => *offset_delta,
        }
    }

    pub fn to_bytes(&self, pool: &mut ConstantPool) -> ConstPoolResult<Vec<u8>> {
        let mut bytes = Vec::new();
        match self {
            StackMapFrame::Same { offset_delta } => {
                if *offset_delta <= 63 {
                    bytes.push(*offset_delta as u8);
                } else {
                    bytes.push(251); // same_frame_extended
                    bytes.extend_from_slice(&offset_delta.to_be_bytes());
                }
            }
            StackMapFrame::SameLocals1StackItem { offset_delta, stack } => {
                if *offset_delta <= 63 {
                    bytes.push(64 + *offset_delta as u8);
                } else {
                    bytes.push(247); // same_locals_1_stack_item_frame_extended
                    bytes.extend_from_slice(&offset_delta.to_be_bytes());
                }
                bytes.extend_from_slice(&stack.to_bytes(pool)?);
            }
            StackMapFrame::Chop { k, offset_delta } => {
                bytes.push(251 - *k);
                bytes.extend_from_slice(&offset_delta.to_be_bytes());
            }
            StackMapFrame::Append { offset_delta, locals } => {
                bytes.push(251 + locals.len() as u8);
                bytes.extend_from_slice(&offset_delta.to_be_bytes());
                for local in locals {
                    bytes.extend_from_slice(&local.to_bytes(pool)?);
                }
            }
            StackMapFrame::Full { offset_delta, locals, stack } => {
                bytes.push(255);
                bytes.extend_from_slice(&offset_delta.to_be_bytes());
                bytes.extend_from_slice(&(locals.len() as u16).to_be_bytes());
                for local in locals {
                    bytes.extend_from_slice(&local.to_bytes(pool)?);
                }
                bytes.extend_from_slice(&(stack.len() as u16).to_be_bytes());
                for item in stack {
                    bytes.extend_from_slice(&item.to_bytes(pool)?);
                }
            }
        }
        Ok(bytes)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StackMapTable {
    pub frames: Vec<StackMapFrame>,
}

impl StackMapTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Build the table from frame states at absolute bytecode offsets, given
    /// in ascending order. Locals are per slot, as tracked while emitting.
    pub fn from_states(initial_locals: &[VerificationType], states: &[(u16, Vec<VerificationType>, Vec<VerificationType>)]) -> Self {
        let mut previous = compress_locals(initial_locals);
        let mut previous_offset: Option<u16> = None;
        let mut frames = Vec::with_capacity(states.len());
        for (offset, locals, stack) in states {
            let offset_delta = match previous_offset {
                None => *offset,
                Some(prev) => offset - prev - 1,
            };
            let locals = compress_locals(locals);
            frames.push(StackMapFrame::between(&previous, &locals, stack, offset_delta));
            previous = locals;
            previous_offset = Some(*offset);
        }
        Self { frames }
    }

    pub fn to_bytes(&self, pool: &mut ConstantPool) -> ConstPoolResult<Vec<u8>> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(self.frames.len() as u16).to_be_bytes());
        for frame in &self.frames {
            bytes.extend_from_slice(&frame.to_bytes(pool)?);
        }
        Ok(bytes)
    }
}

/// Convert per-slot locals to frame form: the `Top` following a long or
/// double is implied, trailing `Top`s are dropped.
pub fn compress_locals(slots: &[VerificationType]) -> Vec<VerificationType> {
    let mut locals = Vec::with_capacity(slots.len());
    let mut i = 0;
    while i < slots.len() {
        let slot = &slots[i];
        locals.push(slot.clone());
        i += if slot.is_wide() { 2 } else { 1 };
    }
    while locals.last() == Some(&VerificationType::Top) {
        locals.pop();
    }
    locals
}
