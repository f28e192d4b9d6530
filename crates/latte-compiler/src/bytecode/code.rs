//! Method bodies: the instruction stream and the `Code` attribute.

use super::Opcode;

/// Instruction bytes of one method.
#[derive(Debug, Clone, Default)]
pub struct CodeBuffer {
    code: Vec<u8>,
}

impl CodeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_op(&mut self, op: Opcode) {
        self.code.push(op.into());
    }

    pub fn write_u8(&mut self, byte: u8) {
        self.code.push(byte);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.code.extend(value.to_be_bytes());
    }

    pub fn write_i16(&mut self, value: i16) {
        self.code.extend(value.to_be_bytes());
    }

    /// Overwrite a 16-bit operand written earlier.
    pub fn patch_i16(&mut self, at: usize, value: i16) {
        let [hi, lo] = value.to_be_bytes();
        self.code[at] = hi;
        self.code[at + 1] = lo;
    }

    /// Current offset, where the next instruction goes.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.code
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.code
    }
}

/// One row of a `Code` attribute's exception table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionEntry {
    pub start_pc: u16,
    /// Exclusive.
    pub end_pc: u16,
    pub handler_pc: u16,
    /// Class pool index of the caught type, `0` to catch everything.
    pub catch_type: u16,
}

impl ExceptionEntry {
    /// Whether `pc` lies in the protected range.
    pub fn covers(&self, pc: u16) -> bool {
        self.start_pc <= pc && pc < self.end_pc
    }
}

/// A finished method body.
#[derive(Debug, Clone, Default)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionEntry>,
}

impl CodeAttribute {
    /// Attribute payload, without the name index and length header.
    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend(self.max_stack.to_be_bytes());
        out.extend(self.max_locals.to_be_bytes());
        out.extend((self.code.len() as u32).to_be_bytes());
        out.extend(&self.code);
        out.extend((self.exception_table.len() as u16).to_be_bytes());
        for entry in &self.exception_table {
            out.extend(entry.start_pc.to_be_bytes());
            out.extend(entry.end_pc.to_be_bytes());
            out.extend(entry.handler_pc.to_be_bytes());
            out.extend(entry.catch_type.to_be_bytes());
        }
        // no nested attributes
        out.extend(0u16.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_patches() {
        let mut code = CodeBuffer::new();
        code.write_op(Opcode::Goto);
        code.write_i16(0);
        code.write_op(Opcode::Return);
        code.patch_i16(1, 3);
        assert_eq!(code.bytes(), &[0xa7, 0, 3, 0xb1]);
        assert_eq!(code.len(), 4);
    }

    #[test]
    fn exception_ranges_are_half_open() {
        let entry = ExceptionEntry {
            start_pc: 2,
            end_pc: 6,
            handler_pc: 10,
            catch_type: 0,
        };
        assert!(entry.covers(2));
        assert!(entry.covers(5));
        assert!(!entry.covers(6));
    }

    #[test]
    fn attribute_layout() {
        let attr = CodeAttribute {
            max_stack: 1,
            max_locals: 1,
            code: vec![0x2a, 0xb0],
            exception_table: vec![],
        };
        let mut out = Vec::new();
        attr.write(&mut out);
        assert_eq!(out, vec![0, 1, 0, 1, 0, 0, 0, 2, 0x2a, 0xb0, 0, 0, 0, 0]);
    }
}
