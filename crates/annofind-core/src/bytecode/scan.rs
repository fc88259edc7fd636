//! Sequential scan turning decoder events into offset records.

use tracing::trace;

use super::opcodes;
use super::{ClassEvent, IndexError, IndexResult, InsnCategory, MethodKey};

/// One fact about a method's bytecode, with its offset already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanRecord {
    /// A method body was entered. Emitted even for methods with nothing to index.
    Method { method: MethodKey },
    /// An indexed instruction.
    Instruction {
        method: MethodKey,
        category: InsnCategory,
        offset: u32,
        opcode: u8,
    },
    /// A local variable table entry.
    LocalVariable {
        method: MethodKey,
        slot: u16,
        start: u32,
        name: String,
    },
}

impl ScanRecord {
    pub fn method(&self) -> &MethodKey {
        match self {
            ScanRecord::Method { method }
            | ScanRecord::Instruction { method, .. }
            | ScanRecord::LocalVariable { method, .. } => method,
        }
    }
}

/// Iterator over the [`ScanRecord`]s of a class's event stream.
///
/// Tracks the current method and the offset of the most recently visited
/// label. Instructions are attributed to that label offset; `CHECKCAST` and
/// `INSTANCEOF` are attributed to the byte after it, where their type operand
/// starts. The label offset resets to 0 when a new method begins.
///
/// A malformed event yields one `Err`; scanning may continue after it, but
/// [`MethodOffsetIndex::build`](super::MethodOffsetIndex::build) stops at the
/// first error.
#[derive(Debug)]
pub struct OffsetScan<I> {
    events: I,
    method: Option<MethodKey>,
    last_offset: u32,
}

impl<I> OffsetScan<I>
where
    I: Iterator<Item = ClassEvent>,
{
    pub fn new(events: impl IntoIterator<IntoIter = I>) -> Self {
        OffsetScan {
            events: events.into_iter(),
            method: None,
            last_offset: 0,
        }
    }

    fn current(&self, event: &ClassEvent) -> IndexResult<&MethodKey> {
        self.method.as_ref().ok_or(IndexError::EventOutsideMethod {
            event: event.name(),
        })
    }

    fn instruction(
        &self,
        event: &ClassEvent,
        category: InsnCategory,
        opcode: u8,
        past_opcode: bool,
    ) -> IndexResult<ScanRecord> {
        let method = self.current(event)?.clone();
        let offset = if past_opcode {
            match self.last_offset.checked_add(1) {
                Some(offset) => offset,
                None => {
                    return Err(IndexError::OffsetOverflow {
                        offset: self.last_offset,
                        method,
                    })
                }
            }
        } else {
            self.last_offset
        };
        trace!(%method, offset, opcode = opcodes::mnemonic(opcode), "indexed instruction");
        Ok(ScanRecord::Instruction {
            method,
            category,
            offset,
            opcode,
        })
    }

    fn unexpected(&self, event: &ClassEvent, opcode: u8) -> IndexResult<ScanRecord> {
        let method = self.current(event)?.clone();
        Err(IndexError::UnexpectedOpcode {
            event: event.name(),
            opcode,
            method,
        })
    }

    /// Process one event. `Ok(None)` means the event produces no record.
    fn step(&mut self, event: ClassEvent) -> IndexResult<Option<ScanRecord>> {
        let record = match &event {
            ClassEvent::Method { name, descriptor } => {
                let method = MethodKey::from_descriptor(name, descriptor)?;
                self.method = Some(method.clone());
                self.last_offset = 0;
                ScanRecord::Method { method }
            }
            ClassEvent::Label { offset } => {
                self.current(&event)?;
                self.last_offset = *offset;
                return Ok(None);
            }
            ClassEvent::TypeInsn { opcode, .. } => match *opcode {
                opcodes::CHECKCAST => self.instruction(&event, InsnCategory::Cast, *opcode, true)?,
                opcodes::INSTANCEOF => {
                    self.instruction(&event, InsnCategory::InstanceOf, *opcode, true)?
                }
                opcodes::NEW | opcodes::ANEWARRAY => {
                    self.instruction(&event, InsnCategory::New, *opcode, false)?
                }
                other => return self.unexpected(&event, other).map(Some),
            },
            ClassEvent::IntInsn { opcode, .. } => {
                if *opcode != opcodes::NEWARRAY {
                    self.current(&event)?;
                    return Ok(None);
                }
                self.instruction(&event, InsnCategory::New, *opcode, false)?
            }
            ClassEvent::MultiANewArray { .. } => self.instruction(
                &event,
                InsnCategory::New,
                opcodes::MULTIANEWARRAY,
                false,
            )?,
            ClassEvent::MethodInsn { opcode, .. } => match *opcode {
                opcodes::INVOKEINTERFACE | opcodes::INVOKESTATIC | opcodes::INVOKEVIRTUAL => {
                    self.instruction(&event, InsnCategory::MethodCall, *opcode, false)?
                }
                opcodes::INVOKESPECIAL => {
                    self.current(&event)?;
                    return Ok(None);
                }
                other => return self.unexpected(&event, other).map(Some),
            },
            ClassEvent::InvokeDynamic { .. } => self.instruction(
                &event,
                InsnCategory::Lambda,
                opcodes::INVOKEDYNAMIC,
                false,
            )?,
            ClassEvent::LocalVariable {
                name, slot, start, ..
            } => ScanRecord::LocalVariable {
                method: self.current(&event)?.clone(),
                slot: *slot,
                start: *start,
                name: name.clone(),
            },
            ClassEvent::Insn { .. } => {
                self.current(&event)?;
                return Ok(None);
            }
        };
        Ok(Some(record))
    }
}

impl<I> Iterator for OffsetScan<I>
where
    I: Iterator<Item = ClassEvent>,
{
    type Item = IndexResult<ScanRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let event = self.events.next()?;
            match self.step(event) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => {}
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(name: &str, descriptor: &str) -> ClassEvent {
        ClassEvent::Method {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        }
    }

    fn label(offset: u32) -> ClassEvent {
        ClassEvent::Label { offset }
    }

    fn type_insn(opcode: u8) -> ClassEvent {
        ClassEvent::TypeInsn {
            opcode,
            type_name: "java/lang/Object".to_string(),
        }
    }

    fn call(opcode: u8) -> ClassEvent {
        ClassEvent::MethodInsn {
            opcode,
            owner: "java/lang/Object".to_string(),
            name: "hashCode".to_string(),
            descriptor: "()I".to_string(),
        }
    }

    fn instructions(events: Vec<ClassEvent>) -> Vec<(InsnCategory, u32)> {
        OffsetScan::new(events)
            .map(|r| r.unwrap())
            .filter_map(|record| match record {
                ScanRecord::Instruction {
                    category, offset, ..
                } => Some((category, offset)),
                _ => None,
            })
            .collect()
    }

    mod classification {
        use super::*;

        #[test]
        fn type_checks_point_past_the_opcode() {
            let found = instructions(vec![
                method("m", "()V"),
                label(3),
                type_insn(opcodes::CHECKCAST),
                label(10),
                type_insn(opcodes::INSTANCEOF),
            ]);
            assert_eq!(
                found,
                vec![(InsnCategory::Cast, 4), (InsnCategory::InstanceOf, 11)]
            );
        }

        #[test]
        fn allocations_point_at_the_label() {
            let found = instructions(vec![
                method("m", "()V"),
                label(2),
                type_insn(opcodes::NEW),
                label(8),
                type_insn(opcodes::ANEWARRAY),
                label(12),
                ClassEvent::IntInsn {
                    opcode: opcodes::NEWARRAY,
                    operand: 10,
                },
                label(20),
                ClassEvent::MultiANewArray {
                    descriptor: "[[I".to_string(),
                    dimensions: 2,
                },
            ]);
            assert_eq!(
                found,
                vec![
                    (InsnCategory::New, 2),
                    (InsnCategory::New, 8),
                    (InsnCategory::New, 12),
                    (InsnCategory::New, 20),
                ]
            );
        }

        #[test]
        fn push_int_is_not_indexed() {
            let found = instructions(vec![
                method("m", "()V"),
                ClassEvent::IntInsn {
                    opcode: 0x10,
                    operand: 5,
                },
            ]);
            assert!(found.is_empty());
        }

        #[test]
        fn special_calls_are_skipped() {
            let found = instructions(vec![
                method("m", "()V"),
                label(1),
                call(opcodes::INVOKESPECIAL),
                label(5),
                call(opcodes::INVOKEVIRTUAL),
                call(opcodes::INVOKESTATIC),
                label(9),
                call(opcodes::INVOKEINTERFACE),
                ClassEvent::InvokeDynamic {
                    name: "run".to_string(),
                    descriptor: "()Ljava/lang/Runnable;".to_string(),
                },
            ]);
            assert_eq!(
                found,
                vec![
                    (InsnCategory::MethodCall, 5),
                    (InsnCategory::MethodCall, 5),
                    (InsnCategory::MethodCall, 9),
                    (InsnCategory::Lambda, 9),
                ]
            );
        }

        #[test]
        fn label_offset_resets_per_method() {
            let found = instructions(vec![
                method("a", "()V"),
                label(40),
                method("b", "()V"),
                type_insn(opcodes::NEW),
            ]);
            assert_eq!(found, vec![(InsnCategory::New, 0)]);
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn instruction_before_method() {
            let mut scan = OffsetScan::new(vec![type_insn(opcodes::NEW)]);
            assert_eq!(
                scan.next(),
                Some(Err(IndexError::EventOutsideMethod { event: "type_insn" }))
            );
        }

        #[test]
        fn unknown_type_opcode() {
            let mut scan = OffsetScan::new(vec![method("m", "()V"), type_insn(0x00)]);
            assert!(matches!(scan.next(), Some(Ok(ScanRecord::Method { .. }))));
            assert!(matches!(
                scan.next(),
                Some(Err(IndexError::UnexpectedOpcode { opcode: 0x00, .. }))
            ));
            assert_eq!(scan.next(), None);
        }

        #[test]
        fn operand_offset_past_u32_range() {
            let mut scan = OffsetScan::new(vec![
                method("m", "()V"),
                label(u32::MAX),
                type_insn(opcodes::CHECKCAST),
                label(u32::MAX),
                type_insn(opcodes::NEW),
            ]);
            assert!(matches!(scan.next(), Some(Ok(ScanRecord::Method { .. }))));
            assert_eq!(
                scan.next(),
                Some(Err(IndexError::OffsetOverflow {
                    offset: u32::MAX,
                    method: MethodKey::from_descriptor("m", "()V").unwrap(),
                }))
            );
            // Allocations sit on the label itself and still index.
            assert_eq!(
                scan.next(),
                Some(Ok(ScanRecord::Instruction {
                    method: MethodKey::from_descriptor("m", "()V").unwrap(),
                    category: InsnCategory::New,
                    offset: u32::MAX,
                    opcode: opcodes::NEW,
                }))
            );
        }

        #[test]
        fn scan_resumes_after_an_error() {
            let mut scan = OffsetScan::new(vec![
                method("m", "()V"),
                type_insn(0x00),
                label(6),
                type_insn(opcodes::INSTANCEOF),
            ]);
            assert!(matches!(scan.next(), Some(Ok(ScanRecord::Method { .. }))));
            assert!(matches!(scan.next(), Some(Err(_))));
            assert!(matches!(
                scan.next(),
                Some(Ok(ScanRecord::Instruction { offset: 7, .. }))
            ));
            assert_eq!(scan.next(), None);
        }
    }
}
