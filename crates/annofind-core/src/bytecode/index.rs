//! Per-method offset tables built from [`ScanRecord`]s.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::{ClassEvent, IndexResult, InsnCategory, MethodKey, OffsetScan, ScanRecord};

/// A local variable table entry of one method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalVariable<'i> {
    pub name: &'i str,
    pub slot: u16,
    pub start: u32,
    /// Rank of this variable among same-named variables of the method, by start offset.
    pub occurrence: usize,
}

/// Offset tables of a single method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodOffsets {
    instructions: BTreeMap<InsnCategory, BTreeSet<u32>>,
    /// `(slot, start)` to declared name.
    locals: BTreeMap<(u16, u32), String>,
    /// Declared name to the start offsets of every variable with that name.
    starts: BTreeMap<String, BTreeSet<u32>>,
}

impl MethodOffsets {
    /// Offsets of `category` instructions in ascending order.
    pub fn offsets(&self, category: InsnCategory) -> impl Iterator<Item = u32> + '_ {
        self.instructions
            .get(&category)
            .into_iter()
            .flatten()
            .copied()
    }

    /// The `n`-th (0-based) offset of `category`.
    pub fn offset_at(&self, category: InsnCategory, n: usize) -> Option<u32> {
        self.offsets(category).nth(n)
    }

    /// Position of `offset` among the `category` offsets.
    pub fn index_of(&self, category: InsnCategory, offset: u32) -> Option<usize> {
        let set = self.instructions.get(&category)?;
        set.contains(&offset).then(|| set.range(..offset).count())
    }

    pub fn local_name(&self, slot: u16, start: u32) -> Option<&str> {
        self.locals.get(&(slot, start)).map(String::as_str)
    }

    /// Rank of the variable `name` starting at `start` among same-named variables.
    pub fn local_occurrence(&self, name: &str, start: u32) -> Option<usize> {
        let starts = self.starts.get(name)?;
        starts
            .contains(&start)
            .then(|| starts.range(..start).count())
    }

    /// Start offset of the `occurrence`-th variable named `name`.
    pub fn local_start(&self, name: &str, occurrence: usize) -> Option<u32> {
        self.starts.get(name)?.iter().nth(occurrence).copied()
    }

    /// Local variables ordered by slot, then start offset.
    pub fn locals(&self) -> impl Iterator<Item = LocalVariable<'_>> + '_ {
        self.locals.iter().map(|(&(slot, start), name)| LocalVariable {
            name,
            slot,
            start,
            occurrence: self.local_occurrence(name, start).unwrap_or_default(),
        })
    }

    /// Categories with at least one indexed instruction.
    pub fn categories(&self) -> impl Iterator<Item = InsnCategory> + '_ {
        self.instructions.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty() && self.locals.is_empty()
    }
}

/// Offsets of casts, allocations, type tests, calls, lambdas and local
/// variables for every method of one class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodOffsetIndex {
    methods: BTreeMap<MethodKey, MethodOffsets>,
}

impl MethodOffsetIndex {
    /// Scan a class's decoder events and build its index.
    ///
    /// Fails on the first malformed event; nothing is returned for a
    /// partially scanned class.
    pub fn build(events: impl IntoIterator<Item = ClassEvent>) -> IndexResult<Self> {
        let records = OffsetScan::new(events).collect::<IndexResult<Vec<_>>>()?;
        Ok(Self::from_records(records))
    }

    /// Fold already resolved records into an index.
    pub fn from_records(records: impl IntoIterator<Item = ScanRecord>) -> Self {
        let mut index = MethodOffsetIndex::default();
        for record in records {
            match record {
                ScanRecord::Method { method } => {
                    index.methods.entry(method).or_default();
                }
                ScanRecord::Instruction {
                    method,
                    category,
                    offset,
                    ..
                } => {
                    index
                        .methods
                        .entry(method)
                        .or_default()
                        .instructions
                        .entry(category)
                        .or_default()
                        .insert(offset);
                }
                ScanRecord::LocalVariable {
                    method,
                    slot,
                    start,
                    name,
                } => {
                    let offsets = index.methods.entry(method).or_default();
                    offsets
                        .starts
                        .entry(name.clone())
                        .or_default()
                        .insert(start);
                    offsets.locals.insert((slot, start), name);
                }
            }
        }
        debug!(methods = index.methods.len(), "built method offset index");
        index
    }

    /// Tables of `method`, keyed as `name(params)`.
    pub fn method(&self, method: &str) -> Option<&MethodOffsets> {
        self.methods.get(method)
    }

    /// Indexed methods in key order, with their tables.
    pub fn methods(&self) -> impl Iterator<Item = (&MethodKey, &MethodOffsets)> + '_ {
        self.methods.iter()
    }

    pub fn offsets(&self, method: &str, category: InsnCategory) -> impl Iterator<Item = u32> + '_ {
        self.method(method)
            .into_iter()
            .flat_map(move |m| m.offsets(category))
    }

    pub fn offset_at(&self, method: &str, category: InsnCategory, n: usize) -> Option<u32> {
        self.method(method)?.offset_at(category, n)
    }

    pub fn index_of(&self, method: &str, category: InsnCategory, offset: u32) -> Option<usize> {
        self.method(method)?.index_of(category, offset)
    }

    pub fn local_name(&self, method: &str, slot: u16, start: u32) -> Option<&str> {
        self.method(method)?.local_name(slot, start)
    }

    pub fn local_occurrence(&self, method: &str, name: &str, start: u32) -> Option<usize> {
        self.method(method)?.local_occurrence(name, start)
    }

    pub fn local_start(&self, method: &str, name: &str, occurrence: usize) -> Option<u32> {
        self.method(method)?.local_start(name, occurrence)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
