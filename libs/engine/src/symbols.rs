//! Symbol table: role-tagged ids, provenance and dependency tracking
//!
//! Each definition gets a fresh [`InternalId`] from a per-role counter.
//! Names resolve to the newest valid definition, trying the exact display
//! name, then a canonical form, then a diacritic-folded canonical form.

use crate::ast::Expr;
use crate::error::{Error, Result};
use calcmark_units::Quantity;
use serde::{Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::fmt;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Value,
    Formula,
    Parameter,
}

impl Role {
    fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Value => "value",
            Role::Formula => "formula",
            Role::Parameter => "param",
        }
    }
}

/// Stable, role-tagged identifier such as `value-1` or `param-2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InternalId {
    pub role: Role,
    pub index: u32,
}

impl fmt::Display for InternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.role.as_str(), self.index)
    }
}

impl Serialize for InternalId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ValueRecord {
    /// As declared, in the author's units.
    pub original: Quantity,
    /// Coherent base-unit form; `None` when the unit could not be resolved.
    pub base: Option<Quantity>,
    pub conversion_ok: bool,
    pub conversion_error: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FormulaRecord {
    pub expression_summary: String,
    pub depends_on: Vec<InternalId>,
    pub parameters: Vec<InternalId>,
    pub parameter_names: Vec<String>,
    pub body: Expr,
    pub result: Option<Quantity>,
    pub error: Option<Error>,
}

impl FormulaRecord {
    pub fn is_function(&self) -> bool {
        !self.parameters.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SymbolData {
    Value(ValueRecord),
    Formula(FormulaRecord),
    /// A function parameter, owned by the formula that declares it.
    Parameter { formula: Option<InternalId> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct SymbolEntry {
    pub internal_id: InternalId,
    pub display_name: String,
    pub source_line: usize,
    pub data: SymbolData,
}

impl SymbolEntry {
    pub fn role(&self) -> Role {
        self.internal_id.role
    }

    pub fn depends_on(&self) -> &[InternalId] {
        match &self.data {
            SymbolData::Formula(f) => &f.depends_on,
            _ => &[],
        }
    }
}

/// Outcome of a name lookup
#[derive(Debug, PartialEq)]
pub enum Lookup<'a> {
    Found(&'a SymbolEntry),
    /// The newest definition under this name was rejected.
    Invalid(&'a str),
    Missing,
}

/// Braces, whitespace and `\mathrm`/`\text` wrappers removed.
pub fn canonical_name(name: &str) -> String {
    let mut rest = name.trim().to_string();
    for wrapper in ["\\mathrm", "\\text", "\\operatorname", "\\mathit"] {
        rest = rest.replace(wrapper, "");
    }
    rest.chars()
        .filter(|c| !c.is_whitespace() && *c != '{' && *c != '}')
        .collect()
}

/// Canonical form with diacritics removed.
pub fn folded_name(name: &str) -> String {
    canonical_name(name)
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: Vec<SymbolEntry>,
    index: HashMap<InternalId, usize>,
    by_name: HashMap<String, InternalId>,
    by_canonical: HashMap<String, InternalId>,
    by_folded: HashMap<String, InternalId>,
    invalid: HashMap<String, String>,
    functions: HashSet<String>,
    counters: [u32; 3],
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &SymbolEntry> {
        self.entries.iter()
    }

    /// Names callable as user functions.
    pub fn function_names(&self) -> &HashSet<String> {
        &self.functions
    }

    fn next_id(&mut self, role: Role) -> InternalId {
        let counter = &mut self.counters[role.index()];
        *counter += 1;
        InternalId {
            role,
            index: *counter,
        }
    }

    pub fn register_value(&mut self, name: &str, line: usize, record: ValueRecord) -> InternalId {
        self.register(name, line, Role::Value, SymbolData::Value(record))
    }

    pub fn register_formula(
        &mut self,
        name: &str,
        line: usize,
        record: FormulaRecord,
    ) -> InternalId {
        if record.is_function() {
            self.functions.insert(name.to_string());
        } else {
            self.functions.remove(name);
        }
        self.register(name, line, Role::Formula, SymbolData::Formula(record))
    }

    /// Parameters get ids but are not visible by name outside their formula.
    pub fn register_parameter(&mut self, name: &str, line: usize) -> InternalId {
        let id = self.next_id(Role::Parameter);
        self.push(SymbolEntry {
            internal_id: id,
            display_name: name.to_string(),
            source_line: line,
            data: SymbolData::Parameter { formula: None },
        });
        id
    }

    /// Links parameters to the formula that declared them.
    pub fn attach_parameters(&mut self, formula: InternalId, parameters: &[InternalId]) {
        for id in parameters {
            if let Some(&i) = self.index.get(id) {
                self.entries[i].data = SymbolData::Parameter {
                    formula: Some(formula),
                };
            }
        }
    }

    fn register(&mut self, name: &str, line: usize, role: Role, data: SymbolData) -> InternalId {
        let id = self.next_id(role);
        let canonical = canonical_name(name);
        self.invalid.remove(&canonical);
        self.by_name.insert(name.to_string(), id);
        self.by_folded.insert(folded_name(name), id);
        self.by_canonical.insert(canonical, id);
        self.push(SymbolEntry {
            internal_id: id,
            display_name: name.to_string(),
            source_line: line,
            data,
        });
        tracing::debug!(symbol = name, id = %id, line, "symbol registered");
        id
    }

    fn push(&mut self, entry: SymbolEntry) {
        self.index.insert(entry.internal_id, self.entries.len());
        self.entries.push(entry);
    }

    /// Marks `name` unusable until a later valid definition.
    pub fn mark_invalid(&mut self, name: &str, reason: impl Into<String>) {
        let canonical = canonical_name(name);
        self.by_name.retain(|n, _| canonical_name(n) != canonical);
        self.by_canonical.remove(&canonical);
        let folded = folded_name(name);
        self.by_folded.remove(&folded);
        self.functions.retain(|n| canonical_name(n) != canonical);
        self.invalid.insert(canonical, reason.into());
    }

    pub fn resolve(&self, id: InternalId) -> Option<&SymbolEntry> {
        self.index.get(&id).map(|&i| &self.entries[i])
    }

    pub fn lookup(&self, name: &str) -> Lookup<'_> {
        let canonical = canonical_name(name);
        if let Some(reason) = self.invalid.get(&canonical) {
            return Lookup::Invalid(reason);
        }
        let id = self
            .by_name
            .get(name)
            .or_else(|| self.by_canonical.get(&canonical))
            .or_else(|| self.by_folded.get(&folded_name(name)));
        match id.and_then(|id| self.resolve(*id)) {
            Some(entry) => Lookup::Found(entry),
            None => Lookup::Missing,
        }
    }

    /// If depending on `deps` would make `name` depend on an earlier
    /// definition of itself, the chain of names that closes the loop.
    pub fn cycle_through(&self, name: &str, deps: &[InternalId]) -> Option<Vec<String>> {
        let target = canonical_name(name);
        let mut visited = HashSet::new();
        for dep in deps {
            let mut path = vec![name.to_string()];
            if self.reaches(*dep, &target, &mut visited, &mut path) {
                return Some(path);
            }
        }
        None
    }

    fn reaches(
        &self,
        id: InternalId,
        target: &str,
        visited: &mut HashSet<InternalId>,
        path: &mut Vec<String>,
    ) -> bool {
        if !visited.insert(id) {
            return false;
        }
        let Some(entry) = self.resolve(id) else {
            return false;
        };
        path.push(entry.display_name.clone());
        if canonical_name(&entry.display_name) == target {
            return true;
        }
        for dep in entry.depends_on() {
            if self.reaches(*dep, target, visited, path) {
                return true;
            }
        }
        path.pop();
        false
    }

    /// Topological order of all entries (dependencies first).
    pub fn dependency_order(&self) -> Result<Vec<InternalId>> {
        let mut indegree: HashMap<InternalId, usize> = HashMap::new();
        let mut dependents: HashMap<InternalId, Vec<InternalId>> = HashMap::new();
        for entry in &self.entries {
            let deps: Vec<_> = entry
                .depends_on()
                .iter()
                .filter(|d| self.index.contains_key(*d))
                .collect();
            indegree.insert(entry.internal_id, deps.len());
            for dep in deps {
                dependents.entry(*dep).or_default().push(entry.internal_id);
            }
        }

        let mut ready: Vec<InternalId> = self
            .entries
            .iter()
            .map(|e| e.internal_id)
            .filter(|id| indegree.get(id) == Some(&0))
            .collect();
        ready.reverse();
        let mut order = Vec::with_capacity(self.entries.len());
        while let Some(id) = ready.pop() {
            order.push(id);
            for next in dependents.get(&id).into_iter().flatten() {
                if let Some(n) = indegree.get_mut(next) {
                    *n -= 1;
                    if *n == 0 {
                        ready.push(*next);
                    }
                }
            }
        }

        if order.len() < self.entries.len() {
            let path = self
                .entries
                .iter()
                .filter(|e| indegree.get(&e.internal_id).is_some_and(|n| *n > 0))
                .map(|e| e.display_name.clone())
                .collect();
            return Err(Error::Cycle { path });
        }
        Ok(order)
    }
}
