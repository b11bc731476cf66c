//! Cross validation rules
//!
//! Each rule is a plain function over the same [`RuleContext`], appending to the
//! collector. Rules never see each other's output and never modify their input, so
//! they can be run and tested one at a time.

use super::graph::DependencyGraph;
use super::{ConsistencyMode, ValidationOptions};
use crate::ctxfst::ast::identifier::is_valid_identifier;
use crate::ctxfst::ast::{DeclaredChunk, Diagnostic, DiagnosticSeverity, Diagnostics, ScannedChunk};
use std::collections::{HashMap, HashSet};

pub type Rule = fn(&RuleContext<'_>, &mut Diagnostics);

/// The rule table, in the order rules run
pub const RULES: &[(&str, Rule)] = &[
    ("duplicate-declarations", duplicate_declarations),
    ("duplicate-chunks", duplicate_chunks),
    ("identifier-format", identifier_format),
    ("undeclared-chunks", undeclared_chunks),
    ("orphan-declarations", orphan_declarations),
    ("dangling-dependencies", dangling_dependencies),
    ("dependency-cycles", dependency_cycles),
];

/// Shared, precomputed view over both halves of a document
pub struct RuleContext<'a> {
    pub declared: &'a [DeclaredChunk],
    pub scanned: &'a [ScannedChunk],
    pub options: &'a ValidationOptions,
    /// First declaration of each id, in declaration order
    pub first_declarations: Vec<&'a DeclaredChunk>,
    declared_by_id: HashMap<&'a str, &'a DeclaredChunk>,
    scanned_ids: HashSet<&'a str>,
}

impl<'a> RuleContext<'a> {
    pub fn new(
        declared: &'a [DeclaredChunk],
        scanned: &'a [ScannedChunk],
        options: &'a ValidationOptions,
    ) -> Self {
        let mut declared_by_id = HashMap::new();
        let mut first_declarations = Vec::new();
        for declaration in declared {
            if !declared_by_id.contains_key(declaration.id.as_str()) {
                declared_by_id.insert(declaration.id.as_str(), declaration);
                first_declarations.push(declaration);
            }
        }

        Self {
            declared,
            scanned,
            options,
            first_declarations,
            declared_by_id,
            scanned_ids: scanned.iter().map(|chunk| chunk.id.as_str()).collect(),
        }
    }

    pub fn declaration(&self, id: &str) -> Option<&'a DeclaredChunk> {
        self.declared_by_id.get(id).copied()
    }

    pub fn is_declared(&self, id: &str) -> bool {
        self.declared_by_id.contains_key(id)
    }

    /// Declared with an id that passes the grammar
    pub fn is_trusted(&self, id: &str) -> bool {
        self.is_declared(id) && is_valid_identifier(id)
    }

    pub fn is_scanned(&self, id: &str) -> bool {
        self.scanned_ids.contains(id)
    }

    /// Scanned chunks grouped by id, in order of first appearance
    fn scanned_groups(&self) -> Vec<(&'a str, Vec<&'a ScannedChunk>)> {
        let mut groups: Vec<(&str, Vec<&ScannedChunk>)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for chunk in self.scanned {
            match index.get(chunk.id.as_str()) {
                Some(&i) => groups[i].1.push(chunk),
                None => {
                    index.insert(chunk.id.as_str(), groups.len());
                    groups.push((chunk.id.as_str(), vec![chunk]));
                }
            }
        }
        groups
    }
}

/// Run every rule in table order
pub fn run_all(context: &RuleContext<'_>, diagnostics: &mut Diagnostics) {
    for (name, rule) in RULES {
        let before = diagnostics.len();
        rule(context, diagnostics);
        tracing::trace!(rule = *name, found = diagnostics.len() - before, "rule ran");
    }
}

/// Once per id, at its second declaration
pub fn duplicate_declarations(context: &RuleContext<'_>, diagnostics: &mut Diagnostics) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for declaration in context.declared {
        let count = counts.entry(declaration.id.as_str()).or_insert(0);
        *count += 1;
        if *count == 2 {
            diagnostics.push(Diagnostic::duplicate_declaration(
                &declaration.id,
                declaration.offset,
            ));
        }
    }
}

pub fn duplicate_chunks(context: &RuleContext<'_>, diagnostics: &mut Diagnostics) {
    for (id, chunks) in context.scanned_groups() {
        if chunks.len() > 1 {
            let offsets = chunks.iter().map(|chunk| chunk.start_offset).collect();
            diagnostics.push(Diagnostic::duplicate_chunk(id, offsets));
        }
    }
}

/// Once per distinct id, whether it comes from the preamble or the body
pub fn identifier_format(context: &RuleContext<'_>, diagnostics: &mut Diagnostics) {
    let declared = context
        .first_declarations
        .iter()
        .map(|declaration| (declaration.id.as_str(), declaration.offset));
    let scanned = context
        .scanned
        .iter()
        .map(|chunk| (chunk.id.as_str(), Some(chunk.start_offset)));

    let mut reported = HashSet::new();
    for (id, offset) in declared.chain(scanned) {
        if !is_valid_identifier(id) && reported.insert(id) {
            diagnostics.push(Diagnostic::invalid_identifier_format(id, offset));
        }
    }
}

/// Strict mode only
pub fn undeclared_chunks(context: &RuleContext<'_>, diagnostics: &mut Diagnostics) {
    if context.options.mode != ConsistencyMode::Strict {
        return;
    }
    for (id, chunks) in context.scanned_groups() {
        if !context.is_declared(id) {
            diagnostics.push(Diagnostic::undeclared_chunk(id, chunks[0].start_offset));
        }
    }
}

/// Strict mode reports orphans even when the configured severity ignores them
pub fn orphan_declarations(context: &RuleContext<'_>, diagnostics: &mut Diagnostics) {
    let severity = match (context.options.mode, context.options.orphan_severity.severity()) {
        (ConsistencyMode::Strict, None) => DiagnosticSeverity::Warning,
        (_, Some(severity)) => severity,
        (ConsistencyMode::Permissive, None) => return,
    };
    for declaration in &context.first_declarations {
        if !context.is_scanned(&declaration.id) {
            diagnostics.push(
                Diagnostic::orphan_declaration(&declaration.id, declaration.offset)
                    .with_severity(severity),
            );
        }
    }
}

pub fn dangling_dependencies(context: &RuleContext<'_>, diagnostics: &mut Diagnostics) {
    for declaration in &context.first_declarations {
        for target in declaration.dependency_ids() {
            if !context.is_declared(target) {
                diagnostics.push(Diagnostic::dangling_dependency(
                    &declaration.id,
                    target,
                    declaration.offset,
                ));
            }
        }
    }
}

/// Over trusted declarations only, in declaration order
pub fn dependency_cycles(context: &RuleContext<'_>, diagnostics: &mut Diagnostics) {
    let mut graph = DependencyGraph::new();
    for declaration in &context.first_declarations {
        if !is_valid_identifier(&declaration.id) {
            continue;
        }
        graph.add_node(&declaration.id);
        for target in declaration.dependency_ids() {
            if context.is_trusted(target) {
                graph.add_edge(&declaration.id, target);
            }
        }
    }

    for path in graph.find_cycles() {
        let offset = path
            .first()
            .and_then(|id| context.declaration(id))
            .and_then(|declaration| declaration.offset);
        diagnostics.push(Diagnostic::dependency_cycle(path, offset));
    }
}
