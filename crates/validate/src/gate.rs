use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use extract::ExtractionResult;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::error::ShapeError;
use crate::shapes::{EdgeShape, NodeKind, PropertyShape, ShapeSet};
use crate::triples::{PREFIX, Term, TripleGraph};

pub const COLLISION_RULE: &str = "IdentifierCollision";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub rule: String,
    pub focus: String,
    pub path: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub conforms: bool,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            conforms: violations.is_empty(),
            violations,
        }
    }

    pub fn text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Validation Report")?;
        writeln!(f, "Conforms: {}", self.conforms)?;
        if self.conforms {
            return Ok(());
        }
        writeln!(f, "Results ({}):", self.violations.len())?;
        for v in &self.violations {
            match &v.path {
                Some(path) => writeln!(f, "- [{}] {} ({}): {}", v.rule, v.focus, path, v.message)?,
                None => writeln!(f, "- [{}] {}: {}", v.rule, v.focus, v.message)?,
            }
        }
        Ok(())
    }
}

/// Checks a merged graph against structural rules. The outcome is advisory:
/// callers log or surface the report but carry on.
pub struct ValidationGate {
    shapes: ShapeSet,
    patterns: HashMap<String, Regex>,
}

impl ValidationGate {
    pub fn new(shapes: ShapeSet) -> Result<Self, ShapeError> {
        let mut patterns = HashMap::new();

        let node_patterns = shapes.node_shapes.iter().flat_map(|s| {
            s.properties.iter().filter_map(move |p| p.pattern.as_ref().map(|pat| (&s.name, pat)))
        });
        let edge_patterns = shapes
            .edge_shapes
            .iter()
            .filter_map(|s| s.pattern.as_ref().map(|pat| (&s.name, pat)));

        for (rule, pattern) in node_patterns.chain(edge_patterns) {
            if patterns.contains_key(pattern) {
                continue;
            }
            let regex = Regex::new(pattern).map_err(|source| ShapeError::Pattern {
                rule: rule.clone(),
                source,
            })?;
            patterns.insert(pattern.clone(), regex);
        }

        Ok(Self { shapes, patterns })
    }

    /// Use the rules file at `path`, or the built-in rules when none is given.
    pub fn from_path(path: Option<&Path>) -> Result<Self, ShapeError> {
        match path {
            Some(path) => Self::new(ShapeSet::load(path)?),
            None => Self::new(ShapeSet::default()),
        }
    }

    pub fn shapes(&self) -> &ShapeSet {
        &self.shapes
    }

    pub fn validate(&self, result: &ExtractionResult) -> ValidationReport {
        let graph = TripleGraph::from_extraction(result);
        let mut violations = Vec::new();

        for collision in graph.collisions() {
            let names: Vec<String> = collision.names.iter().map(|n| format!("{:?}", n)).collect();
            violations.push(Violation {
                rule: COLLISION_RULE.to_string(),
                focus: format!("{}{}", PREFIX, collision.identifier),
                path: None,
                message: format!(
                    "distinct entity names {} normalize to the same identifier",
                    names.join(", ")
                ),
            });
        }

        for shape in &self.shapes.node_shapes {
            for node in graph.instances_of(&shape.target_class) {
                for property in &shape.properties {
                    self.check_property(&graph, &shape.name, node, property, &mut violations);
                }
            }
        }

        for shape in &self.shapes.edge_shapes {
            self.check_edges(&graph, shape, &mut violations);
        }

        debug!(
            triples = graph.triples().len(),
            violations = violations.len(),
            "Graph validated"
        );

        ValidationReport::from_violations(violations)
    }

    fn check_property(
        &self,
        graph: &TripleGraph,
        rule: &str,
        node: &str,
        property: &PropertyShape,
        out: &mut Vec<Violation>,
    ) {
        let values = graph.values(node, &property.path);
        let mut report = |message: String| {
            out.push(Violation {
                rule: rule.to_string(),
                focus: format!("{}{}", PREFIX, node),
                path: Some(property.path.clone()),
                message,
            })
        };

        if let Some(min) = property.min_count {
            if values.len() < min {
                report(format!("expected at least {} value(s), found {}", min, values.len()));
            }
        }
        if let Some(max) = property.max_count {
            if values.len() > max {
                report(format!("expected at most {} value(s), found {}", max, values.len()));
            }
        }

        for value in values {
            match (property.node_kind, value) {
                (Some(NodeKind::Literal), Term::Node(id)) => {
                    report(format!("expected a literal, found node {}{}", PREFIX, id));
                    continue;
                }
                (Some(NodeKind::Iri), Term::Literal(lit)) => {
                    report(format!("expected a node, found literal {:?}", lit));
                    continue;
                }
                _ => {}
            }

            let Term::Literal(literal) = value else {
                continue;
            };

            if let Some(min_len) = property.min_length {
                if literal.trim().chars().count() < min_len {
                    report(format!("value {:?} is shorter than {} character(s)", literal, min_len));
                }
            }
            if let Some(regex) = property.pattern.as_ref().and_then(|p| self.patterns.get(p)) {
                if !regex.is_match(literal) {
                    report(format!("value {:?} does not match pattern {}", literal, regex.as_str()));
                }
            }
            if let Some(allowed) = &property.allowed {
                if !allowed.contains(literal) {
                    report(format!("value {:?} is not one of {:?}", literal, allowed));
                }
            }
        }
    }

    fn check_edges(&self, graph: &TripleGraph, shape: &EdgeShape, out: &mut Vec<Violation>) {
        let regex = shape.pattern.as_ref().and_then(|p| self.patterns.get(p));

        for edge in graph.edges() {
            if shape.edge_type.as_ref().is_some_and(|t| *t != edge.predicate) {
                continue;
            }

            let target = match &edge.object {
                Term::Node(id) => id.as_str(),
                Term::Literal(lit) => lit.as_str(),
            };
            let mut report = |message: String| {
                out.push(Violation {
                    rule: shape.name.clone(),
                    focus: format!("{}{} -> {}{}", PREFIX, edge.subject, PREFIX, target),
                    path: Some(edge.predicate.clone()),
                    message,
                })
            };

            if let Some(regex) = regex {
                if !regex.is_match(&edge.predicate) {
                    report(format!("edge label does not match pattern {}", regex.as_str()));
                }
            }
            if let Some(class) = &shape.source_class {
                if !graph.has_class(&edge.subject, class) {
                    report(format!("source is not a {} node", class));
                }
            }
            if let Some(class) = &shape.target_class {
                if !graph.has_class(target, class) {
                    report(format!("target is not a {} node", class));
                }
            }
        }
    }
}
