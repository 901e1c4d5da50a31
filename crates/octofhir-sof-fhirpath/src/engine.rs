//! Path evaluation seam and the built-in FHIRPath engine

use crate::ast::Expression;
use crate::error::PathResult;
use crate::evaluator::{Context, evaluate};
use crate::node::Node;
use crate::parser;
use crate::version::FhirVersion;
use log::{debug, trace};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Evaluates FHIRPath expressions against document nodes
///
/// View application only talks to this trait, so a different FHIRPath
/// implementation can be plugged in. The returned nodes may borrow from the
/// document `node` borrows from.
pub trait PathEvaluator: Send + Sync {
    /// Evaluate `path` with `node` as the focus and `%resource`
    fn evaluate<'a>(&self, node: &Node<'a>, path: &str) -> PathResult<Vec<Node<'a>>>;
}

/// FHIRPath engine over JSON resources
///
/// Parsed expressions are cached by their source text, so evaluating the
/// same view over many resources parses each path once.
pub struct FhirPathEngine {
    version: FhirVersion,
    cache: RwLock<HashMap<String, Arc<Expression>>>,
}

impl FhirPathEngine {
    /// Create an engine for a FHIR release
    pub fn new(version: FhirVersion) -> Self {
        debug!("Creating FHIRPath engine for FHIR {}", version);
        Self {
            version,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// FHIR release the engine was created for
    pub fn version(&self) -> FhirVersion {
        self.version
    }

    /// Parse an expression, reusing a cached AST when available
    pub fn compile(&self, path: &str) -> PathResult<Arc<Expression>> {
        if let Some(expr) = self.cache.read().get(path) {
            return Ok(Arc::clone(expr));
        }

        trace!("Parsing FHIRPath expression: {}", path);
        let expr = Arc::new(parser::parse(path)?);
        self.cache
            .write()
            .insert(path.to_string(), Arc::clone(&expr));
        Ok(expr)
    }

    /// Evaluate an already parsed expression
    pub fn evaluate_expression<'a>(
        &self,
        expr: &Expression,
        node: &Node<'a>,
    ) -> PathResult<Vec<Node<'a>>> {
        let ctx = Context {
            resource: node.clone(),
            version: self.version,
        };
        evaluate(expr, std::slice::from_ref(node), &ctx)
    }

    /// Number of cached expressions
    pub fn cached_expressions(&self) -> usize {
        self.cache.read().len()
    }
}

impl Default for FhirPathEngine {
    fn default() -> Self {
        Self::new(FhirVersion::default())
    }
}

impl PathEvaluator for FhirPathEngine {
    fn evaluate<'a>(&self, node: &Node<'a>, path: &str) -> PathResult<Vec<Node<'a>>> {
        let expr = self.compile(path)?;
        self.evaluate_expression(&expr, node)
    }
}
