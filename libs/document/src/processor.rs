//! The document pass
//!
//! One sequential walk over the regions of a document. Each statement is
//! evaluated against the symbols defined by the regions before it; a
//! failing region is annotated in place and the walk continues.

use crate::options::ProcessOptions;
use crate::render::{render_error, render_quantity};
use crate::span::{find_regions, substitute, LineIndex, Span};
use calcmark_engine::{Engine, Error, Execution, IrDocument, Statement, SymbolicBackend};
use serde::Serialize;
use std::sync::Arc;

/// A region-level failure, positioned in the source document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub line: usize,
    pub column: usize,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Processed {
    pub document: String,
    pub ir: IrDocument,
    pub diagnostics: Vec<Diagnostic>,
}

/// Runs document passes with fixed options.
#[derive(Clone, Default)]
pub struct Processor {
    options: ProcessOptions,
    symbolic: Option<Arc<dyn SymbolicBackend>>,
}

impl Processor {
    pub fn new(options: ProcessOptions) -> Self {
        Self {
            options,
            symbolic: None,
        }
    }

    pub fn with_symbolic_backend(mut self, backend: Arc<dyn SymbolicBackend>) -> Self {
        self.symbolic = Some(backend);
        self
    }

    pub fn options(&self) -> &ProcessOptions {
        &self.options
    }

    pub fn process(&self, doc: &str) -> Processed {
        let mut engine = Engine::new(
            self.options.collision_policy(),
            self.options.eval_options(),
        );
        if let Some(backend) = &self.symbolic {
            engine = engine.with_symbolic_backend(Arc::clone(backend));
        }

        let index = LineIndex::new(doc);
        let spans = find_regions(doc);
        let mut replacements: Vec<(&Span, String)> = Vec::new();
        let mut diagnostics = Vec::new();

        for span in &spans {
            let content = span.content(doc);
            let Some(statement) = Statement::split(content) else {
                continue;
            };
            let leading = content.len() - content.trim_start().len();
            let line = index.line(span.content_start + leading);
            tracing::debug!(line, form = statement.form.label(), "processing region");

            let outcome = engine
                .execute(&statement, line)
                .and_then(|execution| self.render(&engine, execution, span));
            let rewritten = match outcome {
                Ok(Some(rendered)) => statement.with_output(&rendered),
                Ok(None) => statement.stripped(),
                Err(err) => {
                    let pos = span.content_start + err.offset().unwrap_or(leading);
                    let (line, column) = index.locate(doc, pos.min(span.content_end));
                    tracing::warn!(line, column, kind = err.kind(), error = %err, "region failed");
                    diagnostics.push(Diagnostic {
                        line,
                        column,
                        kind: err.kind(),
                        message: err.to_string(),
                    });
                    match statement.output_at {
                        Some(_) => statement.with_output(&render_error(&err)),
                        None => statement.with_annotation(&format!("{}: {}", err.kind(), err)),
                    }
                }
            };
            if rewritten != content {
                replacements.push((span, rewritten));
            }
        }

        let mut document = doc.to_string();
        for (span, content) in replacements.iter().rev() {
            document = substitute(&document, span, content);
        }
        tracing::debug!(
            regions = spans.len(),
            rewritten = replacements.len(),
            failed = diagnostics.len(),
            "document processed"
        );

        Processed {
            document,
            ir: engine.ir(),
            diagnostics,
        }
    }

    fn render(
        &self,
        engine: &Engine,
        execution: Execution,
        span: &Span,
    ) -> Result<Option<String>, Error> {
        match execution {
            Execution::Evaluated { quantity, .. } => {
                let quantity = match &span.display_unit {
                    Some(unit) => engine.convert(&quantity, unit)?,
                    None => quantity,
                };
                Ok(Some(render_quantity(&quantity, self.options.precision)))
            }
            Execution::Symbolic { output } => Ok(output),
            Execution::Defined { .. } | Execution::UnitDefined { .. } => Ok(None),
        }
    }
}

/// Evaluates every statement region of `doc` and writes the results back.
pub fn process(doc: &str, options: &ProcessOptions) -> Processed {
    Processor::new(options.clone()).process(doc)
}
