//! Generator composer: one compilation request in, one artifact set out.
//!
//! Builds the registry and analysis once, fans out to every backend a
//! message declares, and merges the results. Backend failures accumulate;
//! the composer never drops an error to report another.

use crate::{memory, plan::TablePlan, postgres, sqlite};
use crudgen_schema::{
    analyze::{AnalyzeError, Analysis, analyze},
    descriptor::FileDescriptor,
    error::ErrorTree,
    node::{FileId, ModuleIdent},
    registry::{Registry, RegistryError},
    types::Backend,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error as ThisError;
use tracing::info;

///
/// Request
///
/// One compilation request as delivered by the host transport: every
/// reachable schema file, plus the names of the files to generate for.
/// Files not named are imports; their types resolve but emit nothing.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Request {
    pub files: Vec<FileDescriptor>,

    /// File names to emit artifacts for; empty means every file.
    #[serde(default)]
    pub to_generate: Vec<String>,

    #[serde(default)]
    pub options: Options,
}

///
/// Options
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Options {
    /// Restrict generation to these backends; empty means every backend a
    /// message declares.
    #[serde(default)]
    pub backends: BTreeSet<Backend>,
}

impl Options {
    fn active(&self, backend: Backend) -> bool {
        self.backends.is_empty() || self.backends.contains(&backend)
    }
}

///
/// Artifact
///
/// One emitted output file. The host transport owns writing it; paths are
/// relative and forward-slashed.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Artifact {
    pub path: String,
    pub content: String,
}

///
/// ComposeError
///

#[derive(Debug, ThisError)]
pub enum ComposeError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Analyze(#[from] AnalyzeError),

    #[error("code generation failed: {0}")]
    Generation(ErrorTree),
}

/// Run one compilation request end to end.
pub fn compose(request: &Request) -> Result<Vec<Artifact>, ComposeError> {
    let registry = Registry::load(&request.files)?;
    let file_ids = files_to_generate(&registry, request)?;
    let analysis = analyze(&registry, &file_ids)?;

    let mut artifacts = Vec::new();
    let mut errs = ErrorTree::new();

    for file_id in &file_ids {
        compose_file(
            &registry,
            &analysis,
            request,
            *file_id,
            &mut artifacts,
            &mut errs,
        );
    }

    errs.result().map_err(ComposeError::Generation)?;

    info!(
        files = file_ids.len(),
        artifacts = artifacts.len(),
        "composition complete"
    );

    Ok(artifacts)
}

fn files_to_generate(registry: &Registry, request: &Request) -> Result<Vec<FileId>, ComposeError> {
    if request.to_generate.is_empty() {
        return Ok(registry.files().map(|(id, _)| id).collect());
    }

    let mut ids = Vec::with_capacity(request.to_generate.len());
    for name in &request.to_generate {
        registry.lookup_file(name)?;
        if let Some(id) = registry.file_id(name) {
            ids.push(id);
        }
    }

    Ok(ids)
}

// One file fans out to one source artifact per active backend, plus one
// DDL artifact per active SQL backend. Plan failures for one message do
// not stop the others; everything accumulates.
fn compose_file(
    registry: &Registry,
    analysis: &Analysis,
    request: &Request,
    file_id: FileId,
    artifacts: &mut Vec<Artifact>,
    errs: &mut ErrorTree,
) {
    let file = registry.file(file_id);

    let mut plans = Vec::new();
    for message_id in &file.messages {
        let Some(model) = analysis.model(*message_id) else {
            continue;
        };
        match TablePlan::build(registry, analysis, model) {
            Ok(plan) => plans.push(plan),
            Err(e) => errs.add(e),
        }
    }

    for backend in [Backend::Memory, Backend::Postgres, Backend::Sqlite] {
        if !request.options.active(backend) {
            continue;
        }

        let targeted: Vec<&TablePlan> =
            plans.iter().filter(|p| p.backends.contains(&backend)).collect();
        if targeted.is_empty() {
            continue;
        }

        let mut source = String::new();
        let mut ddl = String::new();
        for plan in &targeted {
            let (tokens, plan_ddl) = match backend {
                Backend::Memory => (memory::generate(plan), None),
                Backend::Postgres => (postgres::generate(plan), Some(postgres::ddl(plan))),
                Backend::Sqlite => (sqlite::generate(plan), Some(sqlite::ddl(plan))),
            };

            if !source.is_empty() {
                source.push('\n');
            }
            source.push_str(&tokens.to_string());
            source.push('\n');

            if let Some(text) = plan_ddl {
                ddl.push_str(&text);
            }
        }

        artifacts.push(Artifact {
            path: artifact_path(&file.module, backend, "rs"),
            content: source,
        });
        if backend.is_sql() {
            artifacts.push(Artifact {
                path: artifact_path(&file.module, backend, "sql"),
                content: ddl,
            });
        }
    }
}

fn artifact_path(module: &ModuleIdent, backend: Backend, ext: &str) -> String {
    let suffix = match backend {
        Backend::Memory => "memory",
        Backend::Postgres => "postgres",
        Backend::Sqlite => "sqlite",
    };

    if module.path.is_empty() {
        format!("{}_{suffix}.{ext}", module.alias)
    } else {
        format!("{}/{}_{suffix}.{ext}", module.path, module.alias)
    }
}
