//! Function sources — where a callable comes from.
//!
//! Two tiers, tried in order by the resolver: a packaged artifact fetched
//! from a URI, and a module deployed under a well-known local name. Both
//! yield the same [`ScriptHandler`] shape.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use pulse_core::PackageUri;
use rhai::{AST, Engine};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::ResolveError;
use crate::handler::{Handler, ScriptHandler};

/// Fixed name the local module tier looks for inside the module directory.
pub const WELL_KNOWN_MODULE: &str = "usermodule.rhai";

/// How an entry point is bound when a package contains several sources.
///
/// The two policies disagree when the same symbol is defined in more than
/// one file, so the choice is explicit and configurable rather than an
/// accident of implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BindingPolicy {
    /// Merge all discovered sources into one synthetic script and compile
    /// once; a symbol defined several times resolves to the last
    /// definition.
    #[default]
    Concatenate,
    /// Compile each discovered source independently and bind from the
    /// first file, in sorted scan order, that defines the symbol.
    ProbeEachFile,
}

impl FromStr for BindingPolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "concatenate" => Ok(Self::Concatenate),
            "probe" => Ok(Self::ProbeEachFile),
            other => Err(format!(
                "unknown binding policy `{other}` (expected `concatenate` or `probe`)"
            )),
        }
    }
}

/// A tier that can produce the bound callable. Failures inside a tier are
/// recoverable — the resolver logs them and falls through to the next tier.
#[async_trait]
pub trait FunctionSource: Send + Sync {
    fn describe(&self) -> String;

    async fn resolve(&self) -> Result<Box<dyn Handler>, ResolveError>;
}

/// One discovered script source inside an unpacked package.
struct ScriptSource {
    path: PathBuf,
    text: String,
}

// ── Remote package tier ─────────────────────────────────────────────

/// Downloads a zip of script sources, unpacks it into scoped temporary
/// storage, and binds the entry point under the configured policy.
///
/// The downloaded archive and the unpacked tree both live in RAII temp
/// locations and are removed on every exit path, success or failure.
pub struct RemotePackageSource {
    engine: Arc<Engine>,
    package: PackageUri,
    entry_point: String,
    policy: BindingPolicy,
}

impl RemotePackageSource {
    pub fn new(
        engine: Arc<Engine>,
        package: PackageUri,
        entry_point: impl Into<String>,
        policy: BindingPolicy,
    ) -> Self {
        Self {
            engine,
            package,
            entry_point: entry_point.into(),
            policy,
        }
    }

    async fn download(&self) -> Result<Vec<u8>, ResolveError> {
        match &self.package {
            PackageUri::Https { url } => {
                let response = reqwest::get(url)
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| ResolveError::Download(e.to_string()))?;
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| ResolveError::Download(e.to_string()))?;
                Ok(bytes.to_vec())
            }
            PackageUri::File { path } => {
                std::fs::read(path).map_err(|e| ResolveError::Download(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl FunctionSource for RemotePackageSource {
    fn describe(&self) -> String {
        format!("remote package {}", self.package)
    }

    async fn resolve(&self) -> Result<Box<dyn Handler>, ResolveError> {
        let bytes = self.download().await?;
        info!(
            package = %self.package,
            size_bytes = bytes.len(),
            sha256 = %hex::encode(Sha256::digest(&bytes)),
            "package artifact downloaded"
        );

        let mut archive = tempfile::NamedTempFile::new()
            .map_err(|e| ResolveError::Unpack(e.to_string()))?;
        archive
            .write_all(&bytes)
            .map_err(|e| ResolveError::Unpack(e.to_string()))?;

        let unpacked = tempfile::tempdir().map_err(|e| ResolveError::Unpack(e.to_string()))?;
        let reader = archive
            .reopen()
            .map_err(|e| ResolveError::Unpack(e.to_string()))?;
        zip::ZipArchive::new(reader)
            .and_then(|mut zip| zip.extract(unpacked.path()))
            .map_err(|e| ResolveError::Unpack(e.to_string()))?;

        let sources = discover_sources(unpacked.path())?;
        debug!(sources = sources.len(), "package sources discovered");
        bind_entry_point(&self.engine, &sources, &self.entry_point, self.policy)
    }
}

// ── Local module tier ───────────────────────────────────────────────

/// Loads the pre-deployed [`WELL_KNOWN_MODULE`] from the module directory.
pub struct LocalModuleSource {
    engine: Arc<Engine>,
    module_dir: PathBuf,
    entry_point: String,
}

impl LocalModuleSource {
    pub fn new(engine: Arc<Engine>, module_dir: PathBuf, entry_point: impl Into<String>) -> Self {
        Self {
            engine,
            module_dir,
            entry_point: entry_point.into(),
        }
    }

    /// The deployment path this tier reads — also the provenance probe
    /// target for `function_revision`.
    pub fn module_path(&self) -> PathBuf {
        self.module_dir.join(WELL_KNOWN_MODULE)
    }
}

#[async_trait]
impl FunctionSource for LocalModuleSource {
    fn describe(&self) -> String {
        format!("local module {}", self.module_path().display())
    }

    async fn resolve(&self) -> Result<Box<dyn Handler>, ResolveError> {
        let path = self.module_path();
        let text = std::fs::read_to_string(&path)
            .map_err(|_| ResolveError::ModuleMissing(path.display().to_string()))?;
        let ast = compile(&self.engine, &text)?;
        if !defines_entry_point(&ast, &self.entry_point) {
            return Err(ResolveError::EntryPointMissing(self.entry_point.clone()));
        }
        debug!(path = %path.display(), entry_point = %self.entry_point, "local module bound");
        Ok(Box::new(ScriptHandler::new(
            self.engine.clone(),
            ast,
            self.entry_point.clone(),
        )))
    }
}

// ── Discovery and binding ───────────────────────────────────────────

/// All `.rhai` sources under `root`, in sorted walk order (deterministic
/// first-file-wins semantics for [`BindingPolicy::ProbeEachFile`]).
fn discover_sources(root: &Path) -> Result<Vec<ScriptSource>, ResolveError> {
    let mut sources = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| ResolveError::Unpack(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|e| e.to_str()) != Some("rhai") {
            continue;
        }
        let text = std::fs::read_to_string(entry.path())
            .map_err(|e| ResolveError::Unpack(e.to_string()))?;
        sources.push(ScriptSource {
            path: entry.into_path(),
            text,
        });
    }
    if sources.is_empty() {
        return Err(ResolveError::NoSources);
    }
    Ok(sources)
}

fn compile(engine: &Engine, text: &str) -> Result<AST, ResolveError> {
    engine
        .compile(text)
        .map_err(|e| ResolveError::Compile(e.to_string()))
}

fn defines_entry_point(ast: &AST, entry_point: &str) -> bool {
    ast.iter_functions().any(|f| f.name == entry_point)
}

fn bind_entry_point(
    engine: &Arc<Engine>,
    sources: &[ScriptSource],
    entry_point: &str,
    policy: BindingPolicy,
) -> Result<Box<dyn Handler>, ResolveError> {
    match policy {
        BindingPolicy::Concatenate => {
            let combined = sources
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            let ast = compile(engine, &combined)?;
            if !defines_entry_point(&ast, entry_point) {
                return Err(ResolveError::EntryPointMissing(entry_point.to_string()));
            }
            Ok(Box::new(ScriptHandler::new(
                engine.clone(),
                ast,
                entry_point,
            )))
        }
        BindingPolicy::ProbeEachFile => {
            for source in sources {
                let ast = match engine.compile(&source.text) {
                    Ok(ast) => ast,
                    Err(err) => {
                        warn!(path = %source.path.display(), error = %err, "skipping uncompilable source");
                        continue;
                    }
                };
                if defines_entry_point(&ast, entry_point) {
                    debug!(path = %source.path.display(), %entry_point, "entry point bound");
                    return Ok(Box::new(ScriptHandler::new(
                        engine.clone(),
                        ast,
                        entry_point,
                    )));
                }
            }
            Err(ResolveError::EntryPointMissing(entry_point.to_string()))
        }
    }
}
