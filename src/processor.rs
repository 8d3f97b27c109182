//! Rule-set orchestration over documents, files and directory trees.
//!
//! Rules run in file order against every document of a file. A rule that
//! fails to find its target is skipped when it opts into
//! `continue_on_not_found`; any other failure aborts the file. Files are
//! written atomically and only when the rendered text differs from what is
//! already on disk.

use crate::codec::{CodecError, Format, Stream};
use crate::engine::{self, EngineError};
use crate::rules::{load_from_path, Action, ConfigError, RuleSet};
use crate::tree::Tree;
use log::{debug, info, warn};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// What happened to one rule in one document.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "RuleOutcome should be checked for skipped rules"]
pub enum RuleOutcome {
    Applied {
        rule: usize,
        document: usize,
        changed: usize,
    },
    /// Target missing and the rule allows it.
    Skipped {
        rule: usize,
        document: usize,
        reason: String,
    },
}

impl RuleOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, RuleOutcome::Skipped { .. })
    }
}

impl fmt::Display for RuleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleOutcome::Applied {
                rule,
                document,
                changed,
            } => write!(
                f,
                "rule #{} changed {} node(s) in document {}",
                rule + 1,
                changed,
                document + 1
            ),
            RuleOutcome::Skipped {
                rule,
                document,
                reason,
            } => write!(
                f,
                "rule #{} skipped in document {}: {}",
                rule + 1,
                document + 1,
                reason
            ),
        }
    }
}

/// A rule that stopped the run.
#[derive(Error, Debug, Clone)]
#[error("rule #{} ({action} '{path}') in document {}: {source}", .index + 1, .document + 1)]
pub struct RuleFailure {
    pub index: usize,
    pub document: usize,
    pub action: Action,
    pub path: String,
    #[source]
    pub source: EngineError,
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", .path.display())]
    Codec {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("{}: {failure}", .path.display())]
    Rule {
        path: PathBuf,
        #[source]
        failure: RuleFailure,
    },

    #[error("unsupported file type: {}", .path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("not a directory: {}", .path.display())]
    NotADirectory { path: PathBuf },

    #[error("walk directory: {0}")]
    Walk(#[from] walkdir::Error),
}

impl ProcessError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        ProcessError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Render but never touch the file system.
    pub dry_run: bool,
    /// Keep `<file>.bak` next to files edited in place.
    pub backup: bool,
}

/// Result of processing one file.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub outcomes: Vec<RuleOutcome>,
    pub original: String,
    pub rendered: String,
    pub written: bool,
    pub backup: Option<PathBuf>,
}

impl FileReport {
    pub fn changed(&self) -> bool {
        self.original != self.rendered
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: Vec<FileReport>,
    pub failed: Vec<(PathBuf, ProcessError)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Processor {
    rules: RuleSet,
}

impl Processor {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// Load and validate a rule file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_from_path(path).map(Self::new)
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Apply every rule to one document tree. No rollback on failure: rules
    /// applied before the failing one stay applied.
    pub fn apply_tree(
        &self,
        tree: &mut Tree,
        document: usize,
    ) -> Result<Vec<RuleOutcome>, RuleFailure> {
        let mut outcomes = Vec::with_capacity(self.rules.rules.len());
        for (index, rule) in self.rules.rules.iter().enumerate() {
            match engine::apply(tree, rule) {
                Ok(changed) => outcomes.push(RuleOutcome::Applied {
                    rule: index,
                    document,
                    changed,
                }),
                Err(err) if rule.continue_on_not_found && err.is_not_found() => {
                    warn!(
                        "skipping rule #{} ({} '{}'): {}",
                        index + 1,
                        rule.action,
                        rule.path,
                        err
                    );
                    outcomes.push(RuleOutcome::Skipped {
                        rule: index,
                        document,
                        reason: err.to_string(),
                    });
                }
                Err(source) => {
                    return Err(RuleFailure {
                        index,
                        document,
                        action: rule.action,
                        path: rule.path.clone(),
                        source,
                    })
                }
            }
        }
        Ok(outcomes)
    }

    pub fn apply_stream(&self, stream: &mut Stream) -> Result<Vec<RuleOutcome>, RuleFailure> {
        let mut outcomes = Vec::new();
        for (document, tree) in stream.documents.iter_mut().enumerate() {
            outcomes.extend(self.apply_tree(tree, document)?);
        }
        Ok(outcomes)
    }

    /// Patch `input` and write the result to `output` (in place when `None`).
    pub fn process_file(
        &self,
        input: &Path,
        output: Option<&Path>,
        options: ProcessOptions,
    ) -> Result<FileReport, ProcessError> {
        let format = Format::from_path(input).ok_or_else(|| ProcessError::UnsupportedFormat {
            path: input.to_path_buf(),
        })?;
        let output = output.unwrap_or(input);
        let in_place = output == input;

        let original = fs::read_to_string(input).map_err(|e| ProcessError::io(input, e))?;
        let mut stream =
            Stream::parse(&original, format).map_err(|source| ProcessError::Codec {
                path: input.to_path_buf(),
                source,
            })?;
        let outcomes = self
            .apply_stream(&mut stream)
            .map_err(|failure| ProcessError::Rule {
                path: input.to_path_buf(),
                failure,
            })?;
        let rendered = stream.render().map_err(|source| ProcessError::Codec {
            path: input.to_path_buf(),
            source,
        })?;

        let mut report = FileReport {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            outcomes,
            original,
            rendered,
            written: false,
            backup: None,
        };

        if options.dry_run {
            debug!("dry run: {} not written", output.display());
            return Ok(report);
        }

        let current = if in_place {
            Some(report.original.clone())
        } else {
            fs::read_to_string(output).ok()
        };
        if current.as_deref() == Some(report.rendered.as_str()) {
            debug!("{} unchanged", output.display());
            return Ok(report);
        }

        if in_place && options.backup {
            let backup = backup_path(input);
            fs::copy(input, &backup).map_err(|e| ProcessError::io(&backup, e))?;
            report.backup = Some(backup);
        }
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ProcessError::io(parent, e))?;
        }
        atomic_write(output, report.rendered.as_bytes())
            .map_err(|e| ProcessError::io(output, e))?;
        report.written = true;
        info!("patched {}", output.display());

        Ok(report)
    }

    /// Patch every `.yaml`/`.yml`/`.json` file under `input_dir`.
    ///
    /// With `output_dir`, relative paths are mirrored there; otherwise files
    /// are edited in place. A failing file is recorded and the walk goes on.
    pub fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: Option<&Path>,
        options: ProcessOptions,
    ) -> Result<BatchReport, ProcessError> {
        if !input_dir.is_dir() {
            return Err(ProcessError::NotADirectory {
                path: input_dir.to_path_buf(),
            });
        }

        let mut report = BatchReport::default();
        let mut files = Vec::new();
        for entry in WalkDir::new(input_dir).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(input_dir).to_path_buf();
                    report.total += 1;
                    report.failed.push((path, ProcessError::Walk(err)));
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || Format::from_path(path).is_none() {
                continue;
            }
            if output_dir.is_some_and(|out| path.starts_with(out)) {
                continue;
            }
            files.push(path.to_path_buf());
        }

        for path in files {
            report.total += 1;
            let target = match output_dir {
                Some(out) => match path.strip_prefix(input_dir) {
                    Ok(relative) => out.join(relative),
                    Err(_) => out.join(path.file_name().unwrap_or(path.as_os_str())),
                },
                None => path.clone(),
            };
            match self.process_file(&path, Some(&target), options) {
                Ok(file) => report.succeeded.push(file),
                Err(err) => {
                    warn!("{err}");
                    report.failed.push((path, err));
                }
            }
        }

        info!(
            "processed {} file(s): {} succeeded, {} failed",
            report.total,
            report.succeeded.len(),
            report.failed.len()
        );
        Ok(report)
    }
}

/// `<file>.bak` next to `path`.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Tempfile in the destination directory, fsync, rename.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
