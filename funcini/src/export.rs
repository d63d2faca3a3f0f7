//! render the functions of a program model into INI records and write them
//! out in one go.
//!
//! every function becomes one block:
//!
//! ```text
//! [main]
//! return=int
//! signature=int main(int argc, char** argv)
//! parameters[0]=argc|int
//! parameters[1]=argv|char**
//! ```
//!
//! nothing is escaped. a name containing `[`, `]`, `=`, `|` or a newline makes
//! the output ambiguous to readers; that is a property of the format.
use crate::error::{ExportError, HostModelError};
use crate::program::{ProgramFunction, ProgramModel};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::Builder;

/// append-only list of output lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportBuffer {
    lines: Vec<String>,
}

impl ExportBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, line: String) {
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// file contents: every line terminated by `\n`, empty for no lines
    pub fn to_text(&self) -> String {
        let capacity = self.lines.iter().map(|l| l.len() + 1).sum();
        let mut text = String::with_capacity(capacity);
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }
}

/// result of walking a model without touching the filesystem
#[derive(Debug, Clone)]
pub struct CollectedExport {
    pub buffer: ExportBuffer,
    pub functions: usize,
    /// true when the walk stopped before the model ran out of functions
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub functions: usize,
    pub lines: usize,
    pub cancelled: bool,
}

/// append the record block for one function.
///
/// all accessors are read before anything is appended, so a failing accessor
/// leaves the buffer as it was.
pub fn render_function(
    function: &dyn ProgramFunction,
    buffer: &mut ExportBuffer,
) -> Result<(), HostModelError> {
    let name = function.name()?;
    let return_type = function.return_type_name()?;
    let signature = function.prototype()?;
    let parameters = function.parameters()?;

    log::trace!("{:>12} {} ({} parameters)", "function", name, parameters.len());

    buffer.push(format!("[{}]", name));
    buffer.push(format!("return={}", return_type));
    buffer.push(format!("signature={}", signature));
    for p in &parameters {
        buffer.push(format!(
            "parameters[{}]={}|{}",
            p.ordinal, p.name, p.type_name
        ));
    }

    Ok(())
}

/// walk every function of the model in the model's order and render it.
///
/// `is_cancelled` is polled before each function; once it returns true the
/// walk stops and the functions not yet rendered are left out.
pub fn collect<M, C>(model: &M, is_cancelled: C) -> Result<CollectedExport, HostModelError>
where
    M: ProgramModel + ?Sized,
    C: Fn() -> bool,
{
    let mut buffer = ExportBuffer::new();
    let mut functions = 0;
    let mut cancelled = false;

    for function in model.functions()? {
        if is_cancelled() {
            log::debug!("cancelled after {} functions", functions);
            cancelled = true;
            break;
        }

        render_function(function, &mut buffer)?;
        functions += 1;
    }

    Ok(CollectedExport {
        buffer,
        functions,
        cancelled,
    })
}

/// writes function definitions of a program model to a fixed output path
#[derive(Debug, Clone)]
pub struct FunctionExporter {
    output_path: PathBuf,
}

impl FunctionExporter {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// collect everything into memory, then replace the output file with the
    /// result. a cancelled walk still writes the functions rendered so far.
    pub fn export<M, C>(&self, model: &M, is_cancelled: C) -> Result<ExportSummary, ExportError>
    where
        M: ProgramModel + ?Sized,
        C: Fn() -> bool,
    {
        log::debug!("export functions to {}", self.output_path.display());

        let collected = collect(model, is_cancelled)?;

        log::debug!(
            "rendered {} functions into {} lines",
            collected.functions,
            collected.buffer.len()
        );

        write_atomically(&self.output_path, &collected.buffer.to_text())?;

        log::info!(
            "wrote {} functions to {}{}",
            collected.functions,
            self.output_path.display(),
            if collected.cancelled {
                " (cancelled, output truncated)"
            } else {
                ""
            }
        );

        Ok(ExportSummary {
            path: self.output_path.clone(),
            functions: collected.functions,
            lines: collected.buffer.len(),
            cancelled: collected.cancelled,
        })
    }
}

/// export `model` to `output_path`, see [`FunctionExporter::export`]
pub fn export<M, C>(
    model: &M,
    output_path: impl AsRef<Path>,
    is_cancelled: C,
) -> Result<ExportSummary, ExportError>
where
    M: ProgramModel + ?Sized,
    C: Fn() -> bool,
{
    FunctionExporter::new(output_path.as_ref()).export(model, is_cancelled)
}

// write into a temp file next to the target and rename it over the target, so
// a failed write never leaves a half-written file at `path`. the result gets
// the permissions of the file it replaces, or those of a freshly created file.
fn write_atomically(path: &Path, text: &str) -> Result<(), ExportError> {
    let io_err = |source: std::io::Error| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut builder = Builder::new();
    builder.prefix(".funcini");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // umask applies, as for any new file
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }

    let mut tmp = builder.tempfile_in(dir).map_err(io_err)?;
    log::trace!("staging output in {}", tmp.path().display());

    if let Ok(existing) = std::fs::metadata(path) {
        tmp.as_file()
            .set_permissions(existing.permissions())
            .map_err(io_err)?;
    }

    tmp.write_all(text.as_bytes()).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    Ok(())
}
