//! Document conversion collaborators.
//!
//! Markup-to-HTML conversion is not this program's business: it is delegated
//! to external tools invoked per page over stdin/stdout. The
//! [`DocumentConverter`] trait is the narrow seam — callers validate the
//! requested format pair against the converter's advertised lists, then hand
//! over the body and get back an output stream and an error stream. A
//! non-empty error stream (or empty output) is a *soft* failure: the caller
//! renders an error page instead of aborting the build.
//!
//! Two production implementations exist: [`PandocConverter`], which probes
//! `pandoc --list-input-formats`/`--list-output-formats` once at
//! construction, and [`AsciidoctorConverter`], whose format support is fixed.
//! Both are constructed in `main` and injected wherever pages are generated;
//! nothing in this crate holds a process-wide converter instance. Tests use
//! the recording mock in [`tests`].

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid {direction} format {format:?}, expected one of: {supported}")]
    UnsupportedFormat {
        direction: &'static str,
        format: String,
        supported: String,
    },
}

/// The two streams an external converter produces.
#[derive(Debug, Clone, Default)]
pub struct Conversion {
    pub output: String,
    pub errors: String,
}

impl Conversion {
    /// Soft-failure signal: nothing useful came out, or the tool complained.
    pub fn failed(&self) -> bool {
        self.output.trim().is_empty() || !self.errors.is_empty()
    }
}

/// External markup-to-markup conversion service.
pub trait DocumentConverter: Send + Sync {
    fn input_formats(&self) -> &[String];
    fn output_formats(&self) -> &[String];

    /// Convert `input` from `from` to `to`. `workdir` is the directory
    /// relative resources (images, includes) resolve against.
    fn convert(
        &self,
        input: &str,
        from: &str,
        to: &str,
        extra_args: &[String],
        workdir: Option<&Path>,
    ) -> Result<Conversion, ConvertError>;

    /// Validate a format pair against the advertised lists. Callers invoke
    /// this before [`DocumentConverter::convert`].
    fn check_formats(&self, from: &str, to: &str) -> Result<(), ConvertError> {
        if !self.input_formats().iter().any(|f| f == from) {
            return Err(ConvertError::UnsupportedFormat {
                direction: "input",
                format: from.to_string(),
                supported: self.input_formats().join(", "),
            });
        }
        if !self.output_formats().iter().any(|f| f == to) {
            return Err(ConvertError::UnsupportedFormat {
                direction: "output",
                format: to.to_string(),
                supported: self.output_formats().join(", "),
            });
        }
        Ok(())
    }
}

/// Run an external command, feeding `input` on stdin and capturing both
/// output streams. The stdin write happens on its own thread so a chatty
/// child can never deadlock against a full pipe.
fn run_command(
    program: &str,
    args: &[String],
    input: &[u8],
    workdir: Option<&Path>,
) -> std::io::Result<Conversion> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = workdir {
        command.current_dir(dir);
    }

    let mut child = command.spawn()?;
    let mut stdin = child.stdin.take().expect("stdin was piped");
    let payload = input.to_vec();
    let writer = std::thread::spawn(move || {
        // a closed pipe just means the child stopped reading early
        let _ = stdin.write_all(&payload);
    });

    let output = child.wait_with_output()?;
    let _ = writer.join();

    Ok(Conversion {
        output: String::from_utf8_lossy(&output.stdout).into_owned(),
        errors: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Pandoc-backed converter (markdown and most other markup formats).
pub struct PandocConverter {
    input_formats: Vec<String>,
    output_formats: Vec<String>,
}

impl PandocConverter {
    /// Probe the installed pandoc for its supported formats. Fails when
    /// pandoc is not on `PATH` — that is fatal to the run, not to a page.
    pub fn new() -> Result<Self, ConvertError> {
        Ok(Self {
            input_formats: Self::list_formats("--list-input-formats")?,
            output_formats: Self::list_formats("--list-output-formats")?,
        })
    }

    fn list_formats(flag: &str) -> Result<Vec<String>, ConvertError> {
        let listing = run_command("pandoc", &[flag.to_string()], b"", None)?;
        Ok(listing
            .output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }
}

impl DocumentConverter for PandocConverter {
    fn input_formats(&self) -> &[String] {
        &self.input_formats
    }

    fn output_formats(&self) -> &[String] {
        &self.output_formats
    }

    fn convert(
        &self,
        input: &str,
        from: &str,
        to: &str,
        extra_args: &[String],
        workdir: Option<&Path>,
    ) -> Result<Conversion, ConvertError> {
        let mut args = vec![format!("--from={from}"), format!("--to={to}")];
        args.extend(extra_args.iter().cloned());
        Ok(run_command("pandoc", &args, input.as_bytes(), workdir)?)
    }
}

/// Asciidoctor-backed converter. No probing interface exists, so the format
/// lists are fixed; a missing binary surfaces per page as a task error.
pub struct AsciidoctorConverter {
    input_formats: Vec<String>,
    output_formats: Vec<String>,
}

impl AsciidoctorConverter {
    pub fn new() -> Self {
        Self {
            input_formats: vec!["asciidoc".to_string()],
            output_formats: vec!["html5".to_string()],
        }
    }
}

impl Default for AsciidoctorConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentConverter for AsciidoctorConverter {
    fn input_formats(&self) -> &[String] {
        &self.input_formats
    }

    fn output_formats(&self) -> &[String] {
        &self.output_formats
    }

    fn convert(
        &self,
        input: &str,
        _from: &str,
        _to: &str,
        extra_args: &[String],
        workdir: Option<&Path>,
    ) -> Result<Conversion, ConvertError> {
        let mut args: Vec<String> = ["-o", "-", "-"].iter().map(|s| s.to_string()).collect();
        args.extend(extra_args.iter().cloned());
        Ok(run_command("asciidoctor", &args, input.as_bytes(), workdir)?)
    }
}
