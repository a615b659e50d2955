use crate::error::{GradeError, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Runs an external compiler over one source file and hands back its
/// diagnostic stream.
pub trait CompilerInvoker {
    fn diagnostics(&self, source: &Path, include_paths: &[String], cwd: &Path) -> Result<String>;
}

/// A clang/gcc-compatible compiler run in syntax-only mode with `-Wall`.
pub struct ProcessCompiler {
    program: PathBuf,
}

impl ProcessCompiler {
    /// Locate `program` on `PATH`.
    pub fn detect(program: &str) -> Result<Self> {
        let program = which::which(program)
            .map_err(|_| GradeError::Spawn(format!("compiler '{program}' (not on PATH)")))?;
        Ok(Self { program })
    }
}

impl CompilerInvoker for ProcessCompiler {
    fn diagnostics(&self, source: &Path, include_paths: &[String], cwd: &Path) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-Wall", "-fsyntax-only"]);
        for inc in include_paths {
            cmd.arg("-I").arg(inc);
        }
        let output = cmd
            .arg(source)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| GradeError::Spawn(format!("{}: {e}", self.program.display())))?;
        // Compile errors are expected; the caller only wants the diagnostics.
        Ok(String::from_utf8_lossy(&output.stderr).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_unknown_compiler_fails() {
        let err = ProcessCompiler::detect("definitely-not-a-compiler-xyz").err().unwrap();
        assert!(matches!(err, GradeError::Spawn(_)));
    }
}
