//! Running a generated pipeline with `nextflow`.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use tracing::{debug, info};

use crate::error::{Error, Result};

/// Default env-file, relative to the home directory.
pub const DEFAULT_ENV_FILE: &str = ".sge_env";

/// Runs `nextflow run main.nf` inside a pipeline directory.
#[derive(Debug, Clone)]
pub struct PipelineRunner {
    location: PathBuf,
    program: Option<PathBuf>,
    env_file: Option<PathBuf>,
    profile: Option<String>,
    resume: bool,
    ansi_log: bool,
}

impl PipelineRunner {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            program: None,
            env_file: dirs::home_dir().map(|home| home.join(DEFAULT_ENV_FILE)),
            profile: None,
            resume: false,
            ansi_log: false,
        }
    }

    /// Use this executable instead of `nextflow` from PATH.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    pub fn with_env_file(mut self, env_file: Option<PathBuf>) -> Self {
        self.env_file = env_file;
        self
    }

    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    /// Keep Nextflow's interactive log instead of plain lines.
    pub fn with_ansi_log(mut self, ansi_log: bool) -> Self {
        self.ansi_log = ansi_log;
        self
    }

    /// Arguments passed to the program.
    pub fn arguments(&self) -> Vec<String> {
        let mut args = vec!["run".to_string(), "main.nf".to_string()];
        if let Some(profile) = &self.profile {
            args.push("-profile".to_string());
            args.push(profile.clone());
        }
        if self.resume {
            args.push("-resume".to_string());
        }
        args
    }

    fn find_program(&self) -> Result<PathBuf> {
        if let Some(program) = &self.program {
            return Ok(program.clone());
        }
        which::which("nextflow")
            .map_err(|_| Error::Runner("nextflow not found in PATH".to_string()))
    }

    /// Run the pipeline, handing every stdout line to `on_line`.
    ///
    /// Blocks until the program exits.
    pub fn run(&self, mut on_line: impl FnMut(&str)) -> Result<ExitStatus> {
        let program = self.find_program()?;
        let env = match &self.env_file {
            Some(path) => load_env_file(path)?,
            None => Vec::new(),
        };

        info!("Running {} in {}", program.display(), self.location.display());
        let mut child = Command::new(&program)
            .args(self.arguments())
            .current_dir(&self.location)
            .envs(env)
            .env("NXF_ANSI_LOG", self.ansi_log.to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Error::Runner(format!("Failed to run {}: {}", program.display(), e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Runner("Failed to capture output".to_string()))?;
        for line in BufReader::new(stdout).lines() {
            on_line(&line?);
        }

        let status = child.wait()?;
        if !status.success() {
            return Err(Error::Runner(format!(
                "{} exited with {}",
                program.display(),
                status
            )));
        }
        Ok(status)
    }
}

/// Read `KEY=VALUE` lines. A missing file is empty.
///
/// Blank lines and `#` comments are skipped, an `export ` prefix is
/// allowed and values may be quoted.
pub fn load_env_file(path: &Path) -> Result<Vec<(String, String)>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No env-file at {}", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut vars = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            debug!("Ignoring env-file line '{}'", line);
            continue;
        };
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
            .unwrap_or(value);
        vars.push((key.trim().to_string(), value.to_string()));
    }
    Ok(vars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_env_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("env");
        fs::write(
            &path,
            "# cluster\nSGE_ROOT=/opt/sge\n\nexport QUEUE=\"all.q\"\nbroken line\nEMPTY=\n",
        )
        .unwrap();

        let vars = load_env_file(&path).unwrap();
        assert_eq!(
            vars,
            vec![
                ("SGE_ROOT".to_string(), "/opt/sge".to_string()),
                ("QUEUE".to_string(), "all.q".to_string()),
                ("EMPTY".to_string(), String::new()),
            ]
        );
        assert!(load_env_file(&temp.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_arguments() {
        let runner = PipelineRunner::new("/tmp/p")
            .with_profile(Some("cluster".to_string()))
            .with_resume(true);
        assert_eq!(runner.arguments(), vec!["run", "main.nf", "-profile", "cluster", "-resume"]);
    }

    // `sh run main.nf ...` executes the `run` script of the pipeline directory.
    #[cfg(unix)]
    #[test]
    fn test_run_streams_lines() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("run"),
            "echo \"args: $*\"\necho \"ansi=$NXF_ANSI_LOG queue=$QUEUE\"\n",
        )
        .unwrap();
        let env_file = temp.path().join("env");
        fs::write(&env_file, "QUEUE=short\n").unwrap();

        let mut lines = Vec::new();
        PipelineRunner::new(temp.path())
            .with_program("sh")
            .with_env_file(Some(env_file))
            .run(|line| lines.push(line.to_string()))
            .unwrap();
        assert_eq!(lines, vec!["args: main.nf", "ansi=false queue=short"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_is_an_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("run"), "exit 3\n").unwrap();
        let result = PipelineRunner::new(temp.path())
            .with_program("sh")
            .with_env_file(None)
            .run(|_| {});
        assert!(matches!(result, Err(Error::Runner(_))));
    }
}
