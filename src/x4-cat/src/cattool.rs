//! External catalog tool
//!
//! Invoked as
//! `<tool> -in <archives...> -out <dir> [-include <patterns...>] [-exclude <patterns...>]`.
//! The run is bounded: once the timeout passes the child is killed and the
//! extraction fails.

use crate::extractor::{ArchiveExtractor, ExtractRequest};
use crate::{Error, Result};
use std::ffi::OsString;
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct CatTool {
    executable: PathBuf,
    launcher: Option<PathBuf>,
    timeout: Duration,
}

impl CatTool {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            launcher: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the tool through another program, e.g. `wine`
    pub fn with_launcher(mut self, launcher: impl Into<PathBuf>) -> Self {
        self.launcher = Some(launcher.into());
        self
    }

    pub fn executable(&self) -> &PathBuf {
        &self.executable
    }

    /// Tool arguments for a request
    pub fn arguments(request: &ExtractRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-in".into()];
        args.extend(request.archives.iter().map(|a| a.clone().into_os_string()));
        args.push("-out".into());
        args.push(request.output.clone().into_os_string());
        if !request.include.is_empty() {
            args.push("-include".into());
            args.extend(request.include.iter().map(OsString::from));
        }
        if !request.exclude.is_empty() {
            args.push("-exclude".into());
            args.extend(request.exclude.iter().map(OsString::from));
        }
        args
    }

    fn command(&self) -> Command {
        match &self.launcher {
            Some(launcher) => {
                let mut command = Command::new(launcher);
                command.arg(&self.executable);
                command
            }
            None => Command::new(&self.executable),
        }
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                // The child may exit between the check and the kill
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::Timeout(self.timeout));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl ArchiveExtractor for CatTool {
    fn preflight(&self) -> Result<()> {
        if !self.executable.is_file() {
            return Err(Error::ToolMissing(self.executable.clone()));
        }
        Ok(())
    }

    fn extract(&self, request: &ExtractRequest) -> Result<()> {
        self.preflight()?;
        if request.archives.is_empty() {
            return Err(Error::NoArchives);
        }
        fs::create_dir_all(&request.output)?;

        let mut child = self
            .command()
            .args(Self::arguments(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::Spawn {
                path: self.executable.clone(),
                source,
            })?;

        // Drain both pipes so a chatty tool cannot block on a full buffer
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = self.wait(&mut child)?;
        let _ = stdout.join();
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            return Err(Error::ToolFailed {
                status: status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut bytes);
        }
        String::from_utf8_lossy(&bytes).into_owned()
    })
}
