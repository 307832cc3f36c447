use std::io::{self, Read};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::error::LookupError;
use crate::hostname::NormalizedHostname;
use crate::record::RawRecord;

pub const DEFAULT_WHOIS_BIN: &str = "whois";

/// Exit status, stdout and stderr of a finished tool.
type ToolOutput = (ExitStatus, Vec<u8>, Vec<u8>);

/// Source of raw registration records.
///
/// Implementations may block for as long as the lookup takes.
pub trait LookupGateway {
    fn lookup(&self, hostname: &NormalizedHostname) -> Result<RawRecord, LookupError>;
}

impl<T: LookupGateway + ?Sized> LookupGateway for &T {
    fn lookup(&self, hostname: &NormalizedHostname) -> Result<RawRecord, LookupError> {
        (**self).lookup(hostname)
    }
}

/// Runs the system WHOIS client as a child process.
#[derive(Debug, Clone)]
pub struct WhoisCommand {
    program: String,
    extra_args: Vec<String>,
    server: Option<String>,
    port: Option<u16>,
    timeout: Option<Duration>,
}

impl Default for WhoisCommand {
    fn default() -> Self {
        Self::new(DEFAULT_WHOIS_BIN)
    }
}

impl WhoisCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
            server: None,
            port: None,
            timeout: None,
        }
    }

    /// Arguments placed before everything else on the command line.
    pub fn with_extra_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Ask a specific WHOIS server instead of letting the tool pick one.
    pub fn with_server(mut self, server: Option<String>) -> Self {
        self.server = server;
        self
    }

    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    /// Kill the tool if it has not exited after `timeout`. `None` waits forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Full argument list for a lookup of `hostname`.
    pub fn command_args(&self, hostname: &NormalizedHostname) -> Vec<String> {
        let mut args = self.extra_args.clone();
        if let Some(server) = &self.server {
            args.push("-h".to_string());
            args.push(server.clone());
        }
        if let Some(port) = self.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        args.push(hostname.as_str().to_string());
        args
    }

    fn spawn(&self, hostname: &NormalizedHostname) -> Result<Child, LookupError> {
        let args = self.command_args(hostname);
        tracing::debug!(program = %self.program, ?args, "running lookup tool");

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // a bounded lookup may have to kill whatever the tool started as well
        #[cfg(unix)]
        if self.timeout.is_some() {
            command.process_group(0);
        }

        command.spawn().map_err(|source| LookupError::Spawn {
            program: self.program.clone(),
            source,
        })
    }

    fn io_error(&self, source: io::Error) -> LookupError {
        LookupError::Io {
            program: self.program.clone(),
            source,
        }
    }

    /// Wait for the child while draining its pipes, killing it once
    /// `timeout` passes. The pipe readers are joined on every path.
    fn wait_bounded(
        &self,
        mut child: Child,
        timeout: Duration,
    ) -> Result<ToolOutput, LookupError> {
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        thread::scope(|scope| -> Result<ToolOutput, LookupError> {
            let stdout_reader = scope.spawn(move || read_pipe(stdout));
            let stderr_reader = scope.spawn(move || read_pipe(stderr));

            let waited = match child.wait_timeout(timeout) {
                Ok(Some(status)) => Ok(status),
                Ok(None) => {
                    tracing::warn!(program = %self.program, ?timeout, "lookup timed out, killing tool");
                    Err(LookupError::TimedOut {
                        program: self.program.clone(),
                        timeout,
                    })
                }
                Err(source) => Err(self.io_error(source)),
            };
            if waited.is_err() {
                terminate(&mut child);
            }

            // readers finish once every process holding the pipes is gone
            let stdout = join_reader(stdout_reader);
            let stderr = join_reader(stderr_reader);

            let status = waited?;
            let stdout = stdout.map_err(|e| self.io_error(e))?;
            let stderr = stderr.map_err(|e| self.io_error(e))?;
            Ok((status, stdout, stderr))
        })
    }
}

/// Kill the tool together with its process group, then reap it.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        let pgid = child.id() as libc::pid_t;
        // SAFETY: plain signal delivery; the group was created at spawn and
        // its leader is not reaped yet, so the id cannot have been reused.
        unsafe {
            libc::kill(-pgid, libc::SIGKILL);
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child.kill();
    }
    let _ = child.wait();
}

impl LookupGateway for WhoisCommand {
    fn lookup(&self, hostname: &NormalizedHostname) -> Result<RawRecord, LookupError> {
        let child = self.spawn(hostname)?;

        let (status, stdout, stderr) = match self.timeout {
            Some(timeout) => self.wait_bounded(child, timeout)?,
            None => {
                let output = child.wait_with_output().map_err(|e| self.io_error(e))?;
                (output.status, output.stdout, output.stderr)
            }
        };

        if !status.success() {
            return Err(LookupError::ToolFailed {
                program: self.program.clone(),
                status,
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }

        let record = RawRecord::new(String::from_utf8_lossy(&stdout));
        if record.is_blank() {
            return Err(LookupError::EmptyResponse);
        }

        tracing::info!(hostname = %hostname, bytes = stdout.len(), "lookup completed");
        Ok(record)
    }
}

fn read_pipe<R: Read>(pipe: Option<R>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf)?;
    }
    Ok(buf)
}

fn join_reader(handle: thread::ScopedJoinHandle<'_, io::Result<Vec<u8>>>) -> io::Result<Vec<u8>> {
    handle
        .join()
        .unwrap_or_else(|_| Err(io::Error::other("pipe reader panicked")))
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::hostname::normalize;

    fn host(name: &str) -> NormalizedHostname {
        normalize(name).unwrap()
    }

    /// `sh -c <script> whois <hostname>`, so the script sees the hostname as `$1`.
    #[cfg(unix)]
    fn shell(script: &str) -> WhoisCommand {
        WhoisCommand::new("sh").with_extra_args(["-c", script, "whois"])
    }

    #[test]
    fn test_command_args_plain() {
        let cmd = WhoisCommand::default();
        assert_eq!(cmd.program(), "whois");
        assert_eq!(cmd.command_args(&host("example.com")), vec!["example.com"]);
    }

    #[test]
    fn test_command_args_with_server_and_port() {
        let cmd = WhoisCommand::default()
            .with_server(Some("whois.verisign-grs.com".to_string()))
            .with_port(Some(4343));
        assert_eq!(
            cmd.command_args(&host("example.com")),
            vec!["-h", "whois.verisign-grs.com", "-p", "4343", "example.com"]
        );
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let cmd = WhoisCommand::new("whois-lens-definitely-not-installed");
        let err = cmd.lookup(&host("example.com")).unwrap_err();
        assert!(matches!(err, LookupError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_lookup_returns_stdout() {
        let cmd = shell(r#"printf 'Domain Name: %s\nRegistrant Country: US\n' "$1""#);
        let record = cmd.lookup(&host("www.example.com")).unwrap();
        assert_eq!(record.as_str(), "Domain Name: example.com\nRegistrant Country: US\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_no_output_is_empty_response() {
        let err = shell("exit 0").lookup(&host("example.com")).unwrap_err();
        assert!(matches!(err, LookupError::EmptyResponse));
    }

    #[cfg(unix)]
    #[test]
    fn test_whitespace_output_is_empty_response() {
        let err = shell(r#"printf '  \n\t\n'"#).lookup(&host("example.com")).unwrap_err();
        assert!(matches!(err, LookupError::EmptyResponse));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_tool_failure() {
        let err = shell("echo 'connect: Connection refused' >&2; exit 2")
            .lookup(&host("example.com"))
            .unwrap_err();
        match err {
            LookupError::ToolFailed { stderr, status, .. } => {
                assert_eq!(stderr, "connect: Connection refused");
                assert_eq!(status.code(), Some(2));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_hung_tool() {
        let started = Instant::now();
        let err = shell("exec sleep 10")
            .with_timeout(Some(Duration::from_millis(200)))
            .lookup(&host("example.com"))
            .unwrap_err();
        assert!(matches!(err, LookupError::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_background_children_holding_the_pipe() {
        let started = Instant::now();
        let err = shell("sleep 30 & wait")
            .with_timeout(Some(Duration::from_millis(200)))
            .lookup(&host("example.com"))
            .unwrap_err();
        assert!(matches!(err, LookupError::TimedOut { .. }));
        // the readers were joined, so the background sleep had to die too
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn test_timed_out_tool_leaves_no_process_behind() {
        let pid_file = std::env::temp_dir().join(format!("whois-lens-bg-{}.pid", std::process::id()));
        let script = format!("sleep 30 & echo $! > '{}'; wait", pid_file.display());
        let err = shell(&script)
            .with_timeout(Some(Duration::from_millis(300)))
            .lookup(&host("example.com"))
            .unwrap_err();
        assert!(matches!(err, LookupError::TimedOut { .. }));

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let _ = std::fs::remove_file(&pid_file);
        let proc_dir = std::path::Path::new("/proc").join(pid.trim());
        // gone, or a zombie waiting for init to reap it
        let alive = std::fs::read_to_string(proc_dir.join("stat"))
            .map(|stat| !stat.contains(") Z "))
            .unwrap_or(false);
        assert!(!alive);
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_not_reached() {
        let record = shell(r#"echo "Creation Date: 2001-02-03""#)
            .with_timeout(Some(Duration::from_secs(10)))
            .lookup(&host("example.com"))
            .unwrap();
        assert_eq!(record.as_str().trim(), "Creation Date: 2001-02-03");
    }

    #[cfg(unix)]
    #[test]
    fn test_bounded_wait_drains_large_output() {
        // more than a pipe buffer, so the child would block if nobody read it
        let record = shell("i=0; while [ $i -lt 5000 ]; do echo 'Registrar: Example Registrar, Inc.'; i=$((i+1)); done")
            .with_timeout(Some(Duration::from_secs(20)))
            .lookup(&host("example.com"))
            .unwrap();
        assert_eq!(record.as_str().lines().count(), 5000);
    }
}
