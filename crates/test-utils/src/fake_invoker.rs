use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hotcompile::compiler::invoker::InvokeFuture;
use hotcompile::compiler::{ExternalToolInvoker, ToolError, ToolInvocation, ToolOutput};

/// What the fake compiler does for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeResponse {
    Output {
        stdout: String,
        stderr: String,
        exit_code: Option<i32>,
    },
    /// Behave as if the program could not be spawned.
    SpawnError(String),
    /// Behave as if the invocation hit its timeout.
    Timeout,
}

impl FakeResponse {
    /// Exit 0 with `stdout` as the generated code.
    pub fn ok(stdout: &str) -> Self {
        FakeResponse::Output {
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    /// Exit 1 with `stderr` as diagnostics.
    pub fn failing(stderr: &str) -> Self {
        FakeResponse::Output {
            stdout: String::new(),
            stderr: stderr.to_string(),
            exit_code: Some(1),
        }
    }

    fn into_result(self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        match self {
            FakeResponse::Output {
                stdout,
                stderr,
                exit_code,
            } => Ok(ToolOutput {
                stdout,
                stderr,
                exit_code,
            }),
            FakeResponse::SpawnError(msg) => Err(ToolError::Spawn {
                program: invocation.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, msg),
            }),
            FakeResponse::Timeout => Err(ToolError::TimedOut {
                program: invocation.program.clone(),
                timeout: invocation.timeout,
            }),
        }
    }
}

/// One recorded call.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Temp file passed to `compile`/`validate`.
    pub source_path: Option<PathBuf>,
    /// Content of `source_path` at the time of the call.
    pub source: Option<String>,
}

impl Invocation {
    pub fn subcommand(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or("")
    }

    /// Value following `--target`, if any.
    pub fn target(&self) -> Option<&str> {
        let idx = self.args.iter().position(|a| a == "--target")?;
        self.args.get(idx + 1).map(String::as_str)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }
}

type Responder = Arc<dyn Fn(&Invocation) -> FakeResponse + Send + Sync>;

#[derive(Default)]
struct Inner {
    scripted: VecDeque<FakeResponse>,
    invocations: Vec<Invocation>,
    active: usize,
    max_active: usize,
}

/// A fake compiler that:
/// - records every invocation together with the temp file content it saw
/// - answers `--version` unless told the toolchain is missing
/// - replies from a script queue, then from a responder, then with success
/// - tracks how many invocations overlapped
#[derive(Clone)]
pub struct FakeInvoker {
    inner: Arc<Mutex<Inner>>,
    responder: Option<Responder>,
    delay: Duration,
    missing_toolchain: bool,
}

impl std::fmt::Debug for FakeInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeInvoker")
            .field("delay", &self.delay)
            .field("missing_toolchain", &self.missing_toolchain)
            .finish_non_exhaustive()
    }
}

impl Default for FakeInvoker {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeInvoker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            responder: None,
            delay: Duration::ZERO,
            missing_toolchain: false,
        }
    }

    /// Every call sleeps this long (virtual time under `start_paused`).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Compute the reply from the call itself once the script is exhausted.
    pub fn with_responder(
        mut self,
        f: impl Fn(&Invocation) -> FakeResponse + Send + Sync + 'static,
    ) -> Self {
        self.responder = Some(Arc::new(f));
        self
    }

    /// `--version` fails as if the binary did not exist.
    pub fn missing_toolchain(mut self) -> Self {
        self.missing_toolchain = true;
        self
    }

    /// Queue a reply for the next non-version call.
    pub fn push_response(&self, response: FakeResponse) {
        self.inner.lock().unwrap().scripted.push_back(response);
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.inner.lock().unwrap().invocations.clone()
    }

    /// Recorded `compile` calls only.
    pub fn compile_calls(&self) -> Vec<Invocation> {
        self.invocations()
            .into_iter()
            .filter(|i| i.subcommand() == "compile")
            .collect()
    }

    /// Highest number of calls that were running at the same time.
    pub fn max_concurrent(&self) -> usize {
        self.inner.lock().unwrap().max_active
    }

    fn next_response(&self, call: &Invocation) -> FakeResponse {
        if call.subcommand() == "--version" {
            return if self.missing_toolchain {
                FakeResponse::SpawnError("No such file or directory".to_string())
            } else {
                FakeResponse::ok("wcc 0.9.0")
            };
        }

        let scripted = self.inner.lock().unwrap().scripted.pop_front();
        match (scripted, &self.responder) {
            (Some(resp), _) => resp,
            (None, Some(responder)) => responder(call),
            (None, None) => FakeResponse::ok("// compiled"),
        }
    }
}

impl ExternalToolInvoker for FakeInvoker {
    fn invoke<'a>(&'a self, invocation: &'a ToolInvocation) -> InvokeFuture<'a> {
        Box::pin(async move {
            let args: Vec<String> = invocation
                .args
                .iter()
                .map(|a| a.to_string_lossy().into_owned())
                .collect();
            let source_path = match args.first().map(String::as_str) {
                Some("compile") | Some("validate") => args.get(1).map(PathBuf::from),
                _ => None,
            };
            let source = source_path
                .as_ref()
                .and_then(|p| std::fs::read_to_string(p).ok());

            let call = Invocation {
                program: invocation.program.clone(),
                args,
                source_path,
                source,
            };
            let response = self.next_response(&call);

            {
                let mut inner = self.inner.lock().unwrap();
                inner.invocations.push(call);
                inner.active += 1;
                inner.max_active = inner.max_active.max(inner.active);
            }

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            self.inner.lock().unwrap().active -= 1;
            response.into_result(invocation)
        })
    }
}
