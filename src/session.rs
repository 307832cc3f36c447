use std::io::{self, BufRead, Write};

use crate::error::LookupError;
use crate::hostname::{normalize, NormalizedHostname};
use crate::lookup::LookupGateway;
use crate::record::{ParsedRecord, RawRecord, RecordParser};
use crate::report::Presenter;

/// Result of one lookup: either the record and what was parsed from it,
/// or the reason there is no record.
#[derive(Debug)]
pub enum QueryOutcome {
    Success { raw: RawRecord, parsed: ParsedRecord },
    Failure(LookupError),
}

/// Where the interactive loop currently is. Each state owns exactly the
/// data the next step needs; nothing survives a return to `AwaitingInput`.
#[derive(Debug)]
enum LoopState {
    AwaitingInput,
    Normalizing(String),
    LookingUp(NormalizedHostname),
    Parsing(NormalizedHostname, RawRecord),
    Presenting(NormalizedHostname, QueryOutcome),
    Done,
}

/// Counters reported when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Non-empty input lines read.
    pub queries: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Inputs that did not normalize to a hostname.
    pub rejected: usize,
}

/// Prompt, normalize, look up, parse, present, repeat until blank input.
pub struct QueryLoop<G> {
    gateway: G,
    presenter: Presenter,
}

impl<G: LookupGateway> QueryLoop<G> {
    pub fn new(gateway: G, presenter: Presenter) -> Self {
        Self { gateway, presenter }
    }

    /// Drive the session until blank input or end of input.
    ///
    /// Per-query failures are written to `output` and the loop carries on;
    /// only I/O errors on `input`/`output` end it early.
    pub fn run<R: BufRead, W: Write>(&self, mut input: R, mut output: W) -> io::Result<SessionSummary> {
        let mut summary = SessionSummary::default();
        let mut state = LoopState::AwaitingInput;

        loop {
            state = match state {
                LoopState::AwaitingInput => self.await_input(&mut input, &mut output)?,
                LoopState::Normalizing(line) => {
                    summary.queries += 1;
                    match normalize(&line) {
                        Some(hostname) => LoopState::LookingUp(hostname),
                        None => {
                            tracing::warn!(input = line.trim(), "rejected input");
                            summary.rejected += 1;
                            writeln!(output, "{}", self.presenter.invalid_input(&line))?;
                            LoopState::AwaitingInput
                        }
                    }
                }
                LoopState::LookingUp(hostname) => match self.gateway.lookup(&hostname) {
                    Ok(raw) => LoopState::Parsing(hostname, raw),
                    Err(err) => {
                        tracing::warn!(hostname = %hostname, error = %err, "lookup failed");
                        LoopState::Presenting(hostname, QueryOutcome::Failure(err))
                    }
                },
                LoopState::Parsing(hostname, raw) => {
                    let parsed = RecordParser::parse(&raw);
                    tracing::debug!(hostname = %hostname, ?parsed, "parsed record");
                    LoopState::Presenting(hostname, QueryOutcome::Success { raw, parsed })
                }
                LoopState::Presenting(hostname, outcome) => {
                    let text = match &outcome {
                        QueryOutcome::Success { raw, parsed } => {
                            summary.succeeded += 1;
                            self.presenter.record(&hostname, raw, parsed)
                        }
                        QueryOutcome::Failure(err) => {
                            summary.failed += 1;
                            self.presenter.lookup_failure(&hostname, err)
                        }
                    };
                    writeln!(output, "{}", text)?;
                    writeln!(output)?;
                    LoopState::AwaitingInput
                }
                LoopState::Done => break,
            };
        }

        output.flush()?;
        Ok(summary)
    }

    fn await_input<R: BufRead, W: Write>(&self, input: &mut R, output: &mut W) -> io::Result<LoopState> {
        write!(output, "{}", self.presenter.prompt())?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            // end of input behaves like a blank line
            writeln!(output)?;
            return Ok(LoopState::Done);
        }

        if line.trim().is_empty() {
            Ok(LoopState::Done)
        } else {
            Ok(LoopState::Normalizing(line))
        }
    }
}
