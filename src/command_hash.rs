//! Compiler-check command execution with output hashing.
//!
//! A check command (e.g. `"%compiler% --version"`) is run with its stdout
//! and stderr merged into a single pipe, and every byte the child writes is
//! absorbed into the caller's hash in delivery order. The pipe is drained
//! to EOF *before* the child is reaped, so a child that writes more than
//! one pipe buffer never deadlocks, and every child is waited on, so none
//! is left as a zombie.
//!
//! Failure handling follows the cache's needs rather than symmetry: a
//! command that cannot be spawned, exits non-zero, or whose output cannot
//! be fully read just makes the check fail (`false`; the caller discards
//! the key material). A failed `pipe(2)`, on the other hand, means the
//! process environment itself is broken and no cache decision can be
//! trusted, so it aborts with a diagnostic.

use std::io::{self, Read};
use std::process::{Command, Stdio};

use crate::command_args::split_command;
use crate::entropy::EntropySink;

/// Argument that is replaced by the configured compiler path.
const COMPILER_PLACEHOLDER: &str = "%compiler%";

const READ_CHUNK: usize = 64 * 1024;

/// How a check command will be launched.
enum Invocation {
    /// Direct spawn of a tokenized argument vector.
    Argv(Vec<String>),
    /// Routed through `cmd.exe /c`, which parses the command string itself.
    #[cfg(windows)]
    Shell(String),
}

/// Tokenizes and resolves a command string, or `None` when it is empty.
fn build_invocation(command: &str, compiler: &str) -> Option<Invocation> {
    #[cfg(windows)]
    {
        // `echo` is a cmd.exe builtin, not an executable; commands that rely
        // on it must go through the interpreter. This carve-out is a semantic
        // branch: the interpreter parses the raw string with its own rules.
        let trimmed = command.trim_start();
        if trimmed.starts_with("echo") {
            return Some(Invocation::Shell(trimmed.to_string()));
        }
        if compiler == "echo" {
            if let Some(rest) = trimmed.strip_prefix(COMPILER_PLACEHOLDER) {
                return Some(Invocation::Shell(format!("{compiler}{rest}")));
            }
        }
    }

    let mut argv = split_command(command);
    if argv.is_empty() {
        return None;
    }
    for arg in &mut argv {
        if arg == COMPILER_PLACEHOLDER {
            *arg = compiler.to_string();
        }
    }
    Some(Invocation::Argv(argv))
}

impl Invocation {
    fn to_command(&self) -> Command {
        match self {
            Self::Argv(argv) => {
                let mut cmd = Command::new(&argv[0]);
                cmd.args(&argv[1..]);
                cmd
            }
            #[cfg(windows)]
            Self::Shell(cmdline) => {
                let mut cmd = Command::new("cmd.exe");
                cmd.arg("/c").arg(cmdline);
                cmd
            }
        }
    }

    fn log_line(&self) -> String {
        match self {
            Self::Argv(argv) => argv.join(" "),
            #[cfg(windows)]
            Self::Shell(cmdline) => format!("cmd.exe /c {cmdline}"),
        }
    }
}

/// Runs one check command and absorbs its merged stdout/stderr.
///
/// Arguments literally equal to `%compiler%` are replaced by `compiler`
/// before spawning. Returns `true` iff the output was fully absorbed and
/// the child exited with status 0; on `false` the sink holds whatever was
/// absorbed before the failure and the caller should discard the key.
///
/// # Panics
/// Panics when the pipe for the child's output cannot be created; see the
/// module docs.
pub fn hash_command_output<S: EntropySink + ?Sized>(
    sink: &mut S,
    command: &str,
    compiler: &str,
) -> bool {
    let Some(invocation) = build_invocation(command, compiler) else {
        tracing::debug!("empty compiler check command");
        return false;
    };
    tracing::debug!("executing compiler check command: {}", invocation.log_line());

    let (mut reader, writer) = match io::pipe() {
        Ok(ends) => ends,
        Err(err) => panic!("pipe creation failed: {err}"),
    };

    let spawned = {
        let mut cmd = invocation.to_command();
        let writer_for_stdout = match writer.try_clone() {
            Ok(clone) => clone,
            Err(err) => panic!("pipe duplication failed: {err}"),
        };
        cmd.stdin(Stdio::null())
            .stdout(Stdio::from(writer_for_stdout))
            .stderr(Stdio::from(writer));
        cmd.spawn()
    };
    // `cmd` is gone: the parent's copies of the write end are closed, which
    // is what lets the read loop below reach EOF.

    let mut child = match spawned {
        Ok(child) => child,
        Err(err) => {
            tracing::debug!("failed to execute compiler check command: {err}");
            return false;
        }
    };

    let mut ok = true;
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => sink.absorb_bytes(&chunk[..n]),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                tracing::debug!("error hashing compiler check command output: {err}");
                ok = false;
                break;
            }
        }
    }
    // On a read error the child may still be writing; closing the read end
    // unblocks it (EPIPE) so the wait below cannot hang.
    drop(reader);

    match child.wait() {
        Ok(status) if status.success() => ok,
        Ok(status) => {
            tracing::debug!("compiler check command returned {status}");
            false
        }
        Err(err) => {
            tracing::debug!("waiting for compiler check command failed: {err}");
            false
        }
    }
}

/// Runs a semicolon-separated list of check commands.
///
/// Every non-empty segment is attempted, even after an earlier failure, so
/// the sink receives all the material the command list produces; the result
/// is `true` only when every segment succeeded.
pub fn hash_multicommand_output<S: EntropySink + ?Sized>(
    sink: &mut S,
    commands: &str,
    compiler: &str,
) -> bool {
    let mut ok = true;
    for command in commands.split(';') {
        if command.trim().is_empty() {
            continue;
        }
        if !hash_command_output(sink, command, compiler) {
            ok = false;
        }
    }
    ok
}
