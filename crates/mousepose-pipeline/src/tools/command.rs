//! Running external programs.
//!
//! Commands block until the child exits; there is no timeout. Standard output
//! and error are inherited unless the caller needs to capture stdout.

use std::io;
use std::process::{Command, Stdio};

use log::{debug, info};
use mousepose_core::CommandSpec;
use thiserror::Error;

/// Failure of an external program.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to launch `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` exited with {}", exit_description(.code))]
    NonZeroExit { program: String, code: Option<i32> },
    #[error("`{program}` produced unusable output: {message}")]
    InvalidOutput { program: String, message: String },
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Program name of a command, for messages.
pub fn program_name(command: &Command) -> String {
    command.get_program().to_string_lossy().into_owned()
}

/// Shell-like rendering of a command line, for logs.
pub fn render(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|part| {
            let part = part.to_string_lossy();
            if part.contains(char::is_whitespace) {
                format!("'{part}'")
            } else {
                part.into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build a command from a template, substituting `{name}` placeholders.
pub fn command_from_spec(spec: &CommandSpec, vars: &[(&str, String)]) -> Command {
    let mut command = Command::new(&spec.program);
    command.args(spec.render_args(vars));
    command
}

/// Run a command to completion, failing on a non-zero exit.
pub fn run_checked(mut command: Command) -> Result<(), ToolError> {
    let program = program_name(&command);
    info!("$ {}", render(&command));
    let status = command
        .status()
        .map_err(|source| ToolError::Spawn {
            program: program.clone(),
            source,
        })?;
    if !status.success() {
        return Err(ToolError::NonZeroExit {
            program,
            code: status.code(),
        });
    }
    Ok(())
}

/// Run a command to completion and return its standard output.
pub fn run_capture(mut command: Command) -> Result<String, ToolError> {
    let program = program_name(&command);
    debug!("$ {}", render(&command));
    let output = command
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .map_err(|source| ToolError::Spawn {
            program: program.clone(),
            source,
        })?;
    if !output.status.success() {
        return Err(ToolError::NonZeroExit {
            program,
            code: output.status.code(),
        });
    }
    String::from_utf8(output.stdout).map_err(|err| ToolError::InvalidOutput {
        program,
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_quotes_whitespace() {
        let mut command = Command::new("sleap-track");
        command.args(["/data/my video.mp4", "-o", "out.slp"]);
        assert_eq!(render(&command), "sleap-track '/data/my video.mp4' -o out.slp");
    }

    #[test]
    fn spec_placeholders_become_args() {
        let spec = CommandSpec::new("anipose-angles", &["{config}", "{points}", "{output}"]);
        let command = command_from_spec(
            &spec,
            &[
                ("config", "c.toml".to_string()),
                ("points", "p.csv".to_string()),
                ("output", "a.csv".to_string()),
            ],
        );
        assert_eq!(program_name(&command), "anipose-angles");
        let args: Vec<_> = command.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["c.toml", "p.csv", "a.csv"]);
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let command = Command::new("mousepose-definitely-not-installed");
        let err = run_checked(command).unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn exit_status_is_checked() {
        let err = run_checked(Command::new("false")).unwrap_err();
        assert!(matches!(err, ToolError::NonZeroExit { code: Some(1), .. }));
        run_checked(Command::new("true")).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn capture_returns_stdout() {
        let mut command = Command::new("echo");
        command.arg("[1, 2, 3]");
        assert_eq!(run_capture(command).unwrap().trim(), "[1, 2, 3]");
    }
}
