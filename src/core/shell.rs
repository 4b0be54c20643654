//! Shell wrapping for commands executed through an interpreter.

use std::path::Path;

/// Flag that makes a POSIX shell run its next argument as a command string.
pub const COMMAND_FLAG: &str = "-c";

/// Single-quote one word so the shell passes it through literally.
///
/// Embedded single quotes close the quoting, insert a double-quoted quote and
/// reopen it: `it's` becomes `'it'"'"'s'`.
#[must_use]
pub fn quote(word: &str) -> String {
    format!("'{}'", word.replace('\'', r#"'"'"'"#))
}

/// Build the quoted command string for `command` followed by `args`.
#[must_use]
pub fn command_line(command: &str, args: &[String]) -> String {
    std::iter::once(command)
        .chain(args.iter().map(String::as_str))
        .map(quote)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rewrite an invocation to run through `shell`.
///
/// With `escape` the command and every argument are quoted individually; without
/// it the raw command string is handed to the shell verbatim and `args` must be
/// empty (checked during request validation).
#[must_use]
pub fn wrap(shell: &Path, command: &str, args: &[String], escape: bool) -> (String, Vec<String>) {
    let script = if escape {
        command_line(command, args)
    } else {
        command.to_string()
    };
    (
        shell.to_string_lossy().into_owned(),
        vec![COMMAND_FLAG.to_string(), script],
    )
}
