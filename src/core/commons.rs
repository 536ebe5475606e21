// src/core/commons.rs

/// Renders an argv as a single shell-safe line for display.
pub fn format_command_line<S: AsRef<str>>(program: &str, args: &[S]) -> String {
    let mut line = quote(program);
    for arg in args {
        line.push(' ');
        line.push_str(&quote(arg.as_ref()));
    }
    line
}

/// Shell-quotes a single token, falling back to the raw text if it cannot be
/// quoted (e.g. it contains a NUL byte).
pub fn quote(token: &str) -> String {
    shlex::try_quote(token)
        .map(|q| q.into_owned())
        .unwrap_or_else(|_| token.to_string())
}
