//! POSIX shell quoting for commands handed to `sh -c`, `ssh` and `scp`.

/// Make `value` safe inside a single-quoted string: each `'` becomes `'\''`.
pub fn escape_single_quote_content(value: &str) -> String {
    value.replace('\'', r"'\''")
}

fn is_plain(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | '@' | ',' | '+' | '%')
}

/// Leave plain words alone; single-quote anything else.
pub fn quote_arg(arg: &str) -> String {
    if !arg.is_empty() && arg.chars().all(is_plain) {
        arg.to_string()
    } else {
        quote_path(arg)
    }
}

pub fn quote_args(args: &[String]) -> String {
    let quoted: Vec<String> = args.iter().map(|arg| quote_arg(arg)).collect();
    quoted.join(" ")
}

/// Always single-quoted, so remote paths never glob or expand.
pub fn quote_path(path: &str) -> String {
    format!("'{}'", escape_single_quote_content(path))
}
