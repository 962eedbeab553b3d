//! Token resolution from the process environment and `.env` files.
//!
//! Lookup order: the process environment first, then `.env` files walked
//! upward from the working directory; the nearest file defining the variable
//! wins.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::debug;

use glint_model::{Error, ErrorKind, Result};

/// Options governing `.env` resolution.
#[derive(Debug, Clone, Default)]
pub struct EnvOptions {
    /// Refuse `.env` files readable by group or others.
    pub require_owner_only: bool,
    /// Accept entries whose value is empty.
    pub allow_empty: bool,
}

/// Resolves `var` from the environment, then from the `.env` chain rooted at
/// the current working directory.
pub fn resolve_token(var: &str, options: &EnvOptions) -> Result<String> {
    if let Ok(value) = std::env::var(var) {
        if !value.is_empty() || options.allow_empty {
            return Ok(value);
        }
    }
    let cwd = std::env::current_dir().map_err(Error::from)?;
    resolve_token_from(&cwd, var, options)
}

/// Resolves `var` from the `.env` chain rooted at `dir`.
pub fn resolve_token_from(dir: &Path, var: &str, options: &EnvOptions) -> Result<String> {
    let mut dir = PathBuf::from(dir);
    loop {
        let path = dir.join(".env");
        if path.is_file() {
            check_permissions(&path, options)?;
            let contents = std::fs::read_to_string(&path).map_err(Error::from)?;
            let entries = parse_env(&contents, options)?;
            if let Some(value) = entries.get(var) {
                debug!("resolved {} from {}", var, path.display());
                return Ok(value.clone());
            }
        }
        if !dir.pop() {
            break;
        }
    }
    Err(Error::new(
        ErrorKind::NotFound,
        format!("{} is not set in the environment or any .env file", var),
    ))
}

#[cfg(unix)]
fn check_permissions(path: &Path, options: &EnvOptions) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    if !options.require_owner_only {
        return Ok(());
    }
    let mode = std::fs::metadata(path).map_err(Error::from)?.permissions().mode();
    if mode & 0o077 != 0 {
        return Err(Error::new(
            ErrorKind::Forbidden,
            format!("{} must be readable by its owner only", path.display()),
        ));
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_permissions(_path: &Path, _options: &EnvOptions) -> Result<()> {
    Ok(())
}

/// Parses `.env` source text. First assignment of a key wins.
pub fn parse_env(source: &str, options: &EnvOptions) -> Result<HashMap<String, String>> {
    let mut entries = HashMap::new();
    for (number, line) in source.lines().enumerate() {
        let line = line.trim_start();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").map(str::trim_start).unwrap_or(line);

        let Some((key, rest)) = line.split_once('=') else {
            return Err(Error::new(
                ErrorKind::ParseError,
                format!("line {}: missing '='", number + 1),
            ));
        };
        let key = key.trim_end();
        if key.is_empty()
            || !key
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_')
            || key.as_bytes()[0].is_ascii_digit()
        {
            return Err(Error::new(
                ErrorKind::ParseError,
                format!("line {}: invalid key {:?}", number + 1, key),
            ));
        }

        let value = parse_value(rest.trim_start(), number + 1)?;
        if value.is_empty() && !options.allow_empty {
            continue;
        }
        entries.entry(key.to_owned()).or_insert(value);
    }
    Ok(entries)
}

fn parse_value(raw: &str, line: usize) -> Result<String> {
    if let Some(rest) = raw.strip_prefix('"') {
        let mut value = String::new();
        let mut chars = rest.chars();
        while let Some(c) = chars.next() {
            match c {
                '"' => return Ok(value),
                '\\' => match chars.next() {
                    Some('n') => value.push('\n'),
                    Some('r') => value.push('\r'),
                    Some('t') => value.push('\t'),
                    Some('\\') => value.push('\\'),
                    Some('"') => value.push('"'),
                    other => {
                        return Err(Error::new(
                            ErrorKind::ParseError,
                            format!("line {}: bad escape {:?}", line, other),
                        ))
                    }
                },
                c => value.push(c),
            }
        }
        Err(Error::new(
            ErrorKind::ParseError,
            format!("line {}: unterminated double quote", line),
        ))
    } else if let Some(rest) = raw.strip_prefix('\'') {
        match rest.split_once('\'') {
            Some((value, _)) => Ok(value.to_owned()),
            None => Err(Error::new(
                ErrorKind::ParseError,
                format!("line {}: unterminated single quote", line),
            )),
        }
    } else {
        // unquoted: an inline comment starts at '#' preceded by whitespace
        let mut end = raw.len();
        let bytes = raw.as_bytes();
        for i in 0..raw.len() {
            if bytes[i] == b'#' && (i == 0 || bytes[i - 1].is_ascii_whitespace()) {
                end = i;
                break;
            }
        }
        Ok(raw[..end].trim_end().to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> EnvOptions {
        EnvOptions::default()
    }

    #[test]
    fn parses_the_supported_grammar() {
        let source = r#"
# a comment
DISCORD_TOKEN=abc123
export EXPORTED=yes
DOUBLE="line\nbreak \"quoted\" tab\t"
SINGLE='literal \n stays'
UNQUOTED=value with spaces   # trailing comment
HASH_IN_VALUE=abc#def
"#;
        let entries = parse_env(source, &opts()).unwrap();
        assert_eq!(entries["DISCORD_TOKEN"], "abc123");
        assert_eq!(entries["EXPORTED"], "yes");
        assert_eq!(entries["DOUBLE"], "line\nbreak \"quoted\" tab\t");
        assert_eq!(entries["SINGLE"], "literal \\n stays");
        assert_eq!(entries["UNQUOTED"], "value with spaces");
        assert_eq!(entries["HASH_IN_VALUE"], "abc#def", "no whitespace, no comment");
    }

    #[test]
    fn empty_values_are_opt_in() {
        let source = "EMPTY=\nSET=x\n";
        let entries = parse_env(source, &opts()).unwrap();
        assert!(!entries.contains_key("EMPTY"));

        let entries = parse_env(
            source,
            &EnvOptions {
                allow_empty: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(entries["EMPTY"], "");
    }

    #[test]
    fn first_assignment_wins() {
        let entries = parse_env("A=1\nA=2\n", &opts()).unwrap();
        assert_eq!(entries["A"], "1");
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_env("NOEQUALS\n", &opts()).is_err());
        assert!(parse_env("1BAD=x\n", &opts()).is_err());
        assert!(parse_env("A=\"unterminated\n", &opts()).is_err());
        assert!(parse_env("A=\"bad \\x escape\"\n", &opts()).is_err());
    }
}
