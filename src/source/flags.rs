use std::fmt;

/// Engine flags an example may declare. Anything else is a load error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliFlag {
    Interpolation,
    Comments,
    Pretty(u32),
    Diff,
    Trace,
    Profile,
}

impl CliFlag {
    pub fn parse(raw: &str) -> Result<CliFlag, String> {
        let raw = raw.trim();
        match raw {
            "--interpolation" => return Ok(CliFlag::Interpolation),
            "--comments" => return Ok(CliFlag::Comments),
            "--diff" => return Ok(CliFlag::Diff),
            "--trace" => return Ok(CliFlag::Trace),
            "--profile" => return Ok(CliFlag::Profile),
            _ => {}
        }
        if let Some(width) = raw.strip_prefix("--pretty=") {
            return width
                .parse::<u32>()
                .map(CliFlag::Pretty)
                .map_err(|_| format!("--pretty expects a non-negative integer (got {width:?})"));
        }
        Err(format!(
            "unknown flag {raw:?} (expected one of --interpolation, --comments, --pretty=N, --diff, --trace, --profile)"
        ))
    }

    pub fn writes_stderr(&self) -> bool {
        matches!(self, CliFlag::Trace | CliFlag::Profile)
    }

    /// One-line reader-facing explanation used in expanded chapters.
    pub fn explain(&self) -> &'static str {
        match self {
            CliFlag::Interpolation => "enables template substitution in strings",
            CliFlag::Comments => "allows comments in the script file",
            CliFlag::Pretty(_) => "pretty-prints the JSON result (formatting only)",
            CliFlag::Diff => "prints a patch document instead of the transformed document",
            CliFlag::Trace => "writes an execution trace to stderr",
            CliFlag::Profile => "writes timing information to stderr",
        }
    }
}

impl fmt::Display for CliFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliFlag::Interpolation => f.write_str("--interpolation"),
            CliFlag::Comments => f.write_str("--comments"),
            CliFlag::Pretty(width) => write!(f, "--pretty={width}"),
            CliFlag::Diff => f.write_str("--diff"),
            CliFlag::Trace => f.write_str("--trace"),
            CliFlag::Profile => f.write_str("--profile"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_flags() {
        assert_eq!(CliFlag::parse("--trace"), Ok(CliFlag::Trace));
        assert_eq!(CliFlag::parse("--pretty=4"), Ok(CliFlag::Pretty(4)));
        assert_eq!(CliFlag::Pretty(4).to_string(), "--pretty=4");
    }

    #[test]
    fn rejects_unknown_and_malformed_flags() {
        assert!(CliFlag::parse("--debug").unwrap_err().contains("unknown flag"));
        assert!(CliFlag::parse("--pretty=wide").is_err());
        assert!(CliFlag::parse("--pretty").is_err());
    }
}
