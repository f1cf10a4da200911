use crate::error::ConfigError;

/// Expand a textual `low-high` range into its inclusive list of ports.
///
/// Both bounds must be plain port numbers in `0..=65535` (no surrounding
/// whitespace) and `low <= high`. The output is ascending, one decimal
/// string per port: `parse_range("8080-8082")` gives `["8080", "8081", "8082"]`.
pub fn parse_range(text: &str) -> Result<Vec<String>, ConfigError> {
    if !text.contains('-') {
        return Err(ConfigError::MissingSeparator(text.to_string()));
    }

    let parts: Vec<&str> = text.split('-').collect();
    let [lower, upper] = parts.as_slice() else {
        return Err(ConfigError::InvalidRangeFormat(text.to_string()));
    };

    let lower = parse_bound(lower, text)?;
    let upper = parse_bound(upper, text)?;
    if lower > upper {
        return Err(ConfigError::InvalidRangeOrder { lower, upper });
    }

    Ok((lower..=upper).map(|p| p.to_string()).collect())
}

/// clap value parser for `--range`: rejects a malformed range while the
/// arguments are parsed, even when explicit ports end up taking priority.
pub fn validate_range(text: &str) -> Result<String, ConfigError> {
    parse_range(text)?;
    Ok(text.to_string())
}

fn parse_bound(s: &str, text: &str) -> Result<u16, ConfigError> {
    s.parse::<u16>()
        .map_err(|_| ConfigError::InvalidRangeFormat(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_inclusive_range() {
        let ports = parse_range("8080-8082").unwrap();
        assert_eq!(ports, vec!["8080", "8081", "8082"]);
    }

    #[test]
    fn single_port_range() {
        assert_eq!(parse_range("443-443").unwrap(), vec!["443"]);
    }

    #[test]
    fn missing_dash() {
        assert_eq!(
            parse_range("8080"),
            Err(ConfigError::MissingSeparator("8080".into()))
        );
    }

    #[test]
    fn too_many_dashes() {
        assert!(matches!(
            parse_range("1-2-3"),
            Err(ConfigError::InvalidRangeFormat(_))
        ));
        // A leading minus sign splits into three parts as well.
        assert!(matches!(
            parse_range("-5-10"),
            Err(ConfigError::InvalidRangeFormat(_))
        ));
    }

    #[test]
    fn empty_or_non_numeric_bounds() {
        for input in ["abc-100", "100-xyz", "-100", "100-", " 80-90", "80-90 "] {
            assert!(
                matches!(parse_range(input), Err(ConfigError::InvalidRangeFormat(_))),
                "{input:?} should be a format error"
            );
        }
    }

    #[test]
    fn bounds_beyond_port_space_rejected() {
        for input in ["1-65536", "1-99999999999", "70000-70001"] {
            assert!(
                matches!(parse_range(input), Err(ConfigError::InvalidRangeFormat(_))),
                "{input:?} should be a format error"
            );
        }
        assert_eq!(parse_range("65535-65535").unwrap(), vec!["65535"]);
    }

    #[test]
    fn reversed_bounds() {
        assert_eq!(
            parse_range("9000-8999"),
            Err(ConfigError::InvalidRangeOrder { lower: 9000, upper: 8999 })
        );
    }

    #[test]
    fn validate_keeps_original_text() {
        assert_eq!(validate_range("1-3").unwrap(), "1-3");
        assert!(validate_range("3-1").is_err());
    }
}
