use crate::error::ConfigError;
use std::collections::HashMap;

/// Parses `--label K[=V]` entries. A missing value becomes the empty
/// string; duplicate keys keep the last value.
pub fn parse_labels(entries: &[String]) -> Result<HashMap<String, String>, ConfigError> {
    let mut labels = HashMap::new();
    for entry in entries {
        if entry.is_empty() {
            return Err(ConfigError::InvalidArgument("empty label".to_string()));
        }
        let mut parts = entry.splitn(3, '=');
        let key = parts.next().unwrap_or_default();
        if key.is_empty() {
            return Err(ConfigError::InvalidArgument(format!(
                "label has an empty key: {entry}"
            )));
        }
        let value = match (parts.next(), parts.next()) {
            (Some(first), Some(rest)) => format!("{first}={rest}"),
            (Some(first), None) => first.to_string(),
            (None, _) => String::new(),
        };
        labels.insert(key.to_string(), value);
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_value() {
        let labels = parse_labels(&["app=web".to_string()]).unwrap();
        assert_eq!(labels.get("app").map(String::as_str), Some("web"));
    }

    #[test]
    fn test_missing_value_is_empty_string() {
        let labels = parse_labels(&["flag".to_string()]).unwrap();
        assert_eq!(labels.get("flag").map(String::as_str), Some(""));
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let labels =
            parse_labels(&["tier=a".to_string(), "tier=b".to_string()]).unwrap();
        assert_eq!(labels.get("tier").map(String::as_str), Some("b"));
    }

    #[test]
    fn test_value_may_contain_equals() {
        let labels = parse_labels(&["expr=a=b=c".to_string()]).unwrap();
        assert_eq!(labels.get("expr").map(String::as_str), Some("a=b=c"));
    }

    #[test]
    fn test_empty_entry_rejected() {
        assert!(parse_labels(&["".to_string()]).is_err());
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(parse_labels(&["=v".to_string()]).is_err());
    }
}
