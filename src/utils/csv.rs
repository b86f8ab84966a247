/// Quote a CSV field if it contains a delimiter, quote, or newline
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Join fields into one CSV record (no trailing newline)
pub fn write_record(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| escape_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_fields_unquoted() {
        assert_eq!(escape_field("hello"), "hello");
        assert_eq!(escape_field("12.5"), "12.5");
    }

    #[test]
    fn test_comma_quoted() {
        assert_eq!(escape_field("Sector 5, Noida"), "\"Sector 5, Noida\"");
    }

    #[test]
    fn test_quotes_doubled() {
        assert_eq!(escape_field("the \"fast\" route"), "\"the \"\"fast\"\" route\"");
    }

    #[test]
    fn test_record_join() {
        let record = write_record(&[
            "1".to_string(),
            "Main St, Apt 4".to_string(),
            "completed".to_string(),
        ]);
        assert_eq!(record, "1,\"Main St, Apt 4\",completed");
    }
}
