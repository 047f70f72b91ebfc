//! Service error code lookup.

use std::collections::HashMap;

/// Map a non-zero service code to a human readable message using the
/// configured table, falling back to a message naming the unknown code.
pub fn map_error_code(code: i64, table: &HashMap<String, String>) -> String {
    match table.get(&code.to_string()) {
        Some(message) => message.clone(),
        None => format!(
            "Error code [{code}] is not in the configured error table; see the service documentation."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_code_uses_configured_message() {
        let mut table = HashMap::new();
        table.insert("10163".to_string(), "param error".to_string());
        assert_eq!(map_error_code(10163, &table), "param error");
    }

    #[test]
    fn unknown_code_falls_back_with_the_code() {
        let table = HashMap::new();
        let message = map_error_code(999, &table);
        assert!(message.contains("999"));
    }
}
