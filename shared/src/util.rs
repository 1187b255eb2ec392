/// 当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Normalize a phone-like identifier to digits only.
///
/// Transport recipient ids and requester ids arrive with country prefixes,
/// separators and occasionally a device suffix; comparisons and map keys
/// always use the digits-only form.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_non_digits() {
        assert_eq!(normalize_phone("+55 (11) 98765-4321"), "5511987654321");
        assert_eq!(normalize_phone("5511987654321@transport"), "5511987654321");
        assert_eq!(normalize_phone(""), "");
    }
}
