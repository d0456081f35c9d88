//! Data API endpoint URL builders

/// Path prefix of the data API
pub const REST_PREFIX: &str = "/rest/v1";

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "apikey";

/// Resource URL of a table
pub fn table_url(base_url: &str, table: &str) -> String {
    format!("{}{}/{}", base_url.trim_end_matches('/'), REST_PREFIX, table)
}

/// Equality filter value, e.g. `eq.Sep25`
pub fn eq_filter(value: &str) -> String {
    format!("eq.{}", value)
}

/// Total from a `Content-Range` header such as `0-0/1234` or `*/0`.
/// `None` when the server did not report a total (`0-0/*`).
pub fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_url() {
        assert_eq!(
            table_url("https://abc.supabase.co/", "final_num"),
            "https://abc.supabase.co/rest/v1/final_num"
        );
    }

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total("0-0/1234"), Some(1234));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-0/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }
}
