use serde::{Deserialize, Serialize};

/// Result of a passive service check, as submitted by a client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceResult {
    /// Unix time of the check; 0 means now
    pub time: i64,
    pub hostname: String,
    pub service_name: String,
    /// Plugin return code (0 OK, 1 WARNING, 2 CRITICAL, 3 UNKNOWN)
    pub status: u32,
    /// Plugin output
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize() {
        let result: ServiceResult = serde_json::from_str(
            r#"{"time": 1700000000, "hostname": "web-1", "service_name": "HTTP", "status": 2, "body": "down"}"#,
        )
        .unwrap();

        assert_eq!(result.time, 1_700_000_000);
        assert_eq!(result.hostname, "web-1");
        assert_eq!(result.service_name, "HTTP");
        assert_eq!(result.status, 2);
        assert_eq!(result.body, "down");
    }

    #[test]
    fn test_missing_fields_default() {
        let result: ServiceResult =
            serde_json::from_str(r#"{"hostname": "web-1", "service_name": "HTTP"}"#).unwrap();

        assert_eq!(result.time, 0);
        assert_eq!(result.status, 0);
        assert!(result.body.is_empty());
    }

    #[test]
    fn test_negative_status_rejected() {
        assert!(serde_json::from_str::<ServiceResult>(r#"{"status": -1}"#).is_err());
    }
}
