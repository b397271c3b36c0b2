//! Integration tests for daemon configuration parsing
//!
//! Tests the launcherd TOML layout:
//! - Minimal config relying on section defaults
//! - Full config with every option
//! - VID/PID and commit policy validation rules

mod daemon_config {
    const MINIMAL_CONFIG: &str = r#"
[daemon]
log_level = "info"
service_mode = false

[usb]
vendor_id = "0x0416"
product_id = "0x9391"
"#;

    const FULL_CONFIG: &str = r#"
[daemon]
log_level = "debug"
service_mode = true

[usb]
vendor_id = "0x0416"
product_id = "0x9391"
interface = 0
poll_interval_ms = 500

[transfer]
timeout_ms = 1500
commit_policy = "confirmed"

[attributes]
socket_path = "~/.cache/missile-launcher/launcherd.sock"
socket_mode = 0o660
"#;

    #[test]
    fn test_parse_minimal_config() {
        let config: toml::Value = toml::from_str(MINIMAL_CONFIG).unwrap();

        let daemon = config.get("daemon").unwrap();
        assert_eq!(daemon.get("log_level").unwrap().as_str().unwrap(), "info");
        assert!(!daemon.get("service_mode").unwrap().as_bool().unwrap());

        let usb = config.get("usb").unwrap();
        assert_eq!(usb.get("vendor_id").unwrap().as_str().unwrap(), "0x0416");
        assert_eq!(usb.get("product_id").unwrap().as_str().unwrap(), "0x9391");
        assert!(usb.get("interface").is_none());

        assert!(config.get("transfer").is_none());
        assert!(config.get("attributes").is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let config: toml::Value = toml::from_str(FULL_CONFIG).unwrap();

        let daemon = config.get("daemon").unwrap();
        assert!(daemon.get("service_mode").unwrap().as_bool().unwrap());

        let usb = config.get("usb").unwrap();
        assert_eq!(usb.get("interface").unwrap().as_integer().unwrap(), 0);
        assert_eq!(usb.get("poll_interval_ms").unwrap().as_integer().unwrap(), 500);

        let transfer = config.get("transfer").unwrap();
        assert_eq!(transfer.get("timeout_ms").unwrap().as_integer().unwrap(), 1500);
        assert_eq!(
            transfer.get("commit_policy").unwrap().as_str().unwrap(),
            "confirmed"
        );

        let attributes = config.get("attributes").unwrap();
        assert_eq!(
            attributes.get("socket_mode").unwrap().as_integer().unwrap(),
            0o660
        );
        assert!(
            attributes
                .get("socket_path")
                .unwrap()
                .as_str()
                .unwrap()
                .starts_with("~/")
        );
    }

    #[test]
    fn test_config_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("launcherd.toml");
        std::fs::write(&path, FULL_CONFIG).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let config: toml::Value = toml::from_str(&content).unwrap();
        assert_eq!(
            config["daemon"]["log_level"].as_str().unwrap(),
            "debug"
        );
    }
}

mod config_validation {
    fn parse_hex_id(id: &str) -> Option<u16> {
        let hex_part = id.strip_prefix("0x").or_else(|| id.strip_prefix("0X"))?;
        if hex_part.is_empty() || hex_part.len() > 4 {
            return None;
        }
        u16::from_str_radix(hex_part, 16).ok()
    }

    #[test]
    fn test_valid_hex_ids() {
        assert_eq!(parse_hex_id("0x0416"), Some(0x0416));
        assert_eq!(parse_hex_id("0x9391"), Some(0x9391));
        assert_eq!(parse_hex_id("0XFFFF"), Some(0xffff));
        assert_eq!(parse_hex_id("0x1"), Some(1));
    }

    #[test]
    fn test_invalid_hex_ids() {
        for id in ["0416", "0x", "0x12345", "0xGHIJ", "", "x0416"] {
            assert!(parse_hex_id(id).is_none(), "{} should be rejected", id);
        }
    }

    #[test]
    fn test_commit_policy_names() {
        let valid = ["optimistic", "confirmed"];
        for policy in valid {
            let doc = format!("[transfer]\ncommit_policy = \"{}\"\n", policy);
            let config: toml::Value = toml::from_str(&doc).unwrap();
            let name = config["transfer"]["commit_policy"].as_str().unwrap();
            assert!(valid.contains(&name));
        }
    }

    #[test]
    fn test_log_levels() {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        assert!(valid_levels.contains(&"info"));
        assert!(!valid_levels.contains(&"verbose"));
    }
}

mod commit_policy_serde {
    use common::CommitPolicy;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Transfer {
        #[serde(default)]
        commit_policy: CommitPolicy,
    }

    #[test]
    fn test_policy_defaults_to_optimistic() {
        let transfer: Transfer = toml::from_str("").unwrap();
        assert_eq!(transfer.commit_policy, CommitPolicy::Optimistic);
    }

    #[test]
    fn test_policy_parses_confirmed() {
        let transfer: Transfer = toml::from_str("commit_policy = \"confirmed\"").unwrap();
        assert_eq!(transfer.commit_policy, CommitPolicy::Confirmed);
    }

    #[test]
    fn test_unknown_policy_rejected() {
        assert!(toml::from_str::<Transfer>("commit_policy = \"eventual\"").is_err());
    }
}
