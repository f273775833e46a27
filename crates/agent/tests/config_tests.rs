//! Integration tests for configuration parsing
//!
//! Tests agent configuration parsing, including:
//! - Minimal and full documents
//! - Defaults for omitted sections
//! - Invalid configuration handling
//! - Save/load through the filesystem

use agent::config::AgentConfig;
use std::path::PathBuf;
use tempfile::TempDir;

mod agent_config {
    use super::*;

    const MINIMAL_AGENT_CONFIG: &str = r#"
[agent]
log_level = "info"
"#;

    const FULL_AGENT_CONFIG: &str = r#"
[agent]
log_level = "debug"

[usb]
vendor_id = "0x0801"
product_ids = ["0x0001", "0x0011"]
timeout_ms = 2500
interface = 0

[snapshot]
directory = "/var/lib/usb-cmdb"
serial_length = 8
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = AgentConfig::from_toml(MINIMAL_AGENT_CONFIG).unwrap();
        assert_eq!(config.agent.log_level, "info");
        assert_eq!(config.usb.vendor_id().unwrap(), 0x0801);
        assert!(config.usb.product_ids.is_empty());
        assert_eq!(config.usb.timeout_ms, 5000);
        assert_eq!(config.usb.interface, 0);
        assert_eq!(config.snapshot.serial_length, 7);
    }

    #[test]
    fn test_full_config() {
        let config = AgentConfig::from_toml(FULL_AGENT_CONFIG).unwrap();
        assert_eq!(config.agent.log_level, "debug");
        assert_eq!(config.usb.product_ids.len(), 2);
        assert_eq!(config.usb.timeout_ms, 2500);
        assert_eq!(config.snapshot.directory, PathBuf::from("/var/lib/usb-cmdb"));
        assert_eq!(config.snapshot.serial_length, 8);

        assert!(config.usb.matches(0x0801, 0x0011));
        assert!(!config.usb.matches(0x0801, 0x0013));
    }

    #[test]
    fn test_snapshot_directory_tilde_expansion() {
        let config = AgentConfig::from_toml(
            r#"
[agent]
log_level = "info"

[snapshot]
directory = "~/snapshots"
"#,
        )
        .unwrap();

        let resolved = config.snapshot.resolved_directory().unwrap();
        assert!(!resolved.to_string_lossy().starts_with('~'));
        assert!(resolved.ends_with("snapshots"));
    }
}

mod config_validation {
    use super::*;

    #[test]
    fn test_missing_agent_section() {
        assert!(AgentConfig::from_toml("[usb]\ntimeout_ms = 100\n").is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let result = AgentConfig::from_toml("[agent]\nlog_level = \"verbose\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_vendor_id() {
        let result = AgentConfig::from_toml(
            "[agent]\nlog_level = \"info\"\n[usb]\nvendor_id = \"0801\"\n",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_product_id() {
        let result = AgentConfig::from_toml(
            "[agent]\nlog_level = \"info\"\n[usb]\nproduct_ids = [\"0x0001\", \"swipe\"]\n",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_timeout() {
        let result =
            AgentConfig::from_toml("[agent]\nlog_level = \"info\"\n[usb]\ntimeout_ms = 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_serial_length() {
        let result = AgentConfig::from_toml(
            "[agent]\nlog_level = \"info\"\n[snapshot]\nserial_length = 0\n",
        );
        assert!(result.is_err());
    }
}

mod config_files {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("agent.toml");

        let mut config = AgentConfig::default();
        config.agent.log_level = "warn".to_string();
        config.usb.product_ids = vec!["0x0011".to_string()];
        config.save(&path).unwrap();

        let loaded = AgentConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.agent.log_level, "warn");
        assert_eq!(loaded.usb.product_ids, vec!["0x0011".to_string()]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(AgentConfig::load(Some(dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_default_path() {
        let path = AgentConfig::default_path();
        assert!(path.ends_with("usb-cmdb/agent.toml"));
    }
}
