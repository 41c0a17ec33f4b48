/*!
 * Tests for application configuration functionality
 */

use std::time::Duration;

use yaetwai::app_config::{BackendKind, Config, LogLevel};
use yaetwai::translation::ReintegrationMode;

use crate::common;

/// Test that the default configuration is usable as is
#[test]
fn test_default_config_shouldHaveExpectedValues() {
    let config = Config::default();

    assert_eq!(config.target_language, "zh");
    assert_eq!(config.translation.backend, BackendKind::Ollama);
    assert_eq!(config.translation.available_backends.len(), 2);
    assert_eq!(config.segmentation.archaic_limit, 300);
    assert_eq!(config.segmentation.default_limit, 1000);
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.validate().is_ok());
}

/// Test saving and loading a configuration file
#[test]
fn test_save_thenFromFile_shouldPreserveSettings() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("nested").join("conf.json");

    let mut config = Config::default();
    config.target_language = "fr".to_string();
    config.translation.backend = BackendKind::DeepSeek;
    config.translation.backend_config_mut(BackendKind::DeepSeek).api_key = "sk-test".to_string();
    config.segmentation.default_limit = 800;
    config.save(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.target_language, "fr");
    assert_eq!(loaded.translation.backend, BackendKind::DeepSeek);
    assert_eq!(loaded.translation.get_api_key(), "sk-test");
    assert_eq!(loaded.translation.get_model(), "deepseek-chat");
    assert_eq!(loaded.segmentation.default_limit, 800);
    assert!(loaded.validate().is_ok());
}

/// Test that omitted sections fall back to defaults
#[test]
fn test_fromFile_withMinimalJson_shouldFillDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "conf.json", r#"{ "target_language": "ja" }"#).unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.target_language, "ja");
    assert_eq!(config.translation.get_endpoint(), "http://localhost:11434");
    assert_eq!(config.pipeline_config().poll_interval, Duration::from_secs(1));
    assert_eq!(config.pipeline_config().stop_timeout, Duration::from_secs(2));
    assert_eq!(config.reintegration_mode(), ReintegrationMode::Replace);
}

#[test]
fn test_reintegrationMode_withBilingualFlag_shouldKeepOriginals() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "conf.json", r#"{ "target_language": "zh", "bilingual": true }"#).unwrap();

    let config = Config::from_file(&path).unwrap();
    assert!(config.bilingual);
    assert_eq!(config.reintegration_mode(), ReintegrationMode::Bilingual);
}

#[test]
fn test_fromFile_withInvalidJson_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "conf.json", "{ target_language").unwrap();
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_validate_withInvalidSettings_shouldFail() {
    let mut config = Config::default();
    config.target_language = "klingon".to_string();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.translation.backend = BackendKind::DeepSeek;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.segmentation.archaic_limit = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.translation.common.retry_count = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.translation.backend_config_mut(BackendKind::Ollama).endpoint = "not a url".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_policies_shouldReflectConfiguredValues() {
    let mut config = Config::default();
    config.translation.common.retry_count = 5;
    config.translation.common.retry_delay_ms = 250;
    config.translation.common.timeout_secs = 10;
    config.segmentation.archaic_limit = 120;

    let retry = config.retry_policy();
    assert_eq!(retry.max_attempts, 5);
    assert_eq!(retry.delay, Duration::from_millis(250));
    assert_eq!(retry.attempt_timeout, Duration::from_secs(10));
    assert_eq!(config.segment_policy().archaic_limit, 120);
}

#[test]
fn test_cacheDirectory_withOverride_shouldUseIt() {
    let dir = common::create_temp_dir().unwrap();
    let mut config = Config::default();
    config.cache_dir = Some(dir.path().to_path_buf());
    assert_eq!(config.cache_directory(), dir.path());
}

#[test]
fn test_backendKind_fromStr_shouldAcceptKnownNames() {
    assert_eq!("Ollama".parse::<BackendKind>().unwrap(), BackendKind::Ollama);
    assert_eq!("deepseek".parse::<BackendKind>().unwrap(), BackendKind::DeepSeek);
    assert!("anthropic".parse::<BackendKind>().is_err());
}
