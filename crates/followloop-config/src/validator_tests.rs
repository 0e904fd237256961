use super::*;

#[test]
fn test_validate_default_config() {
    let config = Config::default();
    let result = ConfigValidator::validate(&config);
    assert!(result.is_valid(), "{:?}", result.errors);
}

#[test]
fn test_validate_bad_endpoint() {
    let mut config = Config::default();
    config.browser.endpoint = "localhost:9222".to_string();

    let result = ConfigValidator::validate(&config);
    assert!(!result.is_valid());
    assert!(result.errors.iter().any(|e| e.path == "browser.endpoint"));
}

#[test]
fn test_validate_foreign_site_warns() {
    let mut config = Config::default();
    config.browser.site_url = "https://example.com".to_string();

    let result = ConfigValidator::validate(&config);
    assert!(result.is_valid());
    assert!(result.warnings.iter().any(|w| w.path == "browser.site_url"));
}

#[test]
fn test_validate_zero_breaker() {
    let mut config = Config::default();
    config.agent.max_consecutive_errors = 0;

    let result = ConfigValidator::validate(&config);
    assert!(result.errors.iter().any(|e| e.path == "agent.max_consecutive_errors"));
}

#[test]
fn test_validate_defaults_are_checked() {
    let mut config = Config::default();
    config.defaults.daily_follow_limit = 0;

    let result = ConfigValidator::validate(&config);
    assert!(result.errors.iter().any(|e| e.path == "defaults.dailyFollowLimit"));
}

#[test]
fn test_settings_ranges() {
    let settings = Settings {
        daily_follow_limit: 501,
        follow_interval: 3,
        time_variance: 51,
        hourly_follow_limit: 101,
        max_actions_session: 1001,
        unfollow_seconds: Some(3601),
        ..Default::default()
    };
    let result = SettingsValidator::validate(&settings);
    let paths: Vec<&str> = result.errors.iter().map(|e| e.path.as_str()).collect();
    for field in [
        "dailyFollowLimit",
        "followInterval",
        "timeVariance",
        "hourlyFollowLimit",
        "maxActionsSession",
        "unfollowSeconds",
    ] {
        assert!(paths.contains(&field), "missing {}", field);
    }
}

#[test]
fn test_max_thinking_below_min_rejected() {
    let settings = Settings {
        min_thinking_time: 800,
        max_thinking_time: 400,
        ..Default::default()
    };
    let result = SettingsValidator::validate(&settings);
    assert!(result.errors.iter().any(|e| e.path == "maxThinkingTime"));
}

#[test]
fn test_both_modes_disabled_warns() {
    let settings = Settings {
        enable_auto_follow: false,
        enable_auto_unfollow: false,
        ..Default::default()
    };
    let result = SettingsValidator::validate(&settings);
    assert!(result.is_valid());
    assert_eq!(result.warnings.len(), 1);
}

#[test]
fn test_apply_setting() {
    let base = Settings::default();
    let updated = SettingsValidator::apply(&base, "dailyFollowLimit", "120").unwrap();
    assert_eq!(updated.daily_follow_limit, 120);

    let updated = SettingsValidator::apply(&updated, "enableAutoUnfollow", "true").unwrap();
    assert!(updated.enable_auto_unfollow);

    let updated = SettingsValidator::apply(&updated, "unfollowSeconds", "").unwrap();
    assert_eq!(updated.unfollow_seconds, None);
}

#[test]
fn test_apply_rejects_out_of_range_without_mutation() {
    let base = Settings::default();
    let err = SettingsValidator::apply(&base, "dailyFollowLimit", "9000").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { .. }));
    assert_eq!(base.daily_follow_limit, 50);
}

#[test]
fn test_apply_unknown_key() {
    let err = SettingsValidator::apply(&Settings::default(), "lastUpdated", "x").unwrap_err();
    assert!(matches!(err, ConfigError::UnknownSetting(_)));
}

#[test]
fn test_validate_username() {
    assert!(SettingsValidator::validate_username("alice_01").is_ok());
    assert!(SettingsValidator::validate_username("not-valid").is_err());
    assert!(SettingsValidator::validate_username("").is_err());
}
