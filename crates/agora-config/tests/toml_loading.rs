//! Integration tests for TOML configuration loading.
//!
//! Uses `figment::Jail` for sandboxed files and environment variables.

use agora_config::AgoraConfig;
use figment::{
    Figment, Jail,
    providers::{Format, Serialized, Toml},
};
use pretty_assertions::assert_eq;

#[test]
fn loads_all_sections_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[database]
path = "/var/lib/agora/city.db"

[democracy]
required_majority = 0.66
min_participation = 10
default_rating_min = 0
default_rating_max = 5

[general]
default_limit = 50
"#,
        )?;

        let config: AgoraConfig = Figment::from(Serialized::defaults(AgoraConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.database.path, "/var/lib/agora/city.db");
        assert!((config.democracy.required_majority - 0.66).abs() < f64::EPSILON);
        assert_eq!(config.democracy.min_participation, 10);
        assert_eq!(config.democracy.default_rating_min, 0);
        assert_eq!(config.democracy.default_rating_max, 5);
        assert_eq!(config.general.default_limit, 50);
        assert!(config.validate().is_ok());
        Ok(())
    });
}

#[test]
fn partial_section_keeps_other_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r"
[democracy]
min_participation = 3
",
        )?;

        let config: AgoraConfig = Figment::from(Serialized::defaults(AgoraConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.democracy.min_participation, 3);
        assert!((config.democracy.required_majority - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.database, agora_config::DatabaseConfig::default());
        Ok(())
    });
}

#[test]
fn project_local_file_is_picked_up() {
    Jail::expect_with(|jail| {
        jail.create_dir(".agora")?;
        jail.create_file(
            ".agora/config.toml",
            r#"
[database]
path = "project.db"
"#,
        )?;

        let config = AgoraConfig::load().expect("config loads");
        assert_eq!(config.database.path, "project.db");
        Ok(())
    });
}

#[test]
fn invalid_majority_fails_load() {
    Jail::expect_with(|jail| {
        jail.create_dir(".agora")?;
        jail.create_file(
            ".agora/config.toml",
            r"
[democracy]
required_majority = 1.5
",
        )?;

        let err = AgoraConfig::load().expect_err("should reject majority");
        assert!(err.to_string().contains("democracy.required_majority"));
        Ok(())
    });
}
