//! Please note that the structures in this module are not stable

pub mod bundle_tool;

use glob::glob;
use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub fn settings_for(component: &str) -> Result<config::Config> {
    let conf_d = glob(
        &conf_dir_from_env(&format_conf_dir_env(component))
            .unwrap_or_else(|| format!("/etc/p12/{}.conf.d/*.yml", component)),
    )?
    .collect::<std::result::Result<Vec<PathBuf>, _>>()
    .context("Listing configuration files in conf.d")?;

    Ok(config::Config::default()
        .merge(
            config::File::from(Path::new(&format!("/usr/p12/{}.yml", component))).required(false),
        )
        .context("Loading configuration file from /usr/p12")?
        .merge(
            config::File::from(Path::new(
                &conf_dir_from_env(&format_conf_env(component))
                    .unwrap_or_else(|| format!("/etc/p12/{}.yml", component)),
            ))
            .required(false),
        )
        .context("Loading configuration file from /etc/p12")?
        .merge(
            conf_d
                .into_iter()
                .map(config::File::from)
                .collect::<Vec<_>>(),
        )
        .context("Loading configuration files from conf.d")?
        .clone())
}

pub fn format_conf_env(component: &str) -> String {
    format!("{}_CONF", component_env_prefix(component))
}

pub fn format_conf_dir_env(component: &str) -> String {
    format!("{}_CONF_DIR", component_env_prefix(component))
}

fn component_env_prefix(component: &str) -> String {
    component.to_string().replace('-', "_").to_uppercase()
}

fn conf_dir_from_env(key: &str) -> Option<String> {
    match env::var_os(key) {
        None => None,
        Some(v) => match v.into_string() {
            Ok(s) => Some(s),
            Err(_) => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{format_conf_dir_env, format_conf_env, settings_for};

    #[test]
    fn test_env_names() {
        assert_eq!(format_conf_env("bundle-tool"), "BUNDLE_TOOL_CONF");
        assert_eq!(format_conf_dir_env("bundle-tool"), "BUNDLE_TOOL_CONF_DIR");
    }

    #[test]
    fn test_conf_d_overrides_main_file() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("main.yml");
        let conf_d = dir.path().join("conf.d");
        fs::create_dir(&conf_d).unwrap();

        fs::write(&main, "first: main\nsecond: main\n").unwrap();
        fs::write(conf_d.join("override.yml"), "second: conf.d\n").unwrap();

        std::env::set_var(format_conf_env("settings-test"), &main);
        std::env::set_var(
            format_conf_dir_env("settings-test"),
            conf_d.join("*.yml"),
        );

        let settings = settings_for("settings-test").unwrap();
        assert_eq!(settings.get_string("first").unwrap(), "main");
        assert_eq!(settings.get_string("second").unwrap(), "conf.d");
    }

    #[test]
    fn test_missing_files_are_optional() {
        std::env::set_var(format_conf_env("settings-missing"), "/nonexistent/p12.yml");
        std::env::set_var(
            format_conf_dir_env("settings-missing"),
            "/nonexistent/conf.d/*.yml",
        );

        let settings = settings_for("settings-missing").unwrap();
        assert!(settings.get_string("anything").is_err());
    }
}
