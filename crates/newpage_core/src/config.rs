use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::host::{AclRule, FormTarget, Lang, Permission, StartPageResolver, StaticAcl};
use crate::options::Options;

pub const DEFAULT_BASE_URL: &str = "/";
pub const DEFAULT_SCRIPT: &str = "doku.php";
pub const DEFAULT_CHARSET: &str = "utf-8";
pub const DEFAULT_START_PAGE: &str = "start";

pub const DEFAULT_CONFIG_TOML: &str = r#"[site]
base_url = "/"
script = "doku.php"
charset = "utf-8"
start_page = "start"

[defaults]
exclude = ""
showroot = true
hide = true
hideacl = false
autopage = false

[lang]

[acl]
default = "create"
rules = []
"#;

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct NewPageConfig {
    #[serde(default)]
    pub site: SiteSection,
    #[serde(default)]
    pub defaults: Options,
    #[serde(default)]
    pub lang: BTreeMap<String, String>,
    #[serde(default)]
    pub acl: AclSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct SiteSection {
    pub base_url: Option<String>,
    pub script: Option<String>,
    pub charset: Option<String>,
    pub start_page: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct AclSection {
    pub default: Option<Permission>,
    #[serde(default)]
    pub rules: Vec<AclRule>,
}

impl NewPageConfig {
    /// Resolve the site base URL: env NEWPAGE_BASE_URL > config > DEFAULT_BASE_URL.
    pub fn base_url(&self) -> String {
        env_override("NEWPAGE_BASE_URL")
            .or_else(|| self.site.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    /// Resolve the edit script: env NEWPAGE_SCRIPT > config > DEFAULT_SCRIPT.
    pub fn script(&self) -> String {
        env_override("NEWPAGE_SCRIPT")
            .or_else(|| self.site.script.clone())
            .unwrap_or_else(|| DEFAULT_SCRIPT.to_string())
    }

    pub fn charset(&self) -> &str {
        self.site.charset.as_deref().unwrap_or(DEFAULT_CHARSET)
    }

    pub fn start_page(&self) -> &str {
        self.site
            .start_page
            .as_deref()
            .filter(|page| !page.trim().is_empty())
            .unwrap_or(DEFAULT_START_PAGE)
    }

    pub fn form_target(&self) -> FormTarget {
        FormTarget {
            action: join_action(&self.base_url(), &self.script()),
            charset: self.charset().to_string(),
        }
    }

    pub fn resolver(&self) -> StartPageResolver {
        StartPageResolver {
            start_page: self.start_page().to_string(),
        }
    }

    pub fn lang(&self) -> Lang {
        Lang::with_overrides(&self.lang)
    }

    pub fn acl(&self) -> StaticAcl {
        StaticAcl {
            default: self.acl.default.unwrap_or(Permission::Create),
            rules: self.acl.rules.clone(),
        }
    }
}

/// Load and parse a NewPageConfig from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<NewPageConfig> {
    if !config_path.exists() {
        return Ok(NewPageConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: NewPageConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

fn env_override(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Join a base URL and script name with exactly one slash between them.
pub fn join_action(base_url: &str, script: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        script.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_uses_builtin_site_values() {
        let config = NewPageConfig::default();
        assert_eq!(config.charset(), "utf-8");
        assert_eq!(config.start_page(), "start");
        assert_eq!(config.defaults, Options::default());
        assert_eq!(config.acl().default, Permission::Create);
        assert!(config.acl().rules.is_empty());
    }

    #[test]
    fn load_config_returns_default_for_missing_file() {
        let config = load_config(Path::new("/nonexistent/config.toml")).expect("load config");
        assert_eq!(config, NewPageConfig::default());
    }

    #[test]
    fn embedded_default_config_parses() {
        let parsed: NewPageConfig = toml::from_str(DEFAULT_CONFIG_TOML).expect("parse default");
        assert_eq!(parsed.defaults, Options::default());
        assert_eq!(parsed.acl.default, Some(Permission::Create));
        assert_eq!(parsed.site.script.as_deref(), Some("doku.php"));
    }

    #[test]
    fn load_config_parses_all_sections() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
[site]
base_url = "https://wiki.example.org/"
script = "/doku.php"
start_page = "index"

[defaults]
exclude = "playground"
showroot = false
autopage = true

[lang]
okbutton = "Create"

[acl]
default = "read"

[[acl.rules]]
pattern = "projects:*"
permission = "create"
"#,
        )
        .expect("write config");

        let config = load_config(&config_path).expect("load config");
        assert_eq!(config.site.base_url.as_deref(), Some("https://wiki.example.org/"));
        assert_eq!(config.start_page(), "index");
        assert_eq!(config.defaults.exclude, "playground");
        assert!(!config.defaults.show_root);
        assert!(config.defaults.hide);
        assert!(config.defaults.autopage);
        assert_eq!(config.defaults.label, "okbutton");
        assert_eq!(config.lang().get_or_literal("okbutton"), "Create");

        let acl = config.acl();
        assert_eq!(acl.default, Permission::Read);
        assert_eq!(acl.rules.len(), 1);
        assert_eq!(acl.rules[0].permission, Permission::Create);
    }

    #[test]
    fn load_config_tolerates_partial_toml() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("config.toml");
        fs::write(&config_path, "[defaults]\nhide = false\n").expect("write config");

        let config = load_config(&config_path).expect("load config");
        assert!(!config.defaults.hide);
        assert!(config.defaults.show_root);
        assert!(config.site.base_url.is_none());
    }

    #[test]
    fn load_config_returns_error_for_invalid_toml() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("config.toml");
        fs::write(&config_path, "[site\nbase_url = \"oops\"").expect("write config");
        let error = load_config(&config_path).expect_err("must fail");
        assert!(error.to_string().contains("failed to parse"));
    }

    #[test]
    fn join_action_normalizes_slashes() {
        assert_eq!(join_action("/", "doku.php"), "/doku.php");
        assert_eq!(join_action("https://wiki.example.org/", "/doku.php"), "https://wiki.example.org/doku.php");
        assert_eq!(join_action("/wiki", "doku.php"), "/wiki/doku.php");
    }

    #[test]
    fn blank_start_page_falls_back_to_default() {
        let config = NewPageConfig {
            site: SiteSection {
                start_page: Some("  ".to_string()),
                ..SiteSection::default()
            },
            ..NewPageConfig::default()
        };
        assert_eq!(config.start_page(), "start");
    }
}
