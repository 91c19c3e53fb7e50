use serde::{Deserialize, Serialize};

pub const DEFAULT_LABEL_KEY: &str = "okbutton";

/// Per-directive settings. Defaults come from configuration and are
/// overridden by the directive's `?...` part.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Options {
    /// `;`-separated namespace prefixes left out of the selector.
    #[serde(default)]
    pub exclude: String,
    #[serde(default = "default_true", rename = "showroot")]
    pub show_root: bool,
    #[serde(default = "default_true")]
    pub hide: bool,
    #[serde(default, rename = "hideacl")]
    pub hide_acl: bool,
    #[serde(default)]
    pub autopage: bool,
    /// Localization key or literal button text.
    #[serde(default = "default_label")]
    pub label: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            exclude: String::new(),
            show_root: true,
            hide: true,
            hide_acl: false,
            autopage: false,
            label: default_label(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_label() -> String {
    DEFAULT_LABEL_KEY.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKey {
    Exclude,
    ShowRoot,
    Hide,
    HideAcl,
    Autopage,
    Label,
}

impl OptionKey {
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "exclude" => Some(Self::Exclude),
            "showroot" => Some(Self::ShowRoot),
            "hide" => Some(Self::Hide),
            "hideacl" => Some(Self::HideAcl),
            "autopage" => Some(Self::Autopage),
            "label" => Some(Self::Label),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exclude => "exclude",
            Self::ShowRoot => "showroot",
            Self::Hide => "hide",
            Self::HideAcl => "hideacl",
            Self::Autopage => "autopage",
            Self::Label => "label",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum OptionValue {
    Flag(bool),
    Text(String),
}

/// Apply an option string such as `showroot,nohide,label=Create` to `options`.
///
/// Booleans are negated with a `no` prefix. Tokens naming no known option are
/// dropped. A known option whose name itself begins with `no` could not be
/// addressed directly.
pub fn parse_options(option_string: &str, options: &mut Options) {
    for token in option_string.split([',', '&']) {
        let lowered = token.trim().to_lowercase();
        let (name, negated) = match lowered.strip_prefix("no") {
            Some(rest) => (rest.to_string(), true),
            None => (lowered, false),
        };

        let parsed = match OptionKey::parse(&name) {
            Some(key) => Some((key, OptionValue::Flag(!negated))),
            None => {
                let (key, value) = match token.split_once('=') {
                    Some((key, value)) => (key.trim(), Some(value.trim())),
                    None => (token.trim(), None),
                };
                OptionKey::parse(&key.to_lowercase()).and_then(|key| {
                    value.map(|value| (key, OptionValue::Text(value.to_string())))
                })
            }
        };

        match parsed {
            Some((key, value)) => apply(options, key, value),
            None => {
                if !token.trim().is_empty() {
                    tracing::debug!(token = token.trim(), "ignoring unknown option");
                }
            }
        }
    }
}

fn apply(options: &mut Options, key: OptionKey, value: OptionValue) {
    match key {
        OptionKey::ShowRoot => options.show_root = value.as_bool(),
        OptionKey::Hide => options.hide = value.as_bool(),
        OptionKey::HideAcl => options.hide_acl = value.as_bool(),
        OptionKey::Autopage => options.autopage = value.as_bool(),
        OptionKey::Exclude => match value {
            OptionValue::Text(text) => options.exclude = text,
            OptionValue::Flag(false) => options.exclude.clear(),
            OptionValue::Flag(true) => {}
        },
        OptionKey::Label => match value {
            OptionValue::Text(text) => options.label = text,
            OptionValue::Flag(false) => options.label = default_label(),
            OptionValue::Flag(true) => {}
        },
    }
}

impl OptionValue {
    fn as_bool(&self) -> bool {
        match self {
            Self::Flag(flag) => *flag,
            Self::Text(text) => !matches!(
                text.to_lowercase().as_str(),
                "" | "0" | "false" | "no" | "off"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{OptionKey, Options, parse_options};

    fn parsed(input: &str) -> Options {
        let mut options = Options::default();
        parse_options(input, &mut options);
        options
    }

    #[test]
    fn bare_tokens_enable_and_no_prefix_disables() {
        let options = parsed("autopage,nohide,noshowroot,hideacl");
        assert!(options.autopage);
        assert!(!options.hide);
        assert!(!options.show_root);
        assert!(options.hide_acl);
    }

    #[test]
    fn tokens_are_trimmed_and_case_insensitive() {
        let options = parsed(" AutoPage & NoHide ");
        assert!(options.autopage);
        assert!(!options.hide);
    }

    #[test]
    fn key_value_pairs_set_strings_and_booleans() {
        let options = parsed("label=Create Page,exclude=Private;Wiki,hide=0,autopage=yes");
        assert_eq!(options.label, "Create Page");
        assert_eq!(options.exclude, "Private;Wiki");
        assert!(!options.hide);
        assert!(options.autopage);
    }

    #[test]
    fn key_is_lowercased_but_value_keeps_case() {
        let options = parsed("LABEL=MixedCase");
        assert_eq!(options.label, "MixedCase");
    }

    #[test]
    fn unknown_tokens_are_ignored() {
        let options = parsed("bogus,color=red,,=x,nothing");
        assert_eq!(options, Options::default());
    }

    #[test]
    fn negated_string_options_reset() {
        let mut options = Options {
            exclude: "private".to_string(),
            label: "custom".to_string(),
            ..Options::default()
        };
        parse_options("noexclude,nolabel", &mut options);
        assert_eq!(options.exclude, "");
        assert_eq!(options.label, "okbutton");
    }

    #[test]
    fn bare_string_option_without_value_is_ignored() {
        let options = parsed("exclude,label");
        assert_eq!(options, Options::default());
    }

    #[test]
    fn later_tokens_override_earlier_ones() {
        let options = parsed("hide,nohide");
        assert!(!options.hide);
        let options = parsed("nohide,hide");
        assert!(options.hide);
    }

    #[test]
    fn only_recognized_keys_change() {
        let options = parsed("noautopage,showroot,nohideacl,label=Go");
        let defaults = Options::default();
        assert_eq!(options.exclude, defaults.exclude);
        assert_eq!(options.hide, defaults.hide);
        assert_eq!(options.label, "Go");
    }

    #[test]
    fn option_key_names_round_trip() {
        for key in [
            OptionKey::Exclude,
            OptionKey::ShowRoot,
            OptionKey::Hide,
            OptionKey::HideAcl,
            OptionKey::Autopage,
            OptionKey::Label,
        ] {
            assert_eq!(OptionKey::parse(key.as_str()), Some(key));
        }
    }
}
