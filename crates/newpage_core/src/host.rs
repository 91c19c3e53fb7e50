use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::ids::{get_ns, resolve_id};

/// Permission levels, ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    None,
    Read,
    Edit,
    Create,
    Upload,
    Delete,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Read => "read",
            Self::Edit => "edit",
            Self::Create => "create",
            Self::Upload => "upload",
            Self::Delete => "delete",
        }
    }
}

pub trait AccessCheck {
    /// Effective permission of the current user on `id`. Namespace checks pass
    /// the namespace followed by a colon.
    fn permission(&self, id: &str) -> Permission;

    fn can_create(&self, namespace: &str) -> bool {
        self.permission(&format!("{namespace}:")) >= Permission::Create
    }
}

/// Recursive namespace search over the wiki's page store.
pub trait NamespaceIndex {
    /// Every namespace strictly below `root` (the empty string is the wiki
    /// root), parents before children and siblings grouped together.
    fn namespaces(&self, root: &str) -> Result<Vec<String>>;
}

pub trait PageResolver {
    fn resolve_page(&self, id: &str, context_page: &str) -> String;
}

/// Resolves relative references and maps namespace references (`ns:`) onto the
/// namespace start page.
#[derive(Debug, Clone)]
pub struct StartPageResolver {
    pub start_page: String,
}

impl Default for StartPageResolver {
    fn default() -> Self {
        Self {
            start_page: "start".to_string(),
        }
    }
}

impl PageResolver for StartPageResolver {
    fn resolve_page(&self, id: &str, context_page: &str) -> String {
        resolve_id(id, context_page, &self.start_page)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AclRule {
    /// `ns:*` for a namespace and everything below it, `*` for the whole wiki,
    /// anything else names a single page.
    pub pattern: String,
    pub permission: Permission,
}

/// Fixed rule table consulted in place of a user-aware ACL backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticAcl {
    pub default: Permission,
    pub rules: Vec<AclRule>,
}

impl Default for StaticAcl {
    fn default() -> Self {
        Self {
            default: Permission::Create,
            rules: Vec::new(),
        }
    }
}

impl AccessCheck for StaticAcl {
    fn permission(&self, id: &str) -> Permission {
        let id = id.trim_start_matches(':');
        if !id.ends_with(':')
            && let Some(rule) = self.rules.iter().find(|rule| rule.pattern == id)
        {
            return rule.permission;
        }

        let mut namespace = id.trim_end_matches(':');
        if !id.ends_with(':') {
            namespace = get_ns(namespace);
        }
        loop {
            let wanted = if namespace.is_empty() {
                "*".to_string()
            } else {
                format!("{namespace}:*")
            };
            if let Some(rule) = self.rules.iter().find(|rule| rule.pattern == wanted) {
                return rule.permission;
            }
            if namespace.is_empty() {
                return self.default;
            }
            namespace = get_ns(namespace);
        }
    }
}

pub const DEFAULT_LANG: &[(&str, &str)] = &[
    ("okbutton", "Add page"),
    ("name", "Page name"),
    ("namespaceRoot", "[root]"),
    ("nooption", "You are not allowed to create pages here."),
];

/// Localized interface strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lang {
    strings: BTreeMap<String, String>,
}

impl Default for Lang {
    fn default() -> Self {
        Self {
            strings: DEFAULT_LANG
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        }
    }
}

impl Lang {
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut lang = Self::default();
        for (key, value) in overrides {
            lang.strings.insert(key.clone(), value.clone());
        }
        lang
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.strings
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Localized string for `key`, or the key itself when there is none.
    pub fn get_or_literal<'a>(&'a self, key: &'a str) -> &'a str {
        self.get(key).unwrap_or(key)
    }
}

/// Per-render caller context.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub page_id: String,
    pub now: DateTime<Local>,
}

impl RenderContext {
    pub fn new(page_id: impl Into<String>) -> Self {
        Self {
            page_id: page_id.into(),
            now: Local::now(),
        }
    }

    pub fn namespace(&self) -> &str {
        get_ns(&self.page_id)
    }
}

/// Where the generated form is submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormTarget {
    pub action: String,
    pub charset: String,
}

impl Default for FormTarget {
    fn default() -> Self {
        Self {
            action: "/doku.php".to_string(),
            charset: "utf-8".to_string(),
        }
    }
}

/// The wiki services a render consults.
#[derive(Clone, Copy)]
pub struct Host<'a> {
    pub acl: &'a dyn AccessCheck,
    pub index: &'a dyn NamespaceIndex,
    pub resolver: &'a dyn PageResolver,
    pub lang: &'a Lang,
    pub target: &'a FormTarget,
}


#[cfg(test)]
mod tests {
    use super::{AccessCheck, AclRule, Lang, Permission, StaticAcl};
    use std::collections::BTreeMap;

    fn rule(pattern: &str, permission: Permission) -> AclRule {
        AclRule {
            pattern: pattern.to_string(),
            permission,
        }
    }

    #[test]
    fn static_acl_uses_deepest_namespace_rule() {
        let acl = StaticAcl {
            default: Permission::Read,
            rules: vec![
                rule("projects:*", Permission::Create),
                rule("projects:archive:*", Permission::Read),
            ],
        };
        assert!(acl.can_create("projects"));
        assert!(acl.can_create("projects:new"));
        assert!(!acl.can_create("projects:archive"));
        assert!(!acl.can_create("projects:archive:2020"));
        assert!(!acl.can_create("other"));
        assert!(!acl.can_create(""));
    }

    #[test]
    fn static_acl_page_rule_beats_namespace_rule() {
        let acl = StaticAcl {
            default: Permission::None,
            rules: vec![
                rule("wiki:*", Permission::Edit),
                rule("wiki:locked", Permission::Read),
            ],
        };
        assert_eq!(acl.permission("wiki:locked"), Permission::Read);
        assert_eq!(acl.permission("wiki:open"), Permission::Edit);
        assert_eq!(acl.permission("elsewhere"), Permission::None);
    }

    #[test]
    fn static_acl_root_rule_applies_everywhere() {
        let acl = StaticAcl {
            default: Permission::None,
            rules: vec![rule("*", Permission::Create)],
        };
        assert!(acl.can_create(""));
        assert!(acl.can_create("deep:down:here"));
    }

    #[test]
    fn lang_falls_back_to_literal() {
        let lang = Lang::with_overrides(&BTreeMap::from([(
            "okbutton".to_string(),
            "Create".to_string(),
        )]));
        assert_eq!(lang.get_or_literal("okbutton"), "Create");
        assert_eq!(lang.get_or_literal("name"), "Page name");
        assert_eq!(lang.get_or_literal("Make it so"), "Make it so");
    }
}
