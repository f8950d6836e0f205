//! Classification of changed paths into rule modules
//!
//! The catalog is the output of an out-of-band extraction step: one record per rule
//! module, keyed by its fully qualified class name. It is built once per run and
//! only read afterwards.

use crate::artifacts::changes::git_change::GitChange;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Java source path: `<root>/src/{main,test}/java/<package path>/<Class>.java`
const JAVA_SOURCE_REGEX: &str = r"(?:^|/)src/(main|test)/java/(.+)\.java$";
const TEST_SUFFIX: &str = "Test";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub property_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleExtractInfo {
    pub package_name: String,
    pub name: String,
    pub parent: String,
    #[serde(default)]
    pub properties: Vec<PropertyInfo>,
}

impl ModuleExtractInfo {
    pub fn full_name(&self) -> String {
        if self.package_name.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.package_name, self.name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleKind<'c> {
    RuleModule(&'c ModuleExtractInfo),
    RuleModuleTest(&'c ModuleExtractInfo),
    UtilityCode,
    Unrecognized,
}

#[derive(Debug, Clone)]
pub struct ModuleCatalog {
    modules: HashMap<String, ModuleExtractInfo>,
    java_source: regex::Regex,
}

impl ModuleCatalog {
    pub fn new(modules: impl IntoIterator<Item = ModuleExtractInfo>) -> anyhow::Result<Self> {
        let java_source = regex::Regex::new(JAVA_SOURCE_REGEX)
            .with_context(|| format!("invalid java source regex: {JAVA_SOURCE_REGEX}"))?;

        Ok(ModuleCatalog {
            modules: modules
                .into_iter()
                .map(|module| (module.full_name(), module))
                .collect(),
            java_source,
        })
    }

    /// Parse a JSON array of module records
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let modules: Vec<ModuleExtractInfo> =
            serde_json::from_str(json).context("Unable to parse module catalog")?;

        Self::new(modules)
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read module catalog {}", path.display()))?;

        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn get(&self, full_name: &str) -> Option<&ModuleExtractInfo> {
        self.modules.get(full_name)
    }

    pub fn classify(&self, change: &GitChange) -> ModuleKind<'_> {
        let Some(captures) = self.java_source.captures(change.path()) else {
            return ModuleKind::Unrecognized;
        };
        let class_name = captures[2].replace('/', ".");

        match &captures[1] {
            "main" => self
                .get(&class_name)
                .map_or(ModuleKind::UtilityCode, ModuleKind::RuleModule),
            _ => class_name
                .strip_suffix(TEST_SUFFIX)
                .and_then(|module_name| self.get(module_name))
                .map_or(ModuleKind::Unrecognized, ModuleKind::RuleModuleTest),
        }
    }

    /// Catalogued modules whose main source is touched, first-seen order
    pub fn collect_modules(&self, changes: &[GitChange]) -> Vec<ModuleExtractInfo> {
        let mut seen = HashSet::new();

        changes
            .iter()
            .filter_map(|change| match self.classify(change) {
                ModuleKind::RuleModule(module) => Some(module),
                _ => None,
            })
            .filter(|module| seen.insert(module.full_name()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};
    use std::collections::BTreeSet;

    #[fixture]
    fn catalog() -> ModuleCatalog {
        ModuleCatalog::from_json(
            r#"[
                {
                    "packageName": "com.example.checks.coding",
                    "name": "MagicNumberCheck",
                    "parent": "TreeWalker",
                    "properties": [{"name": "ignoreNumbers", "type": "double[]"}]
                },
                {
                    "packageName": "com.example.checks",
                    "name": "NewlineAtEndOfFileCheck",
                    "parent": "Checker"
                }
            ]"#,
        )
        .unwrap()
    }

    fn change(path: &str) -> GitChange {
        GitChange::new(path, BTreeSet::new(), BTreeSet::new())
    }

    #[rstest]
    fn parses_catalog_records(catalog: ModuleCatalog) {
        let module = catalog.get("com.example.checks.coding.MagicNumberCheck").unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(module.parent, "TreeWalker");
        assert_eq!(
            module.properties,
            vec![PropertyInfo {
                name: "ignoreNumbers".into(),
                property_type: "double[]".into()
            }]
        );
    }

    #[rstest]
    fn main_source_of_catalogued_module_is_a_rule_module(catalog: ModuleCatalog) {
        let kind = catalog.classify(&change(
            "src/main/java/com/example/checks/coding/MagicNumberCheck.java",
        ));

        assert!(matches!(kind, ModuleKind::RuleModule(m) if m.name == "MagicNumberCheck"));
    }

    #[rstest]
    fn test_source_of_catalogued_module_is_a_module_test(catalog: ModuleCatalog) {
        let kind = catalog.classify(&change(
            "checks/src/test/java/com/example/checks/NewlineAtEndOfFileCheckTest.java",
        ));

        assert!(matches!(kind, ModuleKind::RuleModuleTest(m) if m.name == "NewlineAtEndOfFileCheck"));
    }

    #[rstest]
    #[case("src/main/java/com/example/utils/CommonUtil.java", ModuleKind::UtilityCode)]
    #[case("src/test/java/com/example/utils/CommonUtilTest.java", ModuleKind::Unrecognized)]
    #[case("src/test/resources/com/example/InputMagicNumber.java", ModuleKind::Unrecognized)]
    #[case("pom.xml", ModuleKind::Unrecognized)]
    #[case("mysrc/main/java/com/example/checks/NewlineAtEndOfFileCheck.java", ModuleKind::Unrecognized)]
    fn other_paths(catalog: ModuleCatalog, #[case] path: &str, #[case] expected: ModuleKind<'static>) {
        assert_eq!(catalog.classify(&change(path)), expected);
    }

    #[rstest]
    fn collects_touched_modules_once_in_first_seen_order(catalog: ModuleCatalog) {
        let changes = vec![
            change("src/main/java/com/example/checks/NewlineAtEndOfFileCheck.java"),
            change("src/test/java/com/example/checks/coding/MagicNumberCheckTest.java"),
            change("src/main/java/com/example/checks/coding/MagicNumberCheck.java"),
            change("src/main/java/com/example/checks/NewlineAtEndOfFileCheck.java"),
        ];

        let modules = catalog.collect_modules(&changes);

        assert_eq!(
            modules.iter().map(ModuleExtractInfo::full_name).collect::<Vec<_>>(),
            vec![
                "com.example.checks.NewlineAtEndOfFileCheck",
                "com.example.checks.coding.MagicNumberCheck",
            ]
        );
    }
}
