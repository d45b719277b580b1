//! Example programs offered in the session.
//!
//! Each example is a `.js` file whose first line is `// <description>`; the
//! remaining lines are the source loaded into the editor.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Name of a catalog entry; the file stem of its source.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExampleName(String);

impl ExampleName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExampleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExampleName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Example {
    pub name: ExampleName,
    pub description: String,
    pub source: String,
}

impl Example {
    pub fn parse(name: impl Into<String>, contents: &str) -> Self {
        let (first, source) = contents.split_once('\n').unwrap_or((contents, ""));
        let description = first
            .trim_start()
            .strip_prefix("//")
            .unwrap_or(first)
            .trim()
            .to_string();
        Example {
            name: ExampleName::new(name),
            description,
            source: source.to_string(),
        }
    }
}

const BUILTIN: &[(&str, &str)] = &[
    ("max", include_str!("../catalog/max.js")),
    ("counter", include_str!("../catalog/counter.js")),
    ("sumTo", include_str!("../catalog/sumTo.js")),
    ("inc", include_str!("../catalog/inc.js")),
    ("cons", include_str!("../catalog/cons.js")),
    ("twice", include_str!("../catalog/twice.js")),
    ("adder", include_str!("../catalog/adder.js")),
];

#[derive(Clone, Debug)]
pub struct Catalog {
    examples: Vec<Example>,
}

impl Catalog {
    pub fn builtin() -> Self {
        Self {
            examples: BUILTIN
                .iter()
                .map(|(name, contents)| Example::parse(*name, contents))
                .collect(),
        }
    }

    /// Loads every `*.js` file in `dir`, ordered by name.
    pub fn from_dir(dir: &Path) -> Result<Self, SessionError> {
        let catalog_err = |message: String| SessionError::Catalog {
            path: dir.to_path_buf(),
            message,
        };
        let entries = std::fs::read_dir(dir).map_err(|e| catalog_err(e.to_string()))?;

        let mut examples = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| catalog_err(e.to_string()))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("js") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| catalog_err(format!("{}: {e}", path.display())))?;
            examples.push(Example::parse(stem, &contents));
        }
        if examples.is_empty() {
            return Err(SessionError::EmptyCatalog);
        }
        examples.sort_by(|a, b| a.name.cmp(&b.name));
        tracing::debug!(count = examples.len(), dir = %dir.display(), "loaded example catalog");
        Ok(Self { examples })
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &ExampleName> {
        self.examples.iter().map(|e| &e.name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Example> {
        self.examples.iter()
    }

    pub fn get(&self, name: &ExampleName) -> Result<&Example, SessionError> {
        self.examples
            .iter()
            .find(|e| &e.name == name)
            .ok_or_else(|| SessionError::UnknownExample {
                name: name.to_string(),
                available: self.names().map(ExampleName::as_str).collect::<Vec<_>>().join(", "),
            })
    }

    /// The preferred example when named, otherwise the first one.
    pub fn initial(&self, preferred: Option<&ExampleName>) -> Result<&Example, SessionError> {
        match preferred {
            Some(name) => self.get(name),
            None => self.examples.first().ok_or(SessionError::EmptyCatalog),
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_comes_from_first_line() {
        let ex = Example::parse("inc", "// Function inlining\nfunction inc(n) {}\n");
        assert_eq!(ex.description, "Function inlining");
        assert_eq!(ex.source, "function inc(n) {}\n");
    }

    #[test]
    fn builtin_starts_with_max() {
        let catalog = Catalog::builtin();
        let first = catalog.initial(None).unwrap();
        assert_eq!(first.name.as_str(), "max");
        assert!(first.source.starts_with("// This is a live demo"));
        assert!(catalog.get(&"sumTo".into()).is_ok());
    }

    #[test]
    fn unknown_example_lists_alternatives() {
        let catalog = Catalog::builtin();
        let err = catalog.get(&"nope".into()).unwrap_err();
        match err {
            SessionError::UnknownExample { name, available } => {
                assert_eq!(name, "nope");
                assert!(available.contains("counter"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn loads_directory_sorted_and_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("zeta.js"), "// Last\nassert(true);\n").unwrap();
        std::fs::write(dir.path().join("alpha.js"), "// First\nassert(1 === 1);\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let catalog = Catalog::from_dir(dir.path()).unwrap();
        let names: Vec<_> = catalog.names().map(ExampleName::as_str).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(catalog.get(&"zeta".into()).unwrap().description, "Last");
    }

    #[test]
    fn empty_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(Catalog::from_dir(dir.path()), Err(SessionError::EmptyCatalog)));
    }
}
