use std::collections::HashSet;

use crate::types::ModuleId;

/// Resolves import specifiers to module identifiers.
///
/// Only relative (`./x`, `../x`) and root-relative (`/x`) specifiers are
/// considered; bare package names live outside the workspace graph. A
/// candidate resolves only if it is one of the known modules, i.e. a file the
/// walker found on disk.
pub struct ModuleResolver<'a> {
    known: &'a HashSet<String>,
    extensions: &'a [String],
}

impl<'a> ModuleResolver<'a> {
    pub fn new(known: &'a HashSet<String>, extensions: &'a [String]) -> Self {
        Self { known, extensions }
    }

    /// Resolve `specifier` as written in the module `from`.
    pub fn resolve(&self, from: &str, specifier: &str) -> Option<ModuleId> {
        let specifier = specifier.trim();
        let joined = if let Some(rest) = specifier.strip_prefix('/') {
            rest.to_string()
        } else if is_relative(specifier) {
            match from.rfind('/') {
                Some(idx) => format!("{}/{specifier}", &from[..idx]),
                None => specifier.to_string(),
            }
        } else {
            return None;
        };

        let base = normalize(&joined)?;
        self.candidates(&base)
            .into_iter()
            .find(|candidate| self.known.contains(candidate))
            .map(ModuleId)
    }

    /// Candidate paths in priority order: literal, `base.<ext>`, `base/index.<ext>`.
    fn candidates(&self, base: &str) -> Vec<String> {
        let mut out = Vec::with_capacity(1 + self.extensions.len() * 2);
        if !base.is_empty() {
            out.push(base.to_string());
            for ext in self.extensions {
                out.push(format!("{base}.{ext}"));
            }
        }
        for ext in self.extensions {
            if base.is_empty() {
                out.push(format!("index.{ext}"));
            } else {
                out.push(format!("{base}/index.{ext}"));
            }
        }
        out
    }
}

fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// Lexically normalize a forward-slash path. Returns `None` when the path
/// climbs above the workspace root.
fn normalize(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(files: &[&str]) -> HashSet<String> {
        files.iter().map(|s| s.to_string()).collect()
    }

    fn exts() -> Vec<String> {
        ["ts", "tsx", "js", "jsx"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_relative_sibling_with_extension_probe() {
        let k = known(&["src/a.ts", "src/b.ts"]);
        let e = exts();
        let r = ModuleResolver::new(&k, &e);
        assert_eq!(r.resolve("src/a.ts", "./b").unwrap().as_str(), "src/b.ts");
    }

    #[test]
    fn test_extension_priority() {
        let k = known(&["lib/x.js", "lib/x.tsx", "lib/x.ts"]);
        let e = exts();
        let r = ModuleResolver::new(&k, &e);
        assert_eq!(r.resolve("lib/y.ts", "./x").unwrap().as_str(), "lib/x.ts");
    }

    #[test]
    fn test_literal_specifier_wins() {
        let k = known(&["lib/x.js", "lib/x.js.ts"]);
        let e = exts();
        let r = ModuleResolver::new(&k, &e);
        assert_eq!(r.resolve("lib/y.ts", "./x.js").unwrap().as_str(), "lib/x.js");
    }

    #[test]
    fn test_parent_and_index_resolution() {
        let k = known(&["src/ui/page.tsx", "src/services/index.ts"]);
        let e = exts();
        let r = ModuleResolver::new(&k, &e);
        assert_eq!(
            r.resolve("src/ui/page.tsx", "../services").unwrap().as_str(),
            "src/services/index.ts"
        );
    }

    #[test]
    fn test_root_relative() {
        let k = known(&["src/utils/format.ts"]);
        let e = exts();
        let r = ModuleResolver::new(&k, &e);
        assert_eq!(
            r.resolve("deep/nested/file.ts", "/src/utils/format")
                .unwrap()
                .as_str(),
            "src/utils/format.ts"
        );
    }

    #[test]
    fn test_file_at_root() {
        let k = known(&["a.ts", "b.ts"]);
        let e = exts();
        let r = ModuleResolver::new(&k, &e);
        assert_eq!(r.resolve("a.ts", "./b").unwrap().as_str(), "b.ts");
    }

    #[test]
    fn test_missing_target_is_unresolved() {
        let k = known(&["src/a.ts"]);
        let e = exts();
        let r = ModuleResolver::new(&k, &e);
        assert!(r.resolve("src/a.ts", "./ghost").is_none());
    }

    #[test]
    fn test_package_specifiers_ignored() {
        let k = known(&["react.ts", "src/a.ts"]);
        let e = exts();
        let r = ModuleResolver::new(&k, &e);
        assert!(r.resolve("src/a.ts", "react").is_none());
        assert!(r.resolve("src/a.ts", "@scope/pkg").is_none());
    }

    #[test]
    fn test_escaping_root_is_unresolved() {
        let k = known(&["a.ts"]);
        let e = exts();
        let r = ModuleResolver::new(&k, &e);
        assert!(r.resolve("a.ts", "../../outside").is_none());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("src/./a/../b.ts").as_deref(), Some("src/b.ts"));
        assert_eq!(normalize("../x"), None);
    }
}
