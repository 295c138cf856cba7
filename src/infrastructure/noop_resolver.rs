// Dependency resolver for man pages.
// Man pages have no imports, so resolution always succeeds with no edges.

use anyhow::Result;
use tracing::debug;

use crate::domain::unit::{Resolution, SourceUnit};
use crate::ports::DepResolver;

pub struct NoopDepResolver;

impl DepResolver for NoopDepResolver {
    fn resolve(&self, unit: &SourceUnit) -> Result<Vec<Resolution>> {
        debug!(
            unit = %unit.key.name,
            ignored = unit.info.dependencies.len(),
            "no dependency resolution for man pages"
        );
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::unit::Key;

    #[test]
    fn test_declared_dependencies_are_ignored() {
        let mut unit = SourceUnit::new(Key::new("ManPages", "man"), vec![]);
        unit.info.dependencies = vec![Key::new("ManPages", "sh"), Key::new("GoPackage", "fmt")];
        assert!(NoopDepResolver.resolve(&unit).unwrap().is_empty());
    }
}
