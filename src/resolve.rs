//! Dataset name to physical table name resolution.
//!
//! A logical dataset `X` may be stored as `X`, `df_X` or `X_dta`. Candidates
//! are tried in that order and the first one present wins; when none is
//! present the literal name is used and execution is left to fail on its own.

use crate::core::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct NameResolver {
    prefixes: Vec<String>,
    suffixes: Vec<String>,
}

impl Default for NameResolver {
    fn default() -> Self {
        NameResolver {
            prefixes: vec!["df_".to_string()],
            suffixes: vec!["_dta".to_string()],
        }
    }
}

impl NameResolver {
    pub fn new(prefixes: Vec<String>, suffixes: Vec<String>) -> Self {
        NameResolver { prefixes, suffixes }
    }

    /// Candidate physical names, in lookup order.
    pub fn candidates(&self, dataset: &str) -> Vec<String> {
        let mut names = Vec::with_capacity(1 + self.prefixes.len() + self.suffixes.len());
        names.push(dataset.to_string());
        for prefix in &self.prefixes {
            names.push(format!("{}{}", prefix, dataset));
        }
        for suffix in &self.suffixes {
            names.push(format!("{}{}", dataset, suffix));
        }
        names
    }

    /// Returns the first candidate accepted by `exists`, if any.
    pub fn find<F>(&self, dataset: &str, mut exists: F) -> Result<Option<String>>
    where
        F: FnMut(&str) -> Result<bool>,
    {
        for candidate in self.candidates(dataset) {
            if exists(&candidate)? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// Like [`NameResolver::find`], falling back to the literal name.
    pub fn resolve<F>(&self, dataset: &str, exists: F) -> Result<String>
    where
        F: FnMut(&str) -> Result<bool>,
    {
        Ok(self.find(dataset, exists)?.unwrap_or_else(|| dataset.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DalError;

    #[test]
    fn test_candidate_order() {
        let resolver = NameResolver::default();
        assert_eq!(resolver.candidates("sales"), vec!["sales", "df_sales", "sales_dta"]);
    }

    #[test]
    fn test_first_existing_candidate_wins() {
        let resolver = NameResolver::default();
        let tables = ["df_sales", "sales_dta"];
        let name = resolver.resolve("sales", |c| Ok(tables.contains(&c))).unwrap();
        assert_eq!(name, "df_sales");
    }

    #[test]
    fn test_literal_fallback() {
        let resolver = NameResolver::default();
        assert_eq!(resolver.find("missing", |_| Ok(false)).unwrap(), None);
        assert_eq!(resolver.resolve("missing", |_| Ok(false)).unwrap(), "missing");
    }

    #[test]
    fn test_catalog_errors_propagate() {
        let resolver = NameResolver::new(vec![], vec!["_v2".into()]);
        assert_eq!(resolver.candidates("x"), vec!["x", "x_v2"]);
        let result = resolver.resolve("x", |_| Err(DalError::Query("catalog unavailable".into())));
        assert!(result.is_err());
    }
}
