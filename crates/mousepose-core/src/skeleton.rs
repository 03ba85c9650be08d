//! Skeleton templates used to seed annotation projects.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LabelError;

const MOUSE19_JSON: &str = include_str!("../assets/mouse19_skeleton.json");

/// Named nodes connected by edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skeleton {
    pub name: String,
    pub nodes: Vec<String>,
    pub edges: Vec<(String, String)>,
}

impl Skeleton {
    /// The 19-node mouse skeleton shipped with the crate.
    pub fn bundled() -> Result<Self, LabelError> {
        let skeleton: Self = serde_json::from_str(MOUSE19_JSON).map_err(LabelError::Bundled)?;
        skeleton.validate()?;
        Ok(skeleton)
    }

    pub fn from_file(path: &Path) -> Result<Self, LabelError> {
        let text = fs::read_to_string(path).map_err(|source| LabelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let skeleton: Self = serde_json::from_str(&text).map_err(|source| LabelError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        skeleton.validate()?;
        Ok(skeleton)
    }

    /// Every edge must connect known nodes.
    pub fn validate(&self) -> Result<(), LabelError> {
        if self.nodes.is_empty() {
            return Err(LabelError::EmptySkeleton);
        }
        for (src, dst) in &self.edges {
            for node in [src, dst] {
                if !self.nodes.contains(node) {
                    return Err(LabelError::UnknownNode(node.clone()));
                }
            }
        }
        Ok(())
    }

    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_skeleton_has_19_nodes() {
        let skeleton = Skeleton::bundled().unwrap();
        assert_eq!(skeleton.name, "mouse19");
        assert_eq!(skeleton.nodes.len(), 19);
        assert_eq!(skeleton.node_index("nose"), Some(0));
        assert!(skeleton.node_index("left_ankle").is_some());
    }

    #[test]
    fn unknown_edge_node_is_rejected() {
        let skeleton = Skeleton {
            name: "broken".to_string(),
            nodes: vec!["a".to_string()],
            edges: vec![("a".to_string(), "b".to_string())],
        };
        assert!(matches!(skeleton.validate(), Err(LabelError::UnknownNode(n)) if n == "b"));
    }

    #[test]
    fn from_file_reads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skeleton.json");
        fs::write(&path, r#"{"name":"tiny","nodes":["a","b"],"edges":[["a","b"]]}"#).unwrap();
        let skeleton = Skeleton::from_file(&path).unwrap();
        assert_eq!(skeleton.edges, vec![("a".to_string(), "b".to_string())]);
    }
}
