use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::geometry::FeatureCollection;

/// Reads GeoJSON feature collections relative to a base directory.
pub struct LayerLoader {
    base_dir: PathBuf,
}

impl LayerLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<FeatureCollection> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read layer file {}", path.display()))?;
        Self::parse(&data).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<FeatureCollection> {
        let layer: FeatureCollection =
            serde_json::from_str(text).context("layer is not a GeoJSON FeatureCollection")?;
        Ok(layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_feature_collection_and_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("one.geojson"),
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{"n":2},
                 "geometry":{"type":"Polygon","coordinates":[[[0,0],[2,0],[2,2],[0,2],[0,0]]]}}]}"#,
        )
        .unwrap();
        let layer = LayerLoader::new(dir.path()).load("one.geojson").unwrap();
        assert_eq!(layer.features.len(), 1);

        let err = LayerLoader::new(dir.path()).load("missing.geojson").unwrap_err();
        assert!(format!("{err:#}").contains("missing.geojson"));
        assert!(LayerLoader::parse("[1, 2]").is_err());
    }
}
