//! Model reference data and the explicit registry that holds it.
//!
//! Each model file (TOML) carries the ordered variable and level lists,
//! named presets as hex mask pairs, and product templates. Files are loaded
//! once at startup and validated as a whole: a preset whose mask does not fit
//! its list, or a template with an unknown placeholder, fails the load.

use crate::bitmask::SelectionMask;
use crate::error::{QueryError, QueryResult};
use crate::query::ProductTemplate;
use crate::reference::ReferenceList;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

const BUILTIN_GFS: &str = include_str!("../../models/gfs.toml");

/// Preset as written in a model file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetMasks {
    pub variables: String,
    pub levels: String,
}

#[derive(Debug, Deserialize)]
struct ModelFile {
    name: String,
    #[serde(default)]
    description: Option<String>,
    variables: ReferenceList,
    levels: ReferenceList,
    #[serde(default)]
    presets: BTreeMap<String, PresetMasks>,
    #[serde(default)]
    products: BTreeMap<String, ProductTemplate>,
}

/// A named pair of selections, already decoded against the model's lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    pub name: String,
    pub variables: SelectionMask,
    pub levels: SelectionMask,
}

#[derive(Debug, Clone)]
pub struct ModelData {
    name: String,
    description: Option<String>,
    variables: Arc<ReferenceList>,
    levels: Arc<ReferenceList>,
    presets: BTreeMap<String, Preset>,
    products: BTreeMap<String, Arc<ProductTemplate>>,
}

impl ModelData {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ModelFile = toml::from_str(text).context("invalid model file")?;
        let name = file.name.clone();
        Self::from_file(file).with_context(|| format!("model {name:?}"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read model file {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("load {}", path.display()))
    }

    fn from_file(file: ModelFile) -> QueryResult<Self> {
        let variables = Arc::new(file.variables);
        let levels = Arc::new(file.levels);

        let mut presets = BTreeMap::new();
        for (name, masks) in file.presets {
            let preset = Preset {
                variables: SelectionMask::from_hex(Arc::clone(&variables), &masks.variables)?,
                levels: SelectionMask::from_hex(Arc::clone(&levels), &masks.levels)?,
                name: name.clone(),
            };
            presets.insert(name, preset);
        }

        let mut products = BTreeMap::new();
        for (name, product) in file.products {
            product.check()?;
            products.insert(name, Arc::new(product));
        }

        Ok(ModelData {
            name: file.name,
            description: file.description,
            variables,
            levels,
            presets,
            products,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn variables(&self) -> &Arc<ReferenceList> {
        &self.variables
    }

    pub fn levels(&self) -> &Arc<ReferenceList> {
        &self.levels
    }

    pub fn presets(&self) -> impl Iterator<Item = &Preset> {
        self.presets.values()
    }

    pub fn preset(&self, name: &str) -> QueryResult<&Preset> {
        self.presets.get(name).ok_or_else(|| QueryError::UnknownPreset {
            model: self.name.clone(),
            preset: name.to_string(),
        })
    }

    pub fn product_names(&self) -> impl Iterator<Item = &str> {
        self.products.keys().map(String::as_str)
    }

    pub fn product(&self, name: &str) -> QueryResult<&Arc<ProductTemplate>> {
        self.products
            .get(name)
            .ok_or_else(|| QueryError::UnknownProduct {
                model: self.name.clone(),
                product: name.to_string(),
            })
    }
}

/// Model name -> reference data, populated once at startup.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, Arc<ModelData>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in GFS definition.
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();
        registry.register(ModelData::from_toml_str(BUILTIN_GFS)?);
        Ok(registry)
    }

    /// Built-in models plus every file in `paths`; a file may replace a
    /// built-in model of the same name.
    pub fn with_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut registry = Self::builtin()?;
        for path in paths {
            let model = ModelData::load(path.as_ref())?;
            tracing::debug!(model = model.name(), path = %path.as_ref().display(), "registered model file");
            registry.register(model);
        }
        Ok(registry)
    }

    pub fn register(&mut self, model: ModelData) {
        self.models.insert(model.name.clone(), Arc::new(model));
    }

    pub fn get(&self, name: &str) -> QueryResult<&Arc<ModelData>> {
        self.models
            .get(name)
            .ok_or_else(|| QueryError::UnknownModel(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"
        name = "toy"
        variables = ["TMP", "UGRD", "VGRD"]
        levels = ["surface", "10_m_above_ground"]

        [presets.wind]
        variables = "0x6"
        levels = "0x2"

        [products.main]
        base_url = "https://example.com/filter.pl"
        query = [["file", "toy.t{cycle}z.f{forecast_hour}"]]
    "#;

    #[test]
    fn builtin_gfs_loads_and_presets_decode() {
        let registry = ModelRegistry::builtin().unwrap();
        let gfs = registry.get("gfs").unwrap();
        assert!(gfs.product("gfs_0p25").is_ok());

        let basic = gfs.preset("sailing_basic").unwrap();
        assert_eq!(
            basic.variables.selected().collect::<Vec<_>>(),
            vec!["GUST", "PRMSL", "UGRD", "VGRD"]
        );
        assert_eq!(
            basic.levels.selected().collect::<Vec<_>>(),
            vec!["surface", "mean_sea_level", "10_m_above_ground"]
        );

        let upper = gfs.preset("upper_air").unwrap();
        assert_eq!(
            upper.levels.selected().collect::<Vec<_>>(),
            vec!["850_mb", "700_mb", "500_mb", "300_mb", "250_mb"]
        );
    }

    #[test]
    fn small_model_from_toml() {
        let model = ModelData::from_toml_str(SMALL).unwrap();
        assert_eq!(model.name(), "toy");
        let wind = model.preset("wind").unwrap();
        assert_eq!(wind.variables.selected().collect::<Vec<_>>(), vec!["UGRD", "VGRD"]);
        assert_eq!(model.product_names().collect::<Vec<_>>(), vec!["main"]);
    }

    #[test]
    fn unknown_names() {
        let registry = ModelRegistry::builtin().unwrap();
        assert_eq!(
            registry.get("ecmwf").unwrap_err(),
            QueryError::UnknownModel("ecmwf".to_string())
        );
        let gfs = registry.get("gfs").unwrap();
        assert!(matches!(
            gfs.preset("nope"),
            Err(QueryError::UnknownPreset { .. })
        ));
        assert!(matches!(
            gfs.product("gfs_0p50"),
            Err(QueryError::UnknownProduct { .. })
        ));
    }

    #[test]
    fn preset_out_of_range_fails_load() {
        let bad = SMALL.replace(r#"variables = "0x6""#, r#"variables = "0x8""#);
        let err = ModelData::from_toml_str(&bad).unwrap_err();
        assert!(format!("{err:#}").contains("mask out of range"));
    }

    #[test]
    fn bad_template_fails_load() {
        let bad = SMALL.replace("{forecast_hour}", "{step}");
        assert!(ModelData::from_toml_str(&bad).is_err());
    }

    #[test]
    fn model_file_overrides_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gfs.toml");
        fs::write(&path, SMALL.replace(r#"name = "toy""#, r#"name = "gfs""#)).unwrap();
        let registry = ModelRegistry::with_files(&[&path]).unwrap();
        let gfs = registry.get("gfs").unwrap();
        assert_eq!(gfs.variables().len(), 3);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["gfs"]);
    }
}
