use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub brand_analyzer: Configuration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub competitor_brands: Vec<String>,
    pub primary_brand: String,
    pub peer_group: Vec<String>,
    pub thresholds: Thresholds,
    pub extraction: ExtractionMarkers,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub high_margin: f64,
    pub low_margin: f64,
    pub high_volume_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionMarkers {
    pub summary_marker: String,
    pub entity_header: String,
    pub header_labels: Vec<String>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            competitor_brands: [
                "FREEBIRD",
                "FABIENNE CHAPOT",
                "HARPER & YVE",
                "JOSH V",
                "POM AMSTERDAM",
                "AAIKO",
            ]
            .iter()
            .map(|name| name.to_string())
            .collect(),
            primary_brand: "FREEBIRD".to_string(),
            peer_group: ["JOSH V", "FABIENNE CHAPOT", "HARPER & YVE"]
                .iter()
                .map(|name| name.to_string())
                .collect(),
            thresholds: Thresholds::default(),
            extraction: ExtractionMarkers::default(),
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            high_margin: 56.0,
            low_margin: 48.0,
            high_volume_share: 1.0,
        }
    }
}

impl Default for ExtractionMarkers {
    fn default() -> Self {
        Self {
            summary_marker: "Totaal seizoen".to_string(),
            entity_header: "Merk".to_string(),
            header_labels: vec!["Merk".to_string(), "Omzet".to_string()],
        }
    }
}

impl Configuration {
    pub fn tracked_brands(&self) -> Vec<String> {
        let mut brands = self.competitor_brands.clone();
        if !contains_brand(&brands, &self.primary_brand) {
            brands.insert(0, self.primary_brand.clone());
        }
        for peer in &self.peer_group {
            if !contains_brand(&brands, peer) {
                brands.push(peer.clone());
            }
        }
        brands
    }
}

fn contains_brand(brands: &[String], brand: &str) -> bool {
    brands.iter().any(|name| name.eq_ignore_ascii_case(brand))
}

pub fn load_configuration(path: &Path) -> Configuration {
    if !path.exists() {
        info!(path = %path.display(), "settings file missing, using defaults");
        return Configuration::default();
    }

    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(error) => {
            warn!(path = %path.display(), error = %error, "failed to read settings, using defaults");
            return Configuration::default();
        }
    };

    match serde_json::from_slice::<SettingsFile>(&raw) {
        Ok(settings) => {
            info!(
                path = %path.display(),
                primary = %settings.brand_analyzer.primary_brand,
                competitors = settings.brand_analyzer.competitor_brands.len(),
                "loaded settings"
            );
            settings.brand_analyzer
        }
        Err(error) => {
            warn!(path = %path.display(), error = %error, "malformed settings, using defaults");
            Configuration::default()
        }
    }
}
