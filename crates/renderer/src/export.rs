use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use discconfig::{ConfigStore, DiscConfig, ImportReport};
use image::{ImageFormat, RgbaImage};

pub const IMAGE_FILE_PREFIX: &str = "disc-image";
pub const CONFIG_FILE_PREFIX: &str = "disc-configuration";

/// Destination for captured images.
pub trait ImageSink {
    /// Persists the image and returns where it went.
    fn write_image(&mut self, image: &RgbaImage) -> Result<PathBuf>;
}

pub fn image_file_name(date: NaiveDate) -> String {
    format!("{IMAGE_FILE_PREFIX}-{}.png", date.format("%Y-%m-%d"))
}

pub fn config_file_name(date: NaiveDate) -> String {
    format!("{CONFIG_FILE_PREFIX}-{}.json", date.format("%Y-%m-%d"))
}

/// Writes exports into one directory, named after the local date.
///
/// A second export on the same day replaces the first.
#[derive(Debug, Clone)]
pub struct DirectoryExporter {
    directory: PathBuf,
    date: Option<NaiveDate>,
}

impl DirectoryExporter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            date: None,
        }
    }

    /// Pins the date used in file names instead of reading the clock.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn date(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| Local::now().date_naive())
    }

    fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.directory).with_context(|| {
            format!(
                "failed to create export directory {}",
                self.directory.display()
            )
        })
    }

    /// Writes the configuration in the JSON exchange format.
    pub fn write_config(&self, config: &DiscConfig) -> Result<PathBuf> {
        self.prepare()?;
        let path = self.directory.join(config_file_name(self.date()));
        let json = discconfig::document::export_json(config)
            .context("failed to serialise disc configuration")?;
        fs::write(&path, json)
            .with_context(|| format!("failed to write configuration to {}", path.display()))?;
        tracing::info!(path = %path.display(), "exported disc configuration");
        Ok(path)
    }
}

/// Reads a JSON configuration file and applies it through the store setters.
pub fn import_config_file(store: &mut ConfigStore, path: &Path) -> Result<ImportReport> {
    let input = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration {}", path.display()))?;
    store
        .import_json(&input)
        .with_context(|| format!("failed to import configuration {}", path.display()))
}

impl ImageSink for DirectoryExporter {
    fn write_image(&mut self, image: &RgbaImage) -> Result<PathBuf> {
        self.prepare()?;
        let path = self.directory.join(image_file_name(self.date()));
        image
            .save_with_format(&path, ImageFormat::Png)
            .with_context(|| format!("failed to write PNG to {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[test]
    fn file_names_carry_iso_dates() {
        assert_eq!(image_file_name(date()), "disc-image-2024-03-09.png");
        assert_eq!(config_file_name(date()), "disc-configuration-2024-03-09.json");
    }

    #[test]
    fn writes_png_into_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = DirectoryExporter::new(dir.path().join("out")).with_date(date());
        let image = RgbaImage::from_pixel(3, 2, image::Rgba([1, 2, 3, 255]));

        let path = exporter.write_image(&image).unwrap();
        assert_eq!(path, dir.path().join("out/disc-image-2024-03-09.png"));
        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded, image);
    }

    #[test]
    fn config_export_round_trips_through_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = DirectoryExporter::new(dir.path()).with_date(date());
        let config = DiscConfig {
            spacing: 1.4,
            eccentricity: 0.55,
            focal_offset: [0.1, -0.65],
            ..DiscConfig::default()
        };

        let path = exporter.write_config(&config).unwrap();
        let json = fs::read_to_string(path).unwrap();
        let mut store = ConfigStore::new();
        store.import_json(&json).unwrap();
        assert_eq!(store.snapshot(), config);
    }

    #[test]
    fn import_file_reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::new();

        let missing = import_config_file(&mut store, &dir.path().join("absent.json"));
        assert!(missing.is_err());

        let malformed = dir.path().join("broken.json");
        fs::write(&malformed, r#"{"discs": 3}"#).unwrap();
        let err = import_config_file(&mut store, &malformed).unwrap_err();
        assert!(format!("{err:#}").contains("invalid configuration format"));
        assert_eq!(store.revision(), 0);

        let valid = dir.path().join("valid.json");
        fs::write(&valid, r#"{"discs": {"distance": 1.2}}"#).unwrap();
        let report = import_config_file(&mut store, &valid).unwrap();
        assert_eq!(report.applied, vec!["distance"]);
        assert_eq!(store.spacing(), 1.2);
    }
}
