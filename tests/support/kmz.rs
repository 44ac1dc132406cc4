//! Builders for KMZ fixtures.
//!
//! Archives are written at test time with `zip::ZipWriter` so every test owns
//! its inputs inside a `TempDir`.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;

/// Renders a single-placemark KML document.
pub fn placemark_kml(name: &str, description: &str, coordinates: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <name>fixture</name>
    <Placemark>
      <name>{name}</name>
      <description>{description}</description>
      <Point>
        <coordinates>{coordinates}</coordinates>
      </Point>
    </Placemark>
  </Document>
</kml>
"#
    )
}

/// Writes a ZIP archive at `path` holding `members` (name, content) in order.
pub fn write_archive(path: &Path, members: &[(&str, &str)]) -> PathBuf {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create fixture directory");
    }
    let file = File::create(path).expect("Failed to create fixture archive");
    let mut zip = zip::ZipWriter::new(file);
    for (name, content) in members {
        zip.start_file(*name, SimpleFileOptions::default())
            .expect("Failed to start archive member");
        zip.write_all(content.as_bytes())
            .expect("Failed to write archive member");
    }
    zip.finish().expect("Failed to finish archive");
    path.to_path_buf()
}

/// Writes a valid KMZ with one `doc.kml` placemark.
pub fn write_placemark(path: &Path, name: &str, description: &str, coordinates: &str) -> PathBuf {
    write_archive(
        path,
        &[("doc.kml", &placemark_kml(name, description, coordinates))],
    )
}

/// Writes a KMZ whose members contain no `.kml` document.
pub fn write_without_kml(path: &Path) -> PathBuf {
    write_archive(path, &[("images/icon.png", "PNG"), ("readme.txt", "no kml")])
}
