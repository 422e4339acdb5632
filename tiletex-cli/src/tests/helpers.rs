//! Test helpers for composing render requests and fixture documents.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

/// Overpass response with one primary road across the sample area.
pub(super) const ROAD_DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="Overpass API">
  <node id="1" lat="48.005" lon="11.001"/>
  <node id="2" lat="48.005" lon="11.005"/>
  <node id="3" lat="48.005" lon="11.009"/>
  <way id="10">
    <nd ref="1"/>
    <nd ref="2"/>
    <nd ref="3"/>
    <tag k="highway" v="primary"/>
  </way>
</osm>
"#;

/// Request drawing primary roads in the palette's `road` colour.
pub(super) const ROAD_REQUEST: &str = r##"{
  "area": { "min_lat": 48.0, "min_lon": 11.0, "max_lat": 48.01, "max_lon": 11.01 },
  "background": "grass",
  "palette": { "grass": "#7fa35b", "road": "#ff0000" },
  "entities": [
    { "kind": "polyline", "key": "highway", "match": { "exact": "primary" },
      "color": "road", "size": 3.0 }
  ]
}"##;

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent directory");
    }
    fs::write(path, contents).expect("write fixture");
}

/// Temporary directory exposed as a UTF-8 path.
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn path(&self, relative: &str) -> Utf8PathBuf {
        self.root.join(relative)
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace").field("root", &self.root).finish()
    }
}
