use std::fs;

use suspense_fonts::config::Config;
use suspense_fonts::loader::{FontLoader, font_cache};
use suspense_fonts::render::Screen;
use tokio::runtime::Handle;

use crate::utils::*;

#[tokio::test]
async fn test_assets_dir_from_config_file() {
    setup();
    let dir = tempdir();
    let path = dir.path().join("config.yml");
    let yaml = format!("fonts:\n  assets_dir: {}\n", fixture("fonts").display());
    fs::write(&path, yaml).unwrap();

    let config = Config::get(Some(&path)).unwrap();
    let loader = FontLoader::new(&config.fonts).unwrap();
    let cache = font_cache(Handle::current());

    let screen = Screen::new([request("Inter=Inter-Italic.woff2")], 2);
    let rendered = screen.render(&loader, &cache).await.unwrap();
    assert_eq!(rendered.loaded(), 2);
}

#[test]
fn test_missing_config_file() {
    let dir = tempdir();
    let err = Config::get(Some(&dir.path().join("missing.yml"))).unwrap_err();
    assert_eq!(err.to_string(), "failed to open configuration file");
}
