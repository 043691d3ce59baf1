use std::time::Duration;

use suspense_fonts::config::Fonts;
use suspense_fonts::fonts::FontRequest;
use suspense_fonts::loader::FontLoader;

pub use suspense_test::{FontServer, fixture, setup, tempdir};

/// Creates a loader that serves assets from the font fixtures.
pub fn loader() -> FontLoader {
    FontLoader::new(&Fonts {
        assets_dir: Some(fixture("fonts")),
        download_timeout: Duration::from_secs(5),
        ..Default::default()
    })
    .unwrap()
}

/// Parses a request the way the command line does.
pub fn request(arg: &str) -> FontRequest {
    arg.parse().unwrap()
}
