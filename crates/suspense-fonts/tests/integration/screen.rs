use suspense_fonts::fonts::FontFormat;
use suspense_fonts::loader::{FontError, font_cache};
use suspense_fonts::render::Screen;
use tokio::runtime::Handle;

use crate::utils::*;

#[tokio::test]
async fn test_one_download_per_font() {
    setup();
    let server = FontServer::new();
    let loader = loader();
    let cache = font_cache(Handle::current());

    let requests = [
        "Inter=Inter-Regular.ttf".to_owned(),
        format!("Inter/swap={}", server.url("fonts/Inter-Bold.otf")),
        format!("Inter={}", server.url("fonts/Inter-Italic.woff2")),
    ];
    let screen = Screen::new(requests.iter().map(|r| request(r)), 4);

    let rendered = screen.render(&loader, &cache).await.unwrap();

    assert_eq!(rendered.slots.len(), 12);
    assert_eq!(rendered.loaded(), 12);
    assert_eq!(cache.len(), 3);
    assert_eq!(
        server.all_hits(),
        [
            ("/fonts/Inter-Bold.otf".to_owned(), 1),
            ("/fonts/Inter-Italic.woff2".to_owned(), 1),
        ]
    );

    let formats: Vec<_> = rendered
        .slots
        .iter()
        .step_by(4)
        .map(|slot| slot.outcome.as_ref().unwrap().format)
        .collect();
    assert_eq!(
        formats,
        [FontFormat::TrueType, FontFormat::OpenType, FontFormat::Woff2]
    );
}

#[tokio::test]
async fn test_display_is_part_of_the_key() {
    setup();
    let server = FontServer::new();
    let loader = loader();
    let cache = font_cache(Handle::current());

    let url = server.url("fonts/Inter-Bold.otf");
    let screen = Screen::new(
        [
            request(&format!("Inter/swap={url}")),
            request(&format!("Inter/block={url}")),
        ],
        2,
    );

    let rendered = screen.render(&loader, &cache).await.unwrap();
    assert_eq!(rendered.loaded(), 4);
    assert_eq!(cache.len(), 2);
    assert_eq!(server.accesses(), 2);
}

#[tokio::test]
async fn test_failures_are_not_retried() {
    setup();
    let server = FontServer::new();
    let loader = loader();
    let cache = font_cache(Handle::current());

    let screen = Screen::new(
        [
            request(&format!("Inter={}", server.url("fonts/Inter-Black.ttf"))),
            request(&format!(
                "Inter={}",
                server.url("respond_statuscode/500/Inter.ttf")
            )),
        ],
        3,
    );

    let rendered = screen.render(&loader, &cache).await.unwrap();
    assert_eq!(rendered.failed(), 6);
    assert_eq!(server.accesses(), 2);

    let errors: Vec<_> = rendered
        .slots
        .iter()
        .step_by(3)
        .map(|slot| slot.outcome.as_ref().unwrap_err().load_failure().cloned())
        .collect();
    assert_eq!(
        errors,
        [
            Some(FontError::NotFound),
            Some(FontError::Download("500 Internal Server Error".into())),
        ]
    );

    // rendering again answers from the cache
    let again = screen.render(&loader, &cache).await.unwrap();
    assert_eq!(again.passes, 1);
    assert_eq!(again.failed(), 6);
    assert_eq!(server.accesses(), 0);
}

#[tokio::test]
async fn test_slow_font_does_not_block_others() {
    setup();
    let server = FontServer::new();
    let loader = loader();
    let cache = font_cache(Handle::current());

    let screen = Screen::new(
        [
            request(&format!(
                "Inter={}",
                server.url("delay/200ms/Inter-Bold.otf")
            )),
            request("Inter=Inter-Regular.ttf"),
        ],
        1,
    );

    let rendered = screen.render(&loader, &cache).await.unwrap();
    assert_eq!(rendered.loaded(), 2);
    assert!(rendered.passes >= 2);
}
