//! A cooperative render loop over components that need fonts.
//!
//! A [`Screen`] is rendered in passes. Every pass reads the font of each mounted [`FontSlot`] from
//! the [`FontCache`]. When any read suspends, the loop waits until one of the outstanding loads
//! settles and renders the whole screen again, until a pass completes without suspending.

use std::sync::Arc;

use futures::future;
use suspense_cache::{CacheError, InvalidKeyDerivation, Read, Suspension};

use crate::fonts::{FontRequest, LoadedFont};
use crate::loader::{FontCache, FontError, FontLoader};

/// A mounted component that renders text with one font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontSlot {
    pub id: usize,
    pub request: FontRequest,
}

/// The font a slot ended up rendering with.
#[derive(Debug, Clone)]
pub struct SlotReport {
    pub slot: FontSlot,
    pub outcome: Result<Arc<LoadedFont>, CacheError<FontError>>,
}

/// The result of a single render pass.
#[derive(Debug)]
pub enum Pass {
    /// Every slot was rendered.
    Complete(Vec<SlotReport>),
    /// At least one slot is waiting for its font.
    Suspended(Vec<Suspension<Arc<LoadedFont>, FontError>>),
}

/// The result of rendering a screen until it no longer suspends.
#[derive(Debug)]
pub struct Rendered {
    /// The number of render passes, including the final complete one.
    pub passes: usize,
    pub slots: Vec<SlotReport>,
}

impl Rendered {
    pub fn loaded(&self) -> usize {
        self.slots.iter().filter(|s| s.outcome.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.slots.len() - self.loaded()
    }
}

/// A screen of font slots.
#[derive(Debug, Clone, Default)]
pub struct Screen {
    slots: Vec<FontSlot>,
}

impl Screen {
    /// Mounts each request `repeat` times, as if that many components used the same font.
    pub fn new(requests: impl IntoIterator<Item = FontRequest>, repeat: usize) -> Self {
        let mut slots = vec![];
        for request in requests {
            for _ in 0..repeat {
                slots.push(FontSlot {
                    id: slots.len(),
                    request: request.clone(),
                });
            }
        }
        Self { slots }
    }

    pub fn slots(&self) -> &[FontSlot] {
        &self.slots
    }

    /// Renders every slot once.
    ///
    /// All slots are read even after the first suspension, so that every missing font starts
    /// loading in the same pass.
    pub fn render_pass(
        &self,
        loader: &FontLoader,
        cache: &FontCache,
    ) -> Result<Pass, InvalidKeyDerivation> {
        let mut reports = Vec::with_capacity(self.slots.len());
        let mut suspensions = vec![];

        for slot in &self.slots {
            let outcome = match loader.read(cache, &slot.request)? {
                Read::Ready(font) => Ok(font),
                Read::Failed(err) => Err(err),
                Read::Pending(suspension) => {
                    suspensions.push(suspension);
                    continue;
                }
            };
            reports.push(SlotReport {
                slot: slot.clone(),
                outcome,
            });
        }

        if suspensions.is_empty() {
            Ok(Pass::Complete(reports))
        } else {
            Ok(Pass::Suspended(suspensions))
        }
    }

    /// Renders passes until one completes without suspending.
    pub async fn render(
        &self,
        loader: &FontLoader,
        cache: &FontCache,
    ) -> Result<Rendered, InvalidKeyDerivation> {
        let mut passes = 0;
        loop {
            passes += 1;
            match self.render_pass(loader, cache)? {
                Pass::Complete(slots) => {
                    tracing::debug!(passes, slots = slots.len(), "Render complete");
                    return Ok(Rendered { passes, slots });
                }
                Pass::Suspended(suspensions) => {
                    tracing::trace!(
                        pass = passes,
                        suspended = suspensions.len(),
                        "Render suspended",
                    );
                    // the outcome is picked up by the next pass
                    let _ = future::select_all(suspensions).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use suspense_test::{fixture, setup};
    use tokio::runtime::Handle;

    use super::*;
    use crate::config::Fonts;
    use crate::fonts::FontSource;
    use crate::loader::font_cache;

    fn loader() -> FontLoader {
        FontLoader::new(&Fonts {
            assets_dir: Some(fixture("fonts")),
            ..Default::default()
        })
        .unwrap()
    }

    fn asset(family: &str, path: &str) -> FontRequest {
        FontRequest::new(family, FontSource::Asset(path.into()))
    }

    #[test]
    fn test_mount_repeated() {
        let screen = Screen::new(
            [asset("Inter", "Inter-Regular.ttf"), asset("Inter", "Inter-Bold.otf")],
            2,
        );

        let ids: Vec<_> = screen.slots().iter().map(|slot| slot.id).collect();
        assert_eq!(ids, [0, 1, 2, 3]);
        assert_eq!(screen.slots()[1].request, screen.slots()[0].request);
        assert_ne!(screen.slots()[2].request, screen.slots()[1].request);
    }

    #[tokio::test]
    async fn test_first_pass_suspends() {
        setup();
        let loader = loader();
        let cache = font_cache(Handle::current());
        let screen = Screen::new([asset("Inter", "Inter-Regular.ttf")], 3);

        let Pass::Suspended(suspensions) = screen.render_pass(&loader, &cache).unwrap() else {
            panic!("expected the first pass to suspend");
        };
        assert_eq!(suspensions.len(), 3);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_render_until_settled() {
        setup();
        let loader = loader();
        let cache = font_cache(Handle::current());
        let screen = Screen::new(
            [
                asset("Inter", "Inter-Regular.ttf"),
                asset("Inter", "Inter-Black.ttf"),
            ],
            3,
        );

        let rendered = screen.render(&loader, &cache).await.unwrap();

        assert_eq!(rendered.slots.len(), 6);
        assert_eq!(rendered.loaded(), 3);
        assert_eq!(rendered.failed(), 3);
        assert!(rendered.passes >= 2 && rendered.passes <= 3);
        assert_eq!(cache.len(), 2);

        // everything is memoized now
        let again = screen.render(&loader, &cache).await.unwrap();
        assert_eq!(again.passes, 1);
        assert_eq!(again.loaded(), 3);
    }
}
