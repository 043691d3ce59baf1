//! Font loading on top of the suspending resource cache.
//!
//! Every component of a screen that renders text asks for its font through the shared
//! [`FontCache`](loader::FontCache). A font family is loaded once per distinct
//! [`FontRequest`](fonts::FontRequest), no matter how many components ask for it, and the
//! [`Screen`](render::Screen) render loop re-renders until every component has its font or a
//! memoized failure.

pub mod config;
pub mod fonts;
pub mod loader;
pub mod logging;
pub mod render;
