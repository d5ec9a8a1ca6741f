//! Zone editing, overlay painting and analysis statistics shared by the crowd analytics
//! client crates. Nothing in here touches the network or a UI toolkit.

pub mod editor;
pub mod geometry;
pub mod image_surface;
pub mod notice;
pub mod overlay;
pub mod summary;
pub mod zone;
