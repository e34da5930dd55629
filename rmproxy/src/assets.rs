//! Static assets for the built-in remote-control page, embedded at compile
//! time so the binary ships self-contained.

pub const INDEX_HTML: &str = include_str!("../assets/index.html");
pub const ICON_PNG: &[u8] = include_bytes!("../assets/icon.png");
