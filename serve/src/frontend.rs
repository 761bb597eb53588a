//! Embedded single-file HTML client served at `GET /`.

pub(crate) const INDEX_HTML: &str = include_str!("../assets/index.html");
