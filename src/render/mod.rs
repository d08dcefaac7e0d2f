//! Presentation of dashboard views: `text` for the terminal, `html` for a
//! standalone report file.

pub mod html;
pub mod text;
