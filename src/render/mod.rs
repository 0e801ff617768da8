//! Text rendering for the console and the saved query file.

pub mod text;
