// Upstream service clients, one per provider.

pub mod aggregator;
pub mod anidb;
pub mod anilist;
pub mod anizip;
pub mod filler;
pub mod seadex;
pub mod tvdb;
