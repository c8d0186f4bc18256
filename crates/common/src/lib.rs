// boardpad-common: shared types and codecs for the boardpad workspace

pub mod download;
pub mod link;
pub mod share;
pub mod types;
