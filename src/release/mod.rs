// ABOUTME: Release artifacts and installation markers.
// ABOUTME: Inspects and unpacks tar archives; records which release an install came from.

mod artifact;
mod error;
mod marker;

pub use artifact::{ArtifactLayout, Compression, ReleaseArtifact};
pub use error::ArtifactError;
pub use marker::{MARKER_PATH, MarkerState, ReleaseMarker};
