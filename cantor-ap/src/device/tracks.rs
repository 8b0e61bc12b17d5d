//! Track catalog and remembered playback offsets

use std::collections::HashMap;
use std::sync::Arc;

use cantor_common::TrackId;

use crate::config::TrackConfig;
use crate::error::{Error, Result};

/// Immutable set of configured tracks, cheap to clone
#[derive(Debug, Clone)]
pub struct TrackCatalog {
    tracks: Arc<Vec<TrackConfig>>,
}

impl TrackCatalog {
    pub fn new(tracks: Vec<TrackConfig>) -> Self {
        Self {
            tracks: Arc::new(tracks),
        }
    }

    pub fn get(&self, id: &TrackId) -> Result<&TrackConfig> {
        self.tracks
            .iter()
            .find(|t| &t.id == id)
            .ok_or_else(|| Error::UnknownTrack(id.clone()))
    }

    pub fn default_volume(&self, id: &TrackId) -> Result<u8> {
        Ok(self.get(id)?.default_volume)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackConfig> {
        self.tracks.iter()
    }
}

/// Last known playback offset (seconds) per track
///
/// Seeded from the catalog's initial offsets; lives for the process lifetime.
#[derive(Debug, Clone, Default)]
pub struct TrackPositionTable {
    offsets: HashMap<TrackId, f64>,
}

impl TrackPositionTable {
    pub fn from_catalog(catalog: &TrackCatalog) -> Self {
        Self {
            offsets: catalog
                .iter()
                .map(|t| (t.id.clone(), t.initial_offset))
                .collect(),
        }
    }

    pub fn offset(&self, id: &TrackId) -> f64 {
        self.offsets.get(id).copied().unwrap_or(0.0)
    }

    pub fn record(&mut self, id: &TrackId, seconds: f64) {
        self.offsets.insert(id.clone(), seconds);
    }
}
