//! Note blob codec and row conversions for the chart cache.
//!
//! Notes are serialized with `bincode` then compressed with Zstd, so a cached
//! chart decodes to exactly the sequence that was saved.

use crate::database::models::ChartRow;
use crate::error::StoreError;
use crate::models::chart::{ChartData, ChartNote};
use zstd::stream::{decode_all, encode_all};

/// Charts are rewritten rarely; favour ratio over speed.
const COMPRESSION_LEVEL: i32 = 19;

pub fn encode_notes(notes: &[ChartNote]) -> Result<Vec<u8>, StoreError> {
    let binary = bincode::serde::encode_to_vec(notes, bincode::config::standard())
        .map_err(|e| StoreError::Encode(e.to_string()))?;
    Ok(encode_all(&binary[..], COMPRESSION_LEVEL)?)
}

pub fn decode_notes(blob: &[u8]) -> Result<Vec<ChartNote>, StoreError> {
    let binary = decode_all(blob).map_err(|e| StoreError::Decode(e.to_string()))?;
    let (notes, _len): (Vec<ChartNote>, usize) =
        bincode::serde::decode_from_slice(&binary, bincode::config::standard())
            .map_err(|e| StoreError::Decode(e.to_string()))?;
    Ok(notes)
}

pub fn chart_to_row(chart: &ChartData) -> Result<ChartRow, StoreError> {
    Ok(ChartRow {
        track_id: chart.track_id.clone(),
        track_name: chart.track_name.clone(),
        artist_name: chart.artist_name.clone(),
        bpm: chart.bpm,
        duration_ms: chart.duration_ms,
        note_count: chart.notes.len() as i64,
        notes: encode_notes(&chart.notes)?,
        high_score: chart.high_score as i64,
        best_multiplier: chart.best_multiplier as i64,
    })
}

/// Rebuilds a chart, rejecting rows whose notes fail to decode or break the chart invariants.
pub fn row_to_chart(row: ChartRow) -> Result<ChartData, StoreError> {
    let notes = decode_notes(&row.notes)?;
    if notes.len() as i64 != row.note_count {
        return Err(StoreError::Decode(format!(
            "expected {} notes, found {}",
            row.note_count,
            notes.len()
        )));
    }

    let chart = ChartData {
        track_id: row.track_id,
        track_name: row.track_name,
        artist_name: row.artist_name,
        bpm: row.bpm,
        duration_ms: row.duration_ms,
        notes,
        high_score: u32::try_from(row.high_score).unwrap_or(0),
        best_multiplier: u32::try_from(row.best_multiplier).unwrap_or(1),
    };

    if !chart.is_well_formed() {
        return Err(StoreError::Decode(format!(
            "chart {} breaks ordering or lane invariants",
            chart.track_id
        )));
    }
    Ok(chart)
}
