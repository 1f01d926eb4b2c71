//! Background chart generation with a cache-first lookup.

use crate::database::ChartStore;
use crate::error::ChartError;
use crate::logic::generator::{CancelToken, ChartGenerator, TrackRequest};
use crate::models::chart::ChartData;
use crossbeam_channel::{Receiver, TryRecvError, bounded};
use std::sync::Arc;
use std::thread;

/// A generation running on its own thread.
///
/// The store is consulted first; a freshly generated chart is saved only when
/// generation succeeded and the job was not cancelled.
pub struct ChartJob {
    track_id: String,
    cancel: CancelToken,
    result_rx: Receiver<Result<ChartData, ChartError>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ChartJob {
    pub fn spawn(
        generator: ChartGenerator,
        request: TrackRequest,
        store: Arc<dyn ChartStore>,
    ) -> Self {
        let cancel = CancelToken::new();
        let (tx, rx) = bounded(1);
        let track_id = request.track_id.clone();

        let thread_cancel = cancel.clone();
        let handle = thread::spawn(move || {
            let result = Self::run(&generator, &request, store.as_ref(), &thread_cancel);
            let _ = tx.send(result);
        });

        Self {
            track_id,
            cancel,
            result_rx: rx,
            handle: Some(handle),
        }
    }

    fn run(
        generator: &ChartGenerator,
        request: &TrackRequest,
        store: &dyn ChartStore,
        cancel: &CancelToken,
    ) -> Result<ChartData, ChartError> {
        if let Some(chart) = store.get(&request.track_id) {
            log::info!("CHART: Using cached chart for {}", request.track_id);
            return Ok(chart);
        }

        let chart = generator.generate(request, cancel)?;
        // Not atomic with `save`: a cancel landing during the write still caches the chart.
        if cancel.is_cancelled() {
            log::info!("CHART: Dropping abandoned chart for {}", request.track_id);
            return Err(ChartError::Cancelled);
        }

        if let Err(e) = store.save(&chart) {
            log::error!("CHART: Failed to cache {}: {}", chart.track_id, e);
        }
        Ok(chart)
    }

    pub fn track_id(&self) -> &str {
        &self.track_id
    }

    /// Asks the worker to stop. Its result, if any, will be `Cancelled`.
    pub fn cancel(&self) {
        log::info!("CHART: Cancelling generation of {}", self.track_id);
        self.cancel.cancel();
    }

    /// Non-blocking poll. Yields the result once.
    pub fn try_result(&mut self) -> Option<Result<ChartData, ChartError>> {
        match self.result_rx.try_recv() {
            Ok(result) => {
                self.join();
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.join();
                Some(Err(ChartError::AnalysisFailed(
                    "generation thread stopped".into(),
                )))
            }
        }
    }

    /// Blocks until the worker is done.
    pub fn wait(mut self) -> Result<ChartData, ChartError> {
        let result = self.result_rx.recv().unwrap_or_else(|_| {
            Err(ChartError::AnalysisFailed(
                "generation thread stopped".into(),
            ))
        });
        self.join();
        result
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::error!("CHART: Generation thread for {} panicked", self.track_id);
        }
    }
}

impl Drop for ChartJob {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryChartStore;
    use crate::models::chart::ChartNote;
    use crate::logic::generator::analysis::tests::click_track;
    use crate::models::settings::GeneratorSettings;
    use std::fs;
    use std::path::{Path, PathBuf};

    /// Writes a 16-bit mono WAV file of a click track.
    fn write_click_wav(path: &Path, duration_ms: i64, clicks_ms: &[i64]) {
        let audio = click_track(duration_ms, clicks_ms);
        let data_len = (audio.samples.len() * 2) as u32;
        let mut bytes = Vec::with_capacity(44 + data_len as usize);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&audio.sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(audio.sample_rate * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for s in &audio.samples {
            bytes.extend_from_slice(&((s * i16::MAX as f32) as i16).to_le_bytes());
        }
        fs::write(path, bytes).unwrap();
    }

    fn wav_request(dir: &Path, track_id: &str) -> TrackRequest {
        let path = dir.join(format!("{track_id}.wav"));
        let clicks: Vec<i64> = (1..20).map(|k| k * 500).collect();
        write_click_wav(&path, 10_000, &clicks);
        TrackRequest {
            audio_path: path,
            ..request(track_id, 10_000)
        }
    }

    fn request(track_id: &str, duration_ms: i64) -> TrackRequest {
        TrackRequest {
            audio_path: PathBuf::from("/nonexistent/song.mp3"),
            track_id: track_id.into(),
            track_name: "Song".into(),
            artist_name: "Band".into(),
            duration_ms,
            bpm: 120.0,
        }
    }

    fn generator() -> ChartGenerator {
        ChartGenerator::new(600_000, GeneratorSettings::default())
    }

    #[test]
    fn test_cached_chart_skips_generation() {
        let store = Arc::new(MemoryChartStore::new());
        let cached = ChartData {
            track_id: "cached".into(),
            track_name: "Song".into(),
            artist_name: "Band".into(),
            bpm: 120.0,
            duration_ms: 30_000,
            notes: vec![ChartNote::tap(1_000, 2)],
            high_score: 700,
            best_multiplier: 2,
        };
        store.save(&cached).unwrap();

        let job = ChartJob::spawn(generator(), request("cached", 30_000), store);
        assert_eq!(job.wait().unwrap(), cached);
    }

    #[test]
    fn test_failed_generation_is_not_cached() {
        let store = Arc::new(MemoryChartStore::new());
        let job = ChartJob::spawn(generator(), request("broken", 30_000), store.clone());
        assert!(matches!(job.wait(), Err(ChartError::AnalysisFailed(_))));
        assert_eq!(store.get("broken"), None);
    }

    #[test]
    fn test_duration_limit_reported() {
        let store = Arc::new(MemoryChartStore::new());
        let job = ChartJob::spawn(generator(), request("long", 700_000), store.clone());
        assert!(matches!(job.wait(), Err(ChartError::DurationExceeded { .. })));
        assert_eq!(store.get("long"), None);
    }

    #[test]
    fn test_poll_eventually_yields() {
        let store = Arc::new(MemoryChartStore::new());
        let mut job = ChartJob::spawn(generator(), request("poll", 700_000), store);
        let result = loop {
            if let Some(result) = job.try_result() {
                break result;
            }
            thread::sleep(std::time::Duration::from_millis(1));
        };
        assert!(result.is_err());
    }

    #[test]
    fn test_generated_chart_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryChartStore::new());
        let mut job = ChartJob::spawn(generator(), wav_request(dir.path(), "fresh"), store.clone());
        assert_eq!(job.track_id(), "fresh");

        let chart = loop {
            if let Some(result) = job.try_result() {
                break result.unwrap();
            }
            thread::sleep(std::time::Duration::from_millis(1));
        };
        assert!(!chart.notes.is_empty());
        assert_eq!(store.get("fresh"), Some(chart));
    }

    #[test]
    fn test_cancelled_generation_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryChartStore::new();
        let cancel = CancelToken::new();
        cancel.cancel();

        let request = wav_request(dir.path(), "abandoned");
        let result = ChartJob::run(&generator(), &request, &store, &cancel);
        assert!(matches!(result, Err(ChartError::Cancelled)));
        assert_eq!(store.get("abandoned"), None);
    }
}
