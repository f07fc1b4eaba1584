//! CPU temperature overlay sampling
//!
//! Cosmetic only. Sampling runs on a [`RepeatingTask`] that is aborted on
//! `stop()` or drop, so it never keeps the runtime alive on its own.

use crate::render_state::RenderState;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Runs a job on a fixed period until stopped.
pub struct RepeatingTask {
    handle: Option<JoinHandle<()>>,
}

impl RepeatingTask {
    /// Spawn on the current tokio runtime. The first run happens after one period.
    pub fn spawn<F, Fut>(period: Duration, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                job().await;
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Color band for the overlay text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureTier {
    Cool,
    Normal,
    Warm,
    Hot,
}

impl TemperatureTier {
    pub fn classify(celsius: f32) -> Self {
        if celsius > 70.0 {
            Self::Hot
        } else if celsius > 50.0 {
            Self::Warm
        } else if celsius > 40.0 {
            Self::Normal
        } else {
            Self::Cool
        }
    }

    /// 0RGB color.
    pub fn color(self) -> u32 {
        match self {
            Self::Cool => 0x00ffff,
            Self::Normal => 0x00ff00,
            Self::Warm => 0xffff00,
            Self::Hot => 0xff0000,
        }
    }
}

pub fn overlay_text(celsius: f32) -> String {
    format!("CPU Temp: {celsius}°C")
}

/// Parse a sysfs millidegree reading.
pub fn parse_millidegrees(raw: &str) -> Option<f32> {
    raw.lines()
        .next()
        .and_then(|line| line.trim().parse::<f32>().ok())
        .map(|milli| milli / 1000.0)
}

/// Reads a thermal zone into [`RenderState`].
#[derive(Debug, Clone)]
pub struct ThermalSampler {
    path: PathBuf,
    state: Arc<RenderState>,
}

impl ThermalSampler {
    pub fn new(state: Arc<RenderState>) -> Self {
        Self::with_path(state, THERMAL_ZONE)
    }

    pub fn with_path(state: Arc<RenderState>, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state,
        }
    }

    /// Take one reading. Unreadable zones report 0.0.
    pub async fn sample(&self) -> f32 {
        let celsius = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => parse_millidegrees(&raw).unwrap_or_else(|| {
                tracing::debug!("unparsable thermal reading {:?}", raw);
                0.0
            }),
            Err(e) => {
                tracing::debug!("thermal zone {}: {e}", self.path.display());
                0.0
            }
        };
        self.state.set_cpu_temperature(celsius);
        celsius
    }

    pub fn start(self, period: Duration) -> RepeatingTask {
        RepeatingTask::spawn(period, move || {
            let sampler = self.clone();
            async move {
                sampler.sample().await;
            }
        })
    }
}
