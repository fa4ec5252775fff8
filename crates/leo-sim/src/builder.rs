//! Fluent builder for constructing an [`Environment`].

use std::sync::Arc;

use leo_core::StreamConfig;
use leo_trace::{TraceSet, VideoSizes};

use crate::{Environment, SimError, SimResult};

/// Fluent builder for [`Environment`].
///
/// # Required inputs
///
/// - [`StreamConfig`]: buffer, ladder, MPC and sharing settings
/// - [`TraceSet`]: one trace per episode, replayed in order
/// - [`VideoSizes`]: chunk sizes covering every level and chunk
///
/// # Optional inputs
///
/// | Method       | Default |
/// |--------------|---------|
/// | `.users(n)`  | 1       |
///
/// # Example
///
/// ```rust,ignore
/// let video = VideoSizes::from_ladder(&config.ladder, config.chunk_len_s(), config.total_chunks)?;
/// let mut env = EnvironmentBuilder::new(config, traces, video).users(2).build()?;
/// let user = env.first_agent().unwrap();
/// let outcome = env.get_video_chunk(Quality(0), user, Some(Strategy::DualMpc), false)?;
/// ```
pub struct EnvironmentBuilder {
    config: StreamConfig,
    traces: TraceSet,
    video:  VideoSizes,
    users:  usize,
}

impl EnvironmentBuilder {
    pub fn new(config: StreamConfig, traces: TraceSet, video: VideoSizes) -> Self {
        Self { config, traces, video, users: 1 }
    }

    /// Number of users sharing each trace.
    pub fn users(mut self, users: usize) -> Self {
        self.users = users;
        self
    }

    /// Validate inputs and place every user on the first trace.
    pub fn build(self) -> SimResult<Environment> {
        self.config.validate()?;
        if self.users == 0 {
            return Err(SimError::Config("at least one user is required".into()));
        }
        if self.traces.is_empty() {
            return Err(SimError::Config("trace set is empty".into()));
        }
        self.video.covers(self.config.ladder.levels(), self.config.total_chunks)?;

        Environment::new(Arc::new(self.config), self.traces, Arc::new(self.video), self.users)
    }
}
