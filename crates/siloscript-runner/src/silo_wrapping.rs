use std::collections::HashMap;
use std::sync::Arc;

use crate::observer::Observer;
use crate::{RunOutput, Runner, RunnerError};

/// The environment variable scripts read to find their data endpoint.
pub const DATASTORE_URL_ENV_NAME: &str = "DATASTORE_URL";

/// Wraps a [`Runner`] so that every run has a `DATASTORE_URL` environment
/// variable pointing at the silo handle's data endpoint.
pub struct SiloWrappingRunner<R> {
    inner: R,
    data_url_root: String,
}

impl<R: Runner> SiloWrappingRunner<R> {
    pub fn new(inner: R, data_url_root: impl Into<String>) -> Self {
        Self {
            inner,
            data_url_root: data_url_root.into(),
        }
    }

    pub async fn run_with_silo(
        &self,
        silo_handle: &str,
        script: &str,
        args: &[String],
        mut env: HashMap<String, String>,
        observer: Option<Arc<dyn Observer>>,
    ) -> Result<RunOutput, RunnerError> {
        env.insert(
            DATASTORE_URL_ENV_NAME.to_string(),
            format!("{}/{}", self.data_url_root, silo_handle),
        );
        self.inner.run(script, args, env, observer).await
    }
}
