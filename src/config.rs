use crate::{
    explorer::Explorer,
    recorder::{NoopRecorder, Recorder},
    MwtExplorer,
};

/// Configuration for [`MwtExplorer`].
///
/// `C` is the context type and `A` the action type of the explorer the configuration will be
/// used with. Both are usually inferred from [`MwtConfig::to_explorer`].
pub struct MwtConfig<'a, C: ?Sized, A> {
    pub(crate) app_id: String,
    pub(crate) recorder: Box<dyn Recorder<C, A> + Send + Sync + 'a>,
}

impl<'a, C: ?Sized, A> MwtConfig<'a, C, A> {
    /// Create a configuration for the application `app_id`. The application id salts every seed,
    /// so different applications make independent decisions for the same unique key.
    ///
    /// Interactions are dropped until a recorder is set.
    ///
    /// ```
    /// # use mwt::MwtConfig;
    /// let config = MwtConfig::<(), u32>::new("my-app");
    /// ```
    pub fn new(app_id: impl Into<String>) -> Self {
        MwtConfig {
            app_id: app_id.into(),
            recorder: Box::new(NoopRecorder),
        }
    }

    /// Set the recorder that receives interactions worth logging.
    ///
    /// ```
    /// # use mwt::{Interaction, MwtConfig};
    /// let config = MwtConfig::new("my-app").recorder(|interaction: Interaction<'_, str, u32>| {
    ///     println!("{} -> {}", interaction.context, interaction.action);
    /// });
    /// ```
    pub fn recorder(mut self, recorder: impl Recorder<C, A> + Send + Sync + 'a) -> Self {
        self.recorder = Box::new(recorder);
        self
    }

    /// Create an [`MwtExplorer`] dispatching to `explorer`.
    ///
    /// ```
    /// # use mwt::{EpsilonGreedyExplorer, MwtConfig};
    /// let explorer = EpsilonGreedyExplorer::<(), _>::new(|_: &()| 1u32, 0.1, 3)?;
    /// let mwt = MwtConfig::new("my-app").to_explorer(explorer);
    /// # Ok::<(), mwt::Error>(())
    /// ```
    pub fn to_explorer<E>(self, explorer: E) -> MwtExplorer<'a, C, E>
    where
        E: Explorer<C, Action = A>,
    {
        MwtExplorer::new(self, explorer)
    }
}
