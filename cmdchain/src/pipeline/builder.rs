//! Pipeline builder.

use super::{Pipeline, PipelineConfig};
use crate::context::{AttributeContext, Context, ContextFactory, DefaultContextFactory};
use crate::sinks::Sink;
use crate::sources::{OneShotSource, Source};
use std::fmt;

/// Builder wiring the participants of a [`Pipeline`].
///
/// Commands are registered on the built pipeline, since registration is
/// checked against the source chosen here.
pub struct PipelineBuilder<C = Context> {
    config: PipelineConfig,
    source: Option<Box<dyn Source<C>>>,
    sink: Option<Box<dyn Sink<C>>>,
    context_factory: Option<Box<dyn ContextFactory<C>>>,
}

impl<C: AttributeContext + 'static> PipelineBuilder<C> {
    /// Creates a new builder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            source: None,
            sink: None,
            context_factory: None,
        }
    }

    /// Sets the pipeline name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the source. Without one the pipeline runs exactly one cycle.
    #[must_use]
    pub fn source(mut self, source: impl Source<C> + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Sets the sink collecting the pipeline's result.
    #[must_use]
    pub fn sink(mut self, sink: impl Sink<C> + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Sets the factory creating a context for every run.
    #[must_use]
    pub fn context_factory(mut self, factory: impl ContextFactory<C> + 'static) -> Self {
        self.context_factory = Some(Box::new(factory));
        self
    }

    /// Builds the pipeline, falling back to `C::default()` contexts when no
    /// factory was set.
    #[must_use]
    pub fn build(self) -> Pipeline<C>
    where
        C: Default,
    {
        let Self {
            config,
            source,
            sink,
            context_factory,
        } = self;
        let context_factory =
            context_factory.unwrap_or_else(|| Box::new(DefaultContextFactory::<C>::new()));
        Self::finish(config, source, sink, context_factory)
    }

    /// Builds the pipeline with an explicit factory, for context types
    /// without a `Default` implementation.
    #[must_use]
    pub fn build_with_factory(self, factory: impl ContextFactory<C> + 'static) -> Pipeline<C> {
        Self::finish(self.config, self.source, self.sink, Box::new(factory))
    }

    fn finish(
        config: PipelineConfig,
        source: Option<Box<dyn Source<C>>>,
        sink: Option<Box<dyn Sink<C>>>,
        context_factory: Box<dyn ContextFactory<C>>,
    ) -> Pipeline<C> {
        let source = source.unwrap_or_else(|| Box::new(OneShotSource::new()));
        Pipeline::assemble(config, source, sink, context_factory)
    }
}

impl<C: AttributeContext + 'static> Default for PipelineBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for PipelineBuilder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("config", &self.config)
            .field("source", &self.source.as_ref().map(|s| s.name()))
            .field("sink", &self.sink.as_ref().map(|s| s.name()))
            .field("has_context_factory", &self.context_factory.is_some())
            .finish()
    }
}
