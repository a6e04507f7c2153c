use crate::config::PipelineOptions;
use crate::error::{PipelineDiagnostics, PipelineError};
use std::marker::PhantomData;
use tracing::{debug, info_span};

/// One step of a pipeline, consuming its input context and producing the next.
pub trait PipelineStage: Send + Sync {
    type SrcCtx;
    type DstCtx;

    fn name(&self) -> &'static str;
    fn run(
        &self,
        context: Self::SrcCtx,
        diagnostics: &mut PipelineDiagnostics,
    ) -> Result<Self::DstCtx, PipelineError>;
}

type RunFn<Src, Dst> = Box<
    dyn Fn(Src, &mut PipelineDiagnostics, &PipelineOptions) -> Result<Dst, PipelineError>
        + Send
        + Sync,
>;

pub struct Pipeline<Src, Dst> {
    run: RunFn<Src, Dst>,
    stages: Vec<&'static str>,
}

impl<Src, Dst> Pipeline<Src, Dst> {
    pub fn run(
        &self,
        context: Src,
        diagnostics: &mut PipelineDiagnostics,
        options: &PipelineOptions,
    ) -> Result<Dst, PipelineError> {
        (self.run)(context, diagnostics, options)
    }

    /// Stage names in execution order.
    pub fn stages(&self) -> &[&'static str] {
        &self.stages
    }
}

pub struct PipelineBuilder<Src, Dst> {
    pipeline: Pipeline<Src, Dst>,
    _marker: PhantomData<(Src, Dst)>,
}

impl<Src> PipelineBuilder<Src, Src> {
    pub fn new() -> Self {
        let run = |context: Src,
                   _diagnostics: &mut PipelineDiagnostics,
                   _options: &PipelineOptions| Ok(context);
        Self {
            pipeline: Pipeline {
                run: Box::new(run),
                stages: Vec::new(),
            },
            _marker: PhantomData,
        }
    }
}

impl<Src> Default for PipelineBuilder<Src, Src> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Src, Mid> PipelineBuilder<Src, Mid> {
    pub fn add_stage<Next, S>(self, stage: S) -> PipelineBuilder<Src, Next>
    where
        S: PipelineStage<SrcCtx = Mid, DstCtx = Next> + 'static,
        Src: 'static,
        Mid: 'static,
        Next: 'static,
    {
        let name = stage.name();
        let previous = self.pipeline.run;
        let mut stages = self.pipeline.stages;
        stages.push(name);

        let run = move |context: Src,
                        diagnostics: &mut PipelineDiagnostics,
                        options: &PipelineOptions| {
            let mid = previous(context, diagnostics, options)?;
            let _span = info_span!("stage", name).entered();
            debug!("running stage '{}'", name);
            match stage.run(mid, diagnostics) {
                Ok(next) => {
                    diagnostics.flush(name, options);
                    Ok(next)
                }
                Err(err) if err.stage == name => Err(err),
                Err(err) => Err(PipelineError::new(name, err.message)),
            }
        };

        PipelineBuilder {
            pipeline: Pipeline {
                run: Box::new(run),
                stages,
            },
            _marker: PhantomData,
        }
    }

    pub fn build(self) -> Pipeline<Src, Mid> {
        self.pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Double;

    impl PipelineStage for Double {
        type SrcCtx = u32;
        type DstCtx = u32;

        fn name(&self) -> &'static str {
            "double"
        }

        fn run(&self, context: u32, _: &mut PipelineDiagnostics) -> Result<u32, PipelineError> {
            context
                .checked_mul(2)
                .ok_or_else(|| PipelineError::new("overflow", "value too large"))
        }
    }

    #[test]
    fn stages_run_in_order_and_rename_foreign_errors() {
        let pipeline = PipelineBuilder::new()
            .add_stage(Double)
            .add_stage(Double)
            .build();
        let mut diagnostics = PipelineDiagnostics::default();
        let options = PipelineOptions::default();

        assert_eq!(pipeline.stages(), &["double", "double"]);
        assert_eq!(pipeline.run(3, &mut diagnostics, &options).unwrap(), 12);

        let err = pipeline
            .run(u32::MAX, &mut diagnostics, &options)
            .unwrap_err();
        assert_eq!(err.stage, "double");
    }
}
