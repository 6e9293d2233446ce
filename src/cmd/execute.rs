use super::{
    execution_plan::{CommandLine, ExecutionPlan},
    DispatchError, Outcome,
};
use crate::process::{
    child::Program,
    launch::{launch, Launched},
    pipe::run_pipeline,
    redirect::run_redirected,
};

impl CommandLine<'_> {
    pub fn execute(&self) -> Result<Outcome, DispatchError> {
        match &self.plan {
            ExecutionPlan::Execute(argv) => {
                let program = Program::new(argv)?;

                match launch(&program, self.background)? {
                    Launched::Foreground(status) => Ok(Outcome::Completed(status)),
                    Launched::Background(pid) => Ok(Outcome::Background(pid)),
                }
            }
            ExecutionPlan::Pipe(left, right) => {
                let stages = [Program::new(left)?, Program::new(right)?];

                if self.background {
                    debug!("pipelines always run in the foreground");
                }

                trace!(left = %stages[0], right = %stages[1], "PIPE: spawning both sides");
                Ok(Outcome::Pipeline(run_pipeline(&stages)?))
            }
            ExecutionPlan::Redirect(argv, redirection) => {
                let program = Program::new(argv)?;

                if self.background {
                    debug!("redirected commands always run in the foreground");
                }

                let status = run_redirected(&program, redirection.file, redirection.direction)?;
                Ok(Outcome::Completed(status))
            }
        }
    }
}
