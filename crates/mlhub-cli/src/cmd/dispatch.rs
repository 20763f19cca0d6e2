//! Model command dispatch: `ml <command> <model> [args...]`

use anyhow::{Result, bail};
use mlhub_core::dispatch::{DispatchOutcome, display_available, execute, prepare};

use crate::ops::Context;

/// Run a model's command. Returns the exit code `ml` should end with.
pub async fn dispatch(ctx: &Context, args: &[String]) -> Result<i32> {
    let Some((command, rest)) = args.split_first() else {
        bail!("no command given");
    };
    let Some((model, script_args)) = rest.split_first() else {
        bail!("usage: ml {command} <model> [args...]");
    };

    let inv = prepare(
        &ctx.layout,
        model,
        command,
        script_args,
        display_available(),
        ctx.prompter.as_ref(),
    )?;
    ctx.completion
        .lock()
        .await
        .record_known_commands([inv.command.as_str()]);
    let cwd = std::env::current_dir()?;

    match execute(&inv, &cwd).await? {
        DispatchOutcome::Success { stderr } => {
            eprint!("{stderr}");
            Ok(0)
        }
        DispatchOutcome::Failed { code, stderr } => {
            eprintln!("An error was encountered:\n");
            eprint!("{stderr}");
            Ok(code.unwrap_or(1))
        }
    }
}
