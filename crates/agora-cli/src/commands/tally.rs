use crate::cli::GlobalFlags;
use crate::cli::root_commands::TallyArgs;
use crate::context::AppContext;
use crate::output::output;

/// Handle `agora tally`.
pub async fn handle(args: &TallyArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let tally = ctx.service.tally(&args.poll).await?;
    if !tally.cycles.is_empty() && !flags.quiet {
        tracing::warn!(
            poll = %args.poll,
            cycles = tally.cycles.len(),
            "some voters sit on delegation cycles and count as abstentions"
        );
    }
    output(&tally, flags.format)
}
