//! Plan command: show how a configuration splits into tasks.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, info_span};

use gridver_spatial::GridInfo;
use gridver_workflow::{ChunkingStrategy, ProcessingPlan, Task, bytes_to_mb};

use crate::cli::PlanArgs;
use crate::config::GridverConfig;
use crate::convert;

/// What `gridver plan` prints.
#[derive(Debug, Serialize)]
pub struct PlanSummary {
    pub variable: String,
    pub grid: GridInfo,
    pub num_spatial_chunks: usize,
    pub num_temporal_groups: usize,
    pub total_tasks: usize,
    pub num_verification_times: usize,
    pub groups: Vec<String>,
    pub peak_chunk_memory_mb: f64,
    pub max_chunk_memory_mb: f64,
    /// Chunk size that fits the memory ceiling, `(chunk_i, chunk_j)`.
    pub suggested_chunk_size: (usize, usize),
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<Task>,
}

/// Builds the plan described by `config`.
pub fn summarize(config: &GridverConfig, with_tasks: bool) -> Result<PlanSummary> {
    let grid = convert::build_grid(&config.grid)?;
    let time = convert::build_time_manager(&config.temporal)?;
    let chunking = convert::build_chunking_config(&config.memory);
    let bbox = config.grid.bbox.as_ref().map(convert::build_bbox).transpose()?;

    let strategy = ChunkingStrategy::new(&grid, &time, chunking)?;
    let plan: ProcessingPlan = strategy
        .get_processing_plan(bbox.as_ref())
        .context("failed to build processing plan")?;

    let num_variables = strategy.config().num_variables();
    Ok(PlanSummary {
        variable: config.verification.variable.clone(),
        grid: grid.grid_info(),
        num_spatial_chunks: plan.num_spatial_chunks(),
        num_temporal_groups: plan.num_temporal_groups(),
        total_tasks: plan.total_tasks(),
        num_verification_times: time.n_times(),
        groups: plan.groups().iter().map(ToString::to_string).collect(),
        peak_chunk_memory_mb: bytes_to_mb(plan.peak_chunk_memory(num_variables)),
        max_chunk_memory_mb: strategy.config().max_chunk_memory_mb(),
        suggested_chunk_size: strategy.adjust_chunk_size(grid.chunk_size()),
        tasks: if with_tasks { plan.tasks().collect() } else { Vec::new() },
    })
}

fn render_text(summary: &PlanSummary) -> String {
    let mut lines = vec![
        format!("variable:        {}", summary.variable),
        format!(
            "grid:            {} x {} ({} gridpoints)",
            summary.grid.ni, summary.grid.nj, summary.grid.total_gridpoints
        ),
        format!(
            "chunk size:      {} x {} (suggested {} x {})",
            summary.grid.chunk_size.0,
            summary.grid.chunk_size.1,
            summary.suggested_chunk_size.0,
            summary.suggested_chunk_size.1
        ),
        format!("spatial chunks:  {}", summary.num_spatial_chunks),
        format!(
            "temporal groups: {} ({})",
            summary.num_temporal_groups,
            summary.groups.join(", ")
        ),
        format!("times:           {}", summary.num_verification_times),
        format!("tasks:           {}", summary.total_tasks),
        format!(
            "chunk memory:    {:.2} MiB peak / {:.2} MiB ceiling",
            summary.peak_chunk_memory_mb, summary.max_chunk_memory_mb
        ),
    ];
    for task in &summary.tasks {
        let c = &task.chunk;
        lines.push(format!(
            "task {:>5}  group {}  chunk {:>4}  i {}..{}  j {}..{}",
            task.task_id, task.group, c.chunk_id, c.i_start, c.i_end, c.j_start, c.j_end
        ));
    }
    lines.join("\n")
}

/// Run the plan command.
pub fn run(args: PlanArgs) -> Result<()> {
    let _cmd = info_span!("plan").entered();
    let config = GridverConfig::from_path(&args.config)?;
    let summary = summarize(&config, args.tasks)?;
    info!(n_tasks = summary.total_tasks, "processing plan ready");

    if args.json {
        let json = serde_json::to_string_pretty(&summary).context("failed to serialise plan")?;
        println!("{json}");
    } else {
        println!("{}", render_text(&summary));
    }
    Ok(())
}
