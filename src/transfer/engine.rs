//! Bounded-concurrency chunk driver.
//!
//! Chunks are started in index order and at most `concurrency` of them are
//! in flight at once; a finished chunk immediately makes room for the next.
//! Every chunk operation receives a child of the caller's context. The first
//! failure cancels that child scope, drops the chunks still in flight and is
//! returned as is. Nothing written by completed chunks is rolled back.
//!
//! Only the chunk with the highest index supplies the result, whatever the
//! completion order.

use super::plan::{Chunk, ChunkPlan};
use crate::context::Context;
use crate::error::{Error, Result};

use futures::stream::{self, StreamExt};
use std::future::Future;
use tracing::{debug, trace, warn};

/// Runs `op` over every chunk of `[0, total)`.
///
/// ```rust
/// use blobflow::transfer::engine;
/// use blobflow::Context;
///
/// # #[tokio::main]
/// # async fn main() -> blobflow::Result<()> {
/// let last = engine::run(&Context::new(), 10, 4, 2, |_ctx, chunk| async move {
///     Ok::<_, blobflow::Error>(chunk.offset)
/// })
/// .await?;
/// assert_eq!(last, 8);
/// # Ok(())
/// # }
/// ```
pub async fn run<T, F, Fut>(
    ctx: &Context,
    total: u64,
    chunk_size: u64,
    concurrency: usize,
    op: F,
) -> Result<T>
where
    F: Fn(Context, Chunk) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    run_plan(ctx, ChunkPlan::new(total, chunk_size)?, concurrency, op).await
}

/// Runs `op` over every chunk of `[base, base + total)`.
pub async fn run_range<T, F, Fut>(
    ctx: &Context,
    base: u64,
    total: u64,
    chunk_size: u64,
    concurrency: usize,
    op: F,
) -> Result<T>
where
    F: Fn(Context, Chunk) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    run_plan(
        ctx,
        ChunkPlan::with_offset(base, total, chunk_size)?,
        concurrency,
        op,
    )
    .await
}

/// Runs `op` over every chunk of `plan`.
pub async fn run_plan<T, F, Fut>(
    ctx: &Context,
    plan: ChunkPlan,
    concurrency: usize,
    op: F,
) -> Result<T>
where
    F: Fn(Context, Chunk) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    check_concurrency(concurrency)?;
    let scope = ctx.child();
    let op = &op;
    let tasks = plan.iter().map(|chunk| {
        let scope = scope.clone();
        async move {
            scope.check()?;
            trace!(
                index = chunk.index,
                offset = chunk.offset,
                length = chunk.length,
                "Chunk started"
            );
            let value = scope.run(op(scope.clone(), chunk)).await?;
            Ok::<_, Error>((chunk, value))
        }
    });
    drive(&scope, &plan, tasks, concurrency).await
}

/// Runs `op` over disjoint slices of `dest`, one per chunk of
/// `[base, base + dest.len())`.
///
/// The slices are carved out of `dest` up front, so chunks write in parallel
/// without any locking.
pub async fn run_into<'a, T, F, Fut>(
    ctx: &Context,
    base: u64,
    dest: &'a mut [u8],
    chunk_size: u64,
    concurrency: usize,
    op: F,
) -> Result<T>
where
    F: Fn(Context, Chunk, &'a mut [u8]) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    check_concurrency(concurrency)?;
    let plan = ChunkPlan::with_offset(base, dest.len() as u64, chunk_size)?;
    let slice_size = usize::try_from(chunk_size).unwrap_or(usize::MAX);
    let slices: Vec<&'a mut [u8]> = if dest.is_empty() {
        vec![dest]
    } else {
        dest.chunks_mut(slice_size).collect()
    };

    let scope = ctx.child();
    let op = &op;
    let tasks = plan.iter().zip(slices).map(|(chunk, slice)| {
        let scope = scope.clone();
        async move {
            scope.check()?;
            trace!(
                index = chunk.index,
                offset = chunk.offset,
                length = chunk.length,
                "Chunk started"
            );
            let value = scope.run(op(scope.clone(), chunk, slice)).await?;
            Ok::<_, Error>((chunk, value))
        }
    });
    drive(&scope, &plan, tasks, concurrency).await
}

fn check_concurrency(concurrency: usize) -> Result<()> {
    if concurrency == 0 {
        return Err(Error::InvalidArgument("concurrency must be positive".into()));
    }
    Ok(())
}

async fn drive<T, I, Fut>(
    scope: &Context,
    plan: &ChunkPlan,
    tasks: I,
    concurrency: usize,
) -> Result<T>
where
    I: Iterator<Item = Fut>,
    Fut: Future<Output = Result<(Chunk, T)>>,
{
    debug!(
        total = plan.total(),
        chunks = plan.chunk_count(),
        concurrency,
        "Transfer started"
    );
    let mut in_flight = stream::iter(tasks).buffer_unordered(concurrency);
    let mut last = None;
    while let Some(outcome) = in_flight.next().await {
        match outcome {
            Ok((chunk, value)) => {
                trace!(index = chunk.index, "Chunk finished");
                if chunk.is_last() {
                    last = Some(value);
                }
            }
            Err(e) => {
                scope.cancel();
                warn!(error = %e, "Chunk failed, cancelling transfer");
                return Err(e);
            }
        }
    }
    debug!(total = plan.total(), "Transfer finished");
    last.ok_or_else(|| Error::Internal("transfer produced no final chunk".into()))
}
