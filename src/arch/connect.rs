//! Connect-until loop.
//!
//! Start an asynchronous connect, then alternate status checks with polling
//! and power-efficient waits until the link is up, the link fails, or the
//! deadline passes. The deadline is checked first on every iteration, so an
//! already expired deadline returns [`ArchError::Timeout`] without waiting and
//! success is only reported for a link that came up strictly before it.

use crate::arch::Arch;
use crate::driver::LinkStatus;
use crate::error::ArchError;
use crate::time::Deadline;

/// Outcome of one status check.
enum Step {
    Done(Result<(), ArchError>),
    Wait(Deadline),
}

fn step<A: Arch + ?Sized>(
    arch: &A,
    deadline: Deadline,
    last: &mut Option<LinkStatus>,
) -> Step {
    let now = arch.now();
    if deadline.is_reached(now) {
        debug!("connect timed out");
        return Step::Done(Err(ArchError::Timeout));
    }

    let status = arch.link_status();
    if *last != Some(status) {
        debug!("connect status: {}", status.name());
        *last = Some(status);
    }

    match status {
        LinkStatus::Up => Step::Done(Ok(())),
        s if s.is_failure() => Step::Done(Err(ArchError::Link(s))),
        // Wake at least once per service interval to re-read the status
        _ => Step::Wait(deadline.min(Deadline::after(now, arch.service_interval()))),
    }
}

/// Connect and wait. See the module docs for the loop semantics.
pub fn connect_until<A: Arch + ?Sized>(arch: &A, deadline: Deadline) -> Result<(), ArchError> {
    arch.connect_async()?;

    let mut last = None;
    loop {
        match step(arch, deadline, &mut last) {
            Step::Done(result) => return result,
            Step::Wait(until) => {
                // In case polling is required
                arch.poll();
                arch.wait_for_work_until(until);
            }
        }
    }
}

/// Async timer used by [`connect_until_async`].
#[cfg(feature = "async")]
#[allow(async_fn_in_trait)]
pub trait AsyncWait {
    /// Resolve once `deadline` has passed (or earlier).
    async fn wait_until(&self, deadline: Deadline);
}

/// Async version of [`connect_until`] for executors such as embassy.
///
/// Same loop, but waits by awaiting `waiter` instead of blocking the core.
#[cfg(feature = "async")]
pub async fn connect_until_async<A, W>(
    arch: &A,
    waiter: &W,
    deadline: Deadline,
) -> Result<(), ArchError>
where
    A: Arch + ?Sized,
    W: AsyncWait,
{
    arch.connect_async()?;

    let mut last = None;
    loop {
        match step(arch, deadline, &mut last) {
            Step::Done(result) => return result,
            Step::Wait(until) => {
                arch.poll();
                waiter.wait_until(until).await;
            }
        }
    }
}
