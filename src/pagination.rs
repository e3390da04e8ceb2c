use tracing::{debug, warn};

use crate::error::ScrapeError;
use crate::page::Page;
use crate::poll::{poll_while, PollPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationOutcome {
    pub clicks: u32,
    /// `false` when the click bound was hit with the control still showing.
    pub complete: bool,
}

/// The load-more control, if it is present and visible. A missing control is the
/// normal "fully loaded" state.
pub async fn has_more<P: Page>(page: &P, selector: &str) -> Result<Option<P::Node>, ScrapeError> {
    let Some(node) = page.find_one(selector).await? else {
        return Ok(None);
    };
    let visible = page.is_visible(&node).await?;
    Ok(visible.then_some(node))
}

/// Click "load more" until the whole catalog is rendered.
pub async fn exhaust<P: Page>(
    page: &P,
    selector: &str,
    policy: &PollPolicy,
) -> Result<PaginationOutcome, ScrapeError> {
    let polled = poll_while(
        policy,
        move || has_more(page, selector),
        move |node| async move {
            debug!("Clicking load-more control");
            page.click(&node).await
        },
    )
    .await?;

    if !polled.settled {
        warn!(
            "Load-more control still visible after {} clicks; extracting what is rendered",
            polled.activations
        );
    }

    Ok(PaginationOutcome {
        clicks: polled.activations,
        complete: polled.settled,
    })
}
