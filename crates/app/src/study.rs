//! Terminal review session: one card at a time, answered with y/n.

use std::error::Error;
use std::io::Write;

use chrono::Duration;
use review_core::model::{DeckId, ReviewOutcome, ReviewSession, SessionSummary};
use services::{AppServices, ReviewCoordinator};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

/// Review every due card of `deck_id`, reading answers from `input`.
///
/// Quitting early (or end of input) abandons the session; cards not yet
/// answered keep their schedules.
///
/// # Errors
///
/// Returns an error if the deck is unknown, the store stays unavailable, or
/// the terminal cannot be written.
pub async fn run<R, W>(
    services: &AppServices,
    deck_id: DeckId,
    input: R,
    out: &mut W,
) -> Result<Option<SessionSummary>, Box<dyn Error>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let coordinator = services.coordinator();
    let reviews = services.reviews();
    let mut lines = input.lines();

    let mut session = coordinator.start_session(deck_id).await?;
    if session.is_finished() {
        writeln!(out, "Nothing due in deck {deck_id}.")?;
        return Ok(session.summary());
    }
    writeln!(out, "{} cards due.", session.total())?;

    while let Some(card) = session.current() {
        let progress = coordinator.progress(&session);
        writeln!(
            out,
            "\n[{}/{}] {}",
            progress.answered + 1,
            progress.total,
            card.content().front()
        )?;
        write!(out, "enter = show answer, q = quit: ")?;
        out.flush()?;
        match lines.next_line().await? {
            Some(line) if line.trim() != "q" => {}
            _ => return quit(&coordinator, &mut session, out),
        }

        let card = coordinator.reveal(&mut session)?;
        writeln!(out, "  {}", card.content().back())?;
        if !card.content().example().is_empty() {
            writeln!(out, "  e.g. {}", card.content().example())?;
        }

        let now = reviews.now();
        let preview = reviews.scheduler().preview(&card, now);
        let Some(outcome) = ask_outcome(
            &mut lines,
            out,
            preview.correct - now,
            preview.wrong - now,
        )
        .await?
        else {
            return quit(&coordinator, &mut session, out);
        };

        let mut result = coordinator.answer_current(&mut session, outcome).await;
        while let Err(err) = result {
            writeln!(out, "could not save answer: {err}")?;
            write!(out, "r = retry, q = quit: ")?;
            out.flush()?;
            match lines.next_line().await? {
                Some(line) if line.trim() == "r" => {
                    result = coordinator.retry_pending(&mut session).await;
                }
                _ => return quit(&coordinator, &mut session, out),
            }
        }
    }

    let summary = session.summary();
    if let Some(summary) = &summary {
        print_summary(out, summary)?;
    }
    Ok(summary)
}

async fn ask_outcome<R, W>(
    lines: &mut Lines<R>,
    out: &mut W,
    after_correct: Duration,
    after_wrong: Duration,
) -> Result<Option<ReviewOutcome>, Box<dyn Error>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        write!(
            out,
            "y = got it (back in {}), n = missed it (back in {}), q = quit: ",
            humanize(after_correct),
            humanize(after_wrong)
        )?;
        out.flush()?;
        let Some(line) = lines.next_line().await? else {
            return Ok(None);
        };
        match line.trim() {
            "y" => return Ok(Some(ReviewOutcome::Correct)),
            "n" => return Ok(Some(ReviewOutcome::Wrong)),
            "q" => return Ok(None),
            _ => writeln!(out, "please answer y, n or q")?,
        }
    }
}

fn quit<W: Write>(
    coordinator: &ReviewCoordinator,
    session: &mut ReviewSession,
    out: &mut W,
) -> Result<Option<SessionSummary>, Box<dyn Error>> {
    let summary = coordinator.abandon(session);
    writeln!(out, "\nStopped with {} cards left.", session.remaining())?;
    if let Some(summary) = &summary {
        print_summary(out, summary)?;
    }
    Ok(summary)
}

fn print_summary<W: Write>(out: &mut W, summary: &SessionSummary) -> std::io::Result<()> {
    writeln!(
        out,
        "Reviewed {}: {} correct, {} wrong.",
        summary.total(),
        summary.correct(),
        summary.wrong()
    )
}

fn humanize(delta: Duration) -> String {
    let secs = delta.num_seconds();
    match secs {
        s if s >= 86_400 => format!("{}d", s / 86_400),
        s if s >= 3_600 => format!("{}h", s / 3_600),
        s if s >= 60 => format!("{}m", s / 60),
        s => format!("{s}s"),
    }
}
