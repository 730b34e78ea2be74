use crate::widget::{ChatWidget, InputField, UiEvent};
use anyhow::{Context, Result};
use futures::StreamExt;
use futures::future::join_all;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_stream::wrappers::LinesStream;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Line typed into the field, followed by Enter.
    Submit(String),
    Quit,
}

pub fn parse_input(line: &str) -> Command {
    match line.trim() {
        "/quit" | "/exit" => Command::Quit,
        _ => Command::Submit(line.to_string()),
    }
}

/// Feeds terminal lines to the widget until `/quit` or end of input, then
/// waits for turns still in flight so their replies are not lost.
pub async fn run<R>(widget: &ChatWidget, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = LinesStream::new(input.lines());
    let mut field = InputField::new();
    let mut in_flight = Vec::new();

    while let Some(line) = lines.next().await {
        let line = line.context("failed to read input line")?;
        match parse_input(&line) {
            Command::Quit => break,
            Command::Submit(text) => {
                field.set(text);
                if let Some(turn) = widget.dispatch(UiEvent::KeyPress("Enter".into()), &mut field)
                {
                    in_flight.push(turn);
                }
            }
        }
        in_flight.retain(|turn| !turn.is_finished());
    }

    if !in_flight.is_empty() {
        log::debug!("waiting for {} turn(s) in flight", in_flight.len());
    }
    for result in join_all(in_flight).await {
        if let Err(err) = result {
            log::warn!("chat turn task failed: {err}");
        }
    }
    Ok(())
}
