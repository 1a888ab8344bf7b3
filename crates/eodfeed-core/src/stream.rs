//! Timestamp-ordered merge of several history streams.
//!
//! Each input yields its own bars in ascending order. [`Interleave`] emits
//! the earliest pending bar across all inputs (UTC instant), preferring the
//! earlier input on equal instants. An input that fails yields its error
//! once and is then treated as exhausted.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::BarFields;
use crate::reader::HistoryStream;
use crate::Error;

/// One bar of a multi-symbol stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarEvent {
    pub dt: DateTime<Utc>,
    pub exchange: String,
    pub symbol: String,
    #[serde(flatten)]
    pub fields: BarFields,
}

/// Adapts a [`HistoryStream`] into [`BarEvent`]s.
pub struct EventSource<'a> {
    stream: HistoryStream<'a>,
}

impl<'a> EventSource<'a> {
    pub fn new(stream: HistoryStream<'a>) -> Self {
        Self { stream }
    }
}

impl Iterator for EventSource<'_> {
    type Item = Result<BarEvent, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.stream.next()?;
        let request = self.stream.request();
        Some(item.map(|(ts, fields)| BarEvent {
            dt: ts.with_timezone(&Utc),
            exchange: request.exchange.clone(),
            symbol: request.symbol.clone(),
            fields,
        }))
    }
}

/// K-way merge of event iterators by timestamp.
pub struct Interleave<I> {
    inputs: Vec<I>,
    heads: Vec<Option<BarEvent>>,
    order: BinaryHeap<Reverse<(i64, usize)>>,
    errors: VecDeque<Error>,
    primed: bool,
}

impl<I> Interleave<I>
where
    I: Iterator<Item = Result<BarEvent, Error>>,
{
    pub fn new(inputs: Vec<I>) -> Self {
        let heads = inputs.iter().map(|_| None).collect();
        Self {
            inputs,
            heads,
            order: BinaryHeap::new(),
            errors: VecDeque::new(),
            primed: false,
        }
    }

    fn pull(&mut self, index: usize) {
        match self.inputs[index].next() {
            Some(Ok(event)) => {
                self.order
                    .push(Reverse((event.dt.timestamp_micros(), index)));
                self.heads[index] = Some(event);
            }
            Some(Err(error)) => self.errors.push_back(error),
            None => {}
        }
    }
}

impl<I> Iterator for Interleave<I>
where
    I: Iterator<Item = Result<BarEvent, Error>>,
{
    type Item = Result<BarEvent, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.primed {
            self.primed = true;
            for index in 0..self.inputs.len() {
                self.pull(index);
            }
        }

        if let Some(error) = self.errors.pop_front() {
            return Some(Err(error));
        }

        let Reverse((_, index)) = self.order.pop()?;
        let event = self.heads[index].take()?;
        self.pull(index);
        Some(Ok(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(symbol: &str, day: u32) -> Result<BarEvent, Error> {
        Ok(BarEvent {
            dt: Utc
                .with_ymd_and_hms(2024, 1, day, 21, 0, 0)
                .single()
                .expect("valid"),
            exchange: "NYSE".into(),
            symbol: symbol.into(),
            fields: BarFields {
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: 1,
                open_interest: None,
            },
        })
    }

    fn symbols(merged: Interleave<std::vec::IntoIter<Result<BarEvent, Error>>>) -> Vec<String> {
        merged
            .map(|item| match item {
                Ok(event) => format!("{}@{}", event.symbol, event.dt.format("%d")),
                Err(_) => String::from("error"),
            })
            .collect()
    }

    #[test]
    fn interleaves_by_timestamp_with_input_order_on_ties() {
        let a = vec![event("A", 1), event("A", 3), event("A", 4)];
        let b = vec![event("B", 2), event("B", 3)];

        let merged = Interleave::new(vec![a.into_iter(), b.into_iter()]);

        assert_eq!(
            symbols(merged),
            vec!["A@01", "B@02", "A@03", "B@03", "A@04"]
        );
    }

    #[test]
    fn failed_input_yields_error_once_and_others_continue() {
        let a = vec![event("A", 1), event("A", 2)];
        let b = vec![Err(Error::remote("SymbolHistoryPeriod", "boom")), event("B", 1)];

        let merged = Interleave::new(vec![a.into_iter(), b.into_iter()]);

        assert_eq!(symbols(merged), vec!["error", "A@01", "A@02"]);
    }
}
